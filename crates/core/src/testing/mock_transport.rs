//! Mock GraphQL transport for testing.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::remote::{GraphQlError, GraphQlResponse, QueryTransport, TransportError};

use super::{fixtures, lock};

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub document: String,
    pub variables: Map<String, Value>,
}

/// Serves a fixed list of elements as a paginated result, the way the
/// remote does: honoring `start`, capping `count`, echoing the applied
/// cursor and reporting the full total.
#[derive(Debug, Clone)]
pub struct MockCatalog {
    selector_path: String,
    elements: Vec<Value>,
    max_count: Option<u64>,
}

impl MockCatalog {
    pub fn new(selector_path: &str, elements: Vec<Value>) -> Self {
        Self {
            selector_path: selector_path.to_string(),
            elements,
            max_count: None,
        }
    }

    /// Cap every page at `max_count` elements regardless of the request.
    pub fn with_max_count(mut self, max_count: u64) -> Self {
        self.max_count = Some(max_count);
        self
    }

    fn respond(&self, variables: &Map<String, Value>) -> GraphQlResponse {
        let start = variables.get("start").and_then(Value::as_u64).unwrap_or(0);
        let requested = variables.get("count").and_then(Value::as_u64).unwrap_or(0);
        let count = self.max_count.map_or(requested, |max| requested.min(max));

        let len = self.elements.len();
        let from = (start as usize).min(len);
        let to = (start.saturating_add(count) as usize).min(len);

        GraphQlResponse::with_data(fixtures::page_data(
            &self.selector_path,
            self.elements[from..to].to_vec(),
            start,
            count,
            len as u64,
        ))
    }
}

#[derive(Debug)]
enum Scripted {
    Response(GraphQlResponse),
    TransportFailure(String),
}

#[derive(Debug, Default)]
struct State {
    scripted: VecDeque<Scripted>,
    catalog: Option<MockCatalog>,
    failing_catalog_requests: usize,
    calls: Vec<RecordedRequest>,
}

/// Mock implementation of the QueryTransport trait.
///
/// Scripted responses are served first, in order. Once they run out the
/// catalog (if any) answers. A request with neither fails as unconfigured.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<State>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport backed by a paginating catalog.
    pub fn with_catalog(catalog: MockCatalog) -> Self {
        let transport = Self::new();
        lock(&transport.state).catalog = Some(catalog);
        transport
    }

    /// Queue a structured response.
    pub fn push_response(&self, response: GraphQlResponse) {
        lock(&self.state)
            .scripted
            .push_back(Scripted::Response(response));
    }

    /// Queue a failure without a structured body (an HTTP 503).
    pub fn push_transport_failure(&self, body: &str) {
        lock(&self.state)
            .scripted
            .push_back(Scripted::TransportFailure(body.to_string()));
    }

    /// Make the next `n` catalog answers an errors-only response.
    pub fn fail_next_catalog_requests(&self, n: usize) {
        lock(&self.state).failing_catalog_requests = n;
    }

    /// All requests received so far.
    pub fn calls(&self) -> Vec<RecordedRequest> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.state).calls.len()
    }
}

#[async_trait]
impl QueryTransport for MockTransport {
    async fn execute(
        &self,
        document: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphQlResponse, TransportError> {
        let mut state = lock(&self.state);
        state.calls.push(RecordedRequest {
            document: document.to_string(),
            variables: variables.clone(),
        });

        match state.scripted.pop_front() {
            Some(Scripted::Response(response)) => return Ok(response),
            Some(Scripted::TransportFailure(body)) => {
                return Err(TransportError::UnstructuredStatus { status: 503, body })
            }
            None => {}
        }

        if state.catalog.is_some() && state.failing_catalog_requests > 0 {
            state.failing_catalog_requests -= 1;
            return Ok(GraphQlResponse::with_errors(vec![GraphQlError::new(
                "service unavailable",
            )]));
        }

        match &state.catalog {
            Some(catalog) => Ok(catalog.respond(variables)),
            None => Err(TransportError::NotConfigured(
                "no scripted response left".to_string(),
            )),
        }
    }
}
