//! reqwest-backed GraphQL client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RemoteConfig;

use super::types::{GraphQlRequest, GraphQlResponse};
use super::{QueryTransport, TransportError};

/// GraphQL client posting JSON requests to a single endpoint.
pub struct GraphQlClient {
    client: Client,
    endpoint: String,
}

impl GraphQlClient {
    /// Create a new client from the remote configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, TransportError> {
        if config.endpoint.trim().is_empty() {
            return Err(TransportError::NotConfigured(
                "GraphQL endpoint is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .default_headers(build_headers(&config.headers)?)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn build_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            TransportError::NotConfigured(format!("Invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            TransportError::NotConfigured(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Decode a body into a GraphQL envelope.
///
/// Returns `None` unless the body is a JSON object carrying `data` or
/// `errors`; anything else is not a structured response.
fn decode_envelope(body: &str) -> Option<GraphQlResponse> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    if !object.contains_key("data") && !object.contains_key("errors") {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[async_trait]
impl QueryTransport for GraphQlClient {
    async fn execute(
        &self,
        document: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphQlResponse, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            start = ?variables.get("start"),
            count = ?variables.get("count"),
            "GraphQL request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest {
                query: document,
                variables,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match decode_envelope(&body) {
            Some(envelope) => {
                if !status.is_success() {
                    debug!(status = status.as_u16(), "GraphQL error status with structured body");
                }
                Ok(envelope)
            }
            None if status.is_success() => Err(TransportError::ParseError(format!(
                "Response is not a GraphQL envelope: {}",
                body.chars().take(200).collect::<String>()
            ))),
            None => Err(TransportError::UnstructuredStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            }),
        }
    }
}
