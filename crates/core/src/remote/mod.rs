//! Remote GraphQL transport.
//!
//! A [`QueryTransport`] performs exactly one round trip and reports what
//! came back. It makes no retry decisions: a structured response (one that
//! parsed as a GraphQL envelope) is always returned as `Ok`, even when it
//! carries `errors` or arrived with a non-2xx status. Only failures that
//! left no structured body behind surface as [`TransportError`].

mod graphql;
mod types;

pub use graphql::GraphQlClient;
pub use types::*;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Failures that produced no structured response body.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success status whose body is not a GraphQL envelope.
    #[error("HTTP {status} without a GraphQL body: {body}")]
    UnstructuredStatus { status: u16, body: String },

    /// A 2xx response whose body is not a GraphQL envelope.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client could not be built from configuration.
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// One GraphQL round trip.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Execute `document` with `variables` and return the decoded envelope.
    async fn execute(
        &self,
        document: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphQlResponse, TransportError>;
}
