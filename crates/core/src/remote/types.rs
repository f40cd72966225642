//! GraphQL wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body posted to the endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Map<String, Value>,
}

/// Decoded response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphQlResponse {
    /// Query result; may be partial when `errors` is also present.
    #[serde(default)]
    pub data: Option<Value>,
    /// Application errors reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQlError>>,
}

impl GraphQlResponse {
    /// Successful response with only data.
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    /// Error response with no data.
    pub fn with_errors(errors: Vec<GraphQlError>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
        }
    }

    /// Whether the server reported any application error.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Error messages joined for logging.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .flatten()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One GraphQL application error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}
