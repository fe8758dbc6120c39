//! Transport - Structured query/mutation API boundary
//!
//! The engine issues exactly one [`Transport::execute`] call per batch. The
//! transport owns the endpoint and credentials.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a GraphQL top-level `errors` list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphqlError {
    /// Error message
    pub message: String,
    /// Response path; the first segment names the root field (alias)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    /// Machine-readable type (`NOT_FOUND`, `FORBIDDEN`, ...)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl GraphqlError {
    /// Create an error without a path
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the path to a single root field
    #[must_use]
    pub fn at(mut self, alias: impl Into<String>) -> Self {
        self.path = Some(vec![Value::String(alias.into())]);
        self
    }

    /// Set the error type
    #[must_use]
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// First path segment, when it is a field name
    #[must_use]
    pub fn root_field(&self) -> Option<&str> {
        self.path.as_ref()?.first()?.as_str()
    }

    /// Text fed to the error taxonomy
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.error_type {
            Some(t) => format!("{}: {}", t, self.message),
            None => self.message.clone(),
        }
    }
}

/// Raw GraphQL response body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphqlResponse {
    /// Success payload keyed by root field
    #[serde(default)]
    pub data: Option<Value>,
    /// Top-level errors
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    /// Create a response with data only
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Add an error
    #[must_use]
    pub fn with_error(mut self, error: GraphqlError) -> Self {
        self.errors.push(error);
        self
    }
}

/// One network call against the structured API
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Execute a document with variables
    async fn execute(&self, query: &str, variables: Value) -> Result<GraphqlResponse>;
}
