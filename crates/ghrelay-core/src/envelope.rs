//! Envelope - Request and result wire types
//!
//! Every executed step produces exactly one [`ResultEnvelope`]; a chain of steps
//! produces one [`ChainResult`].

use crate::error::Error;
use crate::taxonomy::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transport mechanism a step can be executed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// External command-line tool
    Cli,
    /// Structured batch query/mutation API
    Graphql,
    /// REST fallback
    Rest,
}

impl Route {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Graphql => "graphql",
            Self::Rest => "rest",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a route was (or could not be) chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteReason {
    /// Input failed the card's input contract
    InputValidation,
    /// The card's preferred route was used
    CardPreferred,
    /// A card fallback route was used
    CardFallback,
    /// CLI environment detection failed
    PreflightFailed,
    /// The environment ruled routes out
    EnvConstraint,
    /// The capability has no route for this request
    CapabilityLimit,
    /// No route qualified under the default policy
    DefaultPolicy,
}

/// A single capability request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Task identifier, e.g. `repo.view`
    pub task: String,
    /// Task input
    #[serde(default)]
    pub input: Map<String, Value>,
}

impl TaskRequest {
    /// Create a request from a task name and a JSON object input.
    /// Non-object inputs become an empty map.
    #[must_use]
    pub fn new(task: impl Into<String>, input: Value) -> Self {
        let input = match input {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            task: task.into(),
            input,
        }
    }
}

/// Error half of an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeError {
    /// Taxonomy code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Derived from `code`
    pub retryable: bool,
    /// Extra structured context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl EnvelopeError {
    /// Create an error with retryability derived from the code
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
            details: None,
        }
    }

    /// Classify a raw message
    #[must_use]
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::classify(&message), message)
    }

    /// Attach details
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&Error> for EnvelopeError {
    fn from(error: &Error) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

impl From<Error> for EnvelopeError {
    fn from(error: Error) -> Self {
        Self::from(&error)
    }
}

/// Envelope metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMeta {
    /// Task identifier of the step
    pub capability_id: String,
    /// Route that produced this envelope; absent when none was chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_used: Option<Route>,
    /// Route selection reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RouteReason>,
    /// Routes attempted in order, recorded when a fallback happened
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<Route>,
}

impl ResultMeta {
    /// Create metadata for a capability
    #[must_use]
    pub fn new(capability_id: impl Into<String>) -> Self {
        Self {
            capability_id: capability_id.into(),
            route_used: None,
            reason: None,
            attempts: Vec::new(),
        }
    }

    /// Set the route used
    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.route_used = Some(route);
        self
    }

    /// Set the reason
    #[must_use]
    pub fn with_reason(mut self, reason: RouteReason) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Uniform per-step result wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Whether the step succeeded
    pub ok: bool,
    /// Result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    /// Metadata
    pub meta: ResultMeta,
}

impl ResultEnvelope {
    /// Create a successful envelope
    #[must_use]
    pub fn success(data: Value, meta: ResultMeta) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            meta,
        }
    }

    /// Create a failed envelope
    #[must_use]
    pub fn failure(error: EnvelopeError, meta: ResultMeta) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
            meta,
        }
    }

    /// Error code, if failed
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// Aggregate status of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    /// Every step succeeded
    Success,
    /// Some steps succeeded
    Partial,
    /// No step succeeded (or there were no steps)
    Failed,
}

impl ChainStatus {
    /// Pure function of the per-step `ok` flags
    #[must_use]
    pub fn from_results(results: &[ResultEnvelope]) -> Self {
        let succeeded = results.iter().filter(|r| r.ok).count();
        if succeeded == 0 {
            Self::Failed
        } else if succeeded == results.len() {
            Self::Success
        } else {
            Self::Partial
        }
    }
}

/// Chain-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMeta {
    /// `cli` when every step ran over the CLI, otherwise `graphql`
    pub route_used: Route,
    /// Number of steps
    pub total: usize,
    /// Steps with `ok == true`
    pub succeeded: usize,
    /// Steps with `ok == false`
    pub failed: usize,
}

/// Aggregated result of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    /// Aggregate status
    pub status: ChainStatus,
    /// One envelope per request, in request order
    pub results: Vec<ResultEnvelope>,
    /// Chain metadata
    pub meta: ChainMeta,
}
