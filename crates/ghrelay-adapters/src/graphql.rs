//! GraphQL HTTP transport for the GitHub API

use crate::error::{Error, Result};
use ghrelay_core::{GraphqlResponse, Transport};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Public GitHub API root
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Endpoint and credentials for [`GraphqlHttpTransport`]
#[derive(Clone)]
pub struct GraphqlHttpConfig {
    /// API root; `/graphql` is appended
    pub api_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for GraphqlHttpConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            user_agent: concat!("ghrelay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GraphqlHttpConfig {
    /// Create a config for an API root
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Set the token; blank tokens are ignored
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Full GraphQL endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/graphql", self.api_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for GraphqlHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlHttpConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Sends one batch document per call to `<api_url>/graphql`
#[derive(Debug)]
pub struct GraphqlHttpTransport {
    client: reqwest::Client,
    config: GraphqlHttpConfig,
}

impl GraphqlHttpTransport {
    /// Build the transport
    pub fn new(config: GraphqlHttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Whether requests carry a token
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    /// Transport configuration
    #[must_use]
    pub fn config(&self) -> &GraphqlHttpConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Transport for GraphqlHttpTransport {
    async fn execute(&self, query: &str, variables: Value) -> ghrelay_core::Result<GraphqlResponse> {
        let endpoint = self.config.endpoint();
        debug!(endpoint = %endpoint, query_len = query.len(), "GraphQL request");

        let mut request = self
            .client
            .post(&endpoint)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", &self.config.user_agent)
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.config.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ghrelay_core::Error::Timeout(self.config.timeout.as_millis() as u64)
            } else {
                ghrelay_core::Error::Network(format!("GraphQL request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ghrelay_core::Error::Network(format!("Failed to read GraphQL response: {}", e)))?;

        if !status.is_success() {
            return Err(ghrelay_core::Error::Http {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        let parsed = parse_body(&body)?;
        debug!(
            status = status.as_u16(),
            errors = parsed.errors.len(),
            has_data = parsed.data.is_some(),
            "GraphQL response"
        );
        Ok(parsed)
    }
}

/// Message of a non-2xx body, falling back to the status reason
fn error_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(200).collect())
        })
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string())
}

fn parse_body(body: &str) -> ghrelay_core::Result<GraphqlResponse> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ghrelay_core::Error::MalformedResponse(format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(ghrelay_core::Error::MalformedResponse(
            "response body is not an object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| ghrelay_core::Error::MalformedResponse(format!("unexpected shape: {}", e)))
}
