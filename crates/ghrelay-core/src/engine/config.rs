//! Engine configuration and per-call dependencies

use crate::cli::CliCommandRunner;
use crate::envelope::RouteReason;
use crate::preflight::{DEFAULT_ENVIRONMENT_TTL, DEFAULT_PROBE_TIMEOUT};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on one CLI step
pub const DEFAULT_CLI_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// CLI binary probed by preflight
    pub cli_binary: String,
    /// Timeout for each preflight probe command
    pub probe_timeout: Duration,
    /// Timeout for one CLI step
    pub cli_step_timeout: Duration,
    /// How long a detected CLI environment stays valid
    pub environment_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cli_binary: "gh".to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            cli_step_timeout: DEFAULT_CLI_STEP_TIMEOUT,
            environment_ttl: DEFAULT_ENVIRONMENT_TTL,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for a CLI binary
    #[must_use]
    pub fn new(cli_binary: impl Into<String>) -> Self {
        Self {
            cli_binary: cli_binary.into(),
            ..Default::default()
        }
    }

    /// Set the probe timeout
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the CLI step timeout
    #[must_use]
    pub fn with_cli_step_timeout(mut self, timeout: Duration) -> Self {
        self.cli_step_timeout = timeout;
        self
    }

    /// Set the environment cache TTL
    #[must_use]
    pub fn with_environment_ttl(mut self, ttl: Duration) -> Self {
        self.environment_ttl = ttl;
        self
    }
}

/// Collaborators and flags for one `execute_task`/`execute_tasks` call
#[derive(Clone, Default)]
pub struct ExecutionDeps {
    /// Structured API transport
    pub transport: Option<Arc<dyn Transport>>,
    /// CLI runner; without one the CLI route is never used
    pub cli_runner: Option<Arc<dyn CliCommandRunner>>,
    /// Known CLI availability, skipping that part of detection
    pub cli_available: Option<bool>,
    /// Known CLI authentication state
    pub cli_authenticated: Option<bool>,
    /// Assume a ready CLI without probing
    pub skip_preflight: bool,
    /// Whether the transport carries a token
    pub token_present: bool,
    /// Reason recorded when no route qualifies
    pub reason_override: Option<RouteReason>,
}

impl ExecutionDeps {
    /// Empty deps: no transport, no runner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set token presence
    #[must_use]
    pub fn with_token(mut self, present: bool) -> Self {
        self.token_present = present;
        self
    }

    /// Set the CLI runner
    #[must_use]
    pub fn with_cli_runner(mut self, runner: Arc<dyn CliCommandRunner>) -> Self {
        self.cli_runner = Some(runner);
        self
    }

    /// Set known CLI environment flags
    #[must_use]
    pub fn with_cli_flags(mut self, available: Option<bool>, authenticated: Option<bool>) -> Self {
        self.cli_available = available;
        self.cli_authenticated = authenticated;
        self
    }

    /// Skip preflight probing
    #[must_use]
    pub fn with_skip_preflight(mut self, skip: bool) -> Self {
        self.skip_preflight = skip;
        self
    }

    /// Set the no-route reason override
    #[must_use]
    pub fn with_reason_override(mut self, reason: RouteReason) -> Self {
        self.reason_override = Some(reason);
        self
    }
}

impl std::fmt::Debug for ExecutionDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionDeps")
            .field("transport", &self.transport.is_some())
            .field("cli_runner", &self.cli_runner.is_some())
            .field("cli_available", &self.cli_available)
            .field("cli_authenticated", &self.cli_authenticated)
            .field("skip_preflight", &self.skip_preflight)
            .field("token_present", &self.token_present)
            .field("reason_override", &self.reason_override)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cli_binary, "gh");
        assert_eq!(config.probe_timeout, Duration::from_millis(1500));
        assert_eq!(config.cli_step_timeout, Duration::from_secs(10));
        assert_eq!(config.environment_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::new("/usr/local/bin/gh")
            .with_probe_timeout(Duration::from_millis(200))
            .with_cli_step_timeout(Duration::from_secs(2))
            .with_environment_ttl(Duration::from_secs(5));
        assert_eq!(config.cli_binary, "/usr/local/bin/gh");
        assert_eq!(config.cli_step_timeout, Duration::from_secs(2));
        assert_eq!(config.environment_ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_deps_debug_hides_collaborators() {
        let deps = ExecutionDeps::new()
            .with_token(true)
            .with_cli_flags(Some(true), None);
        let debug = format!("{:?}", deps);
        assert!(debug.contains("transport: false"));
        assert!(debug.contains("token_present: true"));
    }
}
