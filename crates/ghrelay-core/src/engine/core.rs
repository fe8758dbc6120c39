//! Engine struct and constructors

use super::config::EngineConfig;
use crate::cli::CliHandlerRegistry;
use crate::preflight::{CliEnvironmentDetector, Clock};
use crate::registry::CapabilityRegistry;
use std::sync::Arc;

/// Routes and executes capability requests.
///
/// One engine owns the CLI environment cache, so concurrent calls through the
/// same engine share probes.
pub struct Engine {
    pub(super) registry: CapabilityRegistry,
    pub(super) handlers: CliHandlerRegistry,
    pub(super) detector: CliEnvironmentDetector,
    pub(super) config: EngineConfig,
}

impl Engine {
    /// Create an engine
    #[must_use]
    pub fn new(registry: CapabilityRegistry, handlers: CliHandlerRegistry, config: EngineConfig) -> Self {
        let detector = CliEnvironmentDetector::new(config.cli_binary.clone())
            .with_probe_timeout(config.probe_timeout)
            .with_ttl(config.environment_ttl);
        Self {
            registry,
            handlers,
            detector,
            config,
        }
    }

    /// Engine over the built-in cards
    #[must_use]
    pub fn builtin(handlers: CliHandlerRegistry, config: EngineConfig) -> Self {
        Self::new(CapabilityRegistry::builtin(), handlers, config)
    }

    /// Replace the detector clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.detector = self.detector.with_clock(clock);
        self
    }

    /// Registered cards
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Registered CLI handlers
    #[must_use]
    pub fn handlers(&self) -> &CliHandlerRegistry {
        &self.handlers
    }

    /// CLI environment detector
    #[must_use]
    pub fn detector(&self) -> &CliEnvironmentDetector {
        &self.detector
    }

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cards", &self.registry.len())
            .field("handlers", &self.handlers)
            .field("detector", &self.detector)
            .field("config", &self.config)
            .finish()
    }
}
