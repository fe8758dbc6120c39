//! CLI - External command-line tool boundary
//!
//! The engine never builds CLI arguments itself. Each capability with a CLI
//! route has a [`CliHandler`] that turns params into a command and parses the
//! output, running it through an injected [`CliCommandRunner`].

use crate::envelope::ResultEnvelope;
use crate::error::Result;
use crate::registry::{OperationCard, TaskId};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Captured output of one command invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Process exit code (-1 when killed by a signal)
    pub exit_code: i32,
}

impl CliOutput {
    /// Whether the command exited with status 0
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands
#[async_trait::async_trait]
pub trait CliCommandRunner: Send + Sync {
    /// Run `command` with `args`, bounded by `timeout_ms`
    async fn run(&self, command: &str, args: &[String], timeout_ms: u64) -> Result<CliOutput>;
}

/// Single-step CLI adapter for one capability
#[async_trait::async_trait]
pub trait CliHandler: Send + Sync {
    /// Execute the step and return its envelope
    async fn execute(
        &self,
        runner: &dyn CliCommandRunner,
        params: &Map<String, Value>,
        card: &OperationCard,
    ) -> ResultEnvelope;
}

/// Handlers keyed by task
#[derive(Default, Clone)]
pub struct CliHandlerRegistry {
    handlers: HashMap<TaskId, Arc<dyn CliHandler>>,
}

impl CliHandlerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for a task
    pub fn register(&mut self, task: TaskId, handler: Arc<dyn CliHandler>) {
        debug!(task = %task, "Registering CLI handler");
        self.handlers.insert(task, handler);
    }

    /// Builder-style register
    #[must_use]
    pub fn with(mut self, task: TaskId, handler: Arc<dyn CliHandler>) -> Self {
        self.register(task, handler);
        self
    }

    /// Get the handler for a task
    #[must_use]
    pub fn get(&self, task: TaskId) -> Option<Arc<dyn CliHandler>> {
        self.handlers.get(&task).cloned()
    }

    /// Check if a handler exists
    #[must_use]
    pub fn has(&self, task: TaskId) -> bool {
        self.handlers.contains_key(&task)
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for CliHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliHandlerRegistry")
            .field("tasks", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
