//! Engine - Chain orchestration
//!
//! Ties together the registry, route classifier, CLI handlers and batch
//! executor. `execute_task` and `execute_tasks` always resolve to populated
//! results; failures are isolated per step.
//!
//! # Module Structure
//!
//! - `config`: Configuration types (EngineConfig, ExecutionDeps)
//! - `core`: Engine struct and constructors
//! - `chain`: Entry points, classification and fallback
//! - `cli_step`: CLI phase with per-step timeout
//! - `structured`: Query/mutation batch phase with resolution
//! - `step`: Per-step state
//! - `result_builder`: Chain result assembly

mod chain;
mod cli_step;
mod config;
mod core;
mod result_builder;
mod step;
mod structured;

#[cfg(test)]
mod tests;

pub use config::{EngineConfig, ExecutionDeps, DEFAULT_CLI_STEP_TIMEOUT};
pub use core::Engine;
