//! CLI step execution

use super::chain::fall_back_or_fail;
use super::config::ExecutionDeps;
use super::core::Engine;
use super::step::StepState;
use crate::cli::CliCommandRunner;
use crate::envelope::{EnvelopeError, ResultEnvelope, ResultMeta, Route};
use crate::error::Error;
use crate::routing::RouteClassifier;
use crate::taxonomy::ErrorCode;
use futures::future::join_all;
use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

impl Engine {
    /// Run every CLI-queued step concurrently. Returns whether any ran.
    pub(super) async fn run_cli_phase(
        &self,
        steps: &mut [StepState],
        classifier: &mut RouteClassifier<'_>,
        deps: &ExecutionDeps,
    ) -> bool {
        let queued: Vec<usize> = steps
            .iter()
            .filter(|s| s.is_queued(Route::Cli))
            .map(|s| s.index)
            .collect();
        if queued.is_empty() {
            return false;
        }
        for &index in &queued {
            steps[index].begin(Route::Cli);
        }

        let envelopes = match deps.cli_runner.as_deref() {
            Some(runner) => {
                let runs: Vec<_> = queued
                    .iter()
                    .map(|&index| self.run_cli_step(runner, &steps[index]))
                    .collect();
                join_all(runs).await
            }
            None => queued
                .iter()
                .map(|_| {
                    ResultEnvelope::failure(
                        EnvelopeError::new(ErrorCode::AdapterUnsupported, "no CLI runner configured"),
                        ResultMeta::new(String::new()),
                    )
                })
                .collect(),
        };

        for (index, envelope) in queued.into_iter().zip(envelopes) {
            let step = &mut steps[index];
            if envelope.ok {
                step.succeed(Route::Cli, envelope.data.unwrap_or(Value::Null));
            } else {
                let error = envelope.error.unwrap_or_else(|| {
                    EnvelopeError::new(ErrorCode::Unknown, "CLI handler failed without detail")
                });
                fall_back_or_fail(step, Route::Cli, error, classifier).await;
            }
        }
        true
    }

    /// Run one step through its handler, bounded by the step timeout
    async fn run_cli_step(&self, runner: &dyn CliCommandRunner, step: &StepState) -> ResultEnvelope {
        let meta = ResultMeta::new(step.task.clone()).with_route(Route::Cli);
        let Some(card) = step.card.as_deref() else {
            return ResultEnvelope::failure(
                EnvelopeError::new(ErrorCode::Unknown, "step has no operation card"),
                meta,
            );
        };
        let Some(handler) = self.handlers.get(card.task) else {
            return ResultEnvelope::failure(
                EnvelopeError::new(
                    ErrorCode::AdapterUnsupported,
                    format!("no CLI handler for task {}", card.task),
                ),
                meta,
            );
        };

        let limit = self.config.cli_step_timeout;
        debug!(index = step.index, task = %card.task, timeout_ms = limit.as_millis() as u64, "Running CLI step");
        match timeout(limit, handler.execute(runner, &step.input, card)).await {
            Ok(envelope) => envelope,
            Err(_) => ResultEnvelope::failure(
                EnvelopeError::from(Error::Timeout(limit.as_millis() as u64)),
                meta,
            ),
        }
    }
}
