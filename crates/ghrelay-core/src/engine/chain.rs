//! Chain execution
//!
//! A chain runs in rounds. Each round first runs every CLI-queued step
//! concurrently, then the structured phase (query batch with lookups, then
//! mutation batch). A CLI step falling back to the structured route joins the
//! same round's structured phase; a structured step falling back to the CLI
//! runs in the next round.

use super::config::ExecutionDeps;
use super::core::Engine;
use super::result_builder::build_chain_result;
use super::step::StepState;
use crate::envelope::{ChainResult, EnvelopeError, ResultEnvelope, ResultMeta, Route, RouteReason, TaskRequest};
use crate::routing::{Classification, RouteClassifier};
use crate::taxonomy::ErrorCode;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

impl Engine {
    /// Execute one request.
    ///
    /// Always resolves to a populated envelope.
    #[instrument(skip(self, request, deps), fields(task = %request.task))]
    pub async fn execute_task(&self, request: TaskRequest, deps: &ExecutionDeps) -> ResultEnvelope {
        let task = request.task.clone();
        self.execute_tasks(vec![request], deps)
            .await
            .results
            .into_iter()
            .next()
            .unwrap_or_else(|| {
                ResultEnvelope::failure(
                    EnvelopeError::new(ErrorCode::Unknown, "step produced no result"),
                    ResultMeta::new(task),
                )
            })
    }

    /// Execute a chain of requests.
    ///
    /// Produces exactly one envelope per request, in request order. Steps
    /// fail independently.
    #[instrument(skip(self, requests, deps), fields(steps = requests.len()))]
    pub async fn execute_tasks(&self, requests: Vec<TaskRequest>, deps: &ExecutionDeps) -> ChainResult {
        let started = Instant::now();
        info!("Chain started");

        let mut steps: Vec<StepState> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| StepState::new(index, request))
            .collect();
        let mut classifier = RouteClassifier::new(deps, &self.handlers, &self.detector);

        self.resolve_cards(&mut steps);
        classify_steps(&mut steps, &mut classifier).await;

        let mut round = 0;
        loop {
            round += 1;
            let ran_cli = self.run_cli_phase(&mut steps, &mut classifier, deps).await;
            let ran_structured = self
                .run_structured_phase(&mut steps, &mut classifier, deps)
                .await;
            if !ran_cli && !ran_structured {
                break;
            }
            debug!(round, ran_cli, ran_structured, "Round complete");
        }

        let result = build_chain_result(steps);
        info!(
            status = ?result.status,
            total = result.meta.total,
            succeeded = result.meta.succeeded,
            failed = result.meta.failed,
            route_used = %result.meta.route_used,
            duration_ms = started.elapsed().as_millis() as u64,
            "Chain finished"
        );
        result
    }

    fn resolve_cards(&self, steps: &mut [StepState]) {
        for step in steps.iter_mut() {
            match self.registry.lookup(&step.task) {
                Some(card) if card.is_routable() => step.card = Some(card),
                Some(_) => step.reject(
                    EnvelopeError::new(
                        ErrorCode::Validation,
                        format!("Task {} has no configured route", step.task),
                    ),
                    RouteReason::CapabilityLimit,
                ),
                None => {
                    debug!(index = step.index, task = %step.task, "Unknown task");
                    step.reject(
                        EnvelopeError::new(
                            ErrorCode::Validation,
                            format!("Unsupported task: {}", step.task),
                        ),
                        RouteReason::InputValidation,
                    );
                }
            }
        }
    }
}

/// Classify steps in order. A detection failure is applied to the failing
/// step and every later step still awaiting classification.
async fn classify_steps(steps: &mut [StepState], classifier: &mut RouteClassifier<'_>) {
    let mut systemic: Option<EnvelopeError> = None;

    for step in steps.iter_mut() {
        if step.outcome.is_some() {
            continue;
        }
        if let Some(error) = &systemic {
            step.reject(error.clone(), RouteReason::PreflightFailed);
            continue;
        }
        let Some(card) = step.card.clone() else {
            continue;
        };

        match classifier.classify(&card, &step.input).await {
            Ok(Classification::Routed(plan)) => {
                step.route = Some(plan.route);
                step.reason = Some(plan.reason);
                step.fallbacks = plan.fallbacks.into();
            }
            Ok(Classification::Rejected { error, reason }) => step.reject(error, reason),
            Err(e) => {
                warn!(index = step.index, error = %e, "CLI environment detection failed");
                let error = EnvelopeError::from(&e);
                step.reject(error.clone(), RouteReason::PreflightFailed);
                systemic = Some(error);
            }
        }
    }
}

/// Queue the step's next available fallback, or record the terminal failure.
/// Validation failures never fall back.
pub(super) async fn fall_back_or_fail(
    step: &mut StepState,
    route: Route,
    error: EnvelopeError,
    classifier: &mut RouteClassifier<'_>,
) {
    if error.code != ErrorCode::Validation {
        while let Some(next) = step.fallbacks.pop_front() {
            match classifier.is_available(next).await {
                Ok(true) => {
                    warn!(
                        index = step.index,
                        task = %step.task,
                        from = %route,
                        to = %next,
                        error = %error.message,
                        "Step failed, falling back"
                    );
                    step.route = Some(next);
                    step.reason = Some(RouteReason::CardFallback);
                    return;
                }
                Ok(false) => {
                    debug!(index = step.index, route = %next, "Fallback route unavailable");
                }
                Err(e) => {
                    warn!(index = step.index, route = %next, error = %e, "Fallback route could not be checked");
                }
            }
        }
    }

    debug!(index = step.index, route = %route, code = %error.code, "Step failed");
    step.fail(route, error);
}
