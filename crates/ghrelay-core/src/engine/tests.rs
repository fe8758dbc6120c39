use super::chain::fall_back_or_fail;
use super::step::StepState;
use super::*;
use crate::cli::{CliCommandRunner, CliHandlerRegistry, CliOutput};
use crate::envelope::{EnvelopeError, Route, RouteReason, TaskRequest};
use crate::error::Result;
use crate::preflight::CliEnvironmentDetector;
use crate::routing::RouteClassifier;
use crate::taxonomy::ErrorCode;
use serde_json::json;
use std::sync::Arc;

struct ExitRunner(i32);

#[async_trait::async_trait]
impl CliCommandRunner for ExitRunner {
    async fn run(&self, _command: &str, _args: &[String], _timeout_ms: u64) -> Result<CliOutput> {
        Ok(CliOutput {
            exit_code: self.0,
            ..Default::default()
        })
    }
}

fn queued_step(route: Route, fallbacks: &[Route]) -> StepState {
    let mut step = StepState::new(0, TaskRequest::new("issue.list", json!({})));
    step.route = Some(route);
    step.reason = Some(RouteReason::CardPreferred);
    step.fallbacks = fallbacks.iter().copied().collect();
    step.begin(route);
    step
}

#[tokio::test]
async fn test_fallback_queues_next_route() {
    let deps = ExecutionDeps::new().with_skip_preflight(true);
    let handlers = CliHandlerRegistry::new();
    let detector = CliEnvironmentDetector::default();
    let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

    let mut step = queued_step(Route::Graphql, &[Route::Cli]);
    fall_back_or_fail(
        &mut step,
        Route::Graphql,
        EnvelopeError::new(ErrorCode::Server, "502"),
        &mut classifier,
    )
    .await;

    assert!(step.is_queued(Route::Cli));
    assert_eq!(step.reason, Some(RouteReason::CardFallback));
    assert!(step.outcome.is_none());
}

#[tokio::test]
async fn test_fallback_skips_unavailable_cli() {
    let runner: Arc<dyn CliCommandRunner> = Arc::new(ExitRunner(127));
    let deps = ExecutionDeps::new().with_cli_runner(runner);
    let handlers = CliHandlerRegistry::new();
    let detector = CliEnvironmentDetector::default();
    let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

    let mut step = queued_step(Route::Graphql, &[Route::Cli]);
    fall_back_or_fail(
        &mut step,
        Route::Graphql,
        EnvelopeError::new(ErrorCode::Network, "connection reset"),
        &mut classifier,
    )
    .await;

    let envelope = step.outcome.expect("terminal failure");
    assert_eq!(envelope.error_code(), Some(ErrorCode::Network));
    assert_eq!(envelope.meta.route_used, Some(Route::Graphql));
}

#[tokio::test]
async fn test_validation_failure_is_terminal() {
    let deps = ExecutionDeps::new().with_skip_preflight(true);
    let handlers = CliHandlerRegistry::new();
    let detector = CliEnvironmentDetector::default();
    let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

    let mut step = queued_step(Route::Cli, &[Route::Graphql]);
    fall_back_or_fail(
        &mut step,
        Route::Cli,
        EnvelopeError::new(ErrorCode::Validation, "unknown flag"),
        &mut classifier,
    )
    .await;

    assert_eq!(step.fallbacks.len(), 1);
    assert_eq!(
        step.outcome.and_then(|e| e.error_code()),
        Some(ErrorCode::Validation)
    );
}

#[test]
fn test_step_meta_records_attempts_after_fallback() {
    let mut step = queued_step(Route::Cli, &[]);
    assert!(step.meta(Some(Route::Cli)).attempts.is_empty());

    step.begin(Route::Graphql);
    step.succeed(Route::Graphql, json!({"id": 1}));
    let envelope = step.into_envelope();
    assert_eq!(envelope.meta.attempts, vec![Route::Cli, Route::Graphql]);
    assert_eq!(envelope.meta.capability_id, "issue.list");
}

#[test]
fn test_step_without_outcome_is_unknown() {
    let step = StepState::new(3, TaskRequest::new("repo.view", json!({})));
    let envelope = step.into_envelope();
    assert!(!envelope.ok);
    assert_eq!(envelope.error_code(), Some(ErrorCode::Unknown));
}

#[test]
fn test_engine_uses_config_for_detector() {
    let engine = Engine::builtin(
        CliHandlerRegistry::new(),
        EngineConfig::new("gh-custom"),
    );
    assert_eq!(engine.detector().binary(), "gh-custom");
    assert_eq!(engine.registry().len(), 9);
    assert!(engine.handlers().is_empty());
}
