//! Routing - Input validation and route classification
//!
//! A step is routed by walking the card's preferred route and then its
//! fallbacks, picking the first route that is both structurally supported
//! (configured on the card and wired in the execution deps) and available in
//! the current environment. Only CLI candidates consult the environment
//! detector, and the detected environment is shared by every step of a chain.

use crate::cli::CliHandlerRegistry;
use crate::engine::ExecutionDeps;
use crate::envelope::{EnvelopeError, Route, RouteReason};
use crate::error::Result;
use crate::preflight::{CliEnvironment, CliEnvironmentDetector};
use crate::registry::{InputKind, OperationCard};
use crate::taxonomy::ErrorCode;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Chosen route for a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    /// Route to execute first
    pub route: Route,
    /// Why it was chosen
    pub reason: RouteReason,
    /// Structurally supported routes after `route`, in card order
    pub fallbacks: Vec<Route>,
}

/// Outcome of classifying one step
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// A route qualified
    Routed(RoutePlan),
    /// The step cannot run; no side effects happened
    Rejected {
        /// Error for the step's envelope
        error: EnvelopeError,
        /// Reason recorded in the envelope metadata
        reason: RouteReason,
    },
}

/// Check `input` against the card's input contract
pub fn validate_input(card: &OperationCard, input: &Map<String, Value>) -> std::result::Result<(), String> {
    for field in &card.input {
        let value = input.get(&field.name).filter(|v| !v.is_null());
        let Some(value) = value else {
            if field.required {
                return Err(format!("missing required field '{}'", field.name));
            }
            continue;
        };

        let matches = match field.kind {
            InputKind::String => value
                .as_str()
                .is_some_and(|s| !field.required || !s.trim().is_empty()),
            InputKind::Integer => value.is_i64() || value.is_u64(),
            InputKind::Boolean => value.is_boolean(),
            InputKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        };
        if !matches {
            return Err(format!(
                "field '{}' must be a {}{}",
                field.name,
                if field.required && field.kind == InputKind::String {
                    "non-empty "
                } else {
                    ""
                },
                field.kind.as_str()
            ));
        }
    }

    if !card.input.is_empty() {
        if let Some(unknown) = input
            .keys()
            .find(|key| !card.input.iter().any(|f| &f.name == *key))
        {
            return Err(format!("unexpected field '{}'", unknown));
        }
    }

    Ok(())
}

/// Per-chain route classifier
pub struct RouteClassifier<'a> {
    deps: &'a ExecutionDeps,
    handlers: &'a CliHandlerRegistry,
    detector: &'a CliEnvironmentDetector,
    cli_environment: Option<CliEnvironment>,
}

impl<'a> RouteClassifier<'a> {
    /// Create a classifier for one chain call
    #[must_use]
    pub fn new(
        deps: &'a ExecutionDeps,
        handlers: &'a CliHandlerRegistry,
        detector: &'a CliEnvironmentDetector,
    ) -> Self {
        Self {
            deps,
            handlers,
            detector,
            cli_environment: None,
        }
    }

    /// Whether the card and the deps together can carry `route`
    #[must_use]
    pub fn structurally_supports(&self, card: &OperationCard, route: Route) -> bool {
        match route {
            Route::Graphql => {
                card.graphql.is_some() && self.deps.transport.is_some() && self.deps.token_present
            }
            Route::Cli => {
                card.cli.is_some()
                    && self.handlers.has(card.task)
                    && self.deps.cli_runner.is_some()
            }
            // No REST executor exists in this engine
            Route::Rest => false,
        }
    }

    /// CLI environment for this chain, detected at most once.
    ///
    /// Explicit flags in the deps override probing field by field;
    /// `skip_preflight` assumes a ready CLI.
    pub async fn cli_environment(&mut self) -> Result<CliEnvironment> {
        if let Some(environment) = self.cli_environment {
            return Ok(environment);
        }

        let deps = self.deps;
        let environment = if deps.skip_preflight {
            CliEnvironment::ready()
        } else {
            match (deps.cli_available, deps.cli_authenticated) {
                (Some(available), Some(authenticated)) => CliEnvironment {
                    available,
                    authenticated,
                },
                (Some(false), None) => CliEnvironment::unavailable(),
                (available, authenticated) => match &deps.cli_runner {
                    Some(runner) => {
                        let probed = self.detector.detect(runner).await?;
                        CliEnvironment {
                            available: available.unwrap_or(probed.available),
                            authenticated: authenticated.unwrap_or(probed.authenticated),
                        }
                    }
                    None => CliEnvironment::unavailable(),
                },
            }
        };

        self.cli_environment = Some(environment);
        Ok(environment)
    }

    /// Whether `route` can run right now
    pub async fn is_available(&mut self, route: Route) -> Result<bool> {
        match route {
            Route::Cli => Ok(self.cli_environment().await?.is_usable()),
            Route::Graphql | Route::Rest => Ok(true),
        }
    }

    /// Classify one step.
    ///
    /// Returns `Err` only when environment detection itself fails; every
    /// step-local problem is reported as [`Classification::Rejected`].
    pub async fn classify(
        &mut self,
        card: &OperationCard,
        input: &Map<String, Value>,
    ) -> Result<Classification> {
        if let Err(message) = validate_input(card, input) {
            debug!(task = %card.task, error = %message, "Input validation failed");
            return Ok(Classification::Rejected {
                error: EnvelopeError::new(
                    ErrorCode::Validation,
                    format!("Input validation failed: {}", message),
                ),
                reason: RouteReason::InputValidation,
            });
        }

        let candidates: Vec<Route> = card
            .routing
            .order()
            .filter(|route| self.structurally_supports(card, *route))
            .collect();

        for (position, route) in candidates.iter().copied().enumerate() {
            if !self.is_available(route).await? {
                debug!(task = %card.task, route = %route, "Route unavailable in environment");
                continue;
            }
            let reason = if route == card.routing.preferred {
                RouteReason::CardPreferred
            } else {
                RouteReason::CardFallback
            };
            debug!(task = %card.task, route = %route, reason = ?reason, "Route selected");
            return Ok(Classification::Routed(RoutePlan {
                route,
                reason,
                fallbacks: candidates[position + 1..].to_vec(),
            }));
        }

        let considered: Vec<Route> = card.routing.order().collect();
        Ok(Classification::Rejected {
            error: EnvelopeError::new(
                ErrorCode::AdapterUnsupported,
                format!("No route available for task {}", card.task),
            )
            .with_details(json!({
                "routes": considered,
                "supported": candidates,
            })),
            reason: self.deps.reason_override.unwrap_or(RouteReason::DefaultPolicy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CliCommandRunner, CliHandler, CliOutput};
    use crate::envelope::{ResultEnvelope, ResultMeta};
    use crate::registry::{CapabilityRegistry, TaskId};
    use crate::transport::{GraphqlResponse, Transport};
    use std::sync::Arc;

    struct NullTransport;

    #[async_trait::async_trait]
    impl Transport for NullTransport {
        async fn execute(&self, _query: &str, _variables: Value) -> Result<GraphqlResponse> {
            Ok(GraphqlResponse::default())
        }
    }

    struct NullRunner;

    #[async_trait::async_trait]
    impl CliCommandRunner for NullRunner {
        async fn run(&self, _command: &str, _args: &[String], _timeout_ms: u64) -> Result<CliOutput> {
            Ok(CliOutput::default())
        }
    }

    struct EchoHandler;

    #[async_trait::async_trait]
    impl CliHandler for EchoHandler {
        async fn execute(
            &self,
            _runner: &dyn CliCommandRunner,
            params: &Map<String, Value>,
            card: &OperationCard,
        ) -> ResultEnvelope {
            ResultEnvelope::success(Value::Object(params.clone()), ResultMeta::new(card.task.as_str()))
        }
    }

    fn repo_input() -> Map<String, Value> {
        json!({"owner": "octo", "name": "hello"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn handlers() -> CliHandlerRegistry {
        CliHandlerRegistry::new().with(TaskId::RepoView, Arc::new(EchoHandler))
    }

    #[test]
    fn test_validate_input() {
        let card = CapabilityRegistry::builtin().get(TaskId::IssueView).unwrap();

        let ok = json!({"owner": "a", "name": "b", "number": 3});
        assert!(validate_input(&card, ok.as_object().unwrap()).is_ok());

        let missing = json!({"owner": "a", "name": "b"});
        let err = validate_input(&card, missing.as_object().unwrap()).unwrap_err();
        assert!(err.contains("number"));

        let wrong_type = json!({"owner": "a", "name": "b", "number": "3"});
        assert!(validate_input(&card, wrong_type.as_object().unwrap()).is_err());

        let blank = json!({"owner": "  ", "name": "b", "number": 3});
        assert!(validate_input(&card, blank.as_object().unwrap()).is_err());

        let extra = json!({"owner": "a", "name": "b", "number": 3, "color": "red"});
        let err = validate_input(&card, extra.as_object().unwrap()).unwrap_err();
        assert!(err.contains("color"));
    }

    #[test]
    fn test_validate_optional_fields() {
        let card = CapabilityRegistry::builtin().get(TaskId::IssueList).unwrap();
        let input = json!({"owner": "a", "name": "b", "states": ["OPEN"], "first": null});
        assert!(validate_input(&card, input.as_object().unwrap()).is_ok());

        let input = json!({"owner": "a", "name": "b", "states": [1]});
        assert!(validate_input(&card, input.as_object().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_without_probing() {
        let card = CapabilityRegistry::builtin().get(TaskId::RepoView).unwrap();
        let deps = ExecutionDeps::new().with_cli_runner(Arc::new(NullRunner));
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

        let input = json!({"owner": "octo"}).as_object().cloned().unwrap();
        let result = classifier.classify(&card, &input).await.unwrap();
        match result {
            Classification::Rejected { error, reason } => {
                assert_eq!(error.code, ErrorCode::Validation);
                assert_eq!(reason, RouteReason::InputValidation);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(classifier.cli_environment.is_none());
    }

    #[tokio::test]
    async fn test_graphql_when_no_runner() {
        let card = CapabilityRegistry::builtin().get(TaskId::RepoView).unwrap();
        let deps = ExecutionDeps::new()
            .with_transport(Arc::new(NullTransport))
            .with_token(true);
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

        let result = classifier.classify(&card, &repo_input()).await.unwrap();
        assert_eq!(
            result,
            Classification::Routed(RoutePlan {
                route: Route::Graphql,
                reason: RouteReason::CardFallback,
                fallbacks: vec![],
            })
        );
    }

    #[tokio::test]
    async fn test_cli_preferred_with_explicit_flags() {
        let card = CapabilityRegistry::builtin().get(TaskId::RepoView).unwrap();
        let deps = ExecutionDeps::new()
            .with_transport(Arc::new(NullTransport))
            .with_token(true)
            .with_cli_runner(Arc::new(NullRunner))
            .with_cli_flags(Some(true), Some(true));
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

        let first = classifier.classify(&card, &repo_input()).await.unwrap();
        let second = classifier.classify(&card, &repo_input()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            Classification::Routed(RoutePlan {
                route: Route::Cli,
                reason: RouteReason::CardPreferred,
                fallbacks: vec![Route::Graphql],
            })
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_cli_falls_to_graphql() {
        let card = CapabilityRegistry::builtin().get(TaskId::RepoView).unwrap();
        let deps = ExecutionDeps::new()
            .with_transport(Arc::new(NullTransport))
            .with_token(true)
            .with_cli_runner(Arc::new(NullRunner))
            .with_cli_flags(Some(true), Some(false));
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

        match classifier.classify(&card, &repo_input()).await.unwrap() {
            Classification::Routed(plan) => assert_eq!(plan.route, Route::Graphql),
            other => panic!("expected graphql, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_route_uses_reason_override() {
        let card = CapabilityRegistry::builtin().get(TaskId::RepoView).unwrap();
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();

        let deps = ExecutionDeps::new();
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);
        match classifier.classify(&card, &repo_input()).await.unwrap() {
            Classification::Rejected { error, reason } => {
                assert_eq!(error.code, ErrorCode::AdapterUnsupported);
                assert_eq!(reason, RouteReason::DefaultPolicy);
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        let deps = ExecutionDeps::new().with_reason_override(RouteReason::EnvConstraint);
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);
        match classifier.classify(&card, &repo_input()).await.unwrap() {
            Classification::Rejected { reason, .. } => {
                assert_eq!(reason, RouteReason::EnvConstraint)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_preflight_assumes_ready() {
        let card = CapabilityRegistry::builtin().get(TaskId::RepoView).unwrap();
        let deps = ExecutionDeps::new()
            .with_cli_runner(Arc::new(NullRunner))
            .with_skip_preflight(true);
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();
        let mut classifier = RouteClassifier::new(&deps, &handlers, &detector);

        assert_eq!(
            classifier.cli_environment().await.unwrap(),
            CliEnvironment::ready()
        );
        match classifier.classify(&card, &repo_input()).await.unwrap() {
            Classification::Routed(plan) => assert_eq!(plan.route, Route::Cli),
            other => panic!("expected cli, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_requires_handler() {
        let card = CapabilityRegistry::builtin().get(TaskId::PrView).unwrap();
        let deps = ExecutionDeps::new().with_cli_runner(Arc::new(NullRunner));
        let handlers = handlers();
        let detector = CliEnvironmentDetector::default();
        let classifier = RouteClassifier::new(&deps, &handlers, &detector);
        assert!(!classifier.structurally_supports(&card, Route::Cli));
        assert!(!classifier.structurally_supports(&card, Route::Rest));
    }
}
