//! Per-step execution state

use crate::envelope::{EnvelopeError, ResultEnvelope, ResultMeta, Route, RouteReason, TaskRequest};
use crate::registry::{GraphqlConfig, OperationCard};
use crate::taxonomy::ErrorCode;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// Tracks one request through classification, attempts and fallback
#[derive(Debug, Clone)]
pub(super) struct StepState {
    pub index: usize,
    pub task: String,
    pub input: Map<String, Value>,
    pub card: Option<Arc<OperationCard>>,
    /// Route queued for the next attempt
    pub route: Option<Route>,
    pub fallbacks: VecDeque<Route>,
    pub reason: Option<RouteReason>,
    pub attempts: Vec<Route>,
    pub outcome: Option<ResultEnvelope>,
}

impl StepState {
    pub fn new(index: usize, request: TaskRequest) -> Self {
        Self {
            index,
            task: request.task,
            input: request.input,
            card: None,
            route: None,
            fallbacks: VecDeque::new(),
            reason: None,
            attempts: Vec::new(),
            outcome: None,
        }
    }

    /// Waiting to run on `route`
    pub fn is_queued(&self, route: Route) -> bool {
        self.outcome.is_none() && self.route == Some(route)
    }

    pub fn graphql(&self) -> Option<&GraphqlConfig> {
        self.card.as_deref().and_then(|card| card.graphql.as_ref())
    }

    /// Start an attempt on the queued route
    pub fn begin(&mut self, route: Route) {
        self.attempts.push(route);
    }

    pub fn meta(&self, route: Option<Route>) -> ResultMeta {
        let mut meta = ResultMeta::new(self.task.clone());
        meta.route_used = route;
        meta.reason = self.reason;
        if self.attempts.len() > 1 {
            meta.attempts = self.attempts.clone();
        }
        meta
    }

    /// Fail before any route ran
    pub fn reject(&mut self, error: EnvelopeError, reason: RouteReason) {
        self.reason = Some(reason);
        self.route = None;
        self.outcome = Some(ResultEnvelope::failure(error, self.meta(None)));
    }

    pub fn succeed(&mut self, route: Route, data: Value) {
        self.route = None;
        self.outcome = Some(ResultEnvelope::success(data, self.meta(Some(route))));
    }

    /// Terminal failure on `route`
    pub fn fail(&mut self, route: Route, error: EnvelopeError) {
        self.route = None;
        self.outcome = Some(ResultEnvelope::failure(error, self.meta(Some(route))));
    }

    pub fn into_envelope(self) -> ResultEnvelope {
        let meta = self.meta(None);
        self.outcome.unwrap_or_else(|| {
            ResultEnvelope::failure(
                EnvelopeError::new(ErrorCode::Unknown, "step produced no result"),
                meta,
            )
        })
    }
}
