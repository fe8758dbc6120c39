//! Structured-route phase: query batch (with lookups), then mutation batch

use super::chain::fall_back_or_fail;
use super::config::ExecutionDeps;
use super::core::Engine;
use super::step::StepState;
use crate::batch::{execute_batch, BatchEntry, StepOutcome};
use crate::envelope::{EnvelopeError, Route};
use crate::registry::OperationKind;
use crate::resolution::{inject, lookup_variables};
use crate::routing::RouteClassifier;
use crate::taxonomy::ErrorCode;
use std::collections::BTreeSet;
use tracing::debug;

impl Engine {
    /// Run every structured-queued step. Returns whether any ran.
    ///
    /// Issues at most one query call and one mutation call. Mutations with a
    /// resolution contribute their lookup to the query call and enter the
    /// mutation call only once their variables are injected.
    pub(super) async fn run_structured_phase(
        &self,
        steps: &mut [StepState],
        classifier: &mut RouteClassifier<'_>,
        deps: &ExecutionDeps,
    ) -> bool {
        let queued: Vec<usize> = steps
            .iter()
            .filter(|s| s.is_queued(Route::Graphql))
            .map(|s| s.index)
            .collect();
        if queued.is_empty() {
            return false;
        }
        for &index in &queued {
            steps[index].begin(Route::Graphql);
        }

        let mut outcomes: Vec<(usize, StepOutcome)> = Vec::new();
        match deps.transport.as_deref() {
            Some(transport) => {
                let mut queries = Vec::new();
                let mut mutations = Vec::new();
                let mut resolving = BTreeSet::new();

                for &index in &queued {
                    let step = &steps[index];
                    let Some(graphql) = step.graphql() else {
                        outcomes.push((index, Err(no_structured_route(step))));
                        continue;
                    };
                    match (graphql.kind, &graphql.resolution) {
                        (OperationKind::Query, _) => queries.push(BatchEntry::new(
                            index,
                            graphql.document.clone(),
                            step.input.clone(),
                        )),
                        (OperationKind::Mutation, None) => mutations.push(BatchEntry::new(
                            index,
                            graphql.document.clone(),
                            step.input.clone(),
                        )),
                        (OperationKind::Mutation, Some(resolution)) => {
                            match lookup_variables(resolution, &step.input) {
                                Ok(variables) => {
                                    queries.push(BatchEntry::new(
                                        index,
                                        resolution.lookup.document.clone(),
                                        variables,
                                    ));
                                    resolving.insert(index);
                                }
                                Err(e) => outcomes.push((index, Err(e))),
                            }
                        }
                    }
                }

                debug!(
                    queries = queries.len(),
                    lookups = resolving.len(),
                    mutations = mutations.len(),
                    "Structured phase"
                );

                for (index, outcome) in execute_batch(transport, OperationKind::Query, &queries).await {
                    if !resolving.contains(&index) {
                        outcomes.push((index, outcome));
                        continue;
                    }
                    let step = &steps[index];
                    let resolved = outcome.and_then(|lookup| {
                        let graphql = step.graphql().ok_or_else(|| no_structured_route(step))?;
                        let resolution = graphql
                            .resolution
                            .as_ref()
                            .ok_or_else(|| no_structured_route(step))?;
                        let mut variables = step.input.clone();
                        inject(resolution, &lookup, &mut variables)?;
                        Ok(BatchEntry::new(index, graphql.document.clone(), variables))
                    });
                    match resolved {
                        Ok(entry) => mutations.push(entry),
                        Err(e) => {
                            debug!(index, error = %e.message, "Lookup failed");
                            outcomes.push((index, Err(e)));
                        }
                    }
                }

                outcomes.extend(execute_batch(transport, OperationKind::Mutation, &mutations).await);
            }
            None => {
                for &index in &queued {
                    outcomes.push((
                        index,
                        Err(EnvelopeError::new(
                            ErrorCode::AdapterUnsupported,
                            "no structured transport configured",
                        )),
                    ));
                }
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        for (index, outcome) in outcomes {
            let step = &mut steps[index];
            match outcome {
                Ok(data) => step.succeed(Route::Graphql, data),
                Err(error) => fall_back_or_fail(step, Route::Graphql, error, classifier).await,
            }
        }
        true
    }
}

fn no_structured_route(step: &StepState) -> EnvelopeError {
    EnvelopeError::new(
        ErrorCode::AdapterUnsupported,
        format!("task {} has no structured route", step.task),
    )
}
