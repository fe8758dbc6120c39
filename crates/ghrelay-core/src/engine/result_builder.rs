//! Chain result assembly

use super::step::StepState;
use crate::envelope::{ChainMeta, ChainResult, ChainStatus, ResultEnvelope, Route};

/// Assemble the chain result from final step states, in step order
pub(super) fn build_chain_result(steps: Vec<StepState>) -> ChainResult {
    let results: Vec<ResultEnvelope> = steps.into_iter().map(StepState::into_envelope).collect();
    assemble(results)
}

/// Status and route laws over finished envelopes
pub(super) fn assemble(results: Vec<ResultEnvelope>) -> ChainResult {
    let total = results.len();
    let succeeded = results.iter().filter(|r| r.ok).count();
    let cli_steps = results
        .iter()
        .filter(|r| r.meta.route_used == Some(Route::Cli))
        .count();

    ChainResult {
        status: ChainStatus::from_results(&results),
        meta: ChainMeta {
            route_used: if cli_steps == total {
                Route::Cli
            } else {
                Route::Graphql
            },
            total,
            succeeded,
            failed: total - succeeded,
        },
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeError, ResultMeta};
    use crate::taxonomy::ErrorCode;
    use serde_json::json;

    fn ok_via(route: Route) -> ResultEnvelope {
        ResultEnvelope::success(json!({}), ResultMeta::new("repo.view").with_route(route))
    }

    #[test]
    fn test_route_used_law() {
        let all_cli = assemble(vec![ok_via(Route::Cli), ok_via(Route::Cli)]);
        assert_eq!(all_cli.meta.route_used, Route::Cli);
        assert_eq!(all_cli.status, ChainStatus::Success);

        let mixed = assemble(vec![ok_via(Route::Cli), ok_via(Route::Graphql)]);
        assert_eq!(mixed.meta.route_used, Route::Graphql);
    }

    #[test]
    fn test_empty_chain() {
        let empty = assemble(Vec::new());
        assert_eq!(empty.status, ChainStatus::Failed);
        assert_eq!(empty.meta.route_used, Route::Cli);
        assert_eq!(empty.meta.total, 0);
    }

    #[test]
    fn test_counts() {
        let rejected = ResultEnvelope::failure(
            EnvelopeError::new(ErrorCode::Validation, "bad"),
            ResultMeta::new("issue.view"),
        );
        let result = assemble(vec![ok_via(Route::Cli), rejected]);
        assert_eq!(result.status, ChainStatus::Partial);
        assert_eq!(result.meta.succeeded, 1);
        assert_eq!(result.meta.failed, 1);
        assert_eq!(result.meta.route_used, Route::Graphql);
    }
}
