//! Resolution - Pre-mutation lookups and variable injection
//!
//! Mutations address node ids while requests carry owner/name/number. A card
//! with a [`ResolutionSpec`] gets a lookup query in the query batch; the
//! extracted values are injected into the mutation variables before the
//! mutation batch runs.

use crate::envelope::EnvelopeError;
use crate::registry::ResolutionSpec;
use crate::taxonomy::ErrorCode;
use serde_json::{Map, Value};

/// Build lookup variables from the request input
pub fn lookup_variables(
    spec: &ResolutionSpec,
    input: &Map<String, Value>,
) -> std::result::Result<Map<String, Value>, EnvelopeError> {
    let mut variables = Map::new();
    for binding in &spec.lookup.vars {
        let value = input
            .get(&binding.input_key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                EnvelopeError::new(
                    ErrorCode::Validation,
                    format!("lookup requires input field '{}'", binding.input_key),
                )
            })?;
        variables.insert(binding.variable.clone(), value.clone());
    }
    Ok(variables)
}

/// Walk a dotted path; null counts as absent
#[must_use]
pub fn extract<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// Inject lookup results into `variables` at the declared targets
pub fn inject(
    spec: &ResolutionSpec,
    lookup_result: &Value,
    variables: &mut Map<String, Value>,
) -> std::result::Result<(), EnvelopeError> {
    for target in &spec.inject {
        let value = extract(lookup_result, &target.source).ok_or_else(|| {
            EnvelopeError::new(
                ErrorCode::NotFound,
                format!("lookup did not return {}", target.source),
            )
        })?;
        variables.insert(target.target.clone(), value.clone());
    }
    Ok(())
}
