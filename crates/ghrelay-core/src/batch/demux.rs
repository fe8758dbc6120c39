//! Splitting one batch response back into per-step outcomes

use crate::envelope::EnvelopeError;
use crate::registry::OperationKind;
use crate::taxonomy::ErrorCode;
use crate::transport::{GraphqlError, GraphqlResponse};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Result of one aliased step
pub type StepOutcome = std::result::Result<Value, EnvelopeError>;

/// Attribute `response` to `aliases`.
///
/// An error whose path names an alias fails that alias. An alias present in
/// the data payload succeeds, even with a `null` value. Errors without a
/// usable path fail every alias missing from the payload. The output follows
/// the order of `aliases`.
#[must_use]
pub fn demux(response: &GraphqlResponse, aliases: &[String], kind: OperationKind) -> Vec<StepOutcome> {
    let data = response.data.as_ref().and_then(Value::as_object);

    let mut attributed: HashMap<&str, Vec<&GraphqlError>> = HashMap::new();
    let mut unattributed = Vec::new();
    for error in &response.errors {
        match error.root_field() {
            Some(field) if aliases.iter().any(|a| a == field) => {
                attributed.entry(field).or_default().push(error)
            }
            _ => unattributed.push(error),
        }
    }

    aliases
        .iter()
        .map(|alias| {
            if let Some(errors) = attributed.get(alias.as_str()) {
                return Err(combine(errors));
            }

            match data.and_then(|d| d.get(alias)) {
                Some(value) => Ok(value.clone()),
                None if !unattributed.is_empty() => Err(combine(&unattributed)),
                None => Err(EnvelopeError::new(
                    ErrorCode::Unknown,
                    match kind {
                        OperationKind::Query => format!("missing result for alias {}", alias),
                        OperationKind::Mutation => {
                            format!("missing mutation result for alias {}", alias)
                        }
                    },
                )),
            }
        })
        .collect()
}

fn combine(errors: &[&GraphqlError]) -> EnvelopeError {
    let message = errors
        .iter()
        .map(|e| e.describe())
        .collect::<Vec<_>>()
        .join("; ");
    let details: Vec<Value> = errors
        .iter()
        .map(|e| serde_json::to_value(e).unwrap_or_else(|_| json!({ "message": e.message })))
        .collect();
    EnvelopeError::classified(message).with_details(json!({ "errors": details }))
}
