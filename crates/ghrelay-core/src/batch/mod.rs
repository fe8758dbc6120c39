//! Batch - Aliased query/mutation batching
//!
//! Structured steps of one kind are compiled into a single document with one
//! aliased root field per step, sent in one transport call, and split back
//! into per-step outcomes.
//!
//! # Module Structure
//!
//! - `compile`: Alias rewriting and document merging
//! - `demux`: Partial-failure attribution of one response

mod compile;
mod demux;

pub use compile::{alias_for, compile_step, merge, BatchDocument, CompiledStep, BATCH_OPERATION_NAME};
pub use demux::{demux, StepOutcome};

use crate::envelope::EnvelopeError;
use crate::registry::OperationKind;
use crate::transport::Transport;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One step entering a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// Chain index of the owning step; the alias is derived from it
    pub index: usize,
    /// Single-root-field document
    pub document: String,
    /// Values for the document's declared variables
    pub inputs: Map<String, Value>,
}

impl BatchEntry {
    /// Create an entry
    #[must_use]
    pub fn new(index: usize, document: impl Into<String>, inputs: Map<String, Value>) -> Self {
        Self {
            index,
            document: document.into(),
            inputs,
        }
    }
}

/// Run `entries` as one batch and return each entry's outcome keyed by index.
///
/// An entry that fails to compile fails alone; a transport failure fails
/// every compiled entry with the same classified error. An empty batch makes
/// no call.
pub async fn execute_batch(
    transport: &dyn Transport,
    kind: OperationKind,
    entries: &[BatchEntry],
) -> BTreeMap<usize, StepOutcome> {
    let mut outcomes = BTreeMap::new();
    let mut compiled = Vec::with_capacity(entries.len());

    for entry in entries {
        let alias = alias_for(entry.index);
        match compile_step(&alias, &entry.document, kind, &entry.inputs) {
            Ok(step) => compiled.push((entry.index, step)),
            Err(e) => {
                warn!(index = entry.index, error = %e, "Step document did not compile");
                outcomes.insert(entry.index, Err(EnvelopeError::from(e)));
            }
        }
    }

    if compiled.is_empty() {
        return outcomes;
    }

    let steps: Vec<CompiledStep> = compiled.iter().map(|(_, s)| s.clone()).collect();
    let document = merge(kind, &steps);
    debug!(
        kind = ?kind,
        steps = steps.len(),
        query_len = document.query.len(),
        "Executing batch"
    );

    match transport.execute(&document.query, document.variables).await {
        Ok(response) => {
            let aliases: Vec<String> = steps.iter().map(|s| s.alias.clone()).collect();
            let results = demux(&response, &aliases, kind);
            for ((index, _), outcome) in compiled.iter().zip(results) {
                outcomes.insert(*index, outcome);
            }
        }
        Err(e) => {
            warn!(kind = ?kind, error = %e, "Batch transport call failed");
            let error = EnvelopeError::from(&e);
            for (index, _) in &compiled {
                outcomes.insert(*index, Err(error.clone()));
            }
        }
    }

    outcomes
}
