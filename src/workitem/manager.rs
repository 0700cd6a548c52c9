/// Completion channel back to the engine

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::transform_registry::TransformError;
use crate::types::DynValue;

/// Receives the outcome of a work item.
///
/// A handler calls exactly one of these methods per work item it executes.
pub trait WorkItemManager {
    /// Report success with named result values
    fn complete_work_item(&self, id: Uuid, results: HashMap<String, DynValue>);

    /// Report failure with its cause
    fn fail_work_item(&self, id: Uuid, error: TransformError);
}

/// Final state of one work item
#[derive(Debug)]
pub enum WorkOutcome {
    Completed(HashMap<String, DynValue>),
    Failed(TransformError),
}

/// Manager that captures the outcome of a single work item.
///
/// The first report wins; anything after it is logged and dropped.
#[derive(Debug, Default)]
pub struct CompletionSlot {
    outcome: Mutex<Option<(Uuid, WorkOutcome)>>,
}

impl CompletionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, id: Uuid, outcome: WorkOutcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::warn!("Work item {} reported more than once; keeping first outcome", id);
            return;
        }
        *slot = Some((id, outcome));
    }

    pub fn is_filled(&self) -> bool {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Consume the slot, returning the captured id and outcome if any
    pub fn into_outcome(self) -> Option<(Uuid, WorkOutcome)> {
        self.outcome
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkItemManager for CompletionSlot {
    fn complete_work_item(&self, id: Uuid, results: HashMap<String, DynValue>) {
        self.store(id, WorkOutcome::Completed(results));
    }

    fn fail_work_item(&self, id: Uuid, error: TransformError) {
        self.store(id, WorkOutcome::Failed(error));
    }
}
