/// Work item plumbing between a workflow engine and the transform registry
///
/// A work item carries named parameters in; a manager carries exactly one
/// completion or failure back out.

pub mod handler;
pub mod manager;

pub use handler::{TransformWorkItemHandler, WorkItemHandler, INPUT_OBJECT, OUTPUT_OBJECT, OUTPUT_TYPE};
pub use manager::{CompletionSlot, WorkItemManager, WorkOutcome};

use std::collections::HashMap;
use uuid::Uuid;

use crate::types::DynValue;

/// A single request from the engine: an id plus named parameters.
#[derive(Debug)]
pub struct WorkItem {
    id: Uuid,
    parameters: HashMap<String, DynValue>,
}

impl WorkItem {
    /// Create a work item with a fresh id and no parameters
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            parameters: HashMap::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn parameter<T: std::any::Any + Send>(mut self, name: impl Into<String>, value: T) -> Self {
        self.set_parameter(name, DynValue::new(value));
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: DynValue) {
        self.parameters.insert(name.into(), value);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get_parameter(&self, name: &str) -> Option<&DynValue> {
        self.parameters.get(name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Remove a parameter and hand over ownership of its value
    pub fn take_parameter(&mut self, name: &str) -> Option<DynValue> {
        self.parameters.remove(name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &String> {
        self.parameters.keys()
    }
}

impl Default for WorkItem {
    fn default() -> Self {
        Self::new()
    }
}
