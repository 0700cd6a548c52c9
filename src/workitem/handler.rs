//! Work item handler that runs a registered transform
//!
//! Takes `InputObject` and `OutputType` from the work item, resolves the output
//! type name through the registry's catalog, executes, and reports the result
//! as `OutputObject`.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::manager::WorkItemManager;
use super::WorkItem;
use crate::transform_registry::{TransformError, TransformRegistry};
use crate::types::DynValue;

/// Parameter carrying the value to convert
pub const INPUT_OBJECT: &str = "InputObject";

/// Parameter naming the type to convert into
pub const OUTPUT_TYPE: &str = "OutputType";

/// Result name reported on completion
pub const OUTPUT_OBJECT: &str = "OutputObject";

const REQUIRED_PARAMETERS: [&str; 2] = [INPUT_OBJECT, OUTPUT_TYPE];

/// Engine-facing handler contract.
pub trait WorkItemHandler {
    /// Execute a work item, reporting exactly one outcome to `manager`.
    fn execute_work_item(&self, item: WorkItem, manager: &dyn WorkItemManager);

    /// Cancellation notification for an in-flight work item.
    fn abort_work_item(&self, id: Uuid, manager: &dyn WorkItemManager);
}

/// Handler backed by a shared [`TransformRegistry`].
#[derive(Debug, Clone)]
pub struct TransformWorkItemHandler {
    registry: Arc<TransformRegistry>,
    log_errors: bool,
}

impl TransformWorkItemHandler {
    pub fn new(registry: Arc<TransformRegistry>) -> Self {
        Self {
            registry,
            log_errors: true,
        }
    }

    /// Whether failures are also written to the error log.
    ///
    /// Failures are reported to the manager either way.
    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    pub fn logs_errors(&self) -> bool {
        self.log_errors
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        &self.registry
    }

    /// Run the transform a work item asks for.
    ///
    /// # Errors
    /// * `MissingParameters` - `InputObject` and/or `OutputType` absent
    /// * `InvalidParameter` - `OutputType` is not a string
    /// * `UnresolvedType` - unknown output type name
    /// * `NoTransform` / `Invocation` - from the registry
    pub fn transform(&self, mut item: WorkItem) -> Result<DynValue, TransformError> {
        validate_required(&item)?;

        let output_type = item
            .take_parameter(OUTPUT_TYPE)
            .ok_or_else(|| TransformError::MissingParameters(vec![OUTPUT_TYPE.to_string()]))?;
        let output_type = read_type_name(output_type)?;
        let input = item
            .take_parameter(INPUT_OBJECT)
            .ok_or_else(|| TransformError::MissingParameters(vec![INPUT_OBJECT.to_string()]))?;

        let output = self
            .registry
            .resolve(&output_type)
            .ok_or(TransformError::UnresolvedType(output_type))?;

        self.registry.execute(input, output)
    }
}

impl WorkItemHandler for TransformWorkItemHandler {
    fn execute_work_item(&self, item: WorkItem, manager: &dyn WorkItemManager) {
        let id = item.id();

        match self.transform(item) {
            Ok(output) => {
                tracing::info!("Work item {} completed with {}", id, output.type_name());
                let mut results = HashMap::new();
                results.insert(OUTPUT_OBJECT.to_string(), output);
                manager.complete_work_item(id, results);
            }
            Err(e) => {
                if self.log_errors {
                    tracing::error!("Work item {} failed: {}", id, e);
                }
                manager.fail_work_item(id, e);
            }
        }
    }

    fn abort_work_item(&self, id: Uuid, _manager: &dyn WorkItemManager) {
        // Running transforms are not interruptible.
        tracing::debug!("Ignoring abort for work item {}", id);
    }
}

fn validate_required(item: &WorkItem) -> Result<(), TransformError> {
    let missing: Vec<String> = REQUIRED_PARAMETERS
        .iter()
        .filter(|name| !item.has_parameter(name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TransformError::MissingParameters(missing))
    }
}

fn read_type_name(value: DynValue) -> Result<String, TransformError> {
    let value = match value.downcast::<String>() {
        Ok(name) => return Ok(name),
        Err(value) => value,
    };

    match value.downcast::<&'static str>() {
        Ok(name) => Ok(name.to_string()),
        Err(value) => Err(TransformError::InvalidParameter {
            name: OUTPUT_TYPE.to_string(),
            reason: format!("expected a type name string, got {}", value.type_name()),
        }),
    }
}
