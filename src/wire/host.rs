//! JSON host adapter
//!
//! Decodes a [`WorkRequest`] into a [`WorkItem`], runs it through the
//! [`TransformWorkItemHandler`] and encodes the outcome as a [`WorkCompletion`].

use std::sync::Arc;
use uuid::Uuid;

use super::codec::JsonCodec;
use super::envelope::{ErrorReport, TypedValue, WorkCompletion, WorkRequest};
use crate::transform_registry::{TransformError, TransformRegistry};
use crate::types::DynValue;
use crate::workitem::{
    CompletionSlot, TransformWorkItemHandler, WorkItem, WorkItemHandler, WorkOutcome,
    INPUT_OBJECT, OUTPUT_OBJECT, OUTPUT_TYPE,
};

#[derive(Debug, Clone)]
pub struct JsonHost {
    handler: TransformWorkItemHandler,
    codec: JsonCodec,
}

impl JsonHost {
    pub fn new(handler: TransformWorkItemHandler, codec: JsonCodec) -> Self {
        Self { handler, codec }
    }

    pub fn registry(&self) -> &Arc<TransformRegistry> {
        self.handler.registry()
    }

    pub fn handler(&self) -> &TransformWorkItemHandler {
        &self.handler
    }

    pub fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    /// Run one work request to completion.
    ///
    /// Always returns a completion: either `completed` with `OutputObject` or
    /// `failed` with an error report.
    pub fn process(&self, request: WorkRequest) -> WorkCompletion {
        let id = request.id.unwrap_or_else(Uuid::new_v4);

        let (item, output_type) = match self.work_item(id, request) {
            Ok(prepared) => prepared,
            Err(e) => {
                if self.handler.logs_errors() {
                    tracing::error!("Work item {} rejected: {}", id, e);
                }
                return WorkCompletion::failed(id, &e);
            }
        };

        let slot = CompletionSlot::new();
        self.handler.execute_work_item(item, &slot);

        match slot.into_outcome() {
            Some((_, WorkOutcome::Completed(mut results))) => match results.remove(OUTPUT_OBJECT) {
                Some(output) => self.encode_output(id, output_type, output),
                None => WorkCompletion::failed_with(id, incomplete(id)),
            },
            Some((_, WorkOutcome::Failed(e))) => WorkCompletion::failed(id, &e),
            None => WorkCompletion::failed_with(id, incomplete(id)),
        }
    }

    /// Acknowledge a cancellation. Nothing is interrupted.
    pub fn abort(&self, id: Uuid) -> WorkCompletion {
        let slot = CompletionSlot::new();
        self.handler.abort_work_item(id, &slot);
        WorkCompletion::aborted(id)
    }

    /// Completion for input that could not be parsed as a work request at all.
    pub fn reject(&self, message: impl Into<String>) -> WorkCompletion {
        let id = Uuid::new_v4();
        let report = ErrorReport {
            kind: "invalid_request".to_string(),
            message: message.into(),
        };
        if self.handler.logs_errors() {
            tracing::error!("Work request {} rejected: {}", id, report.message);
        }
        WorkCompletion::failed_with(id, report)
    }

    fn work_item(&self, id: Uuid, request: WorkRequest) -> Result<(WorkItem, String), TransformError> {
        let (input, output_type) = match (request.input, request.output_type) {
            (Some(input), Some(output_type)) => (input, output_type),
            (input, output_type) => {
                let mut missing = Vec::new();
                if input.is_none() {
                    missing.push(INPUT_OBJECT.to_string());
                }
                if output_type.is_none() {
                    missing.push(OUTPUT_TYPE.to_string());
                }
                return Err(TransformError::MissingParameters(missing));
            }
        };

        let input = self.decode_input(input)?;

        let mut item = WorkItem::with_id(id);
        item.set_parameter(INPUT_OBJECT, input);
        item.set_parameter(OUTPUT_TYPE, DynValue::new(output_type.clone()));
        Ok((item, output_type))
    }

    fn decode_input(&self, input: TypedValue) -> Result<DynValue, TransformError> {
        let key = self
            .registry()
            .resolve(&input.type_name)
            .ok_or(TransformError::UnresolvedType(input.type_name))?;
        self.codec.decode(key, input.value)
    }

    fn encode_output(&self, id: Uuid, output_type: String, output: DynValue) -> WorkCompletion {
        match self.codec.encode(&output) {
            Ok(value) => WorkCompletion::completed(id, TypedValue::new(output_type, value)),
            Err(e) => {
                if self.handler.logs_errors() {
                    tracing::error!("Work item {} output not encodable: {}", id, e);
                }
                WorkCompletion::failed(id, &e)
            }
        }
    }
}

fn incomplete(id: Uuid) -> ErrorReport {
    ErrorReport {
        kind: "incomplete".to_string(),
        message: format!("Work item {} produced no {}", id, OUTPUT_OBJECT),
    }
}
