/// Work request and completion envelopes
///
/// Field names follow the work item parameter names so that a request reads the
/// same on the wire as it does to the handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transform_registry::TransformError;

/// JSON value tagged with the name of the type it should decode into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: serde_json::Value,
}

impl TypedValue {
    pub fn new(type_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

/// Request to run one transform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Work item id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(rename = "InputObject", default, skip_serializing_if = "Option::is_none")]
    pub input: Option<TypedValue>,

    /// Name of the type to produce
    #[serde(rename = "OutputType", default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
}

impl WorkRequest {
    /// Create a request with both parameters set
    pub fn new(input: TypedValue, output_type: impl Into<String>) -> Self {
        Self {
            id: None,
            input: Some(input),
            output_type: Some(output_type.into()),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed, // OutputObject set
    Failed,    // error set
    Aborted,   // abort acknowledged, nothing ran
}

/// Failure description carried on a completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
}

impl From<&TransformError> for ErrorReport {
    fn from(e: &TransformError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

/// Response for one work request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCompletion {
    pub id: Uuid,
    pub status: CompletionStatus,

    #[serde(rename = "OutputObject", default, skip_serializing_if = "Option::is_none")]
    pub output: Option<TypedValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,

    pub completed_at: DateTime<Utc>,
}

impl WorkCompletion {
    pub fn completed(id: Uuid, output: TypedValue) -> Self {
        Self {
            id,
            status: CompletionStatus::Completed,
            output: Some(output),
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(id: Uuid, error: &TransformError) -> Self {
        Self::failed_with(id, ErrorReport::from(error))
    }

    pub fn failed_with(id: Uuid, error: ErrorReport) -> Self {
        Self {
            id,
            status: CompletionStatus::Failed,
            output: None,
            error: Some(error),
            completed_at: Utc::now(),
        }
    }

    pub fn aborted(id: Uuid) -> Self {
        Self {
            id,
            status: CompletionStatus::Aborted,
            output: None,
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == CompletionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_uses_parameter_names() {
        let request: WorkRequest = serde_json::from_value(json!({
            "InputObject": {"type": "Integer", "value": 42},
            "OutputType": "String"
        }))
        .unwrap();

        assert!(request.id.is_none());
        assert_eq!(request.input, Some(TypedValue::new("Integer", json!(42))));
        assert_eq!(request.output_type.as_deref(), Some("String"));
    }

    #[test]
    fn test_request_parameters_optional() {
        let request: WorkRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.input.is_none());
        assert!(request.output_type.is_none());
    }

    #[test]
    fn test_failed_completion_json() {
        let id = Uuid::new_v4();
        let err = TransformError::UnresolvedType("Foo".to_string());
        let value = serde_json::to_value(WorkCompletion::failed(id, &err)).unwrap();

        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["kind"], "unresolved_type");
        assert_eq!(value["error"]["message"], "Unknown type: Foo");
        assert!(value.get("OutputObject").is_none());
        assert_eq!(value["id"], id.to_string());
    }

    #[test]
    fn test_completed_completion_json() {
        let completion =
            WorkCompletion::completed(Uuid::new_v4(), TypedValue::new("String", json!("42")));
        let value = serde_json::to_value(&completion).unwrap();

        assert!(completion.is_completed());
        assert_eq!(value["status"], "completed");
        assert_eq!(value["OutputObject"]["type"], "String");
        assert_eq!(value["OutputObject"]["value"], "42");
        assert!(value.get("error").is_none());
    }
}
