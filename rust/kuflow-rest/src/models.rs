//! KuFlow REST API models (API version 2024-06-14).
//!
//! Only the fields the sample workers use are modelled; unknown fields are
//! ignored on input.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Free-form JSON form data with its validation flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default)]
    pub value: HashMap<String, Value>,
}

impl JsonValue {
    /// Wrap a map of values.
    #[must_use]
    pub fn from_value(value: HashMap<String, Value>) -> Self {
        Self { valid: None, value }
    }

    /// Value under `key` rendered as text. Strings are returned as-is,
    /// numbers and booleans in their JSON form; null and missing keys give
    /// `None`.
    #[must_use]
    pub fn value_as_string(&self, key: &str) -> Option<String> {
        match self.value.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Process lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Running,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// A KuFlow process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_definition_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

/// Kind of a process item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessItemType {
    Task,
    Message,
    #[serde(other)]
    Unknown,
}

/// Task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessItemTaskState {
    Ready,
    Claimed,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Task part of a process item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTask {
    pub state: ProcessItemTaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

/// A process item: a task or a message inside a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ProcessItemType,
    pub process_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_item_definition_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<ProcessItemTask>,
}

impl ProcessItem {
    /// Task form value under `key` as text, see [`JsonValue::value_as_string`].
    #[must_use]
    pub fn task_value_as_string(&self, key: &str) -> Option<String> {
        self.task
            .as_ref()?
            .data
            .as_ref()?
            .value_as_string(key)
    }
}

/// Task part of [`ProcessItemCreateParams`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTaskCreateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

/// Body of `POST /process-items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemCreateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub item_type: ProcessItemType,
    pub process_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    pub process_item_definition_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<ProcessItemTaskCreateParams>,
}

impl ProcessItemCreateParams {
    /// Parameters for a task item of the given definition code.
    #[must_use]
    pub fn task(process_id: Uuid, definition_code: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: ProcessItemType::Task,
            process_id,
            owner_id: None,
            process_item_definition_code: definition_code.into(),
            task: Some(ProcessItemTaskCreateParams::default()),
        }
    }

    /// Use a client-chosen id, making the create call safe to repeat.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Assign the new task to a principal.
    #[must_use]
    pub fn with_owner_id(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Initial task form data.
    #[must_use]
    pub fn with_data(mut self, value: HashMap<String, Value>) -> Self {
        self.task = Some(ProcessItemTaskCreateParams {
            data: Some(JsonValue::from_value(value)),
        });
        self
    }
}

/// Body of `POST /process-items/{id}/~task-assign`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTaskAssignParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
}

impl ProcessItemTaskAssignParams {
    /// Assign to a principal id.
    #[must_use]
    pub fn owner(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            owner_email: None,
        }
    }
}

/// Severity of a task log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessItemTaskLogLevel {
    Info,
    Warn,
    Error,
}

/// Body of `POST /process-items/{id}/~task-append-log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTaskAppendLogParams {
    pub message: String,
    pub level: ProcessItemTaskLogLevel,
}

impl ProcessItemTaskAppendLogParams {
    /// An `INFO` log line.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: ProcessItemTaskLogLevel::Info,
        }
    }

    /// An `ERROR` log line.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: ProcessItemTaskLogLevel::Error,
        }
    }
}

/// JSON Patch (RFC 6902) operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonPatchOperationType {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPatchOperation {
    pub op: JsonPatchOperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl JsonPatchOperation {
    /// `add` operation.
    #[must_use]
    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: JsonPatchOperationType::Add,
            from: None,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// `replace` operation.
    #[must_use]
    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: JsonPatchOperationType::Replace,
            ..Self::add(path, value)
        }
    }

    /// `remove` operation.
    #[must_use]
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: JsonPatchOperationType::Remove,
            from: None,
            path: path.into(),
            value: None,
        }
    }
}

/// Authentication kind requested from `POST /authentications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    EngineToken,
    EngineCertificate,
    #[serde(other)]
    Unknown,
}

/// Body of `POST /authentications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationCreateParams {
    #[serde(rename = "type")]
    pub auth_type: AuthenticationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

/// Short-lived token for the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationEngineToken {
    pub token: String,
    pub expired_at: DateTime<Utc>,
}

/// Authentication response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub auth_type: AuthenticationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_token: Option<AuthenticationEngineToken>,
}

/// Error document returned by the API on failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultError {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_process_item_reads_task_values() {
        let item: ProcessItem = serde_json::from_value(json!({
            "id": "0190a1b2-0000-7000-8000-000000000001",
            "type": "TASK",
            "processId": "0190a1b2-0000-7000-8000-000000000002",
            "processItemDefinitionCode": "LOAN_APPLICATION",
            "task": {
                "state": "COMPLETED",
                "data": {"valid": true, "value": {"AMOUNT": 6000, "CURRENCY": "USD", "EMPTY": null}}
            },
            "createdAt": "2024-06-14T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(item.item_type, ProcessItemType::Task);
        assert_eq!(item.task_value_as_string("AMOUNT").as_deref(), Some("6000"));
        assert_eq!(item.task_value_as_string("CURRENCY").as_deref(), Some("USD"));
        assert_eq!(item.task_value_as_string("EMPTY"), None);
        assert_eq!(item.task_value_as_string("MISSING"), None);
    }

    #[test]
    fn test_unknown_enum_values_are_tolerated() {
        let state: ProcessState = serde_json::from_value(json!("PAUSED")).unwrap();
        assert_eq!(state, ProcessState::Unknown);
    }

    #[test]
    fn test_create_params_shape() {
        let process_id = Uuid::nil();
        let params = ProcessItemCreateParams::task(process_id, "APPROVE_LOAN")
            .with_data(HashMap::from([("AMOUNT".to_string(), json!("6000"))]));

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "type": "TASK",
                "processId": "00000000-0000-0000-0000-000000000000",
                "processItemDefinitionCode": "APPROVE_LOAN",
                "task": {"data": {"value": {"AMOUNT": "6000"}}}
            })
        );
    }

    #[test]
    fn test_json_patch_serialization() {
        let ops = vec![
            JsonPatchOperation::add("/FIRST_NAME", "Ada"),
            JsonPatchOperation::remove("/LAST_NAME"),
        ];
        assert_eq!(
            serde_json::to_value(&ops).unwrap(),
            json!([
                {"op": "add", "path": "/FIRST_NAME", "value": "Ada"},
                {"op": "remove", "path": "/LAST_NAME"}
            ])
        );
    }
}
