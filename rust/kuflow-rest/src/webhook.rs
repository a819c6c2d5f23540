//! Webhook event parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::KuFlowResult;
use crate::models::{ProcessItemTaskState, ProcessItemType, ProcessState};

/// Event type of process state changes.
pub const PROCESS_STATE_CHANGED: &str = "PROCESS.STATE_CHANGED";

/// Event type of task state changes.
pub const PROCESS_ITEM_TASK_STATE_CHANGED: &str = "PROCESS_ITEM.TASK_STATE_CHANGED";

/// Data of a `PROCESS.STATE_CHANGED` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStateChangedData {
    pub process_id: Uuid,
    pub process_state: ProcessState,
}

/// Data of a `PROCESS_ITEM.TASK_STATE_CHANGED` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessItemTaskStateChangedData {
    pub process_id: Uuid,
    pub process_item_id: Uuid,
    #[serde(default = "task_item_type")]
    pub process_item_type: ProcessItemType,
    #[serde(alias = "processItemTaskCode")]
    pub process_item_definition_code: String,
    #[serde(alias = "processItemState")]
    pub process_item_task_state: ProcessItemTaskState,
}

fn task_item_type() -> ProcessItemType {
    ProcessItemType::Task
}

/// A webhook event delivered by KuFlow.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// A process changed state.
    ProcessStateChanged {
        id: String,
        data: ProcessStateChangedData,
    },
    /// A task changed state.
    ProcessItemTaskStateChanged {
        id: String,
        data: ProcessItemTaskStateChangedData,
    },
    /// Any other event type; acknowledged and ignored by the samples.
    Unknown { id: String, event_type: String },
}

#[derive(Deserialize)]
struct RawWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

impl WebhookEvent {
    /// Event id, used when logging ignored events.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::ProcessStateChanged { id, .. }
            | Self::ProcessItemTaskStateChanged { id, .. }
            | Self::Unknown { id, .. } => id,
        }
    }

    /// Event type name as sent on the wire.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::ProcessStateChanged { .. } => PROCESS_STATE_CHANGED,
            Self::ProcessItemTaskStateChanged { .. } => PROCESS_ITEM_TASK_STATE_CHANGED,
            Self::Unknown { event_type, .. } => event_type,
        }
    }
}

/// Parse a webhook request body.
///
/// # Errors
///
/// Returns [`KuFlowError::Decode`](crate::KuFlowError::Decode) when the body
/// is not a webhook event or a known event carries malformed data.
pub fn parse_webhook_event(payload: &str) -> KuFlowResult<WebhookEvent> {
    let raw: RawWebhookEvent = serde_json::from_str(payload)?;
    let event = match raw.event_type.as_str() {
        PROCESS_STATE_CHANGED => WebhookEvent::ProcessStateChanged {
            id: raw.id,
            data: serde_json::from_value(raw.data)?,
        },
        PROCESS_ITEM_TASK_STATE_CHANGED => WebhookEvent::ProcessItemTaskStateChanged {
            id: raw.id,
            data: serde_json::from_value(raw.data)?,
        },
        _ => WebhookEvent::Unknown {
            id: raw.id,
            event_type: raw.event_type,
        },
    };
    Ok(event)
}
