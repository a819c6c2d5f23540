//! Sample workflows.
//!
//! Every workflow is started with the KuFlow process id as workflow id and
//! a [`WorkflowRequest`] as input. Human tasks are created in KuFlow and the
//! workflow suspends until KuFlow reports the task as completed through a
//! [`SIGNAL_PROCESS_ITEM`] signal.

pub mod email;
pub mod loan;
pub mod uivision;

use std::collections::HashSet;

use durable_kuflow::error::WorkflowResult;
use durable_kuflow::worker::WorkflowContext;
use durable_kuflow::workflow::Signal;
use kuflow_rest::models::{ProcessItem, ProcessItemCreateParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activities::KuFlowActivities;

pub use email::SampleEngineWorkerEmailWorkflow;
pub use loan::SampleEngineWorkerLoanWorkflow;
pub use uivision::UIVisionSampleWorkflow;

/// Signal KuFlow sends when a process item changes.
pub const SIGNAL_PROCESS_ITEM: &str = "SignalProcessItem";

/// Workflow input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub process_id: Uuid,
}

/// Workflow output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub message: String,
}

impl WorkflowResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn into_value(self) -> WorkflowResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Kind of process item a signal refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalProcessItemType {
    Task,
    Message,
    #[serde(other)]
    Unknown,
}

/// Payload of [`SIGNAL_PROCESS_ITEM`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalProcessItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: SignalProcessItemType,
}

impl SignalProcessItem {
    /// Completion signal for the task `id`.
    #[must_use]
    pub fn task(id: Uuid) -> Self {
        Self {
            id,
            item_type: SignalProcessItemType::Task,
        }
    }

    #[must_use]
    pub fn into_signal(self) -> Signal {
        Signal::new(
            SIGNAL_PROCESS_ITEM,
            serde_json::json!({ "id": self.id, "type": self.item_type }),
        )
    }
}

/// Ids of the tasks reported completed so far. Signals about other item
/// types are ignored.
#[must_use]
pub fn completed_task_ids(signals: &[Signal]) -> HashSet<Uuid> {
    signals
        .iter()
        .filter_map(|s| s.payload_as::<SignalProcessItem>(SIGNAL_PROCESS_ITEM))
        .filter(|p| p.item_type == SignalProcessItemType::Task)
        .map(|p| p.id)
        .collect()
}

/// Suspend until the task `process_item_id` is reported completed.
pub async fn wait_for_task(ctx: &WorkflowContext, process_item_id: Uuid) -> WorkflowResult<()> {
    tracing::debug!(workflow_id = ctx.workflow_id(), %process_item_id, "Waiting for task");
    ctx.await_condition(move |signals| completed_task_ids(signals).contains(&process_item_id))
        .await
}

/// Create a task, wait until a user completes it and return it with the
/// submitted data.
///
/// A fresh id is assigned when `params` has none, so a retried creation
/// never duplicates the task.
pub async fn create_task_and_wait(
    ctx: &WorkflowContext,
    kuflow: &KuFlowActivities<'_>,
    params: ProcessItemCreateParams,
) -> WorkflowResult<ProcessItem> {
    let process_item_id = params.id.unwrap_or_else(|| ctx.new_uuid());
    let params = params.with_id(process_item_id);

    kuflow.create_process_item(&params).await?;
    wait_for_task(ctx, process_item_id).await?;
    kuflow.retrieve_process_item(process_item_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_task_signals_count() {
        let task = Uuid::now_v7();
        let message = Uuid::now_v7();
        let signals = vec![
            SignalProcessItem::task(task).into_signal(),
            Signal::new(SIGNAL_PROCESS_ITEM, json!({"id": message, "type": "MESSAGE"})),
            Signal::new("Other", json!({"id": Uuid::now_v7(), "type": "TASK"})),
            Signal::new(SIGNAL_PROCESS_ITEM, json!({"id": "not-a-uuid", "type": "TASK"})),
        ];

        let ids = completed_task_ids(&signals);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&task));
    }

    #[test]
    fn test_signal_wire_shape() {
        let id = Uuid::now_v7();
        let signal = SignalProcessItem::task(id).into_signal();
        assert_eq!(signal.name, "SignalProcessItem");
        assert_eq!(signal.payload, json!({"id": id, "type": "TASK"}));
    }

    #[test]
    fn test_request_wire_shape() {
        let process_id = Uuid::now_v7();
        let request: WorkflowRequest =
            serde_json::from_value(json!({"processId": process_id})).unwrap();
        assert_eq!(request.process_id, process_id);
    }
}
