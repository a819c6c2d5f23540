//! Feeds KuFlow webhook events into the embedded worker.

use async_trait::async_trait;
use durable_kuflow::{EmbeddedWorker, WorkflowError};
use kuflow_rest::models::{ProcessItemTaskState, ProcessItemType, ProcessState};
use kuflow_rest::WebhookEvent;

use crate::webhooks::{WebhookError, WebhookHandler};
use crate::workflows::{SignalProcessItem, WorkflowRequest};

/// Starts a workflow for every process that starts running and signals it
/// when one of its tasks is completed.
///
/// A completed task of a process without a workflow is answered with
/// `503 Service Unavailable` so KuFlow delivers it again once the workflow
/// is started or resumed.
///
/// Workflows use the process id as workflow id, so the process of a task
/// event names the workflow to signal.
#[derive(Debug, Clone)]
pub struct EngineBridge {
    worker: EmbeddedWorker,
    workflow_type: &'static str,
}

impl EngineBridge {
    #[must_use]
    pub fn new(worker: EmbeddedWorker, workflow_type: &'static str) -> Self {
        Self {
            worker,
            workflow_type,
        }
    }

    #[must_use]
    pub fn worker(&self) -> &EmbeddedWorker {
        &self.worker
    }

    #[must_use]
    pub fn workflow_type(&self) -> &'static str {
        self.workflow_type
    }
}

#[async_trait]
impl WebhookHandler for EngineBridge {
    fn name(&self) -> &'static str {
        "engine-bridge"
    }

    async fn handle(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        match event {
            WebhookEvent::ProcessStateChanged { data, .. }
                if data.process_state == ProcessState::Running =>
            {
                let input = serde_json::to_value(WorkflowRequest {
                    process_id: data.process_id,
                })
                .map_err(WorkflowError::from)?;
                let handle = self
                    .worker
                    .start(&data.process_id.to_string(), self.workflow_type, input)
                    .await?;
                tracing::info!(
                    workflow_id = handle.workflow_id(),
                    workflow_type = self.workflow_type,
                    "Workflow started"
                );
                Ok(())
            }
            WebhookEvent::ProcessItemTaskStateChanged { data, .. }
                if data.process_item_type == ProcessItemType::Task
                    && data.process_item_task_state == ProcessItemTaskState::Completed =>
            {
                let workflow_id = data.process_id.to_string();
                let signal = SignalProcessItem::task(data.process_item_id).into_signal();
                match self.worker.signal(&workflow_id, signal).await {
                    Ok(()) => Ok(()),
                    // Notification tasks are completed after the workflow ends
                    Err(WorkflowError::Closed(_)) => {
                        tracing::debug!(
                            %workflow_id,
                            process_item_id = %data.process_item_id,
                            "Workflow already finished, ignoring completed task"
                        );
                        Ok(())
                    }
                    Err(WorkflowError::NotFound(_)) => {
                        tracing::warn!(
                            %workflow_id,
                            process_item_id = %data.process_item_id,
                            "No workflow for completed task yet, asking for redelivery"
                        );
                        Err(WebhookError::UnknownWorkflow(workflow_id))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            other => {
                tracing::debug!(
                    event_id = other.id(),
                    event_type = other.event_type(),
                    "Ignoring event"
                );
                Ok(())
            }
        }
    }
}
