//! Workflow and activity runtime for the KuFlow sample workers.
//!
//! This crate provides:
//! - The [`Workflow`](workflow::Workflow) and [`Activity`](activities::Activity)
//!   traits that sample workflows and activities implement
//! - Activity options with the engine's timeout and retry semantics
//! - Signal delivery and condition awaits inside a running workflow
//! - An embedded worker that executes workflows in-process
//! - Event log backends (in-memory and SQLite) for history and replay
//!
//! # Architecture
//!
//! Workflows are linear async procedures. Every side effect goes through
//! [`WorkflowContext::execute_activity`](worker::WorkflowContext::execute_activity),
//! which applies the declared [`ActivityOptions`](activities::ActivityOptions)
//! and records the outcome in the [`EventLog`]. Signals delivered to a running
//! workflow accumulate in a signal set; the workflow suspends with
//! [`WorkflowContext::await_condition`](worker::WorkflowContext::await_condition)
//! until the set satisfies a predicate.
//!
//! With a persistent log, [`EmbeddedWorker::recover`](worker::EmbeddedWorker::recover)
//! resumes workflows whose history has no terminal event. The workflow runs
//! again from the top: recorded activity outcomes and minted ids are handed
//! back in order, recorded signals are delivered up front, and execution
//! turns live at the first step the history does not cover.
//!
//! # Usage
//!
//! ```rust,ignore
//! use durable_kuflow::prelude::*;
//!
//! let mut registry = ActivityRegistry::new();
//! registry.register(MyActivity::default());
//!
//! let worker = EmbeddedWorker::builder("sample-queue")
//!     .event_log(Arc::new(InMemoryEventLog::new()))
//!     .activities(registry)
//!     .workflow(MyWorkflow)
//!     .build();
//!
//! let handle = worker.start("wf-1", "MyWorkflow", input).await?;
//! worker.signal("wf-1", Signal::new("done", json!({}))).await?;
//! let output = handle.result().await?;
//! ```

pub mod activities;
pub mod backends;
pub mod error;
pub mod worker;
pub mod workflow;

// Re-exports
pub use backends::EventLog;
pub use error::WorkflowError;
pub use worker::EmbeddedWorker;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::activities::{
        Activity, ActivityContext, ActivityOptions, ActivityRegistry, ActivityResult,
        RetryOptions,
    };
    pub use crate::backends::{EventLog, InMemoryEventLog};
    pub use crate::error::WorkflowError;
    pub use crate::worker::{EmbeddedWorker, WorkflowContext, WorkflowHandle, WorkflowState};
    pub use crate::workflow::{Signal, Workflow};
}

/// Workflow history event types.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    /// Workflow started.
    WorkflowStarted {
        workflow_id: String,
        workflow_type: String,
        task_queue: String,
        input: serde_json::Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Activity scheduled.
    ActivityScheduled {
        activity_id: String,
        activity_type: String,
        input: serde_json::Value,
    },
    /// Activity completed.
    ActivityCompleted {
        activity_id: String,
        output: serde_json::Value,
        attempts: u32,
        duration_ms: u64,
    },
    /// Activity failed after its last attempt.
    ActivityFailed {
        activity_id: String,
        error: String,
        attempts: u32,
        retryable: bool,
    },
    /// Id minted by the workflow, returned again when the workflow is
    /// resumed from history.
    UuidGenerated { uuid: uuid::Uuid },
    /// Signal delivered to the workflow.
    SignalReceived {
        name: String,
        payload: serde_json::Value,
    },
    /// Workflow completed.
    WorkflowCompleted {
        output: serde_json::Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Workflow failed.
    WorkflowFailed {
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Workflow cancelled.
    WorkflowCancelled {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl Event {
    /// Get the event type as a string.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorkflowStarted { .. } => "workflow_started",
            Self::ActivityScheduled { .. } => "activity_scheduled",
            Self::ActivityCompleted { .. } => "activity_completed",
            Self::ActivityFailed { .. } => "activity_failed",
            Self::UuidGenerated { .. } => "uuid_generated",
            Self::SignalReceived { .. } => "signal_received",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowFailed { .. } => "workflow_failed",
            Self::WorkflowCancelled { .. } => "workflow_cancelled",
        }
    }

    /// Whether the event closes the workflow history.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::WorkflowCompleted { .. } | Self::WorkflowFailed { .. } | Self::WorkflowCancelled { .. }
        )
    }

    /// Serialize the event to bytes.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize an event from bytes.
    pub fn deserialize(data: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let event = Event::SignalReceived {
            name: "task_completed".to_string(),
            payload: serde_json::json!({}),
        };
        assert_eq!(event.event_type(), "signal_received");
        assert!(!event.is_terminal());

        let event = Event::WorkflowCancelled {
            timestamp: chrono::Utc::now(),
        };
        assert!(event.is_terminal());
    }

    #[test]
    fn test_event_bytes_keep_json_payloads() {
        let event = Event::ActivityScheduled {
            activity_id: "a-1".to_string(),
            activity_type: "CurrencyConversion_convert".to_string(),
            input: serde_json::json!({"amount": "10", "from": "USD", "to": "EUR"}),
        };
        let bytes = event.serialize().unwrap();
        assert_eq!(Event::deserialize(&bytes).unwrap(), event);
    }
}
