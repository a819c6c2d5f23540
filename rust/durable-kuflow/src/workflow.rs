//! Workflow definitions and signals.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowResult;
use crate::worker::WorkflowContext;

/// A named message delivered to a running workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name, e.g. `SignalProcessItem`.
    pub name: String,
    /// Signal payload.
    pub payload: serde_json::Value,
}

impl Signal {
    /// Create a signal.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Decode the payload, returning `None` for other signal names or
    /// payloads of a different shape.
    #[must_use]
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        if self.name != name {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// A workflow: a linear async procedure whose side effects all go through
/// activities executed by the [`WorkflowContext`].
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Workflow type name used to start executions.
    fn workflow_type(&self) -> &'static str;

    /// Run the workflow to completion.
    async fn run(
        &self,
        ctx: WorkflowContext,
        input: serde_json::Value,
    ) -> WorkflowResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_payload_as_filters_by_name() {
        let signal = Signal::new("SignalProcessItem", serde_json::json!({"id": "t-1"}));

        assert_eq!(
            signal.payload_as::<Item>("SignalProcessItem"),
            Some(Item {
                id: "t-1".to_string()
            })
        );
        assert_eq!(signal.payload_as::<Item>("Other"), None);
    }
}
