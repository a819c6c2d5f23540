//! Errors surfaced to workflow code.

use thiserror::Error;

/// Errors returned by [`WorkflowContext`](crate::worker::WorkflowContext)
/// operations and by the embedded worker.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// An activity failed and will not be retried again.
    #[error("Activity '{activity}' failed after {attempts} attempt(s): {message}")]
    ActivityFailed {
        activity: String,
        message: String,
        attempts: u32,
        non_retryable: bool,
    },

    /// The activity exceeded its schedule-to-close timeout.
    #[error("Activity '{activity}' timed out after {attempts} attempt(s)")]
    ActivityTimedOut { activity: String, attempts: u32 },

    /// The workflow was cancelled while waiting.
    #[error("Workflow cancelled")]
    Cancelled,

    /// Input or output could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No workflow with the given id is known to the worker.
    #[error("Workflow not found: {0}")]
    NotFound(String),

    /// The workflow already finished and takes no more signals.
    #[error("Workflow already closed: {0}")]
    Closed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Whether the failure came from a non-retryable activity failure.
    #[must_use]
    pub fn is_non_retryable(&self) -> bool {
        matches!(
            self,
            Self::ActivityFailed {
                non_retryable: true,
                ..
            }
        )
    }
}

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_failed_display() {
        let err = WorkflowError::ActivityFailed {
            activity: "CurrencyConversion_convert".to_string(),
            message: "Unsupported currency JPY".to_string(),
            attempts: 1,
            non_retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "Activity 'CurrencyConversion_convert' failed after 1 attempt(s): Unsupported currency JPY"
        );
        assert!(err.is_non_retryable());
        assert!(!WorkflowError::Cancelled.is_non_retryable());
    }
}
