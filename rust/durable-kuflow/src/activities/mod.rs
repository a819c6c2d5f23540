//! Activity types for workflow execution.
//!
//! Activities are the building blocks of workflows - they perform actual work
//! like calling the KuFlow API, converting currencies, or running a robot.

pub mod options;

pub use options::{ActivityOptions, RetryOptions};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Activity execution context.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    /// Workflow ID.
    pub workflow_id: String,
    /// Activity ID.
    pub activity_id: String,
    /// Attempt number (starts at 1).
    pub attempt: u32,
    /// Maximum attempts (0 means unlimited).
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub start_to_close_timeout: Duration,
}

impl Default for ActivityContext {
    fn default() -> Self {
        Self {
            workflow_id: String::new(),
            activity_id: uuid::Uuid::new_v4().to_string(),
            attempt: 1,
            max_attempts: 0,
            start_to_close_timeout: Duration::from_secs(60),
        }
    }
}

/// Result of activity execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivityResult {
    /// Activity completed successfully.
    Success(serde_json::Value),
    /// Activity failed with an error.
    Failure { error: String, retryable: bool },
    /// Activity needs to be retried after the given backoff.
    Retry { reason: String, backoff_secs: u64 },
}

impl ActivityResult {
    /// Create a success result.
    #[must_use]
    pub fn success(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Success(value),
            Err(e) => Self::failure(format!("Failed to serialize activity output: {e}"), false),
        }
    }

    /// Create a failure result.
    #[must_use]
    pub fn failure(error: impl Into<String>, retryable: bool) -> Self {
        Self::Failure {
            error: error.into(),
            retryable,
        }
    }

    /// Create a non-retryable failure result.
    #[must_use]
    pub fn non_retryable(error: impl Into<String>) -> Self {
        Self::failure(error, false)
    }

    /// Create a retry result.
    #[must_use]
    pub fn retry(reason: impl Into<String>, backoff_secs: u64) -> Self {
        Self::Retry {
            reason: reason.into(),
            backoff_secs,
        }
    }

    /// Check if the result is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Check if the result is a failure that must not be retried.
    #[must_use]
    pub fn is_non_retryable(&self) -> bool {
        matches!(
            self,
            Self::Failure {
                retryable: false,
                ..
            }
        )
    }

    /// Error message for failures and retries.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error, .. } => Some(error),
            Self::Retry { reason, .. } => Some(reason),
        }
    }

    /// Parse the input of an activity, turning a malformed payload into a
    /// non-retryable failure.
    pub fn parse_input<T: serde::de::DeserializeOwned>(
        input: serde_json::Value,
    ) -> Result<T, Self> {
        serde_json::from_value(input)
            .map_err(|e| Self::non_retryable(format!("Invalid input: {e}")))
    }
}

/// Activity trait for implementing custom activities.
#[async_trait]
pub trait Activity: Send + Sync {
    /// Activity name for identification.
    fn name(&self) -> &'static str;

    /// Execute the activity.
    async fn execute(&self, ctx: &ActivityContext, input: serde_json::Value) -> ActivityResult;

    /// Get the retry backoff hint for the given attempt.
    fn retry_backoff(&self, attempt: u32) -> Duration {
        // Exponential backoff: 1s, 2s, 4s, 8s, ...
        Duration::from_secs(2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Registry of available activities.
#[derive(Default)]
pub struct ActivityRegistry {
    activities: std::collections::HashMap<String, Box<dyn Activity>>,
}

impl ActivityRegistry {
    /// Create a new activity registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an activity.
    pub fn register<A: Activity + 'static>(&mut self, activity: A) {
        self.register_boxed(Box::new(activity));
    }

    /// Register an already boxed activity.
    pub fn register_boxed(&mut self, activity: Box<dyn Activity>) {
        self.activities.insert(activity.name().to_string(), activity);
    }

    /// Get an activity by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Activity> {
        self.activities.get(name).map(AsRef::as_ref)
    }

    /// Registered activity names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.activities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered activities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Whether no activity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Execute an activity by name.
    pub async fn execute(
        &self,
        name: &str,
        ctx: &ActivityContext,
        input: serde_json::Value,
    ) -> ActivityResult {
        match self.get(name) {
            Some(activity) => activity.execute(ctx, input).await,
            None => ActivityResult::non_retryable(format!("Activity not found: {name}")),
        }
    }
}

impl std::fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("activities", &self.names())
            .finish()
    }
}
