//! Activity timeout and retry options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Retry policy applied between activity attempts.
///
/// Defaults follow the workflow engine: one second initial interval, a
/// backoff coefficient of 2, an interval ceiling of 100 times the initial
/// interval and unlimited attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOptions {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after every attempt.
    pub backoff_coefficient: f64,
    /// Upper bound for the delay between attempts.
    pub maximum_interval: Duration,
    /// Maximum number of attempts, 0 means unlimited.
    pub maximum_attempts: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        let initial_interval = Duration::from_secs(1);
        Self {
            initial_interval,
            backoff_coefficient: 2.0,
            maximum_interval: initial_interval * 100,
            maximum_attempts: 0,
        }
    }
}

impl RetryOptions {
    /// Delay to wait after the given (1-based) failed attempt.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_coefficient.max(1.0).powi(exponent);
        let delay = self.initial_interval.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.maximum_interval.as_secs_f64() {
            self.maximum_interval
        } else {
            Duration::from_secs_f64(delay)
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    #[must_use]
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.maximum_attempts == 0 || attempt < self.maximum_attempts
    }

    /// Set the maximum number of attempts.
    #[must_use]
    pub fn with_maximum_attempts(mut self, maximum_attempts: u32) -> Self {
        self.maximum_attempts = maximum_attempts;
        self
    }

    /// Set the initial interval, keeping the default interval ceiling ratio.
    #[must_use]
    pub fn with_initial_interval(mut self, initial_interval: Duration) -> Self {
        self.initial_interval = initial_interval;
        self.maximum_interval = initial_interval * 100;
        self
    }
}

/// Options declared by a workflow for every activity invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOptions {
    /// Maximum duration of a single attempt.
    pub start_to_close_timeout: Duration,
    /// Maximum duration of the whole invocation including retries.
    pub schedule_to_close_timeout: Duration,
    /// Retry policy.
    pub retry: RetryOptions,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            start_to_close_timeout: Duration::from_secs(10 * 60),
            schedule_to_close_timeout: DAY * 365,
            retry: RetryOptions::default(),
        }
    }
}

impl ActivityOptions {
    /// Options for activities that may wait on humans for up to a day.
    #[must_use]
    pub fn long_running() -> Self {
        Self {
            start_to_close_timeout: DAY,
            ..Self::default()
        }
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = timeout;
        self
    }

    /// Set the overall timeout.
    #[must_use]
    pub fn with_schedule_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }
}
