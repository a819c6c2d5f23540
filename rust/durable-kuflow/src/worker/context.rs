//! Execution context handed to running workflows.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::activities::{ActivityContext, ActivityOptions, ActivityRegistry, ActivityResult};
use crate::backends::EventLog;
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::Signal;
use crate::Event;

/// Handle a workflow uses to run activities, wait on signals and mint ids.
///
/// Cloning is cheap; clones share the same execution.
#[derive(Clone)]
pub struct WorkflowContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    workflow_id: String,
    workflow_type: String,
    task_queue: String,
    activities: Arc<ActivityRegistry>,
    event_log: Arc<dyn EventLog>,
    signals: watch::Sender<Vec<Signal>>,
    cancelled: watch::Sender<bool>,
    activity_seq: AtomicU64,
    /// Recorded steps not yet reached by a resumed workflow.
    history: Mutex<VecDeque<Event>>,
    /// Ids minted since the last recorded step.
    unrecorded_uuids: Mutex<Vec<uuid::Uuid>>,
}

/// Outcome of an activity found in the recorded history.
enum Recorded {
    Completed(serde_json::Value),
    Failed {
        error: String,
        attempts: u32,
        retryable: bool,
    },
    /// Scheduled before the restart without a recorded outcome.
    InFlight(String),
}

impl WorkflowContext {
    pub(crate) fn new(
        workflow_id: &str,
        workflow_type: &str,
        task_queue: &str,
        activities: Arc<ActivityRegistry>,
        event_log: Arc<dyn EventLog>,
    ) -> Self {
        let (signals, _) = watch::channel(Vec::new());
        let (cancelled, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                workflow_id: workflow_id.to_string(),
                workflow_type: workflow_type.to_string(),
                task_queue: task_queue.to_string(),
                activities,
                event_log,
                signals,
                cancelled,
                activity_seq: AtomicU64::new(0),
                history: Mutex::new(VecDeque::new()),
                unrecorded_uuids: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Prepare a resumed execution: recorded signals are delivered at once,
    /// activity outcomes and minted ids are kept for replay.
    pub(crate) fn restore(&self, events: Vec<Event>) {
        let mut history = self.inner.history.lock();
        for event in events {
            match event {
                Event::SignalReceived { name, payload } => self.deliver(Signal::new(name, payload)),
                Event::WorkflowStarted { .. } => {}
                step => history.push_back(step),
            }
        }
    }

    /// Whether recorded steps remain to be replayed.
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        !self.inner.history.lock().is_empty()
    }

    /// Id of the running workflow.
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.inner.workflow_id
    }

    /// Type of the running workflow.
    #[must_use]
    pub fn workflow_type(&self) -> &str {
        &self.inner.workflow_type
    }

    /// Task queue the workflow runs on.
    #[must_use]
    pub fn task_queue(&self) -> &str {
        &self.inner.task_queue
    }

    /// Time-ordered UUID (v7), used for ids the workflow hands to external
    /// systems.
    ///
    /// The id is recorded with the next activity, so a resumed workflow gets
    /// the same id back.
    #[must_use]
    pub fn new_uuid(&self) -> uuid::Uuid {
        {
            let mut history = self.inner.history.lock();
            match history.pop_front() {
                Some(Event::UuidGenerated { uuid }) => return uuid,
                Some(other) => {
                    self.diverged("new_uuid", &other);
                    history.clear();
                }
                None => {}
            }
        }
        let uuid = uuid::Uuid::now_v7();
        self.inner.unrecorded_uuids.lock().push(uuid);
        uuid
    }

    /// Run an activity by name with the given options.
    ///
    /// Each attempt is bounded by `start_to_close_timeout`, the whole call by
    /// `schedule_to_close_timeout`. Retryable failures and attempt timeouts
    /// are retried with the policy's backoff until `maximum_attempts` is
    /// reached; a non-retryable failure ends the call immediately.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::ActivityFailed`] when the activity gives up
    /// - [`WorkflowError::ActivityTimedOut`] when the overall deadline passes
    /// - [`WorkflowError::Cancelled`] when the workflow is cancelled meanwhile
    /// - [`WorkflowError::Serialization`] when input or output do not convert
    pub async fn execute_activity<I, O>(
        &self,
        name: &str,
        input: &I,
        options: &ActivityOptions,
    ) -> WorkflowResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let seq = self.inner.activity_seq.fetch_add(1, Ordering::Relaxed);

        let activity_id = match self.take_recorded(name) {
            Some(Recorded::Completed(output)) => return Ok(serde_json::from_value(output)?),
            Some(Recorded::Failed {
                error,
                attempts,
                retryable,
            }) => {
                return Err(WorkflowError::ActivityFailed {
                    activity: name.to_string(),
                    message: error,
                    attempts,
                    non_retryable: !retryable,
                })
            }
            Some(Recorded::InFlight(activity_id)) => {
                tracing::info!(
                    workflow_id = %self.inner.workflow_id,
                    activity = name,
                    %activity_id,
                    "Re-running activity interrupted by restart"
                );
                activity_id
            }
            None => {
                self.record_uuids().await?;
                let activity_id = format!("{}-{seq}", self.inner.workflow_id);
                self.record(Event::ActivityScheduled {
                    activity_id: activity_id.clone(),
                    activity_type: name.to_string(),
                    input: input.clone(),
                })
                .await?;
                activity_id
            }
        };

        let started = Instant::now();
        let deadline = started + options.schedule_to_close_timeout;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.timed_out(&activity_id, name, attempt - 1).await;
            }
            let attempt_timeout = options.start_to_close_timeout.min(remaining);

            let actx = ActivityContext {
                workflow_id: self.inner.workflow_id.clone(),
                activity_id: activity_id.clone(),
                attempt,
                max_attempts: options.retry.maximum_attempts,
                start_to_close_timeout: attempt_timeout,
            };

            let run = tokio::time::timeout(
                attempt_timeout,
                self.inner.activities.execute(name, &actx, input.clone()),
            );
            let outcome = tokio::select! {
                outcome = run => outcome,
                () = self.cancelled() => return Err(WorkflowError::Cancelled),
            };

            let (message, retryable, hint) = match outcome {
                Ok(ActivityResult::Success(output)) => {
                    self.record(Event::ActivityCompleted {
                        activity_id,
                        output: output.clone(),
                        attempts: attempt,
                        duration_ms: u64::try_from(started.elapsed().as_millis())
                            .unwrap_or(u64::MAX),
                    })
                    .await?;
                    return Ok(serde_json::from_value(output)?);
                }
                Ok(ActivityResult::Failure { error, retryable }) => (error, retryable, None),
                Ok(ActivityResult::Retry {
                    reason,
                    backoff_secs,
                }) => (reason, true, Some(Duration::from_secs(backoff_secs))),
                Err(_) => (
                    format!("Attempt timed out after {}s", attempt_timeout.as_secs()),
                    true,
                    None,
                ),
            };

            if !retryable || !options.retry.allows_attempt(attempt) {
                self.record(Event::ActivityFailed {
                    activity_id,
                    error: message.clone(),
                    attempts: attempt,
                    retryable,
                })
                .await?;
                return Err(WorkflowError::ActivityFailed {
                    activity: name.to_string(),
                    message,
                    attempts: attempt,
                    non_retryable: !retryable,
                });
            }

            let delay = hint.unwrap_or_else(|| options.retry.backoff(attempt));
            if Instant::now() + delay >= deadline {
                return self.timed_out(&activity_id, name, attempt).await;
            }

            tracing::warn!(
                workflow_id = %self.inner.workflow_id,
                activity = name,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %message,
                "Activity attempt failed, retrying"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancelled() => return Err(WorkflowError::Cancelled),
            }
        }
    }

    async fn timed_out<T>(&self, activity_id: &str, name: &str, attempts: u32) -> WorkflowResult<T> {
        self.record(Event::ActivityFailed {
            activity_id: activity_id.to_string(),
            error: "schedule-to-close timeout".to_string(),
            attempts,
            retryable: true,
        })
        .await?;
        Err(WorkflowError::ActivityTimedOut {
            activity: name.to_string(),
            attempts,
        })
    }

    /// Suspend until `condition` holds over the signals delivered so far.
    ///
    /// Signals delivered before the call count, so a signal that arrives
    /// before the workflow starts waiting is never lost.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Cancelled`] if the workflow is cancelled
    /// before the condition holds.
    pub async fn await_condition<F>(&self, condition: F) -> WorkflowResult<()>
    where
        F: Fn(&[Signal]) -> bool + Send,
    {
        let mut rx = self.inner.signals.subscribe();
        let satisfied = async move {
            let result = rx.wait_for(|signals| condition(signals)).await;
            result.is_ok()
        };

        tokio::select! {
            ok = satisfied => if ok { Ok(()) } else { Err(WorkflowError::Cancelled) },
            () = self.cancelled() => Err(WorkflowError::Cancelled),
        }
    }

    /// Snapshot of the signals delivered so far.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> {
        self.inner.signals.borrow().clone()
    }

    /// Whether the workflow has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.borrow()
    }

    pub(crate) fn deliver(&self, signal: Signal) {
        self.inner.signals.send_modify(|signals| signals.push(signal));
    }

    pub(crate) fn cancel(&self) {
        self.inner.cancelled.send_replace(true);
    }

    /// Resolves once the workflow is cancelled.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.inner.cancelled.subscribe();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Next recorded outcome of `name`, if the history covers this call.
    fn take_recorded(&self, name: &str) -> Option<Recorded> {
        let mut history = self.inner.history.lock();
        let activity_id = match history.pop_front()? {
            Event::ActivityScheduled {
                activity_id,
                activity_type,
                ..
            } if activity_type == name => activity_id,
            other => {
                self.diverged(name, &other);
                history.clear();
                return None;
            }
        };

        let recorded = match history.pop_front() {
            Some(Event::ActivityCompleted {
                activity_id: id,
                output,
                ..
            }) if id == activity_id => Recorded::Completed(output),
            Some(Event::ActivityFailed {
                activity_id: id,
                error,
                attempts,
                retryable,
            }) if id == activity_id => Recorded::Failed {
                error,
                attempts,
                retryable,
            },
            Some(other) => {
                history.push_front(other);
                Recorded::InFlight(activity_id)
            }
            None => Recorded::InFlight(activity_id),
        };
        Some(recorded)
    }

    fn diverged(&self, step: &str, recorded: &Event) {
        tracing::warn!(
            workflow_id = %self.inner.workflow_id,
            step,
            recorded = recorded.event_type(),
            "History does not match workflow code, continuing live"
        );
    }

    async fn record_uuids(&self) -> WorkflowResult<()> {
        let uuids = std::mem::take(&mut *self.inner.unrecorded_uuids.lock());
        for uuid in uuids {
            self.record(Event::UuidGenerated { uuid }).await?;
        }
        Ok(())
    }

    async fn record(&self, event: Event) -> WorkflowResult<()> {
        self.inner
            .event_log
            .append(&self.inner.workflow_id, event)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("workflow_id", &self.inner.workflow_id)
            .field("workflow_type", &self.inner.workflow_type)
            .field("task_queue", &self.inner.task_queue)
            .finish_non_exhaustive()
    }
}
