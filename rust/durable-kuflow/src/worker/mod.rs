//! Embedded workflow worker.
//!
//! Runs registered workflows in-process for one task queue. Each started
//! workflow gets a [`WorkflowContext`], runs on its own tokio task and
//! reports its outcome through a [`WorkflowHandle`].

mod context;

pub use context::WorkflowContext;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

use crate::activities::ActivityRegistry;
use crate::backends::{EventLog, InMemoryEventLog};
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::{Signal, Workflow};
use crate::Event;

/// Default number of workflows allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 100;

/// Default number of finished workflows kept in memory.
pub const DEFAULT_RETAIN_CLOSED: usize = 256;

/// Workflow state for tracking execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Waiting for a concurrency slot.
    Pending,
    /// Workflow is currently executing.
    Running,
    /// Workflow completed successfully.
    Completed,
    /// Workflow failed.
    Failed,
    /// Workflow was cancelled.
    Cancelled,
}

impl WorkflowState {
    /// Whether the workflow has finished.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
enum WorkflowOutcome {
    Completed(serde_json::Value),
    Failed(String),
    Cancelled,
}

/// Handle for awaiting a started workflow.
#[derive(Debug, Clone)]
pub struct WorkflowHandle {
    workflow_id: String,
    outcome: watch::Receiver<Option<WorkflowOutcome>>,
}

impl WorkflowHandle {
    /// Workflow ID.
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Wait for the workflow to finish and return its output.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Cancelled`] for cancelled workflows and
    /// [`WorkflowError::Other`] carrying the failure message otherwise.
    pub async fn result(&self) -> WorkflowResult<serde_json::Value> {
        let mut rx = self.outcome.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(WorkflowOutcome::Completed(output)) => Ok(output),
            Some(WorkflowOutcome::Failed(error)) => Err(anyhow::anyhow!(error).into()),
            Some(WorkflowOutcome::Cancelled) => Err(WorkflowError::Cancelled),
            None => Err(anyhow::anyhow!("Workflow task ended without an outcome").into()),
        }
    }
}

struct Execution {
    workflow_type: String,
    state: WorkflowState,
    ctx: WorkflowContext,
    outcome: watch::Receiver<Option<WorkflowOutcome>>,
    task: Option<JoinHandle<()>>,
}

/// What is left of a finished workflow once its context is dropped.
struct ClosedExecution {
    workflow_type: String,
    state: WorkflowState,
    outcome: watch::Receiver<Option<WorkflowOutcome>>,
}

#[derive(Default)]
struct Executions {
    open: HashMap<String, Execution>,
    closed: HashMap<String, ClosedExecution>,
    /// Closed ids, oldest first.
    closed_order: VecDeque<String>,
}

impl Executions {
    /// Move `workflow_id` to the closed set, evicting the oldest closed
    /// workflows beyond `retain`.
    fn close(&mut self, workflow_id: &str, state: WorkflowState, retain: usize) {
        let Some(execution) = self.open.remove(workflow_id) else {
            return;
        };
        self.closed_order.retain(|id| id != workflow_id);
        self.closed_order.push_back(workflow_id.to_string());
        self.closed.insert(
            workflow_id.to_string(),
            ClosedExecution {
                workflow_type: execution.workflow_type,
                state,
                outcome: execution.outcome,
            },
        );
        while self.closed_order.len() > retain {
            if let Some(evicted) = self.closed_order.pop_front() {
                self.closed.remove(&evicted);
            }
        }
    }

    fn forget_closed(&mut self, workflow_id: &str) {
        if self.closed.remove(workflow_id).is_some() {
            self.closed_order.retain(|id| id != workflow_id);
        }
    }
}

struct WorkerInner {
    task_queue: String,
    event_log: Arc<dyn EventLog>,
    activities: Arc<ActivityRegistry>,
    workflows: HashMap<String, Arc<dyn Workflow>>,
    max_concurrent: usize,
    retain_closed: usize,
    permits: Arc<Semaphore>,
    executions: Mutex<Executions>,
    accepting: AtomicBool,
}

/// Embedded workflow worker.
///
/// Cloning is cheap; clones drive the same worker.
#[derive(Clone)]
pub struct EmbeddedWorker {
    inner: Arc<WorkerInner>,
}

/// Builder for [`EmbeddedWorker`].
pub struct EmbeddedWorkerBuilder {
    task_queue: String,
    event_log: Option<Arc<dyn EventLog>>,
    activities: ActivityRegistry,
    workflows: HashMap<String, Arc<dyn Workflow>>,
    max_concurrent: usize,
    retain_closed: usize,
}

impl std::fmt::Debug for EmbeddedWorkerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut workflows: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        workflows.sort_unstable();
        f.debug_struct("EmbeddedWorkerBuilder")
            .field("task_queue", &self.task_queue)
            .field("event_log", &self.event_log.as_ref().map(|_| "custom"))
            .field("activities", &self.activities)
            .field("workflows", &workflows)
            .field("max_concurrent", &self.max_concurrent)
            .field("retain_closed", &self.retain_closed)
            .finish()
    }
}

impl EmbeddedWorkerBuilder {
    /// Event log used for workflow history. Defaults to in-memory.
    #[must_use]
    pub fn event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    /// Activities available to workflows.
    #[must_use]
    pub fn activities(mut self, activities: ActivityRegistry) -> Self {
        self.activities = activities;
        self
    }

    /// Register a workflow implementation under its type name.
    #[must_use]
    pub fn workflow<W: Workflow + 'static>(mut self, workflow: W) -> Self {
        self.workflows
            .insert(workflow.workflow_type().to_string(), Arc::new(workflow));
        self
    }

    /// Maximum number of workflows running at once; extra workflows wait in
    /// [`WorkflowState::Pending`].
    #[must_use]
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Number of finished workflows whose state and result stay in memory.
    /// Older ones are answered from the event log by
    /// [`EmbeddedWorker::result_of`].
    #[must_use]
    pub fn retain_closed(mut self, retain_closed: usize) -> Self {
        self.retain_closed = retain_closed;
        self
    }

    /// Build the worker.
    #[must_use]
    pub fn build(self) -> EmbeddedWorker {
        tracing::info!(
            task_queue = %self.task_queue,
            workflows = ?self.workflows.keys().collect::<Vec<_>>(),
            activities = ?self.activities.names(),
            max_concurrent = self.max_concurrent,
            retain_closed = self.retain_closed,
            "Creating embedded worker"
        );

        EmbeddedWorker {
            inner: Arc::new(WorkerInner {
                task_queue: self.task_queue,
                event_log: self
                    .event_log
                    .unwrap_or_else(|| Arc::new(InMemoryEventLog::new()) as Arc<dyn EventLog>),
                activities: Arc::new(self.activities),
                workflows: self.workflows,
                max_concurrent: self.max_concurrent,
                retain_closed: self.retain_closed,
                permits: Arc::new(Semaphore::new(self.max_concurrent)),
                executions: Mutex::new(Executions::default()),
                accepting: AtomicBool::new(true),
            }),
        }
    }
}

impl EmbeddedWorker {
    /// Start building a worker for `task_queue`.
    #[must_use]
    pub fn builder(task_queue: impl Into<String>) -> EmbeddedWorkerBuilder {
        EmbeddedWorkerBuilder {
            task_queue: task_queue.into(),
            event_log: None,
            activities: ActivityRegistry::new(),
            workflows: HashMap::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            retain_closed: DEFAULT_RETAIN_CLOSED,
        }
    }

    /// Task queue served by this worker.
    #[must_use]
    pub fn task_queue(&self) -> &str {
        &self.inner.task_queue
    }

    /// Registered workflow types, sorted.
    #[must_use]
    pub fn workflow_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.inner.workflows.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Start a workflow with the given id.
    ///
    /// Starting an id that is still pending or running returns a handle to
    /// the existing execution instead of starting a second one.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for unknown workflow types, or an
    /// error when the worker is shutting down or history cannot be written.
    pub async fn start(
        &self,
        workflow_id: &str,
        workflow_type: &str,
        input: serde_json::Value,
    ) -> WorkflowResult<WorkflowHandle> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Worker is shutting down").into());
        }
        let workflow = self
            .inner
            .workflows
            .get(workflow_type)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("workflow type {workflow_type}")))?;

        let (ctx, outcome_tx, handle) = {
            let mut executions = self.inner.executions.lock();
            if let Some(existing) = executions.open.get(workflow_id) {
                tracing::debug!(workflow_id, "Workflow already running, reusing execution");
                return Ok(WorkflowHandle {
                    workflow_id: workflow_id.to_string(),
                    outcome: existing.outcome.clone(),
                });
            }
            executions.forget_closed(workflow_id);
            self.register(&mut executions, workflow_id, workflow_type)
        };

        let started = self
            .inner
            .event_log
            .append(
                workflow_id,
                Event::WorkflowStarted {
                    workflow_id: workflow_id.to_string(),
                    workflow_type: workflow_type.to_string(),
                    task_queue: self.inner.task_queue.clone(),
                    input: input.clone(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await;
        if let Err(e) = started {
            self.inner.executions.lock().open.remove(workflow_id);
            return Err(e.into());
        }

        tracing::info!(workflow_id, workflow_type, "Workflow started");
        self.spawn(workflow, ctx, input, outcome_tx);
        Ok(handle)
    }

    /// Resume every workflow of this task queue whose history has no
    /// terminal event, as left behind by a restart. Returns the resumed ids.
    ///
    /// Histories of unregistered workflow types are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the event log cannot be read.
    pub async fn recover(&self) -> WorkflowResult<Vec<String>> {
        let mut recovered = Vec::new();

        for workflow_id in self.inner.event_log.open_workflows().await? {
            if self.inner.executions.lock().open.contains_key(&workflow_id) {
                continue;
            }
            let history = self.inner.event_log.replay(&workflow_id).await?;
            let Some(Event::WorkflowStarted {
                workflow_type,
                task_queue,
                input,
                ..
            }) = history.first().cloned()
            else {
                tracing::warn!(workflow_id = %workflow_id, "History has no start event, skipping");
                continue;
            };
            if task_queue != self.inner.task_queue {
                continue;
            }
            let Some(workflow) = self.inner.workflows.get(&workflow_type).cloned() else {
                tracing::warn!(
                    workflow_id = %workflow_id,
                    workflow_type = %workflow_type,
                    "Open workflow of unregistered type, skipping"
                );
                continue;
            };

            let (ctx, outcome_tx, _) = {
                let mut executions = self.inner.executions.lock();
                executions.forget_closed(&workflow_id);
                self.register(&mut executions, &workflow_id, &workflow_type)
            };
            ctx.restore(history);
            tracing::info!(workflow_id = %workflow_id, workflow_type = %workflow_type, "Workflow resumed");
            self.spawn(workflow, ctx, input, outcome_tx);
            recovered.push(workflow_id);
        }

        tracing::info!(
            task_queue = %self.inner.task_queue,
            resumed = recovered.len(),
            "Recovered open workflows"
        );
        Ok(recovered)
    }

    fn register(
        &self,
        executions: &mut Executions,
        workflow_id: &str,
        workflow_type: &str,
    ) -> (
        WorkflowContext,
        watch::Sender<Option<WorkflowOutcome>>,
        WorkflowHandle,
    ) {
        let ctx = WorkflowContext::new(
            workflow_id,
            workflow_type,
            &self.inner.task_queue,
            Arc::clone(&self.inner.activities),
            Arc::clone(&self.inner.event_log),
        );
        let (outcome_tx, outcome_rx) = watch::channel(None);
        executions.open.insert(
            workflow_id.to_string(),
            Execution {
                workflow_type: workflow_type.to_string(),
                state: WorkflowState::Pending,
                ctx: ctx.clone(),
                outcome: outcome_rx.clone(),
                task: None,
            },
        );
        let handle = WorkflowHandle {
            workflow_id: workflow_id.to_string(),
            outcome: outcome_rx,
        };
        (ctx, outcome_tx, handle)
    }

    fn spawn(
        &self,
        workflow: Arc<dyn Workflow>,
        ctx: WorkflowContext,
        input: serde_json::Value,
        outcome_tx: watch::Sender<Option<WorkflowOutcome>>,
    ) {
        let workflow_id = ctx.workflow_id().to_string();
        let task = tokio::spawn(Self::execute(
            Arc::clone(&self.inner),
            workflow,
            ctx,
            input,
            outcome_tx,
        ));
        if let Some(execution) = self.inner.executions.lock().open.get_mut(&workflow_id) {
            execution.task = Some(task);
        }
    }

    async fn execute(
        inner: Arc<WorkerInner>,
        workflow: Arc<dyn Workflow>,
        ctx: WorkflowContext,
        input: serde_json::Value,
        outcome_tx: watch::Sender<Option<WorkflowOutcome>>,
    ) {
        let workflow_id = ctx.workflow_id().to_string();

        let permit = tokio::select! {
            permit = Arc::clone(&inner.permits).acquire_owned() => permit.ok(),
            () = ctx.cancelled() => None,
        };

        let result = match permit {
            Some(_permit) => {
                if let Some(execution) = inner.executions.lock().open.get_mut(&workflow_id) {
                    execution.state = WorkflowState::Running;
                }
                workflow.run(ctx.clone(), input).await
            }
            None => Err(WorkflowError::Cancelled),
        };

        let timestamp = chrono::Utc::now();
        let (event, outcome, state) = match result {
            Ok(output) => {
                tracing::info!(workflow_id = %workflow_id, "Workflow completed");
                (
                    Some(Event::WorkflowCompleted {
                        output: output.clone(),
                        timestamp,
                    }),
                    WorkflowOutcome::Completed(output),
                    WorkflowState::Completed,
                )
            }
            // History stays open so the next start of the worker resumes it
            Err(WorkflowError::Cancelled) if !inner.accepting.load(Ordering::SeqCst) => {
                tracing::info!(workflow_id = %workflow_id, "Workflow interrupted by shutdown");
                (None, WorkflowOutcome::Cancelled, WorkflowState::Cancelled)
            }
            Err(WorkflowError::Cancelled) => {
                tracing::info!(workflow_id = %workflow_id, "Workflow cancelled");
                (
                    Some(Event::WorkflowCancelled { timestamp }),
                    WorkflowOutcome::Cancelled,
                    WorkflowState::Cancelled,
                )
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Workflow failed");
                (
                    Some(Event::WorkflowFailed {
                        error: e.to_string(),
                        timestamp,
                    }),
                    WorkflowOutcome::Failed(e.to_string()),
                    WorkflowState::Failed,
                )
            }
        };

        if let Some(event) = event {
            if let Err(e) = inner.event_log.append(&workflow_id, event).await {
                tracing::warn!(workflow_id = %workflow_id, error = %e, "Failed to record workflow outcome");
            }
        }
        inner
            .executions
            .lock()
            .close(&workflow_id, state, inner.retain_closed);
        outcome_tx.send_replace(Some(outcome));
    }

    /// Deliver a signal to a pending or running workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Closed`] if the workflow already finished,
    /// either in memory or according to its history, and
    /// [`WorkflowError::NotFound`] if no workflow with that id is running.
    pub async fn signal(&self, workflow_id: &str, signal: Signal) -> WorkflowResult<()> {
        let ctx = {
            let executions = self.inner.executions.lock();
            if executions.closed.contains_key(workflow_id) {
                return Err(WorkflowError::Closed(workflow_id.to_string()));
            }
            executions.open.get(workflow_id).map(|e| e.ctx.clone())
        };
        let Some(ctx) = ctx else {
            let history = self.inner.event_log.replay(workflow_id).await?;
            return Err(if history.iter().any(Event::is_terminal) {
                WorkflowError::Closed(workflow_id.to_string())
            } else {
                WorkflowError::NotFound(workflow_id.to_string())
            });
        };

        self.inner
            .event_log
            .append(
                workflow_id,
                Event::SignalReceived {
                    name: signal.name.clone(),
                    payload: signal.payload.clone(),
                },
            )
            .await?;
        tracing::debug!(workflow_id, signal = %signal.name, "Signal delivered");
        ctx.deliver(signal);
        Ok(())
    }

    /// Get the status of a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for unknown or evicted ids.
    pub fn status(&self, workflow_id: &str) -> WorkflowResult<WorkflowState> {
        let executions = self.inner.executions.lock();
        executions
            .open
            .get(workflow_id)
            .map(|e| e.state)
            .or_else(|| executions.closed.get(workflow_id).map(|e| e.state))
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))
    }

    /// Handle to a workflow still held in memory.
    #[must_use]
    pub fn handle(&self, workflow_id: &str) -> Option<WorkflowHandle> {
        let executions = self.inner.executions.lock();
        let outcome = match executions.open.get(workflow_id) {
            Some(execution) => execution.outcome.clone(),
            None => executions.closed.get(workflow_id)?.outcome.clone(),
        };
        Some(WorkflowHandle {
            workflow_id: workflow_id.to_string(),
            outcome,
        })
    }

    /// Output of a workflow, waiting for it if it is still running.
    ///
    /// Workflows no longer held in memory are answered from the event log.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when neither memory nor history
    /// knows the workflow or its history is still open, and the workflow's
    /// own failure otherwise.
    pub async fn result_of(&self, workflow_id: &str) -> WorkflowResult<serde_json::Value> {
        if let Some(handle) = self.handle(workflow_id) {
            return handle.result().await;
        }

        let history = self.inner.event_log.replay(workflow_id).await?;
        match history.into_iter().rev().find(Event::is_terminal) {
            Some(Event::WorkflowCompleted { output, .. }) => Ok(output),
            Some(Event::WorkflowFailed { error, .. }) => Err(anyhow::anyhow!(error).into()),
            Some(_) => Err(WorkflowError::Cancelled),
            None => Err(WorkflowError::NotFound(workflow_id.to_string())),
        }
    }

    /// Type of a workflow held in memory.
    #[must_use]
    pub fn workflow_type_of(&self, workflow_id: &str) -> Option<String> {
        let executions = self.inner.executions.lock();
        executions
            .open
            .get(workflow_id)
            .map(|e| e.workflow_type.clone())
            .or_else(|| executions.closed.get(workflow_id).map(|e| e.workflow_type.clone()))
    }

    /// Number of workflows that have not finished yet.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.executions.lock().open.len()
    }

    /// Number of workflows held in memory, open and retained closed ones.
    #[must_use]
    pub fn retained_count(&self) -> usize {
        let executions = self.inner.executions.lock();
        executions.open.len() + executions.closed.len()
    }

    /// Request cancellation of a workflow.
    ///
    /// Returns `false` when the workflow has already finished. The workflow
    /// observes the cancellation at its next activity or condition await.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for unknown ids.
    pub fn cancel(&self, workflow_id: &str) -> WorkflowResult<bool> {
        let executions = self.inner.executions.lock();
        if let Some(execution) = executions.open.get(workflow_id) {
            execution.ctx.cancel();
            return Ok(true);
        }
        if executions.closed.contains_key(workflow_id) {
            return Ok(false);
        }
        Err(WorkflowError::NotFound(workflow_id.to_string()))
    }

    /// Replay a workflow from its event log.
    ///
    /// # Errors
    ///
    /// Returns error if the event log cannot be read.
    pub async fn replay(&self, workflow_id: &str) -> WorkflowResult<Vec<Event>> {
        Ok(self.inner.event_log.replay(workflow_id).await?)
    }

    /// Stop accepting workflows, interrupt the open ones and wait up to
    /// `grace` for them to finish. Workflows still running afterwards are
    /// aborted.
    ///
    /// Interrupted workflows keep an open history, so a worker built on the
    /// same event log resumes them with [`recover`](Self::recover).
    pub async fn shutdown(&self, grace: Duration) {
        self.inner.accepting.store(false, Ordering::SeqCst);

        let tasks: Vec<(String, JoinHandle<()>)> = {
            let mut executions = self.inner.executions.lock();
            executions
                .open
                .iter_mut()
                .filter_map(|(id, e)| {
                    e.ctx.cancel();
                    e.task.take().map(|task| (id.clone(), task))
                })
                .collect()
        };

        tracing::info!(
            task_queue = %self.inner.task_queue,
            open_workflows = tasks.len(),
            "Shutting down embedded worker"
        );

        for (workflow_id, task) in tasks {
            let abort = task.abort_handle();
            if tokio::time::timeout(grace, task).await.is_err() {
                tracing::warn!(workflow_id = %workflow_id, "Workflow did not stop in time, aborting");
                abort.abort();
            }
        }
    }
}

impl std::fmt::Debug for EmbeddedWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedWorker")
            .field("task_queue", &self.inner.task_queue)
            .field("workflows", &self.workflow_types())
            .field("max_concurrent", &self.inner.max_concurrent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_execution(executions: &mut Executions, workflow_id: &str) {
        let ctx = WorkflowContext::new(
            workflow_id,
            "wf",
            "queue",
            Arc::new(ActivityRegistry::new()),
            Arc::new(InMemoryEventLog::new()),
        );
        let (_, outcome) = watch::channel(None);
        executions.open.insert(
            workflow_id.to_string(),
            Execution {
                workflow_type: "wf".to_string(),
                state: WorkflowState::Running,
                ctx,
                outcome,
                task: None,
            },
        );
    }

    #[test]
    fn test_close_evicts_oldest_beyond_retention() {
        let mut executions = Executions::default();
        for id in ["a", "b", "c"] {
            open_execution(&mut executions, id);
        }

        executions.close("a", WorkflowState::Completed, 2);
        executions.close("b", WorkflowState::Failed, 2);
        executions.close("c", WorkflowState::Completed, 2);

        assert!(executions.open.is_empty());
        assert!(!executions.closed.contains_key("a"));
        assert_eq!(executions.closed["b"].state, WorkflowState::Failed);
        assert_eq!(executions.closed_order, ["b", "c"]);
    }

    #[test]
    fn test_zero_retention_keeps_nothing() {
        let mut executions = Executions::default();
        open_execution(&mut executions, "a");
        executions.close("a", WorkflowState::Completed, 0);

        assert!(executions.open.is_empty());
        assert!(executions.closed.is_empty());
        assert!(executions.closed_order.is_empty());
    }

    #[test]
    fn test_builder_debug_lists_settings() {
        let builder = EmbeddedWorker::builder("queue").max_concurrent(4).retain_closed(8);
        let debug = format!("{builder:?}");
        assert!(debug.starts_with("EmbeddedWorkerBuilder"));
        assert!(debug.contains("task_queue: \"queue\""));
        assert!(debug.contains("max_concurrent: 4"));
        assert!(debug.contains("retain_closed: 8"));
        assert!(debug.contains("event_log: None"));
    }
}
