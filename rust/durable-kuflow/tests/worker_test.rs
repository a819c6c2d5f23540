//! Embedded worker integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use durable_kuflow::backends::SqliteEventLog;
use durable_kuflow::prelude::*;
use durable_kuflow::Event;
use serde_json::{json, Value};

/// Fails with the configured result until `succeed_after` attempts were made.
struct Flaky {
    calls: Arc<AtomicU32>,
    succeed_after: u32,
    failure: ActivityResult,
}

#[async_trait]
impl Activity for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn execute(&self, _ctx: &ActivityContext, input: Value) -> ActivityResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.succeed_after {
            ActivityResult::Success(input)
        } else {
            self.failure.clone()
        }
    }
}

struct Slow;

#[async_trait]
impl Activity for Slow {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn execute(&self, _ctx: &ActivityContext, _input: Value) -> ActivityResult {
        tokio::time::sleep(Duration::from_secs(5)).await;
        ActivityResult::success("late")
    }
}

fn fast_retry(maximum_attempts: u32) -> ActivityOptions {
    ActivityOptions::default().with_retry(
        RetryOptions::default()
            .with_initial_interval(Duration::from_millis(5))
            .with_maximum_attempts(maximum_attempts),
    )
}

/// Runs `flaky` once, then waits for a `go` signal carrying the same value.
struct CallThenWait;

#[async_trait]
impl Workflow for CallThenWait {
    fn workflow_type(&self) -> &'static str {
        "CallThenWait"
    }

    async fn run(&self, ctx: WorkflowContext, input: Value) -> Result<Value, WorkflowError> {
        let echoed: Value = ctx.execute_activity("flaky", &input, &fast_retry(5)).await?;
        ctx.await_condition(|signals| {
            signals
                .iter()
                .any(|s| s.name == "go" && s.payload == echoed)
        })
        .await?;
        Ok(json!({"echoed": echoed}))
    }
}

/// Runs a single activity with the options given in the input.
struct RunOnce {
    activity: &'static str,
    options: ActivityOptions,
}

#[async_trait]
impl Workflow for RunOnce {
    fn workflow_type(&self) -> &'static str {
        "RunOnce"
    }

    async fn run(&self, ctx: WorkflowContext, input: Value) -> Result<Value, WorkflowError> {
        ctx.execute_activity(self.activity, &input, &self.options).await
    }
}

struct WaitForever;

#[async_trait]
impl Workflow for WaitForever {
    fn workflow_type(&self) -> &'static str {
        "WaitForever"
    }

    async fn run(&self, ctx: WorkflowContext, _input: Value) -> Result<Value, WorkflowError> {
        ctx.await_condition(|signals| !signals.is_empty()).await?;
        Ok(Value::Null)
    }
}

fn flaky(calls: &Arc<AtomicU32>, succeed_after: u32, failure: ActivityResult) -> ActivityRegistry {
    let mut registry = ActivityRegistry::new();
    registry.register(Flaky {
        calls: Arc::clone(calls),
        succeed_after,
        failure,
    });
    registry
}

#[tokio::test]
async fn test_workflow_resumes_on_signal() {
    let calls = Arc::new(AtomicU32::new(0));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(flaky(&calls, 1, ActivityResult::non_retryable("unused")))
        .workflow(CallThenWait)
        .build();

    let handle = worker.start("wf-1", "CallThenWait", json!("abc")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(worker.status("wf-1").unwrap(), WorkflowState::Running);

    worker.signal("wf-1", Signal::new("other", json!("abc"))).await.unwrap();
    worker.signal("wf-1", Signal::new("go", json!("abc"))).await.unwrap();

    let output = handle.result().await.unwrap();
    assert_eq!(output, json!({"echoed": "abc"}));
    assert_eq!(worker.status("wf-1").unwrap(), WorkflowState::Completed);

    let events = worker.replay("wf-1").await.unwrap();
    let types: Vec<_> = events.iter().map(Event::event_type).collect();
    assert_eq!(
        types,
        vec![
            "workflow_started",
            "activity_scheduled",
            "activity_completed",
            "signal_received",
            "signal_received",
            "workflow_completed",
        ]
    );
}

#[tokio::test]
async fn test_retryable_failures_are_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(flaky(&calls, 3, ActivityResult::failure("temporary", true)))
        .workflow(RunOnce {
            activity: "flaky",
            options: fast_retry(5),
        })
        .build();

    let handle = worker.start("wf-retry", "RunOnce", json!(1)).await.unwrap();
    assert_eq!(handle.result().await.unwrap(), json!(1));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_non_retryable_failure_stops_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(flaky(&calls, 10, ActivityResult::non_retryable("Unsupported currency JPY")))
        .workflow(RunOnce {
            activity: "flaky",
            options: fast_retry(0),
        })
        .build();

    let handle = worker.start("wf-fail", "RunOnce", json!(1)).await.unwrap();
    let err = handle.result().await.unwrap_err();
    assert!(err.to_string().contains("Unsupported currency JPY"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(worker.status("wf-fail").unwrap(), WorkflowState::Failed);

    let events = worker.replay("wf-fail").await.unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::ActivityFailed {
            retryable: false,
            attempts: 1,
            ..
        }
    )));
}

#[tokio::test]
async fn test_maximum_attempts_is_honoured() {
    let calls = Arc::new(AtomicU32::new(0));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(flaky(&calls, 100, ActivityResult::failure("down", true)))
        .workflow(RunOnce {
            activity: "flaky",
            options: fast_retry(3),
        })
        .build();

    let handle = worker.start("wf-max", "RunOnce", json!(1)).await.unwrap();
    assert!(handle.result().await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_attempt_timeout_then_deadline() {
    let mut registry = ActivityRegistry::new();
    registry.register(Slow);
    let options = fast_retry(0)
        .with_start_to_close_timeout(Duration::from_millis(20))
        .with_schedule_to_close_timeout(Duration::from_millis(100));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(registry)
        .workflow(RunOnce {
            activity: "slow",
            options,
        })
        .build();

    let handle = worker.start("wf-slow", "RunOnce", Value::Null).await.unwrap();
    let err = tokio::time::timeout(Duration::from_secs(2), handle.result())
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
}

#[tokio::test]
async fn test_start_is_idempotent_while_running() {
    let worker = EmbeddedWorker::builder("test-queue")
        .workflow(WaitForever)
        .build();

    worker.start("wf-dup", "WaitForever", Value::Null).await.unwrap();
    let second = worker.start("wf-dup", "WaitForever", Value::Null).await.unwrap();
    assert_eq!(worker.active_count(), 1);

    worker.signal("wf-dup", Signal::new("any", Value::Null)).await.unwrap();
    assert_eq!(second.result().await.unwrap(), Value::Null);

    let started = worker
        .replay("wf-dup")
        .await
        .unwrap()
        .iter()
        .filter(|e| e.event_type() == "workflow_started")
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn test_cancel_stops_waiting_workflow() {
    let worker = EmbeddedWorker::builder("test-queue")
        .workflow(WaitForever)
        .build();

    let handle = worker.start("wf-cancel", "WaitForever", Value::Null).await.unwrap();
    assert!(worker.cancel("wf-cancel").unwrap());

    assert!(matches!(handle.result().await, Err(WorkflowError::Cancelled)));
    assert_eq!(worker.status("wf-cancel").unwrap(), WorkflowState::Cancelled);
    assert!(!worker.cancel("wf-cancel").unwrap());
}

#[tokio::test]
async fn test_unknown_ids_and_types() {
    let worker = EmbeddedWorker::builder("test-queue")
        .workflow(WaitForever)
        .build();

    assert!(matches!(
        worker.start("wf-x", "Missing", Value::Null).await,
        Err(WorkflowError::NotFound(_))
    ));
    assert!(matches!(
        worker.signal("wf-x", Signal::new("go", Value::Null)).await,
        Err(WorkflowError::NotFound(_))
    ));
    assert!(worker.status("wf-x").is_err());
}

#[tokio::test]
async fn test_concurrency_limit_queues_workflows() {
    let worker = EmbeddedWorker::builder("test-queue")
        .workflow(WaitForever)
        .max_concurrent(1)
        .build();

    let first = worker.start("wf-a", "WaitForever", Value::Null).await.unwrap();
    let second = worker.start("wf-b", "WaitForever", Value::Null).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(worker.status("wf-a").unwrap(), WorkflowState::Running);
    assert_eq!(worker.status("wf-b").unwrap(), WorkflowState::Pending);

    worker.signal("wf-a", Signal::new("go", Value::Null)).await.unwrap();
    first.result().await.unwrap();

    worker.signal("wf-b", Signal::new("go", Value::Null)).await.unwrap();
    second.result().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_leaves_history_open() {
    let log = Arc::new(InMemoryEventLog::new());
    let worker = EmbeddedWorker::builder("test-queue")
        .event_log(Arc::clone(&log) as Arc<dyn EventLog>)
        .workflow(WaitForever)
        .build();

    let handle = worker.start("wf-s", "WaitForever", Value::Null).await.unwrap();
    worker.shutdown(Duration::from_secs(1)).await;

    assert!(matches!(handle.result().await, Err(WorkflowError::Cancelled)));
    assert!(worker.start("wf-t", "WaitForever", Value::Null).await.is_err());

    let types: Vec<_> = log
        .replay("wf-s")
        .await
        .unwrap()
        .iter()
        .map(Event::event_type)
        .collect();
    assert_eq!(types, vec!["workflow_started"]);
    assert_eq!(log.open_workflows().await.unwrap(), vec!["wf-s"]);
}

#[tokio::test]
async fn test_closed_workflows_are_evicted_beyond_retention() {
    let calls = Arc::new(AtomicU32::new(0));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(flaky(&calls, 1, ActivityResult::non_retryable("unused")))
        .workflow(RunOnce {
            activity: "flaky",
            options: fast_retry(1),
        })
        .retain_closed(2)
        .build();

    for n in 0..5 {
        let handle = worker.start(&format!("wf-{n}"), "RunOnce", json!(n)).await.unwrap();
        assert_eq!(handle.result().await.unwrap(), json!(n));
    }

    assert_eq!(worker.active_count(), 0);
    assert_eq!(worker.retained_count(), 2);
    assert!(worker.handle("wf-0").is_none());
    assert!(matches!(worker.status("wf-2"), Err(WorkflowError::NotFound(_))));
    assert_eq!(worker.status("wf-4").unwrap(), WorkflowState::Completed);

    // Evicted results are still answered from history
    assert_eq!(worker.result_of("wf-0").await.unwrap(), json!(0));
    assert_eq!(worker.result_of("wf-4").await.unwrap(), json!(4));
    assert!(matches!(
        worker.result_of("wf-missing").await,
        Err(WorkflowError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_signal_after_completion_is_rejected_as_closed() {
    let calls = Arc::new(AtomicU32::new(0));
    let worker = EmbeddedWorker::builder("test-queue")
        .activities(flaky(&calls, 1, ActivityResult::non_retryable("unused")))
        .workflow(RunOnce {
            activity: "flaky",
            options: fast_retry(1),
        })
        .retain_closed(1)
        .build();

    for id in ["wf-old", "wf-new"] {
        let handle = worker.start(id, "RunOnce", json!(id)).await.unwrap();
        handle.result().await.unwrap();
    }

    // Retained in memory, then known only from history
    for id in ["wf-new", "wf-old"] {
        assert!(matches!(
            worker.signal(id, Signal::new("late", Value::Null)).await,
            Err(WorkflowError::Closed(_))
        ));
    }
    let signals = worker
        .replay("wf-old")
        .await
        .unwrap()
        .iter()
        .filter(|e| e.event_type() == "signal_received")
        .count();
    assert_eq!(signals, 0);
}

#[tokio::test]
async fn test_sqlite_history_survives_worker() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("events.db");
    let calls = Arc::new(AtomicU32::new(0));

    {
        let log = SqliteEventLog::new(&path).await.unwrap();
        let worker = EmbeddedWorker::builder("test-queue")
            .event_log(Arc::new(log))
            .activities(flaky(&calls, 1, ActivityResult::non_retryable("unused")))
            .workflow(RunOnce {
                activity: "flaky",
                options: fast_retry(1),
            })
            .build();
        let handle = worker.start("wf-db", "RunOnce", json!({"k": "v"})).await.unwrap();
        handle.result().await.unwrap();
    }

    let log = SqliteEventLog::new(&path).await.unwrap();
    let events = log.replay("wf-db").await.unwrap();
    assert_eq!(events.len(), 4);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_open_workflow_resumes_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("events.db");
    let calls = Arc::new(AtomicU32::new(0));

    {
        let log = SqliteEventLog::new(&path).await.unwrap();
        let worker = EmbeddedWorker::builder("test-queue")
            .event_log(Arc::new(log))
            .activities(flaky(&calls, 1, ActivityResult::non_retryable("unused")))
            .workflow(CallThenWait)
            .build();
        worker.start("wf-r", "CallThenWait", json!("abc")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        worker.signal("wf-r", Signal::new("other", json!("abc"))).await.unwrap();
        worker.shutdown(Duration::from_secs(1)).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let log = SqliteEventLog::new(&path).await.unwrap();
    let worker = EmbeddedWorker::builder("test-queue")
        .event_log(Arc::new(log))
        .activities(flaky(&calls, 1, ActivityResult::non_retryable("unused")))
        .workflow(CallThenWait)
        .build();

    assert!(matches!(
        worker.signal("wf-r", Signal::new("go", json!("abc"))).await,
        Err(WorkflowError::NotFound(_))
    ));
    assert_eq!(worker.recover().await.unwrap(), vec!["wf-r"]);
    assert!(worker.recover().await.unwrap().is_empty());

    worker.signal("wf-r", Signal::new("go", json!("abc"))).await.unwrap();
    let output = worker.result_of("wf-r").await.unwrap();
    assert_eq!(output, json!({"echoed": "abc"}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let types: Vec<_> = worker
        .replay("wf-r")
        .await
        .unwrap()
        .iter()
        .map(Event::event_type)
        .collect();
    assert_eq!(
        types,
        vec![
            "workflow_started",
            "activity_scheduled",
            "activity_completed",
            "signal_received",
            "signal_received",
            "workflow_completed",
        ]
    );
}

#[tokio::test]
async fn test_recover_skips_other_task_queues() {
    let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let first = EmbeddedWorker::builder("queue-a")
        .event_log(Arc::clone(&log))
        .workflow(WaitForever)
        .build();
    first.start("wf-a", "WaitForever", Value::Null).await.unwrap();
    first.shutdown(Duration::from_secs(1)).await;

    let other = EmbeddedWorker::builder("queue-b")
        .event_log(Arc::clone(&log))
        .workflow(WaitForever)
        .build();
    assert!(other.recover().await.unwrap().is_empty());

    let same = EmbeddedWorker::builder("queue-a")
        .event_log(log)
        .workflow(WaitForever)
        .build();
    assert_eq!(same.recover().await.unwrap(), vec!["wf-a"]);
    assert!(!same.status("wf-a").unwrap().is_closed());
    same.signal("wf-a", Signal::new("go", Value::Null)).await.unwrap();
    assert_eq!(same.result_of("wf-a").await.unwrap(), Value::Null);
}
