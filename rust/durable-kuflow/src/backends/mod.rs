//! Event log backends for workflow history.
//!
//! Backends implement the `EventLog` trait to store workflow events,
//! enabling replay and inspection after a run.

#[cfg(feature = "sqlite-backend")]
pub mod sqlite;

#[cfg(feature = "sqlite-backend")]
pub use sqlite::SqliteEventLog;

use async_trait::async_trait;

use crate::Event;

/// Event log trait for workflow history persistence.
///
/// Implementations provide storage for workflow events with support for:
/// - Appending new events
/// - Replaying events in order
/// - Querying whether a workflow has history
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append an event to the log.
    ///
    /// Returns the event index within the workflow.
    async fn append(&self, workflow_id: &str, event: Event) -> anyhow::Result<u64>;

    /// Replay all events for a workflow.
    ///
    /// Returns events in order of occurrence.
    async fn replay(&self, workflow_id: &str) -> anyhow::Result<Vec<Event>>;

    /// Get the next event index for a workflow.
    async fn next_index(&self, workflow_id: &str) -> anyhow::Result<u64>;

    /// Check if a workflow exists.
    async fn exists(&self, workflow_id: &str) -> anyhow::Result<bool>;

    /// Delete all events for a workflow.
    async fn delete(&self, workflow_id: &str) -> anyhow::Result<u64>;

    /// Ids of workflows whose history has no terminal event, oldest first.
    async fn open_workflows(&self) -> anyhow::Result<Vec<String>>;
}

/// In-memory event log for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: parking_lot::RwLock<std::collections::HashMap<String, Vec<Event>>>,
    /// Workflow ids in order of their first event.
    order: parking_lot::RwLock<Vec<String>>,
}

impl InMemoryEventLog {
    /// Create a new in-memory event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, workflow_id: &str, event: Event) -> anyhow::Result<u64> {
        let mut events = self.events.write();
        if !events.contains_key(workflow_id) {
            self.order.write().push(workflow_id.to_string());
        }
        let workflow_events = events.entry(workflow_id.to_string()).or_default();
        let idx = workflow_events.len() as u64;
        workflow_events.push(event);
        Ok(idx)
    }

    async fn replay(&self, workflow_id: &str) -> anyhow::Result<Vec<Event>> {
        let events = self.events.read();
        Ok(events.get(workflow_id).cloned().unwrap_or_default())
    }

    async fn next_index(&self, workflow_id: &str) -> anyhow::Result<u64> {
        let events = self.events.read();
        Ok(events.get(workflow_id).map_or(0, |e| e.len() as u64))
    }

    async fn exists(&self, workflow_id: &str) -> anyhow::Result<bool> {
        let events = self.events.read();
        Ok(events.contains_key(workflow_id))
    }

    async fn delete(&self, workflow_id: &str) -> anyhow::Result<u64> {
        let mut events = self.events.write();
        self.order.write().retain(|id| id != workflow_id);
        Ok(events.remove(workflow_id).map_or(0, |e| e.len() as u64))
    }

    async fn open_workflows(&self) -> anyhow::Result<Vec<String>> {
        let events = self.events.read();
        Ok(self
            .order
            .read()
            .iter()
            .filter(|id| {
                events
                    .get(id.as_str())
                    .is_some_and(|history| !history.iter().any(Event::is_terminal))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl<T: EventLog + ?Sized> EventLog for Box<T> {
    async fn append(&self, workflow_id: &str, event: Event) -> anyhow::Result<u64> {
        (**self).append(workflow_id, event).await
    }

    async fn replay(&self, workflow_id: &str) -> anyhow::Result<Vec<Event>> {
        (**self).replay(workflow_id).await
    }

    async fn next_index(&self, workflow_id: &str) -> anyhow::Result<u64> {
        (**self).next_index(workflow_id).await
    }

    async fn exists(&self, workflow_id: &str) -> anyhow::Result<bool> {
        (**self).exists(workflow_id).await
    }

    async fn delete(&self, workflow_id: &str) -> anyhow::Result<u64> {
        (**self).delete(workflow_id).await
    }

    async fn open_workflows(&self) -> anyhow::Result<Vec<String>> {
        (**self).open_workflows().await
    }
}
