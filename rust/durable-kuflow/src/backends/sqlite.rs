//! `SQLite` backend for the workflow event log.
//!
//! Events are stored append-only in a single `workflow_events` table,
//! ordered by a per-workflow sequence number. Every call opens its own
//! connection on the blocking pool; WAL mode lets readers and the writer
//! proceed concurrently.
//!
//! ```rust,ignore
//! use durable_kuflow::backends::SqliteEventLog;
//!
//! let log = SqliteEventLog::new("./data/kuflow-events.db").await?;
//! let idx = log.append("wf-123", event).await?;
//! let events = log.replay("wf-123").await?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode};
use tokio::task;

use crate::{backends::EventLog, Event};

const APPEND_ATTEMPTS: u32 = 3;

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS workflow_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        workflow_id TEXT NOT NULL,
        sequence INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        event_data BLOB NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE(workflow_id, sequence)
    );
    CREATE INDEX IF NOT EXISTS idx_workflow_events_sequence
        ON workflow_events(workflow_id, sequence);
";

/// SQLite-based event log.
#[derive(Debug, Clone)]
pub struct SqliteEventLog {
    db_path: PathBuf,
}

impl SqliteEventLog {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// Parent directories are created when missing.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or the schema cannot
    /// be created.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let db_path = path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let event_log = Self { db_path };
        event_log
            .with_connection(|conn| {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .context("Failed to enable WAL mode")?;
                conn.execute_batch(SCHEMA)
                    .context("Failed to create workflow_events table")
            })
            .await?;

        tracing::debug!(path = %event_log.db_path.display(), "SQLite event log ready");
        Ok(event_log)
    }

    /// Path of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with a fresh connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path).context("Failed to open database")?;
            conn.busy_timeout(Duration::from_secs(5))
                .context("Failed to set busy timeout")?;
            f(&mut conn)
        })
        .await
        .context("Failed to spawn blocking task")?
    }
}

fn next_sequence(conn: &Connection, workflow_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(sequence), -1) + 1 FROM workflow_events WHERE workflow_id = ?1",
        params![workflow_id],
        |row| row.get(0),
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn append(&self, workflow_id: &str, event: Event) -> Result<u64> {
        let workflow_id = workflow_id.to_string();
        let event_type = event.event_type();
        let event_data = event.serialize()?;

        self.with_connection(move |conn| {
            let mut attempt = 0;
            loop {
                attempt += 1;
                let tx = conn
                    .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
                    .context("Failed to begin transaction")?;
                let seq = next_sequence(&tx, &workflow_id)
                    .context("Failed to get next sequence number")?;
                let inserted = tx.execute(
                    "INSERT INTO workflow_events (workflow_id, sequence, event_type, event_data, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        &workflow_id,
                        seq,
                        event_type,
                        &event_data,
                        chrono::Utc::now().timestamp()
                    ],
                );
                match inserted {
                    Ok(_) => {
                        tx.commit().context("Failed to commit transaction")?;
                        return u64::try_from(seq).context("Negative sequence number");
                    }
                    Err(e) if is_unique_violation(&e) && attempt < APPEND_ATTEMPTS => {
                        drop(tx);
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(e) => return Err(e).context("Failed to insert event"),
                }
            }
        })
        .await
    }

    async fn replay(&self, workflow_id: &str) -> Result<Vec<Event>> {
        let workflow_id = workflow_id.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT event_data FROM workflow_events
                     WHERE workflow_id = ?1 ORDER BY sequence ASC",
                )
                .context("Failed to prepare replay query")?;
            let rows = stmt
                .query_map(params![&workflow_id], |row| row.get::<_, Vec<u8>>(0))
                .context("Failed to execute replay query")?;

            rows.map(|data| {
                let data = data.context("Failed to read event data")?;
                Event::deserialize(&data).context("Failed to deserialize event")
            })
            .collect()
        })
        .await
    }

    async fn next_index(&self, workflow_id: &str) -> Result<u64> {
        let workflow_id = workflow_id.to_string();
        self.with_connection(move |conn| {
            let seq = next_sequence(conn, &workflow_id).context("Failed to get next index")?;
            u64::try_from(seq).context("Negative sequence number")
        })
        .await
    }

    async fn exists(&self, workflow_id: &str) -> Result<bool> {
        let workflow_id = workflow_id.to_string();
        self.with_connection(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM workflow_events WHERE workflow_id = ?1",
                    params![&workflow_id],
                    |row| row.get(0),
                )
                .context("Failed to check workflow existence")?;
            Ok(count > 0)
        })
        .await
    }

    async fn delete(&self, workflow_id: &str) -> Result<u64> {
        let workflow_id = workflow_id.to_string();
        self.with_connection(move |conn| {
            let count = conn
                .execute(
                    "DELETE FROM workflow_events WHERE workflow_id = ?1",
                    params![&workflow_id],
                )
                .context("Failed to delete workflow events")?;
            Ok(count as u64)
        })
        .await
    }

    async fn open_workflows(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT workflow_id FROM workflow_events
                     GROUP BY workflow_id
                     HAVING SUM(event_type IN ('workflow_completed', 'workflow_failed', 'workflow_cancelled')) = 0
                     ORDER BY MIN(id)",
                )
                .context("Failed to prepare open workflows query")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .context("Failed to execute open workflows query")?;
            rows.map(|id| id.context("Failed to read workflow id")).collect()
        })
        .await
    }
}
