//! # Store Actor
//!
//! This module implements the single-writer actor that owns the SQLite
//! connection. All mutations and reads serialize through its request channel,
//! which makes the single-logical-writer assumption structural rather than
//! conventional: there is exactly one connection and one thread touching it.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Async Tasks                             │
//! │   write()   query()   tail poll   force_cleanup()   clear()   │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                │ mpsc (StoreRequest)
//!                                ▼
//!                    ┌───────────────────────┐
//!                    │  Dedicated OS Thread  │
//!                    │                       │
//!                    │  ┌─────────────────┐  │
//!                    │  │    LogWriter    │  │  ← owns the Connection
//!                    │  │  insert/prune   │  │
//!                    │  └─────────────────┘  │
//!                    └───────────────────────┘
//! ```
//!
//! ## Cursor Updates
//!
//! After a successful insert the cursor (`last_id`) is updated from
//! `last_insert_rowid()` on the insert's own connection. The store returns
//! the assigned id directly, so there is no separate max-id read-back and no
//! window in which another writer's id could be mistaken for our own.
//!
//! ## Self-Referential Logging Without Recursion
//!
//! The pruner records its outcomes as ordinary rows in the same table, but
//! through [`LogWriter::insert_row`] directly — the internal write path that
//! does not re-invoke the trigger check. The public insert request is the
//! only place the Bernoulli trial runs, so maintenance writes can never
//! cascade into further maintenance.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use rand::Rng;
use rusqlite::Connection;
use tokio::sync::{mpsc, oneshot};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::reader::{self, RowMap};
use crate::retention::{
    self, CLEAR_SUCCESS_MESSAGE, TRIM_FAILURE_MESSAGE, TRIM_SUCCESS_MESSAGE,
};
use crate::schema::Database;
use crate::types::{format_timestamp, LogEntry, LogId, LogRow, QueryOptions};

/// The draw value that triggers a prune. A draw is uniform over
/// `[0, probability)`, so the trigger probability per write is
/// `1/probability`; `force` treats the draw as if it equaled this sentinel.
const PRUNE_SENTINEL: u32 = 0;

// =============================================================================
// Request Types
// =============================================================================

/// A request sent to the store actor.
pub enum StoreRequest {
    /// Insert a log entry. Runs the retention trigger check afterwards.
    Insert {
        entry: LogEntry,
        response: oneshot::Sender<Result<LogId>>,
    },

    /// Bounded historical query.
    Query {
        options: QueryOptions,
        response: oneshot::Sender<Result<Vec<RowMap>>>,
    },

    /// Tail poll: rows with id strictly greater than `after`, ascending.
    Poll {
        after: LogId,
        response: oneshot::Sender<Result<Vec<LogRow>>>,
    },

    /// Unconditional prune of rows older than the retention window.
    ForceCleanup {
        response: oneshot::Sender<Result<usize>>,
    },

    /// Unconditional truncation of the whole table.
    Clear {
        response: oneshot::Sender<Result<()>>,
    },

    /// Stop the actor.
    Shutdown,
}

// =============================================================================
// The Actor
// =============================================================================

/// The store actor. Owns the connection; runs on a dedicated thread.
///
/// Use [`StoreHandle`] to interact with it from async code.
pub struct LogWriter {
    /// SQLite connection (owned, single writer).
    conn: Connection,

    /// Immutable store configuration.
    config: Arc<StoreConfig>,

    /// Highest id this process instance has observed. Shared with the API
    /// layer so tail feeds can seed without a round-trip.
    last_id: Arc<AtomicI64>,
}

impl LogWriter {
    /// Creates the actor from an initialized database.
    pub fn new(db: Database, config: Arc<StoreConfig>, last_id: Arc<AtomicI64>) -> Self {
        last_id.store(db.last_id().as_raw(), Ordering::SeqCst);
        Self {
            conn: db.into_connection(),
            config,
            last_id,
        }
    }

    /// Inserts a row and advances the cursor. Internal write path: does NOT
    /// run the retention trigger check, so maintenance records can use it
    /// without recursing.
    fn insert_row(&self, entry: &LogEntry) -> Result<LogId> {
        let level: &str = if entry.level.is_empty() {
            &self.config.level
        } else {
            &entry.level
        };

        let meta_json = match &self.config.label {
            Some(label) => {
                let mut meta = entry.meta.clone();
                meta.insert(
                    "label".to_string(),
                    serde_json::Value::String(label.clone()),
                );
                serde_json::to_string(&meta)?
            }
            None => serde_json::to_string(&entry.meta)?,
        };

        let table = &self.config.table_name;
        match entry.timestamp {
            Some(ts) => {
                self.conn.execute(
                    &format!(
                        "INSERT INTO {table} (level, message, timestamp, meta) VALUES (?, ?, ?, ?)"
                    ),
                    rusqlite::params![level, entry.message, format_timestamp(ts), meta_json],
                )?;
            }
            None => {
                // Let the column default stamp the row.
                self.conn.execute(
                    &format!("INSERT INTO {table} (level, message, meta) VALUES (?, ?, ?)"),
                    rusqlite::params![level, entry.message, meta_json],
                )?;
            }
        }

        let id = self.conn.last_insert_rowid();
        self.last_id.fetch_max(id, Ordering::SeqCst);
        Ok(LogId::from_raw(id))
    }

    /// The retention trigger check.
    ///
    /// Returns `None` when pruning is disabled or the draw did not trigger;
    /// otherwise the prune result. Outcomes are recorded as synthetic rows
    /// through the internal write path, success and failure alike; a caller
    /// is only waiting in the `force` case.
    fn maybe_prune(&self, force: bool) -> Option<Result<usize>> {
        let days_to_keep = self.config.days_to_keep?;

        let draw = if force {
            PRUNE_SENTINEL
        } else {
            rand::rng().random_range(0..self.config.probability)
        };
        if draw != PRUNE_SENTINEL {
            return None;
        }

        match retention::prune_expired(&self.conn, &self.config.table_name, days_to_keep) {
            Ok(deleted) => {
                tracing::debug!(deleted, days_to_keep, "retention prune completed");
                self.record_outcome(LogEntry::new("info", TRIM_SUCCESS_MESSAGE));
                Some(Ok(deleted))
            }
            Err(e) => {
                tracing::warn!(error = %e, "retention prune failed");
                self.record_outcome(
                    LogEntry::new("error", TRIM_FAILURE_MESSAGE)
                        .with_meta("details", serde_json::Value::String(e.to_string())),
                );
                Some(Err(e))
            }
        }
    }

    /// Records a maintenance outcome as an ordinary row. Failures here have
    /// nowhere to go but the diagnostic log.
    fn record_outcome(&self, entry: LogEntry) {
        if let Err(e) = self.insert_row(&entry) {
            tracing::warn!(error = %e, "failed to record maintenance outcome entry");
        }
    }

    /// Truncates the table and records the outcome.
    fn clear(&self) -> Result<()> {
        let deleted = retention::truncate(&self.conn, &self.config.table_name)?;
        tracing::debug!(deleted, "log table cleared");
        self.record_outcome(LogEntry::new("info", CLEAR_SUCCESS_MESSAGE));
        Ok(())
    }
}

// =============================================================================
// Actor Loop
// =============================================================================

/// Runs the store actor loop on its dedicated thread.
pub async fn run_store_writer(writer: LogWriter, mut rx: mpsc::Receiver<StoreRequest>) {
    while let Some(request) = rx.recv().await {
        match request {
            StoreRequest::Insert { entry, response } => {
                let result = writer.insert_row(&entry);
                let _ = response.send(result);
                // The trigger check runs after every insert request,
                // regardless of the insert's own outcome.
                writer.maybe_prune(false);
            }
            StoreRequest::Query { options, response } => {
                let result = reader::query(&writer.conn, &writer.config.table_name, &options);
                let _ = response.send(result);
            }
            StoreRequest::Poll { after, response } => {
                let result = reader::poll_after(&writer.conn, &writer.config.table_name, after);
                let _ = response.send(result);
            }
            StoreRequest::ForceCleanup { response } => {
                let result = match writer.maybe_prune(true) {
                    Some(result) => result,
                    None => Err(Error::Config(
                        "daysToKeep is not configured; nothing to clean up".to_string(),
                    )),
                };
                let _ = response.send(result);
            }
            StoreRequest::Clear { response } => {
                let _ = response.send(writer.clear());
            }
            StoreRequest::Shutdown => break,
        }
    }
}

// =============================================================================
// Store Handle (Async Interface)
// =============================================================================

/// Async handle to the store actor.
///
/// Cloneable; all clones talk to the same actor. Requests are answered
/// through oneshot channels.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreRequest>,
    last_id: Arc<AtomicI64>,
}

impl StoreHandle {
    /// Inserts an entry, returning its database-assigned id.
    pub async fn insert(&self, entry: LogEntry) -> Result<LogId> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(StoreRequest::Insert {
                entry,
                response: response_tx,
            })
            .await
            .map_err(|_| Error::Closed("writer has shut down".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Closed("writer dropped response".to_string()))?
    }

    /// Runs a bounded historical query.
    pub async fn query(&self, options: QueryOptions) -> Result<Vec<RowMap>> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(StoreRequest::Query {
                options,
                response: response_tx,
            })
            .await
            .map_err(|_| Error::Closed("writer has shut down".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Closed("writer dropped response".to_string()))?
    }

    /// Polls for rows with id strictly greater than `after`.
    pub async fn poll_after(&self, after: LogId) -> Result<Vec<LogRow>> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(StoreRequest::Poll {
                after,
                response: response_tx,
            })
            .await
            .map_err(|_| Error::Closed("writer has shut down".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Closed("writer dropped response".to_string()))?
    }

    /// Unconditionally prunes rows older than the retention window.
    pub async fn force_cleanup(&self) -> Result<usize> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(StoreRequest::ForceCleanup {
                response: response_tx,
            })
            .await
            .map_err(|_| Error::Closed("writer has shut down".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Closed("writer dropped response".to_string()))?
    }

    /// Unconditionally truncates the table.
    pub async fn clear(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(StoreRequest::Clear {
                response: response_tx,
            })
            .await
            .map_err(|_| Error::Closed("writer has shut down".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Closed("writer dropped response".to_string()))?
    }

    /// Requests actor shutdown. Queued requests ahead of this one complete.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(StoreRequest::Shutdown).await;
    }

    /// The highest id this process instance has observed.
    pub fn last_id(&self) -> LogId {
        LogId::from_raw(self.last_id.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Spawning
// =============================================================================

/// Spawns the store actor on a dedicated thread.
///
/// Returns a handle for submitting requests. The thread runs a
/// current-thread Tokio runtime so the actor can await its channel without
/// tying up the caller's runtime.
pub fn spawn_store_writer(db: Database, config: Arc<StoreConfig>) -> Result<StoreHandle> {
    let (tx, rx) = mpsc::channel(config.pool);
    let last_id = Arc::new(AtomicI64::new(0));

    let writer = LogWriter::new(db, Arc::clone(&config), Arc::clone(&last_id));

    std::thread::Builder::new()
        .name("relog-store-writer".to_string())
        .spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to create writer runtime");

            rt.block_on(run_store_writer(writer, rx));
        })
        .map_err(|e| Error::Closed(format!("failed to spawn writer thread: {e}")))?;

    Ok(StoreHandle { tx, last_id })
}

// =============================================================================
// Tests
// =============================================================================
