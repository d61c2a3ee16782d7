//! # Async API for relog
//!
//! This module provides the public interface: [`LogStore`]. It wires the
//! schema manager, the store actor, and the tail feed together behind a
//! cloneable handle.
//!
//! ## Write Contract
//!
//! `write(entry)` resolves with the insert's outcome — the assigned id on
//! success, the store error verbatim on failure. Independently, a "logged"
//! notification is published on a broadcast channel as soon as the insert is
//! issued, before it resolves. Observers see it promptly even before the
//! database round-trip settles, and it can fire for an insert that
//! ultimately fails: it is a best-effort signal, not a durability guarantee.
//! Callers needing durability confirmation must use the returned result.
//!
//! ## Example
//!
//! ```rust,ignore
//! use relog::{Client, Connection, LogEntry, LogStore, StoreConfig, StreamOptions};
//!
//! #[tokio::main]
//! async fn main() -> relog::Result<()> {
//!     let config = StoreConfig::builder()
//!         .client(Client::Sqlite)
//!         .connection(Connection::File("app-logs.db".into()))
//!         .days_to_keep(30)
//!         .build()?;
//!
//!     let store = LogStore::open(config)?;
//!
//!     store.write(LogEntry::new("info", "service started")).await?;
//!
//!     let mut feed = store.stream(StreamOptions::default());
//!     // ... consume feed.next().await
//!
//!     store.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::reader::RowMap;
use crate::schema::Database;
use crate::tail::{spawn_tail, TailHandle};
use crate::types::{LogEntry, LogId, QueryOptions, StreamOptions};
use crate::writer::{spawn_store_writer, StoreHandle};

/// Capacity of the "logged" notification channel. Notifications are small
/// and best-effort; laggards simply miss some.
const LOGGED_CHANNEL_SIZE: usize = 1024;

// =============================================================================
// Logged Notification
// =============================================================================

/// Best-effort notification that an entry was submitted to the store.
///
/// Published when the insert is issued, not when it resolves; it carries no
/// id because none has been assigned yet.
#[derive(Debug, Clone)]
pub struct LoggedNotice {
    /// Level of the submitted entry (after the config default is applied).
    pub level: String,

    /// Message of the submitted entry.
    pub message: String,
}

// =============================================================================
// LogStore
// =============================================================================

/// The main handle for the log sink.
///
/// `LogStore` is `Clone`, `Send`, and `Sync`; all clones share the same
/// store actor and cursor.
#[derive(Clone)]
pub struct LogStore {
    store: StoreHandle,
    logged_tx: broadcast::Sender<LoggedNotice>,
    config: Arc<StoreConfig>,
}

impl LogStore {
    /// Opens the configured database, ensures the log table exists, recovers
    /// the cursor, and spawns the store actor.
    ///
    /// # Errors
    ///
    /// - `Error::Sqlite` if the database can't be opened or initialized
    /// - `Error::Config` if the schema hook adds an invalid column
    pub fn open(config: StoreConfig) -> Result<Self> {
        let config = Arc::new(config);
        let db = Database::open(&config)?;
        let store = spawn_store_writer(db, Arc::clone(&config))?;
        let (logged_tx, _) = broadcast::channel(LOGGED_CHANNEL_SIZE);

        tracing::debug!(
            table = %config.table_name,
            days_to_keep = ?config.days_to_keep,
            last_id = %store.last_id(),
            "log store opened"
        );

        Ok(Self {
            store,
            logged_tx,
            config,
        })
    }

    /// Writes an entry, resolving with its database-assigned id.
    ///
    /// In silent mode the entry is dropped and success is signaled
    /// immediately with [`LogId::NONE`]; no notification fires. Otherwise a
    /// [`LoggedNotice`] is published as soon as the insert is issued, and
    /// the retention trigger check runs after the insert regardless of its
    /// outcome.
    pub async fn write(&self, entry: LogEntry) -> Result<LogId> {
        if self.config.silent {
            return Ok(LogId::NONE);
        }

        let notice = LoggedNotice {
            level: if entry.level.is_empty() {
                self.config.level.clone()
            } else {
                entry.level.clone()
            },
            message: entry.message.clone(),
        };

        // Publish before awaiting the insert: observers see the notice even
        // while the round-trip is in flight, and even if it ultimately
        // fails. Send errors just mean nobody is subscribed.
        let _ = self.logged_tx.send(notice);

        self.store.insert(entry).await
    }

    /// Subscribes to "logged" notifications.
    pub fn subscribe_logged(&self) -> broadcast::Receiver<LoggedNotice> {
        self.logged_tx.subscribe()
    }

    /// Runs a bounded, windowed, projected, ordered historical query.
    ///
    /// See [`QueryOptions`] for the recognized options. Returns realized
    /// rows; does not stream.
    pub async fn query(&self, options: QueryOptions) -> Result<Vec<RowMap>> {
        self.store.query(options).await
    }

    /// Starts a tail feed.
    ///
    /// Must be called from within a Tokio runtime; the polling loop runs as
    /// a task on it. See [`StreamOptions`] for cursor seeding and
    /// [`TailHandle`] for consumption and cancellation.
    pub fn stream(&self, options: StreamOptions) -> TailHandle {
        spawn_tail(self.store.clone(), options)
    }

    /// Unconditionally deletes rows older than the retention window.
    ///
    /// Operator-triggered maintenance; the outcome is also recorded as a
    /// synthetic log entry. Fails with `Error::Config` when no retention
    /// window is configured.
    pub async fn force_cleanup(&self) -> Result<usize> {
        self.store.force_cleanup().await
    }

    /// Unconditionally truncates the table, then records a synthetic
    /// outcome entry.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }

    /// The highest id this process instance has observed.
    pub fn last_id(&self) -> LogId {
        self.store.last_id()
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Shuts the store actor down. Requests already queued complete first;
    /// subsequent requests fail with `Error::Closed`.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}

// =============================================================================
// Tests
// =============================================================================
