//! # SQLite Schema for relog
//!
//! This module ensures the log table exists and recovers the cursor on cold
//! start. The DDL is built dynamically because the table name and part of the
//! column set are configuration: callers may append columns through the
//! schema-extension hook before creation completes.
//!
//! ## Base Table
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ {table_name}                                                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │ id        INTEGER PRIMARY KEY AUTOINCREMENT                  │
//! │ level     TEXT NOT NULL                                      │
//! │ message   TEXT NOT NULL                                      │
//! │ timestamp TEXT NOT NULL DEFAULT (strftime(...)) ── indexed   │
//! │ meta      TEXT NOT NULL DEFAULT '{}'                         │
//! │ ... hook-supplied columns                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `AUTOINCREMENT` (as opposed to a bare rowid alias) guarantees ids are
//! never reused after pruning, which the tail feed's cursor semantics
//! depend on.
//!
//! ## Initialization Semantics
//!
//! - Table absent: create it (hook invoked once), cursor stays at 0.
//! - Table present: only refresh the cursor from `MAX(id)`; the hook is not
//!   re-invoked. Calling `initialize` again is therefore idempotent.
//! - Failures (connection refused, permission denied) propagate to the
//!   caller; there is no internal retry.

use rusqlite::Connection;

use crate::config::{is_valid_identifier, Connection as ConnectTo, StoreConfig};
use crate::error::{Error, Result};
use crate::types::LogId;

/// SQL expression defaulting the timestamp column to the current UTC time
/// with millisecond precision, in the same format as
/// [`crate::types::TIMESTAMP_FORMAT`].
const TIMESTAMP_DEFAULT: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

// =============================================================================
// Table Definition (hook handle)
// =============================================================================

/// A pending table definition handed to the schema-extension hook.
///
/// The base columns are fixed; the hook may only append. Column names are
/// identifier-validated when added, and invalid additions surface as a
/// `Config` error when the DDL is rendered.
///
/// # Example
///
/// ```rust
/// use relog::config::{Client, StoreConfig};
///
/// let config = StoreConfig::builder()
///     .client(Client::Sqlite)
///     .schema(|table| {
///         table.add_column("host", "TEXT");
///         table.add_column("pid", "INTEGER");
///     })
///     .build()?;
/// # Ok::<(), relog::Error>(())
/// ```
#[derive(Debug)]
pub struct TableDef {
    /// Extra columns appended by the hook: (name, type/constraint SQL).
    extra: Vec<(String, String)>,
}

impl TableDef {
    fn new() -> Self {
        Self { extra: Vec::new() }
    }

    /// Appends a column to the table being created.
    ///
    /// `definition` is the column's type and constraints, e.g. `"TEXT"` or
    /// `"INTEGER NOT NULL DEFAULT 0"`.
    pub fn add_column(&mut self, name: impl Into<String>, definition: impl Into<String>) {
        self.extra.push((name.into(), definition.into()));
    }

    /// Renders the full CREATE TABLE statement.
    fn render_create(&self, table: &str) -> Result<String> {
        let mut columns = vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "level TEXT NOT NULL".to_string(),
            "message TEXT NOT NULL".to_string(),
            format!("timestamp TEXT NOT NULL DEFAULT ({TIMESTAMP_DEFAULT})"),
            "meta TEXT NOT NULL DEFAULT '{}'".to_string(),
        ];

        for (name, definition) in &self.extra {
            if !is_valid_identifier(name) {
                return Err(Error::Config(format!(
                    "schema hook added invalid column name '{name}'"
                )));
            }
            columns.push(format!("{name} {definition}"));
        }

        Ok(format!(
            "CREATE TABLE {table} ({columns})",
            columns = columns.join(", ")
        ))
    }
}

// =============================================================================
// Database Wrapper
// =============================================================================

/// A SQLite connection with the log table initialized.
///
/// `Database` owns its `Connection`; it is consumed via
/// [`into_connection`](Database::into_connection) when handed to the store
/// actor, which becomes the sole owner for the life of the process.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    last_id: LogId,
}

impl Database {
    /// Opens the configured database and ensures the log table exists.
    ///
    /// On a pre-existing, non-empty table the cursor is recovered from
    /// `MAX(id)`; otherwise it stays at [`LogId::NONE`].
    ///
    /// # Errors
    ///
    /// - `Error::Sqlite` if the database can't be opened or the DDL fails
    /// - `Error::Config` if the schema hook adds an invalid column name
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = match &config.connection {
            ConnectTo::InMemory => Connection::open_in_memory()?,
            ConnectTo::File(path) => Connection::open(path)?,
        };

        let mut db = Self {
            conn,
            last_id: LogId::NONE,
        };
        db.initialize(config)?;
        Ok(db)
    }

    /// Ensures the table exists and refreshes the cursor. Idempotent.
    fn initialize(&mut self, config: &StoreConfig) -> Result<()> {
        // WAL mode: readers see a consistent snapshot while the writer
        // commits. A no-op for in-memory databases.
        self.conn.execute_batch("PRAGMA journal_mode = WAL")?;
        self.conn.execute_batch("PRAGMA synchronous = NORMAL")?;

        let table = &config.table_name;

        if self.table_exists(table)? {
            // Existing table: only recover the cursor. The schema hook is
            // not re-invoked; evolution is additive-at-creation only.
            self.last_id = self.query_max_id(table)?;
            return Ok(());
        }

        let mut def = TableDef::new();
        if let Some(hook) = &config.schema {
            hook(&mut def);
        }

        self.conn.execute_batch(&def.render_create(table)?)?;
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_timestamp_idx ON {table}(timestamp)"
        ))?;

        Ok(())
    }

    /// Checks whether the table exists in this database.
    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Reads the highest assigned id, or [`LogId::NONE`] for an empty table.
    fn query_max_id(&self, table: &str) -> Result<LogId> {
        let max: Option<i64> = self.conn.query_row(
            &format!("SELECT MAX(id) FROM {table}"),
            [],
            |row| row.get(0),
        )?;
        Ok(LogId::from_raw(max.unwrap_or(0)))
    }

    /// Returns the cursor recovered during initialization.
    pub fn last_id(&self) -> LogId {
        self.last_id
    }

    /// Consumes the wrapper, yielding the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

// =============================================================================
// Tests
// =============================================================================
