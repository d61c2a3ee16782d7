//! # Store Configuration
//!
//! This module defines the immutable configuration for a log store and its
//! builder. Validation happens once, at `build()`: a missing client is a
//! construction-time fatal error, and table names are checked against SQL
//! identifier rules before they can ever reach a statement.
//!
//! ## Configuration Surface
//!
//! | Field          | Default        | Meaning                                      |
//! |----------------|----------------|----------------------------------------------|
//! | `client`       | *(required)*   | Relational engine selector                   |
//! | `connection`   | in-memory      | Database location                            |
//! | `pool`         | 4096           | Store request channel capacity               |
//! | `label`        | none           | Attached to each entry's meta as `"label"`   |
//! | `level`        | `"info"`       | Level applied to entries with an empty level |
//! | `silent`       | `false`        | Drop writes, still signal success            |
//! | `table_name`   | `winston_logs` | Log table name                               |
//! | `days_to_keep` | none           | Retention window; `None` disables pruning    |
//! | `probability`  | 1000           | Prune trigger denominator (1-in-N per write) |
//! | `schema`       | none           | Column-extension hook, run once at creation  |

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::TableDef;

// =============================================================================
// Defaults
// =============================================================================

/// Default log table name.
pub const DEFAULT_TABLE_NAME: &str = "winston_logs";

/// Default prune trigger denominator: each write prunes with probability
/// 1/1000, so the expected number of writes between prunes is 1000.
pub const DEFAULT_PROBABILITY: u32 = 1000;

/// Default level applied to entries whose level is empty.
pub const DEFAULT_LEVEL: &str = "info";

/// Default request channel capacity.
pub const DEFAULT_POOL: usize = 4096;

// =============================================================================
// Engine Selection
// =============================================================================

/// Relational engine selector.
///
/// SQLite is the only engine this crate ships; the selector exists so that
/// its absence is a construction-time error rather than an implicit default,
/// matching the caller contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Client {
    /// Embedded SQLite via `rusqlite`.
    Sqlite,
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Connection {
    /// In-memory database. Lost when the store shuts down; intended for
    /// tests and ephemeral sinks.
    #[default]
    InMemory,

    /// File-backed database at the given path. Created if absent.
    File(PathBuf),
}

// =============================================================================
// Schema Extension Hook
// =============================================================================

/// User-supplied hook that may add columns to the table definition.
///
/// Invoked exactly once, during table creation, with a handle to the pending
/// definition. It is never re-invoked for a pre-existing table; schema
/// evolution is additive-at-creation only.
pub type SchemaHook = Arc<dyn Fn(&mut TableDef) + Send + Sync>;

// =============================================================================
// Store Configuration
// =============================================================================

/// Immutable configuration for a log store.
///
/// Built via [`StoreConfig::builder`]; all fields are fixed after
/// construction.
#[derive(Clone)]
pub struct StoreConfig {
    /// Relational engine selector.
    pub client: Client,

    /// Database location.
    pub connection: Connection,

    /// Capacity of the store's request channel.
    pub pool: usize,

    /// Optional label attached to each entry's meta.
    pub label: Option<String>,

    /// Level applied to entries with an empty level.
    pub level: String,

    /// When set, writes are dropped (success is still signaled).
    pub silent: bool,

    /// Name of the log table.
    pub table_name: String,

    /// Retention window in days. `None` disables pruning entirely.
    pub days_to_keep: Option<u32>,

    /// Prune trigger denominator: each write triggers a prune with
    /// probability `1/probability`.
    pub probability: u32,

    /// Column-extension hook, run once at table creation.
    pub schema: Option<SchemaHook>,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("client", &self.client)
            .field("connection", &self.connection)
            .field("pool", &self.pool)
            .field("label", &self.label)
            .field("level", &self.level)
            .field("silent", &self.silent)
            .field("table_name", &self.table_name)
            .field("days_to_keep", &self.days_to_keep)
            .field("probability", &self.probability)
            .field("schema", &self.schema.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl StoreConfig {
    /// Starts building a configuration.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`StoreConfig`].
///
/// # Example
///
/// ```rust
/// use relog::config::{Client, Connection, StoreConfig};
///
/// let config = StoreConfig::builder()
///     .client(Client::Sqlite)
///     .connection(Connection::File("logs.db".into()))
///     .days_to_keep(30)
///     .build()?;
/// # Ok::<(), relog::Error>(())
/// ```
#[derive(Default)]
pub struct StoreConfigBuilder {
    client: Option<Client>,
    connection: Connection,
    pool: Option<usize>,
    label: Option<String>,
    level: Option<String>,
    silent: bool,
    table_name: Option<String>,
    days_to_keep: Option<u32>,
    probability: Option<u32>,
    schema: Option<SchemaHook>,
}

impl StoreConfigBuilder {
    /// Selects the relational engine. Required.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the database location. Defaults to in-memory.
    pub fn connection(mut self, connection: Connection) -> Self {
        self.connection = connection;
        self
    }

    /// Sets the request channel capacity.
    pub fn pool(mut self, pool: usize) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Attaches a label to every entry's meta.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the level applied to entries with an empty level.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Drops writes while still signaling success.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Overrides the log table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Enables retention pruning with the given window in days.
    pub fn days_to_keep(mut self, days: u32) -> Self {
        self.days_to_keep = Some(days);
        self
    }

    /// Sets the prune trigger denominator.
    pub fn probability(mut self, probability: u32) -> Self {
        self.probability = Some(probability);
        self
    }

    /// Installs a column-extension hook, run once at table creation.
    pub fn schema<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut TableDef) + Send + Sync + 'static,
    {
        self.schema = Some(Arc::new(hook));
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// - `Error::Config` if no client was selected
    /// - `Error::Config` if the table name is not a valid SQL identifier
    /// - `Error::Config` if `probability` is zero
    /// - `Error::Config` if `pool` is zero
    pub fn build(self) -> Result<StoreConfig> {
        let client = self
            .client
            .ok_or_else(|| Error::Config("client is required".to_string()))?;

        let table_name = self
            .table_name
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        if !is_valid_identifier(&table_name) {
            return Err(Error::Config(format!(
                "table name '{table_name}' is not a valid SQL identifier"
            )));
        }

        let probability = self.probability.unwrap_or(DEFAULT_PROBABILITY);
        if probability == 0 {
            return Err(Error::Config("probability must be non-zero".to_string()));
        }

        let pool = self.pool.unwrap_or(DEFAULT_POOL);
        if pool == 0 {
            return Err(Error::Config("pool must be non-zero".to_string()));
        }

        Ok(StoreConfig {
            client,
            connection: self.connection,
            pool,
            label: self.label,
            level: self.level.unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
            silent: self.silent,
            table_name,
            days_to_keep: self.days_to_keep,
            probability,
            schema: self.schema,
        })
    }
}

// =============================================================================
// Identifier Validation
// =============================================================================

/// Checks that a name is a bare SQL identifier.
///
/// Table and column names are interpolated into DDL and queries (placeholders
/// cannot bind identifiers), so anything that is not `[A-Za-z_][A-Za-z0-9_]*`
/// is rejected up front.
pub(crate) fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Tests
// =============================================================================
