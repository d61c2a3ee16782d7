//! # Domain Types for relog
//!
//! This module defines the core types used throughout relog: row identifiers,
//! log entries and rows, query options, and tail-feed seeds.
//!
//! ## Design Philosophy: Newtypes for Safety
//!
//! Row identifiers are wrapped in [`LogId`] rather than passed around as bare
//! `i64`. The signature `fn poll_after(after: LogId)` cannot be fed a limit
//! or a timestamp by accident, and the representation can change without
//! touching call sites.
//!
//! ## Invariants
//!
//! - [`LogId`]: database-assigned, strictly increasing with insertion order,
//!   never reused. Zero is the "nothing observed yet" sentinel.
//! - [`LogEntry::timestamp`]: always UTC; when `None`, the store defaults the
//!   column at insert time (millisecond precision).

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// =============================================================================
// Timestamps
// =============================================================================

/// Timestamp column format: UTC, millisecond precision.
///
/// Matches SQLite's `strftime('%Y-%m-%d %H:%M:%f', 'now')`, which the store
/// uses to default the column. Lexicographic ordering of the rendered string
/// equals chronological ordering, so range filters compare TEXT directly.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders a UTC timestamp in the store's column format.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

// =============================================================================
// Row Identification
// =============================================================================

/// The database-assigned identifier of a log row.
///
/// # Invariants
///
/// - Assigned by SQLite (`INTEGER PRIMARY KEY AUTOINCREMENT`), never by the
///   client
/// - Strictly increasing with insertion order
/// - Never reused, even after pruning
///
/// `LogId::NONE` (zero) is the cursor's initial value, meaning "no row
/// observed yet"; SQLite rowids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct LogId(i64);

impl LogId {
    /// Sentinel for "no row observed yet". Also returned by silent-mode
    /// writes, which never touch the store.
    pub const NONE: LogId = LogId(0);

    /// Creates a LogId from a raw rowid.
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw rowid for database parameters.
    pub fn as_raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Log Entries and Rows
// =============================================================================

/// Caller-supplied metadata attached to an entry.
///
/// Persisted as a JSON payload in the `meta` column. A `BTreeMap` keeps the
/// serialized form deterministic.
pub type Meta = BTreeMap<String, Value>;

/// A structured log record on its way into the store.
///
/// This is the write-side type: it has no id because ids are assigned by the
/// database. The read-side counterpart is [`LogRow`].
///
/// # Example
///
/// ```rust
/// use relog::types::LogEntry;
///
/// let entry = LogEntry::new("info", "user signed in")
///     .with_meta("user_id", serde_json::json!(42));
/// assert_eq!(entry.level, "info");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Severity label (`"info"`, `"error"`, ...). An empty level is replaced
    /// by the store's configured default at insert time.
    pub level: String,

    /// Human-readable message.
    pub message: String,

    /// UTC timestamp. `None` lets the store default the column.
    pub timestamp: Option<DateTime<Utc>>,

    /// Arbitrary additional caller-supplied fields.
    pub meta: Meta,
}

impl LogEntry {
    /// Creates a new entry with the given level and message.
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            timestamp: None,
            meta: Meta::new(),
        }
    }

    /// Sets an explicit timestamp instead of the store default.
    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Attaches a metadata field.
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// A log row as realized in the table. Serializable for forwarding to
/// downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    /// Database-assigned identifier.
    pub id: LogId,

    /// Severity label.
    pub level: String,

    /// Human-readable message.
    pub message: String,

    /// Rendered timestamp in [`TIMESTAMP_FORMAT`].
    pub timestamp: String,

    /// Metadata payload decoded from the `meta` column.
    pub meta: Meta,
}

// =============================================================================
// Query Options
// =============================================================================

/// Ordering direction for windowed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

impl SortOrder {
    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Options for a bounded historical query.
///
/// # Windowing
///
/// `from` and `until` form an inclusive UTC window and are only honored
/// together: supplying one without the other disables windowing entirely.
///
/// # Example
///
/// ```rust
/// use relog::types::{QueryOptions, SortOrder};
///
/// let opts = QueryOptions::default()
///     .fields(["level", "message"])
///     .rows(50)
///     .order(SortOrder::Desc);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Column projection. `None` selects all columns.
    pub fields: Option<Vec<String>>,

    /// Inclusive window start (UTC). Only honored together with `until`.
    pub from: Option<DateTime<Utc>>,

    /// Inclusive window end (UTC). Only honored together with `from`.
    pub until: Option<DateTime<Utc>>,

    /// Maximum number of rows. `None` is unbounded.
    pub rows: Option<u32>,

    /// Ordering by `timestamp`. `None` leaves the order store-defined.
    pub order: Option<SortOrder>,
}

impl QueryOptions {
    /// Restricts the projection to the given columns.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the inclusive window start.
    pub fn from(mut self, ts: DateTime<Utc>) -> Self {
        self.from = Some(ts);
        self
    }

    /// Sets the inclusive window end.
    pub fn until(mut self, ts: DateTime<Utc>) -> Self {
        self.until = Some(ts);
        self
    }

    /// Limits the result to at most `rows` rows.
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Orders the result by timestamp.
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Returns the effective window, or `None` when windowing is disabled.
    ///
    /// Both bounds are required; a lone `from` or `until` is ignored.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.from, self.until) {
            (Some(from), Some(until)) => Some((from, until)),
            _ => None,
        }
    }
}

// =============================================================================
// Tail Feed Options
// =============================================================================

/// Default repoll delay for the tail feed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Where a tail feed starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailStart {
    /// Seed from the write path's last-known id: the next poll begins exactly
    /// at "new entries from now". This is the `-1` / omitted case of the
    /// stream contract.
    #[default]
    Latest,

    /// Seed from a known id. The row with that exact id is excluded; rows
    /// after it are included (at-least-once replay).
    After(LogId),
}

impl From<i64> for TailStart {
    /// Maps the integer stream contract onto the enum: any negative value
    /// means "tail from now".
    fn from(start: i64) -> Self {
        if start < 0 {
            TailStart::Latest
        } else {
            TailStart::After(LogId::from_raw(start))
        }
    }
}

/// Options for starting a tail feed.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Cursor seed.
    pub start: TailStart,

    /// Fixed delay between polls. The loop reschedules after this delay
    /// regardless of whether the previous poll found rows or failed.
    pub poll_interval: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            start: TailStart::Latest,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl StreamOptions {
    /// Starts from a known id (that id excluded).
    pub fn after(id: LogId) -> Self {
        Self {
            start: TailStart::After(id),
            ..Self::default()
        }
    }

    /// Overrides the repoll delay. Mainly for tests and operators that need
    /// a tighter cycle than the 2-second default.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
