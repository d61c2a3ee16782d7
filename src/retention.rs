//! # Retention Primitives
//!
//! Time-based deletion over the log table. This module provides the raw
//! operations; the trigger policy (the Bernoulli draw per write) and the
//! recording of outcomes as synthetic log entries live in the store actor,
//! which owns the connection and the internal write path.
//!
//! ## Randomized Trigger as a Scheduling Primitive
//!
//! Rather than deleting expired rows on every write, the write path performs
//! a Bernoulli trial with parameter `1/probability` and prunes only when it
//! succeeds. Expected writes between prunes equals `probability`; pruning
//! latency is non-deterministic but bounded in expectation over many writes.
//! A deterministic scheduled task could substitute without changing long-run
//! observable behavior.

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::error::Result;
use crate::types::format_timestamp;

/// Message of the synthetic entry recorded after a successful prune.
pub const TRIM_SUCCESS_MESSAGE: &str = "Logs trimmed successfully";

/// Message of the synthetic entry recorded after a failed prune.
pub const TRIM_FAILURE_MESSAGE: &str = "Log trimming failed";

/// Message of the synthetic entry recorded after a table clear.
pub const CLEAR_SUCCESS_MESSAGE: &str = "Logs cleared successfully";

/// Renders the expiry cutoff: now (UTC) minus the retention window.
///
/// Rows with `timestamp` strictly older than the cutoff are expired.
pub fn expiry_cutoff(days_to_keep: u32) -> String {
    format_timestamp(Utc::now() - Duration::days(i64::from(days_to_keep)))
}

/// Deletes all rows strictly older than the retention window.
///
/// Returns the number of rows deleted.
pub fn prune_expired(conn: &Connection, table: &str, days_to_keep: u32) -> Result<usize> {
    let cutoff = expiry_cutoff(days_to_keep);
    let deleted = conn.execute(
        &format!("DELETE FROM {table} WHERE timestamp < ?"),
        [cutoff],
    )?;
    Ok(deleted)
}

/// Unconditionally deletes every row in the table.
///
/// Returns the number of rows deleted.
pub fn truncate(conn: &Connection, table: &str) -> Result<usize> {
    let deleted = conn.execute(&format!("DELETE FROM {table}"), [])?;
    Ok(deleted)
}

// =============================================================================
// Tests
// =============================================================================
