//! # Error Handling for relog
//!
//! This module defines the error types used throughout relog. A single error
//! enum ([`Error`]) represents all failure modes, which keeps function
//! signatures and caller-side matching simple.
//!
//! ## Error Categories
//!
//! | Category      | Examples                           | Typical Response            |
//! |---------------|------------------------------------|-----------------------------|
//! | Configuration | missing client, bad table name     | Fatal at construction       |
//! | Store         | SQLite error, disk full, locked    | Surfaced verbatim, no retry |
//! | Query         | unknown projection field           | Fix the request             |
//! | Closed        | store actor has shut down          | Stop submitting work        |
//!
//! Pruning errors are deliberately *not* a category here: the retention
//! pruner has no waiting caller, so its failures are converted into synthetic
//! log entries instead of propagating (see [`crate::writer`]).

use thiserror::Error;

// =============================================================================
// Error Type
// =============================================================================

/// All errors that can occur in relog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration.
    ///
    /// # When This Happens
    ///
    /// - No `client` was supplied to the config builder
    /// - The table name is not a valid SQL identifier
    /// - `probability` is zero
    ///
    /// Configuration errors are fatal at construction and never recovered.
    #[error("configuration error: {0}")]
    Config(String),

    /// SQLite operation failed.
    ///
    /// Wraps any error from the `rusqlite` crate: locked database file, full
    /// disk, corruption, or a SQL syntax error (the latter indicates a bug in
    /// relog). Connectivity and statement errors are surfaced verbatim
    /// through the relevant operation's result and are never retried by the
    /// write or query paths.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Metadata payload could not be serialized or parsed.
    #[error("meta payload error: {0}")]
    Meta(#[from] serde_json::Error),

    /// A query request was malformed.
    ///
    /// # When This Happens
    ///
    /// - A projection field is not a valid identifier
    /// - An unsupported ordering column was requested
    #[error("invalid query: {0}")]
    Query(String),

    /// The store actor has shut down and can no longer accept requests.
    #[error("store closed: {0}")]
    Closed(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Error messages appear in logs and synthetic entries; keep them readable.
    #[test]
    fn test_error_display() {
        let config = Error::Config("client is required".to_string());
        assert_eq!(config.to_string(), "configuration error: client is required");

        let query = Error::Query("unknown field 'drop table'".to_string());
        assert_eq!(
            query.to_string(),
            "invalid query: unknown field 'drop table'"
        );

        let closed = Error::Closed("writer has shut down".to_string());
        assert_eq!(closed.to_string(), "store closed: writer has shut down");
    }

    /// rusqlite errors convert automatically via `#[from]`, enabling `?`.
    #[test]
    fn test_sqlite_error_conversion() {
        let sqlite_err = rusqlite::Error::InvalidParameterName("test".to_string());
        let our_err: Error = sqlite_err.into();

        assert!(matches!(our_err, Error::Sqlite(_)));
        assert!(our_err.to_string().contains("sqlite error"));
    }
}
