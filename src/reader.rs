//! # Read Operations
//!
//! This module provides the read side of the store as direct-SQL functions
//! over a borrowed `Connection`: the bounded historical query and the tail
//! feed's poll-after-id. The store actor calls these with its owned
//! connection, so reads serialize with writes and always see the latest
//! committed data.
//!
//! ## Query Shape
//!
//! A historical query is assembled from four independent options:
//!
//! ```text
//! SELECT {fields | *}
//! FROM   {table}
//! [WHERE timestamp >= ?from AND timestamp <= ?until]   -- both or neither
//! [ORDER BY timestamp {ASC|DESC}]
//! [LIMIT ?rows]
//! ```
//!
//! Timestamps are TEXT in a fixed-width format whose lexicographic order is
//! chronological, so the window filter compares strings directly.
//!
//! ## Identifier Safety
//!
//! SQLite placeholders cannot bind identifiers, so projected field names are
//! interpolated. Every field is validated against bare-identifier rules
//! first; anything else is rejected as `Error::Query` before a statement is
//! prepared. A valid identifier naming a column that does not exist surfaces
//! as the store's own error, verbatim.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use crate::config::is_valid_identifier;
use crate::error::{Error, Result};
use crate::types::{format_timestamp, LogId, LogRow, Meta, QueryOptions};

/// A projected row: field name to realized value.
pub type RowMap = serde_json::Map<String, Value>;

// =============================================================================
// Historical Query
// =============================================================================

/// Runs a bounded, windowed, projected, ordered query.
///
/// Returns the realized row set; does not stream. Errors surface verbatim
/// without retry.
pub fn query(conn: &Connection, table: &str, options: &QueryOptions) -> Result<Vec<RowMap>> {
    let projection = match &options.fields {
        Some(fields) => {
            for field in fields {
                if !is_valid_identifier(field) {
                    return Err(Error::Query(format!("invalid field name '{field}'")));
                }
            }
            fields.join(", ")
        }
        None => "*".to_string(),
    };

    let mut sql = format!("SELECT {projection} FROM {table}");
    let mut params: Vec<String> = Vec::new();

    // Both bounds or no windowing at all.
    if let Some((from, until)) = options.window() {
        sql.push_str(" WHERE timestamp >= ? AND timestamp <= ?");
        params.push(format_timestamp(from));
        params.push(format_timestamp(until));
    }

    if let Some(order) = options.order {
        sql.push_str(&format!(" ORDER BY timestamp {}", order.as_sql()));
    }

    if let Some(rows) = options.rows {
        sql.push_str(&format!(" LIMIT {rows}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mapped = stmt.query_map(
        rusqlite::params_from_iter(params.iter()),
        |row| {
            let mut map = RowMap::new();
            for (i, name) in column_names.iter().enumerate() {
                map.insert(name.clone(), column_value(row.get_ref(i)?, name));
            }
            Ok(map)
        },
    )?;

    let mut out = Vec::new();
    for row in mapped {
        out.push(row?);
    }
    Ok(out)
}

/// Converts a SQLite value into a JSON value for a projected row.
///
/// The `meta` column holds a JSON payload and is decoded back into structure;
/// a payload that fails to parse is passed through as the raw string. The
/// base table carries no blob columns, so blobs map to null.
fn column_value(value: ValueRef<'_>, column: &str) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if column == "meta" {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            } else {
                Value::String(text)
            }
        }
        ValueRef::Blob(_) => Value::Null,
    }
}

// =============================================================================
// Tail Poll
// =============================================================================

/// Reads all rows with `id` strictly greater than `after`, in ascending id
/// order. This is the tail feed's poll primitive.
pub fn poll_after(conn: &Connection, table: &str, after: LogId) -> Result<Vec<LogRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, level, message, timestamp, meta FROM {table} WHERE id > ? ORDER BY id ASC"
    ))?;

    let mapped = stmt.query_map([after.as_raw()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in mapped {
        let (id, level, message, timestamp, meta) = row?;
        out.push(LogRow {
            id: LogId::from_raw(id),
            level,
            message,
            timestamp,
            meta: serde_json::from_str::<Meta>(&meta)?,
        });
    }
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Client, StoreConfig};
    use crate::schema::Database;
    use crate::types::SortOrder;
    use chrono::{TimeZone, Utc};

    fn seeded_conn() -> Connection {
        let config = StoreConfig::builder().client(Client::Sqlite).build().unwrap();
        let conn = Database::open(&config).unwrap().into_connection();
        for (level, message, ts) in [
            ("info", "first", "2024-01-01 00:00:00.000"),
            ("warn", "second", "2024-01-02 00:00:00.000"),
            ("error", "third", "2024-01-03 00:00:00.000"),
        ] {
            conn.execute(
                "INSERT INTO winston_logs (level, message, timestamp) VALUES (?, ?, ?)",
                [level, message, ts],
            )
            .unwrap();
        }
        conn
    }

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_query_all_defaults() {
        let conn = seeded_conn();
        let rows = query(&conn, "winston_logs", &QueryOptions::default()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["message"], Value::String("first".into()));
        // meta defaults to an empty object and decodes as structure.
        assert_eq!(rows[0]["meta"], serde_json::json!({}));
    }

    #[test]
    fn test_query_window_is_inclusive() {
        let conn = seeded_conn();
        let opts = QueryOptions::default().from(day(1)).until(day(2));

        let rows = query(&conn, "winston_logs", &opts).unwrap();
        assert_eq!(rows.len(), 2);
        let messages: Vec<_> = rows.iter().map(|r| r["message"].clone()).collect();
        assert!(messages.contains(&Value::String("first".into())));
        assert!(messages.contains(&Value::String("second".into())));
    }

    #[test]
    fn test_lone_bound_disables_windowing() {
        let conn = seeded_conn();
        let opts = QueryOptions::default().from(day(2));

        let rows = query(&conn, "winston_logs", &opts).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_query_projection_and_order() {
        let conn = seeded_conn();
        let opts = QueryOptions::default()
            .fields(["level", "message"])
            .order(SortOrder::Desc)
            .rows(2);

        let rows = query(&conn, "winston_logs", &opts).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["message"], Value::String("third".into()));
        assert_eq!(rows[1]["message"], Value::String("second".into()));
        assert!(!rows[0].contains_key("timestamp"));
        assert!(!rows[0].contains_key("id"));
    }

    #[test]
    fn test_query_rejects_invalid_field() {
        let conn = seeded_conn();
        let opts = QueryOptions::default().fields(["level; DROP TABLE winston_logs"]);

        let err = query(&conn, "winston_logs", &opts).unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn test_poll_after_excludes_cursor_row() {
        let conn = seeded_conn();

        let rows = poll_after(&conn, "winston_logs", LogId::from_raw(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, LogId::from_raw(2));
        assert_eq!(rows[1].id, LogId::from_raw(3));

        let none = poll_after(&conn, "winston_logs", LogId::from_raw(3)).unwrap();
        assert!(none.is_empty());
    }
}
