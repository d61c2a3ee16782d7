mod common;

use chrono::{TimeZone, Utc};
use relog::{LogEntry, QueryOptions, SortOrder};
use serde_json::Value;

fn at(day: u32, hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

/// Window bounds are inclusive: [from, until] keeps t1 and t2, drops t3.
#[tokio::test]
async fn window_is_inclusive_on_both_bounds() {
    let store = common::memory_store();

    let t1 = at(1, 8);
    let t2 = at(2, 8);
    let t3 = at(3, 8);
    for (ts, msg) in [(t1, "t1"), (t2, "t2"), (t3, "t3")] {
        store
            .write(LogEntry::new("info", msg).with_timestamp(ts))
            .await
            .unwrap();
    }

    let rows = store
        .query(QueryOptions::default().from(t1).until(t2))
        .await
        .unwrap();

    let messages: Vec<&Value> = rows.iter().map(|r| &r["message"]).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.contains(&&Value::String("t1".into())));
    assert!(messages.contains(&&Value::String("t2".into())));
}

/// A lone bound disables windowing entirely.
#[tokio::test]
async fn lone_bound_returns_everything() {
    let store = common::memory_store();
    for day in 1..=3 {
        store
            .write(LogEntry::new("info", format!("day {day}")).with_timestamp(at(day, 12)))
            .await
            .unwrap();
    }

    let rows = store
        .query(QueryOptions::default().from(at(2, 0)))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
}

/// Projection, ordering, and the row limit compose.
#[tokio::test]
async fn projection_order_and_limit() {
    let store = common::memory_store();
    for day in 1..=5 {
        store
            .write(LogEntry::new("info", format!("day {day}")).with_timestamp(at(day, 12)))
            .await
            .unwrap();
    }

    let rows = store
        .query(
            QueryOptions::default()
                .fields(["message", "timestamp"])
                .order(SortOrder::Desc)
                .rows(2),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["message"], Value::String("day 5".into()));
    assert_eq!(rows[1]["message"], Value::String("day 4".into()));
    assert!(!rows[0].contains_key("level"));
}

/// Malformed projections surface as errors through the same path, no retry.
#[tokio::test]
async fn invalid_projection_field_is_rejected() {
    let store = common::memory_store();

    let err = store
        .query(QueryOptions::default().fields(["message, (SELECT 1)"]))
        .await
        .unwrap_err();
    assert!(matches!(err, relog::Error::Query(_)));
}

/// Ascending order sorts by timestamp, not insertion order.
#[tokio::test]
async fn ascending_order_follows_timestamps() {
    let store = common::memory_store();

    // Inserted out of chronological order.
    for (day, msg) in [(3, "late"), (1, "early"), (2, "middle")] {
        store
            .write(LogEntry::new("info", msg).with_timestamp(at(day, 6)))
            .await
            .unwrap();
    }

    let rows = store
        .query(QueryOptions::default().order(SortOrder::Asc))
        .await
        .unwrap();

    let messages: Vec<&Value> = rows.iter().map(|r| &r["message"]).collect();
    assert_eq!(
        messages,
        vec![
            &Value::String("early".into()),
            &Value::String("middle".into()),
            &Value::String("late".into()),
        ]
    );
}
