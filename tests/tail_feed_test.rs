mod common;

use std::time::Duration;

use relog::{LogEntry, LogId, StreamOptions, TailEvent, TailStart};

fn fast() -> StreamOptions {
    StreamOptions::default().poll_interval(Duration::from_millis(20))
}

/// Tail-from-latest: seed 3 entries, start the feed, write a 4th; the feed
/// emits exactly the 4th row and none of the first 3.
#[tokio::test]
async fn tail_from_latest_emits_only_new_entries() {
    let store = common::memory_store();
    for i in 1..=3 {
        store
            .write(LogEntry::new("info", format!("seed {i}")))
            .await
            .unwrap();
    }

    let mut feed = store.stream(fast());

    // Let a couple of polls run against the seeded state.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(feed.try_next().is_none(), "seeded rows must not be emitted");

    store.write(LogEntry::new("info", "fourth")).await.unwrap();

    match tokio::time::timeout(Duration::from_secs(2), feed.next())
        .await
        .expect("the new row should arrive within a poll cycle")
    {
        Some(TailEvent::Log(row)) => {
            assert_eq!(row.id, LogId::from_raw(4));
            assert_eq!(row.message, "fourth");
        }
        other => panic!("expected the fourth row, got {other:?}"),
    }

    feed.destroy();
}

/// Tail-from-id: against ids 1..=5 with start = 2, the feed emits 3, 4, 5
/// in order and nothing for id 2.
#[tokio::test]
async fn tail_from_id_replays_rows_after_the_cursor() {
    let store = common::memory_store();
    for i in 1..=5 {
        store
            .write(LogEntry::new("info", format!("row {i}")))
            .await
            .unwrap();
    }

    let mut feed = store.stream(StreamOptions {
        start: TailStart::After(LogId::from_raw(2)),
        poll_interval: Duration::from_millis(20),
    });

    for expected in [3i64, 4, 5] {
        match tokio::time::timeout(Duration::from_secs(2), feed.next())
            .await
            .expect("replay rows should arrive promptly")
        {
            Some(TailEvent::Log(row)) => {
                assert_eq!(row.id, LogId::from_raw(expected));
                assert_eq!(row.message, format!("row {expected}"));
            }
            other => panic!("expected row {expected}, got {other:?}"),
        }
    }

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(feed.try_next().is_none(), "id 2 itself must be excluded");

    feed.destroy();
}

/// After destroy, no log or error event is emitted once the next full poll
/// cycle has completed.
#[tokio::test]
async fn destroy_silences_the_feed_within_one_cycle() {
    let store = common::memory_store();
    let mut feed = store.stream(fast());

    feed.destroy();
    assert!(feed.is_destroyed());

    store.write(LogEntry::new("info", "after destroy")).await.unwrap();

    // Wait out several would-be poll cycles.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(feed.try_next().is_none());

    // destroy is idempotent.
    feed.destroy();
}

/// Poll failures surface as error events and the feed keeps polling: after
/// the store shuts down, every cycle emits an error instead of terminating
/// the feed.
#[tokio::test]
async fn poll_errors_are_emitted_and_the_feed_continues() {
    let store = common::memory_store();
    let mut feed = store.stream(fast());

    store.shutdown().await;

    // Once the actor is gone, each poll fails with Closed.
    let first = common::eventually(
        Duration::from_secs(2),
        Duration::from_millis(10),
        || feed.try_next(),
    )
    .await;
    match first {
        TailEvent::Error(relog::Error::Closed(_)) => {}
        other => panic!("expected a closed-store error event, got {other:?}"),
    }

    // The loop reschedules after a failure just like after a success, so a
    // second error event follows on the next cycle.
    let second = common::eventually(
        Duration::from_secs(2),
        Duration::from_millis(10),
        || feed.try_next(),
    )
    .await;
    assert!(matches!(second, TailEvent::Error(_)));

    feed.destroy();
}

/// Two independent feeds each see the same new row: feeds hold their own
/// cursors and never share mutable state after seeding.
#[tokio::test]
async fn independent_feeds_have_independent_cursors() {
    let store = common::memory_store();
    store.write(LogEntry::new("info", "existing")).await.unwrap();

    let mut from_now = store.stream(fast());
    let mut from_start = store.stream(StreamOptions {
        start: TailStart::After(LogId::NONE),
        poll_interval: Duration::from_millis(20),
    });

    // The replay feed sees the existing row; the tail feed does not.
    match tokio::time::timeout(Duration::from_secs(2), from_start.next())
        .await
        .expect("replay feed should emit the existing row")
    {
        Some(TailEvent::Log(row)) => assert_eq!(row.message, "existing"),
        other => panic!("expected existing row, got {other:?}"),
    }

    store.write(LogEntry::new("info", "fresh")).await.unwrap();

    for feed in [&mut from_now, &mut from_start] {
        match tokio::time::timeout(Duration::from_secs(2), feed.next())
            .await
            .expect("both feeds should see the fresh row")
        {
            Some(TailEvent::Log(row)) => assert_eq!(row.message, "fresh"),
            other => panic!("expected fresh row, got {other:?}"),
        }
    }

    from_now.destroy();
    from_start.destroy();
}
