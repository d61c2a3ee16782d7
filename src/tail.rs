//! # Tail Feed
//!
//! A cancellable polling loop that emits newly inserted rows in id order.
//! The feed repeatedly asks the store actor for rows with `id` strictly
//! greater than its cursor, delivers them as [`TailEvent::Log`], advances the
//! cursor to the highest id delivered, and reschedules after a fixed delay
//! whether or not the poll found rows.
//!
//! ## State Machine
//!
//! ```text
//!            ┌────────────────────────────────────┐
//!            ▼                                    │ delay
//!       ┌─────────┐   rows    ┌───────────────┐   │
//!       │ Polling │──────────►│ EmittedOrIdle │───┘
//!       └─────────┘           └───────────────┘
//!            │ error               ▲
//!            ▼                     │ delay
//!       ┌──────────────┐           │
//!       │ ErrorEmitted │───────────┘
//!       └──────────────┘
//!
//!       any state ──destroy()──► Stopped (terminal)
//! ```
//!
//! Poll errors are emitted as [`TailEvent::Error`] and absorbed: the loop
//! reschedules identically after success or failure. A feed that died on the
//! first transient error would be unusable for long-lived consumers.
//!
//! ## Cooperative Cancellation
//!
//! [`TailHandle::destroy`] sets an atomic flag. The loop checks it at two
//! points: before delivering an in-flight poll's results, and before
//! rescheduling. At most one more poll may complete silently after destroy;
//! no further polls are scheduled. Dropping the handle (and with it the event
//! receiver) ends the loop the same way, since delivery fails.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::types::{LogId, LogRow, StreamOptions, TailStart};
use crate::writer::StoreHandle;

/// Capacity of the event channel between the poll loop and the handle.
const EVENT_CHANNEL_SIZE: usize = 256;

// =============================================================================
// Events
// =============================================================================

/// An event emitted by a tail feed.
#[derive(Debug)]
pub enum TailEvent {
    /// A newly observed row.
    Log(LogRow),

    /// A poll failed. The loop continues; the next poll runs after the
    /// usual delay.
    Error(Error),
}

// =============================================================================
// Handle
// =============================================================================

/// Consumer handle for a running tail feed.
///
/// # Example
///
/// ```rust,ignore
/// let mut feed = store.stream(StreamOptions::default());
///
/// while let Some(event) = feed.next().await {
///     match event {
///         TailEvent::Log(row) => println!("{} {}", row.id, row.message),
///         TailEvent::Error(e) => eprintln!("poll failed: {e}"),
///     }
/// }
/// ```
pub struct TailHandle {
    events: mpsc::Receiver<TailEvent>,
    destroyed: Arc<AtomicBool>,
}

impl TailHandle {
    /// Receives the next event. Returns `None` once the feed has stopped
    /// and all buffered events have been drained.
    pub async fn next(&mut self) -> Option<TailEvent> {
        self.events.recv().await
    }

    /// Receives the next event without waiting.
    pub fn try_next(&mut self) -> Option<TailEvent> {
        self.events.try_recv().ok()
    }

    /// Requests cancellation. Idempotent; takes effect before the next
    /// delivery or reschedule, so at most one in-flight poll completes
    /// silently afterwards.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    /// Whether `destroy` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Drop for TailHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// `TailHandle` is also an async [`Stream`], so consumers can use
/// `StreamExt` combinators instead of the explicit `next()` loop.
impl Stream for TailHandle {
    type Item = TailEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

// =============================================================================
// The Poll Loop
// =============================================================================

/// Starts a tail feed against the store actor.
///
/// The cursor seeds from `options.start`: `Latest` takes the write path's
/// last-known id, so the next poll begins at "new entries from now";
/// `After(id)` replays from a known point, excluding that exact id.
pub fn spawn_tail(store: StoreHandle, options: StreamOptions) -> TailHandle {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let destroyed = Arc::new(AtomicBool::new(false));

    let cursor = match options.start {
        TailStart::Latest => store.last_id(),
        TailStart::After(id) => id,
    };

    tokio::spawn(run_tail_loop(
        store,
        cursor,
        options,
        events_tx,
        Arc::clone(&destroyed),
    ));

    TailHandle {
        events: events_rx,
        destroyed,
    }
}

/// The polling loop. One poll in flight at a time; the next poll is
/// scheduled only after the current one settles.
async fn run_tail_loop(
    store: StoreHandle,
    mut cursor: LogId,
    options: StreamOptions,
    events: mpsc::Sender<TailEvent>,
    destroyed: Arc<AtomicBool>,
) {
    loop {
        if destroyed.load(Ordering::SeqCst) {
            break;
        }

        let poll = store.poll_after(cursor).await;

        // Cancellation check before delivering an in-flight poll's results.
        if destroyed.load(Ordering::SeqCst) {
            break;
        }

        match poll {
            Ok(rows) => {
                for row in rows {
                    let id = row.id;
                    if events.send(TailEvent::Log(row)).await.is_err() {
                        // Consumer gone; stop quietly.
                        return;
                    }
                    cursor = cursor.max(id);
                }
            }
            Err(e) => {
                // Emit and keep going; the reschedule below is the only
                // recovery mechanism.
                if events.send(TailEvent::Error(e)).await.is_err() {
                    return;
                }
            }
        }

        // Cancellation check before rescheduling.
        if destroyed.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}

// =============================================================================
// Tests
// =============================================================================
