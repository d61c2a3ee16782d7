//! # relog - Append-Only Log Sink on SQLite
//!
//! relog persists structured log records into a single relational table and
//! provides three capabilities beyond plain insertion:
//!
//! - **Bounded historical queries**: time-windowed, field-projected, ordered
//! - **Live tailing**: a cancellable polling feed over newly inserted rows
//! - **Retention pruning**: probabilistic time-based cleanup on the write
//!   path, recording its own outcomes back into the same table
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         LogStore (async)                        │
//! │             write / query / stream / cleanup / clear            │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ mpsc
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Store Actor                                │
//! │          (dedicated thread, owns the write connection)          │
//! │                                                                 │
//! │   ┌──────────────┐  ┌────────────────┐  ┌──────────────────┐   │
//! │   │  Insert +    │  │  Query / Poll  │  │ Retention Pruner │   │
//! │   │ cursor update│  │                │  │ (Bernoulli trial)│   │
//! │   └──────────────┘  └────────────────┘  └──────────────────┘   │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//!                          ┌─────────┐
//!                          │ SQLite  │
//!                          └─────────┘
//! ```
//!
//! ## Core Invariants
//!
//! 1. **Single logical writer**: one actor thread owns the connection
//! 2. **Monotonic ids**: database-assigned, strictly increasing, never reused
//! 3. **Timestamps always populated**: defaulted by the store when omitted
//! 4. **Pruned rows are gone**: no feed ever observes a pruned row; pruning
//!    and tailing race, and a row read before the delete commits is
//!    delivered once and never again
//!
//! ## Module Organization
//!
//! - [`error`]: single error enum for all failure modes
//! - [`config`]: immutable store configuration and builder
//! - [`types`]: domain types (ids, entries, rows, options)
//! - [`schema`]: table creation, extension hook, cursor recovery
//! - [`reader`]: direct-SQL historical query and tail poll
//! - [`retention`]: delete-older-than and truncate primitives
//! - [`writer`]: the store actor and its async handle
//! - [`tail`]: the polling tail feed
//! - [`api`]: the public [`LogStore`] entry point

pub mod api;
pub mod config;
pub mod error;
pub mod reader;
pub mod retention;
pub mod schema;
pub mod tail;
pub mod types;
pub mod writer;

pub use api::{LogStore, LoggedNotice};
pub use config::{Client, Connection, SchemaHook, StoreConfig, StoreConfigBuilder};
pub use error::{Error, Result};
pub use schema::{Database, TableDef};
pub use tail::{TailEvent, TailHandle};
pub use writer::{spawn_store_writer, StoreHandle};

pub use types::{
    LogEntry, LogId, LogRow, Meta, QueryOptions, SortOrder, StreamOptions, TailStart,
};
