#![allow(dead_code)]

use std::time::Duration;

use relog::{Client, LogStore, StoreConfig, StoreConfigBuilder};

/// Opens an in-memory store with defaults, retention disabled.
pub fn memory_store() -> LogStore {
    init_tracing();
    LogStore::open(base_config().build().expect("build config")).expect("open store")
}

/// Installs a test subscriber so `RUST_LOG=relog=debug cargo test` shows the
/// writer's prune and outcome traces. First caller wins; the rest are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Base builder for test configs: SQLite client, in-memory connection.
pub fn base_config() -> StoreConfigBuilder {
    StoreConfig::builder().client(Client::Sqlite)
}

/// A prune probability the Bernoulli trial effectively never hits, so tests
/// that enable retention stay deterministic until they force a cleanup.
pub const NEVER_PRUNE: u32 = u32::MAX;

pub async fn eventually<T>(
    timeout: Duration,
    interval: Duration,
    mut f: impl FnMut() -> Option<T>,
) -> T {
    let start = std::time::Instant::now();
    loop {
        if let Some(v) = f() {
            return v;
        }
        if start.elapsed() > timeout {
            panic!("condition not met within {:?}", timeout);
        }
        tokio::time::sleep(interval).await;
    }
}
