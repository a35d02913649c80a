//! A concurrent, in-memory key-value store built on a fixed-size bucket
//! hash table.
//!
//! Each bucket is protected by its own reader/writer lock; each cell within
//! a bucket's chain carries its own mutex over just its value buffer. Chain
//! nodes are served from a slab-style block pool rather than the global
//! allocator. See [`Config`] for the knobs available at [`init`].

mod block_pool;
mod bucket;
mod bucket_pool;
mod cell;
mod chain;
mod config;
mod error;
mod hash;
mod logging;
mod ops;
mod pool_box;
mod stats;
mod store;

pub use config::Config;
pub use error::StoreError;
pub use stats::{
    CollisionStats, CounterSnapshot, DistributionStats, MemoryStats, OperationStats, Statistics,
};

use lazy_static::lazy_static;
use parking_lot::RwLock;
use store::StoreInner;

lazy_static! {
    static ref STORE: RwLock<Option<StoreInner>> = RwLock::new(None);
}

/// Builds the store with a default terminal logger. Equivalent to
/// `init_with_logger(config, <default logger>)`.
pub fn init(config: Config) -> Result<(), StoreError> {
    init_with_logger(config, logging::default_logger())
}

/// Builds the store, tearing down any previous instance first. Any re-init
/// goes through [`cleanup`] first, matching the lifecycle contract.
pub fn init_with_logger(config: Config, logger: slog::Logger) -> Result<(), StoreError> {
    // Validated up front, before any existing store is torn down or any
    // allocation happens: an invalid config must leave a prior store (if
    // any) untouched.
    config.validate()?;
    cleanup()?;
    let inner = StoreInner::build_with_logger(config, logger)?;
    *STORE.write() = Some(inner);
    Ok(())
}

/// Tears down the store, if present. Idempotent: calling `cleanup` on an
/// already-uninitialised store is not an error.
pub fn cleanup() -> Result<(), StoreError> {
    let mut guard = STORE.write();
    if let Some(inner) = guard.take() {
        slog::info!(inner.logger(), "key store cleaned up");
    }
    Ok(())
}

fn with_store<T>(f: impl FnOnce(&StoreInner) -> Result<T, StoreError>) -> Result<T, StoreError> {
    let guard = STORE.read();
    let inner = guard.as_ref().ok_or(StoreError::NotInitialised)?;
    f(inner)
}

/// Inserts or updates the value for `key`. `key` must be non-empty.
pub fn set(key: &str, value: &[u8]) -> Result<(), StoreError> {
    with_store(|inner| ops::set(inner, key.as_bytes(), value))
}

/// Returns an owned copy of the value for `key`, or [`StoreError::KeyNotFound`].
pub fn get(key: &str) -> Result<Vec<u8>, StoreError> {
    with_store(|inner| ops::get(inner, key.as_bytes()))
}

/// Removes the entry for `key`, or returns [`StoreError::KeyNotFound`].
pub fn delete(key: &str) -> Result<(), StoreError> {
    with_store(|inner| ops::delete(inner, key.as_bytes()))
}

/// A point-in-time statistics snapshot. Returns an all-zero [`Statistics`]
/// if the store has not been initialised, rather than an error — this is
/// advisory reporting, not a fallible operation.
pub fn stats() -> Statistics {
    let guard = STORE.read();
    match guard.as_ref() {
        Some(inner) => stats::collect(inner.buckets(), inner.counters(), inner.bucket_stride()),
        None => Statistics::default(),
    }
}
