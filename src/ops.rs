//! The operation core: the nine-step pipeline shared by `set`, `get` and
//! `delete`.
//!
//! hash -> index -> bucket lookup -> bucket lock -> chain walk -> cell
//! mutex / node+cell creation / unlink+destroy -> release bucket lock ->
//! counters and histogram.

use crate::cell::Cell;
use crate::chain::ChainNode;
use crate::error::StoreError;
use crate::hash::murmur3_32;
use crate::pool_box::PoolBox;
use crate::stats::{Counters, Operation};
use crate::store::StoreInner;

fn fingerprint_of(inner: &StoreInner, key: &[u8]) -> u32 {
    murmur3_32(key, inner.seed())
}

fn record(counters: &Counters, op: Operation, result: &Result<(), StoreError>) {
    let failed = result.is_err();
    counters.record(op, failed);
    if let Err(err) = result {
        counters.record_error_code(err.code());
    }
}

/// Inserts or updates the value for `key`.
///
/// Find-then-insert-or-update happens under a single bucket write lock, so
/// no duplicate key can race in between: if a matching cell exists its
/// value is updated under the cell's mutex while the bucket lock is still
/// held; otherwise a new node and cell are created and linked at the chain
/// head.
pub(crate) fn set(inner: &StoreInner, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
    let outcome = set_inner(inner, key, value);
    let op = match &outcome {
        Ok(SetOutcome::Inserted) => Operation::Add,
        Ok(SetOutcome::Updated) => Operation::Edit,
        Err(_) => Operation::Add,
    };
    let as_result = outcome.as_ref().map(|_| ()).map_err(|e| e.clone());
    record(inner.counters(), op, &as_result);
    if let Ok(SetOutcome::Inserted) = &outcome {
        inner.counters().record(Operation::Create, false);
    }
    if let Ok(SetOutcome::Updated) = &outcome {
        inner.counters().record(Operation::Update, false);
    }
    as_result
}

enum SetOutcome {
    Inserted,
    Updated,
}

fn set_inner(inner: &StoreInner, key: &[u8], value: &[u8]) -> Result<SetOutcome, StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument);
    }

    let fingerprint = fingerprint_of(inner, key);
    let index = inner.buckets().index_for(fingerprint);
    let bucket = inner.buckets().get(index);

    let mut state = bucket.write();
    if let Some(cell) = state.find(key, fingerprint) {
        cell.update(value);
        return Ok(SetOutcome::Updated);
    }

    let node = unsafe { PoolBox::new(inner.chain_pool(), ChainNode::new(fingerprint, Cell::create(key, fingerprint, value), None)) };
    state.insert(node);
    Ok(SetOutcome::Inserted)
}

/// Reads the current value for `key`, or `KeyNotFound`.
pub(crate) fn get(inner: &StoreInner, key: &[u8]) -> Result<Vec<u8>, StoreError> {
    let outcome = get_inner(inner, key);
    let as_result = outcome.as_ref().map(|_| ()).map_err(|e| e.clone());
    record(inner.counters(), Operation::Find, &as_result);
    if outcome.is_ok() {
        inner.counters().record(Operation::Read, false);
    }
    outcome
}

fn get_inner(inner: &StoreInner, key: &[u8]) -> Result<Vec<u8>, StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument);
    }

    let fingerprint = fingerprint_of(inner, key);
    let index = inner.buckets().index_for(fingerprint);
    let bucket = inner.buckets().get(index);

    let state = bucket.read();
    state
        .find(key, fingerprint)
        .map(Cell::read)
        .ok_or(StoreError::KeyNotFound)
}

/// Removes the entry for `key`, if present.
///
/// Ownership of the cell transfers out of the chain under the bucket write
/// lock; the cell (and the node's pool slot) are dropped only after the
/// unlink, while the lock is still held, matching the "destroy completed
/// inside the write lock" ordering rule.
pub(crate) fn delete(inner: &StoreInner, key: &[u8]) -> Result<(), StoreError> {
    let outcome = delete_inner(inner, key);
    record(inner.counters(), Operation::Delete, &outcome);
    outcome
}

fn delete_inner(inner: &StoreInner, key: &[u8]) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument);
    }

    let fingerprint = fingerprint_of(inner, key);
    let index = inner.buckets().index_for(fingerprint);
    let bucket = inner.buckets().get(index);

    let mut state = bucket.write();
    state.remove(key, fingerprint).map(drop).ok_or(StoreError::KeyNotFound)
}
