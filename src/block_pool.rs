//! A slab-style block-pool allocator.
//!
//! Serves fixed-size slots (`ChainNode` today; a tree-node kind is the
//! reserved extension point described by the bucket-container discriminant
//! in `bucket.rs`, and is not instantiated yet). Allocation policy:
//!
//! 1. pop a previously-freed slot off the free-slot stack, if any;
//! 2. else take the next never-yet-used slot from the bump cursor;
//! 3. else fall back to an individual heap allocation, remembering its
//!    address so `cleanup` can still reclaim it instead of leaking it.
//!
//! The bump cursor, free-slot stack and heap-fallback address set are all
//! behind one `Mutex`: several source variants this design is drawn from
//! manipulate this state unsynchronised even when the surrounding store is
//! in concurrent mode, which is a latent race. This implementation
//! synchronises it unconditionally rather than trust a caller to only reach
//! it from one mode.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

struct Inner<T> {
    arena: Box<[MaybeUninit<T>]>,
    next_block: usize,
    free_list: Vec<NonNull<T>>,
    heap_fallback: HashSet<usize>,
}

// SAFETY: `Inner<T>` is only ever touched through `SlabPool`'s `Mutex`, which
// provides the exclusion that `NonNull`'s lack of `Send`/`Sync` would
// otherwise withhold.
unsafe impl<T: Send> Send for Inner<T> {}

/// A fixed-capacity arena of `T`-sized slots with heap overflow.
pub(crate) struct SlabPool<T> {
    inner: Mutex<Inner<T>>,
    total_blocks: usize,
}

impl<T> SlabPool<T> {
    /// Reserves an arena of `capacity` slots. `capacity` is computed by the
    /// caller as `ceil(bucket_count * pre_allocation_factor)`.
    pub(crate) fn new(capacity: usize) -> SlabPool<T> {
        let mut arena = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            arena.push(MaybeUninit::uninit());
        }
        SlabPool {
            inner: Mutex::new(Inner {
                arena: arena.into_boxed_slice(),
                next_block: 0,
                free_list: Vec::with_capacity(capacity),
                heap_fallback: HashSet::new(),
            }),
            total_blocks: capacity,
        }
    }

    /// Total number of in-arena slots (the bump-cursor capacity).
    pub(crate) fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    /// Allocates one uninitialised slot. The caller must write a valid `T`
    /// into it before it is read, and must eventually pass the pointer back
    /// to [`SlabPool::free`] exactly once.
    pub(crate) fn allocate(&self) -> NonNull<T> {
        let mut inner = self.inner.lock();

        if let Some(ptr) = inner.free_list.pop() {
            return ptr;
        }

        if inner.next_block < inner.arena.len() {
            let slot = inner.arena[inner.next_block].as_mut_ptr();
            inner.next_block += 1;
            // SAFETY: slots carved from `arena` are non-null by construction.
            return unsafe { NonNull::new_unchecked(slot) };
        }

        // Pool exhausted: fall back to an individual heap allocation, and
        // remember its address so `free`/`cleanup` can reclaim it instead of
        // leaking it.
        let boxed: Box<MaybeUninit<T>> = Box::new(MaybeUninit::uninit());
        let raw = Box::into_raw(boxed) as *mut T;
        inner.heap_fallback.insert(raw as usize);
        // SAFETY: `Box::into_raw` never returns null.
        unsafe { NonNull::new_unchecked(raw) }
    }

    /// Returns a slot's memory to the pool. The value at `ptr` must already
    /// have been dropped (or moved out of) by the caller; `free` only deals
    /// in raw memory, matching the allocator's C ancestor.
    pub(crate) fn free(&self, ptr: NonNull<T>) {
        let mut inner = self.inner.lock();

        if Self::owned_by_arena(&inner, ptr) {
            if inner.free_list.len() < inner.arena.len() {
                inner.free_list.push(ptr);
            }
            // Free-slot stack at capacity can only happen if more slots are
            // outstanding than the arena holds, which `owned_by_arena`
            // already rules out; nothing to do here.
            return;
        }

        let addr = ptr.as_ptr() as usize;
        if inner.heap_fallback.remove(&addr) {
            // SAFETY: `addr` was inserted by `allocate`'s heap-fallback path
            // with this exact layout, and `remove` ensures we reclaim it at
            // most once.
            unsafe {
                drop(Box::from_raw(ptr.as_ptr() as *mut MaybeUninit<T>));
            }
        }
    }

    fn owned_by_arena(inner: &Inner<T>, ptr: NonNull<T>) -> bool {
        let start = inner.arena.as_ptr() as usize;
        let end = start + inner.arena.len() * std::mem::size_of::<T>();
        let addr = ptr.as_ptr() as usize;
        addr >= start
            && addr < end
            && std::mem::size_of::<T>() > 0
            && (addr - start) % std::mem::size_of::<T>() == 0
    }
}

impl<T> Drop for SlabPool<T> {
    fn drop(&mut self) {
        // Defensive: every slot should already have been freed by the time
        // the pool itself is torn down (the bucket pool, which owns every
        // outstanding slot, is dropped before the chain-node pool in
        // `StoreInner`'s field order). Reclaim anything left over rather
        // than leak it.
        let inner = self.inner.get_mut();
        for addr in inner.heap_fallback.drain() {
            // SAFETY: every remaining address was a live heap-fallback
            // allocation that nothing has freed yet.
            unsafe {
                let ptr = addr as *mut MaybeUninit<T>;
                ptr::drop_in_place(ptr as *mut T);
                drop(Box::from_raw(ptr));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_then_reuse() {
        let pool: SlabPool<u64> = SlabPool::new(2);
        let a = pool.allocate();
        let b = pool.allocate();
        assert_ne!(a.as_ptr(), b.as_ptr());
        pool.free(a);
        let c = pool.allocate();
        assert_eq!(a.as_ptr(), c.as_ptr(), "freed arena slot should be reused");
        pool.free(b);
        pool.free(c);
    }

    #[test]
    fn falls_back_to_heap_when_exhausted() {
        let pool: SlabPool<u64> = SlabPool::new(1);
        let a = pool.allocate();
        let b = pool.allocate(); // heap fallback
        assert_ne!(a.as_ptr(), b.as_ptr());
        pool.free(a);
        pool.free(b);
    }

    #[test]
    fn arena_membership_is_exact() {
        let pool: SlabPool<u64> = SlabPool::new(4);
        let a = pool.allocate();
        {
            let inner = pool.inner.lock();
            assert!(SlabPool::owned_by_arena(&inner, a));
        }
        pool.free(a);
    }
}
