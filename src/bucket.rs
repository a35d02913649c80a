//! A single slot of the primary table: a lock guarding one collision
//! container.

use crate::chain::{Chain, ChainNode};
use parking_lot::RwLock;
use std::convert::Infallible;

/// What a bucket currently holds.
///
/// `Tree` is a reserved extension point for a future tree-backed container
/// (see the design notes on scaling a single bucket past a linear chain);
/// it is uninhabited so matching on `Container` today is exhaustive without
/// a wildcard arm, and will stay that way until a tree variant is actually
/// built.
pub(crate) enum Container {
    Empty,
    List(Chain),
    #[allow(dead_code)]
    Tree(Infallible),
}

impl Container {
    fn chain_mut(&mut self) -> &mut Chain {
        match self {
            Container::Empty => {
                *self = Container::List(None);
                match self {
                    Container::List(chain) => chain,
                    _ => unreachable!(),
                }
            }
            Container::List(chain) => chain,
            Container::Tree(never) => match *never {},
        }
    }

    fn chain(&self) -> Option<&Chain> {
        match self {
            Container::Empty => None,
            Container::List(chain) => Some(chain),
            Container::Tree(never) => match *never {},
        }
    }
}

/// The mutable state behind one bucket's lock: its container plus a running
/// count of live cells, kept so statistics can read occupancy without
/// walking every chain.
pub(crate) struct BucketState {
    container: Container,
    count: u32,
}

impl BucketState {
    fn empty() -> BucketState {
        BucketState {
            container: Container::Empty,
            count: 0,
        }
    }

    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn find(&self, key: &[u8], fingerprint: u32) -> Option<&crate::cell::Cell> {
        self.container
            .chain()
            .and_then(|chain| ChainNode::find(chain, key, fingerprint))
    }

    pub(crate) fn insert(&mut self, node: crate::pool_box::PoolBox<ChainNode>) {
        ChainNode::insert_at_head(self.container.chain_mut(), node);
        self.count += 1;
    }

    pub(crate) fn remove(&mut self, key: &[u8], fingerprint: u32) -> Option<Box<crate::cell::Cell>> {
        let chain = self.container.chain_mut();
        let removed = ChainNode::unlink(chain, key, fingerprint);
        if removed.is_some() {
            self.count -= 1;
        }
        removed
    }
}

/// One entry of the primary table. Every bucket carries its own lock
/// unconditionally (see the design note on always-live locks), so
/// `enable_concurrency` only affects whether concurrent callers are
/// expected, never whether the protection exists.
pub(crate) struct Bucket {
    lock: RwLock<BucketState>,
}

impl Bucket {
    pub(crate) fn new() -> Bucket {
        Bucket {
            lock: RwLock::new(BucketState::empty()),
        }
    }

    pub(crate) fn read(&self) -> parking_lot::RwLockReadGuard<'_, BucketState> {
        self.lock.read()
    }

    pub(crate) fn write(&self) -> parking_lot::RwLockWriteGuard<'_, BucketState> {
        self.lock.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::SlabPool;
    use crate::cell::Cell;
    use crate::pool_box::PoolBox;

    fn node(pool: &SlabPool<ChainNode>, fp: u32, key: &[u8], value: &[u8]) -> PoolBox<ChainNode> {
        unsafe { PoolBox::new(pool, ChainNode::new(fp, Cell::create(key, fp, value), None)) }
    }

    #[test]
    fn empty_bucket_has_no_count_and_no_match() {
        let bucket = Bucket::new();
        let state = bucket.read();
        assert_eq!(state.count(), 0);
        assert!(state.find(b"anything", 1).is_none());
    }

    #[test]
    fn insert_find_remove_roundtrip() {
        let pool: SlabPool<ChainNode> = SlabPool::new(2);
        let bucket = Bucket::new();

        {
            let mut state = bucket.write();
            state.insert(node(&pool, 1, b"a", b"1"));
            state.insert(node(&pool, 2, b"b", b"2"));
        }

        {
            let state = bucket.read();
            assert_eq!(state.count(), 2);
            assert_eq!(state.find(b"a", 1).unwrap().read(), b"1");
        }

        {
            let mut state = bucket.write();
            let removed = state.remove(b"a", 1).unwrap();
            assert_eq!(removed.read(), b"1");
            assert_eq!(state.count(), 1);
        }
    }
}
