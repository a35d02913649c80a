//! The list-backed chain container.
//!
//! A singly-linked list of chain nodes, each redundantly carrying the
//! fingerprint of the cell it owns so a mismatch short-circuits before the
//! byte-wise key comparison. All inserts go at the head; deletion splices
//! out the first match.

use crate::cell::Cell;
use crate::pool_box::PoolBox;

/// One link in a bucket's collision chain. Owns exactly one [`Cell`]; when
/// a `ChainNode` is dropped (or explicitly unlinked), so is its cell.
pub(crate) struct ChainNode {
    fingerprint: u32,
    cell: Box<Cell>,
    next: Chain,
}

/// The head of a bucket's chain. `None` means the chain (and, if this is
/// the whole container, the bucket) is empty.
pub(crate) type Chain = Option<PoolBox<ChainNode>>;

impl ChainNode {
    pub(crate) fn new(fingerprint: u32, cell: Cell, next: Chain) -> ChainNode {
        ChainNode {
            fingerprint,
            cell: Box::new(cell),
            next,
        }
    }

    /// Inserts `node` at the head of the chain starting at `*head`.
    ///
    /// Precondition: `node` is not already linked into any chain (callers
    /// always construct a fresh node and link it exactly once).
    pub(crate) fn insert_at_head(head: &mut Chain, mut node: PoolBox<ChainNode>) {
        node.next = head.take();
        *head = Some(node);
    }

    /// Walks the chain looking for a cell matching `key`/`fingerprint`.
    pub(crate) fn find<'a>(head: &'a Chain, key: &[u8], fingerprint: u32) -> Option<&'a Cell> {
        let mut cursor = head.as_deref();
        while let Some(node) = cursor {
            if node.fingerprint == fingerprint && node.cell.matches(key, fingerprint) {
                return Some(&node.cell);
            }
            cursor = node.next.as_deref();
        }
        None
    }

    /// Unlinks the first node matching `key`/`fingerprint`, returning its
    /// owned cell to the caller. The node's slot is released back to the
    /// block pool as part of dropping the `PoolBox`.
    pub(crate) fn unlink(head: &mut Chain, key: &[u8], fingerprint: u32) -> Option<Box<Cell>> {
        // Fast path: the match is the head itself.
        if let Some(node) = head {
            if node.fingerprint == fingerprint && node.cell.matches(key, fingerprint) {
                let owned = head.take().expect("checked Some above");
                let mut node = owned.into_inner();
                *head = node.next.take();
                return Some(node.cell);
            }
        }

        // General path: walk until the node *before* the match is found.
        let mut cursor = head;
        loop {
            let next_is_match = match cursor.as_deref() {
                Some(node) => node.next.as_deref().is_some_and(|next| {
                    next.fingerprint == fingerprint && next.cell.matches(key, fingerprint)
                }),
                None => return None,
            };

            if next_is_match {
                let current = cursor.as_mut().expect("checked Some above");
                let matched = current.next.take().expect("checked Some above");
                let mut matched = matched.into_inner();
                current.next = matched.next.take();
                return Some(matched.cell);
            }

            cursor = &mut cursor.as_mut().expect("checked Some above").next;
        }
    }

    /// Counts the live nodes reachable from `head` (used by the statistics
    /// walk and by invariant-checking tests; not on any operation's hot
    /// path).
    pub(crate) fn len(head: &Chain) -> usize {
        let mut count = 0;
        let mut cursor = head.as_deref();
        while let Some(node) = cursor {
            count += 1;
            cursor = node.next.as_deref();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::SlabPool;

    fn node(pool: &SlabPool<ChainNode>, fp: u32, key: &[u8], value: &[u8], next: Chain) -> PoolBox<ChainNode> {
        unsafe { PoolBox::new(pool, ChainNode::new(fp, Cell::create(key, fp, value), next)) }
    }

    #[test]
    fn head_insert_and_find() {
        let pool: SlabPool<ChainNode> = SlabPool::new(4);
        let mut head: Chain = None;
        ChainNode::insert_at_head(&mut head, node(&pool, 1, b"a", b"1", None));
        ChainNode::insert_at_head(&mut head, node(&pool, 2, b"b", b"2", None));

        assert_eq!(ChainNode::len(&head), 2);
        assert_eq!(ChainNode::find(&head, b"a", 1).unwrap().read(), b"1");
        assert_eq!(ChainNode::find(&head, b"b", 2).unwrap().read(), b"2");
        assert!(ChainNode::find(&head, b"c", 3).is_none());
    }

    #[test]
    fn unlink_head() {
        let pool: SlabPool<ChainNode> = SlabPool::new(4);
        let mut head: Chain = None;
        ChainNode::insert_at_head(&mut head, node(&pool, 1, b"a", b"1", None));
        ChainNode::insert_at_head(&mut head, node(&pool, 2, b"b", b"2", None));

        let removed = ChainNode::unlink(&mut head, b"b", 2).unwrap();
        assert_eq!(removed.read(), b"2");
        assert_eq!(ChainNode::len(&head), 1);
        assert!(ChainNode::find(&head, b"b", 2).is_none());
    }

    #[test]
    fn unlink_middle_and_tail() {
        let pool: SlabPool<ChainNode> = SlabPool::new(4);
        let mut head: Chain = None;
        ChainNode::insert_at_head(&mut head, node(&pool, 1, b"a", b"1", None));
        ChainNode::insert_at_head(&mut head, node(&pool, 2, b"b", b"2", None));
        ChainNode::insert_at_head(&mut head, node(&pool, 3, b"c", b"3", None));
        // head is c -> b -> a

        let removed = ChainNode::unlink(&mut head, b"b", 2).unwrap();
        assert_eq!(removed.read(), b"2");
        assert_eq!(ChainNode::len(&head), 2);

        let removed = ChainNode::unlink(&mut head, b"a", 1).unwrap();
        assert_eq!(removed.read(), b"1");
        assert_eq!(ChainNode::len(&head), 1);

        assert!(ChainNode::unlink(&mut head, b"nope", 99).is_none());
    }

    #[test]
    fn unlink_returns_node_to_pool() {
        let pool: SlabPool<ChainNode> = SlabPool::new(1);
        let mut head: Chain = None;
        ChainNode::insert_at_head(&mut head, node(&pool, 1, b"a", b"1", None));
        ChainNode::unlink(&mut head, b"a", 1).unwrap();

        // The single arena slot should be free again.
        let reused = pool.allocate();
        assert_eq!(pool.total_blocks(), 1);
        pool.free(reused);
    }
}
