//! Operation counters and the advisory statistics walk.
//!
//! The walk takes no lock spanning the whole table — each bucket's count is
//! read through its own (briefly held) read lock, one at a time, so the
//! result is a set of independently-consistent snapshots rather than one
//! atomic snapshot of the whole store. That matches "no global lock" while
//! staying sound in safe Rust, where the source's unsynchronised raw reads
//! are not an option.

use crate::bucket::Bucket;
use crate::bucket_pool::BucketPool;
use std::sync::atomic::{AtomicU64, Ordering};

const HISTOGRAM_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Add,
    Find,
    Delete,
    Edit,
    Read,
    Update,
    Create,
}

#[derive(Default)]
struct OpCounter {
    total: AtomicU64,
    failed: AtomicU64,
}

impl OpCounter {
    fn record(&self, failed: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> (u64, u64) {
        (
            self.total.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// The process-wide set of per-operation counters plus the error histogram.
pub(crate) struct Counters {
    add: OpCounter,
    find: OpCounter,
    delete: OpCounter,
    edit: OpCounter,
    read: OpCounter,
    update: OpCounter,
    create: OpCounter,
    histogram: [AtomicU64; HISTOGRAM_SIZE],
}

impl Counters {
    pub(crate) fn new() -> Counters {
        Counters {
            add: OpCounter::default(),
            find: OpCounter::default(),
            delete: OpCounter::default(),
            edit: OpCounter::default(),
            read: OpCounter::default(),
            update: OpCounter::default(),
            create: OpCounter::default(),
            histogram: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    fn counter(&self, op: Operation) -> &OpCounter {
        match op {
            Operation::Add => &self.add,
            Operation::Find => &self.find,
            Operation::Delete => &self.delete,
            Operation::Edit => &self.edit,
            Operation::Read => &self.read,
            Operation::Update => &self.update,
            Operation::Create => &self.create,
        }
    }

    pub(crate) fn record(&self, op: Operation, failed: bool) {
        self.counter(op).record(failed);
    }

    /// Records an error code into the histogram, ignoring codes outside
    /// the open interval `(-100, 0)`.
    pub(crate) fn record_error_code(&self, code: i32) {
        if code < 0 && code > -100 {
            let index = code.unsigned_abs() as usize;
            if index < HISTOGRAM_SIZE {
                self.histogram[index].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn histogram_snapshot(&self) -> [u64; HISTOGRAM_SIZE] {
        let mut out = [0u64; HISTOGRAM_SIZE];
        for (slot, atomic) in out.iter_mut().zip(self.histogram.iter()) {
            *slot = atomic.load(Ordering::Relaxed);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionStats {
    pub total_buckets: u32,
    pub initialised_buckets: u32,
    pub non_empty_buckets: u32,
    pub empty_buckets: u32,
    pub total_keys: u64,
    pub max_keys_per_bucket: u32,
    pub min_keys_per_bucket: u32,
    pub avg_keys_per_non_empty_bucket: f64,
    pub median_keys_per_non_empty_bucket: f64,
    pub stddev_keys_per_non_empty_bucket: f64,
    pub empty_bucket_percentage: f64,
    pub avg_collisions_per_non_empty_bucket: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionStats {
    pub buckets_with_collisions: u32,
    pub collision_percentage: f64,
    pub highest_collision_count: u32,
    pub avg_collisions_in_collision_buckets: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub utilisation_percentage: f64,
    pub bytes_per_key: f64,
    /// Declared but never computed in the source this was carried forward
    /// from; reserved for a future fragmentation metric.
    pub fragmentation_percent: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSnapshot {
    pub total: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationStats {
    pub add: CounterSnapshot,
    pub find: CounterSnapshot,
    pub delete: CounterSnapshot,
    pub edit: CounterSnapshot,
    pub read: CounterSnapshot,
    pub update: CounterSnapshot,
    pub create: CounterSnapshot,
    pub error_histogram: [u64; HISTOGRAM_SIZE],
}

impl Default for OperationStats {
    fn default() -> OperationStats {
        OperationStats {
            add: CounterSnapshot::default(),
            find: CounterSnapshot::default(),
            delete: CounterSnapshot::default(),
            edit: CounterSnapshot::default(),
            read: CounterSnapshot::default(),
            update: CounterSnapshot::default(),
            create: CounterSnapshot::default(),
            error_histogram: [0u64; HISTOGRAM_SIZE],
        }
    }
}

/// A point-in-time report produced by [`crate::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    pub distribution: DistributionStats,
    pub collisions: CollisionStats,
    pub memory: MemoryStats,
    pub operations: OperationStats,
}

/// Numeric (not byte-wise) median. The source's equivalent routine sorts its
/// scratch buffer with a byte-wise comparator over the count type, which
/// silently misorders any count at or above 256 — not reproduced here.
fn median(sorted: &[u32]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    }
}

fn stddev(sample: &[u32], mean: f64) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let variance = sample
        .iter()
        .map(|&count| {
            let delta = count as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / sample.len() as f64;
    variance.sqrt()
}

fn bucket_count_for(bucket: &Bucket) -> u32 {
    bucket.read().count()
}

/// Walks the bucket pool and the process-wide counters, producing a
/// [`Statistics`] snapshot.
pub(crate) fn collect(pool: &BucketPool, counters: &Counters, bucket_stride: usize) -> Statistics {
    let total_buckets = pool.len() as u32;
    let mut non_empty_counts: Vec<u32> = Vec::new();
    let mut total_keys: u64 = 0;
    let mut empty_buckets: u32 = 0;
    let mut highest_collision_count: u32 = 0;
    let mut buckets_with_collisions: u32 = 0;

    for bucket in pool.iter() {
        let count = bucket_count_for(bucket);
        total_keys += count as u64;
        if count == 0 {
            empty_buckets += 1;
        } else {
            non_empty_counts.push(count);
            if count > 1 {
                buckets_with_collisions += 1;
                let collisions = count - 1;
                if collisions > highest_collision_count {
                    highest_collision_count = collisions;
                }
            }
        }
    }

    let non_empty_buckets = non_empty_counts.len() as u32;
    let initialised_buckets = total_buckets; // every bucket is live from init onward.

    non_empty_counts.sort_unstable();
    let max_keys_per_bucket = non_empty_counts.last().copied().unwrap_or(0);
    let min_keys_per_bucket = non_empty_counts.first().copied().unwrap_or(0);
    let avg_keys_per_non_empty_bucket = if non_empty_buckets > 0 {
        total_keys as f64 / non_empty_buckets as f64
    } else {
        0.0
    };
    let median_keys_per_non_empty_bucket = median(&non_empty_counts);
    let stddev_keys_per_non_empty_bucket = stddev(&non_empty_counts, avg_keys_per_non_empty_bucket);
    let empty_bucket_percentage = if total_buckets > 0 {
        (empty_buckets as f64 / total_buckets as f64) * 100.0
    } else {
        0.0
    };
    let avg_collisions_per_non_empty_bucket = if non_empty_buckets > 0 {
        (total_keys as f64 - non_empty_buckets as f64) / non_empty_buckets as f64
    } else {
        0.0
    };

    let collision_percentage = if total_buckets > 0 {
        (buckets_with_collisions as f64 / total_buckets as f64) * 100.0
    } else {
        0.0
    };
    let collision_bucket_total: u64 = non_empty_counts
        .iter()
        .filter(|&&c| c > 1)
        .map(|&c| (c - 1) as u64)
        .sum();
    let avg_collisions_in_collision_buckets = if buckets_with_collisions > 0 {
        collision_bucket_total as f64 / buckets_with_collisions as f64
    } else {
        0.0
    };

    let total_bytes = total_buckets as u64 * bucket_stride as u64;
    let used_bytes = initialised_buckets as u64 * bucket_stride as u64;
    let free_bytes = total_bytes.saturating_sub(used_bytes);
    let utilisation_percentage = if total_bytes > 0 {
        (used_bytes as f64 / total_bytes as f64) * 100.0
    } else {
        0.0
    };
    let bytes_per_key = if total_keys > 0 {
        used_bytes as f64 / total_keys as f64
    } else {
        0.0
    };

    let operations = OperationStats {
        add: counters.add.snapshot().into(),
        find: counters.find.snapshot().into(),
        delete: counters.delete.snapshot().into(),
        edit: counters.edit.snapshot().into(),
        read: counters.read.snapshot().into(),
        update: counters.update.snapshot().into(),
        create: counters.create.snapshot().into(),
        error_histogram: counters.histogram_snapshot(),
    };

    Statistics {
        distribution: DistributionStats {
            total_buckets,
            initialised_buckets,
            non_empty_buckets,
            empty_buckets,
            total_keys,
            max_keys_per_bucket,
            min_keys_per_bucket,
            avg_keys_per_non_empty_bucket,
            median_keys_per_non_empty_bucket,
            stddev_keys_per_non_empty_bucket,
            empty_bucket_percentage,
            avg_collisions_per_non_empty_bucket,
        },
        collisions: CollisionStats {
            buckets_with_collisions,
            collision_percentage,
            highest_collision_count,
            avg_collisions_in_collision_buckets,
        },
        memory: MemoryStats {
            total_bytes,
            used_bytes,
            free_bytes,
            utilisation_percentage,
            bytes_per_key,
            fragmentation_percent: 0.0,
        },
        operations,
    }
}

impl From<(u64, u64)> for CounterSnapshot {
    fn from((total, failed): (u64, u64)) -> CounterSnapshot {
        CounterSnapshot { total, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket_pool::BucketPool;

    #[test]
    fn empty_pool_reports_all_zero() {
        let pool = BucketPool::new(8);
        let counters = Counters::new();
        let stats = collect(&pool, &counters, 64);
        assert_eq!(stats.distribution.total_buckets, 8);
        assert_eq!(stats.distribution.non_empty_buckets, 0);
        assert_eq!(stats.distribution.empty_buckets, 8);
        assert_eq!(stats.distribution.total_keys, 0);
        assert_eq!(stats.collisions.buckets_with_collisions, 0);
        assert_eq!(stats.memory.bytes_per_key, 0.0);
    }

    #[test]
    fn counters_accumulate_and_histogram_ignores_out_of_range() {
        let counters = Counters::new();
        counters.record(Operation::Add, false);
        counters.record(Operation::Add, true);
        counters.record_error_code(-41);
        counters.record_error_code(-200); // out of range, ignored
        counters.record_error_code(0); // not negative, ignored

        let (total, failed) = counters.add.snapshot();
        assert_eq!(total, 2);
        assert_eq!(failed, 1);

        let histogram = counters.histogram_snapshot();
        assert_eq!(histogram[41], 1);
        assert_eq!(histogram.iter().sum::<u64>(), 1);
    }

    #[test]
    fn median_matches_numeric_not_byte_order() {
        // A byte-wise comparator would misorder 256 before 2; numeric must not.
        assert_eq!(median(&[2, 9, 256]), 9.0);
    }

    #[test]
    fn collision_stats_count_extra_entries_not_total_buckets() {
        use crate::block_pool::SlabPool;
        use crate::cell::Cell;
        use crate::chain::ChainNode;
        use crate::pool_box::PoolBox;

        let pool = BucketPool::new(4);
        let chain_pool: SlabPool<ChainNode> = SlabPool::new(4);

        // Bucket 0 collides: three entries, two collisions beyond the first.
        {
            let mut state = pool.get(0).write();
            for (key, fp) in [(b"a".as_ref(), 0u32), (b"b".as_ref(), 4), (b"c".as_ref(), 8)] {
                let node = unsafe {
                    PoolBox::new(&chain_pool, ChainNode::new(fp, Cell::create(key, fp, b"v"), None))
                };
                state.insert(node);
            }
        }
        // Bucket 1 holds a single entry: not a collision bucket.
        {
            let mut state = pool.get(1).write();
            let node = unsafe { PoolBox::new(&chain_pool, ChainNode::new(1, Cell::create(b"d", 1, b"v"), None)) };
            state.insert(node);
        }

        let counters = Counters::new();
        let stats = collect(&pool, &counters, 64);

        assert_eq!(stats.distribution.total_buckets, 4);
        assert_eq!(stats.distribution.non_empty_buckets, 2);
        assert_eq!(stats.collisions.buckets_with_collisions, 1);
        // Highest collision count is entries-beyond-the-first (3 - 1 = 2),
        // not the raw bucket entry count.
        assert_eq!(stats.collisions.highest_collision_count, 2);
        // Denominator is the total bucket count (4), not non-empty buckets (2).
        assert_eq!(stats.collisions.collision_percentage, 25.0);
        // Average collisions in collision buckets: (3 - 1) / 1 collision bucket = 2.0.
        assert_eq!(stats.collisions.avg_collisions_in_collision_buckets, 2.0);
    }
}
