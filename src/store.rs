//! The process-wide store state: everything `init` builds and `cleanup`
//! tears down.

use crate::block_pool::SlabPool;
use crate::bucket::Bucket;
use crate::bucket_pool::BucketPool;
use crate::chain::ChainNode;
use crate::config::Config;
use crate::error::StoreError;
use crate::stats::Counters;
use slog::Logger;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything the façade needs to serve `set`/`get`/`delete`/`stats`.
///
/// Field order matters: `buckets` transitively owns every live
/// `PoolBox<ChainNode>` handed out from `chain_pool`, so it must be declared
/// (and therefore dropped, per Rust's top-to-bottom field drop order)
/// before `chain_pool` itself — otherwise a `ChainNode`'s `Drop` would try
/// to free its slot into a pool that no longer exists.
pub(crate) struct StoreInner {
    buckets: BucketPool,
    chain_pool: SlabPool<ChainNode>,
    seed: u32,
    counters: Counters,
    logger: Logger,
}

impl StoreInner {
    pub(crate) fn build(config: Config) -> Result<StoreInner, StoreError> {
        Self::build_with_logger(config, crate::logging::default_logger())
    }

    pub(crate) fn build_with_logger(config: Config, logger: Logger) -> Result<StoreInner, StoreError> {
        config.validate()?;

        let buckets = BucketPool::new(config.bucket_count);
        let chain_pool = SlabPool::new(config.chain_pool_capacity());
        let seed = generate_seed();

        slog::info!(
            logger,
            "key store initialised";
            "bucket_count" => config.bucket_count,
            "pre_allocation_factor" => config.pre_allocation_factor,
            "enable_concurrency" => config.enable_concurrency,
            "seed" => seed,
        );

        Ok(StoreInner {
            buckets,
            chain_pool,
            seed,
            counters: Counters::new(),
            logger,
        })
    }

    pub(crate) fn seed(&self) -> u32 {
        self.seed
    }

    pub(crate) fn buckets(&self) -> &BucketPool {
        &self.buckets
    }

    pub(crate) fn chain_pool(&self) -> &SlabPool<ChainNode> {
        &self.chain_pool
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.logger
    }

    pub(crate) fn bucket_stride(&self) -> usize {
        std::mem::size_of::<Bucket>()
    }
}

#[cfg(test)]
pub(crate) fn build_for_test(config: Config) -> StoreInner {
    StoreInner::build_with_logger(config, crate::logging::discard_logger())
        .expect("test configs are valid")
}

/// Derives the hash seed from a coarse wall-clock reading, matching the
/// source's "hash-seed generation from a coarse clock" without claiming any
/// cryptographic property of the result.
fn generate_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_validates_config() {
        assert!(StoreInner::build(Config::new(0)).is_err());
        assert!(StoreInner::build(Config::new(8)).is_ok());
    }

    #[test]
    fn seeds_need_not_be_deterministic_across_builds() {
        let a = StoreInner::build(Config::new(8)).unwrap();
        let b = StoreInner::build(Config::new(8)).unwrap();
        // Not asserted equal or unequal — only that both build successfully
        // and expose a seed.
        let _ = (a.seed(), b.seed());
    }
}
