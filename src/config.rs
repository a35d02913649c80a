//! Store configuration and its validation.

use crate::error::StoreError;

/// Parameters accepted by [`crate::init`].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of buckets in the primary table. Must be a positive power of two.
    pub bucket_count: u32,
    /// Fraction of `bucket_count` to pre-allocate as chain-node slots, in `(0, 1]`.
    pub pre_allocation_factor: f64,
    /// Whether buckets and cells are built with their locks live from the start.
    pub enable_concurrency: bool,
}

impl Config {
    /// A convenience constructor for the common single-threaded case.
    pub fn new(bucket_count: u32) -> Config {
        Config {
            bucket_count,
            pre_allocation_factor: 0.5,
            enable_concurrency: false,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.bucket_count == 0 || !self.bucket_count.is_power_of_two() {
            return Err(StoreError::InvalidConfiguration(format!(
                "bucket_count must be a positive power of two, got {}",
                self.bucket_count
            )));
        }
        if !(self.pre_allocation_factor > 0.0 && self.pre_allocation_factor <= 1.0) {
            return Err(StoreError::InvalidConfiguration(format!(
                "pre_allocation_factor must be in (0, 1], got {}",
                self.pre_allocation_factor
            )));
        }
        Ok(())
    }

    pub(crate) fn chain_pool_capacity(&self) -> usize {
        ((self.bucket_count as f64) * self.pre_allocation_factor)
            .ceil()
            .max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two() {
        let cfg = Config::new(3);
        assert!(matches!(cfg.validate(), Err(StoreError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_zero_buckets() {
        let cfg = Config::new(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_factor() {
        let mut cfg = Config::new(8);
        cfg.pre_allocation_factor = 0.0;
        assert!(cfg.validate().is_err());
        cfg.pre_allocation_factor = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_valid_config() {
        let cfg = Config::new(8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn capacity_rounds_up() {
        let mut cfg = Config::new(8);
        cfg.pre_allocation_factor = 0.5;
        assert_eq!(cfg.chain_pool_capacity(), 4);
        cfg.pre_allocation_factor = 0.1;
        assert_eq!(cfg.chain_pool_capacity(), 1);
    }
}
