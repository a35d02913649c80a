//! The error taxonomy surfaced by every fallible operation in this crate.
//!
//! Modelled with `quick_error!` in the same style as the disk and allocator
//! error enums this module's ancestry is drawn from. Each variant also maps
//! to a stable negative integer (`StoreError::code`) for callers that still
//! need the legacy numeric contract.

use quick_error::quick_error;

quick_error! {
    #[derive(Debug, PartialEq, Eq, Clone)]
    pub enum StoreError {
        /// A heap allocation could not be satisfied.
        AllocationFailed {
            display("memory allocation failed")
        }
        /// A lock could not be constructed.
        LockInitFailed {
            display("lock initialisation failed")
        }
        /// An argument failed validation (empty key, absent value, ...).
        InvalidArgument {
            display("invalid argument")
        }
        /// `bucket_count` was not a power of two, or `pre_allocation_factor` was out of `(0, 1]`.
        InvalidConfiguration(reason: String) {
            display("invalid configuration: {}", reason)
        }
        /// A lock acquisition failed (never raised by `parking_lot`'s blocking primitives; kept for contract completeness).
        LockAcquisitionFailed {
            display("lock acquisition failed")
        }
        /// A lock release failed (never raised by `parking_lot`'s RAII guards; kept for contract completeness).
        LockReleaseFailed {
            display("lock release failed")
        }
        /// The store singleton has not been initialised (or was already torn down).
        NotInitialised {
            display("key store is not initialised")
        }
        /// No entry exists for the given key.
        KeyNotFound {
            display("key not found")
        }
        /// A bucket's container discriminant did not match any known variant.
        UnsupportedBucketType {
            display("unsupported bucket container type")
        }
        /// An internal dispatch reached a branch it never should have.
        UnknownOperation {
            display("unknown operation")
        }
        /// A partial construction failure during initialisation.
        InternalError(reason: String) {
            display("internal error: {}", reason)
        }
        /// The hash function was asked to hash invalid input.
        HashFunctionFailed {
            display("hash function failed")
        }
        /// A computed bucket index fell outside the table's bounds.
        InvalidIndex {
            display("invalid bucket index")
        }
    }
}

impl StoreError {
    /// The stable negative error code from the external interface contract.
    ///
    /// `BucketNotFound` from the original contract is folded into
    /// [`StoreError::NotInitialised`] (code `-40`): because the bucket array
    /// is sized once at `init` and addressed by a masked index that is
    /// always in range, a "bucket not found" condition distinct from "the
    /// store was never initialised" cannot arise in this implementation.
    pub fn code(&self) -> i32 {
        match self {
            StoreError::AllocationFailed => -10,
            StoreError::LockInitFailed => -11,
            StoreError::InvalidArgument => -20,
            StoreError::InvalidConfiguration(_) => -21,
            StoreError::LockAcquisitionFailed => -30,
            StoreError::LockReleaseFailed => -31,
            StoreError::NotInitialised => -40,
            StoreError::KeyNotFound => -41,
            StoreError::UnsupportedBucketType => -43,
            StoreError::UnknownOperation => -47,
            StoreError::InternalError(_) => -48,
            StoreError::HashFunctionFailed => -70,
            StoreError::InvalidIndex => -71,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_external_contract() {
        assert_eq!(StoreError::AllocationFailed.code(), -10);
        assert_eq!(StoreError::InvalidArgument.code(), -20);
        assert_eq!(StoreError::InvalidConfiguration(String::new()).code(), -21);
        assert_eq!(StoreError::KeyNotFound.code(), -41);
        assert_eq!(StoreError::UnsupportedBucketType.code(), -43);
        assert_eq!(StoreError::InvalidIndex.code(), -71);
    }
}
