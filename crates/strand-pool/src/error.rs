//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during pool operations.
///
/// Two tiers of failure: exhaustion and bad-address conditions are reported
/// to the caller and leave the pool unmutated, while an OS-level failure to
/// obtain the backing buffer is fatal (process abort, see
/// [`Pool::init`](crate::pool::Pool::init)).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has not been initialized, or has been deinitialized.
    /// Only `init` is valid in this state.
    Uninitialized,
    /// `init` was called on a pool that is already initialized.
    AlreadyInitialized,
    /// The requested capacity cannot back a pool.
    InvalidCapacity {
        /// The rejected capacity in bytes.
        capacity: u32,
    },
    /// No free block can satisfy the request.
    Exhausted {
        /// Number of bytes requested.
        requested: u32,
        /// Length of the largest contiguous free run, in bytes.
        largest_free: u32,
    },
    /// No allocated block starts at the given offset. Raised for stale
    /// addresses, already-merged blocks, and addresses the pool never
    /// handed out.
    UnknownAddress {
        /// The offset that matched no allocated descriptor.
        offset: u32,
    },
    /// A read or write would run past the end of the addressed block.
    OutOfBounds {
        /// Offset of the addressed block.
        offset: u32,
        /// Length of the attempted access in bytes.
        len: u32,
        /// Length of the block in bytes.
        block_len: u32,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "pool is not initialized"),
            Self::AlreadyInitialized => write!(f, "pool is already initialized"),
            Self::InvalidCapacity { capacity } => {
                write!(f, "invalid pool capacity: {capacity} bytes")
            }
            Self::Exhausted {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "pool exhausted: requested {requested} bytes, largest free run {largest_free} bytes"
                )
            }
            Self::UnknownAddress { offset } => {
                write!(f, "no allocated block at offset {offset}")
            }
            Self::OutOfBounds {
                offset,
                len,
                block_len,
            } => {
                write!(
                    f,
                    "access of {len} bytes exceeds block at offset {offset} ({block_len} bytes)"
                )
            }
        }
    }
}

impl Error for PoolError {}
