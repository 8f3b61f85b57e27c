//! Fixed-capacity, thread-safe memory pool with manual allocate/release/resize.
//!
//! The pool owns a single byte buffer of fixed capacity and partitions it
//! with a descriptor table: one descriptor per contiguous range, free or
//! used, in ascending-offset order. Allocation is first-fit with block
//! splitting; release coalesces adjacent free neighbours; resize shrinks or
//! grows in place where possible and falls back to allocate-copy-release.
//!
//! # Architecture
//!
//! ```text
//! Pool (locking + lifecycle)
//! └── Mutex<Option<PoolInner>>        (None = uninitialized)
//!     ├── buffer: Vec<u8>             (the fixed-capacity byte pool)
//!     └── table: DescriptorTable      (IndexMap<offset, BlockDescriptor>)
//! ```
//!
//! # Lock contract
//!
//! One mutex covers the descriptor table and the buffer for the full
//! duration of every operation. The only exception is the fallback branch
//! of [`Pool::resize`], which releases the lock before delegating to
//! [`Pool::allocate`] and [`Pool::release`] (each re-acquires it). Callers
//! that layer their own lock above the pool must always acquire theirs
//! first and never call back into that lock from pool context.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod handle;
pub mod pool;

// Public re-exports for the primary API surface.
pub use error::PoolError;
pub use handle::BlockAddr;
pub use pool::{BlockInfo, Pool, PoolStats};
