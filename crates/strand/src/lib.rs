//! Strand: a fixed-capacity memory pool and a linked sequence built on it.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Strand sub-crates. For most users, adding `strand` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strand::prelude::*;
//!
//! // A pool on its own: first-fit allocation with coalescing release.
//! let pool = Pool::new();
//! pool.init(100).unwrap();
//! let a = pool.allocate(40).unwrap();
//! let b = pool.allocate(30).unwrap();
//! pool.release(a).unwrap();
//! // First-fit reuses the freed run at offset 0.
//! assert_eq!(pool.allocate(40).unwrap().offset(), 0);
//! pool.release(b).unwrap();
//!
//! // A sequence whose nodes live entirely inside its own pool.
//! let seq = Sequence::new();
//! seq.init(64).unwrap();
//! seq.insert(5).unwrap();
//! seq.insert(7).unwrap();
//! assert_eq!(seq.display().unwrap(), "[5, 7]");
//! seq.delete(5).unwrap();
//! assert_eq!(seq.display().unwrap(), "[7]");
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`pool`] | `strand-pool` | `Pool`, `BlockAddr`, descriptor table, `PoolError` |
//! | [`list`] | `strand-list` | `Sequence`, `NodeRef`, `ListError` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Fixed-capacity pool allocator (`strand-pool`).
pub use strand_pool as pool;

/// Pool-backed linked sequence (`strand-list`).
pub use strand_list as list;

/// Common imports for typical use.
pub mod prelude {
    pub use strand_list::{ListError, NodeRef, Sequence};
    pub use strand_pool::{BlockAddr, Pool, PoolError, PoolStats};
}
