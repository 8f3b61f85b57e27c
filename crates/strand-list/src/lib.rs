//! Thread-safe singly-linked sequence allocated from a [`strand_pool::Pool`].
//!
//! Every node lives inside the pool — the sequence performs no allocation of
//! its own beyond the pool it owns. Nodes are encoded as fixed-size byte
//! records (see [`node`]) and linked by pool offsets, so a [`NodeRef`] is an
//! opaque handle the pool validates on every access: a stale reference
//! surfaces as a typed error rather than undefined behaviour.
//!
//! # Lock order contract
//!
//! Two lock domains exist: the sequence's own mutex (outer, guarding the
//! head and link structure) and the pool's internal mutex (inner, guarding
//! descriptors and the buffer). Every sequence operation acquires the
//! sequence lock first and calls into the pool while holding it; no code
//! path acquires them in the reverse order. The pool's internal resize
//! relock never touches the sequence lock, so the ordering holds globally.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod node;
pub mod sequence;

// Public re-exports for the primary API surface.
pub use error::ListError;
pub use node::{NodeRef, NODE_SIZE};
pub use sequence::Sequence;
