//! Opaque block addresses.
//!
//! A [`BlockAddr`] identifies an allocated block by its byte offset within
//! the pool buffer. It replaces a raw pointer: the pool resolves it back to
//! a descriptor by exact offset match, so a stale address fails with a
//! typed error instead of dereferencing freed memory.

use std::fmt;

/// Address of a block within the pool buffer.
///
/// Valid only while the pool remains initialized and the block has not been
/// released. Addresses are never null — absence is expressed with
/// `Option<BlockAddr>` or an error at the API boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct BlockAddr {
    pub(crate) offset: u32,
}

impl BlockAddr {
    /// Create an address for the given byte offset.
    ///
    /// Addresses are validated on use, not on construction: an address that
    /// matches no allocated block fails the operation with
    /// [`UnknownAddress`](crate::PoolError::UnknownAddress). This is what
    /// lets containers persist links as raw offsets inside the pool and
    /// resolve them back to addresses.
    pub fn new(offset: u32) -> Self {
        Self { offset }
    }

    /// Byte offset of the block within the pool buffer.
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockAddr({})", self.offset)
    }
}
