//! Node storage layout and the opaque [`NodeRef`] handle.
//!
//! A node occupies [`NODE_SIZE`] bytes inside the pool:
//!
//! ```text
//! [0..2]  value: u16, little-endian
//! [2..6]  next:  u32, little-endian pool offset; u32::MAX = none
//! ```
//!
//! Linking by pool offset instead of pointer keeps the crate free of
//! `unsafe` and lets the pool's descriptor table validate every hop.

use std::fmt;

use strand_pool::BlockAddr;

/// Encoded size of one node in pool bytes.
pub const NODE_SIZE: u32 = 6;

/// Offset sentinel for "no next node". A real node can never start here:
/// it would require a pool larger than `u32::MAX` bytes.
const NIL: u32 = u32::MAX;

/// Opaque handle to a node's storage within the sequence's pool.
///
/// Valid only while the pool remains initialized and the node has not been
/// deleted. Using a stale reference fails with a pool-level
/// `UnknownAddress` error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct NodeRef {
    pub(crate) addr: BlockAddr,
}

impl NodeRef {
    pub(crate) fn new(addr: BlockAddr) -> Self {
        Self { addr }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.addr.offset())
    }
}

/// Decoded form of a node record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub value: u16,
    pub next: Option<u32>,
}

impl Node {
    pub fn encode(&self) -> [u8; NODE_SIZE as usize] {
        let mut bytes = [0u8; NODE_SIZE as usize];
        bytes[0..2].copy_from_slice(&self.value.to_le_bytes());
        let next = self.next.unwrap_or(NIL);
        bytes[2..6].copy_from_slice(&next.to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8; NODE_SIZE as usize]) -> Self {
        let value = u16::from_le_bytes([bytes[0], bytes[1]]);
        let next = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Self {
            value,
            next: (next != NIL).then_some(next),
        }
    }
}
