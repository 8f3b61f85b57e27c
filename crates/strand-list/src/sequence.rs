//! The [`Sequence`]: a singly-linked chain of `u16` values stored in a pool.
//!
//! The sequence owns its pool privately — node storage comes from nowhere
//! else. A mutex around the head guards the link structure (the outer lock
//! of the two-tier contract documented at the crate level); every node read
//! or write goes through the pool's validated accessors, which take the
//! pool's own inner lock.
//!
//! The lifecycle is `new` (idle) → `init` → mutating operations →
//! `cleanup`, after which only `init` is valid again. Operations outside
//! the active state fail with [`ListError::Uninitialized`].

use std::sync::Mutex;

use strand_pool::{BlockAddr, Pool, PoolStats};

use crate::error::ListError;
use crate::node::{Node, NodeRef, NODE_SIZE};

/// Lifecycle state behind the sequence lock.
enum ListState {
    /// No pool, no nodes. Only `init` is valid.
    Idle,
    /// Pool initialized; `head` is the offset of the first node.
    Active { head: Option<u32> },
}

impl ListState {
    fn head(&self) -> Result<Option<u32>, ListError> {
        match self {
            Self::Active { head } => Ok(*head),
            Self::Idle => Err(ListError::Uninitialized),
        }
    }

    fn set_head(&mut self, head: Option<u32>) {
        *self = Self::Active { head };
    }
}

/// Thread-safe singly-linked sequence of `u16` values.
///
/// All operations take `&self`; the internal mutex serializes them. Node
/// references handed out by [`Sequence::insert`] and [`Sequence::search`]
/// stay valid until the node is deleted or the sequence is cleaned up.
pub struct Sequence {
    state: Mutex<ListState>,
    pool: Pool,
}

// Compile-time assertion: Sequence must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Sequence>();
};

impl Sequence {
    /// Create an idle sequence. Call [`Sequence::init`] before use.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ListState::Idle),
            pool: Pool::new(),
        }
    }

    /// Initialize the backing pool with `capacity` bytes and set the head
    /// to empty.
    ///
    /// Each node consumes [`NODE_SIZE`] bytes of pool capacity. Fails with
    /// [`ListError::AlreadyInitialized`] if the sequence is already active.
    pub fn init(&self, capacity: u32) -> Result<(), ListError> {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, ListState::Active { .. }) {
            return Err(ListError::AlreadyInitialized);
        }
        self.pool.init(capacity)?;
        state.set_head(None);
        Ok(())
    }

    /// Append a node at the tail. O(n) traversal to the tail.
    ///
    /// Returns a reference to the new node. Fails with a wrapped
    /// [`Exhausted`](strand_pool::PoolError::Exhausted) error when the pool
    /// cannot hold another node.
    pub fn insert(&self, value: u16) -> Result<NodeRef, ListError> {
        let mut state = self.state.lock().unwrap();
        let head = state.head()?;
        let new_offset = self.alloc_node(value, None)?;

        match head {
            None => state.set_head(Some(new_offset)),
            Some(first) => {
                let mut cur = first;
                let mut node = self.read_node(cur)?;
                while let Some(next) = node.next {
                    cur = next;
                    node = self.read_node(cur)?;
                }
                node.next = Some(new_offset);
                self.write_node(cur, node)?;
            }
        }
        Ok(NodeRef::new(BlockAddr::new(new_offset)))
    }

    /// Splice a new node immediately after `anchor`.
    ///
    /// The anchor is validated against the pool's descriptor table when its
    /// record is read — no membership traversal is performed. A stale
    /// anchor fails with a wrapped
    /// [`UnknownAddress`](strand_pool::PoolError::UnknownAddress) error.
    pub fn insert_after(&self, anchor: NodeRef, value: u16) -> Result<NodeRef, ListError> {
        let state = self.state.lock().unwrap();
        state.head()?;

        let anchor_offset = anchor.addr.offset();
        let mut anchor_node = self.read_node(anchor_offset)?;
        let new_offset = self.alloc_node(value, anchor_node.next)?;
        anchor_node.next = Some(new_offset);
        self.write_node(anchor_offset, anchor_node)?;
        Ok(NodeRef::new(BlockAddr::new(new_offset)))
    }

    /// Splice a new node immediately before `anchor`.
    ///
    /// When the anchor is the current head, the new node becomes the head.
    /// Otherwise the predecessor is found by O(n) traversal; an anchor not
    /// reachable from the head fails with [`ListError::AnchorNotFound`].
    pub fn insert_before(&self, anchor: NodeRef, value: u16) -> Result<NodeRef, ListError> {
        let mut state = self.state.lock().unwrap();
        let head = state.head()?;
        let anchor_offset = anchor.addr.offset();

        if head == Some(anchor_offset) {
            let new_offset = self.alloc_node(value, Some(anchor_offset))?;
            state.set_head(Some(new_offset));
            return Ok(NodeRef::new(BlockAddr::new(new_offset)));
        }

        let mut cur = match head {
            Some(first) => first,
            None => return Err(ListError::AnchorNotFound),
        };
        loop {
            let node = self.read_node(cur)?;
            match node.next {
                Some(next) if next == anchor_offset => break,
                Some(next) => cur = next,
                None => return Err(ListError::AnchorNotFound),
            }
        }

        let new_offset = self.alloc_node(value, Some(anchor_offset))?;
        let mut pred = self.read_node(cur)?;
        pred.next = Some(new_offset);
        self.write_node(cur, pred)?;
        Ok(NodeRef::new(BlockAddr::new(new_offset)))
    }

    /// Remove the first node whose value equals `value`, releasing its
    /// storage back to the pool.
    ///
    /// Fails with [`ListError::Empty`] on an empty sequence and
    /// [`ListError::ValueNotFound`] when no node matches; both leave the
    /// sequence unmutated.
    pub fn delete(&self, value: u16) -> Result<(), ListError> {
        let mut state = self.state.lock().unwrap();
        let head = state.head()?;
        let first = head.ok_or(ListError::Empty)?;

        let mut prev: Option<u32> = None;
        let mut cur = first;
        loop {
            let node = self.read_node(cur)?;
            if node.value == value {
                match prev {
                    None => state.set_head(node.next),
                    Some(prev) => {
                        let mut pred = self.read_node(prev)?;
                        pred.next = node.next;
                        self.write_node(prev, pred)?;
                    }
                }
                self.pool.release(BlockAddr::new(cur))?;
                return Ok(());
            }
            match node.next {
                Some(next) => {
                    prev = Some(cur);
                    cur = next;
                }
                None => return Err(ListError::ValueNotFound { value }),
            }
        }
    }

    /// Linear scan for the first node whose value equals `value`.
    ///
    /// Returns `Ok(None)` when no node matches. The returned reference is
    /// valid until the node is deleted or the sequence is cleaned up.
    pub fn search(&self, value: u16) -> Result<Option<NodeRef>, ListError> {
        let state = self.state.lock().unwrap();
        let mut cur = state.head()?;
        while let Some(offset) = cur {
            let node = self.read_node(offset)?;
            if node.value == value {
                return Ok(Some(NodeRef::new(BlockAddr::new(offset))));
            }
            cur = node.next;
        }
        Ok(None)
    }

    /// Render the whole sequence, e.g. `"[5, 7]"`. An empty sequence
    /// renders `"[]"`. The traversal holds the sequence lock throughout.
    pub fn display(&self) -> Result<String, ListError> {
        self.display_range(None, None)
    }

    /// Render the sub-range from `start` to `end` inclusive.
    ///
    /// A `start` of `None` begins at the head; the traversal stops after
    /// `end` or at the tail, whichever comes first. An empty sequence
    /// renders `"[]"` regardless of the given bounds.
    pub fn display_range(
        &self,
        start: Option<NodeRef>,
        end: Option<NodeRef>,
    ) -> Result<String, ListError> {
        let state = self.state.lock().unwrap();
        let head = state.head()?;

        let first = match (start, head) {
            (Some(start), _) if head.is_some() => start.addr.offset(),
            (None, Some(head)) => head,
            _ => return Ok("[]".to_string()),
        };
        let end = end.map(|r| r.addr.offset());

        let mut out = String::from("[");
        let mut cur = first;
        loop {
            let node = self.read_node(cur)?;
            if cur != first {
                out.push_str(", ");
            }
            out.push_str(&node.value.to_string());
            if Some(cur) == end {
                break;
            }
            match node.next {
                Some(next) => cur = next,
                None => break,
            }
        }
        out.push(']');
        Ok(out)
    }

    /// Number of nodes. O(n).
    pub fn count(&self) -> Result<usize, ListError> {
        let state = self.state.lock().unwrap();
        let mut cur = state.head()?;
        let mut count = 0;
        while let Some(offset) = cur {
            cur = self.read_node(offset)?.next;
            count += 1;
        }
        Ok(count)
    }

    /// Release every node, reset the head, and deinitialize the pool.
    ///
    /// Terminal: all outstanding node references become invalid and no
    /// operation other than [`Sequence::init`] is valid afterwards.
    pub fn cleanup(&self) -> Result<(), ListError> {
        let mut state = self.state.lock().unwrap();
        let mut cur = state.head()?;
        while let Some(offset) = cur {
            cur = self.read_node(offset)?.next;
            self.pool.release(BlockAddr::new(offset))?;
        }
        *state = ListState::Idle;
        self.pool.deinit()?;
        Ok(())
    }

    /// Whether the sequence is currently active.
    pub fn is_initialized(&self) -> bool {
        matches!(*self.state.lock().unwrap(), ListState::Active { .. })
    }

    /// Usage summary of the backing pool.
    pub fn stats(&self) -> Result<PoolStats, ListError> {
        let _state = self.state.lock().unwrap();
        Ok(self.pool.stats()?)
    }

    // Allocate a node record in the pool and write it. Callers hold the
    // sequence lock.
    fn alloc_node(&self, value: u16, next: Option<u32>) -> Result<u32, ListError> {
        let addr = self.pool.allocate(NODE_SIZE)?;
        self.pool
            .write_bytes(addr, &Node { value, next }.encode())?;
        Ok(addr.offset())
    }

    fn read_node(&self, offset: u32) -> Result<Node, ListError> {
        let mut buf = [0u8; NODE_SIZE as usize];
        self.pool.read_bytes(BlockAddr::new(offset), &mut buf)?;
        Ok(Node::decode(&buf))
    }

    fn write_node(&self, offset: u32, node: Node) -> Result<(), ListError> {
        self.pool
            .write_bytes(BlockAddr::new(offset), &node.encode())?;
        Ok(())
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}
