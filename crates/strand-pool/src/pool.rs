//! The [`Pool`]: locking, lifecycle, and buffer access over the descriptor
//! table.
//!
//! A `Pool` is an explicit instance (no process-wide state): create as many
//! independent pools as needed, each with its own buffer, descriptor table,
//! and mutex. The lifecycle is `new` (uninitialized) → `init` → operations →
//! `deinit`, after which only `init` is valid again. Every operation on an
//! uninitialized pool fails with [`PoolError::Uninitialized`].

use std::sync::Mutex;

use crate::descriptor::DescriptorTable;
use crate::error::PoolError;
use crate::handle::BlockAddr;

/// Point-in-time usage summary of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Total pool capacity in bytes.
    pub capacity: u32,
    /// Bytes currently allocated.
    pub used_bytes: u32,
    /// Bytes currently free.
    pub free_bytes: u32,
    /// Number of descriptors (free and used) partitioning the pool.
    pub block_count: usize,
    /// Length of the largest contiguous free run in bytes.
    pub largest_free: u32,
}

/// Diagnostic snapshot of one descriptor, as returned by [`Pool::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset of the block within the pool.
    pub offset: u32,
    /// Length of the block in bytes.
    pub len: u32,
    /// Whether the block is free.
    pub free: bool,
}

/// Buffer and bookkeeping behind the pool mutex.
struct PoolInner {
    buffer: Vec<u8>,
    table: DescriptorTable,
}

impl PoolInner {
    /// Resolve `addr` to the byte range of an allocated block, bounds-checked
    /// against the access length.
    fn checked_range(&self, addr: BlockAddr, len: usize) -> Result<(usize, usize), PoolError> {
        let desc = self
            .table
            .get(addr.offset)
            .filter(|d| !d.free)
            .ok_or(PoolError::UnknownAddress {
                offset: addr.offset,
            })?;
        if len > desc.len as usize {
            return Err(PoolError::OutOfBounds {
                offset: addr.offset,
                len: len as u32,
                block_len: desc.len,
            });
        }
        let start = addr.offset as usize;
        Ok((start, start + len))
    }
}

/// Fixed-capacity thread-safe memory pool.
///
/// One mutex guards the descriptor table and the buffer for the full
/// duration of every operation. The exception is the fallback branch of
/// [`Pool::resize`], which drops the lock before delegating to
/// [`Pool::allocate`] and [`Pool::release`] (each re-acquires it) — the
/// three sub-steps are individually atomic, and the old block stays valid
/// until the new one is reserved and copied.
pub struct Pool {
    inner: Mutex<Option<PoolInner>>,
}

// Compile-time assertion: Pool must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Pool>();
};

impl Pool {
    /// Create an uninitialized pool. Call [`Pool::init`] before use.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Allocate the backing buffer and install a single free descriptor
    /// covering `[0, capacity)`.
    ///
    /// Rejects a zero capacity and double initialization. An OS-level
    /// failure to obtain the buffer itself aborts the process (Rust's
    /// allocation failure handling) — there is no operable pool without its
    /// backing store.
    pub fn init(&self, capacity: u32) -> Result<(), PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity { capacity });
        }
        let mut guard = self.inner.lock().unwrap();
        if guard.is_some() {
            return Err(PoolError::AlreadyInitialized);
        }
        *guard = Some(PoolInner {
            buffer: vec![0u8; capacity as usize],
            table: DescriptorTable::new(capacity),
        });
        Ok(())
    }

    /// Allocate `size` bytes, first-fit.
    ///
    /// Scans descriptors in ascending-offset order and takes the first free
    /// one with sufficient length, splitting off any remainder as a new free
    /// descriptor. Returns [`PoolError::Exhausted`] when no free block fits.
    ///
    /// A `size` of 0 answers with the address of the first free descriptor
    /// *without* reserving it — a probe, not a reservation. The address
    /// becomes meaningful only through a later real allocation at the same
    /// offset.
    pub fn allocate(&self, size: u32) -> Result<BlockAddr, PoolError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(PoolError::Uninitialized)?;

        if size == 0 {
            return inner
                .table
                .first_free_offset()
                .map(BlockAddr::new)
                .ok_or(PoolError::Exhausted {
                    requested: 0,
                    largest_free: 0,
                });
        }

        let index = inner
            .table
            .first_fit(size)
            .ok_or_else(|| PoolError::Exhausted {
                requested: size,
                largest_free: inner.table.largest_free(),
            })?;
        let offset = inner.table.allocate_at(index, size);
        Ok(BlockAddr::new(offset))
    }

    /// Release the block at `addr`, coalescing with free neighbours.
    ///
    /// Merges with the next descriptor first, then the previous one, so a
    /// three-way free adjacency collapses in a single call. Releasing an
    /// already-free block is a silent no-op (idempotent). An address that
    /// matches no descriptor offset fails with [`PoolError::UnknownAddress`]
    /// and leaves the pool unmutated.
    pub fn release(&self, addr: BlockAddr) -> Result<(), PoolError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(PoolError::Uninitialized)?;
        let index = inner
            .table
            .index_of(addr.offset)
            .ok_or(PoolError::UnknownAddress {
                offset: addr.offset,
            })?;
        inner.table.release_at(index);
        Ok(())
    }

    /// Resize the block at `addr` to `size` bytes.
    ///
    /// - `addr == None` behaves as [`Pool::allocate`].
    /// - `size == 0` behaves as [`Pool::release`] and yields `Ok(None)`.
    /// - Shrinking never moves data: the remainder is split off as a free
    ///   descriptor and the same address is returned.
    /// - Growing merges a free right-hand neighbour in place when the
    ///   combined length suffices, again keeping the address.
    /// - Otherwise the fallback allocates a new block, copies
    ///   `min(old, new)` bytes, releases the old block, and returns the new
    ///   address. If the fallback allocation fails, the original block is
    ///   left allocated and untouched — the caller's address remains valid.
    ///
    /// # Lock discipline
    ///
    /// The in-place branches hold the pool lock throughout. The fallback
    /// branch releases it before re-entering `allocate`/`release` (each
    /// takes the lock itself); the whole resize is therefore not atomic,
    /// which is safe because the old block stays allocated until the copy
    /// has completed.
    pub fn resize(
        &self,
        addr: Option<BlockAddr>,
        size: u32,
    ) -> Result<Option<BlockAddr>, PoolError> {
        let addr = match addr {
            None => return self.allocate(size).map(Some),
            Some(addr) => addr,
        };
        if size == 0 {
            self.release(addr)?;
            return Ok(None);
        }

        let old_len = {
            let mut guard = self.inner.lock().unwrap();
            let inner = guard.as_mut().ok_or(PoolError::Uninitialized)?;
            let index = inner
                .table
                .index_of(addr.offset)
                .ok_or(PoolError::UnknownAddress {
                    offset: addr.offset,
                })?;
            let (_, desc) = inner
                .table
                .get_index(index)
                .expect("index_of returned a valid index");
            if desc.free {
                // Only allocated blocks can be resized; splitting a free
                // descriptor here would leave adjacent free neighbours.
                return Err(PoolError::UnknownAddress {
                    offset: addr.offset,
                });
            }
            let len = desc.len;
            if len >= size {
                inner.table.shrink_at(index, size);
                return Ok(Some(addr));
            }
            if inner.table.grow_at(index, size) {
                return Ok(Some(addr));
            }
            len
            // Lock dropped here: the fallback below re-enters allocate and
            // release, which acquire it themselves.
        };

        let new_addr = self.allocate(size)?;
        self.copy_block(addr, new_addr, old_len.min(size))?;
        self.release(addr)?;
        Ok(Some(new_addr))
    }

    /// Drop the buffer and every descriptor, returning the pool to the
    /// uninitialized state. Only [`Pool::init`] is valid afterwards; all
    /// outstanding addresses become invalid.
    pub fn deinit(&self) -> Result<(), PoolError> {
        let mut guard = self.inner.lock().unwrap();
        guard.take().map(|_| ()).ok_or(PoolError::Uninitialized)
    }

    /// Copy the contents of `buf` into the block at `addr`, starting at the
    /// block's first byte.
    ///
    /// Fails with [`PoolError::UnknownAddress`] if `addr` does not resolve
    /// to an allocated block, or [`PoolError::OutOfBounds`] if `buf` is
    /// longer than the block.
    pub fn write_bytes(&self, addr: BlockAddr, buf: &[u8]) -> Result<(), PoolError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(PoolError::Uninitialized)?;
        let (start, end) = inner.checked_range(addr, buf.len())?;
        inner.buffer[start..end].copy_from_slice(buf);
        Ok(())
    }

    /// Fill `buf` from the block at `addr`, starting at the block's first
    /// byte. Same validation as [`Pool::write_bytes`].
    pub fn read_bytes(&self, addr: BlockAddr, buf: &mut [u8]) -> Result<(), PoolError> {
        let guard = self.inner.lock().unwrap();
        let inner = guard.as_ref().ok_or(PoolError::Uninitialized)?;
        let (start, end) = inner.checked_range(addr, buf.len())?;
        buf.copy_from_slice(&inner.buffer[start..end]);
        Ok(())
    }

    /// Whether the pool is currently initialized.
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }

    /// Total pool capacity in bytes.
    pub fn capacity(&self) -> Result<u32, PoolError> {
        let guard = self.inner.lock().unwrap();
        let inner = guard.as_ref().ok_or(PoolError::Uninitialized)?;
        Ok(inner.table.capacity())
    }

    /// Point-in-time usage summary.
    pub fn stats(&self) -> Result<PoolStats, PoolError> {
        let guard = self.inner.lock().unwrap();
        let inner = guard.as_ref().ok_or(PoolError::Uninitialized)?;
        let capacity = inner.table.capacity();
        let free_bytes = inner.table.free_bytes();
        Ok(PoolStats {
            capacity,
            used_bytes: capacity - free_bytes,
            free_bytes,
            block_count: inner.table.len(),
            largest_free: inner.table.largest_free(),
        })
    }

    /// Snapshot of every descriptor in ascending-offset order, for
    /// diagnostics and tests.
    pub fn blocks(&self) -> Result<Vec<BlockInfo>, PoolError> {
        let guard = self.inner.lock().unwrap();
        let inner = guard.as_ref().ok_or(PoolError::Uninitialized)?;
        Ok(inner
            .table
            .iter()
            .map(|(offset, d)| BlockInfo {
                offset,
                len: d.len,
                free: d.free,
            })
            .collect())
    }

    // Copy `len` bytes from `src` to `dst` under the pool lock. Both
    // addresses must refer to allocated blocks of at least `len` bytes;
    // only the resize fallback calls this, right after allocating `dst`.
    fn copy_block(&self, src: BlockAddr, dst: BlockAddr, len: u32) -> Result<(), PoolError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(PoolError::Uninitialized)?;
        let (src_start, src_end) = inner.checked_range(src, len as usize)?;
        let (dst_start, _) = inner.checked_range(dst, len as usize)?;
        inner.buffer.copy_within(src_start..src_end, dst_start);
        Ok(())
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}
