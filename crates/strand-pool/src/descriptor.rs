//! Block descriptor table: the pool's free-list bookkeeping.
//!
//! The [`DescriptorTable`] partitions `[0, capacity)` into contiguous
//! ranges, one [`BlockDescriptor`] per range, kept in ascending-offset
//! order. It uses `IndexMap` (not `HashMap`) so the index order *is* the
//! offset order: neighbours live at adjacent indices, which makes split
//! (`shift_insert` after the current index) and coalesce
//! (`shift_remove_index` of the neighbour) direct, with O(1) exact-offset
//! lookup on top.
//!
//! # Invariants
//!
//! At rest (between operations) the table always satisfies:
//! - descriptors cover `[0, capacity)` with no gaps and no overlap;
//! - the sum of all lengths equals `capacity`;
//! - no two adjacent descriptors are both free.
//!
//! The table is a plain data structure — locking lives in
//! [`Pool`](crate::pool::Pool).

use indexmap::IndexMap;

/// Metadata for one contiguous range of the pool buffer.
///
/// The range's offset is the table key; the descriptor carries only the
/// length and the free flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Length of the range in bytes.
    pub len: u32,
    /// Whether the range is available for allocation.
    pub free: bool,
}

/// Ascending-offset table of block descriptors.
///
/// All mutating operations preserve the partition invariants documented at
/// the module level. Index arguments refer to positions in offset order.
#[derive(Clone, Debug)]
pub struct DescriptorTable {
    entries: IndexMap<u32, BlockDescriptor>,
    capacity: u32,
}

impl DescriptorTable {
    /// Create a table covering `[0, capacity)` with a single free descriptor.
    pub fn new(capacity: u32) -> Self {
        let mut entries = IndexMap::with_capacity(8);
        entries.insert(
            0,
            BlockDescriptor {
                len: capacity,
                free: true,
            },
        );
        Self { entries, capacity }
    }

    /// Total capacity covered by the table in bytes.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no descriptors. Never true after `new`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a descriptor by exact offset.
    pub fn get(&self, offset: u32) -> Option<&BlockDescriptor> {
        self.entries.get(&offset)
    }

    /// Position of the descriptor with the given offset, if any.
    pub fn index_of(&self, offset: u32) -> Option<usize> {
        self.entries.get_index_of(&offset)
    }

    /// Descriptor at the given position, with its offset.
    pub fn get_index(&self, index: usize) -> Option<(u32, &BlockDescriptor)> {
        self.entries.get_index(index).map(|(&off, d)| (off, d))
    }

    /// Iterate over `(offset, descriptor)` pairs in ascending-offset order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &BlockDescriptor)> {
        self.entries.iter().map(|(&off, d)| (off, d))
    }

    /// Index of the first free descriptor with `len >= size` (first-fit).
    pub fn first_fit(&self, size: u32) -> Option<usize> {
        self.entries
            .values()
            .position(|d| d.free && d.len >= size)
    }

    /// Offset of the first free descriptor, regardless of length.
    pub fn first_free_offset(&self) -> Option<u32> {
        self.entries
            .iter()
            .find(|(_, d)| d.free)
            .map(|(&off, _)| off)
    }

    /// Mark the descriptor at `index` used, splitting off a trailing free
    /// remainder when it is larger than `size`. Returns the block's offset.
    ///
    /// The caller must have located `index` via [`DescriptorTable::first_fit`]:
    /// the descriptor must be free with `len >= size`, and `size` must be
    /// non-zero.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn allocate_at(&mut self, index: usize, size: u32) -> u32 {
        let (&offset, desc) = self
            .entries
            .get_index(index)
            .expect("allocate_at: descriptor index in range");
        debug_assert!(desc.free && desc.len >= size && size > 0);
        let len = desc.len;

        let (_, desc) = self
            .entries
            .get_index_mut(index)
            .expect("allocate_at: descriptor index in range");
        desc.free = false;
        if len > size {
            desc.len = size;
            self.entries.shift_insert(
                index + 1,
                offset + size,
                BlockDescriptor {
                    len: len - size,
                    free: true,
                },
            );
        }
        offset
    }

    /// Mark the descriptor at `index` free and coalesce with free neighbours.
    ///
    /// Merges with the next descriptor first, then with the previous one, so
    /// a three-way adjacency (prev, current, next all free) collapses into a
    /// single descriptor in one call. Returns `false` without mutating
    /// anything if the descriptor was already free (idempotent release).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn release_at(&mut self, index: usize) -> bool {
        let (_, desc) = self
            .entries
            .get_index_mut(index)
            .expect("release_at: descriptor index in range");
        if desc.free {
            return false;
        }
        desc.free = true;

        self.coalesce_forward(index);

        if index > 0 {
            let prev_free = self
                .entries
                .get_index(index - 1)
                .map(|(_, d)| d.free)
                .unwrap_or(false);
            if prev_free {
                let (_, merged) = self
                    .entries
                    .shift_remove_index(index)
                    .expect("release_at: descriptor index in range");
                let (_, prev) = self
                    .entries
                    .get_index_mut(index - 1)
                    .expect("release_at: previous descriptor exists");
                prev.len += merged.len;
            }
        }
        true
    }

    /// Shrink the used descriptor at `index` to `size`, splitting the
    /// remainder off as a free descriptor immediately after it.
    ///
    /// The remainder is coalesced with a following free descriptor so the
    /// no-adjacent-free invariant holds on return. No-op when the lengths
    /// already match. The descriptor must be used with `len >= size`, and
    /// `size` must be non-zero.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn shrink_at(&mut self, index: usize, size: u32) {
        let (&offset, desc) = self
            .entries
            .get_index(index)
            .expect("shrink_at: descriptor index in range");
        debug_assert!(!desc.free && desc.len >= size && size > 0);
        let len = desc.len;
        if len == size {
            return;
        }

        let (_, desc) = self
            .entries
            .get_index_mut(index)
            .expect("shrink_at: descriptor index in range");
        desc.len = size;
        self.entries.shift_insert(
            index + 1,
            offset + size,
            BlockDescriptor {
                len: len - size,
                free: true,
            },
        );
        self.coalesce_forward(index + 1);
    }

    /// Grow the used descriptor at `index` to `size` by merging the free
    /// descriptor after it, re-splitting any excess.
    ///
    /// Returns `false` without mutating anything if there is no next
    /// descriptor, it is not free, or the combined length is still short of
    /// `size`. The block keeps its offset — data is never moved.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn grow_at(&mut self, index: usize, size: u32) -> bool {
        let (&offset, desc) = self
            .entries
            .get_index(index)
            .expect("grow_at: descriptor index in range");
        debug_assert!(!desc.free);
        let len = desc.len;

        let next_len = match self.entries.get_index(index + 1) {
            Some((_, next)) if next.free && len + next.len >= size => next.len,
            _ => return false,
        };

        self.entries.shift_remove_index(index + 1);
        let merged = len + next_len;
        let (_, desc) = self
            .entries
            .get_index_mut(index)
            .expect("grow_at: descriptor index in range");
        desc.len = size;
        if merged > size {
            self.entries.shift_insert(
                index + 1,
                offset + size,
                BlockDescriptor {
                    len: merged - size,
                    free: true,
                },
            );
        }
        true
    }

    /// Length of the largest free descriptor, or 0 if none is free.
    pub fn largest_free(&self) -> u32 {
        self.entries
            .values()
            .filter(|d| d.free)
            .map(|d| d.len)
            .max()
            .unwrap_or(0)
    }

    /// Total free bytes across all free descriptors.
    pub fn free_bytes(&self) -> u32 {
        self.entries
            .values()
            .filter(|d| d.free)
            .map(|d| d.len)
            .sum()
    }

    // If the descriptor after `index` is free, merge it into `index`.
    // Only valid when the descriptor at `index` is free (release path) or
    // the merge target is the shrink remainder.
    fn coalesce_forward(&mut self, index: usize) {
        let next_len = match self.entries.get_index(index + 1) {
            Some((_, next)) if next.free => next.len,
            _ => return,
        };
        self.entries.shift_remove_index(index + 1);
        let (_, desc) = self
            .entries
            .get_index_mut(index)
            .expect("coalesce_forward: descriptor index in range");
        desc.len += next_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assert the partition invariants: contiguous ascending offsets summing
    /// to capacity, and no two adjacent free descriptors.
    fn assert_invariants(table: &DescriptorTable) {
        let mut cursor = 0u32;
        let mut prev_free = false;
        for (offset, desc) in table.iter() {
            assert_eq!(offset, cursor, "gap or overlap at offset {offset}");
            assert!(desc.len > 0, "zero-length descriptor at {offset}");
            assert!(
                !(prev_free && desc.free),
                "adjacent free descriptors at {offset}"
            );
            cursor += desc.len;
            prev_free = desc.free;
        }
        assert_eq!(cursor, table.capacity(), "lengths do not sum to capacity");
    }

    #[test]
    fn new_has_single_free_descriptor() {
        let table = DescriptorTable::new(100);
        assert_eq!(table.len(), 1);
        let desc = table.get(0).unwrap();
        assert_eq!(desc.len, 100);
        assert!(desc.free);
        assert_invariants(&table);
    }

    #[test]
    fn allocate_exact_fit_marks_used_in_place() {
        let mut table = DescriptorTable::new(100);
        let idx = table.first_fit(100).unwrap();
        let offset = table.allocate_at(idx, 100);
        assert_eq!(offset, 0);
        assert_eq!(table.len(), 1);
        assert!(!table.get(0).unwrap().free);
        assert_invariants(&table);
    }

    #[test]
    fn allocate_splits_larger_block() {
        let mut table = DescriptorTable::new(100);
        let idx = table.first_fit(40).unwrap();
        let offset = table.allocate_at(idx, 40);
        assert_eq!(offset, 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().len, 40);
        assert!(!table.get(0).unwrap().free);
        assert_eq!(table.get(40).unwrap().len, 60);
        assert!(table.get(40).unwrap().free);
        assert_invariants(&table);
    }

    #[test]
    fn first_fit_skips_used_and_too_small() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(table.first_fit(40).unwrap(), 40); // [used 40][free 60]
        table.allocate_at(table.first_fit(30).unwrap(), 30); // [used 40][used 30][free 30]
        table.release_at(0); // [free 40][used 30][free 30]

        // A 35-byte request fits in the first free run (first-fit, not best-fit).
        let idx = table.first_fit(35).unwrap();
        assert_eq!(table.get_index(idx).unwrap().0, 0);
        // A 50-byte request fits nowhere.
        assert!(table.first_fit(50).is_none());
        assert_invariants(&table);
    }

    #[test]
    fn release_coalesces_with_next() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        assert!(table.release_at(0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().len, 100);
        assert_invariants(&table);
    }

    #[test]
    fn release_coalesces_with_previous() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        table.allocate_at(1, 60); // [used 40][used 60]
        table.release_at(0); // [free 40][used 60]
        table.release_at(1); // should fold back into one free block
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().len, 100);
        assert_invariants(&table);
    }

    #[test]
    fn release_collapses_three_way_adjacency() {
        let mut table = DescriptorTable::new(90);
        table.allocate_at(0, 30); // a
        table.allocate_at(1, 30); // b
        table.allocate_at(2, 30); // c
        table.release_at(0); // [free][used][used]
        table.release_at(2); // [free][used][free]
        // Releasing the middle block must merge next first, then previous.
        table.release_at(1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().len, 90);
        assert_invariants(&table);
    }

    #[test]
    fn release_already_free_is_noop() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40);
        assert!(table.release_at(0));
        let before: Vec<_> = table.iter().map(|(o, d)| (o, *d)).collect();
        assert!(!table.release_at(0));
        let after: Vec<_> = table.iter().map(|(o, d)| (o, *d)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn release_restores_pre_allocation_structure() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        let before: Vec<_> = table.iter().map(|(o, d)| (o, *d)).collect();

        let idx = table.first_fit(25).unwrap();
        let offset = table.allocate_at(idx, 25);
        table.release_at(table.index_of(offset).unwrap());

        let after: Vec<_> = table.iter().map(|(o, d)| (o, *d)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn shrink_splits_off_free_remainder() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        table.allocate_at(1, 60); // [used 40][used 60]
        table.shrink_at(0, 10); // [used 10][free 30][used 60]
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0).unwrap().len, 10);
        assert!(!table.get(0).unwrap().free);
        assert_eq!(table.get(10).unwrap().len, 30);
        assert!(table.get(10).unwrap().free);
        assert_invariants(&table);
    }

    #[test]
    fn shrink_remainder_coalesces_with_following_free_block() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        table.shrink_at(0, 10); // remainder must merge into the free 60
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(10).unwrap().len, 90);
        assert!(table.get(10).unwrap().free);
        assert_invariants(&table);
    }

    #[test]
    fn shrink_to_same_size_is_noop() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40);
        table.shrink_at(0, 40);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().len, 40);
        assert_invariants(&table);
    }

    #[test]
    fn grow_merges_free_next_and_resplits() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        assert!(table.grow_at(0, 70));
        assert_eq!(table.get(0).unwrap().len, 70);
        assert!(!table.get(0).unwrap().free);
        assert_eq!(table.get(70).unwrap().len, 30);
        assert!(table.get(70).unwrap().free);
        assert_invariants(&table);
    }

    #[test]
    fn grow_consumes_next_exactly() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40);
        assert!(table.grow_at(0, 100));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().len, 100);
        assert_invariants(&table);
    }

    #[test]
    fn grow_fails_when_next_is_used() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40);
        table.allocate_at(1, 60);
        assert!(!table.grow_at(0, 50));
        assert_eq!(table.get(0).unwrap().len, 40);
        assert_invariants(&table);
    }

    #[test]
    fn grow_fails_when_combined_length_is_short() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // next free run is 60
        assert!(!table.grow_at(0, 101));
        assert_eq!(table.get(0).unwrap().len, 40);
        assert_invariants(&table);
    }

    #[test]
    fn largest_free_and_free_bytes() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40); // [used 40][free 60]
        table.allocate_at(1, 30); // [used 40][used 30][free 30]
        table.release_at(0); // [free 40][used 30][free 30]
        assert_eq!(table.largest_free(), 40);
        assert_eq!(table.free_bytes(), 70);
    }

    #[test]
    fn first_free_offset_finds_earliest() {
        let mut table = DescriptorTable::new(100);
        table.allocate_at(0, 40);
        assert_eq!(table.first_free_offset(), Some(40));
        table.allocate_at(1, 60);
        assert_eq!(table.first_free_offset(), None);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// A random pool operation at the descriptor-table level.
        #[derive(Clone, Debug)]
        enum Op {
            Allocate(u32),
            ReleaseNth(usize),
            ShrinkNth(usize, u32),
            GrowNth(usize, u32),
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1u32..64).prop_map(Op::Allocate),
                (0usize..16).prop_map(Op::ReleaseNth),
                (0usize..16, 1u32..64).prop_map(|(n, s)| Op::ShrinkNth(n, s)),
                (0usize..16, 1u32..96).prop_map(|(n, s)| Op::GrowNth(n, s)),
            ]
        }

        /// Offsets of used descriptors, in table order.
        fn used_indices(table: &DescriptorTable) -> Vec<usize> {
            table
                .iter()
                .enumerate()
                .filter(|(_, (_, d))| !d.free)
                .map(|(i, _)| i)
                .collect()
        }

        proptest! {
            #[test]
            fn random_ops_preserve_partition_invariants(
                ops in proptest::collection::vec(arb_op(), 1..80),
            ) {
                let mut table = DescriptorTable::new(256);
                for op in ops {
                    match op {
                        Op::Allocate(size) => {
                            if let Some(idx) = table.first_fit(size) {
                                table.allocate_at(idx, size);
                            }
                        }
                        Op::ReleaseNth(n) => {
                            let used = used_indices(&table);
                            if let Some(&idx) = used.get(n % used.len().max(1)) {
                                table.release_at(idx);
                            }
                        }
                        Op::ShrinkNth(n, size) => {
                            let used = used_indices(&table);
                            if let Some(&idx) = used.get(n % used.len().max(1)) {
                                let (_, d) = table.get_index(idx).unwrap();
                                if d.len >= size {
                                    table.shrink_at(idx, size);
                                }
                            }
                        }
                        Op::GrowNth(n, size) => {
                            let used = used_indices(&table);
                            if let Some(&idx) = used.get(n % used.len().max(1)) {
                                let (_, d) = table.get_index(idx).unwrap();
                                if d.len < size {
                                    table.grow_at(idx, size);
                                }
                            }
                        }
                    }
                    super::assert_invariants(&table);
                }
            }

            #[test]
            fn allocate_release_round_trip_restores_structure(
                first in 1u32..128,
                second in 1u32..128,
            ) {
                let mut table = DescriptorTable::new(256);
                table.allocate_at(table.first_fit(first).unwrap(), first);
                let before: Vec<_> = table.iter().map(|(o, d)| (o, *d)).collect();

                if let Some(idx) = table.first_fit(second) {
                    let offset = table.allocate_at(idx, second);
                    table.release_at(table.index_of(offset).unwrap());
                }

                let after: Vec<_> = table.iter().map(|(o, d)| (o, *d)).collect();
                prop_assert_eq!(before, after);
            }
        }
    }
}
