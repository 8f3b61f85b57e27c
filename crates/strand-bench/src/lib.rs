//! Benchmark workloads and utilities for the Strand pool and sequence.
//!
//! Provides pre-built fixtures shared by the criterion benches:
//!
//! - [`fragmented_pool`]: a pool driven into a seeded fragmented state
//! - [`sample_sequence`]: a sequence pre-filled with `n` values

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strand_list::Sequence;
use strand_pool::{BlockAddr, Pool, PoolError};

/// Build a pool in a deterministic fragmented state.
///
/// Allocates and releases blocks of mixed sizes from a seeded RNG until the
/// pool has seen `churn` operations, then returns the pool together with
/// the surviving addresses. First-fit scans over the resulting descriptor
/// table are representative of steady-state fragmentation rather than of a
/// freshly initialized pool.
pub fn fragmented_pool(capacity: u32, churn: usize, seed: u64) -> (Pool, Vec<BlockAddr>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pool = Pool::new();
    pool.init(capacity).expect("benchmark pool capacity is valid");
    let mut live = Vec::new();

    for _ in 0..churn {
        if *[true, true, false].choose(&mut rng).expect("non-empty") || live.is_empty() {
            let size = rng.random_range(8..128);
            match pool.allocate(size) {
                Ok(addr) => live.push(addr),
                Err(PoolError::Exhausted { .. }) => {
                    if !live.is_empty() {
                        let idx = rng.random_range(0..live.len());
                        let addr = live.swap_remove(idx);
                        pool.release(addr).expect("benchmark address is live");
                    }
                }
                Err(e) => unreachable!("benchmark pool setup failed: {e}"),
            }
        } else {
            let idx = rng.random_range(0..live.len());
            let addr = live.swap_remove(idx);
            pool.release(addr).expect("benchmark address is live");
        }
    }
    (pool, live)
}

/// Build a sequence pre-filled with values `0..n`.
pub fn sample_sequence(n: u16) -> Sequence {
    let seq = Sequence::new();
    seq.init(u32::from(n).max(1) * strand_list::NODE_SIZE)
        .expect("benchmark capacity is valid");
    for v in 0..n {
        seq.insert(v).expect("benchmark pool sized for n nodes");
    }
    seq
}
