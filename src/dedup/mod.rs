// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Sharded concurrent dedup set (spec.md §4.5 / C5).
//!
//! Each shard is an independent [`shard::Shard`] behind its own
//! `parking_lot::Mutex` — a monitor, per spec.md's concurrency contract:
//! only one mutator is ever inside a given shard, while different shards
//! make progress in parallel. `parking_lot` is the teacher's own choice
//! for this kind of fine-grained, short-held lock.

mod shard;

use parking_lot::Mutex;
pub use shard::Shard;

const MAX_SHARDS: usize = 16;
const MIN_SHARD_BUCKET_COUNT: usize = 16;
const SHARD_HASH_SHIFT: u32 = 48;

/// A fingerprint-sharded set of previously-seen normalized units.
///
/// Shard selection reads the high bits of the fingerprint
/// (`(hash >> 48) & mask`) rather than the low bits the bucket index
/// itself uses, so a key's shard and its bucket within that shard vary
/// independently even though both derive from the same 64-bit hash.
pub struct DedupSet {
    shards: Vec<Mutex<Shard>>,
    shard_mask: u64,
}

impl DedupSet {
    /// Builds a set sized for roughly `cap` total entries, split across the
    /// largest power-of-two shard count (at most 16) that still leaves each
    /// shard at least 16 initial buckets.
    pub fn init(cap: usize) -> Self {
        let mut shard_count = MAX_SHARDS;
        while shard_count > 1 && cap / shard_count < MIN_SHARD_BUCKET_COUNT {
            shard_count /= 2;
        }

        let per_shard_cap = (cap / shard_count).max(MIN_SHARD_BUCKET_COUNT);
        let shards = (0..shard_count).map(|_| Mutex::new(Shard::new(per_shard_cap))).collect();

        Self {
            shards,
            shard_mask: (shard_count - 1) as u64,
        }
    }

    fn shard_index(&self, hash: u64) -> usize {
        ((hash >> SHARD_HASH_SHIFT) & self.shard_mask) as usize
    }

    /// Attempts to insert `bytes` (already fingerprinted as `hash`).
    /// Returns `true` if this was the first time this exact key was seen.
    pub fn insert_hashed(&self, hash: u64, bytes: &[u8]) -> bool {
        let mut shard = self.shards[self.shard_index(hash)].lock();
        shard.insert_hashed(hash, bytes)
    }

    /// Pre-grows every shard ahead of an expected `n` additional bytes of
    /// input, so a large file's inserts don't each pay a rehash.
    pub fn reserve_for_bytes(&self, n: usize) {
        let per_shard = n / self.shards.len().max(1);
        for shard in &self.shards {
            shard.lock().reserve_for_bytes(per_shard);
        }
    }

    /// Empties every shard, retaining bucket and arena capacity.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Per-shard entry counts, in shard-index order. Lets callers check
    /// the distribution spec.md §8 describes ("each shard roughly ±10% of
    /// the mean") without reaching into shard internals.
    pub fn shard_counts(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.lock().entry_count()).collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().entry_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    #[test]
    fn init_splits_into_at_most_16_shards() {
        let set = DedupSet::init(1_000_000);
        assert!(set.shard_count() <= 16);
        assert!(set.shard_count().is_power_of_two());
    }

    #[test]
    fn small_cap_still_gets_minimum_bucket_count_per_shard() {
        let set = DedupSet::init(8);
        assert_eq!(set.shard_count(), 1);
    }

    #[test]
    fn insert_is_idempotent_across_the_whole_set() {
        let set = DedupSet::init(1024);
        let a = fingerprint(b"the quick brown fox");
        assert!(set.insert_hashed(a, b"the quick brown fox"));
        assert!(!set.insert_hashed(a, b"the quick brown fox"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn concurrent_inserts_from_different_shards_all_land() {
        use std::thread;

        let set = DedupSet::init(4096);
        thread::scope(|scope| {
            for t in 0..8 {
                let set = &set;
                scope.spawn(move || {
                    for i in 0..200 {
                        let text = format!("thread-{t}-unit-{i}");
                        let hash = fingerprint(text.as_bytes());
                        set.insert_hashed(hash, text.as_bytes());
                    }
                });
            }
        });
        assert_eq!(set.len(), 8 * 200);
    }

    #[test]
    fn clear_empties_every_shard() {
        let set = DedupSet::init(256);
        for i in 0..50u32 {
            let text = format!("unit-{i}");
            set.insert_hashed(fingerprint(text.as_bytes()), text.as_bytes());
        }
        assert_eq!(set.len(), 50);
        set.clear();
        assert!(set.is_empty());
    }
}
