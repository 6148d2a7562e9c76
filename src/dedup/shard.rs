// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A single Robin-Hood shard of the dedup set (spec.md §4.5 / C5).

const CTRL_EMPTY: u8 = 0xFF;
const LOAD_FACTOR_NUM: usize = 85;
const LOAD_FACTOR_DEN: usize = 100;
const AVG_SENTENCE_BYTES: usize = 64;

fn round_up_pow2(value: usize) -> usize {
    value.next_power_of_two()
}

#[derive(Clone, Copy)]
struct Slot {
    ctrl: u8,
    hash: u64,
    len: u32,
    offset: u32,
}

impl Slot {
    const EMPTY: Self = Self {
        ctrl: CTRL_EMPTY,
        hash: 0,
        len: 0,
        offset: 0,
    };
}

/// One shard: an open-addressed Robin-Hood table plus the append-only byte
/// arena backing its keys. The arena is a single growable buffer rather
/// than the reference implementation's chain of fixed blocks — `Vec<u8>`'s
/// amortized growth plays the same role (stable append, no per-key free)
/// without the extra block-list bookkeeping.
pub struct Shard {
    slots: Vec<Slot>,
    arena: Vec<u8>,
    entry_count: usize,
}

impl Shard {
    pub fn new(min_bucket_count: usize) -> Self {
        let bucket_count = round_up_pow2(min_bucket_count.max(16));
        Self {
            slots: vec![Slot::EMPTY; bucket_count],
            arena: Vec::new(),
            entry_count: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    fn key_at(&self, slot: &Slot) -> &[u8] {
        let start = slot.offset as usize;
        let end = start + slot.len as usize;
        &self.arena[start..end]
    }

    fn append_key(&mut self, bytes: &[u8]) -> (u32, u32) {
        let offset = self.arena.len() as u32;
        self.arena.extend_from_slice(bytes);
        (offset, bytes.len() as u32)
    }

    /// Rebuilds the table at `new_bucket_count` (rounded up to a power of
    /// two), re-inserting every live entry. The arena is left untouched —
    /// existing offsets remain valid since entries are only ever appended.
    fn rehash(&mut self, new_bucket_count: usize) {
        let new_bucket_count = round_up_pow2(new_bucket_count);
        let old_slots = std::mem::replace(&mut self.slots, vec![Slot::EMPTY; new_bucket_count]);
        self.entry_count = 0;

        for old in old_slots {
            if old.ctrl == CTRL_EMPTY {
                continue;
            }
            let start = old.offset as usize;
            let end = start + old.len as usize;
            self.insert_raw(old.hash, start as u32, (end - start) as u32);
        }
    }

    /// Robin-Hood insert of an already-arena-resident key (used by
    /// `rehash`, which never needs to re-copy bytes).
    fn insert_raw(&mut self, hash: u64, offset: u32, len: u32) {
        let mask = self.slots.len() - 1;
        let mut idx = (hash as usize) & mask;
        let mut dist: u8 = 0;
        let mut cand = Slot {
            ctrl: 0,
            hash,
            len,
            offset,
        };

        loop {
            let slot = self.slots[idx];
            if slot.ctrl == CTRL_EMPTY {
                cand.ctrl = dist;
                self.slots[idx] = cand;
                self.entry_count += 1;
                return;
            }
            if slot.ctrl < dist {
                self.slots[idx] = Slot { ctrl: dist, ..cand };
                cand = slot;
                dist = slot.ctrl + 1;
                idx = (idx + 1) & mask;
                continue;
            }
            dist += 1;
            idx = (idx + 1) & mask;
        }
    }

    /// Ensures the shard can hold `byte_len` additional bytes' worth of
    /// entries (at `AVG_SENTENCE_BYTES` each) without crossing 80% load.
    pub fn reserve_for_bytes(&mut self, byte_len: usize) {
        let expected = (byte_len / AVG_SENTENCE_BYTES).max(16);
        let target = self.entry_count.saturating_add(expected);
        let needed = target.saturating_mul(5) / 4;
        if needed > self.bucket_count() {
            self.rehash(round_up_pow2(needed));
        }
    }

    fn grow_if_over_threshold(&mut self) {
        let threshold = (self.bucket_count() * LOAD_FACTOR_NUM / LOAD_FACTOR_DEN).max(1);
        if self.entry_count + 1 > threshold {
            self.rehash(self.bucket_count() * 2);
        }
    }

    /// Robin-Hood probe and insert. Returns `true` if `bytes` was newly
    /// inserted, `false` if an equal `(hash, len, bytes)` key was already
    /// present.
    ///
    /// Once the original key is matched against an existing entry (an
    /// early `false` return) or placed into a slot (directly or by
    /// displacing an earlier entry), the original candidate is resolved —
    /// the loop may keep running to re-home a displaced entry, but that no
    /// longer affects the return value, so `pending_bytes` being consumed
    /// is the only thing `Some`/`None` tracks.
    pub fn insert_hashed(&mut self, hash: u64, bytes: &[u8]) -> bool {
        self.grow_if_over_threshold();

        let mask = self.bucket_count() - 1;
        let mut idx = (hash as usize) & mask;
        let mut dist: u8 = 0;

        let mut pending_bytes: Option<&[u8]> = Some(bytes);
        let mut cand_hash = hash;
        let mut cand_len = bytes.len() as u32;
        let mut cand_offset = 0u32;

        loop {
            let slot = self.slots[idx];

            if slot.ctrl == CTRL_EMPTY {
                let offset = match pending_bytes {
                    Some(b) => self.append_key(b).0,
                    None => cand_offset,
                };
                self.slots[idx] = Slot {
                    ctrl: dist,
                    hash: cand_hash,
                    len: cand_len,
                    offset,
                };
                self.entry_count += 1;
                return true;
            }

            if let Some(b) = pending_bytes {
                if slot.hash == cand_hash && slot.len as usize == b.len() && self.key_at(&slot) == b {
                    return false;
                }
            }

            if slot.ctrl < dist {
                let offset = match pending_bytes.take() {
                    Some(b) => self.append_key(b).0,
                    None => cand_offset,
                };
                self.slots[idx] = Slot {
                    ctrl: dist,
                    hash: cand_hash,
                    len: cand_len,
                    offset,
                };
                cand_hash = slot.hash;
                cand_len = slot.len;
                cand_offset = slot.offset;
                dist = slot.ctrl + 1;
                idx = (idx + 1) & mask;
                continue;
            }

            dist += 1;
            idx = (idx + 1) & mask;

            if dist == CTRL_EMPTY {
                self.rehash(self.bucket_count() * 2);
                return self.insert_hashed(hash, bytes);
            }
        }
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.ctrl = CTRL_EMPTY;
        }
        self.entry_count = 0;
        self.arena.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_and_rejects_duplicates() {
        let mut shard = Shard::new(16);
        assert!(shard.insert_hashed(1, b"hello"));
        assert!(!shard.insert_hashed(1, b"hello"));
        assert!(shard.insert_hashed(2, b"world"));
        assert_eq!(shard.entry_count(), 2);
    }

    #[test]
    fn hash_collision_with_different_bytes_both_inserted() {
        let mut shard = Shard::new(16);
        assert!(shard.insert_hashed(42, b"alpha"));
        assert!(shard.insert_hashed(42, b"beta"));
        assert_eq!(shard.entry_count(), 2);
    }

    #[test]
    fn grows_past_load_factor() {
        let mut shard = Shard::new(16);
        let initial_buckets = shard.bucket_count();
        for i in 0..20u64 {
            let key = format!("key-{i}");
            shard.insert_hashed(i, key.as_bytes());
        }
        assert!(shard.bucket_count() > initial_buckets);
        assert_eq!(shard.entry_count(), 20);
    }

    #[test]
    fn reserve_for_bytes_grows_ahead_of_inserts() {
        let mut shard = Shard::new(16);
        shard.reserve_for_bytes(64 * 1024);
        assert!(shard.bucket_count() >= 16);
    }

    #[test]
    fn clear_resets_entries_but_keeps_capacity() {
        let mut shard = Shard::new(16);
        for i in 0..10u64 {
            shard.insert_hashed(i, format!("k{i}").as_bytes());
        }
        let buckets_before = shard.bucket_count();
        shard.clear();
        assert_eq!(shard.entry_count(), 0);
        assert_eq!(shard.bucket_count(), buckets_before);
        assert!(shard.insert_hashed(0, b"k0"));
    }

    #[test]
    fn survives_many_collisions_on_same_bucket() {
        let mut shard = Shard::new(16);
        // All hashes share low bits -> dense displacement chains.
        for i in 0..50u64 {
            let key = format!("same-bucket-{i}");
            assert!(shard.insert_hashed(i * shard.bucket_count() as u64, key.as_bytes()));
        }
        assert_eq!(shard.entry_count(), 50);
    }
}
