// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! 64-bit FNV-1a fingerprints for dedup-set keys (spec.md §1/§GLOSSARY).

use fnv::FnvHasher;
use std::hash::Hasher;

/// Fingerprints `bytes` with FNV-1a, matching the hash family the sharded
/// dedup set is specified against.
pub fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(fingerprint(b"hello"), fingerprint(b"hello"));
    }

    #[test]
    fn differs_for_different_input() {
        assert_ne!(fingerprint(b"hello"), fingerprint(b"world"));
    }

    #[test]
    fn matches_known_fnv1a_64_vector() {
        // FNV-1a 64-bit of the empty string is the offset basis.
        assert_eq!(fingerprint(b""), 0xcbf2_9ce4_8422_2325);
    }
}
