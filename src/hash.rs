// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Polynomial rolling hash over UTF-32 windows, with a serial/parallel
//! dispatcher (spec.md §4.6 / C6).

use crate::blocktree::BlockNode;
use crate::pool::HashPool;

/// Multiplier from the rolling-hash recurrence: `block_id = Σ c_i · 31^(L-1-i)`.
pub const HASH_MULT: u64 = 31;

/// Below this many candidates per worker, dispatch serially rather than
/// paying thread hand-off cost.
pub const HASH_PARALLEL_BASE: usize = 64;

/// Computes the scalar rolling hash of `text[start..start+length]`
/// (clamped to `text.len()`), per spec.md §4.6. `start >= text.len()`
/// yields `0`.
pub fn block_id(text: &[char], start: usize, length: usize) -> u64 {
    if start >= text.len() {
        return 0;
    }
    let end = (start + length).min(text.len());
    let mut h: u64 = 0;
    for &c in &text[start..end] {
        h = h.wrapping_mul(HASH_MULT).wrapping_add(c as u64);
    }
    h
}

/// Computes `block_id` for every node in the contiguous slice `nodes`,
/// using `pool` to fan out across worker threads when the batch is large
/// enough to be worth it.
///
/// Serial execution is used when `nodes.len() < HASH_PARALLEL_BASE *
/// threads`, when the pool has only one thread, or as a fallback if the
/// pool fails to run. Both paths share the same per-node scalar formula,
/// so they produce bit-identical results (spec.md §8 invariant 8).
pub fn compute_hashes_parallel(nodes: &mut [BlockNode], text: &[char]) {
    compute_hashes_parallel_with(nodes, text, &HashPool::new());
}

pub fn compute_hashes_parallel_with(nodes: &mut [BlockNode], text: &[char], pool: &HashPool) {
    let count = nodes.len();
    if count == 0 {
        return;
    }

    let threads = pool.thread_count();
    if threads <= 1 || count < HASH_PARALLEL_BASE * threads {
        hash_all(nodes, text);
        return;
    }

    let active = threads.min(count);
    let chunk = count.div_ceil(active);

    let ran = pool.run(nodes, chunk, |chunk_nodes| {
        hash_all(chunk_nodes, text);
    });

    if !ran {
        hash_all(nodes, text);
    }
}

fn hash_all(nodes: &mut [BlockNode], text: &[char]) {
    for node in nodes.iter_mut() {
        node.block_id = block_id(text, node.start_pos, node.length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_manual_polynomial() {
        let text: Vec<char> = "abc".chars().collect();
        let expected = ('a' as u64) * 31 * 31 + ('b' as u64) * 31 + ('c' as u64);
        assert_eq!(block_id(&text, 0, 3), expected);
    }

    #[test]
    fn clamps_length_to_remaining_text() {
        let text: Vec<char> = "ab".chars().collect();
        assert_eq!(block_id(&text, 0, 10), block_id(&text, 0, 2));
    }

    #[test]
    fn start_past_end_is_zero() {
        let text: Vec<char> = "ab".chars().collect();
        assert_eq!(block_id(&text, 5, 1), 0);
    }

    #[test]
    fn serial_and_parallel_dispatch_agree() {
        let text: Vec<char> = "the quick brown fox jumps over the lazy dog ".repeat(60).chars().collect();
        let mut serial_nodes: Vec<BlockNode> = (0..1000)
            .map(|i| BlockNode::new(i * 3 % text.len(), 5, 1, None))
            .collect();
        let mut parallel_nodes = serial_nodes.clone();

        hash_all(&mut serial_nodes, &text);
        compute_hashes_parallel_with(&mut parallel_nodes, &text, &HashPool::with_thread_count(8));

        let serial_ids: Vec<u64> = serial_nodes.iter().map(|n| n.block_id).collect();
        let parallel_ids: Vec<u64> = parallel_nodes.iter().map(|n| n.block_id).collect();
        assert_eq!(serial_ids, parallel_ids);
    }
}
