// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Level-by-level Block Tree construction (spec.md §4.8 / C8).

use crate::blocktree::node::{BlockNode, NodeId};
use crate::hash::compute_hashes_parallel_with;
use crate::pool::HashPool;
use crate::sort::sort_block_nodes;

/// Arity for the level-1 partition; subsequent levels use `tau`. Both
/// default to `2` (spec.md §4.8).
#[derive(Debug, Clone, Copy)]
pub struct BlockTreeArity {
    pub s: usize,
    pub tau: usize,
}

impl Default for BlockTreeArity {
    fn default() -> Self {
        Self { s: 2, tau: 2 }
    }
}

/// A built Block Tree: a flat arena of [`BlockNode`]s plus the id of the
/// level-0 root. `access` (C9) walks this by index.
pub struct BlockTree {
    pub nodes: Vec<BlockNode>,
    pub root: NodeId,
}

/// Builds a Block Tree over `text` using the given arity and a private
/// [`HashPool`] sized from the environment (spec.md §4.10).
pub fn build_block_tree(text: &[char], arity: BlockTreeArity) -> BlockTree {
    build_block_tree_with(text, arity, &HashPool::new())
}

/// As [`build_block_tree`], but with an explicit pool so callers (and
/// tests) can control worker-thread fan-out.
pub fn build_block_tree_with(text: &[char], arity: BlockTreeArity, pool: &HashPool) -> BlockTree {
    let mut nodes: Vec<BlockNode> = Vec::new();

    let mut root = BlockNode::new(0, text.len(), 0, None);
    root.is_marked = true;
    nodes.push(root);
    let root_id: NodeId = 0;

    let mut current_marked: Vec<NodeId> = vec![root_id];

    let mut level = 1u32;
    loop {
        if current_marked.is_empty() {
            break;
        }

        let divisor = if level == 1 { arity.s } else { arity.tau }.max(1);

        // Partition: every current-level marked node with length > 1
        // spawns `num_children` children, per spec.md §4.8 step 1.
        // Children are appended to `nodes` in order and nothing else is
        // pushed in between, so the new candidates form one contiguous
        // range at the tail of `nodes` — this lets hashing operate on a
        // plain mutable slice instead of a scattered copy.
        let first_new_id = nodes.len() as NodeId;
        let mut candidates: Vec<NodeId> = Vec::new();

        for &parent_id in &current_marked {
            let (parent_start, parent_len) = {
                let p = &nodes[parent_id as usize];
                (p.start_pos, p.length)
            };

            if parent_start >= text.len() {
                continue;
            }
            let max_len = parent_len.min(text.len() - parent_start);
            if max_len <= 1 {
                continue;
            }

            let step = (max_len / divisor).max(1);
            let num_children = if step == 1 { max_len.min(divisor) } else { divisor };

            let mut child_ids: Vec<NodeId> = Vec::with_capacity(num_children);

            for k in 0..num_children {
                let c_start = parent_start + k * step;
                let mut c_end = c_start + step;
                if k == num_children - 1 {
                    c_end = parent_start + max_len;
                }
                if c_start >= text.len() || c_start >= c_end {
                    break;
                }
                c_end = c_end.min(text.len());

                let child = BlockNode::new(c_start, c_end - c_start, level, Some(parent_id));
                let child_id = nodes.len() as NodeId;
                nodes.push(child);
                child_ids.push(child_id);
                candidates.push(child_id);
            }

            nodes[parent_id as usize].children = child_ids;
        }

        if candidates.is_empty() {
            break;
        }

        // Hash (C6): the level's candidates are exactly nodes[first_new_id..].
        compute_hashes_parallel_with(&mut nodes[first_new_id as usize..], text, pool);

        // Sort (C7) then deduplicate (spec.md §4.8 step 3).
        sort_block_nodes(&mut candidates, &nodes);
        current_marked = deduplicate_level(&mut nodes, &candidates, text);

        level += 1;
    }

    BlockTree { nodes, root: root_id }
}

fn blocks_equal(a: &BlockNode, b: &BlockNode, text: &[char]) -> bool {
    a.length == b.length && text[a.start_pos..a.start_pos + a.length] == text[b.start_pos..b.start_pos + b.length]
}

/// Linear scan over sorted `candidates`: the first of each `(block_id,
/// length)` run becomes a leader; later members are byte-compared (here,
/// codepoint-compared) against leaders sharing that key to reject hash
/// collisions, becoming pointer nodes on a match or new leaders otherwise.
/// Mirrors `deduplicate_level` in the reference implementation.
fn deduplicate_level(nodes: &mut [BlockNode], candidates: &[NodeId], text: &[char]) -> Vec<NodeId> {
    let mut marked: Vec<NodeId> = Vec::new();
    if candidates.is_empty() {
        return marked;
    }

    let mut group_start = 0usize;
    let leader_id = candidates[0];
    nodes[leader_id as usize].is_marked = true;
    marked.push(leader_id);

    for &curr_id in &candidates[1..] {
        let (curr_block_id, curr_len) = {
            let c = &nodes[curr_id as usize];
            (c.block_id, c.length)
        };
        let leader_id = marked[marked.len() - 1];
        let (leader_block_id, leader_len) = {
            let l = &nodes[leader_id as usize];
            (l.block_id, l.length)
        };

        if curr_block_id != leader_block_id || curr_len != leader_len {
            nodes[curr_id as usize].is_marked = true;
            marked.push(curr_id);
            group_start = marked.len() - 1;
            continue;
        }

        let mut matched = false;
        for j in group_start..marked.len() {
            let candidate_id = marked[j];
            if nodes[candidate_id as usize].block_id != curr_block_id {
                continue;
            }
            if blocks_equal(&nodes[curr_id as usize], &nodes[candidate_id as usize], text) {
                let target_pos = nodes[candidate_id as usize].start_pos;
                let curr = &mut nodes[curr_id as usize];
                curr.is_marked = false;
                curr.target_pos = target_pos;
                matched = true;
                break;
            }
        }

        if !matched {
            nodes[curr_id as usize].is_marked = true;
            marked.push(curr_id);
        }
    }

    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_spans_whole_text() {
        let text: Vec<char> = "hello world".chars().collect();
        let tree = build_block_tree(&text, BlockTreeArity::default());
        let root = &tree.nodes[tree.root as usize];
        assert_eq!(root.start_pos, 0);
        assert_eq!(root.length, text.len());
        assert!(root.is_marked);
    }

    #[test]
    fn repeated_pattern_yields_one_leader_and_pointer_siblings() {
        let text: Vec<char> = "ABCABCABC".chars().collect();
        let tree = build_block_tree(&text, BlockTreeArity { s: 3, tau: 3 });

        let root = &tree.nodes[tree.root as usize];
        assert_eq!(root.children.len(), 3);

        let children: Vec<&BlockNode> = root.children.iter().map(|&id| &tree.nodes[id as usize]).collect();
        let marked_count = children.iter().filter(|c| c.is_marked).count();
        assert_eq!(marked_count, 1);

        let leader = children.iter().find(|c| c.is_marked).unwrap();
        assert_eq!(leader.start_pos, 0);

        for c in children.iter().filter(|c| !c.is_marked) {
            assert_eq!(c.target_pos, 0);
            assert_eq!(c.block_id, leader.block_id);
        }
    }

    #[test]
    fn empty_text_yields_lone_root() {
        let text: Vec<char> = Vec::new();
        let tree = build_block_tree(&text, BlockTreeArity::default());
        let root = &tree.nodes[tree.root as usize];
        assert_eq!(root.length, 0);
        assert!(root.children.is_empty());
    }

    #[test]
    fn single_char_text_has_no_children() {
        let text: Vec<char> = "x".chars().collect();
        let tree = build_block_tree(&text, BlockTreeArity::default());
        let root = &tree.nodes[tree.root as usize];
        assert!(root.children.is_empty());
    }

    #[test]
    fn terminates_and_covers_all_leaves() {
        let text: Vec<char> = "the quick brown fox jumps over the lazy dog".chars().collect();
        let tree = build_block_tree(&text, BlockTreeArity::default());
        // Every node's children, if any, are contiguous and disjoint and
        // together span exactly the parent's window.
        for node in &tree.nodes {
            if node.children.is_empty() {
                continue;
            }
            let mut cursor = node.start_pos;
            for &child_id in &node.children {
                let child = &tree.nodes[child_id as usize];
                assert_eq!(child.start_pos, cursor);
                cursor += child.length;
            }
            assert_eq!(cursor, node.start_pos + node.length);
        }
    }
}
