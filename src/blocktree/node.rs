// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Index of a [`BlockNode`] within its owning tree's node arena.
///
/// spec.md's design notes call for `parent` to be "a back-edge recorded as
/// an index, never as ownership" in an ownership-tracking language; a
/// plain `u32` index into a flat `Vec<BlockNode>` is exactly that, and
/// additionally makes `children` cheap `Vec<NodeId>` rather than requiring
/// self-referential arena pointers.
pub type NodeId = u32;

/// A single node in the Block Tree (spec.md §3).
#[derive(Debug, Clone)]
pub struct BlockNode {
    /// Half-open window start over the UTF-32 text.
    pub start_pos: usize,
    /// Half-open window length.
    pub length: usize,
    /// Depth; level 0 is the root spanning the whole text.
    pub level: u32,
    /// The 64-bit rolling hash of the window.
    pub block_id: u64,
    /// `true` => content node (leftmost occurrence of its class on its
    /// level); `false` => pointer node redirecting to `target_pos`.
    pub is_marked: bool,
    /// When unmarked, the `start_pos` of the marked node this one is
    /// equivalent to. Meaningless when marked.
    pub target_pos: usize,
    /// Ordered, contiguous, disjoint children. Non-empty only for marked
    /// nodes with `length > 1`.
    pub children: Vec<NodeId>,
    /// Back-reference to the parent; `None` only for the root.
    pub parent: Option<NodeId>,
}

impl BlockNode {
    pub fn new(start_pos: usize, length: usize, level: u32, parent: Option<NodeId>) -> Self {
        Self {
            start_pos,
            length,
            level,
            block_id: 0,
            is_marked: false,
            target_pos: 0,
            children: Vec::new(),
            parent,
        }
    }
}
