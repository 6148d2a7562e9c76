// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::Span;

/// A single span covering the whole non-empty input.
pub fn split_document(bytes: &[u8]) -> Vec<Span> {
    if bytes.is_empty() {
        Vec::new()
    } else {
        vec![Span::new(0, bytes.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_buffer_is_one_span() {
        let spans = split_document(b"hello world");
        assert_eq!(spans, vec![Span::new(0, 11)]);
    }

    #[test]
    fn empty_input_has_no_spans() {
        assert!(split_document(b"").is_empty());
    }
}
