// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::Span;

/// A paragraph is a maximal run of non-blank lines; blank lines (only
/// whitespace) separate paragraphs.
pub fn split_paragraphs(bytes: &[u8]) -> Vec<Span> {
    let lines = raw_lines(bytes);

    let mut spans = Vec::new();
    let mut current: Option<(usize, usize)> = None; // (start, end)

    for (start, end) in lines {
        let blank = bytes[start..end].iter().all(|&b| b <= 0x20);
        if blank {
            if let Some((s, e)) = current.take() {
                spans.push((s, e));
            }
        } else {
            match &mut current {
                Some((_, e)) => *e = end,
                None => current = Some((start, end)),
            }
        }
    }
    if let Some((s, e)) = current {
        spans.push((s, e));
    }

    spans
        .into_iter()
        .map(|(s, e)| Span::new(s, e - s))
        .filter(|s| s.len > 0)
        .collect()
}

/// Raw `(start, end)` byte ranges for every line, including blank ones,
/// splitting on `\n`, `\r`, and `\r\n`.
fn raw_lines(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut line_start = 0usize;
    let mut i = 0usize;
    let len = bytes.len();

    while i < len {
        match bytes[i] {
            b'\n' => {
                lines.push((line_start, i));
                i += 1;
                line_start = i;
            }
            b'\r' => {
                lines.push((line_start, i));
                i += 1;
                if i < len && bytes[i] == b'\n' {
                    i += 1;
                }
                line_start = i;
            }
            _ => i += 1,
        }
    }
    lines.push((line_start, len));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_paragraph() {
        let text = b"line one\nline two";
        let spans = split_paragraphs(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].slice(text), b"line one\nline two");
    }

    #[test]
    fn blank_line_separates_paragraphs() {
        let text = b"para one\n\npara two";
        let spans = split_paragraphs(text);
        let got: Vec<_> = spans.iter().map(|s| s.slice(text)).collect();
        assert_eq!(got, vec![b"para one".as_slice(), b"para two"]);
    }

    #[test]
    fn multiple_blank_lines_collapse_to_one_break() {
        let text = b"a\n\n\n\nb";
        let spans = split_paragraphs(text);
        let got: Vec<_> = spans.iter().map(|s| s.slice(text)).collect();
        assert_eq!(got, vec![b"a".as_slice(), b"b"]);
    }

    #[test]
    fn leading_and_trailing_blank_lines_are_dropped() {
        let text = b"\n\nhello\n\n";
        let spans = split_paragraphs(text);
        let got: Vec<_> = spans.iter().map(|s| s.slice(text)).collect();
        assert_eq!(got, vec![b"hello".as_slice()]);
    }
}
