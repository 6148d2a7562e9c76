// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::Span;
use crate::codec::decode_one;

/// CJK/wide sentence terminators that split immediately (no
/// whitespace-lookahead needed): `。？！…؟｡`.
fn is_cjk_terminator(c: char) -> bool {
    matches!(c, '\u{3002}' | '\u{FF1F}' | '\u{FF01}' | '\u{2026}' | '\u{061F}' | '\u{FF61}')
}

fn is_ascii_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Closing quotes/brackets that trail a terminator and are folded into the
/// sentence span (ASCII and common Unicode analogs).
fn is_closer(c: char) -> bool {
    matches!(
        c,
        ')' | ']'
            | '}'
            | '"'
            | '\''
            | '\u{00BB}' // »
            | '\u{2019}' // '
            | '\u{201D}' // "
            | '\u{300D}' // 」
            | '\u{300F}' // 』
            | '\u{3009}' // 〉
            | '\u{300B}' // 》
            | '\u{3011}' // 】
            | '\u{3015}' // 〕
            | '\u{3017}' // 〗
            | '\u{3019}' // 〙
            | '\u{301B}' // 〛
            | '\u{FF09}' // ）
            | '\u{FF3D}' // ］
            | '\u{FF5D}' // ｝
    )
}

fn is_ascii_ws_or_eof(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => (c as u32) <= 0x20 || c.is_whitespace(),
    }
}

const ABBREVIATIONS: &[&str] = &["mr", "ms", "dr", "vs", "jr", "sr", "st", "mt", "mrs", "etc"];

/// Reads the ASCII-letter token immediately preceding byte offset
/// `before` (exclusive), stopping at the first non-letter or after 3
/// letters, whichever comes first walking backwards.
fn preceding_short_token<'a>(bytes: &'a [u8], before: usize) -> Option<&'a [u8]> {
    let mut start = before;
    let mut count = 0;
    while start > 0 && count < 3 {
        let b = bytes[start - 1];
        if b.is_ascii_alphabetic() {
            start -= 1;
            count += 1;
        } else {
            break;
        }
    }
    if count == 0 {
        return None;
    }
    // Reject if a 4th letter immediately precedes (token is longer than 3).
    if start > 0 && bytes[start - 1].is_ascii_alphabetic() {
        return None;
    }
    Some(&bytes[start..before])
}

/// Scans bytes with an ASCII fast path for `.`, `!`, `?`, and non-ASCII
/// lead bytes (spec.md §4.3).
pub fn split_sentences(bytes: &[u8]) -> Vec<Span> {
    let mut spans = Vec::new();
    let len = bytes.len();
    let mut sentence_start = 0usize;
    let mut i = 0usize;

    // Skip leading whitespace; it is not included in any span.
    while sentence_start < len && bytes[sentence_start] <= 0x20 {
        sentence_start += 1;
    }
    i = sentence_start;

    while i < len {
        let (c, width) = decode_one(bytes, i);

        if is_cjk_terminator(c) {
            let mut end = i + width;
            end = consume_closers(bytes, end);
            push_span(&mut spans, bytes, sentence_start, end);
            sentence_start = skip_leading_ws(bytes, end);
            i = sentence_start;
            continue;
        }

        if c.is_ascii() && is_ascii_terminator(c) {
            let mut after = i + width;
            let closer_end = consume_closers(bytes, after);
            let (next_char, _) = if closer_end < len {
                decode_one(bytes, closer_end)
            } else {
                (' ', 0)
            };
            let boundary_ok = is_ascii_ws_or_eof(if closer_end < len { Some(next_char) } else { None });

            let suppressed = c == '.' && is_suppressed_period(bytes, i, closer_end, len);

            if boundary_ok && !suppressed {
                after = closer_end;
                push_span(&mut spans, bytes, sentence_start, after);
                sentence_start = skip_leading_ws(bytes, after);
                i = sentence_start;
                continue;
            }
        }

        i += width;
    }

    if sentence_start < len {
        push_span(&mut spans, bytes, sentence_start, len);
    }

    spans
}

fn is_suppressed_period(bytes: &[u8], dot_pos: usize, after_closers: usize, len: usize) -> bool {
    let token = match preceding_short_token(bytes, dot_pos) {
        Some(t) => t,
        None => return false,
    };

    let is_known_abbrev = {
        let lower: Vec<u8> = token.iter().map(|b| b.to_ascii_lowercase()).collect();
        ABBREVIATIONS.iter().any(|a| a.as_bytes() == lower.as_slice())
    };
    if is_known_abbrev {
        return true;
    }

    if after_closers < len {
        let (next_char, _) = decode_one(bytes, after_closers);
        if next_char.is_ascii_alphabetic() && next_char.is_lowercase() {
            return true;
        }
    }

    false
}

/// Consumes a run of closing quotes/brackets starting at `pos`, returning
/// the byte offset just past the run.
fn consume_closers(bytes: &[u8], mut pos: usize) -> usize {
    let len = bytes.len();
    while pos < len {
        let (c, width) = decode_one(bytes, pos);
        if is_closer(c) {
            pos += width;
        } else {
            break;
        }
    }
    pos
}

fn skip_leading_ws(bytes: &[u8], mut pos: usize) -> usize {
    let len = bytes.len();
    while pos < len && bytes[pos] <= 0x20 {
        pos += 1;
    }
    pos
}

fn push_span(spans: &mut Vec<Span>, bytes: &[u8], start: usize, end: usize) {
    if end > start && !bytes[start..end].iter().all(|&b| b <= 0x20) {
        spans.push(Span::new(start, end - start));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(spans: &[Span], src: &'a [u8]) -> Vec<&'a [u8]> {
        spans.iter().map(|s| s.slice(src)).collect()
    }

    #[test]
    fn splits_simple_sentences() {
        let text = b"Hello world. Bye.";
        let spans = split_sentences(text);
        assert_eq!(texts(&spans, text), vec![b"Hello world.".as_slice(), b"Bye."]);
    }

    #[test]
    fn splits_on_cjk_terminators() {
        let text = "これはテストです。Unicode is ok!".as_bytes();
        let spans = split_sentences(text);
        let got = texts(&spans, text);
        assert_eq!(got, vec!["これはテストです。".as_bytes(), "Unicode is ok!".as_bytes()]);
    }

    #[test]
    fn suppresses_known_abbreviation() {
        let text = b"Mr. Smith went home. Mr. Jones too.";
        let spans = split_sentences(text);
        let got = texts(&spans, text);
        assert_eq!(
            got,
            vec![b"Mr. Smith went home.".as_slice(), b"Mr. Jones too."]
        );
    }

    #[test]
    fn does_not_suppress_non_abbreviation_capital_follow() {
        let text = b"End. Next starts here.";
        let spans = split_sentences(text);
        let got = texts(&spans, text);
        assert_eq!(got, vec![b"End.".as_slice(), b"Next starts here."]);
    }

    #[test]
    fn single_letter_sentences_split_normally() {
        let text = b"A. A. A.";
        let spans = split_sentences(text);
        assert_eq!(texts(&spans, text), vec![b"A.".as_slice(), b"A.", b"A."]);
    }

    #[test]
    fn trailing_closers_stay_with_sentence() {
        let text = br#"He said "stop." Then left."#;
        let spans = split_sentences(text);
        let got = texts(&spans, text);
        assert_eq!(got, vec![br#"He said "stop.""#.as_slice(), b"Then left."]);
    }

    #[test]
    fn leading_whitespace_between_sentences_is_dropped() {
        let text = b"One.   Two.";
        let spans = split_sentences(text);
        let got = texts(&spans, text);
        assert_eq!(got, vec![b"One.".as_slice(), b"Two."]);
    }

    #[test]
    fn lowercase_follow_suppresses_short_token() {
        let text = b"See cf. the appendix.";
        let spans = split_sentences(text);
        let got = texts(&spans, text);
        assert_eq!(got, vec![b"See cf. the appendix.".as_slice()]);
    }
}
