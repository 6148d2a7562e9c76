// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `--verify` mode: re-reads an already-deduped directory and reports any
//! residual duplicates (spec.md §6).
//!
//! Unlike the dedup pipeline, verification is sequential and uses a
//! single global [`DedupSet`] shared across every file in source order —
//! the reference implementation's `run_verify` never spawns workers,
//! since the point is an authoritative, order-independent recount rather
//! than throughput.

use std::path::Path;

use crate::dedup::DedupSet;
use crate::discovery::discover;
use crate::error::Result;
use crate::fingerprint::fingerprint;
use crate::normalize::normalize;
use crate::progress::Progress;
use crate::split::DedupMode;

pub struct VerifyStats {
    pub matched: usize,
    pub files_checked: usize,
    pub units_checked: usize,
    pub duplicate_units: usize,
    pub errors: usize,
}

impl VerifyStats {
    /// Mirrors `run_verify`'s exit code: clean only if every file was
    /// read successfully and no residual duplicate was found.
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.duplicate_units == 0
    }
}

pub fn run_verify(dir: &Path, mask: &str, mode: DedupMode, max_compare_len: Option<usize>) -> Result<VerifyStats> {
    let files = discover(dir, mask)?;
    let matched = files.len();

    let seen = DedupSet::init(crate::config::GLOBAL_SEEN_INITIAL_CAP);
    let progress = Progress::new(matched);
    progress.update(0, 0);

    let mut files_checked = 0usize;
    let mut units_checked = 0usize;
    let mut duplicate_units = 0usize;
    let mut errors = 0usize;
    let mut bytes_processed = 0u64;

    for (i, file) in files.iter().enumerate() {
        let raw = match std::fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to read {}: {e}", file.name);
                errors += 1;
                progress.update(i + 1, bytes_processed);
                continue;
            }
        };

        seen.reserve_for_bytes(raw.len());
        bytes_processed += raw.len() as u64;

        for span in mode.split(&raw) {
            let norm = normalize(span.slice(&raw), max_compare_len);
            if norm.is_empty() {
                continue;
            }
            units_checked += 1;
            let hash = fingerprint(&norm);
            if !seen.insert_hashed(hash, &norm) {
                duplicate_units += 1;
            }
        }

        files_checked += 1;
        progress.update(i + 1, bytes_processed);
    }

    progress.finish();

    Ok(VerifyStats {
        matched,
        files_checked,
        units_checked,
        duplicate_units,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_directory_reports_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Hello world.\nBye.").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Another file.").unwrap();

        let stats = run_verify(dir.path(), "*.txt", DedupMode::Sentence, None).unwrap();
        assert!(stats.is_clean());
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.units_checked, 3);
    }

    #[test]
    fn residual_duplicate_across_files_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Same sentence.").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Same sentence.").unwrap();

        let stats = run_verify(dir.path(), "*.txt", DedupMode::Sentence, None).unwrap();
        assert!(!stats.is_clean());
        assert_eq!(stats.duplicate_units, 1);
    }
}
