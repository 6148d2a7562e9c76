// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Directory enumeration and glob filtering (spec.md §1: "modeled as
//! trivial adapters"). Not part of the spec's covered core, but still
//! needed for a working binary; grounded on the wider example pack's
//! `walkdir` + `glob` pairing (see `SPEC_FULL.md` §E).

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One input file discovered under `input_dir` matching `mask`.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// File name relative to `input_dir` (used as the output file name
    /// too; spec.md §6 writes `<output_dir>/<name>`).
    pub name: String,
    pub path: PathBuf,
}

/// Lists the regular files directly under `input_dir` (non-recursive,
/// matching the reference implementation's single `readdir` pass) whose
/// file name matches the glob `mask`.
pub fn discover(input_dir: &Path, mask: &str) -> Result<Vec<DiscoveredFile>> {
    let pattern = Pattern::new(mask).map_err(|e| Error::Argument(format!("invalid glob '{mask}': {e}")))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let io_err = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            Error::io(input_dir.to_path_buf(), io_err)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.matches(&name) {
            continue;
        }
        files.push(DiscoveredFile {
            name,
            path: entry.path().to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Ensures `dir` exists (creating it when `create` is set), mirroring
/// `ensure_directory` in the reference implementation.
pub fn ensure_directory(dir: &Path, create: bool) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if create {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir.to_path_buf(), e))?;
        return Ok(());
    }
    Err(Error::io(
        dir.to_path_buf(),
        std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
    ))
}
