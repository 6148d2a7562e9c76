// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::fmt;
use std::path::PathBuf;

/// Crate-wide result alias, mirroring the teacher's `crate::Result<T>` pattern.
pub type Result<T> = std::result::Result<T, Error>;

/// The five error kinds spec.md §7 recognizes.
#[derive(Debug)]
pub enum Error {
    /// Open/read/write/seek/stat failure on an input or output path.
    Io {
        path: Option<PathBuf>,
        source: std::io::Error,
    },

    /// A file decoded to zero code points, or contained only invalid bytes.
    Decode { path: PathBuf },

    /// Arena growth, table growth, or scratch-buffer growth failed.
    Allocation { what: &'static str },

    /// Lock/condvar creation or thread spawn failed.
    Concurrency { what: &'static str },

    /// Unknown flag, missing positional, unparseable number, unknown mode.
    Argument(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => match path {
                Some(p) => write!(f, "I/O error on {}: {source}", p.display()),
                None => write!(f, "I/O error: {source}"),
            },
            Self::Decode { path } => write!(f, "failed to decode {} as text", path.display()),
            Self::Allocation { what } => write!(f, "allocation failure: {what}"),
            Self::Concurrency { what } => write!(f, "concurrency setup failure: {what}"),
            Self::Argument(msg) => write!(f, "argument error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }
}
