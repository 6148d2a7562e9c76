// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! CLI / mode dispatch (spec.md §4.12 / C12).
//!
//! The binary exposes three modes, selected by `argv[1]` exactly as the
//! reference implementation's `main` does: default (dedup), `--verify`,
//! `--search`. Each mode gets its own `clap` derive struct rather than a
//! `clap` subcommand, so `--verify`/`--search` can sit in the position a
//! positional argument would otherwise occupy.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_MAX_COMPARE_LENGTH;
use crate::error::{Error, Result};
use crate::split::DedupMode;

/// Deduplicates a corpus of text files (spec.md §6).
#[derive(Parser, Debug)]
#[command(name = "dedup-tree", version, about)]
pub struct DedupArgs {
    /// Directory to read input files from.
    pub input_dir: PathBuf,

    /// Directory to write deduplicated files to (created if missing).
    pub output_dir: PathBuf,

    /// Glob mask matched against file names in `input_dir`.
    #[arg(default_value = "*.txt")]
    pub mask: String,

    /// Granularity at which duplicates are compared.
    #[arg(long = "dedup-mode", default_value = "sentence")]
    pub dedup_mode: DedupMode,

    /// Append every duplicate unit to `<output_dir>/duplicates.txt`.
    #[arg(long = "write-duplicates")]
    pub write_duplicates: bool,

    /// Build (and self-verify) a Block Tree over each file's deduped output.
    #[arg(long = "build-block-tree")]
    pub build_block_tree: bool,

    /// Clamp normalized units to this many bytes before hashing (`0` = unlimited).
    #[arg(long = "max-length", value_parser = parse_size_flag, default_value_t = DEFAULT_MAX_COMPARE_LENGTH)]
    pub max_length: usize,
}

/// Re-reads an already-deduped directory and reports residual duplicates.
#[derive(Parser, Debug)]
#[command(name = "dedup-tree --verify", version, about)]
pub struct VerifyArgs {
    pub input_dir: PathBuf,

    #[arg(default_value = "*.txt")]
    pub mask: String,

    #[arg(long = "dedup-mode", default_value = "sentence")]
    pub dedup_mode: DedupMode,

    #[arg(long = "max-length", value_parser = parse_size_flag, default_value_t = DEFAULT_MAX_COMPARE_LENGTH)]
    pub max_length: usize,
}

/// Starts an interactive substring-search REPL over one Block Tree built
/// across every matched file.
#[derive(Parser, Debug)]
#[command(name = "dedup-tree --search", version, about)]
pub struct SearchArgs {
    pub input_dir: PathBuf,

    #[arg(default_value = "*.txt")]
    pub mask: String,

    /// Maximum number of hits printed per query.
    #[arg(long = "limit", default_value_t = 20)]
    pub limit: usize,
}

fn parse_size_flag(s: &str) -> std::result::Result<usize, String> {
    parse_size::parse_size(s)
        .map(|n| n as usize)
        .map_err(|e| format!("invalid size '{s}': {e}"))
}

pub enum Mode {
    Dedup(DedupArgs),
    Verify(VerifyArgs),
    Search(SearchArgs),
}

/// Dispatches on `args[1]` (`--verify`/`--search`) exactly as the
/// reference `main()` does, then hands the remainder to the matching
/// `clap` parser. `args[0]` is the program name, kept so `--help` output
/// names the binary correctly.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Mode> {
    let args: Vec<String> = args.into_iter().collect();
    let prog = args.first().cloned().unwrap_or_else(|| "dedup-tree".to_string());

    match args.get(1).map(String::as_str) {
        Some("--search") => {
            let rest = std::iter::once(prog).chain(args[2..].iter().cloned());
            SearchArgs::try_parse_from(rest)
                .map(Mode::Search)
                .map_err(|e| Error::Argument(e.to_string()))
        }
        Some("--verify") => {
            let rest = std::iter::once(prog).chain(args[2..].iter().cloned());
            VerifyArgs::try_parse_from(rest)
                .map(Mode::Verify)
                .map_err(|e| Error::Argument(e.to_string()))
        }
        _ => DedupArgs::try_parse_from(args)
            .map(Mode::Dedup)
            .map_err(|e| Error::Argument(e.to_string())),
    }
}

impl clap::ValueEnum for DedupMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Sentence, Self::Line, Self::Paragraph, Self::Document]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Sentence => clap::builder::PossibleValue::new("sentence"),
            Self::Line => clap::builder::PossibleValue::new("line"),
            Self::Paragraph => clap::builder::PossibleValue::new("paragraph"),
            Self::Document => clap::builder::PossibleValue::new("document"),
        })
    }
}

impl std::fmt::Display for DedupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sentence => "sentence",
            Self::Line => "line",
            Self::Paragraph => "paragraph",
            Self::Document => "document",
        };
        write!(f, "{s}")
    }
}
