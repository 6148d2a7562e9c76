// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Binary entry point: logging setup, mode dispatch, summary line, exit
//! code (spec.md §7/§12).

use std::process::ExitCode;
use std::time::Instant;

use humansize::{format_size, BINARY};

use dedup_tree::cli::{self, Mode};
use dedup_tree::discovery::{discover, ensure_directory};
use dedup_tree::pipeline::{self, DuplicatesSink, PipelineConfig};
use dedup_tree::{search, verify};

/// Initializes `tracing-subscriber` from `RUST_LOG` (default `info`) and
/// bridges `log` macros (used by the library crate) into it via
/// `tracing-log`, so a single `RUST_LOG` filter governs both.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).without_time().init();

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("warning: failed to bridge log -> tracing: {e}");
    }
}

/// `0` means "unlimited" on the CLI; the library represents that as `None`.
fn max_len(n: usize) -> Option<usize> {
    if n == 0 {
        None
    } else {
        Some(n)
    }
}

fn main() -> ExitCode {
    init_logging();

    let mode = match cli::parse_args(std::env::args()) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match mode {
        Mode::Dedup(args) => run_dedup(args),
        Mode::Verify(args) => run_verify(args),
        Mode::Search(args) => run_search(args),
    }
}

fn run_dedup(args: cli::DedupArgs) -> ExitCode {
    let start = Instant::now();

    if let Err(e) = ensure_directory(&args.output_dir, true) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let files = match discover(&args.input_dir, &args.mask) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let duplicates = if args.write_duplicates {
        match DuplicatesSink::create(&args.output_dir) {
            Ok(sink) => Some(sink),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let global = pipeline::build_global_set();
    let config = PipelineConfig {
        mode: args.dedup_mode,
        max_compare_len: max_len(args.max_length),
        write_duplicates: args.write_duplicates,
        build_block_tree: args.build_block_tree,
    };

    let stats = match pipeline::run(&files, &args.output_dir, &config, &global, duplicates.as_ref()) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let elapsed_min = start.elapsed().as_secs_f64() / 60.0;
    let unique = stats.unique_units.load(std::sync::atomic::Ordering::Relaxed);
    let duplicate = stats.duplicate_units.load(std::sync::atomic::Ordering::Relaxed);
    let total = stats.total_units().max(1);
    let dup_pct = 100.0 * duplicate as f64 / total as f64;
    let errors = stats.errors.load(std::sync::atomic::Ordering::Relaxed);
    let bytes_processed = stats.bytes_processed.load(std::sync::atomic::Ordering::Relaxed) as u64;

    println!(
        "Dedup summary ({}-level): matched {} file(s), wrote {}, empty {}, unique unit(s) {}, duplicate unit(s) {} ({:.2}%), errors {}, read {}, elapsed {:.2} min",
        args.dedup_mode,
        files.len(),
        stats.files_written.load(std::sync::atomic::Ordering::Relaxed),
        stats.files_empty.load(std::sync::atomic::Ordering::Relaxed),
        unique,
        duplicate,
        dup_pct,
        errors,
        format_size(bytes_processed, BINARY),
        elapsed_min,
    );

    if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_verify(args: cli::VerifyArgs) -> ExitCode {
    let start = Instant::now();

    let stats = match verify::run_verify(&args.input_dir, &args.mask, args.dedup_mode, max_len(args.max_length)) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let elapsed_min = start.elapsed().as_secs_f64() / 60.0;

    println!(
        "Verify summary ({}-level): matched {} file(s), checked {}, unit(s) {}, residual duplicate(s) {}, errors {}, elapsed {:.2} min",
        args.dedup_mode, stats.matched, stats.files_checked, stats.units_checked, stats.duplicate_units, stats.errors, elapsed_min,
    );

    if stats.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_search(args: cli::SearchArgs) -> ExitCode {
    match search::run_search(&args.input_dir, &args.mask, args.limit) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
