// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! File pipeline: batch files, dispatch N workers, maintain atomic stats
//! (spec.md §4.11 / C11).

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::codec::decode_buffer;
use crate::config::{DUPLICATES_FILENAME, FILE_BATCH_SIZE, GLOBAL_SEEN_INITIAL_CAP, LOCAL_SEEN_INITIAL_CAP};
use crate::dedup::DedupSet;
use crate::discovery::DiscoveredFile;
use crate::error::{Error, Result};
use crate::fingerprint::fingerprint;
use crate::normalize::normalize;
use crate::pool::resolve_thread_count;
use crate::progress::Progress;
use crate::split::DedupMode;

/// Atomic counters accumulated across every worker and every batch
/// (spec.md §3 "BatchStats").
#[derive(Default)]
pub struct PipelineStats {
    pub files_written: AtomicUsize,
    pub files_empty: AtomicUsize,
    pub unique_units: AtomicUsize,
    pub duplicate_units: AtomicUsize,
    pub errors: AtomicUsize,
    pub processed: AtomicUsize,
    pub bytes_processed: AtomicUsize,
}

impl PipelineStats {
    fn add(counter: &AtomicUsize, n: usize) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn total_units(&self) -> usize {
        self.unique_units.load(Ordering::Relaxed) + self.duplicate_units.load(Ordering::Relaxed)
    }
}

/// Per-run configuration a dedup pass needs (spec.md §4.12/§6).
pub struct PipelineConfig {
    pub mode: DedupMode,
    pub max_compare_len: Option<usize>,
    pub write_duplicates: bool,
    pub build_block_tree: bool,
}

/// Serializes writes to `duplicates.txt` so lines interleave atomically
/// (spec.md §4.11 "Duplicates stream").
pub struct DuplicatesSink {
    file: Mutex<std::fs::File>,
}

impl DuplicatesSink {
    pub fn create(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(DUPLICATES_FILENAME);
        let file = std::fs::File::create(&path).map_err(|e| Error::io(path, e))?;
        Ok(Self { file: Mutex::new(file) })
    }

    fn write_unit(&self, bytes: &[u8]) -> std::io::Result<()> {
        use std::io::Write;
        let mut file = self.file.lock();
        file.write_all(bytes)?;
        file.write_all(b"\n")
    }
}

/// Runs the whole corpus: chunks `files` into batches of at most
/// [`FILE_BATCH_SIZE`] and dispatches each batch across a worker pool,
/// sequentially batch-to-batch (spec.md §5 "Across batches: sequential").
///
/// Returns `Ok(stats)` unless a batch failed fatally (dedup-function
/// failure, per spec.md §7); per-file I/O/allocation errors are recorded
/// in `stats.errors` and do not abort the run.
pub fn run(
    files: &[DiscoveredFile],
    output_dir: &Path,
    config: &PipelineConfig,
    global: &DedupSet,
    duplicates: Option<&DuplicatesSink>,
) -> Result<PipelineStats> {
    let stats = PipelineStats::default();
    let progress = Progress::new(files.len());
    progress.update(0, 0);

    let tree_lock: Mutex<()> = Mutex::new(());

    for batch in files.chunks(FILE_BATCH_SIZE) {
        process_batch(batch, output_dir, config, global, duplicates, &stats, &progress, &tree_lock)?;
    }

    progress.finish();
    Ok(stats)
}

/// Builds the global dedup set sized for an expected corpus, matching
/// `sentence_set_init(&seen, 1024)` in the reference implementation.
pub fn build_global_set() -> DedupSet {
    DedupSet::init(GLOBAL_SEEN_INITIAL_CAP)
}

fn process_batch(
    batch: &[DiscoveredFile],
    output_dir: &Path,
    config: &PipelineConfig,
    global: &DedupSet,
    duplicates: Option<&DuplicatesSink>,
    stats: &PipelineStats,
    progress: &Progress,
    tree_lock: &Mutex<()>,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let worker_count = resolve_thread_count("DEDUP_THREADS").min(batch.len()).max(1);
    let next_index = AtomicUsize::new(0);
    let total_files = progress_total(progress);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| {
                worker_loop(
                    batch,
                    output_dir,
                    config,
                    global,
                    duplicates,
                    stats,
                    progress,
                    tree_lock,
                    &next_index,
                    total_files,
                );
            });
        }
    });

    Ok(())
}

fn progress_total(progress: &Progress) -> usize {
    // Progress owns its own total; workers only ever report counters
    // relative to the run, so pipeline-internal code never needs to read
    // it back except to pass through. Kept as a tiny accessor so the
    // batch loop doesn't need a second copy of `files.len()`.
    progress.total()
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    batch: &[DiscoveredFile],
    output_dir: &Path,
    config: &PipelineConfig,
    global: &DedupSet,
    duplicates: Option<&DuplicatesSink>,
    stats: &PipelineStats,
    progress: &Progress,
    tree_lock: &Mutex<()>,
    next_index: &AtomicUsize,
    total_files: usize,
) {
    // Reusable scratch: a growable output buffer, reused across files
    // this worker claims (spec.md §4.11).
    let mut out_buf: Vec<u8> = Vec::new();
    // Thread-local intra-file dedup filter: catches repeats within one
    // file before they ever touch the global (and therefore lock-bearing)
    // set.
    let mut local_seen = crate::dedup::Shard::new(LOCAL_SEEN_INITIAL_CAP);

    loop {
        let idx = next_index.fetch_add(1, Ordering::Relaxed);
        if idx >= batch.len() {
            break;
        }
        let item = &batch[idx];

        let outcome = process_file(item, output_dir, config, global, duplicates, &mut out_buf, &mut local_seen, tree_lock);

        local_seen.clear();

        let processed_bytes = outcome.bytes_processed;
        match outcome.result {
            Ok(written) => {
                PipelineStats::add(&stats.unique_units, outcome.unique);
                PipelineStats::add(&stats.duplicate_units, outcome.duplicate);
                if written {
                    stats.files_written.fetch_add(1, Ordering::Relaxed);
                } else {
                    stats.files_empty.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(err) => {
                log::warn!("failed to process {}: {err}", item.name);
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        PipelineStats::add(&stats.bytes_processed, processed_bytes);
        let done = stats.processed.fetch_add(1, Ordering::Relaxed) + 1;
        progress.update(done.min(total_files), stats.bytes_processed.load(Ordering::Relaxed) as u64);
    }
}

struct FileOutcome {
    result: Result<bool>,
    unique: usize,
    duplicate: usize,
    bytes_processed: usize,
}

#[allow(clippy::too_many_arguments)]
fn process_file(
    item: &DiscoveredFile,
    output_dir: &Path,
    config: &PipelineConfig,
    global: &DedupSet,
    duplicates: Option<&DuplicatesSink>,
    out_buf: &mut Vec<u8>,
    local_seen: &mut crate::dedup::Shard,
    tree_lock: &Mutex<()>,
) -> FileOutcome {
    let raw = match std::fs::read(&item.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return FileOutcome {
                result: Err(Error::io(item.path.clone(), e)),
                unique: 0,
                duplicate: 0,
                bytes_processed: 0,
            }
        }
    };
    let byte_len = raw.len();

    global.reserve_for_bytes(byte_len);

    out_buf.clear();
    out_buf.reserve(byte_len.saturating_mul(2) + 1);

    let mut unique = 0usize;
    let mut duplicate = 0usize;

    let spans = config.mode.split(&raw);
    for span in &spans {
        let norm = normalize(span.slice(&raw), config.max_compare_len);
        if norm.is_empty() {
            continue;
        }

        let hash = fingerprint(&norm);

        if !local_seen.insert_hashed(hash, &norm) {
            duplicate += 1;
            if let Some(sink) = duplicates {
                if let Err(e) = sink.write_unit(&norm) {
                    return FileOutcome {
                        result: Err(Error::io(output_dir.join(crate::config::DUPLICATES_FILENAME), e)),
                        unique,
                        duplicate,
                        bytes_processed: byte_len,
                    };
                }
            }
            continue;
        }

        if global.insert_hashed(hash, &norm) {
            unique += 1;
            if !out_buf.is_empty() {
                out_buf.push(b'\n');
            }
            out_buf.extend_from_slice(&norm);
        } else {
            duplicate += 1;
            if let Some(sink) = duplicates {
                if let Err(e) = sink.write_unit(&norm) {
                    return FileOutcome {
                        result: Err(Error::io(output_dir.join(crate::config::DUPLICATES_FILENAME), e)),
                        unique,
                        duplicate,
                        bytes_processed: byte_len,
                    };
                }
            }
        }
    }

    if out_buf.is_empty() {
        return FileOutcome {
            result: Ok(false),
            unique,
            duplicate,
            bytes_processed: byte_len,
        };
    }

    let output_path = output_dir.join(&item.name);
    if let Err(e) = crate::file::rewrite_atomic(&output_path, out_buf) {
        return FileOutcome {
            result: Err(Error::io(output_path, e)),
            unique,
            duplicate,
            bytes_processed: byte_len,
        };
    }

    if config.build_block_tree {
        let _guard = tree_lock.lock();
        if let Err(e) = verify_block_tree(&item.name, out_buf) {
            log::warn!("block tree verification failed for {}: {e}", item.name);
        }
    }

    FileOutcome {
        result: Ok(true),
        unique,
        duplicate,
        bytes_processed: byte_len,
    }
}

/// Builds a Block Tree over the deduped output and checks every position
/// resolves back to the source text (spec.md §4.11 "Optionally run the
/// Block Tree ... for verification").
fn verify_block_tree(label: &str, deduped: &[u8]) -> Result<()> {
    let (text, _invalid) = decode_buffer(deduped);
    if text.is_empty() {
        return Ok(());
    }

    let tree = crate::blocktree::build_block_tree(&text, crate::blocktree::BlockTreeArity::default());

    for i in 0..text.len() {
        let got = crate::blocktree::access(&tree.nodes, tree.root, i, &text);
        if got != text[i] {
            return Err(Error::Decode {
                path: std::path::PathBuf::from(label),
            });
        }
    }
    Ok(())
}
