// Copyright (c) 2024-present, dedup-tree
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Throttled stderr progress bar (spec.md §4.11 / §5).
//!
//! Rendering is serialized behind a single lock; the lock also guards the
//! "last rendered at" timestamp so the throttle check and the write can't
//! race between workers.

use std::io::Write;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::PROGRESS_THROTTLE_MS;

const BAR_WIDTH: usize = 30;

struct State {
    last_update: Option<Instant>,
}

/// A shared, lock-guarded renderer. One instance per run; every worker
/// calls [`Progress::update`] after finishing a file.
pub struct Progress {
    state: Mutex<State>,
    start: Instant,
    total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(State { last_update: None }),
            start: Instant::now(),
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Renders the bar for `done`/`total` files and `bytes_done` bytes,
    /// unless throttled. The first call (`done == 0`) and the final call
    /// (`done == total`) always render.
    pub fn update(&self, done: usize, bytes_done: u64) {
        let mut state = self.state.lock();
        let now = Instant::now();
        let is_edge = done == 0 || done == self.total;

        if !is_edge {
            if let Some(last) = state.last_update {
                if now.duration_since(last) < Duration::from_millis(PROGRESS_THROTTLE_MS) {
                    return;
                }
            }
        }
        state.last_update = Some(now);
        drop(state);

        self.render(done, bytes_done, now);
    }

    fn render(&self, done: usize, bytes_done: u64, now: Instant) {
        let elapsed = now.duration_since(self.start).as_secs_f64().max(0.0001);
        let rate = done as f64 / elapsed;
        let mb_done = bytes_done as f64 / (1024.0 * 1024.0);
        let mb_rate = mb_done / elapsed;
        let pct = if self.total > 0 {
            done as f64 * 100.0 / self.total as f64
        } else {
            0.0
        };
        let filled = if self.total > 0 {
            ((BAR_WIDTH as f64) * done as f64 / self.total as f64) as usize
        } else {
            0
        }
        .min(BAR_WIDTH);
        let eta_minutes = if self.total > done && rate > 0.0001 {
            (self.total - done) as f64 / rate / 60.0
        } else {
            0.0
        };

        let mut bar = String::with_capacity(BAR_WIDTH);
        for i in 0..BAR_WIDTH {
            bar.push(if i < filled { '#' } else { '-' });
        }

        let mut stderr = std::io::stderr();
        let _ = write!(
            stderr,
            "\r[{bar}] {done}/{total} {pct:5.1}% {rate:.2} docs/s {mb_rate:.2} MB/s ETA {eta_minutes:.1}m",
            total = self.total,
        );
        let _ = stderr.flush();
    }

    /// Emits the trailing newline once a run is finished, so the final
    /// bar doesn't get overwritten by the next line of output.
    pub fn finish(&self) {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_and_last_update_never_throttle() {
        let progress = Progress::new(10);
        progress.update(0, 0);
        progress.update(10, 1000);
        let state = progress.state.lock();
        assert!(state.last_update.is_some());
    }

    #[test]
    fn zero_total_does_not_panic() {
        let progress = Progress::new(0);
        progress.update(0, 0);
    }
}
