//! Fixed-interval job loop.
//!
//! The first run starts immediately. Later runs are aligned to
//! `start + k * interval`; a run that overshoots its slot makes the next one
//! start right away instead of queueing a backlog.

use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
}

impl Schedule {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn every_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Run `job` until `max_runs` runs have completed (forever for `None`).
    ///
    /// The job receives the zero-based run number. A failed run is logged and
    /// the loop continues. Returns the number of runs performed.
    pub fn run<E, F>(&self, max_runs: Option<u64>, mut job: F) -> u64
    where
        E: Display,
        F: FnMut(u64) -> Result<(), E>,
    {
        let start = Instant::now();
        let mut runs = 0u64;

        loop {
            if let Err(e) = job(runs) {
                warn!(run = runs, error = %e, "scheduled run failed");
            }
            runs += 1;

            if max_runs.is_some_and(|max| runs >= max) {
                return runs;
            }

            let wait = self.delay_before(runs, start.elapsed());
            info!(next_in_secs = wait.as_secs(), "waiting for next run");
            std::thread::sleep(wait);
        }
    }

    /// Time left until slot `run` given the elapsed time since the first run.
    fn delay_before(&self, run: u64, elapsed: Duration) -> Duration {
        let slot = self.interval.saturating_mul(u32::try_from(run).unwrap_or(u32::MAX));
        slot.saturating_sub(elapsed)
    }
}
