use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness markers for external observers.
///
/// `last_sweep_started_at` and `next_sweep_estimated_at` move on every tick,
/// including ticks skipped during cool-down. The completion markers only move
/// when a sweep actually ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunClock {
    pub last_sweep_started_at: Option<DateTime<Utc>>,
    pub next_sweep_estimated_at: Option<DateTime<Utc>>,
    pub last_sweep_completed_at: Option<DateTime<Utc>>,
    pub last_sweep_new_jobs: usize,
    pub sweeps_completed: u64,
    pub sweeps_skipped: u64,
}

impl RunClock {
    pub fn record_start(&mut self, now: DateTime<Utc>, next: DateTime<Utc>) {
        self.last_sweep_started_at = Some(now);
        self.next_sweep_estimated_at = Some(next);
    }

    pub fn record_skip(&mut self) {
        self.sweeps_skipped = self.sweeps_skipped.saturating_add(1);
    }

    pub fn record_completion(&mut self, now: DateTime<Utc>, new_jobs: usize) {
        self.last_sweep_completed_at = Some(now);
        self.last_sweep_new_jobs = new_jobs;
        self.sweeps_completed = self.sweeps_completed.saturating_add(1);
    }
}
