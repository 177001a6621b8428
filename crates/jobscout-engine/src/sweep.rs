//! The sweep scheduler: one pass over every target location per tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobscout_client::{ClientError, JobSource};
use jobscout_core::TargetLocation;
use rand::Rng;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cooldown::SuspendReason;
use crate::job_store::SweepBatch;
use crate::notifier::{Notifier, NotifyError};
use crate::request_log::RequestOutcome;
use crate::state::{EngineState, PendingAlert};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Cool-down was in force; no upstream call was made.
    Skipped { resume_at: Option<DateTime<Utc>> },
    Completed(SweepReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    /// Locations an upstream call was made for.
    pub attempted: usize,
    pub succeeded: usize,
    pub new_jobs: usize,
    /// Whether this sweep entered cool-down and stopped early.
    pub suspended: bool,
    /// Whether the batch reached disk. `false` means it is held in memory.
    pub persisted: bool,
}

enum LocationStep {
    /// The location was handled; `called` tells whether an upstream call
    /// was made (and so whether to throttle before the next one).
    Continue { called: bool },
    /// Cool-down was entered; no further calls this sweep.
    Stop,
}

pub struct Sweeper<S, N> {
    state: Arc<EngineState>,
    source: S,
    notifier: Arc<N>,
}

impl<S: JobSource, N: Notifier + 'static> Sweeper<S, N> {
    pub fn new(state: Arc<EngineState>, source: S, notifier: N) -> Self {
        Self {
            state,
            source,
            notifier: Arc::new(notifier),
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    /// Runs one tick: heartbeat, pending flush retry, resume gate, then
    /// either a skip or a full pass over the target locations.
    pub async fn run_sweep(&self) -> SweepOutcome {
        let state = &self.state;
        let started = Utc::now();
        state.record_tick_start(started).await;

        if let Err(e) = state.flush_jobs_if_dirty().await {
            tracing::error!(error = %e, "persist: held jobs still not flushed");
        }

        state.check_resume_at_tick(started).await;
        if state.is_suspended().await {
            self.dispatch_pending_alert().await;
            state.record_skip().await;
            state.flush_observability().await;
            let resume_at = state.cooldown().await.resume_at();
            tracing::info!(resume_at = ?resume_at, "sweep: skipped, cool-down in force");
            return SweepOutcome::Skipped { resume_at };
        }

        let mut batch = SweepBatch::new(started);
        let sweep_id = batch.sweep_id();
        let mut report = SweepReport {
            sweep_id,
            attempted: 0,
            succeeded: 0,
            new_jobs: 0,
            suspended: false,
            persisted: true,
        };
        tracing::info!(%sweep_id, targets = state.locations().len(), "sweep: started");

        let mut throttle = false;
        for location in state.locations() {
            if throttle {
                self.jitter().await;
            }
            match self.poll_location(location, &mut batch, &mut report).await {
                LocationStep::Continue { called } => throttle = called,
                LocationStep::Stop => {
                    report.suspended = true;
                    break;
                }
            }
        }

        let found = batch.len();
        match state.commit_batch(batch).await {
            Ok(inserted) => report.new_jobs = inserted,
            Err(e) => {
                report.new_jobs = found;
                report.persisted = false;
                tracing::error!(error = %e, held = found, "sweep: batch held in memory, flush retried next tick");
            }
        }

        state.record_completion(Utc::now(), report.new_jobs).await;
        self.dispatch_pending_alert().await;
        state.flush_observability().await;

        tracing::info!(
            %sweep_id,
            attempted = report.attempted,
            succeeded = report.succeeded,
            new = report.new_jobs,
            suspended = report.suspended,
            "sweep: finished"
        );
        SweepOutcome::Completed(report)
    }

    async fn poll_location(
        &self,
        location: &TargetLocation,
        batch: &mut SweepBatch,
        report: &mut SweepReport,
    ) -> LocationStep {
        let state = &self.state;
        let name = location.name.as_str();

        let Ok(credential) = state.credential().current().await else {
            tracing::warn!(location = name, "sweep: no credential, location skipped");
            state
                .record_outcome(name, RequestOutcome::NoCredential, None)
                .await;
            if state.settings().suspend_on_missing_credential {
                state.suspend(SuspendReason::MissingCredential, None).await;
                return LocationStep::Stop;
            }
            return LocationStep::Continue { called: false };
        };

        report.attempted += 1;
        match self.source.search(credential.expose(), location).await {
            Ok(cards) => {
                let returned = cards.len();
                let added = state.collect_new(batch, cards).await;
                report.succeeded += 1;
                tracing::debug!(location = name, returned, new = added, "sweep: location ok");
                state
                    .record_outcome(name, RequestOutcome::Ok { jobs: returned }, None)
                    .await;
                LocationStep::Continue { called: true }
            }
            Err(e) if e.is_auth_failure() => {
                let status = e.status().unwrap_or_default();
                tracing::warn!(location = name, status, error = %e, "sweep: credential rejected");
                state
                    .record_outcome(
                        name,
                        RequestOutcome::AuthError { status },
                        Some(e.to_string()),
                    )
                    .await;
                state
                    .suspend(SuspendReason::AuthFailure, Some(credential.fingerprint()))
                    .await;
                LocationStep::Stop
            }
            Err(e) => {
                let outcome = match (&e, e.status()) {
                    (ClientError::Transport(_), _) => RequestOutcome::TransportError,
                    (_, Some(status)) => RequestOutcome::HttpError { status },
                    (_, None) => RequestOutcome::ApiError,
                };
                tracing::warn!(location = name, error = %e, "sweep: location failed");
                state
                    .record_outcome(name, outcome, Some(e.to_string()))
                    .await;
                LocationStep::Continue { called: true }
            }
        }
    }

    async fn jitter(&self) {
        let settings = self.state.settings();
        let (min, max) = (settings.jitter_min, settings.jitter_max);
        if max.is_zero() {
            return;
        }
        let delay = if max <= min {
            min
        } else {
            let ms = rand::rng().random_range(min.as_millis()..=max.as_millis());
            Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX))
        };
        tokio::time::sleep(delay).await;
    }

    /// Claims the episode's alert, if one is owed, and hands delivery to its
    /// own task so a slow or hung transport never holds up a tick.
    async fn dispatch_pending_alert(&self) {
        let Some(alert) = self.state.take_pending_alert().await else {
            return;
        };
        let state = Arc::clone(&self.state);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move { deliver_alert(&state, notifier.as_ref(), alert).await });
    }
}

/// Delivers one alert, bounded by the alert timeout. Failures are recorded
/// under the system target, never raised.
async fn deliver_alert<N: Notifier>(state: &EngineState, notifier: &N, alert: PendingAlert) {
    let timeout = state.settings().alert_timeout;
    let delivery = tokio::time::timeout(timeout, notifier.notify(&alert.subject, &alert.body))
        .await
        .unwrap_or(Err(NotifyError::Timeout(timeout)));

    match delivery {
        Ok(()) => tracing::info!(subject = %alert.subject, "alert: operator notified"),
        Err(e) => {
            tracing::error!(error = %e, "alert: delivery failed");
            state.record_alert_failure(e.to_string()).await;
        }
    }
}

impl<S, N> Sweeper<S, N>
where
    S: JobSource + 'static,
    N: Notifier + 'static,
{
    /// Runs sweeps one interval apart until `shutdown` flips to `true`.
    ///
    /// Each sweep runs in its own task so a panic inside it is logged and
    /// the loop carries on. While suspended the wait is cut short when the
    /// resume checker ends the episode; otherwise ticks stay one full
    /// interval apart.
    pub async fn run_forever(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval = self.state.settings().sweep_interval;
        while !*shutdown.borrow() {
            let sweeper = Arc::clone(&self);
            if let Err(e) = tokio::spawn(async move { sweeper.run_sweep().await }).await {
                tracing::error!(error = %e, "sweep: task aborted");
            }

            let suspended = self.state.is_suspended().await;
            let signalled = tokio::select! {
                () = tokio::time::sleep(interval) => None,
                () = self.state.resumed().notified(), if suspended => {
                    tracing::info!("sweep: woken by resume");
                    None
                }
                changed = shutdown.changed() => Some(changed.is_ok()),
            };
            // A dropped sender counts as shutdown.
            if signalled == Some(false) || *shutdown.borrow() {
                break;
            }
        }

        self.state.flush_all().await;
        tracing::info!("sweep: loop stopped");
    }
}
