//! Engine-owned state and its read-only snapshot interface.
//!
//! [`EngineState`] is shared behind an `Arc` by the sweep loop, the resume
//! checker and the snapshot API. Each state object sits behind its own lock;
//! the cool-down lock is held across its own persistence so two writers can
//! never interleave a transition with a stale save.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobscout_core::{AppConfig, JobCard, JobRecord, TargetLocation};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock};

use crate::cooldown::{CooldownPolicy, CooldownState, ResumeReason, SuspendReason};
use crate::credential::{CredentialHolder, CredentialSummary, Fingerprint};
use crate::error::EngineError;
use crate::job_store::{AuditEntry, JobStore, SweepBatch};
use crate::persist::{Document, StateStore};
use crate::request_log::{
    Health, HealthThresholds, RequestLog, RequestLogDocument, RequestLogEntry, RequestOutcome,
    SYSTEM_TARGET,
};
use crate::run_clock::RunClock;

/// Tunables for the sweep loop, cool-down and observability.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub sweep_interval: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub cooldown: CooldownPolicy,
    pub resume_check_interval: Duration,
    pub suspend_on_missing_credential: bool,
    pub request_log_capacity: usize,
    pub health_window: usize,
    pub health_thresholds: HealthThresholds,
    pub alert_timeout: Duration,
    pub credential_file: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(180),
            jitter_min: Duration::from_millis(1000),
            jitter_max: Duration::from_millis(4000),
            cooldown: CooldownPolicy {
                min: Duration::from_secs(3600),
                max: Duration::from_secs(43_200),
            },
            resume_check_interval: Duration::from_secs(30),
            suspend_on_missing_credential: false,
            request_log_capacity: 400,
            health_window: 50,
            health_thresholds: HealthThresholds::default(),
            alert_timeout: Duration::from_secs(30),
            credential_file: None,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            jitter_min: Duration::from_millis(config.jitter_min_ms),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
            cooldown: CooldownPolicy {
                min: Duration::from_secs(config.cooldown_min_secs),
                max: Duration::from_secs(config.cooldown_max_secs),
            },
            resume_check_interval: Duration::from_secs(config.resume_check_secs),
            suspend_on_missing_credential: config.suspend_on_missing_credential,
            request_log_capacity: config.request_log_capacity,
            health_window: config.health_window,
            health_thresholds: HealthThresholds::default(),
            alert_timeout: Duration::from_secs(config.request_timeout_secs),
            credential_file: config.credential_file.clone(),
        }
    }
}

/// Job store plus its audit log. `unflushed` is set while the in-memory
/// contents are ahead of what is on disk.
#[derive(Debug, Default)]
struct JobLedger {
    store: JobStore,
    audit: Vec<AuditEntry>,
    unflushed: bool,
}

/// An alert owed to the operator for the current cool-down episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlert {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetHealth {
    pub target: String,
    pub health: Health,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityCount {
    pub city: String,
    pub jobs: usize,
}

/// Point-in-time view for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub cooldown: CooldownState,
    pub run_clock: RunClock,
    pub health: Health,
    pub targets: Vec<TargetHealth>,
    pub total_jobs: usize,
    pub jobs_by_city: Vec<CityCount>,
    pub pending_flush: bool,
    pub credential: CredentialSummary,
}

#[derive(Debug)]
pub struct EngineState {
    settings: EngineSettings,
    locations: Vec<TargetLocation>,
    credential: CredentialHolder,
    store: StateStore,
    jobs: RwLock<JobLedger>,
    request_log: RwLock<RequestLog>,
    run_clock: RwLock<RunClock>,
    cooldown: Mutex<CooldownState>,
    resumed: Notify,
}

impl EngineState {
    /// Builds the engine from whatever documents exist under `store`.
    ///
    /// Audit entries whose records never reached the jobs store (a commit
    /// interrupted between the two writes) are merged back and the ledger is
    /// marked for flushing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if an existing document cannot be read or decoded.
    pub async fn restore(
        settings: EngineSettings,
        locations: Vec<TargetLocation>,
        credential: CredentialHolder,
        store: StateStore,
    ) -> Result<Self, EngineError> {
        let records: Vec<JobRecord> = store.load(Document::Jobs).await?.unwrap_or_default();
        let audit: Vec<AuditEntry> = store.load(Document::NewJobsLog).await?.unwrap_or_default();
        let request_log = store
            .load::<RequestLogDocument>(Document::RequestLog)
            .await?
            .map_or_else(
                || RequestLog::new(settings.request_log_capacity),
                |doc| RequestLog::from_document(settings.request_log_capacity, doc),
            );
        let run_clock: RunClock = store.load(Document::RunClock).await?.unwrap_or_default();
        let cooldown: CooldownState = store.load(Document::Cooldown).await?.unwrap_or_default();

        let mut job_store = JobStore::from_records(records);
        let recovered: usize = audit
            .iter()
            .map(|entry| job_store.merge_records(entry.new.clone()).len())
            .sum();
        if recovered > 0 {
            tracing::warn!(recovered, "restore: merged audit records missing from jobs store");
        }

        tracing::info!(
            jobs = job_store.len(),
            sweeps_logged = audit.len(),
            requests = request_log.len(),
            suspended = cooldown.is_suspended(),
            "restore: engine state loaded"
        );

        Ok(Self {
            settings,
            locations,
            credential,
            store,
            jobs: RwLock::new(JobLedger {
                store: job_store,
                audit,
                unflushed: recovered > 0,
            }),
            request_log: RwLock::new(request_log),
            run_clock: RwLock::new(run_clock),
            cooldown: Mutex::new(cooldown),
            resumed: Notify::new(),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn locations(&self) -> &[TargetLocation] {
        &self.locations
    }

    #[must_use]
    pub fn credential(&self) -> &CredentialHolder {
        &self.credential
    }

    /// Signalled whenever a cool-down episode ends.
    #[must_use]
    pub fn resumed(&self) -> &Notify {
        &self.resumed
    }

    // ---- jobs -------------------------------------------------------------

    /// Adds to `batch` the cards not yet in the job store.
    pub async fn collect_new(&self, batch: &mut SweepBatch, cards: Vec<JobCard>) -> usize {
        let ledger = self.jobs.read().await;
        batch.extend_new(cards, |id| ledger.store.contains(id))
    }

    /// Appends a completed sweep's batch to the audit log and the job store,
    /// then writes both (audit first). Returns the number of jobs inserted.
    ///
    /// On a write failure the merged state stays in memory, flagged for
    /// flushing at the next sweep, so no discovered job is dropped.
    ///
    /// # Errors
    ///
    /// Returns the [`EngineError`] of the failed write.
    pub async fn commit_batch(&self, batch: SweepBatch) -> Result<usize, EngineError> {
        let mut ledger = self.jobs.write().await;
        let sweep_id = batch.sweep_id();
        let time = batch.stamped_at();
        let inserted = ledger.store.merge_records(batch.into_records());
        let count = inserted.len();
        if count == 0 && !ledger.unflushed {
            return Ok(0);
        }
        if count > 0 {
            ledger.audit.push(AuditEntry {
                sweep_id,
                time,
                new: inserted,
            });
        }
        ledger.unflushed = true;
        self.flush_ledger(&mut ledger).await?;
        Ok(count)
    }

    /// Retries a previously failed job write. Returns `true` if a flush ran.
    ///
    /// # Errors
    ///
    /// Returns the [`EngineError`] of the failed write.
    pub async fn flush_jobs_if_dirty(&self) -> Result<bool, EngineError> {
        let mut ledger = self.jobs.write().await;
        if !ledger.unflushed {
            return Ok(false);
        }
        self.flush_ledger(&mut ledger).await?;
        tracing::info!(jobs = ledger.store.len(), "persist: held jobs flushed");
        Ok(true)
    }

    async fn flush_ledger(&self, ledger: &mut JobLedger) -> Result<(), EngineError> {
        self.store.save(Document::NewJobsLog, &ledger.audit).await?;
        self.store.save(Document::Jobs, ledger.store.records()).await?;
        ledger.unflushed = false;
        Ok(())
    }

    pub async fn has_unflushed_jobs(&self) -> bool {
        self.jobs.read().await.unflushed
    }

    // ---- cool-down --------------------------------------------------------

    pub async fn is_suspended(&self) -> bool {
        self.cooldown.lock().await.is_suspended()
    }

    pub async fn cooldown(&self) -> CooldownState {
        self.cooldown.lock().await.clone()
    }

    /// Enters cool-down unless already suspended. Returns whether this call
    /// started a new episode.
    pub async fn suspend(&self, reason: SuspendReason, fingerprint: Option<Fingerprint>) -> bool {
        let mut cooldown = self.cooldown.lock().await;
        let length = self.settings.cooldown.draw();
        if !cooldown.suspend(reason, Utc::now(), length, fingerprint) {
            return false;
        }
        tracing::warn!(
            %reason,
            resume_at = ?cooldown.resume_at(),
            "cooldown: suspended"
        );
        self.save_cooldown(&cooldown).await;
        true
    }

    /// Clears cool-down if the credential rotated or the deadline passed,
    /// waking a sweep loop that is waiting out a suspended tick.
    pub async fn check_resume(&self, now: DateTime<Utc>) -> Option<ResumeReason> {
        let reason = self.lift_cooldown(now).await?;
        self.resumed.notify_one();
        Some(reason)
    }

    /// Resume gate at the start of a tick. The tick itself goes on to sweep,
    /// so no waiter is woken.
    pub async fn check_resume_at_tick(&self, now: DateTime<Utc>) -> Option<ResumeReason> {
        self.lift_cooldown(now).await
    }

    async fn lift_cooldown(&self, now: DateTime<Utc>) -> Option<ResumeReason> {
        let mut cooldown = self.cooldown.lock().await;
        if !cooldown.is_suspended() {
            return None;
        }
        let rotated = self
            .credential
            .has_changed_since(cooldown.fingerprint_at_suspend())
            .await;
        let reason = cooldown.check_resume(now, rotated)?;
        tracing::info!(%reason, "cooldown: resumed");
        self.save_cooldown(&cooldown).await;
        Some(reason)
    }

    /// Claims the alert owed for the current episode, if any. Claiming marks
    /// the episode alerted, so each episode yields at most one alert.
    pub async fn take_pending_alert(&self) -> Option<PendingAlert> {
        let mut cooldown = self.cooldown.lock().await;
        if !cooldown.needs_alert() {
            return None;
        }
        let CooldownState::Suspended {
            reason,
            since,
            resume_at,
            ..
        } = &*cooldown
        else {
            return None;
        };
        let alert = PendingAlert {
            subject: format!("jobscout: polling suspended ({reason})"),
            body: format!(
                "Polling was suspended at {since} after an {reason}. It resumes at \
                 {resume_at} or as soon as a new credential is supplied."
            ),
        };
        cooldown.mark_alerted();
        self.save_cooldown(&cooldown).await;
        Some(alert)
    }

    async fn save_cooldown(&self, cooldown: &CooldownState) {
        if let Err(e) = self.store.save(Document::Cooldown, cooldown).await {
            tracing::error!(error = %e, "persist: failed to write cool-down state");
        }
    }

    // ---- request log / run clock -----------------------------------------

    pub async fn record_outcome(&self, target: &str, outcome: RequestOutcome, detail: Option<String>) {
        self.request_log
            .write()
            .await
            .record(Utc::now(), target, outcome, detail);
    }

    pub async fn record_alert_failure(&self, detail: String) {
        self.record_outcome(SYSTEM_TARGET, RequestOutcome::AlertFailed, Some(detail))
            .await;
    }

    pub async fn record_tick_start(&self, now: DateTime<Utc>) {
        let next = chrono::Duration::from_std(self.settings.sweep_interval)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        self.run_clock.write().await.record_start(now, next);
    }

    pub async fn record_skip(&self) {
        self.run_clock.write().await.record_skip();
    }

    pub async fn record_completion(&self, now: DateTime<Utc>, new_jobs: usize) {
        self.run_clock
            .write()
            .await
            .record_completion(now, new_jobs);
    }

    /// Writes the request log and run clock. Failures are logged; both
    /// documents are rewritten whole on the next tick anyway.
    pub async fn flush_observability(&self) {
        let log = self.request_log.read().await.to_document();
        if let Err(e) = self.store.save(Document::RequestLog, &log).await {
            tracing::warn!(error = %e, "persist: failed to write request log");
        }
        let clock = self.run_clock.read().await.clone();
        if let Err(e) = self.store.save(Document::RunClock, &clock).await {
            tracing::warn!(error = %e, "persist: failed to write run clock");
        }
    }

    /// Writes every document. Used on shutdown.
    pub async fn flush_all(&self) {
        if let Err(e) = self.flush_jobs_if_dirty().await {
            tracing::error!(error = %e, "persist: jobs still unflushed at shutdown");
        }
        self.flush_observability().await;
        let cooldown = self.cooldown.lock().await;
        self.save_cooldown(&cooldown).await;
    }

    // ---- snapshots --------------------------------------------------------

    pub async fn status(&self) -> EngineStatus {
        let cooldown = self.cooldown().await;
        let run_clock = self.run_clock.read().await.clone();
        let (health, targets) = {
            let log = self.request_log.read().await;
            let window = self.settings.health_window;
            let thresholds = self.settings.health_thresholds;
            let targets = self
                .locations
                .iter()
                .map(|l| TargetHealth {
                    target: l.name.clone(),
                    health: log.health_for(&l.name, window, thresholds),
                })
                .collect();
            (log.health(window, thresholds), targets)
        };
        let (total_jobs, jobs_by_city, pending_flush) = {
            let ledger = self.jobs.read().await;
            let by_city = ledger
                .store
                .counts_by_city()
                .into_iter()
                .map(|(city, jobs)| CityCount { city, jobs })
                .collect();
            (ledger.store.len(), by_city, ledger.unflushed)
        };
        EngineStatus {
            cooldown,
            run_clock,
            health,
            targets,
            total_jobs,
            jobs_by_city,
            pending_flush,
            credential: self.credential.summary().await,
        }
    }

    /// All stored jobs in insertion order.
    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.jobs.read().await.store.records().to_vec()
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.store.len()
    }

    pub async fn new_jobs_log(&self) -> Vec<AuditEntry> {
        self.jobs.read().await.audit.clone()
    }

    /// Newest first.
    pub async fn recent_requests(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.request_log.read().await.recent(limit)
    }

    pub async fn run_clock(&self) -> RunClock {
        self.run_clock.read().await.clone()
    }

    pub async fn health(&self) -> Health {
        self.request_log
            .read()
            .await
            .health(self.settings.health_window, self.settings.health_thresholds)
    }
}
