//! The job discovery engine.
//!
//! A [`Sweeper`] walks the target locations once per tick, merging unseen
//! jobs into the store and recording every call in the request log. An
//! authentication failure suspends polling until the credential rotates or
//! the cool-down deadline passes; [`run_resume_check`] drives the latter
//! from a separate task.

pub mod cooldown;
pub mod credential;
pub mod error;
pub mod job_store;
pub mod notifier;
pub mod persist;
pub mod request_log;
pub mod resume;
pub mod run_clock;
pub mod state;
pub mod sweep;

pub use cooldown::{CooldownPolicy, CooldownState, ResumeReason, SuspendReason};
pub use credential::{Credential, CredentialHolder, CredentialSummary, Fingerprint, Rotation};
pub use error::EngineError;
pub use job_store::{AuditEntry, JobStore, SweepBatch};
pub use notifier::{AlertChannel, LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use persist::{Document, StateStore};
pub use request_log::{Health, HealthLabel, RequestLog, RequestLogEntry, RequestOutcome};
pub use resume::run_resume_check;
pub use run_clock::RunClock;
pub use state::{EngineSettings, EngineState, EngineStatus};
pub use sweep::{SweepOutcome, SweepReport, Sweeper};
