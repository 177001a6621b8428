//! Cool-down state machine: `Active` while polling, `Suspended` after an
//! authentication-class failure until the credential rotates or the resume
//! deadline passes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::credential::Fingerprint;

/// Randomised suspension length range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl CooldownPolicy {
    /// Draws a suspension length uniformly from `min..=max`.
    #[must_use]
    pub fn draw(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::rng().random_range(self.min.as_secs()..=self.max.as_secs());
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendReason {
    AuthFailure,
    MissingCredential,
}

impl std::fmt::Display for SuspendReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuspendReason::AuthFailure => f.write_str("authentication failure"),
            SuspendReason::MissingCredential => f.write_str("missing credential"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    /// The held credential differs from the one captured at suspension.
    CredentialRotated,
    /// The resume deadline has been reached.
    DeadlineReached,
}

impl std::fmt::Display for ResumeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResumeReason::CredentialRotated => f.write_str("credential rotated"),
            ResumeReason::DeadlineReached => f.write_str("deadline reached"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CooldownState {
    #[default]
    Active,
    Suspended {
        reason: SuspendReason,
        since: DateTime<Utc>,
        resume_at: DateTime<Utc>,
        /// `None` when no credential was held at suspension.
        fingerprint_at_suspend: Option<Fingerprint>,
        /// Whether the operator alert for this episode has been delivered
        /// (or its delivery attempted).
        #[serde(default)]
        alerted: bool,
    },
}

impl CooldownState {
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self, CooldownState::Suspended { .. })
    }

    #[must_use]
    pub fn resume_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CooldownState::Active => None,
            CooldownState::Suspended { resume_at, .. } => Some(*resume_at),
        }
    }

    /// Moves `Active` to `Suspended`. Returns `false` without changing
    /// anything when already suspended, so one episode never restarts its
    /// deadline.
    pub fn suspend(
        &mut self,
        reason: SuspendReason,
        now: DateTime<Utc>,
        length: Duration,
        fingerprint: Option<Fingerprint>,
    ) -> bool {
        if self.is_suspended() {
            return false;
        }
        let length = chrono::Duration::from_std(length)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let resume_at = now.checked_add_signed(length).unwrap_or(now);
        *self = CooldownState::Suspended {
            reason,
            since: now,
            resume_at,
            fingerprint_at_suspend: fingerprint,
            alerted: false,
        };
        true
    }

    /// Fingerprint captured when the current episode began. `None` while
    /// active or when no credential was held at suspension.
    #[must_use]
    pub fn fingerprint_at_suspend(&self) -> Option<&Fingerprint> {
        match self {
            CooldownState::Active => None,
            CooldownState::Suspended {
                fingerprint_at_suspend,
                ..
            } => fingerprint_at_suspend.as_ref(),
        }
    }

    /// Clears `Suspended` back to `Active` when the credential has rotated
    /// or `now` has reached the deadline. Rotation is checked first.
    pub fn check_resume(&mut self, now: DateTime<Utc>, rotated: bool) -> Option<ResumeReason> {
        let CooldownState::Suspended { resume_at, .. } = self else {
            return None;
        };

        let reason = if rotated {
            ResumeReason::CredentialRotated
        } else if now >= *resume_at {
            ResumeReason::DeadlineReached
        } else {
            return None;
        };
        *self = CooldownState::Active;
        Some(reason)
    }

    /// Whether this episode still owes the operator an alert.
    #[must_use]
    pub fn needs_alert(&self) -> bool {
        matches!(self, CooldownState::Suspended { alerted: false, .. })
    }

    pub fn mark_alerted(&mut self) {
        if let CooldownState::Suspended { alerted, .. } = self {
            *alerted = true;
        }
    }
}
