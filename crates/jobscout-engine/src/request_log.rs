//! Bounded ring of recent API-call outcomes and the health score derived
//! from it. Health is observability only and never feeds scheduling.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target name used for entries that are not an upstream call.
pub const SYSTEM_TARGET: &str = "system";

/// Outcome of one upstream call (or of an alert delivery, under [`SYSTEM_TARGET`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestOutcome {
    Ok { jobs: usize },
    HttpError { status: u16 },
    AuthError { status: u16 },
    ApiError,
    TransportError,
    NoCredential,
    AlertFailed,
}

impl RequestOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, RequestOutcome::Ok { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub outcome: RequestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLabel {
    Healthy,
    Degraded,
    Unhealthy,
    /// No entries in the window yet.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    pub healthy: u8,
    pub degraded: u8,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            healthy: 90,
            degraded: 70,
        }
    }
}

impl HealthThresholds {
    #[must_use]
    pub fn label(&self, score: u8) -> HealthLabel {
        if score >= self.healthy {
            HealthLabel::Healthy
        } else if score >= self.degraded {
            HealthLabel::Degraded
        } else {
            HealthLabel::Unhealthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub score: Option<u8>,
    pub label: HealthLabel,
    pub ok: usize,
    pub total: usize,
}

impl Health {
    fn from_counts(ok: usize, total: usize, thresholds: HealthThresholds) -> Self {
        if total == 0 {
            return Self {
                score: None,
                label: HealthLabel::Unknown,
                ok,
                total,
            };
        }
        // ok <= total, so the quotient is at most 100.
        let score = u8::try_from(ok * 100 / total).unwrap_or(100);
        Self {
            score: Some(score),
            label: thresholds.label(score),
            ok,
            total,
        }
    }
}

/// On-disk shape of the ring.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestLogDocument {
    pub capacity: usize,
    pub entries: Vec<RequestLogEntry>,
}

#[derive(Debug, Clone)]
pub struct RequestLog {
    capacity: usize,
    entries: VecDeque<RequestLogEntry>,
}

impl RequestLog {
    /// Creates an empty ring. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuilds a ring from a persisted document, keeping the newest entries
    /// that fit the configured capacity.
    #[must_use]
    pub fn from_document(capacity: usize, doc: RequestLogDocument) -> Self {
        let mut log = Self::new(capacity);
        for entry in doc.entries {
            log.push(entry);
        }
        log
    }

    #[must_use]
    pub fn to_document(&self) -> RequestLogDocument {
        RequestLogDocument {
            capacity: self.capacity,
            entries: self.entries.iter().cloned().collect(),
        }
    }

    pub fn push(&mut self, entry: RequestLogEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn record(
        &mut self,
        timestamp: DateTime<Utc>,
        target: &str,
        outcome: RequestOutcome,
        detail: Option<String>,
    ) {
        self.push(RequestLogEntry {
            timestamp,
            target: target.to_owned(),
            outcome,
            detail,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RequestLogEntry> {
        self.entries.iter()
    }

    /// The newest `limit` entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Health over the newest `window` upstream-call entries, ignoring
    /// [`SYSTEM_TARGET`] entries.
    #[must_use]
    pub fn health(&self, window: usize, thresholds: HealthThresholds) -> Health {
        self.health_matching(window, thresholds, |e| e.target != SYSTEM_TARGET)
    }

    /// Health over the newest `window` entries for one target.
    #[must_use]
    pub fn health_for(&self, target: &str, window: usize, thresholds: HealthThresholds) -> Health {
        self.health_matching(window, thresholds, |e| e.target == target)
    }

    fn health_matching<F>(&self, window: usize, thresholds: HealthThresholds, keep: F) -> Health
    where
        F: Fn(&RequestLogEntry) -> bool,
    {
        let (ok, total) = self
            .entries
            .iter()
            .rev()
            .filter(|e| keep(e))
            .take(window)
            .fold((0, 0), |(ok, total), e| {
                (ok + usize::from(e.outcome.is_ok()), total + 1)
            });
        Health::from_counts(ok, total, thresholds)
    }
}
