//! Deduplicated, insertion-ordered set of discovered jobs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jobscout_core::{JobCard, JobRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Jobs discovered during one sweep, all stamped with the sweep's start time.
#[derive(Debug, Clone)]
pub struct SweepBatch {
    sweep_id: Uuid,
    stamped_at: DateTime<Utc>,
    records: Vec<JobRecord>,
    ids: HashSet<String>,
}

impl SweepBatch {
    #[must_use]
    pub fn new(stamped_at: DateTime<Utc>) -> Self {
        Self {
            sweep_id: Uuid::new_v4(),
            stamped_at,
            records: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Adds the cards whose ids are neither `known` nor already in the batch.
    /// Returns how many were added.
    pub fn extend_new<F>(&mut self, cards: Vec<JobCard>, known: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut added = 0;
        for card in cards {
            if known(&card.job_id) || self.ids.contains(&card.job_id) {
                continue;
            }
            self.ids.insert(card.job_id.clone());
            self.records
                .push(JobRecord::from_card(card, self.stamped_at));
            added += 1;
        }
        added
    }

    #[must_use]
    pub fn sweep_id(&self) -> Uuid {
        self.sweep_id
    }

    #[must_use]
    pub fn stamped_at(&self) -> DateTime<Utc> {
        self.stamped_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<JobRecord> {
        self.records
    }
}

/// One entry of the "new jobs" audit log: the records a single sweep added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sweep_id: Uuid,
    pub time: DateTime<Utc>,
    pub new: Vec<JobRecord>,
}

/// Append-only job collection keyed by `job_id`. First-seen wins: a record
/// whose id is already known is never replaced.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    records: Vec<JobRecord>,
    known: HashSet<String>,
}

impl JobStore {
    /// Rebuilds a store from persisted records, dropping later duplicates.
    #[must_use]
    pub fn from_records(records: Vec<JobRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            store.insert(record);
        }
        store
    }

    #[must_use]
    pub fn contains(&self, job_id: &str) -> bool {
        self.known.contains(job_id)
    }

    /// Inserts `record` unless its id is known. Returns whether it was inserted.
    pub fn insert(&mut self, record: JobRecord) -> bool {
        if !self.known.insert(record.job_id.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Merges a sweep batch, returning the number of records inserted.
    /// Re-merging an already merged batch inserts nothing.
    pub fn merge(&mut self, batch: SweepBatch) -> usize {
        self.merge_records(batch.into_records()).len()
    }

    /// Merges records and returns the ones that were actually new.
    pub fn merge_records(&mut self, records: Vec<JobRecord>) -> Vec<JobRecord> {
        records
            .into_iter()
            .filter(|r| self.insert(r.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Number of stored jobs per city, largest first. Jobs without a city
    /// count under `"Unknown"`.
    #[must_use]
    pub fn counts_by_city(&self) -> Vec<(String, usize)> {
        let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        for record in &self.records {
            *counts
                .entry(record.city.as_deref().unwrap_or("Unknown"))
                .or_default() += 1;
        }
        let mut out: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(city, n)| (city.to_owned(), n))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }
}
