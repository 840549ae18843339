//! In-memory record store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::GuardResult;
use crate::store::RecordStore;
use crate::subject::{AbuseRecord, Subject, Tier};

type Table = RwLock<HashMap<Subject, Vec<DateTime<Utc>>>>;

/// Record store holding all three tables in process memory.
///
/// Used directly in tests and single-node deployments, and as the working
/// set behind [`crate::store::JsonRecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    attempts: Table,
    lockouts: Table,
    bans: Table,
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn table(&self, tier: Tier) -> &Table {
        match tier {
            Tier::Attempt => &self.attempts,
            Tier::Lockout => &self.lockouts,
            Tier::Ban => &self.bans,
        }
    }

    /// Total number of records in `tier`.
    #[must_use]
    pub fn len(&self, tier: Tier) -> usize {
        self.table(tier).read().values().map(Vec::len).sum()
    }

    /// Whether every table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Tier::ALL.iter().all(|tier| self.len(*tier) == 0)
    }

    /// Flatten one table into rows, ordered by subject then time.
    #[must_use]
    pub fn export(&self, tier: Tier) -> Vec<AbuseRecord> {
        let table = self.table(tier).read();
        let mut rows: Vec<AbuseRecord> = table
            .iter()
            .flat_map(|(subject, times)| {
                times
                    .iter()
                    .map(|at| AbuseRecord::new(subject.clone(), *at))
            })
            .collect();
        rows.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then(a.occurred_at.cmp(&b.occurred_at))
        });
        rows
    }

    /// Replace one table with the given rows.
    pub fn import(&self, tier: Tier, rows: impl IntoIterator<Item = AbuseRecord>) {
        let mut table = HashMap::<Subject, Vec<DateTime<Utc>>>::new();
        for row in rows {
            table.entry(row.subject).or_default().push(row.occurred_at);
        }
        for times in table.values_mut() {
            times.sort_unstable();
        }
        *self.table(tier).write() = table;
    }
}

impl RecordStore for MemoryRecordStore {
    fn record(&self, tier: Tier, subject: &Subject, at: DateTime<Utc>) -> GuardResult<()> {
        let mut table = self.table(tier).write();
        let times = table.entry(subject.clone()).or_default();
        // Keep each list sorted so `records` is oldest-first.
        let pos = times.partition_point(|t| *t <= at);
        times.insert(pos, at);
        debug!(%tier, %subject, count = times.len(), "record appended");
        Ok(())
    }

    fn records(&self, tier: Tier, subject: &Subject) -> GuardResult<Vec<DateTime<Utc>>> {
        Ok(self
            .table(tier)
            .read()
            .get(subject)
            .cloned()
            .unwrap_or_default())
    }

    fn clear(&self, tier: Tier, subject: &Subject) -> GuardResult<u64> {
        let removed = self
            .table(tier)
            .write()
            .remove(subject)
            .map_or(0, |times| times.len() as u64);
        if removed > 0 {
            debug!(%tier, %subject, removed, "records cleared");
        }
        Ok(removed)
    }

    fn subjects(&self, tier: Tier) -> GuardResult<Vec<Subject>> {
        let mut subjects: Vec<Subject> = self.table(tier).read().keys().cloned().collect();
        subjects.sort();
        Ok(subjects)
    }

    fn count_since(
        &self,
        tier: Tier,
        subject: &Subject,
        since: Option<DateTime<Utc>>,
    ) -> GuardResult<u64> {
        let table = self.table(tier).read();
        let Some(times) = table.get(subject) else {
            return Ok(0);
        };
        let count = match since {
            Some(start) => times.len() - times.partition_point(|t| *t < start),
            None => times.len(),
        };
        Ok(count as u64)
    }

    fn latest(&self, tier: Tier, subject: &Subject) -> GuardResult<Option<DateTime<Utc>>> {
        Ok(self
            .table(tier)
            .read()
            .get(subject)
            .and_then(|times| times.last().copied()))
    }
}
