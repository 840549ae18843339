//! Record storage for attempts, lockouts and bans.
//!
//! [`RecordStore`] is the backend seam: three logical tables with identical
//! shape `(subject, occurred_at)`, addressed by [`Tier`]. [`Ledger`] wraps a
//! shared backend and hands out tier-bound [`TierStore`] views, which add
//! the read-time expiry rules:
//!
//! - a ban is active as long as any ban record exists;
//! - a lockout is active while `now - occurred_at < lockout_duration` for at
//!   least one record. Expired lockouts are not deleted, only ignored.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::GuardConfig;
use crate::error::GuardResult;
use crate::redirect::Standing;
use crate::subject::{Subject, Tier};

pub mod json;
pub mod memory;

pub use json::JsonRecordStore;
pub use memory::MemoryRecordStore;

/// Storage backend for abuse records.
///
/// Each call is expected to be atomic on its own; callers get no atomicity
/// across calls.
pub trait RecordStore: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the record.
    fn record(&self, tier: Tier, subject: &Subject, at: DateTime<Utc>) -> GuardResult<()>;

    /// All timestamps recorded for `subject` in `tier`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn records(&self, tier: Tier, subject: &Subject) -> GuardResult<Vec<DateTime<Utc>>>;

    /// Delete every record for `subject` in `tier`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear(&self, tier: Tier, subject: &Subject) -> GuardResult<u64>;

    /// Every subject holding at least one record in `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn subjects(&self, tier: Tier) -> GuardResult<Vec<Subject>>;

    /// Count records with `occurred_at >= since` (`None` counts everything).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn count_since(
        &self,
        tier: Tier,
        subject: &Subject,
        since: Option<DateTime<Utc>>,
    ) -> GuardResult<u64> {
        let records = self.records(tier, subject)?;
        let count = match since {
            Some(start) => records.iter().filter(|at| **at >= start).count(),
            None => records.len(),
        };
        Ok(count as u64)
    }

    /// Most recent timestamp for `subject` in `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn latest(&self, tier: Tier, subject: &Subject) -> GuardResult<Option<DateTime<Utc>>> {
        Ok(self.records(tier, subject)?.into_iter().max())
    }
}

/// Shared handle to the three record tables.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn RecordStore>,
    lockout_validity: chrono::Duration,
}

impl Ledger {
    /// Wrap a backend, taking the lockout validity from `config`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, config: &GuardConfig) -> Self {
        Self {
            store,
            lockout_validity: config.lockout_validity(),
        }
    }

    /// In-memory ledger with default configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRecordStore::new()), &GuardConfig::default())
    }

    /// Failed-attempt table.
    #[must_use]
    pub fn attempts(&self) -> TierStore<'_> {
        self.tier(Tier::Attempt)
    }

    /// Lockout table.
    #[must_use]
    pub fn lockouts(&self) -> TierStore<'_> {
        self.tier(Tier::Lockout)
    }

    /// Ban table.
    #[must_use]
    pub fn bans(&self) -> TierStore<'_> {
        self.tier(Tier::Ban)
    }

    /// View bound to an arbitrary tier.
    #[must_use]
    pub fn tier(&self, tier: Tier) -> TierStore<'_> {
        TierStore {
            store: self.store.as_ref(),
            tier,
            lockout_validity: self.lockout_validity,
        }
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// How long a lockout stays active.
    #[must_use]
    pub const fn lockout_validity(&self) -> chrono::Duration {
        self.lockout_validity
    }

    /// Effective block state of `subject` at `now`. A ban outranks a lockout.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn standing(&self, subject: &Subject, now: DateTime<Utc>) -> GuardResult<Standing> {
        if self.bans().is_active(subject, now)? {
            Ok(Standing::Banned)
        } else if self.lockouts().is_active(subject, now)? {
            Ok(Standing::Locked)
        } else {
            Ok(Standing::Clear)
        }
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("lockout_validity", &self.lockout_validity)
            .finish_non_exhaustive()
    }
}

/// A view of one tier's table.
#[derive(Clone, Copy)]
pub struct TierStore<'a> {
    store: &'a dyn RecordStore,
    tier: Tier,
    lockout_validity: chrono::Duration,
}

impl TierStore<'_> {
    /// The tier this view is bound to.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Append a record at `now`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn record(&self, subject: &Subject, now: DateTime<Utc>) -> GuardResult<()> {
        self.store.record(self.tier, subject, now)
    }

    /// Count records at or after `window_start` (`None` = all history).
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn count_since(
        &self,
        subject: &Subject,
        window_start: Option<DateTime<Utc>>,
    ) -> GuardResult<u64> {
        self.store.count_since(self.tier, subject, window_start)
    }

    /// Count every record for `subject`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn count(&self, subject: &Subject) -> GuardResult<u64> {
        self.count_since(subject, None)
    }

    /// Most recent record for `subject`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn latest(&self, subject: &Subject) -> GuardResult<Option<DateTime<Utc>>> {
        self.store.latest(self.tier, subject)
    }

    /// Delete every record for `subject`. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn clear(&self, subject: &Subject) -> GuardResult<u64> {
        self.store.clear(self.tier, subject)
    }

    /// Every subject with at least one record in this tier.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn subjects(&self) -> GuardResult<Vec<Subject>> {
        self.store.subjects(self.tier)
    }

    /// When the block on `subject` ends, if it is currently in effect.
    ///
    /// Returns `Some(None)` for a ban, which has no end, `Some(Some(t))` for
    /// an active lockout ending at `t`, and `None` when nothing is in effect.
    /// Attempts never block, so the attempt tier always yields `None`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn active_until(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> GuardResult<Option<Option<DateTime<Utc>>>> {
        let Some(latest) = self.latest(subject)? else {
            return Ok(None);
        };
        match self.tier {
            Tier::Attempt => Ok(None),
            Tier::Ban => Ok(Some(None)),
            Tier::Lockout => {
                if now - latest < self.lockout_validity {
                    Ok(Some(Some(latest + self.lockout_validity)))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Whether a block from this tier is in effect for `subject` at `now`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn is_active(&self, subject: &Subject, now: DateTime<Utc>) -> GuardResult<bool> {
        Ok(self.active_until(subject, now)?.is_some())
    }
}

impl fmt::Debug for TierStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierStore")
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}
