//! Operator actions over the ledger.
//!
//! Bans never expire on their own; [`GuardAdmin::lift_ban`] is the only way
//! to remove one.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditEvent, AuditKind, AuditLogger, TracingAuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::error::GuardResult;
use crate::redirect::Standing;
use crate::store::Ledger;
use crate::subject::Subject;

/// Snapshot of one subject's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectReport {
    /// Subject reported on.
    pub subject: Subject,
    /// Effective block state.
    pub standing: Standing,
    /// Stored failed attempts.
    pub attempts: u64,
    /// Stored lockouts, expired ones included.
    pub lockouts: u64,
    /// When the active lockout ends, if one is in effect.
    pub locked_until: Option<DateTime<Utc>>,
    /// Stored bans.
    pub bans: u64,
    /// Time of the most recent ban.
    pub banned_at: Option<DateTime<Utc>>,
}

impl SubjectReport {
    /// Whether a ban is in effect.
    #[must_use]
    pub const fn is_banned(&self) -> bool {
        matches!(self.standing, Standing::Banned)
    }
}

/// Inspection and clearing of records.
#[derive(Clone)]
pub struct GuardAdmin {
    ledger: Ledger,
    audit: Arc<dyn AuditLogger>,
    clock: Arc<dyn Clock>,
}

impl GuardAdmin {
    /// Create an admin handle over `ledger`.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            audit: Arc::new(TracingAuditLogger::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Send audit events to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Take time from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Report on `subject`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn standing(&self, subject: &Subject) -> GuardResult<SubjectReport> {
        let now = self.clock.now();
        let locked_until = self.ledger.lockouts().active_until(subject, now)?.flatten();

        Ok(SubjectReport {
            subject: subject.clone(),
            standing: self.ledger.standing(subject, now)?,
            attempts: self.ledger.attempts().count(subject)?,
            lockouts: self.ledger.lockouts().count(subject)?,
            locked_until,
            bans: self.ledger.bans().count(subject)?,
            banned_at: self.ledger.bans().latest(subject)?,
        })
    }

    /// Remove every ban on `subject`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn lift_ban(&self, subject: &Subject) -> GuardResult<u64> {
        let removed = self.ledger.bans().clear(subject)?;
        if removed > 0 {
            info!(%subject, removed, "ban lifted");
            self.audit(AuditKind::BanCleared, subject, removed);
        }
        Ok(removed)
    }

    /// Remove every lockout on `subject`, expired ones included.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn lift_lockout(&self, subject: &Subject) -> GuardResult<u64> {
        let removed = self.ledger.lockouts().clear(subject)?;
        if removed > 0 {
            info!(%subject, removed, "lockout lifted");
            self.audit(AuditKind::LockoutCleared, subject, removed);
        }
        Ok(removed)
    }

    /// Forget every failed attempt by `subject`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn reset_attempts(&self, subject: &Subject) -> GuardResult<u64> {
        let removed = self.ledger.attempts().clear(subject)?;
        if removed > 0 {
            info!(%subject, removed, "attempts reset");
        }
        Ok(removed)
    }

    /// Reports for every subject currently banned or actively locked out,
    /// bans first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn blocked_subjects(&self) -> GuardResult<Vec<SubjectReport>> {
        let candidates: BTreeSet<Subject> = self
            .ledger
            .bans()
            .subjects()?
            .into_iter()
            .chain(self.ledger.lockouts().subjects()?)
            .collect();

        let mut reports = Vec::new();
        for subject in &candidates {
            let report = self.standing(subject)?;
            if report.standing.is_blocked() {
                reports.push(report);
            }
        }
        reports.sort_by(|a, b| {
            b.standing
                .cmp(&a.standing)
                .then_with(|| a.subject.cmp(&b.subject))
        });
        Ok(reports)
    }

    fn audit(&self, kind: AuditKind, subject: &Subject, removed: u64) {
        let event = AuditEvent::new(kind, subject.clone(), self.clock.now())
            .with_message(format!("{removed} record(s) removed"));
        self.audit.log(&event);
    }
}

impl std::fmt::Debug for GuardAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardAdmin")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
