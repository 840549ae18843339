//! Escalation policy.
//!
//! A failed login moves a subject up the attempt → lockout → ban ladder.
//! [`decide`] is the pure threshold rule; [`EscalationPolicy::escalate`]
//! reads the counts from a [`Ledger`], applies the decision and reports what
//! happened.
//!
//! The failure being handled counts towards the attempt threshold, so with
//! an attempt threshold of 5 the fifth consecutive failure promotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{GuardConfig, TrackConfig};
use crate::error::GuardResult;
use crate::store::Ledger;
use crate::subject::Subject;

/// Outcome of the threshold rule, before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Below the attempt threshold: store one more attempt.
    RecordAttempt,
    /// Attempt threshold reached: clear attempts and record a lockout.
    Lockout,
    /// Attempt threshold reached with enough lockouts on file: clear
    /// attempts and lockouts and record a ban.
    Ban,
}

/// Pure threshold rule for one track.
///
/// `attempts` includes the failure being decided. `lockouts` is the number
/// of lockouts counted towards a ban. Both comparisons are `>=` so counts
/// that overshoot still escalate.
#[must_use]
pub fn decide(attempts: u64, lockouts: u64, track: TrackConfig) -> Decision {
    if attempts < u64::from(track.attempt_threshold) {
        Decision::RecordAttempt
    } else if lockouts >= u64::from(track.lockout_threshold) {
        Decision::Ban
    } else {
        Decision::Lockout
    }
}

/// What a call to [`EscalationPolicy::escalate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    /// One attempt record was appended.
    AttemptRecorded,
    /// Attempts were cleared and a lockout recorded.
    LockedOut,
    /// Attempts and lockouts were cleared and a ban recorded.
    Banned,
}

impl Escalation {
    /// Returns the string representation of this escalation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AttemptRecorded => "attempt_recorded",
            Self::LockedOut => "locked_out",
            Self::Banned => "banned",
        }
    }

    /// Whether the subject moved up a tier.
    #[must_use]
    pub const fn is_promotion(&self) -> bool {
        !matches!(self, Self::AttemptRecorded)
    }
}

impl std::fmt::Display for Escalation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies [`decide`] against stored records.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    address: TrackConfig,
    account: TrackConfig,
    lockout_lookback: Option<chrono::Duration>,
}

impl EscalationPolicy {
    /// Build a policy from configuration.
    #[must_use]
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            address: config.address,
            account: config.account,
            lockout_lookback: config.lockout_lookback(),
        }
    }

    /// Thresholds that apply to `subject`.
    #[must_use]
    pub const fn track(&self, subject: &Subject) -> TrackConfig {
        match subject {
            Subject::Address(_) => self.address,
            Subject::Account(_) => self.account,
        }
    }

    /// Handle one failed attempt for `subject`.
    ///
    /// The read-then-write sequence is not atomic: two concurrent failures
    /// for the same subject may both see the pre-threshold count.
    ///
    /// # Errors
    ///
    /// Propagates storage failures. Records written before the failure are
    /// not rolled back.
    pub fn escalate(
        &self,
        ledger: &Ledger,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> GuardResult<Escalation> {
        let track = self.track(subject);
        let attempts = ledger.attempts().count(subject)?.saturating_add(1);

        // Only look at lockouts once the attempt threshold is reached.
        let lockouts = if attempts >= u64::from(track.attempt_threshold) {
            let since = self.lockout_lookback.map(|window| now - window);
            ledger.lockouts().count_since(subject, since)?
        } else {
            0
        };

        match decide(attempts, lockouts, track) {
            Decision::RecordAttempt => {
                ledger.attempts().record(subject, now)?;
                Ok(Escalation::AttemptRecorded)
            }
            Decision::Lockout => {
                ledger.attempts().clear(subject)?;
                ledger.lockouts().record(subject, now)?;
                info!(%subject, prior_lockouts = lockouts, "subject locked out");
                Ok(Escalation::LockedOut)
            }
            Decision::Ban => {
                ledger.attempts().clear(subject)?;
                ledger.lockouts().clear(subject)?;
                ledger.bans().record(subject, now)?;
                info!(%subject, prior_lockouts = lockouts, "subject banned");
                Ok(Escalation::Banned)
            }
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(&GuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    fn addr() -> Subject {
        Subject::address("111.111.111.111")
    }

    fn fail_n(
        policy: &EscalationPolicy,
        ledger: &Ledger,
        subject: &Subject,
        n: usize,
    ) -> Vec<Escalation> {
        let now = Utc::now();
        (0..n)
            .map(|_| policy.escalate(ledger, subject, now).unwrap())
            .collect()
    }

    // ==================== Decision Tests ====================

    #[test_case(1, 0, Decision::RecordAttempt ; "first attempt")]
    #[test_case(4, 5, Decision::RecordAttempt ; "below threshold ignores lockouts")]
    #[test_case(5, 0, Decision::Lockout ; "threshold reached")]
    #[test_case(5, 1, Decision::Lockout ; "one prior lockout")]
    #[test_case(5, 2, Decision::Ban ; "lockout threshold reached")]
    #[test_case(9, 7, Decision::Ban ; "overshoot still escalates")]
    fn test_decide_address_track(attempts: u64, lockouts: u64, expected: Decision) {
        assert_eq!(
            decide(attempts, lockouts, TrackConfig::address_default()),
            expected
        );
    }

    #[test_case(1, 0, Decision::RecordAttempt ; "first attempt")]
    #[test_case(2, 0, Decision::Lockout ; "second attempt locks")]
    #[test_case(2, 2, Decision::Ban ; "second attempt with two lockouts bans")]
    fn test_decide_account_track(attempts: u64, lockouts: u64, expected: Decision) {
        assert_eq!(
            decide(attempts, lockouts, TrackConfig::account_default()),
            expected
        );
    }

    // ==================== Address Track Tests ====================

    #[test]
    fn test_address_fifth_failure_locks_out() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();

        let outcomes = fail_n(&policy, &ledger, &addr(), 5);

        assert!(outcomes[..4]
            .iter()
            .all(|o| *o == Escalation::AttemptRecorded));
        assert_eq!(outcomes[4], Escalation::LockedOut);
        assert_eq!(ledger.attempts().count(&addr()).unwrap(), 0);
        assert_eq!(ledger.lockouts().count(&addr()).unwrap(), 1);
        assert_eq!(ledger.bans().count(&addr()).unwrap(), 0);
    }

    #[test]
    fn test_address_with_two_lockouts_is_banned() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let now = Utc::now();
        ledger
            .lockouts()
            .record(&addr(), now - Duration::hours(5))
            .unwrap();
        ledger
            .lockouts()
            .record(&addr(), now - Duration::hours(3))
            .unwrap();

        let outcomes = fail_n(&policy, &ledger, &addr(), 5);

        assert_eq!(outcomes[4], Escalation::Banned);
        assert_eq!(ledger.lockouts().count(&addr()).unwrap(), 0);
        assert_eq!(ledger.attempts().count(&addr()).unwrap(), 0);
        assert_eq!(ledger.bans().count(&addr()).unwrap(), 1);
    }

    #[test]
    fn test_never_lockout_and_ban_from_one_failure() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let now = Utc::now();
        for _ in 0..2 {
            ledger.lockouts().record(&addr(), now).unwrap();
        }
        for _ in 0..4 {
            ledger.attempts().record(&addr(), now).unwrap();
        }

        let outcome = policy.escalate(&ledger, &addr(), now).unwrap();
        assert_eq!(outcome, Escalation::Banned);
        // The two old lockouts were cleared and none was added.
        assert_eq!(ledger.lockouts().count(&addr()).unwrap(), 0);
    }

    #[test]
    fn test_overshooting_attempts_still_escalate() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let now = Utc::now();
        for _ in 0..12 {
            ledger.attempts().record(&addr(), now).unwrap();
        }

        let outcome = policy.escalate(&ledger, &addr(), now).unwrap();
        assert_eq!(outcome, Escalation::LockedOut);
        assert_eq!(ledger.attempts().count(&addr()).unwrap(), 0);
    }

    // ==================== Account Track Tests ====================

    #[test]
    fn test_account_second_failure_locks_out() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let alice = Subject::account("alice");

        let outcomes = fail_n(&policy, &ledger, &alice, 2);
        assert_eq!(
            outcomes,
            vec![Escalation::AttemptRecorded, Escalation::LockedOut]
        );
    }

    #[test]
    fn test_account_ban_after_two_lockouts() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let alice = Subject::account("alice");

        let outcomes = fail_n(&policy, &ledger, &alice, 6);
        assert_eq!(
            outcomes,
            vec![
                Escalation::AttemptRecorded,
                Escalation::LockedOut,
                Escalation::AttemptRecorded,
                Escalation::LockedOut,
                Escalation::AttemptRecorded,
                Escalation::Banned,
            ]
        );
        assert_eq!(ledger.bans().count(&alice).unwrap(), 1);
    }

    #[test]
    fn test_tracks_do_not_leak() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let alice = Subject::account("alice");

        fail_n(&policy, &ledger, &alice, 2);
        assert_eq!(ledger.lockouts().count(&alice).unwrap(), 1);
        assert_eq!(ledger.lockouts().count(&addr()).unwrap(), 0);
        assert_eq!(ledger.attempts().count(&addr()).unwrap(), 0);
    }

    // ==================== Lockout Window Tests ====================

    #[test]
    fn test_old_lockouts_count_without_window() {
        let ledger = Ledger::in_memory();
        let policy = EscalationPolicy::default();
        let alice = Subject::account("alice");
        let now = Utc::now();
        ledger
            .lockouts()
            .record(&alice, now - Duration::days(400))
            .unwrap();
        ledger
            .lockouts()
            .record(&alice, now - Duration::days(300))
            .unwrap();

        let outcomes = fail_n(&policy, &ledger, &alice, 2);
        assert_eq!(outcomes[1], Escalation::Banned);
    }

    #[test]
    fn test_lockout_window_excludes_old_lockouts() {
        let config = GuardConfig::builder()
            .lockout_window(std::time::Duration::from_secs(24 * 60 * 60))
            .build();
        let policy = EscalationPolicy::new(&config);
        let ledger = Ledger::in_memory();
        let alice = Subject::account("alice");
        let now = Utc::now();
        ledger
            .lockouts()
            .record(&alice, now - Duration::hours(30))
            .unwrap();
        ledger
            .lockouts()
            .record(&alice, now - Duration::hours(2))
            .unwrap();

        let outcomes = fail_n(&policy, &ledger, &alice, 2);
        assert_eq!(outcomes[1], Escalation::LockedOut);
    }

    #[test]
    fn test_escalation_display() {
        assert_eq!(Escalation::LockedOut.to_string(), "locked_out");
        assert!(Escalation::Banned.is_promotion());
        assert!(!Escalation::AttemptRecorded.is_promotion());
    }
}
