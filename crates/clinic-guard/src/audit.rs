//! Security audit trail.
//!
//! Every escalation, lockout notice and login outcome the guard handles is
//! reported to an [`AuditLogger`] as an [`AuditEvent`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::Subject;

/// Severity level for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine outcome (e.g., successful login).
    Info = 0,
    /// Single failure or administrative change.
    Low = 1,
    /// Temporary block imposed.
    Medium = 2,
    /// Permanent block imposed.
    High = 3,
}

impl Severity {
    /// Returns the string representation of this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// A source address was locked out.
    AddressLocked,
    /// A source address was banned.
    AddressBanned,
    /// An account was locked out.
    AccountLocked,
    /// An account was banned.
    AccountBanned,
    /// A lockout notice was queued for delivery.
    LockoutEmailQueued,
    /// A lockout notice could not be addressed.
    LockoutEmailMissing,
    /// A login succeeded and counters were reset.
    LoginSucceeded,
    /// A login failed.
    LoginFailed,
    /// A ban was lifted by an operator.
    BanCleared,
    /// A lockout was lifted by an operator.
    LockoutCleared,
}

impl AuditKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AddressLocked => "address_locked",
            Self::AddressBanned => "address_banned",
            Self::AccountLocked => "account_locked",
            Self::AccountBanned => "account_banned",
            Self::LockoutEmailQueued => "lockout_email_queued",
            Self::LockoutEmailMissing => "lockout_email_missing",
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::BanCleared => "ban_cleared",
            Self::LockoutCleared => "lockout_cleared",
        }
    }

    /// Default severity for this kind.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::LoginSucceeded | Self::LockoutEmailQueued => Severity::Info,
            Self::LoginFailed
            | Self::LockoutEmailMissing
            | Self::BanCleared
            | Self::LockoutCleared => Severity::Low,
            Self::AddressLocked | Self::AccountLocked => Severity::Medium,
            Self::AddressBanned | Self::AccountBanned => Severity::High,
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: AuditKind,
    /// Severity level.
    pub severity: Severity,
    /// Address or account the event is about.
    pub subject: Subject,
    /// Free-form detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuditEvent {
    /// Create an event with the kind's default severity.
    #[must_use]
    pub fn new(kind: AuditKind, subject: Subject, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp,
            kind,
            severity: kind.severity(),
            subject,
            message: None,
        }
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Serializes the event to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Trait for audit logging backends.
pub trait AuditLogger: Send + Sync {
    /// Logs an audit event.
    fn log(&self, event: &AuditEvent);
}

/// Audit logger that writes to `tracing`.
///
/// - Info, Low → `tracing::info!`
/// - Medium → `tracing::warn!`
/// - High → `tracing::error!`
#[derive(Debug, Clone, Default)]
pub struct TracingAuditLogger {
    prefix: Option<String>,
}

impl TracingAuditLogger {
    /// Creates a new tracing-based audit logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that tags every line with `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: &AuditEvent) {
        let event_id = event.event_id;
        let kind = event.kind;
        let subject = &event.subject;
        let json = event.to_json().unwrap_or_else(|_| "{}".to_string());
        let prefix = self.prefix.as_deref().unwrap_or("AUDIT");

        match event.severity {
            Severity::Info | Severity::Low => {
                tracing::info!(
                    target: "clinic_guard::audit",
                    %event_id,
                    %kind,
                    %subject,
                    event_json = %json,
                    "[{prefix}] {kind}"
                );
            }
            Severity::Medium => {
                tracing::warn!(
                    target: "clinic_guard::audit",
                    %event_id,
                    %kind,
                    %subject,
                    event_json = %json,
                    "[{prefix}] {kind}"
                );
            }
            Severity::High => {
                tracing::error!(
                    target: "clinic_guard::audit",
                    %event_id,
                    %kind,
                    %subject,
                    event_json = %json,
                    "[{prefix}] {kind}"
                );
            }
        }
    }
}

/// Audit logger that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLogger;

impl AuditLogger for NoopAuditLogger {
    fn log(&self, _event: &AuditEvent) {}
}

/// Audit logger that keeps events in memory, for tests and admin tooling.
#[derive(Debug, Default)]
pub struct MemoryAuditLogger {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLogger {
    /// Create an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event logged so far.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Kinds of every event logged so far, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<AuditKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }
}

impl AuditLogger for MemoryAuditLogger {
    fn log(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use test_case::test_case;

    #[test_case(AuditKind::LoginSucceeded, Severity::Info ; "success")]
    #[test_case(AuditKind::LoginFailed, Severity::Low ; "failure")]
    #[test_case(AuditKind::AddressLocked, Severity::Medium ; "lockout")]
    #[test_case(AuditKind::AccountBanned, Severity::High ; "ban")]
    fn test_kind_severity(kind: AuditKind, expected: Severity) {
        assert_eq!(kind.severity(), expected);
    }

    #[test]
    fn test_event_json_shape() {
        let event = AuditEvent::new(
            AuditKind::AddressBanned,
            Subject::address("203.0.113.5"),
            Utc::now(),
        )
        .with_message("203.0.113.5 has been banned");

        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["kind"], "address_banned");
        assert_eq!(value["severity"], "high");
        assert_eq!(value["subject"]["kind"], "address");
        assert_eq!(value["message"], "203.0.113.5 has been banned");
    }

    #[test]
    fn test_event_ids_are_unique() {
        let now = Utc::now();
        let a = AuditEvent::new(AuditKind::LoginFailed, Subject::account("a"), now);
        let b = AuditEvent::new(AuditKind::LoginFailed, Subject::account("a"), now);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_tracing_logger_all_severities() {
        let logger = TracingAuditLogger::with_prefix("GUARD");
        let now = Utc::now();
        for kind in [
            AuditKind::LoginSucceeded,
            AuditKind::LoginFailed,
            AuditKind::AccountLocked,
            AuditKind::AddressBanned,
        ] {
            logger.log(&AuditEvent::new(kind, Subject::address("10.0.0.1"), now));
        }
    }

    #[test]
    fn test_memory_logger_collects() {
        let logger = MemoryAuditLogger::new();
        let now = Utc::now();
        logger.log(&AuditEvent::new(AuditKind::LoginFailed, Subject::account("a"), now));
        logger.log(&AuditEvent::new(AuditKind::AccountLocked, Subject::account("a"), now));

        assert_eq!(
            logger.kinds(),
            vec![AuditKind::LoginFailed, AuditKind::AccountLocked]
        );
    }

    #[test]
    fn test_logger_in_arc() {
        let logger: Arc<dyn AuditLogger> = Arc::new(NoopAuditLogger);
        logger.log(&AuditEvent::new(
            AuditKind::BanCleared,
            Subject::account("a"),
            Utc::now(),
        ));
    }
}
