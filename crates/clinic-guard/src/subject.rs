//! Tracked subjects, record tiers and abuse records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GuardError;

/// Which track a subject belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    /// A user account, keyed by username.
    Account,
    /// A source network address.
    Address,
}

impl SubjectKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subject tracked for abuse.
///
/// Every record is keyed by exactly one subject, so an account and an
/// address with the same text never share counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    /// A user account.
    Account(String),
    /// A source address.
    Address(String),
}

impl Subject {
    /// Subject for a user account.
    pub fn account(username: impl Into<String>) -> Self {
        Self::Account(username.into())
    }

    /// Subject for a source address.
    pub fn address(addr: impl Into<String>) -> Self {
        Self::Address(addr.into())
    }

    /// Which track this subject is on.
    #[must_use]
    pub const fn kind(&self) -> SubjectKind {
        match self {
            Self::Account(_) => SubjectKind::Account,
            Self::Address(_) => SubjectKind::Address,
        }
    }

    /// The bare identifier (username or address).
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Account(id) | Self::Address(id) => id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl FromStr for Subject {
    type Err = GuardError;

    /// Parses `address:<ip>` or `account:<name>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| GuardError::InvalidSubject(s.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(GuardError::InvalidSubject(s.to_string()));
        }
        match kind.trim().to_ascii_lowercase().as_str() {
            "address" | "ip" => Ok(Self::address(id)),
            "account" | "user" => Ok(Self::account(id)),
            _ => Err(GuardError::InvalidSubject(s.to_string())),
        }
    }
}

/// Record tier, in escalating order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// One failed authentication.
    Attempt,
    /// Temporary block.
    Lockout,
    /// Permanent block.
    Ban,
}

impl Tier {
    /// All tiers, lowest first.
    pub const ALL: [Self; 3] = [Self::Attempt, Self::Lockout, Self::Ban];

    /// Returns the string representation of this tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attempt => "attempt",
            Self::Lockout => "lockout",
            Self::Ban => "ban",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of an attempt, lockout or ban table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbuseRecord {
    /// Who the record is about.
    pub subject: Subject,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}

impl AbuseRecord {
    /// Create a record for `subject` at `occurred_at`.
    #[must_use]
    pub const fn new(subject: Subject, occurred_at: DateTime<Utc>) -> Self {
        Self {
            subject,
            occurred_at,
        }
    }
}
