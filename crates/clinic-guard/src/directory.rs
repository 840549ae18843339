//! Account directory lookups.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A known user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login name.
    pub username: String,
    /// Registered email address, if any.
    pub email: Option<String>,
}

impl Account {
    /// Create an account with no email on file.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
        }
    }

    /// Set the registered email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Resolves attempted usernames to accounts.
///
/// Whether an account is disabled is decided by the host's credential
/// verifier and arrives as [`crate::FailureKind::Disabled`]; the directory
/// only answers existence and contact details.
pub trait Directory: Send + Sync {
    /// Look up an account by username.
    fn resolve_account(&self, username: &str) -> Option<Account>;

    /// Registered email address for `username`, if the account exists and
    /// has a non-blank one.
    fn resolve_email(&self, username: &str) -> Option<String> {
        self.resolve_account(username)
            .and_then(|account| account.email)
            .filter(|email| !email.trim().is_empty())
    }
}

/// Directory backed by an in-memory map.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    accounts: RwLock<HashMap<String, Account>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account.
    pub fn insert(&self, account: Account) {
        self.accounts
            .write()
            .insert(account.username.clone(), account);
    }

    /// Remove an account.
    pub fn remove(&self, username: &str) -> Option<Account> {
        self.accounts.write().remove(username)
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl FromIterator<Account> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = Account>>(iter: I) -> Self {
        let directory = Self::new();
        for account in iter {
            directory.insert(account);
        }
        directory
    }
}

impl Directory for StaticDirectory {
    fn resolve_account(&self, username: &str) -> Option<Account> {
        self.accounts.read().get(username).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_account() {
        let directory: StaticDirectory = [
            Account::new("alice").with_email("alice@example.org"),
            Account::new("bob"),
        ]
        .into_iter()
        .collect();

        assert_eq!(directory.len(), 2);
        assert!(directory.resolve_account("alice").is_some());
        assert_eq!(directory.resolve_account("bob").unwrap().email, None);
        assert!(directory.resolve_account("carol").is_none());
    }

    #[test]
    fn test_resolve_email() {
        let directory = StaticDirectory::new();
        directory.insert(Account::new("alice").with_email("alice@example.org"));
        directory.insert(Account::new("bob"));
        directory.insert(Account::new("dave").with_email("  "));

        assert_eq!(
            directory.resolve_email("alice").as_deref(),
            Some("alice@example.org")
        );
        assert!(directory.resolve_email("bob").is_none());
        assert!(directory.resolve_email("dave").is_none());
        assert!(directory.resolve_email("nobody").is_none());
    }

    #[test]
    fn test_remove() {
        let directory = StaticDirectory::new();
        directory.insert(Account::new("alice"));
        assert!(directory.remove("alice").is_some());
        assert!(directory.is_empty());
    }
}
