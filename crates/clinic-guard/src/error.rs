//! Error types for login abuse mitigation.

use thiserror::Error;

use crate::subject::Tier;

/// Errors that can occur in guard operations.
///
/// Business outcomes (an attempt recorded, a lockout, a ban) are never
/// errors; they are reported through [`crate::policy::Escalation`] and
/// [`crate::redirect::LoginRedirect`]. Everything here is fatal to the
/// request that hit it, except [`GuardError::Notification`], which the
/// orchestrator logs and swallows.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A record store read or write failed.
    #[error("{tier} store failure: {message}")]
    Storage {
        /// The tier whose table was being accessed.
        tier: Tier,
        /// Backend-specific description.
        message: String,
    },

    /// Persisted state could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from a durable backend or config loader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A notification could not be handed to the mail collaborator.
    #[error("notification to {to} failed: {reason}")]
    Notification {
        /// Intended recipient.
        to: String,
        /// Why delivery failed.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subject string could not be parsed.
    #[error("invalid subject '{0}': expected address:<ip> or account:<name>")]
    InvalidSubject(String),
}

impl GuardError {
    /// Convenience constructor for storage failures.
    pub fn storage(tier: Tier, message: impl Into<String>) -> Self {
        Self::Storage {
            tier,
            message: message.into(),
        }
    }
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;
