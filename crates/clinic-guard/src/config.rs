//! Guard configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, GuardResult};
use crate::subject::SubjectKind;

/// Longest lockout or window the guard accepts (100 years).
const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Escalation thresholds for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Stored failed attempts that trigger promotion to a lockout check.
    pub attempt_threshold: u32,
    /// Stored lockouts that turn the next promotion into a ban.
    pub lockout_threshold: u32,
}

impl TrackConfig {
    /// Defaults for the source-address track.
    #[must_use]
    pub const fn address_default() -> Self {
        Self {
            attempt_threshold: 5,
            lockout_threshold: 2,
        }
    }

    /// Defaults for the account track.
    #[must_use]
    pub const fn account_default() -> Self {
        Self {
            attempt_threshold: 2,
            lockout_threshold: 2,
        }
    }
}

/// Lockout notification text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Whether to send lockout notices at all.
    pub enabled: bool,
    /// Sender display name.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: "iTrust2 System".into(),
            subject: "iTrust2: Your account has been locked out".into(),
            body: "Your iTrust2 account has been locked out due to too many failed log in attempts."
                .into(),
        }
    }
}

/// Main guard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Source-address track thresholds.
    pub address: TrackConfig,
    /// Account track thresholds.
    pub account: TrackConfig,
    /// How long a lockout stays active after it is recorded.
    pub lockout_duration: Duration,
    /// How far back lockouts count towards a ban (`None` = all history).
    pub lockout_window: Option<Duration>,
    /// Path of the login view that redirects point at.
    pub login_path: String,
    /// Lockout notification settings.
    pub notice: NoticeConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            address: TrackConfig::address_default(),
            account: TrackConfig::account_default(),
            lockout_duration: Duration::from_secs(60 * 60),
            lockout_window: None,
            login_path: "/login".into(),
            notice: NoticeConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Create a new builder for guard configuration.
    #[must_use]
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails [`Self::validate`].
    pub fn from_json_str(json: &str) -> GuardResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> GuardResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] naming the first bad field.
    pub fn validate(&self) -> GuardResult<()> {
        for (name, track) in [("address", &self.address), ("account", &self.account)] {
            if track.attempt_threshold == 0 {
                return Err(GuardError::Config(format!(
                    "{name}.attempt_threshold must be at least 1"
                )));
            }
            if track.lockout_threshold == 0 {
                return Err(GuardError::Config(format!(
                    "{name}.lockout_threshold must be at least 1"
                )));
            }
        }
        if self.lockout_duration.is_zero() || self.lockout_duration > MAX_DURATION {
            return Err(GuardError::Config(
                "lockout_duration must be non-zero and at most 100 years".into(),
            ));
        }
        if self
            .lockout_window
            .is_some_and(|w| w.is_zero() || w > MAX_DURATION)
        {
            return Err(GuardError::Config(
                "lockout_window must be non-zero and at most 100 years".into(),
            ));
        }
        if !self.login_path.starts_with('/') {
            return Err(GuardError::Config("login_path must start with '/'".into()));
        }
        Ok(())
    }

    /// Thresholds for the given track.
    #[must_use]
    pub const fn track(&self, kind: SubjectKind) -> TrackConfig {
        match kind {
            SubjectKind::Address => self.address,
            SubjectKind::Account => self.account,
        }
    }

    /// Lockout validity as a chrono duration.
    #[must_use]
    pub fn lockout_validity(&self) -> chrono::Duration {
        to_chrono(self.lockout_duration)
    }

    /// Lockout counting window as a chrono duration.
    #[must_use]
    pub fn lockout_lookback(&self) -> Option<chrono::Duration> {
        self.lockout_window.map(to_chrono)
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d.min(MAX_DURATION))
        .unwrap_or_else(|_| chrono::Duration::days(100 * 365))
}

/// Builder for `GuardConfig`.
#[derive(Debug, Clone, Default)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// Set address track thresholds.
    #[must_use]
    pub const fn address(mut self, track: TrackConfig) -> Self {
        self.config.address = track;
        self
    }

    /// Set account track thresholds.
    #[must_use]
    pub const fn account(mut self, track: TrackConfig) -> Self {
        self.config.account = track;
        self
    }

    /// Set lockout duration.
    #[must_use]
    pub const fn lockout_duration(mut self, duration: Duration) -> Self {
        self.config.lockout_duration = duration;
        self
    }

    /// Only count lockouts newer than `window` towards a ban.
    #[must_use]
    pub const fn lockout_window(mut self, window: Duration) -> Self {
        self.config.lockout_window = Some(window);
        self
    }

    /// Set login path.
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.config.login_path = path.into();
        self
    }

    /// Set notification settings.
    #[must_use]
    pub fn notice(mut self, notice: NoticeConfig) -> Self {
        self.config.notice = notice;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> GuardConfig {
        self.config
    }
}
