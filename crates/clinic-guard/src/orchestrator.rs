//! Authentication outcome handling.
//!
//! [`FailureOrchestrator`] is called by the host's credential verifier after
//! every login attempt. Failures drive the [`EscalationPolicy`] on the
//! address track first and then, if the address is still only collecting
//! attempts, on the account track. Successes reset attempt counters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audit::{AuditEvent, AuditKind, AuditLogger, TracingAuditLogger};
use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::directory::Directory;
use crate::error::GuardResult;
use crate::notify::{Mailer, NoopMailer, Notification};
use crate::policy::{Escalation, EscalationPolicy};
use crate::redirect::{LoginRedirect, Standing};
use crate::store::{Ledger, RecordStore};
use crate::subject::Subject;

/// Why the credential verifier rejected a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unknown user or wrong password.
    BadCredentials,
    /// The account exists but is disabled (including banned or locked out).
    Disabled,
    /// Any other rejection.
    Other,
}

impl FailureKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadCredentials => "bad_credentials",
            Self::Disabled => "disabled",
            Self::Other => "other",
        }
    }
}

/// One rejected login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFailure {
    /// Username the caller submitted, if any.
    pub username: Option<String>,
    /// Caller's source address.
    pub address: String,
    /// Why the login was rejected.
    pub kind: FailureKind,
}

impl AuthFailure {
    /// Create a failure with no username.
    pub fn new(kind: FailureKind, address: impl Into<String>) -> Self {
        Self {
            username: None,
            address: address.into(),
            kind,
        }
    }

    /// Bad-credentials failure for `username` from `address`.
    pub fn bad_credentials(username: impl Into<String>, address: impl Into<String>) -> Self {
        Self::new(FailureKind::BadCredentials, address).with_username(username)
    }

    /// Disabled-account failure for `username` from `address`.
    pub fn disabled(username: impl Into<String>, address: impl Into<String>) -> Self {
        Self::new(FailureKind::Disabled, address).with_username(username)
    }

    /// Set the submitted username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// The submitted username, if present and not blank.
    #[must_use]
    pub fn attempted_username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Turns login outcomes into records, redirects and notices.
pub struct FailureOrchestrator {
    ledger: Ledger,
    policy: EscalationPolicy,
    directory: Arc<dyn Directory>,
    mailer: Arc<dyn Mailer>,
    audit: Arc<dyn AuditLogger>,
    clock: Arc<dyn Clock>,
    config: GuardConfig,
}

impl FailureOrchestrator {
    /// Create an orchestrator over `store`.
    ///
    /// Notices go to a [`NoopMailer`], audit events to `tracing` and time
    /// comes from the system clock until replaced.
    #[must_use]
    pub fn new(
        config: GuardConfig,
        store: Arc<dyn RecordStore>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            ledger: Ledger::new(store, &config),
            policy: EscalationPolicy::new(&config),
            directory,
            mailer: Arc::new(NoopMailer),
            audit: Arc::new(TracingAuditLogger::new()),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Use `mailer` for lockout notices.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
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

    /// The ledger this orchestrator writes to.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Handle a rejected login and pick the redirect for it.
    ///
    /// # Errors
    ///
    /// Propagates storage failures. Notification failures are logged and
    /// never returned.
    pub fn on_failure(&self, failure: &AuthFailure) -> GuardResult<LoginRedirect> {
        let now = self.clock.now();
        let username = failure.attempted_username();

        self.audit(
            AuditEvent::new(
                AuditKind::LoginFailed,
                Subject::address(failure.address.as_str()),
                now,
            )
            .with_message(format!(
                "{} for {}",
                failure.kind.as_str(),
                username.unwrap_or("<none>")
            )),
        );

        let redirect = match failure.kind {
            FailureKind::BadCredentials => {
                self.on_bad_credentials(username, &failure.address, now)?
            }
            FailureKind::Disabled => self.on_disabled(username, now)?,
            FailureKind::Other => LoginRedirect::Error,
        };
        debug!(
            address = %failure.address,
            kind = failure.kind.as_str(),
            %redirect,
            "login failure handled"
        );
        Ok(redirect)
    }

    /// Handle a successful login.
    ///
    /// Clears the address's attempts and, if the account resolves, the
    /// account's attempts. Nothing is cleared while the address is banned
    /// or locked out. Returns whether counters were reset.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn on_success(&self, username: &str, address: &str) -> GuardResult<bool> {
        let now = self.clock.now();
        let address = Subject::address(address);

        let standing = self.ledger.standing(&address, now)?;
        if standing.is_blocked() {
            debug!(%address, %standing, "address blocked, counters kept");
            return Ok(false);
        }

        self.ledger.attempts().clear(&address)?;

        let username = username.trim();
        let subject = if username.is_empty() {
            address
        } else {
            let account = Subject::account(username);
            if self.directory.resolve_account(username).is_some() {
                self.ledger.attempts().clear(&account)?;
            }
            account
        };

        self.audit(AuditEvent::new(AuditKind::LoginSucceeded, subject, now));
        Ok(true)
    }

    /// Block state of an account, for the credential verifier.
    ///
    /// A verifier should reject a non-[`Standing::Clear`] account as
    /// [`FailureKind::Disabled`].
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn account_standing(&self, username: &str) -> GuardResult<Standing> {
        self.ledger
            .standing(&Subject::account(username.trim()), self.clock.now())
    }

    fn on_bad_credentials(
        &self,
        username: Option<&str>,
        address: &str,
        now: DateTime<Utc>,
    ) -> GuardResult<LoginRedirect> {
        let address = Subject::address(address);

        match self.policy.escalate(&self.ledger, &address, now)? {
            Escalation::Banned => {
                self.audit(
                    AuditEvent::new(AuditKind::AddressBanned, address.clone(), now)
                        .with_message(format!("{} has been banned", address.id())),
                );
                return Ok(LoginRedirect::IpBanned);
            }
            Escalation::LockedOut => {
                self.audit(
                    AuditEvent::new(AuditKind::AddressLocked, address.clone(), now)
                        .with_message(format!("{} has been locked out", address.id())),
                );
                if let Some(username) = username {
                    self.send_lockout_notice(username, now);
                }
                return Ok(LoginRedirect::IpLocked);
            }
            Escalation::AttemptRecorded => {}
        }

        let Some(account) = username.and_then(|name| self.directory.resolve_account(name)) else {
            return Ok(LoginRedirect::Error);
        };
        let subject = Subject::account(account.username.as_str());

        match self.policy.escalate(&self.ledger, &subject, now)? {
            Escalation::Banned => {
                self.audit(
                    AuditEvent::new(AuditKind::AccountBanned, subject, now)
                        .with_message(format!("{} has been banned", account.username)),
                );
                self.send_lockout_notice(&account.username, now);
                Ok(LoginRedirect::Banned)
            }
            Escalation::LockedOut => {
                self.audit(
                    AuditEvent::new(AuditKind::AccountLocked, subject, now)
                        .with_message(format!("{} has been locked out", account.username)),
                );
                self.send_lockout_notice(&account.username, now);
                Ok(LoginRedirect::Locked)
            }
            Escalation::AttemptRecorded => Ok(LoginRedirect::Error),
        }
    }

    fn on_disabled(
        &self,
        username: Option<&str>,
        now: DateTime<Utc>,
    ) -> GuardResult<LoginRedirect> {
        if let Some(username) = username {
            let standing = self.ledger.standing(&Subject::account(username), now)?;
            if let Some(redirect) = standing.redirect() {
                return Ok(redirect);
            }
        }
        // Disabled for some other reason.
        Ok(LoginRedirect::Locked)
    }

    /// Queue the lockout notice for `username`. Never fails the caller.
    fn send_lockout_notice(&self, username: &str, now: DateTime<Utc>) {
        if !self.config.notice.enabled {
            return;
        }
        let subject = Subject::account(username);

        let Some(email) = self.directory.resolve_email(username) else {
            self.audit(
                AuditEvent::new(AuditKind::LockoutEmailMissing, subject, now)
                    .with_message("no email address on file"),
            );
            return;
        };

        let notification = Notification::lockout(&self.config.notice, email.as_str());
        match self.mailer.send(notification) {
            Ok(()) => self.audit(
                AuditEvent::new(AuditKind::LockoutEmailQueued, subject, now).with_message(email),
            ),
            Err(err) => warn!(%subject, error = %err, "lockout notice not sent"),
        }
    }

    fn audit(&self, event: AuditEvent) {
        self.audit.log(&event);
    }
}

impl std::fmt::Debug for FailureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureOrchestrator")
            .field("ledger", &self.ledger)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
