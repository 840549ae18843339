//! Per-request enforcement.
//!
//! [`RequestGate`] runs before application logic on every inbound request
//! and turns away callers whose address is banned or locked out. It only
//! reads the ledger.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::error::GuardResult;
use crate::redirect::{LoginRedirect, Standing};
use crate::store::Ledger;
use crate::subject::Subject;

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRequest {
    /// Caller's source address.
    pub address: String,
    /// Request path.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
}

impl GateRequest {
    /// Request for `path` from `address` with no query.
    pub fn new(address: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            path: path.into(),
            query: None,
        }
    }

    /// Set the query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Whether the query string carries `key`, with or without a value.
    #[must_use]
    pub fn has_query_flag(&self, key: &str) -> bool {
        self.query.as_deref().is_some_and(|query| {
            query
                .split('&')
                .any(|pair| pair.split_once('=').map_or(pair, |(k, _)| k) == key)
        })
    }
}

/// What the host should do with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GateDecision {
    /// Let the request through unmodified.
    Pass,
    /// Send the caller to the login view.
    Redirect {
        /// Why the caller is blocked.
        reason: LoginRedirect,
        /// Redirect target.
        location: String,
        /// Whether any session for the caller must be dropped first.
        invalidate_session: bool,
    },
}

impl GateDecision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Address-level ban and lockout filter.
#[derive(Clone)]
pub struct RequestGate {
    ledger: Ledger,
    login_path: String,
    clock: Arc<dyn Clock>,
}

impl RequestGate {
    /// Create a gate reading `ledger`.
    #[must_use]
    pub fn new(ledger: Ledger, config: &GuardConfig) -> Self {
        Self {
            ledger,
            login_path: config.login_path.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Take time from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decide whether `request` may proceed.
    ///
    /// A blocked caller may still load the login view that already shows
    /// the matching flag, so the redirect does not loop.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn check(&self, request: &GateRequest) -> GuardResult<GateDecision> {
        let address = Subject::address(request.address.as_str());
        let standing = self.ledger.standing(&address, self.clock.now())?;

        let reason = match standing {
            Standing::Clear => return Ok(GateDecision::Pass),
            Standing::Banned => LoginRedirect::IpBanned,
            Standing::Locked => LoginRedirect::IpLocked,
        };

        if self.is_informed(request, reason) {
            debug!(%address, %reason, path = %request.path, "blocked caller on login view");
            return Ok(GateDecision::Pass);
        }

        debug!(%address, %reason, path = %request.path, "request redirected");
        Ok(GateDecision::Redirect {
            reason,
            location: reason.location(&self.login_path),
            invalidate_session: true,
        })
    }

    fn is_informed(&self, request: &GateRequest, reason: LoginRedirect) -> bool {
        request.path.contains(&self.login_path) && request.has_query_flag(reason.as_str())
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("login_path", &self.login_path)
            .finish_non_exhaustive()
    }
}
