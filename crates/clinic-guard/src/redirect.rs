//! Login redirect reasons and account standing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the caller is being sent back to the login view.
///
/// Rendered as a bare query flag on the login path, e.g. `/login?iplocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginRedirect {
    /// The source address is banned.
    IpBanned,
    /// The source address is locked out.
    IpLocked,
    /// The account is banned.
    Banned,
    /// The account is locked out or otherwise disabled.
    Locked,
    /// Generic login failure.
    Error,
}

impl LoginRedirect {
    /// Query flag for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IpBanned => "ipbanned",
            Self::IpLocked => "iplocked",
            Self::Banned => "banned",
            Self::Locked => "locked",
            Self::Error => "error",
        }
    }

    /// Redirect target under `login_path`.
    #[must_use]
    pub fn location(&self, login_path: &str) -> String {
        format!("{login_path}?{}", self.as_str())
    }

    /// Whether this reason concerns the source address rather than an account.
    #[must_use]
    pub const fn is_address_block(&self) -> bool {
        matches!(self, Self::IpBanned | Self::IpLocked)
    }
}

impl fmt::Display for LoginRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective block state of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    /// No block in effect.
    Clear,
    /// An active lockout is in effect.
    Locked,
    /// A ban is in effect.
    Banned,
}

impl Standing {
    /// Returns the string representation of this standing.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Locked => "locked",
            Self::Banned => "banned",
        }
    }

    /// Whether a credential verifier should treat the account as disabled.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        !matches!(self, Self::Clear)
    }

    /// Account redirect for this standing, if blocked.
    #[must_use]
    pub const fn redirect(&self) -> Option<LoginRedirect> {
        match self {
            Self::Clear => None,
            Self::Locked => Some(LoginRedirect::Locked),
            Self::Banned => Some(LoginRedirect::Banned),
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LoginRedirect::IpBanned, "/login?ipbanned" ; "ip banned")]
    #[test_case(LoginRedirect::IpLocked, "/login?iplocked" ; "ip locked")]
    #[test_case(LoginRedirect::Banned, "/login?banned" ; "banned")]
    #[test_case(LoginRedirect::Locked, "/login?locked" ; "locked")]
    #[test_case(LoginRedirect::Error, "/login?error" ; "error")]
    fn test_redirect_location(reason: LoginRedirect, expected: &str) {
        assert_eq!(reason.location("/login"), expected);
    }

    #[test]
    fn test_redirect_custom_login_path() {
        assert_eq!(
            LoginRedirect::IpLocked.location("/portal/login"),
            "/portal/login?iplocked"
        );
    }

    #[test]
    fn test_address_block_flag() {
        assert!(LoginRedirect::IpBanned.is_address_block());
        assert!(!LoginRedirect::Locked.is_address_block());
    }

    #[test]
    fn test_standing_redirect() {
        assert_eq!(Standing::Clear.redirect(), None);
        assert_eq!(Standing::Locked.redirect(), Some(LoginRedirect::Locked));
        assert_eq!(Standing::Banned.redirect(), Some(LoginRedirect::Banned));
        assert!(Standing::Banned > Standing::Locked);
        assert!(!Standing::Clear.is_blocked());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&LoginRedirect::IpBanned).unwrap(),
            "\"ipbanned\""
        );
        assert_eq!(serde_json::to_string(&Standing::Locked).unwrap(), "\"locked\"");
    }
}
