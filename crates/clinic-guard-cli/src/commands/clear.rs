//! Clearing commands: `unban`, `unlock` and `reset`.

use std::io::Write;

use clinic_guard::{GuardAdmin, Subject};
use tracing::info;

use crate::error::CliError;
use crate::output::{ClearResult, OutputFormat};

/// Which records a clearing command removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    /// Bans.
    Bans,
    /// Lockouts.
    Lockouts,
    /// Failed attempts.
    Attempts,
}

impl ClearTarget {
    /// Returns the string representation of this target.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bans => "bans",
            Self::Lockouts => "lockouts",
            Self::Attempts => "attempts",
        }
    }
}

/// Clear command executor.
pub struct ClearCommand<'a> {
    admin: &'a GuardAdmin,
}

impl<'a> ClearCommand<'a> {
    /// Create a clear command over `admin`.
    #[must_use]
    pub const fn new(admin: &'a GuardAdmin) -> Self {
        Self { admin }
    }

    /// Remove `target` records for `subject` and print what was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written or output fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        target: ClearTarget,
        subject: &Subject,
    ) -> Result<(), CliError> {
        let removed = match target {
            ClearTarget::Bans => self.admin.lift_ban(subject)?,
            ClearTarget::Lockouts => self.admin.lift_lockout(subject)?,
            ClearTarget::Attempts => self.admin.reset_attempts(subject)?,
        };
        info!(%subject, target = target.as_str(), removed, "records cleared");

        let result = ClearResult {
            subject: subject.clone(),
            cleared: target.as_str(),
            removed,
        };
        format.write(writer, &result)
    }
}
