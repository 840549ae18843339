//! Read-only commands: `status` and `blocked`.

use std::io::Write;

use clinic_guard::{GuardAdmin, Subject};

use crate::error::CliError;
use crate::output::{BlockedList, OutputFormat};

/// Status command executor.
pub struct StatusCommand<'a> {
    admin: &'a GuardAdmin,
}

impl<'a> StatusCommand<'a> {
    /// Create a status command over `admin`.
    #[must_use]
    pub const fn new(admin: &'a GuardAdmin) -> Self {
        Self { admin }
    }

    /// Print the report for one subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or output fails.
    pub fn subject<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        subject: &Subject,
    ) -> Result<(), CliError> {
        let report = self.admin.standing(subject)?;
        format.write(writer, &report)
    }

    /// Print every currently blocked subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or output fails.
    pub fn blocked<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let list = BlockedList {
            subjects: self.admin.blocked_subjects()?,
        };
        format.write(writer, &list)
    }
}
