//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use clinic_guard::{Subject, SubjectReport};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

impl TableDisplay for SubjectReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Subject: {}", self.subject)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Standing:         {}", self.standing)?;
        writeln!(writer)?;
        writeln!(writer, "Records")?;
        writeln!(writer, "  Attempts:       {}", self.attempts)?;
        writeln!(writer, "  Lockouts:       {}", self.lockouts)?;
        writeln!(writer, "  Bans:           {}", self.bans)?;
        writeln!(writer)?;
        writeln!(writer, "Locked until:     {}", fmt_time(self.locked_until))?;
        writeln!(writer, "Banned at:        {}", fmt_time(self.banned_at))?;
        Ok(())
    }
}

/// Subjects currently blocked.
#[derive(Debug, Clone, Serialize)]
pub struct BlockedList {
    /// Blocked subjects, bans first.
    pub subjects: Vec<SubjectReport>,
}

impl TableDisplay for BlockedList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.subjects.is_empty() {
            writeln!(writer, "No blocked subjects")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<40}  {:<8}  {:>8}  {:<23}",
            "SUBJECT", "STANDING", "LOCKOUTS", "UNTIL"
        )?;
        writeln!(writer, "{}", "─".repeat(85))?;

        for report in &self.subjects {
            let until = if report.is_banned() {
                "permanent".to_string()
            } else {
                fmt_time(report.locked_until)
            };
            writeln!(
                writer,
                "{:<40}  {:<8}  {:>8}  {:<23}",
                report.subject.to_string(),
                report.standing.as_str(),
                report.lockouts,
                until
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} subject(s)", self.subjects.len())?;
        Ok(())
    }
}

/// Result of a clearing command.
#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    /// Subject the records were cleared for.
    pub subject: Subject,
    /// Which records were cleared (`bans`, `lockouts` or `attempts`).
    pub cleared: &'static str,
    /// Number of records removed.
    pub removed: u64,
}

impl TableDisplay for ClearResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.removed == 0 {
            writeln!(writer, "No {} on record for {}", self.cleared, self.subject)?;
        } else {
            writeln!(
                writer,
                "Removed {} {} for {}",
                self.removed, self.cleared, self.subject
            )?;
        }
        Ok(())
    }
}
