//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clinic_guard::Subject;

/// guardctl - inspect and clear login lockouts and bans.
///
/// Subjects are written `address:<ip>` or `account:<username>`.
#[derive(Parser, Debug, Clone)]
#[command(name = "guardctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Guard record file.
    #[arg(short, long, env = "GUARD_STORE", default_value = "guard.json")]
    pub store: PathBuf,

    /// Guard configuration file (JSON). Defaults apply when omitted.
    #[arg(short, long, env = "GUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show records and block state for one subject.
    Status {
        /// Subject to inspect.
        subject: Subject,
    },

    /// List every subject that is banned or locked out right now.
    Blocked,

    /// Lift every ban on a subject.
    Unban {
        /// Subject to unban.
        subject: Subject,
    },

    /// Lift every lockout on a subject.
    Unlock {
        /// Subject to unlock.
        subject: Subject,
    },

    /// Forget a subject's failed attempts.
    Reset {
        /// Subject to reset.
        subject: Subject,
    },
}
