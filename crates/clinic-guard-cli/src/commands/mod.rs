//! CLI command implementations.
//!
//! - [`status`] - per-subject report and blocked listing
//! - [`clear`] - lifting bans and lockouts, resetting attempts

pub mod clear;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use clinic_guard::{GuardAdmin, GuardConfig, JsonRecordStore, Ledger};
use tracing::debug;

use crate::error::CliError;

pub use clear::{ClearCommand, ClearTarget};
pub use status::StatusCommand;

/// Open the record file at `store` and wrap it in an admin handle.
///
/// # Errors
///
/// Returns an error if the configuration or the record file cannot be read.
pub fn open_admin(store: &Path, config: Option<&Path>) -> Result<GuardAdmin, CliError> {
    let config = match config {
        Some(path) => GuardConfig::from_json_file(path)?,
        None => GuardConfig::default(),
    };
    let records = JsonRecordStore::open(store)?;
    debug!(store = %store.display(), "guard store opened");
    Ok(GuardAdmin::new(Ledger::new(Arc::new(records), &config)))
}
