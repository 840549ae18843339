//! # clinic-guard-cli
//!
//! `guardctl`, the operator tool for the login guard's record file.
//!
//! Provides commands for:
//! - Inspecting one address or account
//! - Listing everything currently banned or locked out
//! - Lifting bans and lockouts, resetting failed attempts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use output::OutputFormat;
