//! `guardctl` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use clinic_guard_cli::CliError;
use clinic_guard_cli::cli::{Cli, Commands};
use clinic_guard_cli::commands::{ClearCommand, ClearTarget, StatusCommand, open_admin};
use clinic_guard_cli::output::OutputFormat;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let admin = open_admin(&cli.store, cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Status { subject } => {
            StatusCommand::new(&admin).subject(&mut stdout, &format, &subject)?;
        }
        Commands::Blocked => {
            StatusCommand::new(&admin).blocked(&mut stdout, &format)?;
        }
        Commands::Unban { subject } => {
            ClearCommand::new(&admin).execute(&mut stdout, &format, ClearTarget::Bans, &subject)?;
        }
        Commands::Unlock { subject } => {
            ClearCommand::new(&admin).execute(
                &mut stdout,
                &format,
                ClearTarget::Lockouts,
                &subject,
            )?;
        }
        Commands::Reset { subject } => {
            ClearCommand::new(&admin).execute(
                &mut stdout,
                &format,
                ClearTarget::Attempts,
                &subject,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_against_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("guard.json");
        let cli = Cli::parse_from(["guardctl", "--store", store.to_str().unwrap(), "blocked"]);
        assert!(run(cli).is_ok());
        // Reads never create the file.
        assert!(!store.exists());
    }

    #[test]
    fn test_run_with_bad_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{ "login_path": "login" }"#).unwrap();
        let store = dir.path().join("guard.json");

        let cli = Cli::parse_from([
            "guardctl",
            "--store",
            store.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "blocked",
        ]);
        assert!(matches!(run(cli), Err(CliError::Guard(_))));
    }
}
