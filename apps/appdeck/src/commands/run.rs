//! Run command for the appdeck CLI.
//!
//! Launches an installed bundle from the current directory.
//!
//! ```bash
//! appdeck run tool -- --some-flag file.txt
//! appdeck run tool --detached
//! ```
//!
//! In the foreground the app inherits stdio and its exit code becomes
//! appdeck's. Detached, it is spawned with null stdio and left running.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Args;

use crate::errors::AppdeckError;
use crate::store::{AppRecord, ConfigStore, StorePaths};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// App to launch.
    pub id: String,

    /// Return immediately and leave the app running.
    #[clap(long)]
    pub detached: bool,

    /// Arguments passed to the app.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the run command.
///
/// ## Exit Codes
///
/// - Returns `Ok(())` if the app exits with code 0 or was detached
/// - Returns `Err(AppdeckError::ProcessExitCode)` if it exits non-zero
///
/// # Errors
///
/// Returns an error if the app is not installed or cannot be started.
pub fn execute(args: &RunArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?.clone();
    let app = AppRecord::read(registry.app_config_path(&args.id)?, &registry)?;
    let bundle = &app.paths.app_image;

    let mut cmd = Command::new(bundle);
    cmd.args(&args.args);
    tracing::debug!(bundle = %bundle.display(), args = ?args.args, detached = args.detached, "launching");

    if args.detached {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", bundle.display()))?;
        return Ok(());
    }

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute {}", bundle.display()))?;

    if status.success() {
        Ok(())
    } else {
        Err(AppdeckError::process_exit_code(status.code().unwrap_or(1)).into())
    }
}
