//! Init command for the appdeck CLI.
//!
//! Writes the registry and creates the directories it points at.
//!
//! ```bash
//! appdeck init                                  # XDG defaults
//! appdeck init --apps-dir ~/Apps --symlinks-dir ~/.local/bin
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::errors::AppdeckError;
use crate::store::paths::{default_apps_dir, default_desktop_dir};
use crate::store::{ConfigRegistry, ConfigStore, StorePaths};

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Directory for installed bundles (default: ~/.local/share/appdeck).
    #[clap(long)]
    pub apps_dir: Option<PathBuf>,

    /// Directory for desktop entries (default: ~/.local/share/applications).
    #[clap(long)]
    pub desktop_dir: Option<PathBuf>,

    /// Directory for `--link` launchers, usually one on PATH.
    #[clap(long)]
    pub symlinks_dir: Option<PathBuf>,

    /// Let bundles show third-party desktop integration prompts.
    #[clap(long)]
    pub integration_prompt: bool,

    /// Replace an existing configuration, keeping its installed apps.
    #[clap(long)]
    pub overwrite: bool,
}

/// Executes the init command.
///
/// # Errors
///
/// Returns an error if a configuration exists and `--overwrite` was not
/// given, or if directories or the registry cannot be written.
#[allow(clippy::unused_async)]
pub async fn execute(args: &InitArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);

    let installed = if store.exists() {
        if !args.overwrite {
            return Err(AppdeckError::invalid_arguments(format!(
                "{} already exists, pass --overwrite to replace it",
                store.path().display()
            ))
            .into());
        }
        store.load()?.installed.clone()
    } else {
        Default::default()
    };

    let apps_dir = absolute(args.apps_dir.clone().map_or_else(default_apps_dir, Ok)?)?;
    let desktop_dir = absolute(args.desktop_dir.clone().map_or_else(default_desktop_dir, Ok)?)?;
    let symlinks_dir = args.symlinks_dir.clone().map(absolute).transpose()?;

    for dir in [Some(&apps_dir), Some(&desktop_dir), symlinks_dir.as_ref()]
        .into_iter()
        .flatten()
    {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppdeckError::filesystem(format!("failed to create {}", dir.display()), e)
        })?;
    }

    let mut registry = ConfigRegistry::new(apps_dir, desktop_dir);
    registry.symlinks_dir = symlinks_dir;
    registry.enable_integration_prompt = args.integration_prompt;
    registry.installed = installed;
    store.save(registry)?;

    println!("Configuration written to {}", store.path().display());
    Ok(())
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    std::path::absolute(&path).with_context(|| format!("Invalid path {}", path.display()))
}
