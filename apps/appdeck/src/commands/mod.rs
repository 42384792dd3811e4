//! Command modules for the appdeck CLI.
//!
//! ## Setup
//!
//! - [`init`] - Create the registry and app directories
//!
//! ## Installing and updating
//!
//! - [`install`] - Install from GitHub, a URL or a local file
//! - [`update`] - Check sources and reinstall newer releases
//! - [`tidy`] - Remove leftovers of interrupted installs
//!
//! ## Managing installed apps
//!
//! - [`list`] - List installed apps
//! - [`view`] - Show one app's record and source
//! - [`run`] - Launch an installed app
//! - [`uninstall`] - Remove apps
//! - [`app_config`] - Per-app settings such as renaming

pub mod app_config;
pub mod init;
pub mod install;
pub mod list;
pub mod run;
pub mod tidy;
pub mod uninstall;
pub mod update;
pub mod view;

use anyhow::Result;

use crate::http;
use crate::install::{Installable, Installer, Integrator};
use crate::store::{ConfigStore, StorePaths, TransactionJournal};

/// Prints `rows` as aligned `label: value` lines.
pub(crate) fn print_summary(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("  {label:<width$}  {value}");
    }
}

/// Runs `items` through the install pipeline and reports the outcome.
///
/// # Errors
///
/// Returns the error of the app that stopped the batch.
pub(crate) async fn run_batch(
    paths: &StorePaths,
    store: &mut ConfigStore,
    items: Vec<Installable>,
) -> Result<()> {
    let journal = TransactionJournal::new(paths);
    let integrator = Integrator::from_env();
    let mut installer = Installer::new(store, &journal, &integrator, http::download_client()?);

    let outcome = installer.install_batch(items).await;

    if !outcome.skipped.is_empty() {
        println!("Skipped: {}", outcome.skipped.join(", "));
    }
    match outcome.failed {
        Some((id, e)) => {
            println!(
                "Installed {}, failed 1. Run 'appdeck tidy-broken' to clean up {id}.",
                outcome.installed.len()
            );
            Err(e.context(format!("Failed to install {id}")))
        }
        None => {
            println!("Installed {} app(s).", outcome.installed.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_batch_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::with_root(dir.path().to_path_buf());
        let mut store = ConfigStore::new(&paths);
        run_batch(&paths, &mut store, Vec::new()).await.unwrap();
    }
}
