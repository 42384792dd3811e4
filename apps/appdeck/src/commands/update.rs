//! Update command for the appdeck CLI.
//!
//! ```bash
//! appdeck update tool           # one app
//! appdeck update --all -y       # everything that can be updated
//! appdeck update tool --reinstall
//! ```

use anyhow::Result;
use clap::Args;

use crate::commands::run_batch;
use crate::errors::AppdeckError;
use crate::http;
use crate::install::Installable;
use crate::prompt::confirm;
use crate::source::{Arch, GithubClient, SourceDescriptor};
use crate::store::{AppRecord, ConfigStore, StorePaths};

/// Arguments for the update command.
#[derive(Args)]
pub struct UpdateArgs {
    /// Apps to update.
    #[clap(required_unless_present = "all")]
    pub ids: Vec<String>,

    /// Update every installed app whose source supports updates.
    #[clap(long, conflicts_with = "ids")]
    pub all: bool,

    /// Reinstall even when already at the latest release.
    #[clap(long)]
    pub reinstall: bool,

    /// Answer yes to every prompt.
    #[clap(short = 'y', long = "assume-yes")]
    pub assume_yes: bool,
}

/// Executes the update command.
///
/// # Errors
///
/// Returns an error if an id is not installed, a named app's source cannot
/// be updated, an update check fails, or the pipeline fails.
pub async fn execute(args: &UpdateArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?.clone();

    let ids: Vec<String> = if args.all {
        registry.installed.keys().cloned().collect()
    } else {
        args.ids.clone()
    };
    if ids.is_empty() {
        println!("No applications are installed.");
        return Ok(());
    }

    let github = GithubClient::from_env(http::api_client()?);
    let host = Arch::detect();
    let mut items = Vec::new();

    for id in ids {
        let app = AppRecord::read(registry.app_config_path(&id)?, &registry)?;
        let source = SourceDescriptor::read(app.source, &app.paths.source_config)?;

        if !source.supports_updates() {
            if args.all {
                println!("Skipping {id}: {} sources do not support updates.", app.source);
                continue;
            }
            return Err(AppdeckError::update_unsupported(app.source.as_str()).into());
        }

        match source
            .check_update(&github, &app.version, args.reinstall, host)
            .await?
        {
            None => println!("{id} is up to date ({}).", app.version),
            Some(update) => {
                println!("{id}: {} -> {}", app.version, update.version);
                if !update.exact {
                    tracing::warn!(id = %id, "update asset names no architecture");
                }
                items.push(Installable {
                    app: AppRecord {
                        version: update.version,
                        ..app
                    },
                    source,
                    asset: update.asset,
                });
            }
        }
    }

    if items.is_empty() {
        return Ok(());
    }
    if !confirm(
        &format!("Install {} update(s)?", items.len()),
        args.assume_yes,
    )? {
        println!("Aborted.");
        return Ok(());
    }
    run_batch(&paths, &mut store, items).await
}
