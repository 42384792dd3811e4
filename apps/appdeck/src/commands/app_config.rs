//! App-config command for the appdeck CLI.
//!
//! ```bash
//! appdeck app-config set-id old-name new-name
//! ```

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::errors::AppdeckError;
use crate::install::Integrator;
use crate::install::desktop_entry::DesktopEntry;
use crate::install::integrate::{link_launcher, remove_launcher, write_desktop_entry};
use crate::store::app_config::parse_app_id;
use crate::store::{AppPaths, AppRecord, ConfigStore, StorePaths};

/// Arguments for the app-config command.
#[derive(Args)]
pub struct AppConfigArgs {
    #[command(subcommand)]
    pub command: AppConfigCommand,
}

#[derive(Subcommand)]
pub enum AppConfigCommand {
    /// Rename an installed app.
    ///
    /// Moves its directory, bundle, icon, desktop entry and symlink to the
    /// layout of the new id.
    SetId(SetIdArgs),
}

#[derive(Args)]
pub struct SetIdArgs {
    /// Current id.
    pub from: String,
    /// New id.
    pub to: String,
}

/// Executes the app-config command.
///
/// # Errors
///
/// See [`set_id`].
pub async fn execute(args: &AppConfigArgs) -> Result<()> {
    match &args.command {
        AppConfigCommand::SetId(set_id_args) => set_id(set_id_args).await,
    }
}

/// Renames an app.
///
/// The rename is not journaled. The registry is written last, so an
/// interrupted rename leaves the old id registered while its directory may
/// already have moved; `uninstall` of the old id then removes what is left
/// under the old layout, and the moved directory must be removed by hand.
///
/// # Errors
///
/// Returns an error if `from` is not installed, `to` is invalid or taken, or
/// a file cannot be moved.
pub async fn set_id(args: &SetIdArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?.clone();

    let app = AppRecord::read(registry.app_config_path(&args.from)?, &registry)?;
    let to = parse_app_id(&args.to)?;
    if to == app.id {
        println!("{to} already has that id.");
        return Ok(());
    }
    if registry.installed.contains_key(&to) {
        return Err(AppdeckError::invalid_arguments(format!("{to} is already installed")).into());
    }

    let mut new_paths = AppPaths::derive(&registry, &to, app.paths.symlink.is_some());
    if let Some(ext) = app.paths.icon.extension() {
        new_paths.icon.set_extension(ext);
    }
    if new_paths.dir.exists() {
        return Err(AppdeckError::invalid_arguments(format!(
            "{} already exists",
            new_paths.dir.display()
        ))
        .into());
    }

    rename(&app.paths.dir, &new_paths.dir)?;
    for (old, new) in [
        (&app.paths.app_image, &new_paths.app_image),
        (&app.paths.icon, &new_paths.icon),
        (&app.paths.config, &new_paths.config),
        (&app.paths.source_config, &new_paths.source_config),
    ] {
        relocate(old, &new_paths.dir, new)?;
    }

    if app.paths.desktop.exists() {
        let integrator = Integrator::from_env();
        let text = std::fs::read_to_string(&app.paths.desktop).map_err(|e| {
            AppdeckError::filesystem(format!("failed to read {}", app.paths.desktop.display()), e)
        })?;
        if let Err(e) = integrator.unregister(&app.paths.desktop).await {
            println!("Warning: failed to unregister {}: {e}", app.paths.desktop.display());
        }
        std::fs::remove_file(&app.paths.desktop).map_err(|e| {
            AppdeckError::filesystem(
                format!("failed to remove {}", app.paths.desktop.display()),
                e,
            )
        })?;
        write_desktop_entry(
            DesktopEntry::parse(&text),
            &new_paths,
            !registry.enable_integration_prompt,
        )?;
        integrator.register(&new_paths.desktop).await?;
    }

    if let Some(old_link) = &app.paths.symlink {
        remove_launcher(old_link)?;
    }
    if let Some(new_link) = &new_paths.symlink {
        link_launcher(&new_paths.app_image, new_link)?;
    }

    let from = app.id.clone();
    let renamed = AppRecord {
        id: to.clone(),
        paths: new_paths,
        ..app
    };
    renamed.save()?;
    store.update(|registry| {
        registry.installed.remove(&from);
        registry
            .installed
            .insert(to.clone(), renamed.paths.config.clone());
        Ok(())
    })?;

    println!("Renamed {from} to {to}.");
    Ok(())
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|e| {
        AppdeckError::filesystem(
            format!("failed to move {} to {}", from.display(), to.display()),
            e,
        )
        .into()
    })
}

/// Moves a file that travelled with the app directory to its new name.
fn relocate(old: &Path, new_dir: &Path, target: &Path) -> Result<()> {
    let Some(name) = old.file_name() else {
        return Ok(());
    };
    let current = new_dir.join(name);
    if current != target && current.exists() {
        rename(&current, target)?;
    }
    Ok(())
}
