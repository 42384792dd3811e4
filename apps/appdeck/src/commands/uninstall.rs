//! Uninstall command for the appdeck CLI.
//!
//! Removes the desktop entry, the launcher symlink and the app directory,
//! then drops the app from the registry.
//!
//! ```bash
//! appdeck uninstall tool
//! ```

use anyhow::Result;
use clap::Args;

use crate::errors::AppdeckError;
use crate::install::Integrator;
use crate::install::integrate::remove_launcher;
use crate::prompt::confirm;
use crate::store::{AppPaths, AppRecord, ConfigRegistry, ConfigStore, SourceKind, StorePaths};

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Apps to remove.
    #[clap(required = true)]
    pub ids: Vec<String>,

    /// Answer yes to every prompt.
    #[clap(short = 'y', long = "assume-yes")]
    pub assume_yes: bool,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if an id is not installed or a path cannot be removed.
pub async fn execute(args: &UninstallArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?.clone();

    let mut apps = Vec::with_capacity(args.ids.len());
    for id in &args.ids {
        apps.push(load_app(&registry, id)?);
    }

    println!("Will uninstall: {}", args.ids.join(", "));
    if !confirm("Do you want to proceed?", args.assume_yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let integrator = Integrator::from_env();
    for app in apps {
        remove_app(&integrator, &app).await?;
        store.update(|registry| {
            registry.installed.remove(&app.id);
            Ok(())
        })?;
        println!("Uninstalled {}.", app.id);
    }
    Ok(())
}

/// Reads the record of `id`. A registered app whose record is gone gets its
/// layout derived from the registry instead, keeping the launcher only if it
/// still points at the app's bundle.
fn load_app(registry: &ConfigRegistry, id: &str) -> Result<AppRecord> {
    let config = registry.app_config_path(id)?;
    if config.exists() {
        return AppRecord::read(config, registry);
    }
    tracing::warn!(id, config = %config.display(), "app config missing, using derived paths");
    let mut paths = AppPaths::derive(registry, id, true);
    paths.symlink = paths
        .symlink
        .filter(|link| std::fs::read_link(link).is_ok_and(|target| target == paths.app_image));
    Ok(AppRecord {
        id: id.to_string(),
        version: String::new(),
        source: SourceKind::Local,
        paths,
    })
}

async fn remove_app(integrator: &Integrator, app: &AppRecord) -> Result<()> {
    let paths = &app.paths;
    if paths.desktop.exists() {
        if let Err(e) = integrator.unregister(&paths.desktop).await {
            println!("Warning: failed to unregister {}: {e}", paths.desktop.display());
        }
        std::fs::remove_file(&paths.desktop).map_err(|e| {
            AppdeckError::filesystem(format!("failed to remove {}", paths.desktop.display()), e)
        })?;
    }
    if let Some(link) = &paths.symlink {
        remove_launcher(link)?;
    }
    if paths.dir.exists() {
        std::fs::remove_dir_all(&paths.dir).map_err(|e| {
            AppdeckError::filesystem(format!("failed to remove {}", paths.dir.display()), e)
        })?;
    }
    tracing::debug!(id = %app.id, "removed app files");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn registry(root: &Path) -> ConfigRegistry {
        let mut registry = ConfigRegistry::new(root.join("apps"), root.join("desktop"));
        registry.symlinks_dir = Some(root.join("bin"));
        registry
            .installed
            .insert("demo".to_string(), root.join("apps/demo/app.json"));
        registry
    }

    #[test]
    fn unregistered_app_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = load_app(&registry(root.path()), "ghost").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppdeckError>(),
            Some(AppdeckError::AppNotInstalled { .. })
        ));
    }

    #[test]
    fn app_without_record_falls_back_to_derived_paths() {
        let root = tempfile::tempdir().unwrap();
        let registry = registry(root.path());

        let app = load_app(&registry, "demo").unwrap();
        assert_eq!(app.paths.dir, root.path().join("apps/demo"));
        assert_eq!(app.paths.desktop, root.path().join("desktop/demo.desktop"));
        assert!(app.paths.symlink.is_none());
    }

    #[test]
    fn fallback_keeps_only_launchers_pointing_at_the_bundle() {
        let root = tempfile::tempdir().unwrap();
        let registry = registry(root.path());
        let bin = root.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::os::unix::fs::symlink(root.path().join("apps/demo/demo.AppImage"), bin.join("demo"))
            .unwrap();

        let app = load_app(&registry, "demo").unwrap();
        assert_eq!(app.paths.symlink, Some(bin.join("demo")));

        std::fs::remove_file(bin.join("demo")).unwrap();
        std::os::unix::fs::symlink("/usr/bin/true", bin.join("demo")).unwrap();
        assert!(load_app(&registry, "demo").unwrap().paths.symlink.is_none());
    }

    #[tokio::test]
    async fn removing_a_half_deleted_app_succeeds() {
        let root = tempfile::tempdir().unwrap();
        let registry = registry(root.path());
        std::fs::create_dir_all(root.path().join("apps/demo")).unwrap();
        std::fs::write(root.path().join("apps/demo/demo.png"), "PNG").unwrap();

        let app = load_app(&registry, "demo").unwrap();
        remove_app(&Integrator::with_menu_tool("true"), &app).await.unwrap();
        assert!(!root.path().join("apps/demo").exists());
    }
}
