//! View command for the appdeck CLI.

use anyhow::Result;
use clap::Args;

use crate::commands::print_summary;
use crate::source::SourceDescriptor;
use crate::store::{AppRecord, ConfigStore, StorePaths};

/// Arguments for the view command.
#[derive(Args)]
pub struct ViewArgs {
    /// App to show.
    pub id: String,
}

/// Executes the view command.
///
/// # Errors
///
/// Returns an error if the app is not installed or its files are unreadable.
#[allow(clippy::unused_async)]
pub async fn execute(args: &ViewArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?.clone();
    let app = AppRecord::read(registry.app_config_path(&args.id)?, &registry)?;

    let mut rows = vec![
        ("Id", app.id.clone()),
        ("Version", app.version.clone()),
        ("Source", app.source.to_string()),
    ];
    if let SourceDescriptor::Github(github) = SourceDescriptor::read(app.source, &app.paths.source_config)? {
        rows.push(("Repository", format!("{}/{}", github.user_name, github.repo_name)));
        rows.push(("Release", github.release.as_str().to_string()));
        if let Some(tag) = github.tag_name {
            rows.push(("Tag", tag));
        }
    }

    let p = &app.paths;
    rows.extend([
        ("Directory", p.dir.display().to_string()),
        ("Config", p.config.display().to_string()),
        ("Source config", p.source_config.display().to_string()),
        ("Bundle", p.app_image.display().to_string()),
        ("Icon", p.icon.display().to_string()),
        ("Desktop entry", p.desktop.display().to_string()),
        (
            "Symlink",
            p.symlink
                .as_ref()
                .map_or_else(|| "none".to_string(), |s| s.display().to_string()),
        ),
    ]);
    print_summary(&rows);
    Ok(())
}
