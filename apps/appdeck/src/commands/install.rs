//! Install command for the appdeck CLI.
//!
//! ## Usage
//!
//! ```bash
//! appdeck install github owner/repo                    # latest release
//! appdeck install github owner/repo --release prerelease
//! appdeck install github owner/repo --tag v1.2.0
//! appdeck install http https://example.com/Tool.AppImage --version 1.0
//! appdeck install local ./Tool.AppImage --id tool --link
//! ```
//!
//! Every variant resolves the app id and the asset, prints a summary and
//! asks for confirmation before handing the app to the install pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::commands::{print_summary, run_batch};
use crate::errors::AppdeckError;
use crate::http;
use crate::install::Installable;
use crate::install::progress::format_bytes;
use crate::prompt::confirm;
use crate::source::github::parse_repo;
use crate::source::{Arch, Asset, GithubClient, GithubSource, ReleasePolicy, SourceDescriptor};
use crate::store::app_config::{app_id_from_file_name, parse_app_id};
use crate::store::{AppPaths, AppRecord, ConfigRegistry, ConfigStore, SourceKind, StorePaths};

/// Version recorded for sources that carry none.
const UNKNOWN_VERSION: &str = "0.0.0";

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    #[command(subcommand)]
    pub source: InstallSource,
}

/// Where to install from.
#[derive(Subcommand)]
pub enum InstallSource {
    /// Install from a GitHub repository's releases.
    Github(GithubArgs),
    /// Install from a direct download URL.
    Http(HttpArgs),
    /// Install from a bundle already on disk.
    Local(LocalArgs),
}

/// Flags shared by every install source.
#[derive(Args)]
pub struct CommonArgs {
    /// App id (default: derived from the repository or file name).
    #[clap(long)]
    pub id: Option<String>,

    /// Create a launcher symlink in the configured symlinks directory.
    #[clap(long)]
    pub link: bool,

    /// Answer yes to every prompt.
    #[clap(short = 'y', long = "assume-yes")]
    pub assume_yes: bool,
}

#[derive(Args)]
pub struct GithubArgs {
    /// Repository as `owner/repo` or a github.com URL.
    pub repo: String,

    /// Which release to follow.
    #[clap(long, value_enum, default_value_t = ReleasePolicy::Latest)]
    pub release: ReleasePolicy,

    /// Tag to install; implies `--release tagged`.
    #[clap(long)]
    pub tag: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct HttpArgs {
    /// Direct URL of the bundle.
    pub url: String,

    /// Version to record (default: 0.0.0).
    #[clap(long)]
    pub version: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct LocalArgs {
    /// Path of the bundle.
    pub path: PathBuf,

    /// Version to record (default: 0.0.0).
    #[clap(long)]
    pub version: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the registry is missing, the source cannot be resolved,
/// no asset fits this host, or the pipeline fails.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?.clone();

    let resolved = match &args.source {
        InstallSource::Github(github) => resolve_github(&registry, github).await?,
        InstallSource::Http(http_args) => resolve_http(&registry, http_args).await?,
        InstallSource::Local(local) => resolve_local(&registry, local)?,
    };
    let Some((item, common)) = resolved else {
        return Ok(());
    };

    print_item_summary(&item);
    if !confirm("Do you want to proceed?", common.assume_yes)? {
        println!("Aborted.");
        return Ok(());
    }

    run_batch(&paths, &mut store, vec![item]).await
}

async fn resolve_github<'a>(
    registry: &ConfigRegistry,
    args: &'a GithubArgs,
) -> Result<Option<(Installable, &'a CommonArgs)>> {
    let (owner, repo) = parse_repo(&args.repo).ok_or_else(|| {
        AppdeckError::invalid_arguments(format!("{} is not a GitHub repository", args.repo))
    })?;
    let policy = release_policy(args.release, args.tag.as_deref())?;
    let id = parse_app_id(args.common.id.as_deref().unwrap_or(&repo))?;
    let Some(app_paths) = prepare(registry, &id, &args.common)? else {
        return Ok(None);
    };

    let source = GithubSource {
        user_name: owner,
        repo_name: repo,
        release: policy,
        tag_name: args.tag.clone(),
    };
    let github = GithubClient::from_env(http::api_client()?);
    let release = source.fetch_release(&github).await?;

    let (asset, exact) = release
        .choose_asset(Arch::detect())
        .into_choice()
        .ok_or_else(|| AppdeckError::no_matching_asset(&release.tag_name))?;
    if !exact {
        println!(
            "Warning: {} names no architecture, assuming it runs on this machine.",
            asset.name
        );
    }
    tracing::debug!(asset = %asset.name, exact, "chose asset");

    let item = Installable {
        app: AppRecord {
            id,
            version: release.tag_name.clone(),
            source: SourceKind::Github,
            paths: app_paths,
        },
        source: SourceDescriptor::Github(source),
        asset: asset.to_asset(),
    };
    Ok(Some((item, &args.common)))
}

async fn resolve_http<'a>(
    registry: &ConfigRegistry,
    args: &'a HttpArgs,
) -> Result<Option<(Installable, &'a CommonArgs)>> {
    let default_id = args
        .url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
        .map(app_id_from_file_name)
        .unwrap_or_default();
    let id = parse_app_id(args.common.id.as_deref().unwrap_or(&default_id))?;
    let Some(app_paths) = prepare(registry, &id, &args.common)? else {
        return Ok(None);
    };

    let asset = Asset::probe(&http::api_client()?, &args.url).await?;
    let item = Installable {
        app: AppRecord {
            id,
            version: version_or_default(args.version.as_deref()),
            source: SourceKind::Http,
            paths: app_paths,
        },
        source: SourceDescriptor::Http,
        asset,
    };
    Ok(Some((item, &args.common)))
}

fn resolve_local<'a>(
    registry: &ConfigRegistry,
    args: &'a LocalArgs,
) -> Result<Option<(Installable, &'a CommonArgs)>> {
    let asset = Asset::local(std::path::absolute(&args.path).map_err(|e| {
        AppdeckError::filesystem(format!("invalid path {}", args.path.display()), e)
    })?)?;
    let default_id = args
        .path
        .file_name()
        .map(|name| app_id_from_file_name(&name.to_string_lossy()))
        .unwrap_or_default();
    let id = parse_app_id(args.common.id.as_deref().unwrap_or(&default_id))?;
    let Some(app_paths) = prepare(registry, &id, &args.common)? else {
        return Ok(None);
    };

    let item = Installable {
        app: AppRecord {
            id,
            version: version_or_default(args.version.as_deref()),
            source: SourceKind::Local,
            paths: app_paths,
        },
        source: SourceDescriptor::Local,
        asset,
    };
    Ok(Some((item, &args.common)))
}

/// Checks the link flag and existing installs, and derives the app layout.
/// `None` means the user declined to reinstall.
fn prepare(registry: &ConfigRegistry, id: &str, common: &CommonArgs) -> Result<Option<AppPaths>> {
    if common.link && registry.symlinks_dir.is_none() {
        return Err(AppdeckError::invalid_arguments(
            "--link needs a symlinks directory, run 'appdeck init --overwrite --symlinks-dir DIR'",
        )
        .into());
    }
    if registry.installed.contains_key(id)
        && !confirm(
            &format!("{id} is already installed. Reinstall it?"),
            common.assume_yes,
        )?
    {
        println!("Aborted.");
        return Ok(None);
    }
    Ok(Some(AppPaths::derive(registry, id, common.link)))
}

/// Reconciles `--release` and `--tag`.
fn release_policy(requested: ReleasePolicy, tag: Option<&str>) -> Result<ReleasePolicy> {
    match (requested, tag) {
        (ReleasePolicy::Tagged, None) => Err(AppdeckError::invalid_arguments(
            "--release tagged requires --tag",
        )
        .into()),
        (ReleasePolicy::Latest | ReleasePolicy::Tagged, Some(_)) => Ok(ReleasePolicy::Tagged),
        (other, Some(_)) => Err(AppdeckError::invalid_arguments(format!(
            "--tag cannot be combined with --release {}",
            other.as_str()
        ))
        .into()),
        (policy, None) => Ok(policy),
    }
}

fn version_or_default(version: Option<&str>) -> String {
    version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_VERSION)
        .to_string()
}

fn print_item_summary(item: &Installable) {
    let paths = &item.app.paths;
    let size = if item.asset.size == 0 {
        "unknown".to_string()
    } else {
        format_bytes(item.asset.size)
    };
    println!("Installing {}:", item.app.id);
    print_summary(&[
        ("Version", item.app.version.clone()),
        ("Source", item.app.source.to_string()),
        ("Asset", item.asset.locator()),
        ("Bundle", paths.app_image.display().to_string()),
        ("Desktop entry", paths.desktop.display().to_string()),
        (
            "Symlink",
            paths
                .symlink
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
        ),
        ("Download size", size),
    ]);
}
