#![warn(clippy::pedantic)]

//! # appdeck
//!
//! Installs AppImage bundles from GitHub releases, direct URLs or local
//! files, integrates them with the desktop menu and keeps them updated.
//!
//! ## Subcommands
//!
//! - `init` - Create the registry and app directories
//! - `install github|http|local` - Install a bundle
//! - `update` - Install newer releases of installed apps
//! - `uninstall` - Remove apps
//! - `list` - List installed apps
//! - `view` - Show an app's record
//! - `run` - Launch an installed app
//! - `tidy-broken` - Remove leftovers of interrupted installs
//! - `app-config set-id` - Rename an app
//!
//! ## Examples
//!
//! ```bash
//! appdeck init --symlinks-dir ~/.local/bin
//! appdeck install github owner/repo --link
//! appdeck update --all
//! ```

mod commands;
mod errors;
mod http;
mod install;
mod logging;
mod prompt;
mod source;
mod store;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{app_config, init, install as install_cmd, list, run, tidy, uninstall, update, view};
use errors::AppdeckError;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("APPDECK_BUILD_INFO"), ")");

/// AppImage installer and updater.
#[derive(Parser)]
#[command(
    name = "appdeck",
    version,
    long_version = LONG_VERSION,
    about = "Install, update and integrate AppImage bundles",
    after_help = "\
ENVIRONMENT VARIABLES:
    APPDECK_CONFIG_DIR      State directory (default: ~/.config/appdeck)
    APPDECK_GITHUB_API      GitHub API base URL (default: https://api.github.com)
    APPDECK_DESKTOP_MENU    Menu registration tool (default: xdg-desktop-menu)
    APPDECK_LOG             Log filter, e.g. appdeck=debug"
)]
pub struct Cli {
    /// Print diagnostic logs to stderr.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the appdeck CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Create the configuration and app directories.
    Init(init::InitArgs),

    /// Install a bundle.
    ///
    /// Downloads the bundle, extracts its desktop entry and icon, registers
    /// it with the desktop menu and records it in the registry.
    Install(install_cmd::InstallArgs),

    /// Update installed apps.
    ///
    /// Checks each app's source for a newer release and installs the ones
    /// found as a single batch.
    Update(update::UpdateArgs),

    /// Uninstall apps.
    Uninstall(uninstall::UninstallArgs),

    /// List installed apps.
    List,

    /// Show an installed app's record.
    View(view::ViewArgs),

    /// Run an installed app.
    Run(run::RunArgs),

    /// Remove leftovers of interrupted installs.
    TidyBroken(tidy::TidyArgs),

    /// Change per-app settings.
    AppConfig(app_config::AppConfigArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing anything (the launched app already did). For all other errors,
/// prints the error chain and returns 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(AppdeckError::ProcessExitCode { code }) = e.downcast_ref::<AppdeckError>() {
        return *code;
    }
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Init(args) => init::execute(&args).await,
        Commands::Install(args) => install_cmd::execute(&args).await,
        Commands::Update(args) => update::execute(&args).await,
        Commands::Uninstall(args) => uninstall::execute(&args).await,
        Commands::List => list::execute().await,
        Commands::View(args) => view::execute(&args).await,
        Commands::Run(args) => run::execute(&args),
        Commands::TidyBroken(args) => tidy::execute(&args).await,
        Commands::AppConfig(args) => app_config::execute(&args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_code_errors_pass_through() {
        let err: anyhow::Error = AppdeckError::process_exit_code(42).into();
        assert_eq!(handle_error(&err), 42);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err: anyhow::Error = AppdeckError::app_not_installed("demo").into();
        assert_eq!(handle_error(&err), 1);
    }

    #[test]
    fn parses_install_github_flags() {
        let cli = Cli::try_parse_from([
            "appdeck", "install", "github", "owner/repo", "--release", "prerelease", "--link", "-y",
        ])
        .unwrap();
        let Commands::Install(args) = cli.command else {
            panic!("expected install");
        };
        let install_cmd::InstallSource::Github(github) = args.source else {
            panic!("expected github source");
        };
        assert_eq!(github.repo, "owner/repo");
        assert_eq!(github.release, source::ReleasePolicy::PreRelease);
        assert!(github.common.link);
        assert!(github.common.assume_yes);
    }

    #[test]
    fn update_requires_ids_or_all() {
        assert!(Cli::try_parse_from(["appdeck", "update"]).is_err());
        assert!(Cli::try_parse_from(["appdeck", "update", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["appdeck", "update", "a", "--all"]).is_err());
    }

    #[test]
    fn run_passes_trailing_arguments() {
        let cli = Cli::try_parse_from(["appdeck", "run", "demo", "--", "--flag", "file"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.args, vec!["--flag", "file"]);
    }
}
