//! Desktop integration of an installed bundle.
//!
//! The bundle extracts itself (`--appimage-extract`) into a scratch directory
//! outside the install tree. Its desktop entry and icon are copied out, the
//! entry is pointed at the installed bundle, and the menu tool registers it.
//! The scratch directory goes away when integration returns, whatever the
//! outcome.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};

use crate::errors::AppdeckError;
use crate::install::desktop_entry::{DesktopEntry, exec_line};
use crate::store::AppPaths;

/// Environment variable overriding the menu registration tool.
pub const DESKTOP_MENU_ENV: &str = "APPDECK_DESKTOP_MENU";

/// Variable that makes launched bundles skip third-party integration prompts.
pub const PROMPT_OPT_OUT_ENV: &str = "APPIMAGELAUNCHER_DISABLE";

const DEFAULT_DESKTOP_MENU: &str = "xdg-desktop-menu";
const EXTRACT_ROOT: &str = "squashfs-root";
const DIR_ICON: &str = ".DirIcon";
const SCRATCH_PREFIX: &str = "appdeck-extract-";

/// What a bundle declares about itself.
#[derive(Debug, Clone)]
pub struct BundleMetadata {
    /// Stem of the bundled desktop file.
    pub exec_name: String,
    pub entry: DesktopEntry,
    pub icon: PathBuf,
}

/// Reads the desktop entry and icon from an extracted bundle at `root`.
///
/// The first `*.desktop` file (by name) at the top level is the bundle's
/// entry. The icon is `.DirIcon`, or the entry's `Icon` name with a `.png`
/// or `.svg` extension. Only plain relative icon names are looked up, so the
/// icon always comes from inside `root`.
///
/// # Errors
///
/// Returns `IntegrationFailure` if either is missing.
pub fn read_metadata(root: &Path) -> Result<BundleMetadata> {
    let mut desktop_files: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| AppdeckError::filesystem(format!("failed to list {}", root.display()), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "desktop"))
        .collect();
    desktop_files.sort();

    let desktop = desktop_files.into_iter().next().ok_or_else(|| {
        AppdeckError::integration(format!("no desktop entry found in {}", root.display()))
    })?;
    let exec_name = desktop
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = std::fs::read_to_string(&desktop).map_err(|e| {
        AppdeckError::filesystem(format!("failed to read {}", desktop.display()), e)
    })?;
    let entry = DesktopEntry::parse(&text);

    let mut candidates = vec![root.join(DIR_ICON)];
    if let Some(icon) = entry.get("Icon").filter(|i| is_plain_name(i)) {
        candidates.push(root.join(format!("{icon}.png")));
        candidates.push(root.join(format!("{icon}.svg")));
    }
    let icon = candidates
        .into_iter()
        .find(|c| c.is_file())
        .ok_or_else(|| AppdeckError::integration(format!("no icon found for {exec_name}")))?;

    tracing::debug!(exec_name, icon = %icon.display(), "read bundle metadata");
    Ok(BundleMetadata {
        exec_name,
        entry,
        icon,
    })
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Where the icon copied from `source` goes. SVG icons keep their extension
/// since they are copied, not converted.
fn icon_destination(installed: &Path, source: &Path) -> PathBuf {
    if is_svg(source) {
        installed.with_extension("svg")
    } else {
        installed.to_path_buf()
    }
}

fn is_svg(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        return ext.eq_ignore_ascii_case("svg");
    }
    let mut head = [0u8; 256];
    let Ok(read) = std::fs::File::open(path).and_then(|mut f| f.read(&mut head)) else {
        return false;
    };
    let text = String::from_utf8_lossy(&head[..read]);
    let text = text.trim_start();
    text.starts_with("<svg") || text.starts_with("<?xml")
}

/// Runs `bundle --appimage-extract` inside `scratch` and returns the
/// extracted root.
///
/// # Errors
///
/// Returns `IntegrationFailure` if the bundle cannot run, exits non-zero or
/// produces no extraction root.
pub async fn deflate(bundle: &Path, scratch: &Path) -> Result<PathBuf> {
    tracing::debug!(bundle = %bundle.display(), scratch = %scratch.display(), "extracting bundle");
    let status = tokio::process::Command::new(bundle)
        .arg("--appimage-extract")
        .current_dir(scratch)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            AppdeckError::integration(format!("failed to execute {}: {e}", bundle.display()))
        })?;
    if !status.success() {
        return Err(AppdeckError::integration(format!(
            "{} --appimage-extract exited with {status}",
            bundle.display()
        ))
        .into());
    }

    let root = scratch.join(EXTRACT_ROOT);
    if !root.is_dir() {
        return Err(AppdeckError::integration(format!(
            "{} did not produce {EXTRACT_ROOT}",
            bundle.display()
        ))
        .into());
    }
    Ok(root)
}

/// Rewrites `entry` to launch the bundle at `paths` and writes it to the
/// desktop path.
///
/// # Errors
///
/// Returns a filesystem error if the file cannot be written.
pub fn write_desktop_entry(mut entry: DesktopEntry, paths: &AppPaths, prompt_opt_out: bool) -> Result<()> {
    entry.set_exec(&exec_line(&paths.app_image, prompt_opt_out));
    entry.set("Icon", &paths.icon.display().to_string());
    std::fs::write(&paths.desktop, entry.to_string()).map_err(|e| {
        AppdeckError::filesystem(format!("failed to write {}", paths.desktop.display()), e)
    })?;
    Ok(())
}

/// Points `link` at `target`, replacing whatever `link` was.
///
/// # Errors
///
/// Returns a filesystem error if the old link cannot be removed or the new
/// one cannot be created.
pub fn link_launcher(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppdeckError::filesystem(format!("failed to create {}", parent.display()), e)
        })?;
    }
    remove_launcher(link)?;
    std::os::unix::fs::symlink(target, link).map_err(|e| {
        AppdeckError::filesystem(
            format!("failed to link {} -> {}", link.display(), target.display()),
            e,
        )
    })?;
    Ok(())
}

/// Removes `link` if present, including dangling links.
///
/// # Errors
///
/// Returns a filesystem error if it exists and cannot be removed.
pub fn remove_launcher(link: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link).map_err(|e| {
            AppdeckError::filesystem(format!("failed to remove {}", link.display()), e)
        })?;
    }
    Ok(())
}

/// Performs desktop integration through an external menu tool.
#[derive(Debug, Clone)]
pub struct Integrator {
    menu_tool: String,
    /// Parent of scratch directories; the system temp dir when unset.
    scratch_root: Option<PathBuf>,
}

impl Integrator {
    /// Uses `APPDECK_DESKTOP_MENU` or `xdg-desktop-menu`.
    #[must_use]
    pub fn from_env() -> Self {
        let tool = std::env::var(DESKTOP_MENU_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESKTOP_MENU.to_string());
        Self::with_menu_tool(tool)
    }

    #[must_use]
    pub fn with_menu_tool(tool: impl Into<String>) -> Self {
        Self {
            menu_tool: tool.into(),
            scratch_root: None,
        }
    }

    /// Extracts bundles under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Integrates the bundle already installed at `paths.app_image`.
    ///
    /// Returns `paths` with the icon path the icon was actually copied to.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationFailure` for extraction, metadata and registration
    /// problems and filesystem errors for copies and writes.
    pub async fn integrate(&self, paths: &AppPaths, prompt_opt_out: bool) -> Result<AppPaths> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .context("Failed to create scratch directory")?;

        let root = deflate(&paths.app_image, scratch.path()).await?;
        let metadata = read_metadata(&root)?;

        let installed = AppPaths {
            icon: icon_destination(&paths.icon, &metadata.icon),
            ..paths.clone()
        };
        std::fs::copy(&metadata.icon, &installed.icon).map_err(|e| {
            AppdeckError::filesystem(
                format!("failed to copy icon to {}", installed.icon.display()),
                e,
            )
        })?;
        write_desktop_entry(metadata.entry, &installed, prompt_opt_out)?;
        self.register(&installed.desktop).await?;

        if let Some(link) = &installed.symlink {
            link_launcher(&installed.app_image, link)?;
        }

        if let Err(e) = scratch.close() {
            tracing::warn!("failed to remove scratch directory: {e}");
        }
        tracing::debug!(
            exec_name = %metadata.exec_name,
            desktop = %installed.desktop.display(),
            "integrated bundle"
        );
        Ok(installed)
    }

    /// Registers a desktop entry with the menu.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationFailure` if the tool is missing or fails.
    pub async fn register(&self, desktop: &Path) -> Result<()> {
        self.run_menu_tool(&[
            OsStr::new("install"),
            desktop.as_os_str(),
            OsStr::new("--novendor"),
        ])
        .await
    }

    /// Removes a desktop entry from the menu.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationFailure` if the tool is missing or fails.
    pub async fn unregister(&self, desktop: &Path) -> Result<()> {
        self.run_menu_tool(&[
            OsStr::new("uninstall"),
            desktop.as_os_str(),
            OsStr::new("--novendor"),
        ])
        .await
    }

    async fn run_menu_tool(&self, args: &[&OsStr]) -> Result<()> {
        let tool = which::which(&self.menu_tool).map_err(|_| {
            AppdeckError::integration(format!("{} not found in PATH", self.menu_tool))
        })?;
        tracing::debug!(tool = %tool.display(), ?args, "running menu tool");

        let output = tokio::process::Command::new(&tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                AppdeckError::integration(format!("failed to execute {}: {e}", tool.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppdeckError::integration(format!(
                "{} exited with {}: {}",
                self.menu_tool,
                output.status,
                stderr.trim()
            ))
            .into());
        }
        Ok(())
    }
}
