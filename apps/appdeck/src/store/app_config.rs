//! Per-app configuration record.
//!
//! Each installed app owns a directory under the registry's apps dir:
//!
//! ```text
//! <apps_dir>/<id>/
//!   app.json          # AppRecord
//!   source.json       # source descriptor for updates
//!   <id>.AppImage
//!   <id>.png
//! ```
//!
//! The desktop entry lives in the shared desktop dir and the optional
//! launcher symlink in the symlinks dir.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::errors::AppdeckError;
use crate::store::atomic;
use crate::store::config::ConfigRegistry;

const APP_CONFIG_FILE: &str = "app.json";
const SOURCE_CONFIG_FILE: &str = "source.json";
const BUNDLE_SUFFIX: &str = ".appimage";

/// Where an app was installed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Github,
    Http,
    Local,
}

impl SourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Http => "http",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every path owned by one installed app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppPaths {
    pub dir: PathBuf,
    pub config: PathBuf,
    pub source_config: PathBuf,
    pub app_image: PathBuf,
    pub icon: PathBuf,
    pub desktop: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink: Option<PathBuf>,
}

impl AppPaths {
    /// Derives the canonical layout for `id` from the registry's directories.
    ///
    /// A symlink path is produced only when `link` is set and the registry has
    /// a symlinks directory.
    #[must_use]
    pub fn derive(registry: &ConfigRegistry, id: &str, link: bool) -> Self {
        let dir = registry.apps_dir.join(id);
        Self {
            config: dir.join(APP_CONFIG_FILE),
            source_config: dir.join(SOURCE_CONFIG_FILE),
            app_image: dir.join(format!("{id}.AppImage")),
            icon: dir.join(format!("{id}.png")),
            desktop: registry.desktop_dir.join(format!("{id}.desktop")),
            symlink: registry
                .symlinks_dir
                .as_ref()
                .filter(|_| link)
                .map(|links| links.join(id)),
            dir,
        }
    }
}

/// Persisted description of one installed app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppRecord {
    pub id: String,
    pub version: String,
    pub source: SourceKind,
    #[serde(default)]
    pub paths: AppPaths,
}

impl AppRecord {
    /// Loads the record at `path`.
    ///
    /// Records written without a bundle path get their layout rebuilt from the
    /// registry directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn read(path: &Path, registry: &ConfigRegistry) -> Result<Self> {
        let mut record: Self = atomic::read_json(path)?.ok_or_else(|| {
            AppdeckError::filesystem(
                format!("app config {} is missing", path.display()),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )
        })?;
        if record.paths.app_image.as_os_str().is_empty() {
            tracing::debug!(id = %record.id, "rebuilding app paths from registry");
            let link = record.paths.symlink.is_some();
            record.paths = AppPaths::derive(registry, &record.id, link);
        }
        Ok(record)
    }

    /// Atomically writes the record to its own config path.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self) -> Result<()> {
        atomic::write_json(&self.paths.config, self)
    }
}

/// Normalizes free-form text into an app id.
///
/// Turns whitespace into `-`, drops everything outside `[A-Za-z0-9-]`,
/// lower-cases what is left and trims hyphens from both ends. Non-ASCII
/// letters are dropped rather than folded. The result is idempotent under
/// normalization and may be empty.
#[must_use]
pub fn normalize_app_id(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_ascii_alphanumeric() || c == '-' {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect();
    mapped.trim_matches('-').to_string()
}

/// Normalizes `raw` and rejects ids that end up empty.
///
/// # Errors
///
/// Returns `InvalidAppId` when nothing usable remains.
pub fn parse_app_id(raw: &str) -> Result<String> {
    let id = normalize_app_id(raw);
    if id.is_empty() {
        return Err(AppdeckError::invalid_app_id(raw).into());
    }
    Ok(id)
}

/// Derives an id from a bundle file name or URL path segment, dropping a
/// trailing `.AppImage` in any letter case.
#[must_use]
pub fn app_id_from_file_name(name: &str) -> String {
    let stem = if name.to_ascii_lowercase().ends_with(BUNDLE_SUFFIX) {
        &name[..name.len() - BUNDLE_SUFFIX.len()]
    } else {
        name
    };
    normalize_app_id(stem)
}
