//! Location of appdeck's own state.
//!
//! ```text
//! ~/.config/appdeck/          # or APPDECK_CONFIG_DIR
//!   config.json               # registry of installed apps
//!   transactions.json         # journal of in-flight installs
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable to override the state directory.
pub const CONFIG_DIR_ENV: &str = "APPDECK_CONFIG_DIR";

const CONFIG_FILE: &str = "config.json";
const JOURNAL_FILE: &str = "transactions.json";

/// Paths of appdeck's state files.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Directory holding the registry and the journal.
    pub root: PathBuf,
}

impl StorePaths {
    /// Resolves the state directory from `APPDECK_CONFIG_DIR` or the XDG
    /// config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is available.
    pub fn new() -> Result<Self> {
        let root = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .context("Cannot determine config directory. Set APPDECK_CONFIG_DIR.")?
                .join("appdeck"),
        };
        Ok(Self::with_root(root))
    }

    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Path of the registry document.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Path of the transaction journal.
    #[must_use]
    pub fn journal_file(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }
}

/// Default directory for installed bundles, `~/.local/share/appdeck`.
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn default_apps_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .context("Cannot determine data directory. Pass --apps-dir.")?
        .join("appdeck"))
}

/// Default directory for desktop entries, `~/.local/share/applications`.
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn default_desktop_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .context("Cannot determine data directory. Pass --desktop-dir.")?
        .join("applications"))
}
