//! Install sources and update checks.
//!
//! Every installed app keeps a `source.json` next to its record. Its shape
//! depends on the `Source` field of the record: GitHub sources carry the
//! repository and release policy, HTTP and local sources carry nothing.

pub mod asset;
pub mod github;
pub mod platform;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::errors::AppdeckError;
use crate::store::SourceKind;
use crate::store::atomic;

pub use asset::{Asset, AssetOrigin};
pub use github::{GithubClient, GithubSource, ReleasePolicy};
pub use platform::Arch;

/// A newer release found by an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Version (tag) the app will be at after installing.
    pub version: String,
    pub asset: Asset,
    /// Whether the asset names the host architecture.
    pub exact: bool,
}

/// Where an app came from and how to look for updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Github(GithubSource),
    Http,
    Local,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NoSourceConfig {}

impl SourceDescriptor {
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Github(_) => SourceKind::Github,
            Self::Http => SourceKind::Http,
            Self::Local => SourceKind::Local,
        }
    }

    #[must_use]
    pub const fn supports_updates(&self) -> bool {
        matches!(self, Self::Github(_))
    }

    /// Checks for an update over `current_version`.
    ///
    /// Returns `Ok(None)` when the app is current.
    ///
    /// # Errors
    ///
    /// Returns `UpdateUnsupported` for HTTP and local sources, and whatever the
    /// source's own check raises otherwise.
    pub async fn check_update(
        &self,
        github: &GithubClient,
        current_version: &str,
        reinstall: bool,
        host: Option<Arch>,
    ) -> Result<Option<Update>> {
        match self {
            Self::Github(source) => {
                source
                    .check_update(github, current_version, reinstall, host)
                    .await
            }
            Self::Http | Self::Local => {
                Err(AppdeckError::update_unsupported(self.kind().as_str()).into())
            }
        }
    }

    /// Reads the source config at `path`, decoded according to `kind`.
    ///
    /// HTTP and local sources tolerate a missing file.
    ///
    /// # Errors
    ///
    /// Returns an error if a GitHub source config is missing or malformed.
    pub fn read(kind: SourceKind, path: &Path) -> Result<Self> {
        match kind {
            SourceKind::Github => {
                let source: GithubSource = atomic::read_json(path)?.ok_or_else(|| {
                    AppdeckError::filesystem(
                        format!("source config {} is missing", path.display()),
                        std::io::Error::from(std::io::ErrorKind::NotFound),
                    )
                })?;
                Ok(Self::Github(source))
            }
            SourceKind::Http => Ok(Self::Http),
            SourceKind::Local => Ok(Self::Local),
        }
    }

    /// Atomically writes the source config to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Self::Github(source) => atomic::write_json(path, source),
            Self::Http | Self::Local => atomic::write_json(path, &NoSourceConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github() -> SourceDescriptor {
        SourceDescriptor::Github(GithubSource {
            user_name: "owner".to_string(),
            repo_name: "repo".to_string(),
            release: ReleasePolicy::Tagged,
            tag_name: Some("v1.0".to_string()),
        })
    }

    #[test]
    fn only_github_supports_updates() {
        assert!(github().supports_updates());
        assert!(!SourceDescriptor::Http.supports_updates());
        assert!(!SourceDescriptor::Local.supports_updates());
    }

    #[test]
    fn save_then_read_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.json");

        let source = github();
        source.save(&path).unwrap();
        assert_eq!(SourceDescriptor::read(source.kind(), &path).unwrap(), source);

        SourceDescriptor::Http.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");
        assert_eq!(
            SourceDescriptor::read(SourceKind::Http, &path).unwrap(),
            SourceDescriptor::Http
        );
    }

    #[test]
    fn github_source_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SourceDescriptor::read(SourceKind::Github, &dir.path().join("none.json")).is_err());
        assert_eq!(
            SourceDescriptor::read(SourceKind::Local, &dir.path().join("none.json")).unwrap(),
            SourceDescriptor::Local
        );
    }

    #[tokio::test]
    async fn local_and_http_refuse_update_checks() {
        let client = GithubClient::with_base(reqwest::Client::new(), "http://127.0.0.1:9");
        for source in [SourceDescriptor::Http, SourceDescriptor::Local] {
            let err = source
                .check_update(&client, "1.0", false, Some(Arch::Amd64))
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<AppdeckError>(),
                Some(AppdeckError::UpdateUnsupported { .. })
            ));
        }
    }
}
