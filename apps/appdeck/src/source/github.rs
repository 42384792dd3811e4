//! GitHub releases as an install and update source.
//!
//! The REST API base can be redirected with `APPDECK_GITHUB_API`, which is
//! how tests and GitHub Enterprise users point appdeck elsewhere.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::AppdeckError;
use crate::http::status_error;
use crate::source::asset::{Asset, AssetMatch, choose_asset};
use crate::source::platform::Arch;
use crate::source::Update;

/// Environment variable overriding the API base URL.
pub const GITHUB_API_ENV: &str = "APPDECK_GITHUB_API";

const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Which release of a repository to follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReleasePolicy {
    /// The release GitHub marks as latest.
    #[default]
    Latest,
    /// The newest release flagged as a pre-release.
    #[value(name = "prerelease")]
    PreRelease,
    /// One fixed tag.
    Tagged,
    /// The newest published release of any kind.
    Any,
}

impl ReleasePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::PreRelease => "prerelease",
            Self::Tagged => "tagged",
            Self::Any => "any",
        }
    }
}

/// A release as returned by the API. Only the fields appdeck reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl GithubAsset {
    #[must_use]
    pub fn to_asset(&self) -> Asset {
        Asset::network(self.browser_download_url.clone(), self.size)
    }
}

impl GithubRelease {
    /// Matches this release's assets against `host`.
    #[must_use]
    pub fn choose_asset(&self, host: Option<Arch>) -> AssetMatch<&GithubAsset> {
        choose_asset(&self.assets, |a| a.name.as_str(), host)
    }
}

/// First release flagged as a pre-release, in API order (newest first).
#[must_use]
pub fn select_prerelease(releases: Vec<GithubRelease>) -> Option<GithubRelease> {
    releases.into_iter().find(|r| r.prerelease && !r.draft)
}

/// First release that is not a draft, in API order.
#[must_use]
pub fn select_any(releases: Vec<GithubRelease>) -> Option<GithubRelease> {
    releases.into_iter().find(|r| !r.draft)
}

/// Splits `owner/repo` or a github.com URL into its two parts.
#[must_use]
pub fn parse_repo(input: &str) -> Option<(String, String)> {
    let trimmed = input.trim().trim_end_matches('/');
    let path = ["https://github.com/", "http://github.com/", "github.com/"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    let owner = parts.next()?.trim();
    let repo = parts.next()?.trim();
    if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Thin client over the releases endpoints.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base: String,
}

impl GithubClient {
    /// Uses `APPDECK_GITHUB_API` or the public API.
    #[must_use]
    pub fn from_env(http: reqwest::Client) -> Self {
        let base = std::env::var(GITHUB_API_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string());
        Self::with_base(http, &base)
    }

    #[must_use]
    pub fn with_base(http: reqwest::Client, base: &str) -> Self {
        Self {
            http,
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }

    fn releases_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/releases", self.base)
    }

    /// # Errors
    ///
    /// Returns a network error on transport or status failure.
    pub async fn latest_release(&self, owner: &str, repo: &str) -> Result<GithubRelease> {
        let url = format!("{}/latest", self.releases_url(owner, repo));
        self.get_json(&url).await
    }

    /// # Errors
    ///
    /// Returns a network error on transport or status failure.
    pub async fn tagged_release(&self, owner: &str, repo: &str, tag: &str) -> Result<GithubRelease> {
        let url = format!("{}/tags/{tag}", self.releases_url(owner, repo));
        self.get_json(&url).await
    }

    /// # Errors
    ///
    /// Returns a network error on transport or status failure.
    pub async fn releases(&self, owner: &str, repo: &str) -> Result<Vec<GithubRelease>> {
        let url = self.releases_url(owner, repo);
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AppdeckError::network_with_source(format!("failed to fetch {url}"), e))?;

        if !response.status().is_success() {
            return Err(status_error(response.status(), url));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppdeckError::network_with_source(format!("failed to read {url}"), e))?;

        serde_json::from_str(&text).with_context(|| format!("Failed to parse response from {url}"))
    }
}

/// Source config for apps installed from GitHub (`source.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GithubSource {
    pub user_name: String,
    pub repo_name: String,
    #[serde(default)]
    pub release: ReleasePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
}

impl GithubSource {
    /// Fetches the release this source follows.
    ///
    /// # Errors
    ///
    /// Returns a network error, `InvalidArguments` for a tagged policy without
    /// a tag, or `NoMatchingAsset` when no release satisfies the policy.
    pub async fn fetch_release(&self, client: &GithubClient) -> Result<GithubRelease> {
        let (owner, repo) = (self.user_name.as_str(), self.repo_name.as_str());
        match self.release {
            ReleasePolicy::Latest => client.latest_release(owner, repo).await,
            ReleasePolicy::Tagged => {
                let tag = self
                    .tag_name
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| {
                        AppdeckError::invalid_arguments("a tagged release needs a tag name")
                    })?;
                client.tagged_release(owner, repo, tag).await
            }
            ReleasePolicy::PreRelease => select_prerelease(client.releases(owner, repo).await?)
                .ok_or_else(|| no_release(owner, repo, "pre-release")),
            ReleasePolicy::Any => select_any(client.releases(owner, repo).await?)
                .ok_or_else(|| no_release(owner, repo, "published release")),
        }
    }

    /// Looks for a newer release than `current_version`.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors and `NoMatchingAsset`.
    pub async fn check_update(
        &self,
        client: &GithubClient,
        current_version: &str,
        reinstall: bool,
        host: Option<Arch>,
    ) -> Result<Option<Update>> {
        let release = self.fetch_release(client).await?;
        update_from_release(&release, current_version, reinstall, host)
    }
}

fn no_release(owner: &str, repo: &str, what: &str) -> anyhow::Error {
    AppdeckError::no_matching_asset(format!("{owner}/{repo}: no {what} found")).into()
}

/// Decides whether `release` is an update over `current_version`.
///
/// The same tag is only reinstalled when asked to.
///
/// # Errors
///
/// Returns `NoMatchingAsset` if the release has no bundle for this host.
pub fn update_from_release(
    release: &GithubRelease,
    current_version: &str,
    reinstall: bool,
    host: Option<Arch>,
) -> Result<Option<Update>> {
    if release.tag_name == current_version && !reinstall {
        return Ok(None);
    }
    let (asset, exact) = release
        .choose_asset(host)
        .into_choice()
        .ok_or_else(|| AppdeckError::no_matching_asset(&release.tag_name))?;
    Ok(Some(Update {
        version: release.tag_name.clone(),
        asset: asset.to_asset(),
        exact,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str, prerelease: bool, draft: bool, assets: &[&str]) -> GithubRelease {
        GithubRelease {
            tag_name: tag.to_string(),
            draft,
            prerelease,
            assets: assets
                .iter()
                .map(|name| GithubAsset {
                    name: (*name).to_string(),
                    browser_download_url: format!("https://dl.example/{name}"),
                    size: 10,
                })
                .collect(),
        }
    }

    #[test]
    fn parses_repo_forms() {
        let expected = Some(("owner".to_string(), "repo".to_string()));
        assert_eq!(parse_repo("owner/repo"), expected);
        assert_eq!(parse_repo("https://github.com/owner/repo"), expected);
        assert_eq!(parse_repo("https://github.com/owner/repo.git"), expected);
        assert_eq!(parse_repo("github.com/owner/repo/"), expected);
        assert_eq!(parse_repo("owner"), None);
        assert_eq!(parse_repo("owner/repo/extra"), None);
        assert_eq!(parse_repo("/repo"), None);
    }

    #[test]
    fn prerelease_policy_takes_first_flagged() {
        let releases = vec![
            release("v3", false, false, &[]),
            release("v3-rc1", true, true, &[]),
            release("v2-rc1", true, false, &[]),
            release("v1-rc1", true, false, &[]),
        ];
        assert_eq!(select_prerelease(releases).unwrap().tag_name, "v2-rc1");
    }

    #[test]
    fn any_policy_skips_drafts() {
        let releases = vec![
            release("v4", false, true, &[]),
            release("v3-rc", true, false, &[]),
        ];
        assert_eq!(select_any(releases).unwrap().tag_name, "v3-rc");
        assert!(select_any(vec![release("v1", false, true, &[])]).is_none());
    }

    #[test]
    fn same_tag_is_up_to_date() {
        let rel = release("v1.0", false, false, &["App.AppImage"]);
        assert!(
            update_from_release(&rel, "v1.0", false, Some(Arch::Amd64))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn reinstall_forces_same_tag() {
        let rel = release("v1.0", false, false, &["App-x86_64.AppImage"]);
        let update = update_from_release(&rel, "v1.0", true, Some(Arch::Amd64))
            .unwrap()
            .unwrap();
        assert_eq!(update.version, "v1.0");
        assert!(update.exact);
        assert_eq!(
            update.asset,
            Asset::network("https://dl.example/App-x86_64.AppImage", 10)
        );
    }

    #[test]
    fn new_tag_without_usable_asset_fails() {
        let rel = release("v2.0", false, false, &["App-aarch64.AppImage", "notes.txt"]);
        let err = update_from_release(&rel, "v1.0", false, Some(Arch::Amd64)).unwrap_err();
        assert_eq!(err.to_string(), "no valid asset in release v2.0");
    }

    #[test]
    fn generic_asset_is_a_partial_update() {
        let rel = release("v2.0", false, false, &["App.AppImage"]);
        let update = update_from_release(&rel, "v1.0", false, Some(Arch::Amd64))
            .unwrap()
            .unwrap();
        assert!(!update.exact);
    }

    #[test]
    fn source_config_uses_pascal_case() {
        let source = GithubSource {
            user_name: "owner".to_string(),
            repo_name: "repo".to_string(),
            release: ReleasePolicy::PreRelease,
            tag_name: None,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["UserName"], "owner");
        assert_eq!(json["RepoName"], "repo");
        assert_eq!(json["Release"], "prerelease");
        assert!(json.get("TagName").is_none());
    }

    #[test]
    fn release_payload_ignores_extra_fields() {
        let json = r#"{
            "tag_name": "v1.2.0",
            "name": "Release 1.2.0",
            "prerelease": false,
            "assets": [
                {"name": "App-x86_64.AppImage", "size": 42,
                 "browser_download_url": "https://dl.example/App-x86_64.AppImage",
                 "content_type": "application/octet-stream"}
            ]
        }"#;
        let rel: GithubRelease = serde_json::from_str(json).unwrap();
        assert!(!rel.draft);
        assert_eq!(rel.assets[0].size, 42);
    }

    #[test]
    fn client_trims_base_url() {
        let client = GithubClient::with_base(reqwest::Client::new(), "http://localhost:9/ ");
        assert_eq!(
            client.releases_url("o", "r"),
            "http://localhost:9/repos/o/r/releases"
        );
    }

    #[tokio::test]
    async fn tagged_policy_requires_tag() {
        let source = GithubSource {
            user_name: "o".to_string(),
            repo_name: "r".to_string(),
            release: ReleasePolicy::Tagged,
            tag_name: Some(String::new()),
        };
        let client = GithubClient::with_base(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = source.fetch_release(&client).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppdeckError>(),
            Some(AppdeckError::InvalidArguments { .. })
        ));
    }
}
