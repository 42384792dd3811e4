//! Downloadable bundles and picking the right one for this host.

use std::path::PathBuf;

use anyhow::Result;

use crate::errors::AppdeckError;
use crate::http::status_error;
use crate::source::platform::Arch;

const BUNDLE_EXTENSION: &str = ".appimage";

/// Where the bytes of a bundle come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    Network(String),
    Local(PathBuf),
}

/// A bundle ready to be fetched. `size` is 0 when the origin did not say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub origin: AssetOrigin,
    pub size: u64,
}

impl Asset {
    #[must_use]
    pub fn network(url: impl Into<String>, size: u64) -> Self {
        Self {
            origin: AssetOrigin::Network(url.into()),
            size,
        }
    }

    /// A bundle already on disk, sized from its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a readable regular file.
    pub fn local(path: PathBuf) -> Result<Self> {
        let meta = std::fs::metadata(&path).map_err(|e| {
            AppdeckError::filesystem(format!("cannot read {}", path.display()), e)
        })?;
        if !meta.is_file() {
            return Err(AppdeckError::invalid_arguments(format!(
                "{} is not a file",
                path.display()
            ))
            .into());
        }
        Ok(Self {
            origin: AssetOrigin::Local(path),
            size: meta.len(),
        })
    }

    /// Resolves a direct URL, sizing it from the response's content length.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails or is not successful.
    pub async fn probe(http: &reqwest::Client, url: &str) -> Result<Self> {
        let response = http.get(url).send().await.map_err(|e| {
            AppdeckError::network_with_source(format!("failed to connect to {url}"), e)
        })?;
        if !response.status().is_success() {
            return Err(status_error(response.status(), url));
        }
        let size = response.content_length().unwrap_or(0);
        tracing::debug!(url, size, "probed asset");
        Ok(Self::network(url, size))
    }

    /// URL or path, for display.
    #[must_use]
    pub fn locator(&self) -> String {
        match &self.origin {
            AssetOrigin::Network(url) => url.clone(),
            AssetOrigin::Local(path) => path.display().to_string(),
        }
    }
}

/// Outcome of matching a release's assets against the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetMatch<T> {
    /// No bundle fits this host.
    NoMatch,
    /// A bundle that names no architecture at all.
    Partial(T),
    /// A bundle that names the host architecture.
    Exact(T),
}

impl<T> AssetMatch<T> {
    /// The chosen asset, with `true` for an exact match.
    pub fn into_choice(self) -> Option<(T, bool)> {
        match self {
            Self::NoMatch => None,
            Self::Partial(asset) => Some((asset, false)),
            Self::Exact(asset) => Some((asset, true)),
        }
    }
}

/// Picks the bundle for `host` among `assets`.
///
/// Only names ending in `.AppImage` (any case) are considered. A name that
/// carries the host's architecture wins outright; otherwise the first name
/// without any known architecture is the fallback. Names for other
/// architectures are never chosen, and neither is anything when the host
/// architecture is unknown and every candidate names one.
pub fn choose_asset<'a, T>(
    assets: &'a [T],
    name_of: impl Fn(&T) -> &str,
    host: Option<Arch>,
) -> AssetMatch<&'a T> {
    let mut fallback = None;
    for asset in assets {
        let name = name_of(asset);
        if !name.to_ascii_lowercase().ends_with(BUNDLE_EXTENSION) {
            continue;
        }
        if host.is_some_and(|arch| arch.is_named_in(name)) {
            return AssetMatch::Exact(asset);
        }
        if fallback.is_none() && Arch::named_in(name).is_none() {
            fallback = Some(asset);
        }
    }
    fallback.map_or(AssetMatch::NoMatch, AssetMatch::Partial)
}
