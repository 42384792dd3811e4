//! Streaming a bundle into place.
//!
//! Bytes go to a hidden temporary file next to the destination, which is
//! renamed over it only once the stream has ended. An interrupted download
//! leaves the destination as it was.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use crate::errors::AppdeckError;
use crate::install::fetch::AssetStream;
use crate::install::progress::ProgressTracker;
use crate::source::Asset;

/// Downloads `asset` to `dest`, reporting every chunk to `tracker`, and
/// marks the result executable.
///
/// # Errors
///
/// Returns network errors from the stream and filesystem errors from the
/// temporary file, the rename or the permission change.
pub async fn download_asset(
    http: &reqwest::Client,
    asset: &Asset,
    dest: &Path,
    tracker: &mut ProgressTracker,
) -> Result<()> {
    let parent = dest
        .parent()
        .with_context(|| format!("{} has no parent directory", dest.display()))?;
    let temp_path = tempfile::Builder::new()
        .prefix(".appdeck-")
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| {
            AppdeckError::filesystem(
                format!("failed to create temporary file in {}", parent.display()),
                e,
            )
        })?
        .into_temp_path();

    let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| {
        AppdeckError::filesystem(format!("failed to open {}", temp_path.display()), e)
    })?;
    let mut stream = AssetStream::open(http, asset).await?;
    tracing::debug!(source = %asset.locator(), temp = %temp_path.display(), "downloading");

    while let Some(chunk) = stream.next_chunk().await? {
        file.write_all(&chunk).await.map_err(|e| {
            AppdeckError::filesystem(format!("failed to write {}", temp_path.display()), e)
        })?;
        tracker.record(chunk.len() as u64);
    }

    file.flush().await.map_err(|e| {
        AppdeckError::filesystem(format!("failed to flush {}", temp_path.display()), e)
    })?;
    file.sync_all().await.map_err(|e| {
        AppdeckError::filesystem(format!("failed to sync {}", temp_path.display()), e)
    })?;
    drop(file.into_std().await);

    temp_path.persist(dest).map_err(|e| {
        AppdeckError::filesystem(format!("failed to move bundle to {}", dest.display()), e.error)
    })?;
    std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        AppdeckError::filesystem(format!("failed to make {} executable", dest.display()), e)
    })?;
    Ok(())
}
