//! JSON documents on disk.
//!
//! Writers go through a temporary sibling file that is synced and then
//! renamed over the target, so a reader sees either the old document or the
//! new one and never a truncated file.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::AppdeckError;

/// Reads and decodes a JSON document. A missing file yields `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or decoded.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppdeckError::filesystem(
                format!("failed to read {}", path.display()),
                e,
            )
            .into());
        }
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Encodes `value` as pretty JSON and atomically replaces `path` with it.
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the parent directory, the temporary file or the final
/// rename fails.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        AppdeckError::filesystem(format!("failed to create {}", parent.display()), e)
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".appdeck-")
        .suffix(".json.tmp")
        .tempfile_in(parent)
        .map_err(|e| {
            AppdeckError::filesystem(
                format!("failed to create temporary file in {}", parent.display()),
                e,
            )
        })?;

    serde_json::to_writer_pretty(&mut temp, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    temp.write_all(b"\n")
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| {
            AppdeckError::filesystem(format!("failed to write {}", temp.path().display()), e)
        })?;

    temp.persist(path).map_err(|e| {
        AppdeckError::filesystem(format!("failed to replace {}", path.display()), e.error)
    })?;
    Ok(())
}
