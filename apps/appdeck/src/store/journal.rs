//! Transaction journal for installs.
//!
//! Before an install touches the filesystem it records every directory and
//! file it may create. The entry is removed once the app is registered, so
//! whatever is still listed belongs to an install that never finished and
//! can be swept by `tidy-broken`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::errors::AppdeckError;
use crate::store::atomic;
use crate::store::paths::StorePaths;

/// Paths an unfinished install may have created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingInstall {
    #[serde(default)]
    pub involved_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub involved_files: Vec<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JournalDocument {
    #[serde(default)]
    pending_installations: BTreeMap<String, PendingInstall>,
}

/// What a sweep removed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TidyReport {
    /// App ids whose entries were cleared.
    pub cleared: Vec<String>,
    /// Paths that existed and were deleted.
    pub removed: Vec<PathBuf>,
    /// App ids kept because one of their paths could not be deleted.
    pub retained: Vec<String>,
}

impl TidyReport {
    /// True when there was nothing to clean.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty() && self.retained.is_empty()
    }
}

/// Handle on `transactions.json`.
#[derive(Debug, Clone)]
pub struct TransactionJournal {
    path: PathBuf,
}

impl TransactionJournal {
    #[must_use]
    pub fn new(paths: &StorePaths) -> Self {
        Self::at(paths.journal_file())
    }

    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Records that the install of `id` is about to touch `dirs` and `files`.
    ///
    /// An older entry for the same id is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or written.
    pub fn begin(&self, id: &str, dirs: Vec<PathBuf>, files: Vec<PathBuf>) -> Result<()> {
        tracing::debug!(id, ?dirs, ?files, "journal begin");
        self.modify(|doc| {
            doc.pending_installations.insert(
                id.to_string(),
                PendingInstall {
                    involved_dirs: dirs,
                    involved_files: files,
                },
            );
        })
    }

    /// Marks the install of `id` as committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or written.
    pub fn end(&self, id: &str) -> Result<()> {
        tracing::debug!(id, "journal end");
        self.modify(|doc| {
            doc.pending_installations.remove(id);
        })
    }

    /// Unfinished installs by app id.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal exists but cannot be decoded.
    pub fn pending(&self) -> Result<BTreeMap<String, PendingInstall>> {
        Ok(self.read()?.pending_installations)
    }

    /// Deletes every path recorded by unfinished installs and clears their
    /// entries. Paths that are already gone are skipped. An entry with a path
    /// that fails to delete stays in the journal for the next sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or written.
    pub fn tidy(&self) -> Result<TidyReport> {
        let mut doc = self.read()?;
        let mut report = TidyReport::default();
        if doc.pending_installations.is_empty() {
            return Ok(report);
        }

        let ids: Vec<String> = doc.pending_installations.keys().cloned().collect();
        for id in ids {
            let Some(entry) = doc.pending_installations.get(&id) else {
                continue;
            };
            let mut clean = true;
            for dir in &entry.involved_dirs {
                clean &= remove_path(dir, true, &mut report.removed);
            }
            for file in &entry.involved_files {
                clean &= remove_path(file, false, &mut report.removed);
            }
            if clean {
                doc.pending_installations.remove(&id);
                report.cleared.push(id);
            } else {
                report.retained.push(id);
            }
        }

        atomic::write_json(&self.path, &doc)?;
        Ok(report)
    }

    fn read(&self) -> Result<JournalDocument> {
        Ok(atomic::read_json(&self.path)?.unwrap_or_default())
    }

    fn modify(&self, change: impl FnOnce(&mut JournalDocument)) -> Result<()> {
        let mut doc = self.read()?;
        change(&mut doc);
        atomic::write_json(&self.path, &doc)
    }
}

/// Removes `path` if present. Returns false when removal failed.
fn remove_path(path: &Path, recursive: bool, removed: &mut Vec<PathBuf>) -> bool {
    let result = match std::fs::symlink_metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
        Err(e) => Err(e),
        Ok(meta) if recursive && meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
    };
    match result {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed leftover");
            removed.push(path.to_path_buf());
            true
        }
        Err(e) => {
            let err = AppdeckError::filesystem(format!("failed to remove {}", path.display()), e);
            tracing::error!("{err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal(dir: &Path) -> TransactionJournal {
        TransactionJournal::at(dir.join("transactions.json"))
    }

    #[test]
    fn missing_journal_has_nothing_pending() {
        let dir = tempfile::tempdir().unwrap();
        assert!(journal(dir.path()).pending().unwrap().is_empty());
    }

    #[test]
    fn begin_then_end_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let journal = journal(dir.path());

        journal
            .begin("demo", vec![dir.path().join("apps/demo")], vec![])
            .unwrap();
        assert!(journal.pending().unwrap().contains_key("demo"));

        journal.end("demo").unwrap();
        assert!(journal.pending().unwrap().is_empty());
    }

    #[test]
    fn document_uses_pascal_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let journal = journal(dir.path());
        journal
            .begin(
                "demo",
                vec![PathBuf::from("/apps/demo")],
                vec![PathBuf::from("/desktop/demo.desktop")],
            )
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("transactions.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &json["PendingInstallations"]["demo"];
        assert_eq!(entry["InvolvedDirs"][0], "/apps/demo");
        assert_eq!(entry["InvolvedFiles"][0], "/desktop/demo.desktop");
    }

    #[test]
    fn tidy_removes_leftovers_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let journal = journal(dir.path());
        let app_dir = dir.path().join("apps/demo");
        std::fs::create_dir_all(app_dir.join("nested")).unwrap();
        std::fs::write(app_dir.join("nested/partial.AppImage"), b"x").unwrap();
        let desktop = dir.path().join("demo.desktop");
        std::fs::write(&desktop, b"[Desktop Entry]\n").unwrap();
        let never_created = dir.path().join("bin/demo");

        journal
            .begin(
                "demo",
                vec![app_dir.clone()],
                vec![desktop.clone(), never_created],
            )
            .unwrap();

        let report = journal.tidy().unwrap();
        assert_eq!(report.cleared, vec!["demo"]);
        assert_eq!(report.removed, vec![app_dir.clone(), desktop.clone()]);
        assert!(!app_dir.exists());
        assert!(!desktop.exists());
        assert!(journal.pending().unwrap().is_empty());

        let again = journal.tidy().unwrap();
        assert!(again.is_empty());
        assert!(again.removed.is_empty());
    }

    #[test]
    fn tidy_leaves_committed_installs_alone() {
        let dir = tempfile::tempdir().unwrap();
        let journal = journal(dir.path());
        let committed = dir.path().join("apps/kept");
        std::fs::create_dir_all(&committed).unwrap();

        journal.begin("kept", vec![committed.clone()], vec![]).unwrap();
        journal.end("kept").unwrap();

        assert!(journal.tidy().unwrap().is_empty());
        assert!(committed.exists());
    }

    #[test]
    fn begin_replaces_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let journal = journal(dir.path());
        journal
            .begin("demo", vec![PathBuf::from("/old")], vec![])
            .unwrap();
        journal
            .begin("demo", vec![PathBuf::from("/new")], vec![])
            .unwrap();

        let pending = journal.pending().unwrap();
        assert_eq!(pending["demo"].involved_dirs, vec![PathBuf::from("/new")]);
    }
}
