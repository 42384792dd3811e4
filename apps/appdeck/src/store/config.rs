//! The registry of installed apps.
//!
//! A single JSON document maps app ids to their per-app config paths and
//! carries the directories new installs are placed in. [`ConfigStore`] is
//! the only writer; callers hold it explicitly and pass it down.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::errors::AppdeckError;
use crate::store::atomic;
use crate::store::paths::StorePaths;

/// Registry document (`config.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigRegistry {
    /// Parent of every per-app directory.
    pub apps_dir: PathBuf,
    /// Where desktop entries are written.
    pub desktop_dir: PathBuf,
    /// Where `--link` launchers go, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlinks_dir: Option<PathBuf>,
    /// Leave the third-party integration prompt on when launching bundles.
    #[serde(default)]
    pub enable_integration_prompt: bool,
    /// App id to per-app config path.
    #[serde(default)]
    pub installed: BTreeMap<String, PathBuf>,
}

impl ConfigRegistry {
    #[must_use]
    pub fn new(apps_dir: PathBuf, desktop_dir: PathBuf) -> Self {
        Self {
            apps_dir,
            desktop_dir,
            symlinks_dir: None,
            enable_integration_prompt: false,
            installed: BTreeMap::new(),
        }
    }

    /// Config path of an installed app.
    ///
    /// # Errors
    ///
    /// Returns `AppNotInstalled` if `id` is not registered.
    pub fn app_config_path(&self, id: &str) -> Result<&Path> {
        self.installed
            .get(id)
            .map(PathBuf::as_path)
            .ok_or_else(|| AppdeckError::app_not_installed(id).into())
    }
}

/// Reads and writes the registry, caching the last loaded copy.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    cached: Option<ConfigRegistry>,
}

impl ConfigStore {
    #[must_use]
    pub fn new(paths: &StorePaths) -> Self {
        Self::at(paths.config_file())
    }

    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { path, cached: None }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the registry file is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Returns the registry, reading it from disk on first use.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotInitialized` when the file is missing, or a parse
    /// error when it is malformed.
    pub fn load(&mut self) -> Result<&ConfigRegistry> {
        let registry = match self.cached.take() {
            Some(registry) => registry,
            None => self.read_from_disk()?,
        };
        Ok(&*self.cached.insert(registry))
    }

    /// Drops the cached copy and reads the registry again.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigStore::load`].
    pub fn reload(&mut self) -> Result<&ConfigRegistry> {
        self.cached = None;
        self.load()
    }

    /// Atomically writes `registry` and makes it the cached copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the cache is left untouched then.
    pub fn save(&mut self, registry: ConfigRegistry) -> Result<()> {
        atomic::write_json(&self.path, &registry)?;
        tracing::debug!(path = %self.path.display(), apps = registry.installed.len(), "saved registry");
        self.cached = Some(registry);
        Ok(())
    }

    /// Re-reads the registry, applies `mutate` and saves the result.
    ///
    /// Nothing is written if `mutate` fails.
    ///
    /// # Errors
    ///
    /// Propagates load, mutation and save errors.
    pub fn update<R>(
        &mut self,
        mutate: impl FnOnce(&mut ConfigRegistry) -> Result<R>,
    ) -> Result<R> {
        let mut registry = self.reload()?.clone();
        let result = mutate(&mut registry)?;
        self.save(registry)?;
        Ok(result)
    }

    /// Drops ids whose app config is gone from disk, as happens when
    /// `tidy-broken` sweeps a failed reinstall. Returns the dropped ids.
    ///
    /// # Errors
    ///
    /// Propagates load and save errors.
    pub fn forget_missing(&mut self) -> Result<Vec<String>> {
        let missing: Vec<String> = self
            .reload()?
            .installed
            .iter()
            .filter(|(_, config)| !config.exists())
            .map(|(id, _)| id.clone())
            .collect();
        if missing.is_empty() {
            return Ok(missing);
        }
        self.update(|registry| {
            for id in &missing {
                registry.installed.remove(id);
            }
            Ok(())
        })?;
        tracing::debug!(ids = ?missing, "forgot apps without config");
        Ok(missing)
    }

    fn read_from_disk(&self) -> Result<ConfigRegistry> {
        atomic::read_json(&self.path)?
            .ok_or_else(|| AppdeckError::config_not_initialized(self.path.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(root: &Path) -> ConfigRegistry {
        let mut registry = ConfigRegistry::new(root.join("apps"), root.join("desktop"));
        registry.symlinks_dir = Some(root.join("bin"));
        registry
            .installed
            .insert("demo".to_string(), root.join("apps/demo/app.json"));
        registry
    }

    #[test]
    fn missing_registry_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::at(dir.path().join("config.json"));

        let err = store.load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppdeckError>(),
            Some(AppdeckError::ConfigNotInitialized { .. })
        ));
        assert!(!store.exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let registry = sample(dir.path());

        ConfigStore::at(path.clone()).save(registry.clone()).unwrap();
        let mut fresh = ConfigStore::at(path);
        assert_eq!(fresh.load().unwrap(), &registry);
    }

    #[test]
    fn serialized_keys_are_pascal_case() {
        let registry = sample(Path::new("/data"));
        let json = serde_json::to_value(&registry).unwrap();

        assert_eq!(json["AppsDir"], "/data/apps");
        assert_eq!(json["DesktopDir"], "/data/desktop");
        assert_eq!(json["SymlinksDir"], "/data/bin");
        assert_eq!(json["EnableIntegrationPrompt"], false);
        assert_eq!(json["Installed"]["demo"], "/data/apps/demo/app.json");
    }

    #[test]
    fn update_sees_changes_made_by_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut store = ConfigStore::at(path.clone());
        store.save(sample(dir.path())).unwrap();
        store.load().unwrap();

        let mut other = ConfigStore::at(path.clone());
        other
            .update(|r| {
                r.installed.insert("other".to_string(), PathBuf::from("/x"));
                Ok(())
            })
            .unwrap();

        store
            .update(|r| {
                r.installed.insert("third".to_string(), PathBuf::from("/y"));
                Ok(())
            })
            .unwrap();

        let ids: Vec<_> = ConfigStore::at(path)
            .load()
            .unwrap()
            .installed
            .keys()
            .cloned()
            .collect();
        assert_eq!(ids, vec!["demo", "other", "third"]);
    }

    #[test]
    fn failed_update_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut store = ConfigStore::at(path.clone());
        store.save(sample(dir.path())).unwrap();

        let result: Result<()> = store.update(|r| {
            r.installed.clear();
            anyhow::bail!("refused")
        });
        assert!(result.is_err());
        assert_eq!(
            ConfigStore::at(path).load().unwrap().installed.len(),
            1
        );
    }

    #[test]
    fn forget_missing_drops_only_vanished_configs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut registry = sample(dir.path());
        let kept = dir.path().join("apps/kept/app.json");
        std::fs::create_dir_all(kept.parent().unwrap()).unwrap();
        std::fs::write(&kept, "{}").unwrap();
        registry.installed.insert("kept".to_string(), kept);

        let mut store = ConfigStore::at(path.clone());
        store.save(registry).unwrap();

        assert_eq!(store.forget_missing().unwrap(), vec!["demo"]);
        let ids: Vec<_> = ConfigStore::at(path)
            .load()
            .unwrap()
            .installed
            .keys()
            .cloned()
            .collect();
        assert_eq!(ids, vec!["kept"]);
        assert!(store.forget_missing().unwrap().is_empty());
    }

    #[test]
    fn unknown_app_is_reported() {
        let registry = sample(Path::new("/data"));
        assert!(registry.app_config_path("demo").is_ok());
        let err = registry.app_config_path("ghost").unwrap_err();
        assert_eq!(err.to_string(), "application with id ghost is not installed");
    }
}
