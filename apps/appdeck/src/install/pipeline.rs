//! The install pipeline.
//!
//! Each app in a batch goes through the same steps:
//!
//! 1. **Begin** - journal the app dir, desktop entry and launcher link
//! 2. **Download** - stream the bundle into the app dir
//! 3. **Integrate** - extract metadata, write and register the desktop entry
//! 4. **Persist** - write the app and source configs, then the registry
//! 5. **End** - drop the journal entry
//!
//! The batch stops at the first failure. A failed app keeps its journal entry
//! so `tidy-broken` can remove what it left behind; apps installed earlier in
//! the batch stay installed.

use anyhow::Result;

use crate::errors::AppdeckError;
use crate::install::download::download_asset;
use crate::install::integrate::Integrator;
use crate::install::progress::{InstallPhase, ProgressTracker, StatusLine, StatusTicker};
use crate::source::{Asset, SourceDescriptor};
use crate::store::{AppRecord, ConfigStore, TransactionJournal};

/// One app ready to go through the pipeline.
#[derive(Debug, Clone)]
pub struct Installable {
    pub app: AppRecord,
    pub source: SourceDescriptor,
    pub asset: Asset,
}

/// Result of a batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub installed: Vec<String>,
    /// The app that stopped the batch and why.
    pub failed: Option<(String, anyhow::Error)>,
    /// Apps never attempted because an earlier one failed.
    pub skipped: Vec<String>,
}

pub struct Installer<'a> {
    store: &'a mut ConfigStore,
    journal: &'a TransactionJournal,
    integrator: &'a Integrator,
    http: reqwest::Client,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(
        store: &'a mut ConfigStore,
        journal: &'a TransactionJournal,
        integrator: &'a Integrator,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            journal,
            integrator,
            http,
        }
    }

    /// Installs `items` in order, stopping at the first failure.
    pub async fn install_batch(&mut self, items: Vec<Installable>) -> BatchOutcome {
        let count = items.len();
        let mut outcome = BatchOutcome::default();
        let mut queue = items.into_iter().enumerate();

        while let Some((index, item)) = queue.next() {
            let id = item.app.id.clone();
            match self.install_one(index + 1, count, &item).await {
                Ok(()) => outcome.installed.push(id),
                Err(e) => {
                    tracing::error!(id = %id, "install failed: {e:#}");
                    outcome.failed = Some((id, e));
                    outcome.skipped = queue.by_ref().map(|(_, rest)| rest.app.id).collect();
                    break;
                }
            }
        }
        outcome
    }

    async fn install_one(&mut self, position: usize, count: usize, item: &Installable) -> Result<()> {
        let line = StatusLine::new(position, count, &item.app);
        let (mut tracker, rx) = ProgressTracker::new(item.asset.size);
        let ticker = StatusTicker::start(line.clone(), rx);

        let result = self.run_steps(item, &mut tracker).await;

        ticker.stop();
        tracker.set_phase(if result.is_ok() {
            InstallPhase::Installed
        } else {
            InstallPhase::Failed
        });
        line.finish(&tracker.snapshot());
        result
    }

    async fn run_steps(&mut self, item: &Installable, tracker: &mut ProgressTracker) -> Result<()> {
        let app = &item.app;
        let paths = &app.paths;

        let mut files = vec![paths.desktop.clone()];
        files.extend(paths.symlink.clone());
        self.journal.begin(&app.id, vec![paths.dir.clone()], files)?;

        for dir in [Some(paths.dir.as_path()), paths.desktop.parent()]
            .into_iter()
            .flatten()
        {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppdeckError::filesystem(format!("failed to create {}", dir.display()), e)
            })?;
        }

        download_asset(&self.http, &item.asset, &paths.app_image, tracker).await?;

        tracker.set_phase(InstallPhase::Integrating);
        let prompt_opt_out = !self.store.load()?.enable_integration_prompt;
        let installed = AppRecord {
            paths: self.integrator.integrate(paths, prompt_opt_out).await?,
            ..app.clone()
        };

        installed.save()?;
        item.source.save(&installed.paths.source_config)?;
        self.store.update(|registry| {
            registry
                .installed
                .insert(installed.id.clone(), installed.paths.config.clone());
            Ok(())
        })?;

        self.journal.end(&app.id)?;
        tracing::info!(id = %app.id, version = %app.version, "installed");
        Ok(())
    }
}
