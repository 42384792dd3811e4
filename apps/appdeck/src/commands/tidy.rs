//! Tidy-broken command for the appdeck CLI.
//!
//! Removes what interrupted installs left behind, as recorded in the
//! transaction journal. Running it twice is harmless.
//!
//! A failed reinstall journals the app's existing directory, so sweeping it
//! removes the app entirely. Such ids are dropped from the registry and the
//! menu afterwards.

use anyhow::Result;
use clap::Args;

use crate::install::Integrator;
use crate::prompt::confirm;
use crate::store::{AppPaths, ConfigStore, StorePaths, TransactionJournal};

/// Arguments for the tidy-broken command.
#[derive(Args)]
pub struct TidyArgs {
    /// Answer yes to every prompt.
    #[clap(short = 'y', long = "assume-yes")]
    pub assume_yes: bool,
}

/// Executes the tidy-broken command.
///
/// # Errors
///
/// Returns an error if the journal or the registry cannot be read or
/// written.
pub async fn execute(args: &TidyArgs) -> Result<()> {
    let paths = StorePaths::new()?;
    let journal = TransactionJournal::new(&paths);

    let pending = journal.pending()?;
    if pending.is_empty() {
        println!("Nothing to clean.");
        return Ok(());
    }

    for (id, entry) in &pending {
        println!("{id}:");
        for dir in &entry.involved_dirs {
            println!("  D {}", dir.display());
        }
        for file in &entry.involved_files {
            println!("  F {}", file.display());
        }
    }
    if !confirm("Remove these leftovers?", args.assume_yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let report = journal.tidy()?;
    println!(
        "Cleaned {} install(s), removed {} path(s).",
        report.cleared.len(),
        report.removed.len()
    );
    if !report.retained.is_empty() {
        println!(
            "Could not fully clean: {}. Run again after fixing permissions.",
            report.retained.join(", ")
        );
    }

    let mut store = ConfigStore::new(&paths);
    if store.exists() {
        forget_swept_apps(&mut store).await?;
    }
    Ok(())
}

async fn forget_swept_apps(store: &mut ConfigStore) -> Result<()> {
    let forgotten = store.forget_missing()?;
    if forgotten.is_empty() {
        return Ok(());
    }
    let registry = store.load()?.clone();
    let integrator = Integrator::from_env();
    for id in &forgotten {
        let desktop = AppPaths::derive(&registry, id, false).desktop;
        if let Err(e) = integrator.unregister(&desktop).await {
            println!("Warning: failed to unregister {}: {e}", desktop.display());
        }
    }
    println!("Removed from the registry: {}", forgotten.join(", "));
    Ok(())
}
