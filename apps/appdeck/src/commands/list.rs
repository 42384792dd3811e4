//! List command for the appdeck CLI.

use anyhow::Result;

use crate::store::{ConfigStore, StorePaths};

/// Executes the list command.
///
/// Prints installed app ids, one per line, sorted.
///
/// # Errors
///
/// Returns an error if the registry is missing or unreadable.
#[allow(clippy::unused_async)]
pub async fn execute() -> Result<()> {
    let paths = StorePaths::new()?;
    let mut store = ConfigStore::new(&paths);
    let registry = store.load()?;

    if registry.installed.is_empty() {
        println!("No applications are installed.");
        return Ok(());
    }
    for id in registry.installed.keys() {
        println!("{id}");
    }
    Ok(())
}
