//! Diagnostic logging.
//!
//! User-facing output goes through `println!`; everything here is for
//! `--verbose` runs and bug reports, written to stderr.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive that overrides the
/// level picked from the command line.
pub const LOG_ENV: &str = "APPDECK_LOG";

/// Installs the global subscriber. Safe to call once per process.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "appdeck=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
