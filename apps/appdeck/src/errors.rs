//! Error types for the appdeck CLI.
//!
//! Most operations return `anyhow::Result` and attach context at every
//! filesystem and network boundary. The kinds below are the ones callers
//! need to tell apart, so they are raised as `AppdeckError` values inside
//! `anyhow::Error` and recovered with `downcast_ref`.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for appdeck operations.
#[derive(Debug, Error)]
pub enum AppdeckError {
    /// The registry file does not exist yet.
    #[error("config file {} does not exist, run 'appdeck init' to set things up", path.display())]
    ConfigNotInitialized {
        /// Where the registry was expected.
        path: PathBuf,
    },

    /// A request or response stream failed.
    #[error("network error: {context}")]
    NetworkFailure {
        /// Which app, asset or endpoint was involved.
        context: String,
        /// The underlying error, when there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A release carries no bundle usable on this host.
    #[error("no valid asset in release {release}")]
    NoMatchingAsset {
        /// Tag name of the inspected release.
        release: String,
    },

    /// Creating, renaming, copying or removing a path failed.
    #[error("filesystem error: {message}")]
    FilesystemFailure {
        /// The operation and path involved.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The app's source cannot look for updates.
    #[error("{source_kind} source does not support updates")]
    UpdateUnsupported {
        /// Source discriminator (`http`, `local`).
        source_kind: String,
    },

    /// Extraction or desktop registration failed.
    #[error("integration failed: {message}")]
    IntegrationFailure {
        /// What went wrong.
        message: String,
    },

    /// The id is not present in the registry.
    #[error("application with id {id} is not installed")]
    AppNotInstalled {
        /// The requested id.
        id: String,
    },

    /// The id normalizes to an empty string.
    #[error("invalid application id: {input:?}")]
    InvalidAppId {
        /// The raw input.
        input: String,
    },

    /// Invalid command line arguments.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of what was invalid.
        message: String,
    },

    /// A launched app exited with a non-zero code.
    ///
    /// Carries the code so the CLI can exit with it; nothing is printed.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the subprocess.
        code: i32,
    },
}

impl AppdeckError {
    /// Creates a new `ConfigNotInitialized` error.
    #[must_use]
    pub fn config_not_initialized(path: PathBuf) -> Self {
        Self::ConfigNotInitialized { path }
    }

    /// Creates a new `NetworkFailure` without an underlying error.
    #[must_use]
    pub fn network(context: impl Into<String>) -> Self {
        Self::NetworkFailure {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a new `NetworkFailure` wrapping the error that caused it.
    #[must_use]
    pub fn network_with_source(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::NetworkFailure {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a new `NoMatchingAsset` error.
    #[must_use]
    pub fn no_matching_asset(release: impl Into<String>) -> Self {
        Self::NoMatchingAsset {
            release: release.into(),
        }
    }

    /// Creates a new `FilesystemFailure` error.
    #[must_use]
    pub fn filesystem(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FilesystemFailure {
            message: message.into(),
            source,
        }
    }

    /// Creates a new `UpdateUnsupported` error.
    #[must_use]
    pub fn update_unsupported(source_kind: impl Into<String>) -> Self {
        Self::UpdateUnsupported {
            source_kind: source_kind.into(),
        }
    }

    /// Creates a new `IntegrationFailure` error.
    #[must_use]
    pub fn integration(message: impl Into<String>) -> Self {
        Self::IntegrationFailure {
            message: message.into(),
        }
    }

    /// Creates a new `AppNotInstalled` error.
    #[must_use]
    pub fn app_not_installed(id: impl Into<String>) -> Self {
        Self::AppNotInstalled { id: id.into() }
    }

    /// Creates a new `InvalidAppId` error.
    #[must_use]
    pub fn invalid_app_id(input: impl Into<String>) -> Self {
        Self::InvalidAppId {
            input: input.into(),
        }
    }

    /// Creates a new `InvalidArguments` error.
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}
