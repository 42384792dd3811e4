//! Shared HTTP clients.

use std::time::Duration;

use anyhow::{Context, Result};

/// User agent sent with every request. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("appdeck/", env!("CARGO_PKG_VERSION"));

/// Timeout for API calls. Downloads have none, bundles can be large.
const API_TIMEOUT_SECS: u64 = 30;

/// Client for small JSON requests.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn api_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(API_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Client for streaming bundle downloads.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn download_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Maps a non-success status to a readable error.
pub(crate) fn status_error(status: reqwest::StatusCode, url: &str) -> anyhow::Error {
    let message = match status.as_u16() {
        404 => format!("not found: {url}"),
        403 => format!("access denied (rate limited?): {url}"),
        code if code >= 500 => format!("server error ({code}): {url}"),
        code => format!("HTTP error {code}: {url}"),
    };
    crate::errors::AppdeckError::network(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_name_the_url() {
        let err = status_error(reqwest::StatusCode::NOT_FOUND, "https://example.com/x");
        assert_eq!(err.to_string(), "network error: not found: https://example.com/x");

        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "https://example.com");
        assert!(err.to_string().contains("server error (502)"));
    }

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("appdeck/"));
    }
}
