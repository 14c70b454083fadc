//! HTTP client utilities.
//!
//! Provides the shared HTTP client used by the session client.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::{PulseError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a configured HTTP client.
///
/// The cookie store is always enabled: in cookie refresh mode the backend
/// delivers the refresh credential as an HTTP-only cookie which has to be
/// replayed on `/api/auth/refresh` without the client ever reading it.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .cookie_store(true)
        .user_agent(format!("pulse/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PulseError::Network(e.to_string()))
}

/// Join a base URL and an endpoint path without doubling slashes.
#[must_use]
pub fn join_url(base: &str, endpoint: &str) -> String {
    let base = base.trim_end_matches('/');
    if endpoint.starts_with('/') {
        format!("{base}{endpoint}")
    } else {
        format!("{base}/{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("http://localhost:3001/", "/api/metrics/traffic"),
            "http://localhost:3001/api/metrics/traffic"
        );
        assert_eq!(
            join_url("http://localhost:3001", "api/auth/login"),
            "http://localhost:3001/api/auth/login"
        );
    }
}
