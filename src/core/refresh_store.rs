//! Refresh credential custody.
//!
//! The backend runs in one of two trust models:
//!
//! - **Cookie** (hardened): the refresh credential is an HTTP-only cookie
//!   managed by the server. The client keeps it in the HTTP client's
//!   in-memory cookie jar and never reads it.
//! - **Body** (legacy): the refresh token is returned in JSON bodies and the
//!   client must keep it itself. It is stored in the OS keyring so a later
//!   process can renew its session.
//!
//! Only body mode touches a [`RefreshStore`].

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

const KEYRING_SERVICE: &str = "pulse";

/// How the refresh credential travels between client and server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Server-managed HTTP-only cookie.
    #[default]
    Cookie,
    /// Token in JSON bodies, persisted in the OS keyring.
    Body,
}

impl RefreshMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Body => "body",
        }
    }

    /// Parse from CLI/env/config value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown modes.
    pub fn from_arg(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "body" | "legacy" => Ok(Self::Body),
            _ => Err(PulseError::ConfigInvalid {
                key: "auth.refresh_mode".to_string(),
                value: value.to_string(),
                message: "expected 'cookie' or 'body'".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage for a body-mode refresh token.
pub trait RefreshStore: Send + Sync {
    /// Load the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token. Removing an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn clear(&self) -> Result<()>;
}

/// Process-local store. Used in cookie mode and in tests.
#[derive(Debug, Default)]
pub struct MemoryRefreshStore {
    token: Mutex<Option<String>>,
}

impl MemoryRefreshStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl RefreshStore for MemoryRefreshStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().map(|t| t.clone()).unwrap_or_default())
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
        Ok(())
    }
}

/// OS keyring store, one entry per backend base URL.
#[derive(Debug, Clone)]
pub struct KeyringRefreshStore {
    account: String,
}

impl KeyringRefreshStore {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            account: format!("refresh-token:{}", base_url.trim_end_matches('/')),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account)
            .map_err(|e| PulseError::Keyring(e.to_string()))
    }
}

impl RefreshStore for KeyringRefreshStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(PulseError::Keyring(e.to_string())),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(|e| PulseError::Keyring(e.to_string()))
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(PulseError::Keyring(e.to_string())),
        }
    }
}
