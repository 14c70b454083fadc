//! Error types for pulse.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Authentication**: Expired sessions, missing or rejected credentials
//! - **Network**: Connection, timeout, or transport issues
//! - **Configuration**: Config file parsing, validation, or missing values
//! - **Api**: Envelope-level failures reported by the backend
//! - **Environment**: Keyring, permissions, terminal requirements
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `PULSE-A001`) for programmatic handling.
//!
//! ## Fix Suggestions
//!
//! Each error type can provide actionable fix suggestions via the
//! [`PulseError::fix_suggestions()`] method.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Session and credential issues.
    Authentication,
    /// Network issues (timeout, connection refused, transport).
    Network,
    /// Configuration issues (parse errors, invalid values, missing settings).
    Configuration,
    /// Failures reported by the backend inside the response envelope.
    Api,
    /// Environment issues (keyring, permissions, terminal).
    Environment,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Api => "API error",
            Self::Environment => "Environment error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Api => "P",
            Self::Environment => "E",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Session expired or credentials rejected; log in again
    AuthRequired = 2,
    /// Configuration or parse errors
    ConfigError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for pulse operations.
///
/// Each variant has:
/// - A stable error code (e.g., `PULSE-A001`)
/// - A category for classification
/// - A retryable flag for retry logic
#[derive(Error, Debug)]
pub enum PulseError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// Credential renewal failed; the user has to log in again.
    #[error("session expired: {reason}")]
    SessionExpired { reason: String },

    /// The command needs a session but no way to obtain one was given.
    #[error("not logged in: {hint}")]
    NotAuthenticated { hint: String },

    /// Login or registration rejected by the backend.
    #[error("login rejected: {message}")]
    LoginRejected { message: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out after specified duration.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Connection refused by the backend host.
    #[error("connection refused: {host}")]
    ConnectionRefused { host: String },

    /// Generic transport error.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Required setting absent from every configuration source.
    #[error("missing required setting '{key}'")]
    ConfigMissing { key: String, hint: String },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Api errors (Category: Api)
    // ==========================================================================
    /// The backend answered with `success: false`.
    #[error("{message} ({code})")]
    Api {
        code: String,
        message: String,
        status: Option<u16>,
    },

    /// Response body was not the expected envelope.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// Binary export could not be downloaded.
    #[error("download failed: {reason}")]
    DownloadFailed {
        status: Option<u16>,
        reason: String,
    },

    // ==========================================================================
    // Environment errors (Category: Environment)
    // ==========================================================================
    /// OS keyring unavailable or refused access.
    #[error("keyring error: {0}")]
    Keyring(String),

    /// Permission denied accessing file or resource.
    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    /// Wrap a filesystem failure on `path`, keeping the path for permission
    /// errors.
    #[must_use]
    pub fn from_io_at(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.display().to_string(),
            }
        } else {
            Self::Io(err)
        }
    }

    /// Build a transport error from a reqwest failure.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else if err.is_connect() {
            let host = err
                .url()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string());
            Self::ConnectionRefused { host }
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::SessionExpired { .. }
            | Self::NotAuthenticated { .. }
            | Self::LoginRejected { .. } => ExitCode::AuthRequired,

            Self::ConfigMissing { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::ParseResponse(_) => ExitCode::ConfigError,

            Self::Timeout(_) => ExitCode::Timeout,

            Self::ConnectionRefused { .. }
            | Self::Network(_)
            | Self::Api { .. }
            | Self::DownloadFailed { .. }
            | Self::Keyring(_)
            | Self::PermissionDenied { .. }
            | Self::Io(_)
            | Self::Json(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SessionExpired { .. }
            | Self::NotAuthenticated { .. }
            | Self::LoginRejected { .. } => ErrorCategory::Authentication,

            Self::Timeout(_) | Self::ConnectionRefused { .. } | Self::Network(_) => {
                ErrorCategory::Network
            }

            Self::ConfigMissing { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_) => ErrorCategory::Configuration,

            Self::Api { .. } | Self::ParseResponse(_) | Self::DownloadFailed { .. } => {
                ErrorCategory::Api
            }

            Self::Keyring(_) | Self::PermissionDenied { .. } => ErrorCategory::Environment,

            Self::Io(_) | Self::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `PULSE-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SessionExpired { .. } => "PULSE-A001",
            Self::NotAuthenticated { .. } => "PULSE-A002",
            Self::LoginRejected { .. } => "PULSE-A003",

            Self::Timeout(_) => "PULSE-N001",
            Self::ConnectionRefused { .. } => "PULSE-N002",
            Self::Network(_) => "PULSE-N099",

            Self::ConfigMissing { .. } => "PULSE-C001",
            Self::ConfigParse { .. } => "PULSE-C002",
            Self::ConfigInvalid { .. } => "PULSE-C003",
            Self::Config(_) => "PULSE-C004",

            Self::Api { .. } => "PULSE-P001",
            Self::ParseResponse(_) => "PULSE-P002",
            Self::DownloadFailed { .. } => "PULSE-P003",

            Self::Keyring(_) => "PULSE-E001",
            Self::PermissionDenied { .. } => "PULSE-E002",

            Self::Io(_) => "PULSE-X001",
            Self::Json(_) => "PULSE-X002",
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Network(_) | Self::ConnectionRefused { .. } | Self::Api { .. }
        )
    }

    /// Returns whether the caller has to re-authenticate rather than retry.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired { .. } | Self::NotAuthenticated { .. }
        )
    }

    /// Message suitable for a UI banner.
    ///
    /// Envelope failures surface the backend's own message; everything else
    /// uses the display string.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::SessionExpired { reason } => suggestions::session_expired_suggestions(reason),
            Self::NotAuthenticated { hint } => suggestions::not_authenticated_suggestions(hint),
            Self::LoginRejected { message } => suggestions::login_rejected_suggestions(message),

            Self::Timeout(seconds) => suggestions::timeout_suggestions(*seconds),
            Self::ConnectionRefused { host } => suggestions::connection_refused_suggestions(host),
            Self::Network(msg) => vec![FixSuggestion::new(
                vec!["pulse config show".to_string()],
                format!("Network error: {msg}. Check that the API base URL is reachable."),
            )],

            Self::ConfigMissing { key, hint } => suggestions::config_missing_suggestions(key, hint),
            Self::ConfigParse { path, message } => {
                suggestions::config_parse_suggestions(path, message)
            }
            Self::ConfigInvalid {
                key,
                value,
                message,
            } => suggestions::config_invalid_suggestions(key, value, message),
            Self::Config(msg) => vec![FixSuggestion::new(
                vec!["pulse config show".to_string()],
                format!("Configuration error: {msg}"),
            )],

            Self::Api { code, message, .. } => suggestions::api_error_suggestions(code, message),
            Self::ParseResponse(msg) => vec![FixSuggestion::new(
                vec!["pulse --verbose metrics".to_string()],
                format!(
                    "The backend returned something other than the JSON envelope: {msg}. \
                     Check that --api-url points at the API, not the web frontend."
                ),
            )],
            Self::DownloadFailed { status, reason } => {
                suggestions::download_failed_suggestions(*status, reason)
            }

            Self::Keyring(msg) => suggestions::keyring_suggestions(msg),
            Self::PermissionDenied { path } => suggestions::permission_denied_suggestions(path),

            Self::Io(err) => vec![FixSuggestion::new(
                vec!["# Check file permissions and disk space".to_string()],
                format!("I/O error: {err}. Check file permissions and available disk space."),
            )],
            Self::Json(err) => vec![FixSuggestion::new(
                vec!["pulse --verbose metrics".to_string()],
                format!("JSON error: {err}. The data may be in an unexpected format."),
            )],
        }
    }
}

/// Result type alias for pulse operations.
pub type Result<T> = std::result::Result<T, PulseError>;

// =============================================================================
// Tests
// =============================================================================
