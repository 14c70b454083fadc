//! Fix suggestion database for pulse errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Primary fix commands in order of preference.
    /// These should be copy-paste ready for the terminal.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

// =============================================================================
// Suggestion Generators
// =============================================================================

/// Generates fix suggestions for an expired session.
#[must_use]
pub fn session_expired_suggestions(reason: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec!["pulse login --email <you@example.com>".to_string()],
            format!(
                "The access token was rejected and renewing it failed ({reason}). \
                 The refresh credential has expired or was revoked by a logout elsewhere."
            ),
        )
        .with_prevention(
            "With refresh_mode = \"body\" the refresh token is kept in the OS keyring \
             between runs; cookie mode needs a login per process.",
        ),
    ]
}

/// Generates fix suggestions when no session can be established.
#[must_use]
pub fn not_authenticated_suggestions(hint: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![
            "pulse login --email <you@example.com>".to_string(),
            "PULSE_PASSWORD=... pulse watch --email <you@example.com>".to_string(),
        ],
        format!("No session is available: {hint}"),
    )]
}

/// Generates fix suggestions for a rejected login.
#[must_use]
pub fn login_rejected_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["pulse login --email <you@example.com>".to_string()],
        format!("The backend refused the credentials: {message}"),
    )]
}

/// Generates fix suggestions for timeout errors.
#[must_use]
pub fn timeout_suggestions(seconds: u64) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                format!("pulse --timeout {} metrics", seconds.saturating_mul(2)),
                "pulse config show".to_string(),
            ],
            format!(
                "The backend did not answer within {seconds}s. It may be overloaded \
                 or the base URL may point at a host that drops connections."
            ),
        )
        .with_prevention("Raise [api] timeout_seconds in config.toml for slow backends."),
    ]
}

/// Generates fix suggestions for connection refused errors.
#[must_use]
pub fn connection_refused_suggestions(host: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![
            "pulse config show".to_string(),
            "pulse --api-url https://<host> metrics".to_string(),
        ],
        format!("Nothing accepted the connection at {host}. Is the backend running?"),
    )]
}

/// Generates fix suggestions for a missing required setting.
#[must_use]
pub fn config_missing_suggestions(key: &str, hint: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["pulse config init".to_string(), "pulse config path".to_string()],
        format!("'{key}' is required and was not set anywhere. {hint}"),
    )]
}

/// Generates fix suggestions for config parse errors.
#[must_use]
pub fn config_parse_suggestions(path: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("$EDITOR {path}"), "pulse config init --force".to_string()],
        format!("The configuration file at {path} is not valid TOML: {message}"),
    )]
}

/// Generates fix suggestions for invalid config values.
#[must_use]
pub fn config_invalid_suggestions(key: &str, value: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["pulse config show".to_string()],
        format!("'{value}' is not a valid value for '{key}': {message}"),
    )]
}

/// Generates fix suggestions for envelope-level API failures.
#[must_use]
pub fn api_error_suggestions(code: &str, message: &str) -> Vec<FixSuggestion> {
    let context = match code {
        "FORBIDDEN" => format!("{message}. This operation is limited to administrators."),
        "NOT_FOUND" => format!("{message}. Check the category name and range."),
        _ => format!("The backend reported {code}: {message}"),
    };
    vec![FixSuggestion::new(
        vec!["pulse --verbose metrics".to_string()],
        context,
    )]
}

/// Generates fix suggestions for failed downloads.
#[must_use]
pub fn download_failed_suggestions(status: Option<u16>, reason: &str) -> Vec<FixSuggestion> {
    let context = match status {
        Some(403) => "Exports are limited to administrators.".to_string(),
        Some(code) => format!("The export endpoint answered HTTP {code}: {reason}"),
        None => format!("The export could not be fetched: {reason}"),
    };
    vec![FixSuggestion::new(
        vec!["pulse export csv --category overview --range 30d".to_string()],
        context,
    )]
}

/// Generates fix suggestions for keyring failures.
#[must_use]
pub fn keyring_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec!["pulse --refresh-mode cookie login --email <you@example.com>".to_string()],
            format!("The OS keyring could not be used: {message}"),
        )
        .with_prevention(
            "Cookie mode keeps the refresh credential in memory only and needs no keyring.",
        ),
    ]
}

/// Generates fix suggestions for permission denied errors.
#[must_use]
pub fn permission_denied_suggestions(path: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("ls -la {path}")],
        format!("Permission denied accessing {path}."),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_prevention() {
        let suggestion = FixSuggestion::new(vec!["pulse login".to_string()], "ctx")
            .with_prevention("keep the keyring unlocked");
        assert_eq!(suggestion.context, "ctx");
        assert_eq!(
            suggestion.prevention.as_deref(),
            Some("keep the keyring unlocked")
        );
    }

    #[test]
    fn forbidden_api_error_mentions_administrators() {
        let suggestions = api_error_suggestions("FORBIDDEN", "Admin access required");
        assert!(suggestions[0].context.contains("administrators"));
    }

    #[test]
    fn timeout_suggests_doubling() {
        let suggestions = timeout_suggestions(30);
        assert!(suggestions[0].commands[0].contains("--timeout 60"));
    }
}
