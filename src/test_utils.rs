//! Test utilities for pulse.
//!
//! Provides shared helpers, test data factories, and assertion macros
//! for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulse::test_utils::*;
//!
//! let metrics = make_metrics(Category::Traffic, &[("visits", 1200)]);
//! let body = success_envelope(serde_json::to_value(&metrics).unwrap());
//! let dir = TestDir::new();
//! dir.create_file("config.toml", &make_test_config_toml("http://127.0.0.1:9"));
//! ```

use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use crate::core::models::{
    AuthTokens, Category, CategoryInfo, CategoryWithMetrics, Metric, Role, User,
};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a metrics payload for `category` with the given `(name, count)` rows.
///
/// # Examples
///
/// ```rust,ignore
/// use pulse::test_utils::make_metrics;
///
/// let metrics = make_metrics(Category::Overview, &[("users", 10), ("sessions", 32)]);
/// assert_eq!(metrics.total_count(), 42);
/// ```
#[must_use]
pub fn make_metrics(category: Category, rows: &[(&str, i64)]) -> CategoryWithMetrics {
    CategoryWithMetrics {
        category: CategoryInfo {
            id: Some(1),
            name: category.display_name().to_string(),
            slug: Some(category.slug().to_string()),
            description: None,
            extra: Map::new(),
        },
        metrics: rows
            .iter()
            .zip(1..)
            .map(|((name, count), id)| Metric {
                id,
                name: (*name).to_string(),
                count: *count,
                extra: Map::new(),
            })
            .collect(),
        meta: None,
    }
}

/// Create a user with the given email and role.
#[must_use]
pub fn make_user(email: &str, role: Role) -> User {
    User {
        id: 7,
        email: email.to_string(),
        name: Some("Test User".to_string()),
        role,
        created_at: None,
    }
}

/// Create a token pair; `refresh` is `None` for cookie-mode logins.
#[must_use]
pub fn make_tokens(access: &str, refresh: Option<&str>) -> AuthTokens {
    AuthTokens {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
    }
}

// =============================================================================
// Envelope Builders
// =============================================================================

/// `{"success": true, "data": ...}`
#[must_use]
pub fn success_envelope(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// `{"success": false, "error": {"code", "message"}}`
#[must_use]
pub fn failure_envelope(code: &str, message: &str) -> Value {
    json!({ "success": false, "error": { "code": code, "message": message } })
}

/// Login/register payload: user fields flattened next to `tokens`.
#[must_use]
pub fn auth_envelope(user: &User, tokens: &AuthTokens) -> Value {
    let mut data = serde_json::to_value(user).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut data {
        map.insert(
            "tokens".to_string(),
            serde_json::to_value(tokens).unwrap_or(Value::Null),
        );
    }
    success_envelope(data)
}

/// Metrics envelope with cache metadata.
#[must_use]
pub fn metrics_envelope(metrics: &CategoryWithMetrics, cached: bool) -> Value {
    let mut envelope = success_envelope(serde_json::to_value(metrics).unwrap_or(Value::Null));
    if let Value::Object(map) = &mut envelope {
        map.insert("meta".to_string(), json!({ "cached": cached }));
    }
    envelope
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
///
/// Creates an isolated directory that is automatically deleted when
/// the `TestDir` is dropped. Uses the `tempfile` crate internally.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file in the temporary directory with the given content.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// Read a file from the temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }

    /// Check if a file exists in the temporary directory.
    #[must_use]
    pub fn file_exists(&self, name: &str) -> bool {
        self.inner.path().join(name).exists()
    }

    /// Get the full path to a file in the temporary directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string is valid JSON.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {
        let json = $json;
        if let Err(e) = serde_json::from_str::<serde_json::Value>(json) {
            panic!(
                "Expected valid JSON, but parsing failed: {}\n\nJSON string:\n{}",
                e, json
            );
        }
    };
}

/// Assert that a string does NOT contain ANSI escape codes.
#[macro_export]
macro_rules! assert_no_ansi_codes {
    ($text:expr) => {
        let text = $text;
        assert!(
            !text.contains('\x1b'),
            "Expected string to NOT contain ANSI escape codes.\n\nActual string:\n{:?}",
            text
        );
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Sample config file pointing at `base_url`.
#[must_use]
pub fn make_test_config_toml(base_url: &str) -> String {
    format!(
        r#"[api]
base_url = "{base_url}"
timeout_seconds = 5

[auth]
refresh_mode = "cookie"

[polling]
interval_seconds = 10
max_retries = 2
category = "traffic"
range = "7d"

[output]
format = "human"
color = false
"#
    )
}

// =============================================================================
// Tests for Test Utilities
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::config::Config;

    #[test]
    fn metrics_factory_numbers_rows() {
        let metrics = make_metrics(Category::Overview, &[("users", 10), ("sessions", 32)]);
        assert_eq!(metrics.metrics[0].id, 1);
        assert_eq!(metrics.metrics[1].id, 2);
        assert_eq!(metrics.total_count(), 42);
    }

    #[test]
    fn auth_envelope_flattens_user() {
        let user = make_user("a@example.com", Role::Admin);
        let envelope = auth_envelope(&user, &make_tokens("acc", Some("ref")));
        assert_eq!(envelope["data"]["email"], "a@example.com");
        assert_eq!(envelope["data"]["role"], "admin");
        assert_eq!(envelope["data"]["tokens"]["accessToken"], "acc");
        assert_eq!(envelope["data"]["tokens"]["refreshToken"], "ref");
    }

    #[test]
    fn sample_config_parses() {
        let config: Config = toml::from_str(&make_test_config_toml("http://x")).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("http://x"));
        assert_eq!(config.polling.max_retries, 2);
    }

    #[test]
    fn test_dir_creates_and_cleans_up() {
        let path: PathBuf;
        {
            let dir = TestDir::new();
            path = dir.path().to_path_buf();
            dir.create_file("nested/test.txt", "hello");
            assert_eq!(dir.read_file("nested/test.txt").unwrap(), "hello");
        }
        assert!(!path.exists());
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi_codes("\x1b[31mred\x1b[0m text"), "red text");
    }

    #[test]
    fn assertion_macros_work() {
        assert_contains!("Hello, world!", "world");
        assert_not_contains!("Hello, world!", "goodbye");
        assert_json_valid!(r#"{"key": "value"}"#);
        assert_no_ansi_codes!("plain text");
    }
}
