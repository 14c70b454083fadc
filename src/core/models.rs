//! Data models for the analytics backend.
//!
//! Wire types use camelCase to match the backend; unknown fields on metric
//! records are kept in `extra` so JSON output never drops data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::envelope::ResponseMeta;
use crate::error::{PulseError, Result};

// =============================================================================
// Category
// =============================================================================

/// Metric categories served by `/api/metrics/:category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Overview,
    Traffic,
    Performance,
}

impl Category {
    /// All categories in display order.
    pub const ALL: &'static [Self] = &[Self::Overview, Self::Traffic, Self::Performance];

    /// Path segment / CLI name.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Traffic => "traffic",
            Self::Performance => "performance",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Traffic => "Traffic",
            Self::Performance => "Site Performance",
        }
    }

    /// Parse from CLI argument.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown names.
    pub fn from_cli_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|c| c.slug() == lower)
            .copied()
            .ok_or_else(|| PulseError::ConfigInvalid {
                key: "category".to_string(),
                value: name.to_string(),
                message: "expected one of: overview, traffic, performance".to_string(),
            })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

// =============================================================================
// Time range
// =============================================================================

/// Reporting window accepted by the `range` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    pub const ALL: &'static [Self] = &[Self::Week, Self::Month, Self::Quarter, Self::Year];

    /// Query-string value.
    #[must_use]
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Week => "last 7 days",
            Self::Month => "last 30 days",
            Self::Quarter => "last 90 days",
            Self::Year => "last year",
        }
    }

    /// Parse from CLI argument.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown ranges.
    pub fn from_cli_name(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|r| r.as_query() == lower)
            .copied()
            .ok_or_else(|| PulseError::ConfigInvalid {
                key: "range".to_string(),
                value: value.to_string(),
                message: "expected one of: 7d, 30d, 90d, 1y".to_string(),
            })
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

// =============================================================================
// Metrics payloads
// =============================================================================

/// Category descriptor returned alongside its metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One metric row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub count: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of `GET /api/metrics/:category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithMetrics {
    #[serde(default)]
    pub category: CategoryInfo,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    /// Cache metadata lifted from the envelope.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

impl CategoryWithMetrics {
    /// Sum of all metric counts.
    #[must_use]
    pub fn total_count(&self) -> i64 {
        self.metrics.iter().map(|m| m.count).sum()
    }

    /// Find a metric by name (case-insensitive).
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

// =============================================================================
// Auth payloads
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Token pair. The refresh token is absent when the server delivers it as a cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Payload of login and register: user fields plus the token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(flatten)]
    pub user: User,
    pub tokens: AuthTokens,
}

/// Payload of `/api/auth/refresh`; accepted flat or nested under `tokens`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefreshPayload {
    Nested { tokens: AuthTokens },
    Flat(AuthTokens),
}

impl RefreshPayload {
    #[must_use]
    pub fn into_tokens(self) -> AuthTokens {
        match self {
            Self::Nested { tokens } | Self::Flat(tokens) => tokens,
        }
    }
}

// =============================================================================
// Export / import
// =============================================================================

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    /// File name the dashboard saves exports under.
    #[must_use]
    pub fn file_name(self, category: Category, range: TimeRange) -> String {
        format!(
            "metrics-{}-{}.{}",
            category.slug(),
            range.as_query(),
            self.extension()
        )
    }
}

/// Result of a CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_round_trips_cli_names() {
        for category in Category::ALL {
            assert_eq!(Category::from_cli_name(category.slug()).unwrap(), *category);
        }
        assert_eq!(Category::from_cli_name("TRAFFIC").unwrap(), Category::Traffic);
        assert!(Category::from_cli_name("sales").is_err());
    }

    #[test]
    fn time_range_parses_query_values() {
        assert_eq!(TimeRange::from_cli_name("7d").unwrap(), TimeRange::Week);
        assert_eq!(TimeRange::from_cli_name("1y").unwrap(), TimeRange::Year);
        assert_eq!(TimeRange::default().as_query(), "30d");
        assert!(TimeRange::from_cli_name("2w").is_err());
    }

    #[test]
    fn category_with_metrics_keeps_unknown_fields() {
        let value = json!({
            "category": {"id": 2, "name": "Traffic", "slug": "traffic", "color": "#fff"},
            "metrics": [
                {"id": 1, "name": "X", "count": 10, "trend": "up"},
                {"id": 2, "name": "Y", "count": 5}
            ]
        });
        let payload: CategoryWithMetrics = serde_json::from_value(value).unwrap();
        assert_eq!(payload.category.name, "Traffic");
        assert_eq!(payload.category.extra.get("color"), Some(&json!("#fff")));
        assert_eq!(payload.metrics[0].extra.get("trend"), Some(&json!("up")));
        assert_eq!(payload.total_count(), 15);
        assert_eq!(payload.metric("y").map(|m| m.count), Some(5));
    }

    #[test]
    fn auth_payload_flattens_user_fields() {
        let value = json!({
            "id": 7,
            "email": "admin@example.com",
            "name": "Admin",
            "role": "admin",
            "tokens": {"accessToken": "a1", "refreshToken": "r1"}
        });
        let payload: AuthPayload = serde_json::from_value(value).unwrap();
        assert!(payload.user.is_admin());
        assert_eq!(payload.tokens.access_token, "a1");
        assert_eq!(payload.tokens.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn refresh_payload_accepts_both_shapes() {
        let flat: RefreshPayload = serde_json::from_value(json!({"accessToken": "a2"})).unwrap();
        assert_eq!(flat.into_tokens().access_token, "a2");

        let nested: RefreshPayload = serde_json::from_value(
            json!({"tokens": {"accessToken": "a3", "refreshToken": "r3"}}),
        )
        .unwrap();
        let tokens = nested.into_tokens();
        assert_eq!(tokens.access_token, "a3");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r3"));
    }

    #[test]
    fn tokens_debug_is_redacted() {
        let tokens = AuthTokens {
            access_token: "secret-access".to_string(),
            refresh_token: Some("secret-refresh".to_string()),
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn export_file_name() {
        assert_eq!(
            ExportFormat::Pdf.file_name(Category::Traffic, TimeRange::Quarter),
            "metrics-traffic-90d.pdf"
        );
    }
}
