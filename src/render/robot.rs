//! Robot-mode output (JSON).
//!
//! Every command wraps its payload in a [`RobotOutput`] so scripts can rely
//! on one stable shape.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::models::{CategoryWithMetrics, ImportSummary, User};
use crate::core::poller::PollSnapshot;
use crate::error::Result;

/// Schema identifier carried by every JSON document.
pub const SCHEMA_VERSION: &str = "pulse.v1";

/// Top-level JSON document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
    pub errors: Vec<String>,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

/// One line of `watch --json` output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchTick<'a> {
    pub phase: &'static str,
    pub is_loading: bool,
    pub is_polling_paused: bool,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<&'a CategoryWithMetrics>,
}

impl<'a> WatchTick<'a> {
    #[must_use]
    pub fn from_snapshot(snapshot: &'a PollSnapshot<CategoryWithMetrics>) -> Self {
        Self {
            phase: snapshot.phase.label(),
            is_loading: snapshot.is_loading,
            is_polling_paused: snapshot.is_polling_paused,
            consecutive_failures: snapshot.consecutive_failures,
            last_updated: snapshot.last_updated,
            error: snapshot.error.as_deref(),
            metrics: snapshot.data.as_deref(),
        }
    }
}

/// Render any serializable value as JSON.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}

/// Render metrics as JSON.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_metrics_json(metrics: &CategoryWithMetrics, pretty: bool) -> Result<String> {
    render_json(&RobotOutput::new("metrics", metrics), pretty)
}

/// Render an authenticated user as JSON.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_user_json(command: &str, user: &User, pretty: bool) -> Result<String> {
    render_json(&RobotOutput::new(command, user), pretty)
}

/// Render an import summary as JSON.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_import_json(summary: &ImportSummary, pretty: bool) -> Result<String> {
    let output = RobotOutput::new("import", summary).with_errors(summary.errors.clone());
    render_json(&output, pretty)
}

/// Render one watch update as a single JSON line.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_watch_tick(snapshot: &PollSnapshot<CategoryWithMetrics>) -> Result<String> {
    render_json(
        &RobotOutput::new("watch", WatchTick::from_snapshot(snapshot)),
        false,
    )
}
