//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use std::path::Path;

use serde_json::json;

use crate::cli::args::OutputFormat;
use crate::core::api::MetricsQuery;
use crate::core::models::{CategoryWithMetrics, ImportSummary, User};
use crate::error::Result;

/// Render one metrics fetch.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_metrics(
    metrics: &CategoryWithMetrics,
    query: MetricsQuery,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_metrics(metrics, query, no_color)),
        OutputFormat::Json => robot::render_metrics_json(metrics, pretty),
    }
}

/// Render the user returned by login or registration.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_user(
    command: &str,
    user: &User,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => {
            let action = match command {
                "register" => "Registered",
                _ => "Logged in as",
            };
            Ok(human::render_user(action, user, no_color))
        }
        OutputFormat::Json => robot::render_user_json(command, user, pretty),
    }
}

/// Render an import summary.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_import(
    summary: &ImportSummary,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_import(summary, no_color)),
        OutputFormat::Json => robot::render_import_json(summary, pretty),
    }
}

/// Render where an export was written.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_export(
    path: &Path,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_export(path, no_color)),
        OutputFormat::Json => robot::render_json(
            &robot::RobotOutput::new("export", json!({ "path": path.display().to_string() })),
            pretty,
        ),
    }
}
