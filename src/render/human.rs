//! Human-readable output using `colored`.
//!
//! Metrics render as an aligned two-column table; watch mode prefixes each
//! frame with a one-line poll status.

use std::fmt::Write as _;
use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::core::api::MetricsQuery;
use crate::core::models::{CategoryWithMetrics, ImportSummary, User};
use crate::core::poller::{PollPhase, PollSnapshot};
use crate::util::{format_clock, format_count};

const MIN_NAME_WIDTH: usize = 12;

/// Apply or strip styling.
fn paint(text: ColoredString, no_color: bool) -> String {
    if no_color {
        text.clear().to_string()
    } else {
        text.to_string()
    }
}

/// Render a metrics payload.
#[must_use]
pub fn render_metrics(metrics: &CategoryWithMetrics, query: MetricsQuery, no_color: bool) -> String {
    let mut out = String::new();

    let title = if metrics.category.name.is_empty() {
        query.category.display_name().to_string()
    } else {
        metrics.category.name.clone()
    };
    let mut header = format!(
        "{} {}",
        paint(title.bold(), no_color),
        paint(format!("({})", query.range.label()).dimmed(), no_color)
    );
    if metrics.meta.as_ref().is_some_and(crate::core::envelope::ResponseMeta::is_cached) {
        header.push(' ');
        header.push_str(&paint("[cached]".yellow(), no_color));
    }
    out.push_str(&header);
    out.push('\n');

    if let Some(description) = &metrics.category.description {
        let _ = writeln!(out, "{}", paint(description.as_str().dimmed(), no_color));
    }

    if metrics.metrics.is_empty() {
        out.push_str(&paint("  No metrics for this range.".dimmed(), no_color));
        out.push('\n');
        return out;
    }

    let name_width = metrics
        .metrics
        .iter()
        .map(|m| m.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);
    let counts: Vec<String> = metrics.metrics.iter().map(|m| format_count(m.count)).collect();
    let total = format_count(metrics.total_count());
    let count_width = counts
        .iter()
        .map(String::len)
        .chain(std::iter::once(total.len()))
        .max()
        .unwrap_or(0);

    for (metric, count) in metrics.metrics.iter().zip(&counts) {
        let _ = writeln!(
            out,
            "  {:<name_width$}  {}",
            metric.name,
            paint(format!("{count:>count_width$}").cyan(), no_color),
        );
    }
    let _ = writeln!(
        out,
        "  {}",
        paint("-".repeat(name_width + 2 + count_width).dimmed(), no_color)
    );
    let _ = writeln!(
        out,
        "  {:<name_width$}  {}",
        "Total",
        paint(format!("{total:>count_width$}").bold(), no_color),
    );

    out
}

/// One-line poll status for watch mode.
#[must_use]
pub fn render_poll_status<T>(snapshot: &PollSnapshot<T>, no_color: bool) -> String {
    let phase = match snapshot.phase {
        PollPhase::Active => paint("live".green(), no_color),
        PollPhase::BackingOff => paint(
            format!("retrying ({} failed)", snapshot.consecutive_failures).yellow(),
            no_color,
        ),
        PollPhase::Paused => paint("paused".red().bold(), no_color),
        PollPhase::Suspended => paint("suspended".dimmed(), no_color),
    };

    let mut line = format!("[{phase}]");
    if snapshot.is_loading {
        line.push_str(" loading...");
    }
    if let Some(at) = snapshot.last_updated {
        let _ = write!(line, " updated {}", format_clock(at));
    }
    if let Some(error) = &snapshot.error {
        let _ = write!(line, " {}", paint(format!("error: {error}").red(), no_color));
    }
    if snapshot.is_polling_paused {
        let _ = write!(
            line,
            " {}",
            paint("polling stopped after repeated failures".dimmed(), no_color)
        );
    }
    line
}

/// A full watch frame: status line plus the latest data, if any.
#[must_use]
pub fn render_watch_frame(
    snapshot: &PollSnapshot<CategoryWithMetrics>,
    query: MetricsQuery,
    no_color: bool,
) -> String {
    let mut out = render_poll_status(snapshot, no_color);
    out.push('\n');
    if let Some(data) = &snapshot.data {
        out.push_str(&render_metrics(data, query, no_color));
    }
    out
}

/// Confirmation after login or registration.
#[must_use]
pub fn render_user(action: &str, user: &User, no_color: bool) -> String {
    let who = user.name.as_deref().map_or_else(
        || user.email.clone(),
        |name| format!("{name} <{}>", user.email),
    );
    let role = if user.is_admin() { " (admin)" } else { "" };
    format!("{} {who}{role}", paint(action.green().bold(), no_color))
}

/// Result of a CSV import.
#[must_use]
pub fn render_import(summary: &ImportSummary, no_color: bool) -> String {
    let mut out = format!(
        "{} {} imported, {} skipped",
        paint("Import finished:".green().bold(), no_color),
        format_count(i64::try_from(summary.imported).unwrap_or(i64::MAX)),
        format_count(i64::try_from(summary.skipped).unwrap_or(i64::MAX)),
    );
    for error in &summary.errors {
        let _ = write!(out, "\n  {}", paint(error.as_str().yellow(), no_color));
    }
    out
}

/// Location of a saved export.
#[must_use]
pub fn render_export(path: &Path, no_color: bool) -> String {
    format!(
        "{} {}",
        paint("Saved".green().bold(), no_color),
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::envelope::ResponseMeta;
    use crate::core::models::{Category, CategoryInfo, Metric, Role, TimeRange};
    use serde_json::Map;
    use std::sync::Arc;

    fn metric(id: i64, name: &str, count: i64) -> Metric {
        Metric {
            id,
            name: name.to_string(),
            count,
            extra: Map::new(),
        }
    }

    fn traffic() -> CategoryWithMetrics {
        CategoryWithMetrics {
            category: CategoryInfo {
                name: "Traffic".to_string(),
                ..CategoryInfo::default()
            },
            metrics: vec![metric(1, "Page views", 12_500), metric(2, "Visitors", 830)],
            meta: Some(ResponseMeta {
                cached: Some(true),
                cached_at: None,
            }),
        }
    }

    fn query() -> MetricsQuery {
        MetricsQuery::new(Category::Traffic, TimeRange::Month)
    }

    #[test]
    fn metrics_table_plain() {
        let out = render_metrics(&traffic(), query(), true);
        assert!(out.starts_with("Traffic (last 30 days) [cached]"));
        assert!(out.contains("Page views"));
        assert!(out.contains("12,500"));
        assert!(out.contains("Total"));
        assert!(out.contains("13,330"));
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn empty_metrics_message() {
        let mut data = traffic();
        data.metrics.clear();
        let out = render_metrics(&data, query(), true);
        assert!(out.contains("No metrics"));
    }

    #[test]
    fn falls_back_to_category_display_name() {
        let mut data = traffic();
        data.category.name.clear();
        let out = render_metrics(&data, MetricsQuery::new(Category::Performance, TimeRange::Week), true);
        assert!(out.starts_with("Site Performance (last 7 days)"));
    }

    #[test]
    fn status_line_shows_pause_and_error() {
        let snapshot: PollSnapshot<CategoryWithMetrics> = PollSnapshot {
            error: Some("Database unavailable".to_string()),
            is_polling_paused: true,
            consecutive_failures: 4,
            phase: PollPhase::Paused,
            ..PollSnapshot::default()
        };
        let line = render_poll_status(&snapshot, true);
        assert!(line.starts_with("[paused]"));
        assert!(line.contains("error: Database unavailable"));
        assert!(line.contains("polling stopped"));
    }

    #[test]
    fn watch_frame_includes_table() {
        let snapshot = PollSnapshot {
            data: Some(Arc::new(traffic())),
            ..PollSnapshot::default()
        };
        let frame = render_watch_frame(&snapshot, query(), true);
        assert!(frame.starts_with("[live]"));
        assert!(frame.contains("Visitors"));
    }

    #[test]
    fn user_line() {
        let user = User {
            id: 1,
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
            role: Role::Admin,
            created_at: None,
        };
        assert_eq!(
            render_user("Logged in as", &user, true),
            "Logged in as Ada <ada@example.com> (admin)"
        );
    }

    #[test]
    fn import_lists_row_errors() {
        let summary = ImportSummary {
            imported: 10,
            skipped: 2,
            errors: vec!["row 3: bad date".to_string()],
        };
        let out = render_import(&summary, true);
        assert!(out.contains("10 imported, 2 skipped"));
        assert!(out.contains("row 3: bad date"));
    }
}
