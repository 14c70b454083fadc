//! Metrics table widget for the TUI dashboard.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::core::api::MetricsQuery;
use crate::core::models::CategoryWithMetrics;
use crate::util::format_count;

const BAR_WIDTH: usize = 24;

/// One category's metrics with a proportional bar per row.
pub struct MetricsPanel<'a> {
    metrics: Option<&'a CategoryWithMetrics>,
    query: MetricsQuery,
    /// Dim the panel while the data is older than the last failure.
    stale: bool,
}

impl<'a> MetricsPanel<'a> {
    #[must_use]
    pub const fn new(metrics: Option<&'a CategoryWithMetrics>, query: MetricsQuery, stale: bool) -> Self {
        Self {
            metrics,
            query,
            stale,
        }
    }

    fn bar(count: i64, max: i64) -> String {
        if max <= 0 || count <= 0 {
            return String::new();
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let filled = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
        "█".repeat(filled.clamp(1, BAR_WIDTH))
    }

    fn build_lines(&self, metrics: &'a CategoryWithMetrics) -> Vec<Line<'a>> {
        if metrics.metrics.is_empty() {
            return vec![Line::from(Span::styled(
                "No metrics for this range",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        let name_width = metrics
            .metrics
            .iter()
            .map(|m| m.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(8);
        let max = metrics.metrics.iter().map(|m| m.count).max().unwrap_or(0);
        let value_color = if self.stale { Color::DarkGray } else { Color::Green };

        let mut lines: Vec<Line<'a>> = metrics
            .metrics
            .iter()
            .map(|metric| {
                Line::from(vec![
                    Span::raw(format!("{:<name_width$}  ", metric.name)),
                    Span::styled(
                        format!("{:>12}  ", format_count(metric.count)),
                        Style::default().fg(value_color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(Self::bar(metric.count, max), Style::default().fg(Color::Cyan)),
                ])
            })
            .collect();

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<name_width$}  ", "Total"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:>12}", format_count(metrics.total_count())),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]));
        lines
    }
}

impl Widget for MetricsPanel<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let name = self
            .metrics
            .map(|m| m.category.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.query.category.display_name());
        let cached = self
            .metrics
            .and_then(|m| m.meta.as_ref())
            .is_some_and(crate::core::envelope::ResponseMeta::is_cached);

        let mut title = vec![
            Span::styled(
                format!(" {name} "),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("({}) ", self.query.range.label()),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if cached {
            title.push(Span::styled("[cached] ", Style::default().fg(Color::Yellow)));
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let lines = match self.metrics {
            Some(metrics) => self.build_lines(metrics),
            None => vec![Line::from(Span::styled(
                "Waiting for first response...",
                Style::default().fg(Color::DarkGray),
            ))],
        };

        Paragraph::new(lines).block(block).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Category, TimeRange};
    use ratatui::buffer::Buffer;

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(ratatui::buffer::Cell::symbol).collect()
    }

    #[test]
    fn bar_scales_to_max() {
        assert_eq!(MetricsPanel::bar(100, 100).chars().count(), BAR_WIDTH);
        assert_eq!(MetricsPanel::bar(1, 1000).chars().count(), 1);
        assert!(MetricsPanel::bar(0, 100).is_empty());
    }

    #[test]
    fn renders_rows_and_total() {
        let metrics = crate::test_utils::make_metrics(Category::Traffic, &[("visits", 1500), ("bounces", 20)]);
        let panel = MetricsPanel::new(Some(&metrics), MetricsQuery::new(Category::Traffic, TimeRange::Week), false);
        let area = Rect::new(0, 0, 70, 8);
        let mut buf = Buffer::empty(area);
        panel.render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("Traffic"));
        assert!(text.contains("visits"));
        assert!(text.contains("1,500"));
        assert!(text.contains("Total"));
    }

    #[test]
    fn renders_placeholder_without_data() {
        let panel = MetricsPanel::new(None, MetricsQuery::default(), false);
        let area = Rect::new(0, 0, 50, 4);
        let mut buf = Buffer::empty(area);
        panel.render(area, &mut buf);
        assert!(buffer_text(&buf).contains("Waiting"));
    }
}
