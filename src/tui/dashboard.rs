//! Dashboard widget for the TUI.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::core::api::MetricsQuery;
use crate::core::models::CategoryWithMetrics;
use crate::core::poller::{PollPhase, PollSnapshot};
use crate::util::format_relative_time;

use super::metrics_panel::MetricsPanel;

/// The main dashboard layout.
pub struct Dashboard<'a> {
    snapshot: &'a PollSnapshot<CategoryWithMetrics>,
    query: MetricsQuery,
    focused: bool,
    show_help: bool,
}

impl<'a> Dashboard<'a> {
    #[must_use]
    pub const fn new(
        snapshot: &'a PollSnapshot<CategoryWithMetrics>,
        query: MetricsQuery,
        focused: bool,
        show_help: bool,
    ) -> Self {
        Self {
            snapshot,
            query,
            focused,
            show_help,
        }
    }

    fn phase_style(phase: PollPhase) -> Style {
        match phase {
            PollPhase::Active => Style::default().fg(Color::Green),
            PollPhase::BackingOff => Style::default().fg(Color::Yellow),
            PollPhase::Paused => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            PollPhase::Suspended => Style::default().fg(Color::DarkGray),
        }
    }

    fn render_header(&self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let mut spans = vec![
            Span::styled(
                " pulse ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("● {}", self.snapshot.phase.label()),
                Self::phase_style(self.snapshot.phase),
            ),
        ];
        if self.snapshot.is_loading {
            spans.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
        }
        if !self.focused {
            spans.push(Span::styled("  (unfocused)", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(
            "    [r] Refresh  [p] Resume  [?] Help  [q] Quit",
            Style::default().fg(Color::DarkGray),
        ));

        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let Some(error) = &self.snapshot.error else {
            return;
        };

        let mut lines = vec![Line::from(vec![
            Span::styled("⚠ ", Style::default().fg(Color::Yellow)),
            Span::raw(error.clone()),
        ])];
        let hint = if self.snapshot.is_polling_paused {
            format!(
                "Polling stopped after {} failures. Press 'p' to resume.",
                self.snapshot.consecutive_failures
            )
        } else {
            format!(
                "{} consecutive failure(s); retrying with backoff.",
                self.snapshot.consecutive_failures
            )
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));

        let block = Block::default()
            .title(" Error ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        Paragraph::new(lines).block(block).render(area, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let update_text = self.snapshot.last_updated.map_or_else(
            || "Fetching...".to_string(),
            |ts| format!("Last updated: {}", format_relative_time(ts.min(Utc::now()))),
        );
        Paragraph::new(Line::from(vec![
            Span::raw(" "),
            Span::styled(update_text, Style::default().fg(Color::DarkGray)),
        ]))
        .render(area, buf);
    }

    fn render_help(area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let help_text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  pulse dashboard - Keyboard Shortcuts",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("    r, F5         Fetch now"),
            Line::from("    p             Resume polling after failures"),
            Line::from("    ?, F1         Toggle this help"),
            Line::from("    q, Esc        Quit"),
            Line::from(""),
            Line::from("  Polling stops while the terminal is unfocused"),
            Line::from("  and fetches again when focus returns."),
            Line::from(""),
            Line::from(Span::styled(
                "  Press any key to close",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let help_width = 54.min(area.width);
        let help_height = 15.min(area.height);
        let x = area.x + (area.width.saturating_sub(help_width)) / 2;
        let y = area.y + (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(x, y, help_width, help_height);

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        Clear.render(help_area, buf);
        Paragraph::new(help_text).block(block).render(help_area, buf);
    }
}

impl Widget for Dashboard<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let has_error = self.snapshot.error.is_some();
        let mut constraints = vec![Constraint::Length(1), Constraint::Min(5)];
        if has_error {
            constraints.push(Constraint::Length(4));
        }
        constraints.push(Constraint::Length(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_header(chunks[0], buf);

        let stale = has_error && self.snapshot.data.is_some();
        MetricsPanel::new(self.snapshot.data.as_deref(), self.query, stale).render(chunks[1], buf);

        if has_error {
            self.render_status(chunks[2], buf);
            self.render_footer(chunks[3], buf);
        } else {
            self.render_footer(chunks[2], buf);
        }

        if self.show_help {
            Self::render_help(area, buf);
        }
    }
}
