//! Error rendering.
//!
//! Styled output with fix suggestions on a terminal, plain text elsewhere,
//! and a structured JSON object in JSON mode.

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::{FixSuggestion, PulseError};

const WRAP_WIDTH: usize = 68;

// =============================================================================
// Public API
// =============================================================================

/// Render an error for stderr.
///
/// Styled output is used only for the human format, with colors enabled and
/// stderr attached to a terminal.
#[must_use]
pub fn render_error(error: &PulseError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    if format == OutputFormat::Json {
        return render_error_json(error, pretty);
    }

    if !no_color && crate::util::env::stderr_is_tty() {
        render_styled(error)
    } else {
        render_simple(error)
    }
}

/// Render error as structured JSON for machine consumption.
#[must_use]
pub fn render_error_json(error: &PulseError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

// =============================================================================
// Styled Terminal Rendering
// =============================================================================

fn render_styled(error: &PulseError) -> String {
    let suggestions = error.fix_suggestions();
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "{} {}",
        error.user_message().red().bold(),
        format!("[{}]", error.error_code()).dimmed()
    ));

    if !suggestions.is_empty() {
        lines.push(String::new());
        lines.push(render_suggestions_section(&suggestions));
    }

    if let Some(context) = suggestions.first().map(|s| &s.context) {
        if !context.is_empty() {
            lines.push(String::new());
            lines.push("Why this happened:".yellow().to_string());
            lines.extend(wrap_text(context, WRAP_WIDTH).into_iter().map(|l| format!("  {l}")));
        }
    }

    if let Some(prevention) = suggestions.first().and_then(|s| s.prevention.as_ref()) {
        lines.push(String::new());
        lines.push("Prevention:".green().to_string());
        lines.extend(wrap_text(prevention, WRAP_WIDTH).into_iter().map(|l| format!("  {l}")));
    }

    lines.join("\n")
}

fn render_suggestions_section(suggestions: &[FixSuggestion]) -> String {
    let mut lines = vec!["How to fix:".cyan().bold().to_string()];

    for (i, suggestion) in suggestions.iter().enumerate() {
        for (j, cmd) in suggestion.commands.iter().enumerate() {
            let prefix = if j == 0 {
                format!("  {}. ", i + 1)
            } else {
                "     Or: ".to_string()
            };
            lines.push(format!("{prefix}{}", cmd.cyan()));
        }
    }

    lines.join("\n")
}

// =============================================================================
// Simple Text Rendering
// =============================================================================

/// Render error as simple text (no ANSI codes).
fn render_simple(error: &PulseError) -> String {
    let mut lines = vec![format!(
        "Error [{}]: {}",
        error.error_code(),
        error.user_message()
    )];

    let fix = error
        .fix_suggestions()
        .into_iter()
        .flat_map(|s| s.commands)
        .find(|cmd| !cmd.starts_with('#'));
    if let Some(cmd) = fix {
        lines.push(format!("Fix: {cmd}"));
    }

    lines.join("\n")
}

// =============================================================================
// JSON Rendering
// =============================================================================

#[derive(serde::Serialize)]
struct ErrorJson {
    error_code: String,
    category: String,
    message: String,
    is_retryable: bool,
    requires_reauth: bool,
    exit_code: i32,
    suggestions: Vec<SuggestionJson>,
}

#[derive(serde::Serialize)]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &PulseError) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            category: error.category().to_string(),
            message: error.user_message(),
            is_retryable: error.is_retryable(),
            requires_reauth: error.requires_reauth(),
            exit_code: error.exit_code().into(),
            suggestions: error
                .fix_suggestions()
                .into_iter()
                .map(|s| SuggestionJson {
                    commands: s.commands,
                    context: s.context,
                    prevention: s.prevention,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Greedy word wrap.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() || lines.is_empty() {
        lines.push(current_line);
    }

    lines
}

// =============================================================================
// Tests
// =============================================================================
