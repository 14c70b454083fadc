//! `pulse config show|path|init`.

use std::fmt::Write as _;

use serde_json::json;

use crate::cli::args::{ConfigCommand, OutputFormat};
use crate::error::{PulseError, Result};
use crate::render::robot::{RobotOutput, render_json};
use crate::storage::config::{Config, ResolvedConfig};

/// Execute a config subcommand.
///
/// # Errors
///
/// `Config` when `init` would overwrite an existing file without `--force`,
/// or I/O errors writing it.
pub fn execute(cmd: &ConfigCommand, config: &ResolvedConfig) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("{}", render_show(config)?);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", config.config_path.display());
            Ok(())
        }
        ConfigCommand::Init { force } => init(config, *force),
    }
}

fn init(config: &ResolvedConfig, force: bool) -> Result<()> {
    let path = &config.config_path;
    if path.exists() && !force {
        return Err(PulseError::Config(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }
    Config::default().save_to(path)?;
    tracing::info!(path = %path.display(), "Wrote default config");
    println!("Wrote {}", path.display());
    Ok(())
}

/// Resolved settings with the source of each value.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn render_show(config: &ResolvedConfig) -> Result<String> {
    let sources = &config.sources;
    let base_url = config.base_url.as_deref().unwrap_or("(not set)");
    let polling = &config.polling;

    if config.format == OutputFormat::Json {
        let data = json!({
            "configPath": config.config_path.display().to_string(),
            "configExists": config.config_path.exists(),
            "baseUrl": { "value": config.base_url, "source": sources.base_url.to_string() },
            "refreshMode": { "value": config.refresh_mode, "source": sources.refresh_mode.to_string() },
            "timeoutSeconds": { "value": config.timeout.as_secs(), "source": sources.timeout.to_string() },
            "format": { "value": "json", "source": sources.format.to_string() },
            "noColor": { "value": config.no_color, "source": sources.no_color.to_string() },
            "verbose": { "value": config.verbose, "source": sources.verbose.to_string() },
            "pretty": { "value": config.pretty, "source": sources.pretty.to_string() },
            "polling": {
                "intervalSeconds": polling.options.interval.as_secs(),
                "maxRetries": polling.options.max_retries,
                "category": polling.query.category,
                "range": polling.query.range,
            },
        });
        return render_json(&RobotOutput::new("config", data), config.pretty);
    }

    let exists = if config.config_path.exists() {
        ""
    } else {
        " (not found, using defaults)"
    };
    let mut out = format!("Config file: {}{exists}\n\n", config.config_path.display());
    let rows: [(&str, String, String); 7] = [
        ("api.base_url", base_url.to_string(), sources.base_url.to_string()),
        (
            "auth.refresh_mode",
            config.refresh_mode.to_string(),
            sources.refresh_mode.to_string(),
        ),
        (
            "api.timeout",
            format!("{}s", config.timeout.as_secs()),
            sources.timeout.to_string(),
        ),
        ("output.format", "human".to_string(), sources.format.to_string()),
        ("output.no_color", config.no_color.to_string(), sources.no_color.to_string()),
        ("verbose", config.verbose.to_string(), sources.verbose.to_string()),
        ("output.pretty", config.pretty.to_string(), sources.pretty.to_string()),
    ];
    for (key, value, source) in rows {
        let _ = writeln!(out, "{key:<20} {value:<32} ({source})");
    }
    let _ = writeln!(
        out,
        "{:<20} {}s, {} retries, {} / {}",
        "polling",
        polling.options.interval.as_secs(),
        polling.options.max_retries,
        polling.query.category,
        polling.query.range,
    );
    Ok(out.trim_end().to_string())
}
