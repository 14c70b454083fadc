//! pulse - analytics dashboard client
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use pulse::cli::{Cli, Commands};
use pulse::core::logging;
use pulse::storage::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(|| logging::parse_log_level_from_env().map(logging::LogLevel::from_tracing_level))
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, cli.verbose);

    let config = match ResolvedConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            let format = cli.explicit_format().unwrap_or_default();
            return report(&e, format, cli.no_color, cli.pretty);
        }
    };
    tracing::debug!(
        config_path = %config.config_path.display(),
        mode = %config.refresh_mode,
        "Configuration resolved"
    );

    let no_color = config.no_color || !pulse::util::env::should_use_color(false);
    let format = config.format;
    let pretty = config.pretty;
    if no_color {
        colored::control::set_override(false);
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e, format, no_color, pretty),
    }
}

fn report(
    error: &pulse::PulseError,
    format: pulse::cli::OutputFormat,
    no_color: bool,
    pretty: bool,
) -> ExitCode {
    tracing::error!(code = error.error_code(), "{error}");
    eprintln!(
        "{}",
        pulse::render::error::render_error(error, format, no_color, pretty)
    );
    ExitCode::from(error.exit_code() as u8)
}

async fn run(command: Option<Commands>, config: &ResolvedConfig) -> pulse::Result<()> {
    match command {
        None => {
            print_quickstart();
            Ok(())
        }
        Some(Commands::Login(args)) => pulse::cli::auth::login(&args, config).await,
        Some(Commands::Register(args)) => pulse::cli::auth::register(&args, config).await,
        Some(Commands::Logout) => pulse::cli::auth::logout(config).await,
        Some(Commands::Metrics(args)) => pulse::cli::metrics::execute(&args, config).await,
        Some(Commands::Watch(args)) => pulse::cli::watch::execute(&args, config).await,
        Some(Commands::Export(args)) => pulse::cli::export::execute(&args, config).await,
        Some(Commands::Import(args)) => pulse::cli::import::execute(&args, config).await,
        Some(Commands::Config(cmd)) => pulse::cli::config::execute(&cmd, config),
    }
}

fn print_quickstart() {
    println!(
        r#"pulse - analytics dashboard client

USAGE:
    pulse [OPTIONS] <COMMAND>

COMMANDS:
    login       Log in (password from PULSE_PASSWORD or stdin)
    register    Create an account
    logout      End the session
    metrics     Fetch one metrics category
    watch       Poll a category and keep the display updated
    export      Download a CSV or PDF export
    import      Upload a CSV file (admin only)
    config      Show or create the config file

QUICK START:
    pulse config init
    pulse --api-url https://analytics.example.com login --email you@example.com
    pulse metrics --category traffic --range 7d --email you@example.com
    pulse watch --tui --email you@example.com

ROBOT MODE:
    pulse metrics --json
    pulse watch --json            # one JSON object per update

For more help: pulse --help"#
    );
    println!("\nVersion: {}", env!("CARGO_PKG_VERSION"));
}
