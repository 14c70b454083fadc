//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::api::MetricsQuery;
use crate::core::models::{Category, ExportFormat, TimeRange};
use crate::error::{PulseError, Result};

/// Pulse - analytics dashboard client.
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Backend base URL (e.g. <https://analytics.example.com>)
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// How the refresh credential travels: cookie (default) or body
    #[arg(long, value_name = "MODE", global = true)]
    pub refresh_mode: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Output format given on the command line, if any.
    #[must_use]
    pub const fn explicit_format(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and verify the credentials
    Login(LoginArgs),

    /// Create an account
    Register(RegisterArgs),

    /// End the session and forget the stored refresh token
    Logout,

    /// Fetch one metrics category
    Metrics(MetricsArgs),

    /// Poll a metrics category and keep the display updated
    Watch(WatchArgs),

    /// Download a metrics export
    Export(ExportArgs),

    /// Upload a CSV file for import (admin only)
    Import(ImportArgs),

    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Login options shared by every command that talks to the backend.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Log in as this user first (password from PULSE_PASSWORD or stdin)
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,
}

/// Category and range selection.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Metrics category (overview, traffic, performance)
    #[arg(long, short = 'c', value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Time range (7d, 30d, 90d, 1y)
    #[arg(long, short = 'r', value_name = "RANGE")]
    pub range: Option<String>,
}

impl QueryArgs {
    /// Resolve against configured defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown category or range names.
    pub fn resolve(&self, defaults: MetricsQuery) -> Result<MetricsQuery> {
        let category = self
            .category
            .as_deref()
            .map_or(Ok(defaults.category), Category::from_cli_name)?;
        let range = self
            .range
            .as_deref()
            .map_or(Ok(defaults.range), TimeRange::from_cli_name)?;
        Ok(MetricsQuery::new(category, range))
    }
}

/// Arguments for the `login` command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long, value_name = "EMAIL")]
    pub email: String,
}

/// Arguments for the `register` command.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Display name
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Account email
    #[arg(long, value_name = "EMAIL")]
    pub email: String,
}

/// Arguments for the `metrics` command.
#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the `watch` command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Seconds between fetches; 0 fetches once
    #[arg(long, short = 'i', value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Retries after the first failure before polling pauses
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Full-screen dashboard instead of line output
    #[arg(long)]
    pub tui: bool,
}

/// Arguments for the `export` command.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Export format
    #[arg(value_enum, id = "export_format", value_name = "FORMAT")]
    pub format: ExportFormatArg,

    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Directory to save the file in (default: current directory)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `import` command.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file to upload
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,
}

impl ImportArgs {
    /// Validate the file before any network traffic.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the path does not name a `.csv` file.
    pub fn validate(&self) -> Result<()> {
        let is_csv = self
            .file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(PulseError::ConfigInvalid {
                key: "file".to_string(),
                value: self.file.display().to_string(),
                message: "only .csv files can be imported".to_string(),
            });
        }
        Ok(())
    }
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration and where each value came from
    Show,
    /// Print the config file path
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Export format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Pdf,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Csv => Self::Csv,
            ExportFormatArg::Pdf => Self::Pdf,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}

impl OutputFormat {
    /// Parse from env/config value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown formats.
    pub fn from_arg(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(PulseError::ConfigInvalid {
                key: "output.format".to_string(),
                value: value.to_string(),
                message: "expected 'human' or 'json'".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_flags() {
        let cli = Cli::try_parse_from([
            "pulse",
            "watch",
            "--category",
            "traffic",
            "--range",
            "7d",
            "--interval",
            "5",
            "--max-retries",
            "2",
            "--tui",
        ])
        .unwrap();
        let Some(Commands::Watch(args)) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.interval, Some(5));
        assert_eq!(args.max_retries, Some(2));
        assert!(args.tui);

        let query = args.query.resolve(MetricsQuery::default()).unwrap();
        assert_eq!(query.category, Category::Traffic);
        assert_eq!(query.range, TimeRange::Week);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pulse",
            "metrics",
            "--api-url",
            "http://localhost:3001",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:3001"));
        assert_eq!(cli.explicit_format(), Some(OutputFormat::Json));
    }

    #[test]
    fn query_defaults_apply() {
        let defaults = MetricsQuery::new(Category::Performance, TimeRange::Quarter);
        let query = QueryArgs::default().resolve(defaults).unwrap();
        assert_eq!(query, defaults);

        let bad = QueryArgs {
            category: Some("sales".to_string()),
            range: None,
        };
        assert!(bad.resolve(defaults).is_err());
    }

    #[test]
    fn export_format_positional() {
        let cli = Cli::try_parse_from(["pulse", "export", "pdf", "-o", "/tmp"]).unwrap();
        let Some(Commands::Export(args)) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(ExportFormat::from(args.format), ExportFormat::Pdf);
        assert_eq!(args.output, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn import_requires_csv() {
        let args = ImportArgs {
            file: PathBuf::from("data.xlsx"),
            session: SessionArgs::default(),
        };
        assert!(args.validate().is_err());

        let args = ImportArgs {
            file: PathBuf::from("data.CSV"),
            session: SessionArgs::default(),
        };
        assert!(args.validate().is_ok());
    }
}
