//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/pulse/config.toml`
//! - macOS: `~/Library/Application Support/io.pulse.pulse/config.toml`
//! - Windows: `%APPDATA%/pulse/pulse/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `PULSE_API_URL`: Backend base URL
//! - `PULSE_REFRESH_MODE`: `cookie` or `body`
//! - `PULSE_FORMAT`: Output format (human, json)
//! - `PULSE_TIMEOUT`: Request timeout in seconds
//! - `PULSE_NO_COLOR` or `NO_COLOR`: Disable colors (1, true, yes)
//! - `PULSE_VERBOSE`: Enable verbose output (1, true, yes)
//! - `PULSE_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `PULSE_CONFIG`: Override config file path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat};
use crate::core::api::MetricsQuery;
use crate::core::models::{Category, TimeRange};
use crate::core::poller::{DEFAULT_MAX_RETRIES, PollOptions};
use crate::core::refresh_store::RefreshMode;
use crate::error::{PulseError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_API_URL: &str = "PULSE_API_URL";
pub const ENV_REFRESH_MODE: &str = "PULSE_REFRESH_MODE";
pub const ENV_FORMAT: &str = "PULSE_FORMAT";
pub const ENV_TIMEOUT: &str = "PULSE_TIMEOUT";
pub const ENV_NO_COLOR: &str = "PULSE_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
pub const ENV_VERBOSE: &str = "PULSE_VERBOSE";
pub const ENV_PRETTY: &str = "PULSE_PRETTY";
pub const ENV_CONFIG: &str = "PULSE_CONFIG";

/// Base URL used in body (legacy) refresh mode when none is configured.
pub const LEGACY_DEFAULT_BASE_URL: &str = "http://localhost:3001";

const MAX_TIMEOUT_SECONDS: u64 = 300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Backend base URL. `None` only in cookie mode with nothing configured.
    pub base_url: Option<String>,
    pub refresh_mode: RefreshMode,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub no_color: bool,
    pub verbose: bool,
    pub pretty: bool,
    /// Polling and query defaults from the config file.
    pub polling: PollingDefaults,
    /// Config file consulted.
    pub config_path: PathBuf,
    /// Source of each setting for `pulse config show`.
    pub sources: ConfigSources,
}

/// Defaults for `watch`, `metrics` and `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingDefaults {
    pub options: PollOptions,
    pub query: MetricsQuery,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub base_url: ConfigSource,
    pub refresh_mode: ConfigSource,
    pub timeout: ConfigSource,
    pub format: ConfigSource,
    pub no_color: ConfigSource,
    pub verbose: ConfigSource,
    pub pretty: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Env,
    ConfigFile,
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or if any
    /// resolved value is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config_path = Self::config_path_from_env();
        let config = Config::load_from(&config_path)?;
        Self::resolve_with(cli, &config, config_path)
    }

    /// Resolve against an already loaded config file.
    ///
    /// # Errors
    ///
    /// Returns an error if any resolved value is invalid.
    pub fn resolve_with(cli: &Cli, config: &Config, config_path: PathBuf) -> Result<Self> {
        config.validate()?;

        let mut sources = ConfigSources::default();

        let refresh_mode = Self::resolve_refresh_mode(cli, config, &mut sources.refresh_mode)?;
        let base_url = Self::resolve_base_url(cli, config, refresh_mode, &mut sources.base_url);
        let timeout = Self::resolve_timeout(cli, config, &mut sources.timeout)?;
        let format = Self::resolve_format(cli, config, &mut sources.format)?;
        let no_color = Self::resolve_no_color(cli, config, &mut sources.no_color);
        let verbose = Self::resolve_verbose(cli, &mut sources.verbose);
        let pretty = Self::resolve_pretty(cli, config, &mut sources.pretty);
        let polling = config.polling.defaults()?;

        Ok(Self {
            base_url,
            refresh_mode,
            timeout,
            format,
            no_color,
            verbose,
            pretty,
            polling,
            config_path,
            sources,
        })
    }

    /// The base URL, or a configuration error when none is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` in cookie mode without a configured URL.
    pub fn require_base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| PulseError::ConfigMissing {
                key: "api.base_url".to_string(),
                hint: format!(
                    "Pass --api-url, set {ENV_API_URL}, or add base_url under [api] in the config file"
                ),
            })
    }

    fn config_path_from_env() -> PathBuf {
        std::env::var(ENV_CONFIG)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map_or_else(Config::config_path, PathBuf::from)
    }

    fn resolve_refresh_mode(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<RefreshMode> {
        if let Some(mode) = &cli.refresh_mode {
            *source = ConfigSource::Cli;
            return RefreshMode::from_arg(mode);
        }
        if let Some(mode) = env_value(ENV_REFRESH_MODE) {
            *source = ConfigSource::Env;
            return RefreshMode::from_arg(&mode);
        }
        if let Some(mode) = &config.auth.refresh_mode {
            *source = ConfigSource::ConfigFile;
            return RefreshMode::from_arg(mode);
        }
        *source = ConfigSource::Default;
        Ok(RefreshMode::default())
    }

    fn resolve_base_url(
        cli: &Cli,
        config: &Config,
        mode: RefreshMode,
        source: &mut ConfigSource,
    ) -> Option<String> {
        if let Some(url) = &cli.api_url {
            *source = ConfigSource::Cli;
            return Some(normalize_url(url));
        }
        if let Some(url) = env_value(ENV_API_URL) {
            *source = ConfigSource::Env;
            return Some(normalize_url(&url));
        }
        if let Some(url) = &config.api.base_url {
            *source = ConfigSource::ConfigFile;
            return Some(normalize_url(url));
        }

        *source = ConfigSource::Default;
        match mode {
            RefreshMode::Body => Some(LEGACY_DEFAULT_BASE_URL.to_string()),
            RefreshMode::Cookie => None,
        }
    }

    fn resolve_timeout(cli: &Cli, config: &Config, source: &mut ConfigSource) -> Result<Duration> {
        if let Some(seconds) = cli.timeout {
            *source = ConfigSource::Cli;
            return validate_timeout(seconds, "--timeout").map(Duration::from_secs);
        }
        if let Some(value) = env_value(ENV_TIMEOUT) {
            if let Ok(seconds) = value.parse::<u64>() {
                *source = ConfigSource::Env;
                return validate_timeout(seconds, ENV_TIMEOUT).map(Duration::from_secs);
            }
            tracing::warn!(value, "Ignoring non-numeric {ENV_TIMEOUT}");
        }
        *source = if config.api.timeout_seconds == ApiConfig::default().timeout_seconds {
            ConfigSource::Default
        } else {
            ConfigSource::ConfigFile
        };
        Ok(Duration::from_secs(config.api.timeout_seconds))
    }

    fn resolve_format(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat> {
        if let Some(format) = cli.explicit_format() {
            *source = ConfigSource::Cli;
            return Ok(format);
        }
        if let Some(format) = env_value(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return OutputFormat::from_arg(&format);
        }
        if let Some(format) = &config.output.format {
            *source = ConfigSource::ConfigFile;
            return OutputFormat::from_arg(format);
        }
        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    fn resolve_no_color(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }
        if is_env_truthy(ENV_NO_COLOR) || std::env::var_os(ENV_NO_COLOR_STD).is_some() {
            *source = ConfigSource::Env;
            return true;
        }
        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }

    fn resolve_verbose(cli: &Cli, source: &mut ConfigSource) -> bool {
        if cli.verbose {
            *source = ConfigSource::Cli;
            return true;
        }
        if is_env_truthy(ENV_VERBOSE) {
            *source = ConfigSource::Env;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }

    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }
        if is_env_truthy(ENV_PRETTY) {
            *source = ConfigSource::Env;
            return true;
        }
        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }
        *source = ConfigSource::Default;
        false
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn validate_timeout(seconds: u64, key: &str) -> Result<u64> {
    if seconds == 0 || seconds > MAX_TIMEOUT_SECONDS {
        return Err(PulseError::ConfigInvalid {
            key: key.to_string(),
            value: seconds.to_string(),
            message: format!("timeout must be between 1 and {MAX_TIMEOUT_SECONDS} seconds"),
        });
    }
    Ok(seconds)
}

// =============================================================================
// Config file
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub polling: PollingConfig,
    pub output: OutputConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `cookie` (default) or `body`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_mode: Option<String>,
}

/// Polling defaults for `watch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between successful fetches; 0 fetches once.
    pub interval_seconds: u64,
    /// Retries after the first failure before polling pauses.
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub color: bool,
    pub pretty: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            max_retries: DEFAULT_MAX_RETRIES,
            category: None,
            range: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl PollingConfig {
    /// Parsed polling and query defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for unknown category or range names.
    pub fn defaults(&self) -> Result<PollingDefaults> {
        let category = self
            .category
            .as_deref()
            .map_or(Ok(Category::default()), Category::from_cli_name)?;
        let range = self
            .range
            .as_deref()
            .map_or(Ok(TimeRange::default()), TimeRange::from_cli_name)?;
        Ok(PollingDefaults {
            options: PollOptions::new(Duration::from_secs(self.interval_seconds), self.max_retries),
            query: MetricsQuery::new(category, range),
        })
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` if the file exists but is not valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PulseError::ConfigParse {
            path: path.display().to_string(),
            message: e.message().to_string(),
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PulseError::from_io_at(e, parent))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PulseError::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content).map_err(|e| PulseError::from_io_at(e, path))?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api.base_url {
            let trimmed = url.trim();
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                return Err(PulseError::ConfigInvalid {
                    key: "api.base_url".to_string(),
                    value: url.clone(),
                    message: "must start with http:// or https://".to_string(),
                });
            }
        }

        validate_timeout(self.api.timeout_seconds, "api.timeout_seconds")?;

        if let Some(mode) = &self.auth.refresh_mode {
            RefreshMode::from_arg(mode)?;
        }
        if let Some(format) = &self.output.format {
            OutputFormat::from_arg(format)?;
        }
        self.polling.defaults()?;

        Ok(())
    }
}
