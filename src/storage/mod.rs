//! Configuration storage.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigSource, ConfigSources, ENV_API_URL, ENV_CONFIG, ENV_FORMAT, ENV_NO_COLOR,
    ENV_NO_COLOR_STD, ENV_PRETTY, ENV_REFRESH_MODE, ENV_TIMEOUT, ENV_VERBOSE, PollingDefaults,
    ResolvedConfig,
};
pub use paths::AppPaths;
