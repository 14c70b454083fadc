//! CLI argument parsing and command dispatch.

pub mod args;
pub mod auth;
pub mod config;
pub mod export;
pub mod import;
pub mod metrics;
pub mod watch;

pub use args::{Cli, Commands, OutputFormat};
