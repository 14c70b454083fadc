//! Common test utilities and fixtures for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: mock backend routes and session builders
//! - `logger`: structured per-test logging
//! - `log_capture`: assertions over `tracing` output

pub mod fixtures;
pub mod log_capture;
pub mod logger;
