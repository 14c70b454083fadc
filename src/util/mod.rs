//! Utility functions.

pub mod env;
pub mod format;
pub mod time;

pub use format::{format_count, format_delay};
pub use time::{format_clock, format_relative_time};
