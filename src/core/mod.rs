//! # Core Module
//!
//! Configuration, error taxonomy and time handling shared by the daemon and the CLI.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add time_format module (durations, clock times, RFC 3339)
//! - 1.1.0: Add error module with typed reminder errors
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod error;
pub mod time_format;

// Re-export commonly used items
pub use config::{Config, SpeechConfig};
pub use error::{ReminderError, ReminderResult, SchedulingError};
pub use time_format::{format_duration, parse_duration, resolve_fire_time};
