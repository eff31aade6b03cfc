//! Error types for the reminder subsystem
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Split scheduling failures into their own enum for fallback decisions
//! - 1.0.0: Initial taxonomy (validation, storage, scheduling, not found)

use serde::Serialize;
use std::fmt;

/// Why a timer registration was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum SchedulingError {
    /// The requested instant is not strictly in the future
    NotInFuture { fire_at_epoch_millis: i64 },
    /// Exact wake-up alarms are not permitted on this host
    ExactAlarmDenied,
    /// The scheduler has no inexact fallback
    Unsupported,
    /// Any other registration failure
    Registration(String),
}

impl fmt::Display for SchedulingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingError::NotInFuture {
                fire_at_epoch_millis,
            } => write!(f, "fire time {} is not in the future", fire_at_epoch_millis),
            SchedulingError::ExactAlarmDenied => write!(f, "exact alarms are not permitted"),
            SchedulingError::Unsupported => write!(f, "inexact alarms are not supported"),
            SchedulingError::Registration(msg) => write!(f, "registration failed: {}", msg),
        }
    }
}

impl std::error::Error for SchedulingError {}

/// Errors surfaced by the reminder store, scheduler and service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum ReminderError {
    /// User input rejected before touching the store or scheduler
    Validation(String),
    /// Persistence read/write failed; state is unknown
    Storage(String),
    /// Timer registration failed; the stored record is left for recovery
    Scheduling(SchedulingError),
    /// Lookup found no record
    NotFound(String),
}

impl fmt::Display for ReminderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ReminderError::Storage(msg) => write!(f, "Storage error: {}", msg),
            ReminderError::Scheduling(err) => write!(f, "Scheduling error: {}", err),
            ReminderError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for ReminderError {}

impl From<sqlite::Error> for ReminderError {
    fn from(error: sqlite::Error) -> Self {
        ReminderError::Storage(error.to_string())
    }
}

impl From<SchedulingError> for ReminderError {
    fn from(error: SchedulingError) -> Self {
        ReminderError::Scheduling(error)
    }
}

impl From<serde_json::Error> for ReminderError {
    fn from(error: serde_json::Error) -> Self {
        ReminderError::Validation(format!("malformed reminder data: {}", error))
    }
}

// Convenience constructors
impl ReminderError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        ReminderError::Validation(msg.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        ReminderError::Storage(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        ReminderError::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReminderError::NotFound(_))
    }
}

/// Result alias used throughout the reminder subsystem
pub type ReminderResult<T> = Result<T, ReminderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReminderError::storage("disk full");
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = ReminderError::from(SchedulingError::ExactAlarmDenied);
        assert_eq!(
            err.to_string(),
            "Scheduling error: exact alarms are not permitted"
        );
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            ReminderError::validation("empty"),
            ReminderError::Validation(_)
        ));
        assert!(ReminderError::not_found("reminder 4").is_not_found());
        assert!(!ReminderError::storage("x").is_not_found());
    }

    #[test]
    fn test_error_serialization() {
        let err = ReminderError::validation("message is empty");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Validation"));
        assert!(json.contains("message is empty"));
    }
}
