//! Reminder record and derived status
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted voice reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Store-assigned primary key (0 until inserted)
    pub id: i64,

    /// Text shown and spoken when the reminder fires
    pub message: String,

    /// Absolute UTC instant, epoch milliseconds. Never changes after creation.
    pub fire_at_epoch_millis: i64,

    /// Handle of the timer registration, distinct from `id`
    pub alarm_id: i32,

    /// True while pending
    pub is_scheduled: bool,

    /// Creation instant, epoch milliseconds
    pub created_at: i64,
}

impl Reminder {
    pub fn new(message: String, fire_at_epoch_millis: i64, alarm_id: i32) -> Self {
        Self {
            id: 0, // Will be set by storage
            message,
            fire_at_epoch_millis,
            alarm_id,
            is_scheduled: true,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn fire_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.fire_at_epoch_millis)
    }

    /// A pending reminder whose fire time is at or before `now_millis`
    pub fn is_stale_at(&self, now_millis: i64) -> bool {
        self.is_scheduled && self.fire_at_epoch_millis <= now_millis
    }

    pub fn status(&self) -> ReminderStatus {
        if self.is_scheduled {
            ReminderStatus::Scheduled
        } else {
            ReminderStatus::Completed
        }
    }
}

/// Status of a reminder as seen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Waiting for its fire time
    Scheduled,
    /// Fired, or found stale during recovery
    Completed,
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderStatus::Scheduled => write!(f, "scheduled"),
            ReminderStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(ReminderStatus::Scheduled),
            "completed" => Ok(ReminderStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid reminder status: {}", s)),
        }
    }
}

/// Counts reported by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub scheduled: usize,
    pub completed: usize,
    /// Earliest pending fire time, epoch milliseconds
    pub next_fire_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reminder_is_scheduled() {
        let reminder = Reminder::new("Take medication".to_string(), 1_000, 7);
        assert_eq!(reminder.id, 0);
        assert!(reminder.is_scheduled);
        assert_eq!(reminder.status(), ReminderStatus::Scheduled);
    }

    #[test]
    fn test_is_stale_at() {
        let mut reminder = Reminder::new("Stretch".to_string(), 10_000, 1);
        assert!(!reminder.is_stale_at(9_999));
        assert!(reminder.is_stale_at(10_000));
        assert!(reminder.is_stale_at(20_000));

        reminder.is_scheduled = false;
        assert!(!reminder.is_stale_at(20_000));
    }

    #[test]
    fn test_status_display_and_parse() {
        assert_eq!(ReminderStatus::Scheduled.to_string(), "scheduled");
        assert_eq!(
            "COMPLETED".parse::<ReminderStatus>().unwrap(),
            ReminderStatus::Completed
        );
        assert!("cancelled".parse::<ReminderStatus>().is_err());
    }
}
