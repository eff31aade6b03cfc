//! # Reminder Recovery
//!
//! Re-derives timer registrations from the store after anything that wiped
//! them (daemon restart, explicit reconcile). Future reminders are registered
//! again under their original alarm id; reminders whose time already passed
//! are completed without firing.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Inexact fallback, per-item outcome shared with imports
//! - 1.0.0: Initial restart recovery

use crate::core::error::{ReminderResult, SchedulingError};
use crate::database::Database;
use crate::features::alarms::{schedule_with_fallback, AlarmScheduler, ScheduleMode};
use crate::features::reminders::model::Reminder;
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Outcome of a recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Pending reminders read from the store
    pub examined: usize,
    /// Registered again with an exact timer
    pub rescheduled: usize,
    /// Registered again with an inexact timer
    pub inexact: usize,
    /// Fire time already passed, completed without firing
    pub stale_completed: usize,
    /// Left pending for the next pass
    pub failed: usize,
}

/// What happened to one pending reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reconciled {
    Scheduled(ScheduleMode),
    StaleCompleted,
    Failed,
}

/// Bring one pending reminder in line with the timer registry
pub(crate) async fn reconcile_one(
    database: &Database,
    scheduler: &dyn AlarmScheduler,
    reminder: &Reminder,
    now_millis: i64,
) -> Reconciled {
    if reminder.is_stale_at(now_millis) {
        return complete_stale(database, reminder).await;
    }

    match schedule_with_fallback(
        scheduler,
        reminder.alarm_id,
        reminder.fire_at_epoch_millis,
        &reminder.message,
    )
    .await
    {
        Ok(mode) => {
            debug!(
                "Reminder {} re-registered ({}) as alarm {}",
                reminder.id, mode, reminder.alarm_id
            );
            Reconciled::Scheduled(mode)
        }
        // Became due while we were working through the list
        Err(SchedulingError::NotInFuture { .. }) => complete_stale(database, reminder).await,
        Err(e) => {
            warn!(
                "Could not re-register reminder {} (alarm {}): {}. It stays pending.",
                reminder.id, reminder.alarm_id, e
            );
            Reconciled::Failed
        }
    }
}

async fn complete_stale(database: &Database, reminder: &Reminder) -> Reconciled {
    match database.mark_completed(reminder.id).await {
        Ok(()) => {
            info!(
                "Reminder {} missed its time while offline, completed without firing",
                reminder.id
            );
            Reconciled::StaleCompleted
        }
        Err(e) => {
            warn!("Failed to complete stale reminder {}: {}", reminder.id, e);
            Reconciled::Failed
        }
    }
}

/// Rebuilds timer registrations from the reminder store
pub struct RecoveryCoordinator {
    database: Database,
    scheduler: Arc<dyn AlarmScheduler>,
}

impl RecoveryCoordinator {
    pub fn new(database: Database, scheduler: Arc<dyn AlarmScheduler>) -> Self {
        Self {
            database,
            scheduler,
        }
    }

    /// Run a recovery pass against the current wall clock
    pub async fn recover(&self) -> ReminderResult<RecoveryReport> {
        self.recover_at(Utc::now().timestamp_millis()).await
    }

    /// Run a recovery pass treating `now_millis` as the current time.
    ///
    /// Only reading the pending list can fail the whole pass; every reminder
    /// after that is handled independently.
    pub async fn recover_at(&self, now_millis: i64) -> ReminderResult<RecoveryReport> {
        let pending = self.database.get_scheduled().await?;
        let mut report = RecoveryReport {
            examined: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            debug!("Recovery: no pending reminders");
            return Ok(report);
        }

        info!("Recovery: examining {} pending reminders", pending.len());

        for reminder in &pending {
            match reconcile_one(&self.database, self.scheduler.as_ref(), reminder, now_millis).await
            {
                Reconciled::Scheduled(ScheduleMode::Exact) => report.rescheduled += 1,
                Reconciled::Scheduled(ScheduleMode::Inexact) => report.inexact += 1,
                Reconciled::StaleCompleted => report.stale_completed += 1,
                Reconciled::Failed => report.failed += 1,
            }
        }

        info!(
            "Recovery complete: {} rescheduled, {} inexact, {} stale, {} failed",
            report.rescheduled, report.inexact, report.stale_completed, report.failed
        );

        Ok(report)
    }

    /// Run recovery in the background so the triggering handler returns at once
    pub fn spawn(self: Arc<Self>) -> JoinHandle<Option<RecoveryReport>> {
        tokio::spawn(async move {
            match self.recover().await {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("Recovery pass failed: {}", e);
                    None
                }
            }
        })
    }
}
