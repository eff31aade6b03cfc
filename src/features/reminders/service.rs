//! # Reminder Service
//!
//! Single access path for user actions and fired alarms. Creation persists
//! first and schedules second; a reminder whose registration failed stays in
//! the store and is picked up by the next recovery pass.
//!
//! - **Version**: 1.3.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.3.0: JSON export/import
//! - 1.2.0: Inexact fallback on creation
//! - 1.1.0: Alarm dispatch loop
//! - 1.0.0: Create, cancel, list

use crate::core::error::{ReminderError, ReminderResult};
use crate::database::Database;
use crate::features::alarms::{schedule_with_fallback, AlarmEvent, AlarmScheduler, ScheduleMode};
use crate::features::presentation::Presenter;
use crate::features::reminders::model::{Reminder, StoreStats};
use crate::features::reminders::recovery::{reconcile_one, Reconciled};
use chrono::Utc;
use log::{debug, error, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Attempts at finding an alarm id no pending reminder uses
const ALARM_ID_ATTEMPTS: usize = 8;

/// Export format version
const EXPORT_VERSION: u32 = 1;

/// A freshly created reminder and how its timer was registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedReminder {
    pub reminder: Reminder,
    pub mode: ScheduleMode,
}

/// What the dispatch loop did with a fired alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// Handed to presentation and completed
    Presented { reminder_id: i64 },
    /// Reminder was already completed
    AlreadyHandled { reminder_id: i64 },
    /// No record for this alarm id (cancelled before the timer fired)
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: i64,
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub scheduled: usize,
    pub stale_completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn random_alarm_id() -> i32 {
    rand::rng().random_range(1..=i32::MAX)
}

pub struct ReminderService {
    database: Database,
    scheduler: Arc<dyn AlarmScheduler>,
    presenter: Arc<dyn Presenter>,
}

impl ReminderService {
    pub fn new(
        database: Database,
        scheduler: Arc<dyn AlarmScheduler>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            database,
            scheduler,
            presenter,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn scheduler(&self) -> &Arc<dyn AlarmScheduler> {
        &self.scheduler
    }

    /// Create, persist and schedule a reminder
    pub async fn create(
        &self,
        message: &str,
        fire_at_epoch_millis: i64,
    ) -> ReminderResult<CreatedReminder> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ReminderError::validation("Reminder message cannot be empty"));
        }

        let now = Utc::now().timestamp_millis();
        if fire_at_epoch_millis <= now {
            return Err(ReminderError::validation(
                "Reminder time must be in the future",
            ));
        }

        let alarm_id = self.generate_alarm_id().await?;
        let mut reminder = Reminder::new(message.to_string(), fire_at_epoch_millis, alarm_id);
        reminder.created_at = now;

        reminder.id = self.database.insert(&reminder).await?;

        match schedule_with_fallback(
            self.scheduler.as_ref(),
            alarm_id,
            fire_at_epoch_millis,
            message,
        )
        .await
        {
            Ok(mode) => {
                info!(
                    "Created reminder {} (alarm {}, {}) for {}",
                    reminder.id, alarm_id, mode, fire_at_epoch_millis
                );
                Ok(CreatedReminder { reminder, mode })
            }
            Err(e) => {
                warn!(
                    "Reminder {} stored but not scheduled ({}); recovery will retry",
                    reminder.id, e
                );
                Err(e.into())
            }
        }
    }

    /// Pick a random alarm id not held by a pending reminder or live timer
    async fn generate_alarm_id(&self) -> ReminderResult<i32> {
        let mut candidate = random_alarm_id();
        for _ in 0..ALARM_ID_ATTEMPTS {
            if !self.scheduler.is_registered(candidate)
                && !self.database.is_alarm_id_in_use(candidate).await?
            {
                return Ok(candidate);
            }
            candidate = random_alarm_id();
        }
        warn!("No free alarm id after {ALARM_ID_ATTEMPTS} attempts, reusing {candidate}");
        Ok(candidate)
    }

    /// Cancel and delete a reminder. Unknown ids are a no-op (`Ok(false)`).
    pub async fn cancel(&self, id: i64) -> ReminderResult<bool> {
        let Some(reminder) = self.database.get_by_id(id).await? else {
            debug!("Cancel requested for unknown reminder {}", id);
            return Ok(false);
        };

        // Unregister first so a firing timer never outlives its record
        self.scheduler.cancel(reminder.alarm_id).await;
        let deleted = self.database.delete(id).await?;

        info!("Cancelled reminder {} (alarm {})", id, reminder.alarm_id);
        Ok(deleted)
    }

    /// Explicit lookup; a missing reminder is an error here
    pub async fn get(&self, id: i64) -> ReminderResult<Reminder> {
        self.database
            .get_by_id(id)
            .await?
            .ok_or_else(|| ReminderError::not_found(format!("Reminder #{id}")))
    }

    pub async fn list_scheduled(&self) -> ReminderResult<Vec<Reminder>> {
        self.database.get_scheduled().await
    }

    pub async fn list_all(&self) -> ReminderResult<Vec<Reminder>> {
        self.database.get_all().await
    }

    pub async fn stats(&self) -> ReminderResult<StoreStats> {
        self.database.stats().await
    }

    /// Remove completed reminders from the store
    pub async fn purge_completed(&self) -> ReminderResult<usize> {
        self.database.purge_completed().await
    }

    /// Unregister every timer and clear the store
    pub async fn clear_all(&self) -> ReminderResult<usize> {
        self.scheduler.cancel_all().await;
        self.database.delete_all().await
    }

    /// Handle a fired timer: present the reminder and mark it completed
    pub async fn handle_alarm(&self, alarm: AlarmEvent) -> ReminderResult<FireOutcome> {
        let Some(reminder) = self.database.get_by_alarm_id(alarm.alarm_id).await? else {
            debug!("Alarm {} fired without a stored reminder, ignoring", alarm.alarm_id);
            return Ok(FireOutcome::Unknown);
        };

        if !reminder.is_scheduled {
            debug!("Alarm {} fired for completed reminder {}", alarm.alarm_id, reminder.id);
            return Ok(FireOutcome::AlreadyHandled {
                reminder_id: reminder.id,
            });
        }

        let presenter = self.presenter.clone();
        let event = AlarmEvent {
            message: reminder.message.clone(),
            ..alarm
        };
        tokio::spawn(async move {
            if let Err(e) = presenter.present(&event).await {
                warn!("Presentation failed for alarm {}: {}", event.alarm_id, e);
            }
        });

        self.database.mark_completed(reminder.id).await?;
        info!("Reminder {} fired", reminder.id);

        Ok(FireOutcome::Presented {
            reminder_id: reminder.id,
        })
    }

    /// Consume fired alarms one at a time until the channel closes
    pub async fn run(self: Arc<Self>, mut alarms: mpsc::Receiver<AlarmEvent>) {
        info!("⏰ Reminder dispatcher started");
        while let Some(alarm) = alarms.recv().await {
            let alarm_id = alarm.alarm_id;
            if let Err(e) = self.handle_alarm(alarm).await {
                error!("Failed to handle alarm {}: {}", alarm_id, e);
            }
        }
        info!("Reminder dispatcher stopped");
    }

    pub async fn export_json(&self) -> ReminderResult<String> {
        let bundle = ExportBundle {
            version: EXPORT_VERSION,
            exported_at: Utc::now().timestamp_millis(),
            reminders: self.database.get_all().await?,
        };
        Ok(serde_json::to_string_pretty(&bundle)?)
    }

    /// Import reminders from an export. Records get new ids; pending ones are
    /// scheduled or completed exactly as a recovery pass would.
    pub async fn import_json(&self, data: &str) -> ReminderResult<ImportReport> {
        let bundle: ExportBundle = serde_json::from_str(data)?;
        if bundle.version > EXPORT_VERSION {
            return Err(ReminderError::validation(format!(
                "Unsupported export version {}",
                bundle.version
            )));
        }

        let mut report = ImportReport::default();
        let now = Utc::now().timestamp_millis();

        for mut reminder in bundle.reminders {
            if reminder.message.trim().is_empty() {
                report.skipped += 1;
                continue;
            }

            reminder.id = 0;
            if reminder.is_scheduled
                && (self.scheduler.is_registered(reminder.alarm_id)
                    || self.database.is_alarm_id_in_use(reminder.alarm_id).await?)
            {
                reminder.alarm_id = self.generate_alarm_id().await?;
            }

            reminder.id = self.database.insert(&reminder).await?;
            report.imported += 1;

            if !reminder.is_scheduled {
                continue;
            }

            match reconcile_one(&self.database, self.scheduler.as_ref(), &reminder, now).await {
                Reconciled::Scheduled(_) => report.scheduled += 1,
                Reconciled::StaleCompleted => report.stale_completed += 1,
                Reconciled::Failed => report.failed += 1,
            }
        }

        info!(
            "Imported {} reminders ({} scheduled, {} stale, {} skipped)",
            report.imported, report.scheduled, report.stale_completed, report.skipped
        );
        Ok(report)
    }
}
