//! Feature modules

pub mod alarms;
pub mod presentation;
pub mod reminders;

pub use alarms::{schedule_with_fallback, AlarmEvent, AlarmScheduler, ScheduleMode, TokioAlarmScheduler};
pub use presentation::{CompositePresenter, Notification, NotificationPresenter, Presenter, SpeechPresenter};
pub use reminders::{
    CreatedReminder, FireOutcome, ImportReport, RecoveryCoordinator, RecoveryReport, Reminder,
    ReminderService, ReminderStatus, StoreStats,
};
