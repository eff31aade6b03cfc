// Core layer - shared types and configuration
pub mod core;

// Features layer - alarms, presentation and reminders
pub mod features;

// IPC layer - communication between daemon and CLI
pub mod ipc;

// Infrastructure
pub mod database;

pub use crate::core::{Config, ReminderError, ReminderResult, SchedulingError};
pub use crate::database::Database;

pub use features::{
    // Alarms
    schedule_with_fallback, AlarmEvent, AlarmScheduler, ScheduleMode, TokioAlarmScheduler,
    // Presentation
    CompositePresenter, NotificationPresenter, Presenter, SpeechPresenter,
    // Reminders
    RecoveryCoordinator, RecoveryReport, Reminder, ReminderService, ReminderStatus, StoreStats,
};

pub use ipc::{ClientCommand, DaemonEvent, IpcClient, IpcServer};
