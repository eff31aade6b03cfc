//! # Reminders Feature
//!
//! Persisted one-shot voice reminders: the record model, the service that
//! creates, cancels and fires them, and restart recovery.
//!
//! - **Version**: 1.3.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Export/import and store stats
//! - 1.2.0: Recovery shared with imports
//! - 1.0.0: Initial reminder service

pub mod model;
pub mod recovery;
pub mod service;

pub use model::{Reminder, ReminderStatus, StoreStats};
pub use recovery::{RecoveryCoordinator, RecoveryReport};
pub use service::{CreatedReminder, ExportBundle, FireOutcome, ImportReport, ReminderService};
