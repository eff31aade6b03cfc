//! # Alarms Feature
//!
//! Wall-clock one-shot timers with exact and inexact registration.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod scheduler;

pub use scheduler::{
    schedule_with_fallback, AlarmEvent, AlarmScheduler, ScheduleMode, TokioAlarmScheduler,
};
