//! Presenter trait, notification presenter and fan-out
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: CompositePresenter isolates failures per presenter
//! - 1.0.0: Log-backed notifications

use crate::features::alarms::AlarmEvent;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Title used for every reminder notification
pub const NOTIFICATION_TITLE: &str = "Voice Reminder";

/// Longest summary line before truncation
pub const SUMMARY_MAX_CHARS: usize = 50;

/// Something that shows or speaks a fired reminder
#[async_trait]
pub trait Presenter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn present(&self, alarm: &AlarmEvent) -> Result<()>;
}

/// User-visible notification content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i32,
    pub title: String,
    /// Short line, truncated with "..." past [`SUMMARY_MAX_CHARS`]
    pub summary: String,
    /// Full message
    pub body: String,
}

impl Notification {
    pub fn from_alarm(alarm: &AlarmEvent) -> Self {
        Notification {
            id: alarm.alarm_id,
            title: NOTIFICATION_TITLE.to_string(),
            summary: summarize(&alarm.message),
            body: alarm.message.clone(),
        }
    }
}

/// Truncate on a character boundary
fn summarize(message: &str) -> String {
    if message.chars().count() > SUMMARY_MAX_CHARS {
        let truncated: String = message.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        message.to_string()
    }
}

/// Emits notifications through the log
#[derive(Debug, Default)]
pub struct NotificationPresenter;

#[async_trait]
impl Presenter for NotificationPresenter {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn present(&self, alarm: &AlarmEvent) -> Result<()> {
        let notification = Notification::from_alarm(alarm);
        info!(
            "🔔 [{}] {} (alarm {})",
            notification.title, notification.summary, notification.id
        );
        if notification.summary != notification.body {
            info!("{}", notification.body);
        }
        Ok(())
    }
}

/// Runs several presenters in order; one failing does not stop the rest
#[derive(Default)]
pub struct CompositePresenter {
    presenters: Vec<Arc<dyn Presenter>>,
}

impl CompositePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenters.push(presenter);
        self
    }
}

#[async_trait]
impl Presenter for CompositePresenter {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn present(&self, alarm: &AlarmEvent) -> Result<()> {
        let mut failures = Vec::new();

        for presenter in &self.presenters {
            if let Err(e) = presenter.present(alarm).await {
                warn!(
                    "Presenter '{}' failed for alarm {}: {}",
                    presenter.name(),
                    alarm.alarm_id,
                    e
                );
                failures.push(format!("{}: {}", presenter.name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} of {} presenters failed ({})",
                failures.len(),
                self.presenters.len(),
                failures.join("; ")
            ))
        }
    }
}
