//! # Alarm Scheduler
//!
//! One-shot wall-clock timers keyed by alarm id. A fired timer is delivered as
//! an [`AlarmEvent`] on a single handler channel.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Inexact fallback aligned to a configurable window
//! - 1.0.0: Exact tokio-backed timers with last-write-wins registration

use crate::core::error::SchedulingError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Capacity of the fired-alarm channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Longest single sleep; the wall clock is re-read after each one so that
/// suspend/resume and clock adjustments do not delay a timer
const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(30);

/// Payload delivered when a timer fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub alarm_id: i32,
    pub message: String,
    pub fire_at_epoch_millis: i64,
}

/// How a timer was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleMode {
    Exact,
    /// Best-effort, may fire up to the scheduler's window late
    Inexact,
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleMode::Exact => write!(f, "exact"),
            ScheduleMode::Inexact => write!(f, "inexact"),
        }
    }
}

/// Host timer facility
#[async_trait]
pub trait AlarmScheduler: Send + Sync {
    /// Register an exact timer. Replaces any timer already keyed by `alarm_id`.
    async fn schedule(
        &self,
        alarm_id: i32,
        fire_at_epoch_millis: i64,
        message: String,
    ) -> Result<(), SchedulingError>;

    /// Register a best-effort timer when exact alarms are denied
    async fn schedule_inexact(
        &self,
        _alarm_id: i32,
        _fire_at_epoch_millis: i64,
        _message: String,
    ) -> Result<(), SchedulingError> {
        Err(SchedulingError::Unsupported)
    }

    /// Unregister a timer; absent timers are ignored
    async fn cancel(&self, alarm_id: i32);

    /// Unregister every timer
    async fn cancel_all(&self);

    fn is_registered(&self, alarm_id: i32) -> bool;

    fn registered_count(&self) -> usize;
}

/// Try an exact registration, falling back to inexact when exact alarms are denied
pub async fn schedule_with_fallback(
    scheduler: &dyn AlarmScheduler,
    alarm_id: i32,
    fire_at_epoch_millis: i64,
    message: &str,
) -> Result<ScheduleMode, SchedulingError> {
    match scheduler
        .schedule(alarm_id, fire_at_epoch_millis, message.to_string())
        .await
    {
        Ok(()) => Ok(ScheduleMode::Exact),
        Err(SchedulingError::ExactAlarmDenied) => {
            warn!("Exact alarms denied, falling back to inexact timer for alarm {alarm_id}");
            match scheduler
                .schedule_inexact(alarm_id, fire_at_epoch_millis, message.to_string())
                .await
            {
                Ok(()) => Ok(ScheduleMode::Inexact),
                // No fallback available: report the original refusal
                Err(SchedulingError::Unsupported) => Err(SchedulingError::ExactAlarmDenied),
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

struct Registration {
    generation: u64,
    mode: ScheduleMode,
    handle: JoinHandle<()>,
}

/// In-process timer registry backed by tokio tasks
pub struct TokioAlarmScheduler {
    registrations: Arc<DashMap<i32, Registration>>,
    event_tx: mpsc::Sender<AlarmEvent>,
    exact_permitted: bool,
    inexact_window: Duration,
    next_generation: AtomicU64,
}

impl TokioAlarmScheduler {
    /// Create a scheduler and the receiver its fired alarms are delivered to
    pub fn new(exact_permitted: bool, inexact_window: Duration) -> (Self, mpsc::Receiver<AlarmEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let scheduler = TokioAlarmScheduler {
            registrations: Arc::new(DashMap::new()),
            event_tx,
            exact_permitted,
            inexact_window,
            next_generation: AtomicU64::new(1),
        };
        (scheduler, event_rx)
    }

    /// Mode of a live registration
    pub fn mode_of(&self, alarm_id: i32) -> Option<ScheduleMode> {
        self.registrations
            .get(&alarm_id)
            .filter(|r| !r.handle.is_finished())
            .map(|r| r.mode)
    }

    /// Round `fire_at` up to the next multiple of the inexact window
    fn inexact_target(&self, fire_at_epoch_millis: i64) -> i64 {
        let window = self.inexact_window.as_millis() as i64;
        if window <= 0 {
            return fire_at_epoch_millis;
        }
        let remainder = fire_at_epoch_millis.rem_euclid(window);
        if remainder == 0 {
            fire_at_epoch_millis
        } else {
            fire_at_epoch_millis + (window - remainder)
        }
    }

    fn register(
        &self,
        alarm_id: i32,
        fire_at_epoch_millis: i64,
        trigger_at_epoch_millis: i64,
        message: String,
        mode: ScheduleMode,
    ) -> Result<(), SchedulingError> {
        let now = Utc::now().timestamp_millis();
        if fire_at_epoch_millis <= now {
            return Err(SchedulingError::NotInFuture {
                fire_at_epoch_millis,
            });
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let registrations = self.registrations.clone();
        let event_tx = self.event_tx.clone();
        let event = AlarmEvent {
            alarm_id,
            message,
            fire_at_epoch_millis,
        };

        // The task may not touch the map before its own entry is in it
        let (armed_tx, armed_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            wait_until(trigger_at_epoch_millis).await;
            let _ = armed_rx.await;

            registrations.remove_if(&alarm_id, |_, r| r.generation == generation);
            debug!("Alarm {} fired", alarm_id);

            if event_tx.send(event).await.is_err() {
                warn!("Alarm {} fired but no handler is listening", alarm_id);
            }
        });

        let replaced = self.registrations.insert(
            alarm_id,
            Registration {
                generation,
                mode,
                handle,
            },
        );

        let _ = armed_tx.send(());

        if let Some(previous) = replaced {
            // Last write wins
            previous.handle.abort();
            info!("Alarm {} re-registered, previous timer replaced", alarm_id);
        }

        debug!(
            "Registered {} alarm {} for {} (in {} ms)",
            mode,
            alarm_id,
            fire_at_epoch_millis,
            trigger_at_epoch_millis - now
        );
        Ok(())
    }
}

/// Sleep until the wall clock reaches `epoch_millis`
async fn wait_until(epoch_millis: i64) {
    loop {
        let remaining = epoch_millis - Utc::now().timestamp_millis();
        if remaining <= 0 {
            return;
        }
        let chunk = Duration::from_millis(remaining as u64).min(MAX_SLEEP_CHUNK);
        tokio::time::sleep(chunk).await;
    }
}

#[async_trait]
impl AlarmScheduler for TokioAlarmScheduler {
    async fn schedule(
        &self,
        alarm_id: i32,
        fire_at_epoch_millis: i64,
        message: String,
    ) -> Result<(), SchedulingError> {
        if fire_at_epoch_millis <= Utc::now().timestamp_millis() {
            return Err(SchedulingError::NotInFuture {
                fire_at_epoch_millis,
            });
        }
        if !self.exact_permitted {
            return Err(SchedulingError::ExactAlarmDenied);
        }
        self.register(
            alarm_id,
            fire_at_epoch_millis,
            fire_at_epoch_millis,
            message,
            ScheduleMode::Exact,
        )
    }

    async fn schedule_inexact(
        &self,
        alarm_id: i32,
        fire_at_epoch_millis: i64,
        message: String,
    ) -> Result<(), SchedulingError> {
        let trigger_at = self.inexact_target(fire_at_epoch_millis);
        self.register(
            alarm_id,
            fire_at_epoch_millis,
            trigger_at,
            message,
            ScheduleMode::Inexact,
        )
    }

    async fn cancel(&self, alarm_id: i32) {
        if let Some((_, registration)) = self.registrations.remove(&alarm_id) {
            registration.handle.abort();
            debug!("Cancelled alarm {}", alarm_id);
        }
    }

    async fn cancel_all(&self) {
        let ids: Vec<i32> = self.registrations.iter().map(|r| *r.key()).collect();
        for alarm_id in &ids {
            if let Some((_, registration)) = self.registrations.remove(alarm_id) {
                registration.handle.abort();
            }
        }
        info!("Cancelled {} alarms", ids.len());
    }

    fn is_registered(&self, alarm_id: i32) -> bool {
        self.registrations
            .get(&alarm_id)
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }

    fn registered_count(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| !r.handle.is_finished())
            .count()
    }
}

impl Drop for TokioAlarmScheduler {
    fn drop(&mut self) {
        for registration in self.registrations.iter() {
            registration.handle.abort();
        }
    }
}
