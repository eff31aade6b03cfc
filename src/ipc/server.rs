//! # IPC Server
//!
//! Unix socket server through which clients drive the reminder daemon.
//!
//! - **Version**: 1.3.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Speech preview command
//! - 1.2.0: Export/import, purge and stats commands
//! - 1.1.0: Fired reminders broadcast to every client
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

use crate::core::error::ReminderResult;
use crate::core::time_format::{describe_until, format_epoch_millis};
use crate::features::alarms::{AlarmEvent, ScheduleMode};
use crate::features::presentation::{Notification, Presenter, SpeechPresenter};
use crate::features::reminders::{RecoveryCoordinator, ReminderService};
use crate::ipc::protocol::{encode_message, read_frame, ClientCommand, DaemonEvent};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

/// Maximum number of connected clients
const MAX_CLIENTS: usize = 10;

/// Broadcast channel capacity for events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Command channel capacity shared by all clients
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// IPC server handle for the daemon
#[derive(Clone)]
pub struct IpcServer {
    socket_path: String,
    /// Broadcast sender for events to all clients
    event_tx: broadcast::Sender<DaemonEvent>,
    /// Receiver for commands from clients
    command_rx: Arc<RwLock<mpsc::Receiver<ClientCommand>>>,
    /// Sender for commands (used by client handlers)
    command_tx: mpsc::Sender<ClientCommand>,
    /// Connected client count
    client_count: Arc<RwLock<usize>>,
    /// Server start time for uptime calculation
    start_time: Instant,
    reminders: Option<Arc<ReminderService>>,
    recovery: Option<Arc<RecoveryCoordinator>>,
    speech: Option<Arc<SpeechPresenter>>,
}

impl IpcServer {
    /// Create a new IPC server (does not start listening yet)
    pub fn new(socket_path: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        IpcServer {
            socket_path: socket_path.into(),
            event_tx,
            command_rx: Arc::new(RwLock::new(command_rx)),
            command_tx,
            client_count: Arc::new(RwLock::new(0)),
            start_time: Instant::now(),
            reminders: None,
            recovery: None,
            speech: None,
        }
    }

    /// Attach the reminder service and recovery coordinator commands run against
    pub fn with_reminders(
        mut self,
        reminders: Arc<ReminderService>,
        recovery: Arc<RecoveryCoordinator>,
    ) -> Self {
        self.reminders = Some(reminders);
        self.recovery = Some(recovery);
        self
    }

    /// Attach the speech presenter used for previews
    pub fn with_speech(mut self, speech: Arc<SpeechPresenter>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Presenter that forwards fired reminders to connected clients
    pub fn broadcaster(&self) -> IpcBroadcaster {
        IpcBroadcaster {
            event_tx: self.event_tx.clone(),
        }
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Start the IPC server in a background task
    pub async fn start(self: Arc<Self>) -> Result<()> {
        // Remove a stale socket left by a previous run
        if std::path::Path::new(&self.socket_path).exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {}", self.socket_path);

        // Spawn the accept loop
        let server = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let client_count = *server.client_count.read().await;
                        if client_count >= MAX_CLIENTS {
                            warn!("Maximum IPC clients reached ({}), rejecting connection", MAX_CLIENTS);
                            continue;
                        }

                        *server.client_count.write().await += 1;
                        debug!("Client connected (total: {})", client_count + 1);

                        let server_clone = server.clone();
                        let client_count_ref = server.client_count.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server_clone.handle_client(stream).await {
                                debug!("Client handler ended: {}", e);
                            }
                            *client_count_ref.write().await -= 1;
                            debug!("Client disconnected");
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept IPC connection: {}", e);
                    }
                }
            }
        });

        Ok(())
    }

    /// Remove the socket file on shutdown
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            debug!("Could not remove socket {}: {}", self.socket_path, e);
        }
    }

    /// Handle a connected client
    async fn handle_client(self: Arc<Self>, stream: UnixStream) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Subscribe to event broadcast
        let mut event_rx = self.event_tx.subscribe();

        // Spawn writer task for events
        let write_handle = tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(event) => match encode_message(&event) {
                        Ok(data) => {
                            if let Err(e) = writer.write_all(&data).await {
                                debug!("Failed to write to client: {}", e);
                                break;
                            }
                            if let Err(e) = writer.flush().await {
                                debug!("Failed to flush to client: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to encode event: {}", e);
                        }
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged behind by {} events", n);
                    }
                }
            }
        });

        // Read commands from client
        let command_tx = self.command_tx.clone();
        let result = loop {
            let frame = match read_frame(&mut reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            match serde_json::from_slice::<ClientCommand>(&frame) {
                Ok(cmd) => {
                    if let Err(e) = command_tx.send(cmd).await {
                        error!("Failed to forward command: {}", e);
                        break Ok(());
                    }
                }
                Err(e) => {
                    warn!("Failed to parse command from client: {}", e);
                }
            }
        };

        write_handle.abort();
        result
    }

    /// Broadcast an event to all connected clients
    pub fn broadcast(&self, event: DaemonEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Receive a command (blocking)
    pub async fn recv_command(&self) -> Option<ClientCommand> {
        self.command_rx.write().await.recv().await
    }

    /// Get connected client count
    pub async fn client_count(&self) -> usize {
        *self.client_count.read().await
    }

    /// Send a heartbeat to all clients
    pub fn send_heartbeat(&self) {
        let timestamp = Utc::now().timestamp();
        self.broadcast(DaemonEvent::Heartbeat { timestamp });
    }

    /// Get uptime in seconds
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run one command and build the event that answers it
    pub async fn handle_command(&self, cmd: ClientCommand) -> Option<DaemonEvent> {
        if let ClientCommand::Pong { timestamp } = cmd {
            debug!("Received Pong with timestamp {}", timestamp);
            return None;
        }

        if let ClientCommand::PreviewSpeech { request_id, message } = cmd {
            return self.preview_speech(request_id, message);
        }

        let Some(reminders) = self.reminders.as_ref() else {
            warn!("Command received before the reminder service was attached");
            return cmd.request_id().map(|request_id| DaemonEvent::CommandResponse {
                request_id: request_id.to_string(),
                success: false,
                message: Some("Reminder service is not running".to_string()),
                data: None,
            });
        };

        let event = match cmd {
            ClientCommand::CreateReminder {
                request_id,
                message,
                fire_at_epoch_millis,
            } => {
                let result = reminders.create(&message, fire_at_epoch_millis).await.map(|created| {
                    let when = format_epoch_millis(created.reminder.fire_at_epoch_millis);
                    let until = describe_until(
                        created.reminder.fire_at_epoch_millis,
                        Utc::now().timestamp_millis(),
                    );
                    let note = match created.mode {
                        ScheduleMode::Exact => String::new(),
                        ScheduleMode::Inexact => ", inexact".to_string(),
                    };
                    (
                        format!("Reminder #{} set for {} ({}{})", created.reminder.id, when, until, note),
                        created,
                    )
                });
                respond(request_id, result)
            }
            ClientCommand::CancelReminder { request_id, id } => {
                let result = reminders.cancel(id).await.map(|cancelled| {
                    let text = if cancelled {
                        format!("Reminder #{id} cancelled")
                    } else {
                        format!("Reminder #{id} not found, nothing to cancel")
                    };
                    (text, serde_json::json!({ "cancelled": cancelled }))
                });
                respond(request_id, result)
            }
            ClientCommand::GetReminder { request_id, id } => {
                let result = reminders
                    .get(id)
                    .await
                    .map(|reminder| (format!("Reminder #{}", reminder.id), reminder));
                respond(request_id, result)
            }
            ClientCommand::ListReminders {
                request_id,
                include_completed,
            } => {
                let result = if include_completed {
                    reminders.list_all().await
                } else {
                    reminders.list_scheduled().await
                }
                .map(|list| (format!("{} reminders", list.len()), list));
                respond(request_id, result)
            }
            ClientCommand::Reconcile { request_id } => match self.recovery.as_ref() {
                Some(recovery) => {
                    let result = recovery.recover().await.map(|report| {
                        (
                            format!(
                                "Reconciled {} reminders: {} rescheduled, {} inexact, {} stale, {} failed",
                                report.examined,
                                report.rescheduled,
                                report.inexact,
                                report.stale_completed,
                                report.failed
                            ),
                            report,
                        )
                    });
                    respond(request_id, result)
                }
                None => DaemonEvent::CommandResponse {
                    request_id,
                    success: false,
                    message: Some("Recovery is not available".to_string()),
                    data: None,
                },
            },
            ClientCommand::ClearAll { request_id } => {
                let result = reminders
                    .clear_all()
                    .await
                    .map(|count| (format!("Cleared {count} reminders"), count));
                respond(request_id, result)
            }
            ClientCommand::PurgeCompleted { request_id } => {
                let result = reminders
                    .purge_completed()
                    .await
                    .map(|count| (format!("Removed {count} completed reminders"), count));
                respond(request_id, result)
            }
            ClientCommand::GetStats { request_id } => {
                let result = reminders.stats().await.map(|stats| {
                    (
                        format!(
                            "{} reminders ({} scheduled, {} completed)",
                            stats.total, stats.scheduled, stats.completed
                        ),
                        stats,
                    )
                });
                respond(request_id, result)
            }
            ClientCommand::ExportReminders { request_id } => {
                let result = reminders
                    .export_json()
                    .await
                    .map(|json| ("Export ready".to_string(), json));
                respond(request_id, result)
            }
            ClientCommand::ImportReminders { request_id, data } => {
                let result = reminders.import_json(&data).await.map(|report| {
                    (
                        format!(
                            "Imported {} reminders ({} scheduled, {} stale, {} skipped, {} failed)",
                            report.imported,
                            report.scheduled,
                            report.stale_completed,
                            report.skipped,
                            report.failed
                        ),
                        report,
                    )
                });
                respond(request_id, result)
            }
            ClientCommand::GetStatus => {
                let pending_reminders = match reminders.stats().await {
                    Ok(stats) => stats.scheduled,
                    Err(e) => {
                        warn!("Failed to read store stats: {}", e);
                        0
                    }
                };
                DaemonEvent::StatusUpdate {
                    uptime_seconds: self.get_uptime_seconds(),
                    pending_reminders,
                    registered_timers: reminders.scheduler().registered_count(),
                    connected_clients: self.client_count().await,
                }
            }
            ClientCommand::Pong { .. } | ClientCommand::PreviewSpeech { .. } => return None,
        };

        Some(event)
    }

    /// Validate a preview request and speak it in the background.
    ///
    /// Speaking can take as long as the speech timeout, so the response for an
    /// accepted preview is broadcast once speech finishes and `None` is returned.
    fn preview_speech(&self, request_id: String, message: String) -> Option<DaemonEvent> {
        let rejected = |text: &str| {
            Some(DaemonEvent::CommandResponse {
                request_id: request_id.clone(),
                success: false,
                message: Some(text.to_string()),
                data: None,
            })
        };

        let Some(speech) = self.speech.clone() else {
            return rejected("Speech is not available");
        };
        if !speech.is_enabled() {
            return rejected("Speech is disabled (TTS_ENABLED=false)");
        }
        let message = message.trim().to_string();
        if message.is_empty() {
            return rejected("Please enter a message to preview");
        }

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let (success, text) = match speech.speak(&message).await {
                Ok(()) => {
                    info!("🔊 Spoke preview ({} chars)", message.len());
                    (true, "Preview spoken".to_string())
                }
                Err(e) => {
                    warn!("Speech preview failed: {}", e);
                    (false, format!("Failed to play voice preview: {e}"))
                }
            };
            let _ = event_tx.send(DaemonEvent::CommandResponse {
                request_id,
                success,
                message: Some(text),
                data: None,
            });
        });

        None
    }

    /// Process a single command and broadcast the response
    pub async fn process_command(&self, cmd: ClientCommand) {
        if let Some(event) = self.handle_command(cmd).await {
            self.broadcast(event);
        }
    }

    /// Start the command processing loop (call this after server start)
    pub fn start_command_processor(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("📡 IPC command processor started");
            while let Some(cmd) = self.recv_command().await {
                debug!("Processing client command: {:?}", cmd);
                self.process_command(cmd).await;
            }
        })
    }
}

/// Wrap a command result into a `CommandResponse`
fn respond<T: Serialize>(request_id: String, result: ReminderResult<(String, T)>) -> DaemonEvent {
    match result {
        Ok((message, data)) => match serde_json::to_value(data) {
            Ok(data) => DaemonEvent::CommandResponse {
                request_id,
                success: true,
                message: Some(message),
                data: Some(data),
            },
            Err(e) => DaemonEvent::CommandResponse {
                request_id,
                success: false,
                message: Some(format!("Failed to encode response: {e}")),
                data: None,
            },
        },
        Err(e) => {
            debug!("Command {} failed: {}", request_id, e);
            DaemonEvent::CommandResponse {
                request_id,
                success: false,
                message: Some(e.to_string()),
                data: None,
            }
        }
    }
}

/// Broadcasts fired reminders as `ReminderFired` events
#[derive(Clone)]
pub struct IpcBroadcaster {
    event_tx: broadcast::Sender<DaemonEvent>,
}

#[async_trait]
impl Presenter for IpcBroadcaster {
    fn name(&self) -> &'static str {
        "ipc"
    }

    async fn present(&self, alarm: &AlarmEvent) -> Result<()> {
        let notification = Notification::from_alarm(alarm);
        let event = DaemonEvent::ReminderFired {
            alarm_id: alarm.alarm_id,
            title: notification.title,
            summary: notification.summary,
            message: notification.body,
            fire_at_epoch_millis: alarm.fire_at_epoch_millis,
        };
        if self.event_tx.send(event).is_err() {
            debug!("No clients connected for alarm {}", alarm.alarm_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SpeechConfig;
    use crate::database::Database;
    use crate::features::alarms::TokioAlarmScheduler;
    use crate::features::reminders::Reminder;
    use crate::ipc::client::IpcClient;
    use std::time::Duration;
    use tokio::sync::mpsc::Receiver;

    const HOUR_MS: i64 = 3_600_000;

    struct Fixture {
        server: Arc<IpcServer>,
        service: Arc<ReminderService>,
        _alarms: Receiver<AlarmEvent>,
    }

    async fn fixture(socket_path: &str) -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let (scheduler, alarms) = TokioAlarmScheduler::new(true, Duration::from_secs(60));
        let scheduler = Arc::new(scheduler);
        let server = IpcServer::new(socket_path);
        let service = Arc::new(ReminderService::new(
            db.clone(),
            scheduler.clone(),
            Arc::new(server.broadcaster()),
        ));
        let recovery = Arc::new(RecoveryCoordinator::new(db, scheduler));
        let server = Arc::new(server.with_reminders(service.clone(), recovery));
        Fixture {
            server,
            service,
            _alarms: alarms,
        }
    }

    fn temp_socket() -> String {
        std::env::temp_dir()
            .join(format!("voice-reminder-test-{}.sock", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string()
    }

    fn expect_response(event: Option<DaemonEvent>) -> (bool, Option<String>, Option<serde_json::Value>) {
        match event {
            Some(DaemonEvent::CommandResponse {
                success,
                message,
                data,
                ..
            }) => (success, message, data),
            other => panic!("Expected CommandResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_commands() {
        let f = fixture(&temp_socket()).await;
        let fire_at = Utc::now().timestamp_millis() + HOUR_MS;

        let (success, message, data) = expect_response(
            f.server
                .handle_command(ClientCommand::CreateReminder {
                    request_id: "r1".to_string(),
                    message: "Take medication".to_string(),
                    fire_at_epoch_millis: fire_at,
                })
                .await,
        );
        assert!(success);
        assert!(message.unwrap().starts_with("Reminder #1 set for"));
        assert_eq!(data.unwrap()["mode"], "Exact");

        let (success, _, data) = expect_response(
            f.server
                .handle_command(ClientCommand::ListReminders {
                    request_id: "r2".to_string(),
                    include_completed: false,
                })
                .await,
        );
        assert!(success);
        let list: Vec<Reminder> = serde_json::from_value(data.unwrap()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].message, "Take medication");
    }

    #[tokio::test]
    async fn test_validation_errors_become_failed_responses() {
        let f = fixture(&temp_socket()).await;
        let (success, message, data) = expect_response(
            f.server
                .handle_command(ClientCommand::CreateReminder {
                    request_id: "r1".to_string(),
                    message: "late".to_string(),
                    fire_at_epoch_millis: Utc::now().timestamp_millis() - 1_000,
                })
                .await,
        );
        assert!(!success);
        assert!(message.unwrap().contains("future"));
        assert!(data.is_none());
        assert!(f.service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_unknown_is_benign_and_get_unknown_fails() {
        let f = fixture(&temp_socket()).await;

        let (success, _, data) = expect_response(
            f.server
                .handle_command(ClientCommand::CancelReminder {
                    request_id: "c".to_string(),
                    id: 42,
                })
                .await,
        );
        assert!(success);
        assert_eq!(data.unwrap()["cancelled"], false);

        let (success, message, _) = expect_response(
            f.server
                .handle_command(ClientCommand::GetReminder {
                    request_id: "g".to_string(),
                    id: 42,
                })
                .await,
        );
        assert!(!success);
        assert!(message.unwrap().to_lowercase().contains("not found"));
    }

    #[tokio::test]
    async fn test_status_and_pong() {
        let f = fixture(&temp_socket()).await;
        f.service
            .create("stretch", Utc::now().timestamp_millis() + HOUR_MS)
            .await
            .unwrap();

        match f.server.handle_command(ClientCommand::GetStatus).await {
            Some(DaemonEvent::StatusUpdate {
                pending_reminders,
                registered_timers,
                ..
            }) => {
                assert_eq!(pending_reminders, 1);
                assert_eq!(registered_timers, 1);
            }
            other => panic!("Expected StatusUpdate, got {:?}", other),
        }

        assert!(f
            .server
            .handle_command(ClientCommand::Pong { timestamp: 1 })
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_server_without_service_reports_failure() {
        let server = IpcServer::new(temp_socket());
        let (success, _, _) = expect_response(
            server
                .handle_command(ClientCommand::GetStats {
                    request_id: "s".to_string(),
                })
                .await,
        );
        assert!(!success);
        assert!(server.handle_command(ClientCommand::GetStatus).await.is_none());
    }

    #[tokio::test]
    async fn test_broadcaster_emits_reminder_fired() {
        let server = IpcServer::new(temp_socket());
        let mut rx = server.event_tx.subscribe();
        let alarm = AlarmEvent {
            alarm_id: 3,
            message: "x".repeat(60),
            fire_at_epoch_millis: 1_000,
        };

        server.broadcaster().present(&alarm).await.unwrap();

        match rx.recv().await.unwrap() {
            DaemonEvent::ReminderFired {
                alarm_id,
                title,
                summary,
                message,
                ..
            } => {
                assert_eq!(alarm_id, 3);
                assert_eq!(title, "Voice Reminder");
                assert!(summary.ends_with("..."));
                assert_eq!(message.len(), 60);
            }
            other => panic!("Expected ReminderFired, got {:?}", other),
        }
    }

    fn speech(enabled: bool) -> Arc<SpeechPresenter> {
        Arc::new(SpeechPresenter::new(SpeechConfig {
            enabled,
            command: "definitely-not-a-tts-binary".to_string(),
            timeout: Duration::from_secs(5),
            ..SpeechConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_preview_speech_reports_outcome_asynchronously() {
        let server = IpcServer::new(temp_socket()).with_speech(speech(true));
        let mut rx = server.event_tx.subscribe();

        let immediate = server
            .handle_command(ClientCommand::PreviewSpeech {
                request_id: "p1".to_string(),
                message: "Take medication".to_string(),
            })
            .await;
        assert!(immediate.is_none());

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            DaemonEvent::CommandResponse {
                request_id,
                success,
                message,
                ..
            } => {
                assert_eq!(request_id, "p1");
                assert!(!success);
                assert!(message.unwrap().contains("Failed to play voice preview"));
            }
            other => panic!("Expected CommandResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preview_speech_rejections() {
        let (success, message, _) = expect_response(
            IpcServer::new(temp_socket())
                .handle_command(ClientCommand::PreviewSpeech {
                    request_id: "p".to_string(),
                    message: "hello".to_string(),
                })
                .await,
        );
        assert!(!success);
        assert_eq!(message.as_deref(), Some("Speech is not available"));

        let server = IpcServer::new(temp_socket()).with_speech(speech(true));
        let (success, message, _) = expect_response(
            server
                .handle_command(ClientCommand::PreviewSpeech {
                    request_id: "p".to_string(),
                    message: "   ".to_string(),
                })
                .await,
        );
        assert!(!success);
        assert!(message.unwrap().contains("message to preview"));

        let server = IpcServer::new(temp_socket()).with_speech(speech(false));
        let (success, message, _) = expect_response(
            server
                .handle_command(ClientCommand::PreviewSpeech {
                    request_id: "p".to_string(),
                    message: "hello".to_string(),
                })
                .await,
        );
        assert!(!success);
        assert!(message.unwrap().contains("disabled"));
    }

    #[tokio::test]
    async fn test_end_to_end_over_socket() {
        let socket = temp_socket();
        let f = fixture(&socket).await;
        f.server.clone().start().await.unwrap();
        let processor = f.server.clone().start_command_processor();

        let mut client = IpcClient::connect(&socket).await.unwrap();
        let request_id = client
            .create_reminder("Take medication".to_string(), Utc::now().timestamp_millis() + HOUR_MS)
            .await
            .unwrap();

        let reply = client
            .wait_for_response(&request_id, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(reply.success);
        assert_eq!(f.service.list_scheduled().await.unwrap().len(), 1);

        processor.abort();
        f.server.cleanup();
    }
}
