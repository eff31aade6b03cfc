//! # IPC Client
//!
//! Unix socket client used by the CLI to talk to the reminder daemon.

use crate::ipc::protocol::{encode_message, read_frame, ClientCommand, DaemonEvent};
use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration, Instant};

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for events
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Answer to a command that carried a request id
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// IPC client for the reminder daemon
pub struct IpcClient {
    /// Event receiver channel
    event_rx: mpsc::Receiver<DaemonEvent>,
    /// Command sender channel
    command_tx: mpsc::Sender<ClientCommand>,
}

impl IpcClient {
    /// Connect to the daemon's IPC server
    pub async fn connect(socket_path: &str) -> Result<Self> {
        debug!("Connecting to IPC server at {}", socket_path);

        let stream = timeout(CONNECT_TIMEOUT, UnixStream::connect(socket_path))
            .await
            .map_err(|_| anyhow!("Connection timeout"))?
            .map_err(|e| anyhow!("Failed to connect to {}: {}", socket_path, e))?;

        debug!("Connected to IPC server");

        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);

        // Start the connection handler
        tokio::spawn(async move {
            Self::connection_loop(stream, event_tx, command_rx).await;
        });

        Ok(IpcClient {
            event_rx,
            command_tx,
        })
    }

    /// Main connection loop - handles reading events and writing commands
    async fn connection_loop(
        stream: UnixStream,
        event_tx: mpsc::Sender<DaemonEvent>,
        mut command_rx: mpsc::Receiver<ClientCommand>,
    ) {
        let (mut reader, mut writer) = stream.into_split();

        // Spawn command writer task
        let write_handle = tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                match encode_message(&cmd) {
                    Ok(data) => {
                        if let Err(e) = writer.write_all(&data).await {
                            error!("Failed to write command: {}", e);
                            break;
                        }
                        if let Err(e) = writer.flush().await {
                            error!("Failed to flush command: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to encode command: {}", e);
                    }
                }
            }
        });

        // Event reader loop
        loop {
            let frame = match timeout(READ_TIMEOUT, read_frame(&mut reader)).await {
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    error!("Read error: {}", e);
                    break;
                }
                Err(_) => {
                    debug!("Read timeout, connection may be idle");
                    continue;
                }
            };

            match serde_json::from_slice::<DaemonEvent>(&frame) {
                Ok(event) => {
                    if let DaemonEvent::Heartbeat { timestamp } = &event {
                        debug!("Received heartbeat: {}", timestamp);
                    }

                    if event_tx.send(event).await.is_err() {
                        debug!("Event receiver closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse event: {}", e);
                }
            }
        }

        write_handle.abort();
        debug!("IPC connection closed");
    }

    /// Receive an event (blocking)
    pub async fn recv(&mut self) -> Option<DaemonEvent> {
        self.event_rx.recv().await
    }

    /// Send a command to the daemon
    pub async fn send(&self, cmd: ClientCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| anyhow!("Failed to send command: {}", e))
    }

    /// Send a command built around a fresh request id and return that id
    async fn request<F>(&self, build: F) -> Result<String>
    where
        F: FnOnce(String) -> ClientCommand,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.send(build(request_id.clone())).await?;
        Ok(request_id)
    }

    pub async fn create_reminder(&self, message: String, fire_at_epoch_millis: i64) -> Result<String> {
        self.request(|request_id| ClientCommand::CreateReminder {
            request_id,
            message,
            fire_at_epoch_millis,
        })
        .await
    }

    pub async fn cancel_reminder(&self, id: i64) -> Result<String> {
        self.request(|request_id| ClientCommand::CancelReminder { request_id, id })
            .await
    }

    pub async fn get_reminder(&self, id: i64) -> Result<String> {
        self.request(|request_id| ClientCommand::GetReminder { request_id, id })
            .await
    }

    pub async fn list_reminders(&self, include_completed: bool) -> Result<String> {
        self.request(|request_id| ClientCommand::ListReminders {
            request_id,
            include_completed,
        })
        .await
    }

    pub async fn reconcile(&self) -> Result<String> {
        self.request(|request_id| ClientCommand::Reconcile { request_id })
            .await
    }

    pub async fn clear_all(&self) -> Result<String> {
        self.request(|request_id| ClientCommand::ClearAll { request_id })
            .await
    }

    pub async fn purge_completed(&self) -> Result<String> {
        self.request(|request_id| ClientCommand::PurgeCompleted { request_id })
            .await
    }

    pub async fn get_stats(&self) -> Result<String> {
        self.request(|request_id| ClientCommand::GetStats { request_id })
            .await
    }

    pub async fn export_reminders(&self) -> Result<String> {
        self.request(|request_id| ClientCommand::ExportReminders { request_id })
            .await
    }

    pub async fn import_reminders(&self, data: String) -> Result<String> {
        self.request(|request_id| ClientCommand::ImportReminders { request_id, data })
            .await
    }

    /// Ask the daemon to speak `message` once, nothing is stored
    pub async fn preview_speech(&self, message: String) -> Result<String> {
        self.request(|request_id| ClientCommand::PreviewSpeech { request_id, message })
            .await
    }

    /// Request daemon status
    pub async fn request_status(&self) -> Result<()> {
        self.send(ClientCommand::GetStatus).await
    }

    /// Wait for the `CommandResponse` matching `request_id`, skipping other events
    pub async fn wait_for_response(&mut self, request_id: &str, limit: Duration) -> Result<CommandReply> {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = timeout(remaining, self.recv())
                .await
                .map_err(|_| anyhow!("No response from daemon within {:?}", limit))?
                .ok_or_else(|| anyhow!("Connection to daemon closed"))?;

            match event {
                DaemonEvent::CommandResponse {
                    request_id: id,
                    success,
                    message,
                    data,
                } if id == request_id => {
                    return Ok(CommandReply {
                        success,
                        message,
                        data,
                    })
                }
                other => debug!("Skipping unrelated event: {:?}", other),
            }
        }
    }
}

/// Try to connect with retries
pub async fn connect_with_retry(socket_path: &str, max_attempts: u32, delay: Duration) -> Result<IpcClient> {
    let mut attempt = 1;
    loop {
        match IpcClient::connect(socket_path).await {
            Ok(client) => {
                if attempt > 1 {
                    info!("Connected to daemon after {} attempts", attempt);
                }
                return Ok(client);
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    "Connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to connect after {} attempts: {}",
                    attempt,
                    e
                ))
            }
        }
    }
}
