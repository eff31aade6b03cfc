//! # IPC Protocol
//!
//! Message types for daemon <-> CLI communication over Unix socket.
//!
//! Uses length-prefixed JSON framing:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON payload

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest accepted frame payload
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

// ============================================================================
// Daemon -> Client Events
// ============================================================================

/// Events sent from the daemon to connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonEvent {
    /// Response to a command carrying a request id
    CommandResponse {
        request_id: String,
        success: bool,
        message: Option<String>,
        data: Option<serde_json::Value>,
    },
    /// A reminder timer fired and was handed to presentation
    ReminderFired {
        alarm_id: i32,
        title: String,
        summary: String,
        message: String,
        fire_at_epoch_millis: i64,
    },
    /// Status update (response to GetStatus)
    StatusUpdate {
        uptime_seconds: u64,
        pending_reminders: usize,
        registered_timers: usize,
        connected_clients: usize,
    },
    /// Heartbeat to keep connection alive
    Heartbeat {
        timestamp: i64,
    },
}

// ============================================================================
// Client -> Daemon Commands
// ============================================================================

/// Commands sent from a client to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Create and schedule a reminder
    CreateReminder {
        request_id: String,
        message: String,
        fire_at_epoch_millis: i64,
    },
    /// Cancel a pending reminder and delete it
    CancelReminder {
        request_id: String,
        id: i64,
    },
    GetReminder {
        request_id: String,
        id: i64,
    },
    /// List pending reminders, or every stored reminder
    ListReminders {
        request_id: String,
        include_completed: bool,
    },
    /// Run a recovery pass now
    Reconcile {
        request_id: String,
    },
    /// Cancel every timer and empty the store
    ClearAll {
        request_id: String,
    },
    /// Delete completed reminders
    PurgeCompleted {
        request_id: String,
    },
    GetStats {
        request_id: String,
    },
    ExportReminders {
        request_id: String,
    },
    /// Import a JSON export
    ImportReminders {
        request_id: String,
        data: String,
    },
    /// Speak a message through the speech presenter without storing anything
    PreviewSpeech {
        request_id: String,
        message: String,
    },
    /// Request current status
    GetStatus,
    /// Heartbeat response
    Pong {
        timestamp: i64,
    },
}

impl ClientCommand {
    /// Request id for commands answered with a `CommandResponse`
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientCommand::CreateReminder { request_id, .. }
            | ClientCommand::CancelReminder { request_id, .. }
            | ClientCommand::GetReminder { request_id, .. }
            | ClientCommand::ListReminders { request_id, .. }
            | ClientCommand::Reconcile { request_id }
            | ClientCommand::ClearAll { request_id }
            | ClientCommand::PurgeCompleted { request_id }
            | ClientCommand::GetStats { request_id }
            | ClientCommand::ExportReminders { request_id }
            | ClientCommand::ImportReminders { request_id, .. }
            | ClientCommand::PreviewSpeech { request_id, .. } => Some(request_id),
            ClientCommand::GetStatus | ClientCommand::Pong { .. } => None,
        }
    }
}

// ============================================================================
// Framing - Length-prefixed JSON messages
// ============================================================================

/// Encode a message with length prefix
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes", json.len()));
    }
    let len = json.len() as u32;
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Read one frame payload from an async reader. `Ok(None)` on a clean EOF.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}
