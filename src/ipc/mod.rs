//! # IPC Module
//!
//! Inter-process communication between the reminder daemon and its clients.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Reminder fired events broadcast through the presenter chain
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{connect_with_retry, CommandReply, IpcClient};
pub use protocol::{ClientCommand, DaemonEvent};
pub use server::{IpcBroadcaster, IpcServer};

/// Default socket path for IPC communication
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/voice-reminder.sock";
