//! Runtime configuration loaded from the environment
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Speech settings (language, rate, pitch, timeout)
//! - 1.0.0: Database path, log level, IPC socket, alarm permissions

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

/// Default SQLite file for the reminder store
pub const DEFAULT_DATABASE_PATH: &str = "reminders.db";

/// Default lateness allowed for inexact alarms
pub const DEFAULT_INEXACT_WINDOW_SECS: u64 = 60;

/// Text-to-speech settings handed to the speech presenter
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub command: String,
    pub language: String,
    /// Relative speaking rate, 0.5 is the normal pace
    pub rate: f32,
    /// Relative pitch, 1.0 is the voice default
    pub pitch: f32,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "espeak".to_string(),
            language: "en-US".to_string(),
            rate: 0.5,
            pitch: 1.0,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    pub socket_path: String,
    /// Whether the host grants exact wake-up alarms
    pub exact_alarms: bool,
    pub inexact_window: Duration,
    pub heartbeat_interval: Duration,
    pub speech: SpeechConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            log_level: "info".to_string(),
            socket_path: crate::ipc::DEFAULT_SOCKET_PATH.to_string(),
            exact_alarms: true,
            inexact_window: Duration::from_secs(DEFAULT_INEXACT_WINDOW_SECS),
            heartbeat_interval: Duration::from_secs(30),
            speech: SpeechConfig::default(),
        }
    }
}

impl Config {
    /// Build the configuration from environment variables (call `dotenv()` first)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let speech_defaults = SpeechConfig::default();

        let speech = SpeechConfig {
            enabled: parse_bool(&lookup, "TTS_ENABLED", speech_defaults.enabled)?,
            command: lookup("TTS_COMMAND").unwrap_or(speech_defaults.command),
            language: lookup("TTS_LANGUAGE").unwrap_or(speech_defaults.language),
            rate: parse_number(&lookup, "TTS_RATE", speech_defaults.rate)?,
            pitch: parse_number(&lookup, "TTS_PITCH", speech_defaults.pitch)?,
            timeout: Duration::from_secs(parse_number(
                &lookup,
                "TTS_TIMEOUT_SECS",
                speech_defaults.timeout.as_secs(),
            )?),
        };

        if speech.rate <= 0.0 {
            return Err(anyhow!("TTS_RATE must be positive, got {}", speech.rate));
        }
        if speech.pitch <= 0.0 {
            return Err(anyhow!("TTS_PITCH must be positive, got {}", speech.pitch));
        }

        let heartbeat_interval = Duration::from_secs(parse_number(
            &lookup,
            "HEARTBEAT_INTERVAL_SECS",
            defaults.heartbeat_interval.as_secs(),
        )?);
        if heartbeat_interval.is_zero() {
            return Err(anyhow!("HEARTBEAT_INTERVAL_SECS must be positive"));
        }

        Ok(Config {
            database_path: lookup("REMINDER_DATABASE_PATH").unwrap_or(defaults.database_path),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            socket_path: lookup("REMINDER_IPC_SOCKET").unwrap_or(defaults.socket_path),
            exact_alarms: parse_bool(&lookup, "REMINDER_EXACT_ALARMS", defaults.exact_alarms)?,
            inexact_window: Duration::from_secs(parse_number(
                &lookup,
                "REMINDER_INEXACT_WINDOW_SECS",
                defaults.inexact_window.as_secs(),
            )?),
            heartbeat_interval,
            speech,
        })
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
            "0" | "false" | "no" | "off" | "disabled" => Ok(false),
            other => Err(anyhow!("Invalid boolean for {}: {}", key, other)),
        },
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid number for {}: {}", key, raw)),
    }
}
