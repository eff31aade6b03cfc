//! Text-to-speech through an external command
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.1.0

use crate::core::config::SpeechConfig;
use crate::features::alarms::AlarmEvent;
use crate::features::presentation::notification::Presenter;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;

/// Words per minute at the normal rate (0.5)
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Speaks fired reminders with `espeak`-compatible commands
pub struct SpeechPresenter {
    config: SpeechConfig,
}

impl SpeechPresenter {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Command-line arguments for speaking `text`
    pub fn build_args(&self, text: &str) -> Vec<String> {
        let words_per_minute = (BASE_WORDS_PER_MINUTE * self.config.rate / 0.5)
            .round()
            .clamp(80.0, 450.0) as u32;
        let pitch = (50.0 * self.config.pitch).round().clamp(0.0, 99.0) as u32;

        vec![
            "-v".to_string(),
            self.config.language.to_lowercase(),
            "-s".to_string(),
            words_per_minute.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "--".to_string(),
            text.to_string(),
        ]
    }

    pub async fn speak(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        debug!("Speaking via {}: {} chars", self.config.command, text.len());

        let child = Command::new(&self.config.command)
            .args(self.build_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("Failed to start {}: {}", self.config.command, e))?;

        let output = timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("Speech timed out after {:?}", self.config.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.config.command,
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Presenter for SpeechPresenter {
    fn name(&self) -> &'static str {
        "speech"
    }

    async fn present(&self, alarm: &AlarmEvent) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.speak(&alarm.message).await?;
        info!("🔊 Spoke reminder for alarm {}", alarm.alarm_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn presenter(command: &str) -> SpeechPresenter {
        SpeechPresenter::new(SpeechConfig {
            command: command.to_string(),
            timeout: Duration::from_secs(5),
            ..SpeechConfig::default()
        })
    }

    #[test]
    fn test_default_args() {
        let args = presenter("espeak").build_args("Take medication");
        assert_eq!(
            args,
            vec!["-v", "en-us", "-s", "175", "-p", "50", "--", "Take medication"]
        );
    }

    #[test]
    fn test_rate_and_pitch_are_clamped() {
        let speech = SpeechPresenter::new(SpeechConfig {
            rate: 10.0,
            pitch: 5.0,
            ..SpeechConfig::default()
        });
        let args = speech.build_args("x");
        assert_eq!(args[3], "450");
        assert_eq!(args[5], "99");
    }

    #[tokio::test]
    async fn test_missing_command_is_an_error() {
        let result = presenter("definitely-not-a-tts-binary").speak("hello").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_disabled_presenter_does_nothing() {
        let speech = SpeechPresenter::new(SpeechConfig {
            enabled: false,
            command: "definitely-not-a-tts-binary".to_string(),
            ..SpeechConfig::default()
        });
        let alarm = AlarmEvent {
            alarm_id: 1,
            message: "hi".to_string(),
            fire_at_epoch_millis: 0,
        };
        assert!(speech.present(&alarm).await.is_ok());
    }
}
