use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::codecs::{AudioParams, ContainerKind, EncoderConfig, FrameRate, Metadata, VideoParams};
use crate::core::error::ConfigError;
use crate::producers::AlarmSchedule;
use crate::recorder::{EventTiming, RecorderSettings};

// ---------- Recorder ----------
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RecorderSection {
    pub name: String,
    pub location: String,
    pub format: String,
    pub min_event_duration_secs: f64,
    pub tick_ms: u64,
    pub max_event_head_age_ms: u64,
    pub max_event_tail_age_ms: u64,
}

impl Default for RecorderSection {
    fn default() -> Self {
        Self {
            name: "camera".to_string(),
            location: "events".to_string(),
            format: "evr".to_string(),
            min_event_duration_secs: 0.0,
            tick_ms: 20,
            max_event_head_age_ms: 2_000,
            max_event_tail_age_ms: 3_000,
        }
    }
}

// ---------- Synthetic provider ----------
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderSection {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub max_burst: u32,
    pub alarm_period_secs: f64,
    /// `[start, end)` offsets in seconds within each period.
    pub alarm_windows: Vec<[f64; 2]>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            width: 320,
            height: 240,
            frame_rate: FrameRate::new(15, 1),
            max_burst: 3,
            alarm_period_secs: 30.0,
            alarm_windows: vec![[10.0, 14.0]],
        }
    }
}

// ---------- Notifications ----------
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NotificationSection {
    pub jsonl_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub recorder: RecorderSection,
    pub video: VideoParams,
    pub audio: AudioParams,
    pub metadata: Metadata,
    pub provider: ProviderSection,
    pub notifications: NotificationSection,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
        let config = Self::from_toml_str(&content).with_context(|| format!("loading {}", path))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::with_context("invalid TOML", e))?;
        config.validate().context("config validation failed")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.recorder;
        if r.name.trim().is_empty() {
            return Err(ConfigError::message("recorder.name must not be empty"));
        }
        if r.name.contains('/') {
            return Err(ConfigError::message(format!(
                "recorder.name '{}' must not contain '/'",
                r.name
            )));
        }
        if r.location.trim().is_empty() {
            return Err(ConfigError::message("recorder.location must not be empty"));
        }
        ContainerKind::resolve(&r.format)
            .map_err(|e| ConfigError::with_context("recorder.format", e))?;
        if r.tick_ms == 0 {
            return Err(ConfigError::message("recorder.tick_ms must be > 0"));
        }
        if !r.min_event_duration_secs.is_finite() || r.min_event_duration_secs < 0.0 {
            return Err(ConfigError::message(
                "recorder.min_event_duration_secs must be a non-negative number",
            ));
        }
        if self.provider.frame_rate.num == 0 || self.provider.frame_rate.den == 0 {
            return Err(ConfigError::message("provider.frame_rate must be non-zero"));
        }
        if self.provider.alarm_period_secs < 0.0 || !self.provider.alarm_period_secs.is_finite() {
            return Err(ConfigError::message("provider.alarm_period_secs must be non-negative"));
        }
        for [start, end] in &self.provider.alarm_windows {
            if !(*start >= 0.0 && start < end) {
                return Err(ConfigError::message(format!(
                    "provider.alarm_windows entry [{}, {}] is not a valid range",
                    start, end
                )));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn timing(&self) -> EventTiming {
        EventTiming {
            max_head_age: Duration::from_millis(self.recorder.max_event_head_age_ms),
            max_tail_age: Duration::from_millis(self.recorder.max_event_tail_age_ms),
            min_event_duration: Duration::from_secs_f64(self.recorder.min_event_duration_secs),
        }
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            format: self.recorder.format.clone(),
            video: self.video.clone(),
            audio: self.audio.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings {
            name: self.recorder.name.clone(),
            location: PathBuf::from(&self.recorder.location),
            tick: Duration::from_millis(self.recorder.tick_ms),
            timing: self.timing(),
            encoder: self.encoder_config(),
        }
    }

    pub fn alarm_schedule(&self) -> AlarmSchedule {
        AlarmSchedule {
            period: Duration::from_secs_f64(self.provider.alarm_period_secs),
            windows: self
                .provider
                .alarm_windows
                .iter()
                .map(|[s, e]| (Duration::from_secs_f64(*s), Duration::from_secs_f64(*e)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.recorder_settings().tick, Duration::from_millis(20));
    }

    #[test]
    fn test_parse_full_file() {
        let cfg = Config::from_toml_str(
            r#"
            [recorder]
            name = "front-door"
            location = "/var/lib/events"
            format = "wav"
            min_event_duration_secs = 1.5
            tick_ms = 40
            max_event_head_age_ms = 5000
            max_event_tail_age_ms = 4000

            [video]
            width = 640
            height = 480
            pixel_format = "rgb24"
            frame_rate = { num = 25, den = 1 }

            [audio]
            sample_rate = 16000
            channels = 1

            [notifications]
            jsonl_path = "/tmp/notify.jsonl"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.recorder.name, "front-door");
        assert_eq!(cfg.video.pixel_format, PixelFormat::Rgb24);
        assert_eq!(cfg.video.bit_rate, 200_000);
        assert_eq!(cfg.audio.sample_rate, 16_000);

        let timing = cfg.timing();
        assert_eq!(timing.max_head_age, Duration::from_secs(5));
        assert_eq!(timing.max_tail_age, Duration::from_secs(4));
        assert_eq!(timing.min_event_duration, Duration::from_millis(1500));
        assert_eq!(cfg.encoder_config().format, "wav");
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = Config::from_toml_str("[recorder]\nformat = \"mkv\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("could not deduce output format"));
    }

    #[test]
    fn test_bad_alarm_window_rejected() {
        let err = Config::from_toml_str("[provider]\nalarm_windows = [[5.0, 2.0]]\n").unwrap_err();
        assert!(format!("{:#}", err).contains("alarm_windows"));
    }
}
