//! Controller configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Idle time before controls hide during playback (milliseconds)
    pub controls_hide_delay_ms: u64,
    /// Lifetime of the play/pause cue (milliseconds)
    pub cue_duration_ms: u64,
    /// Arrow-key seek step (seconds)
    pub seek_step_secs: f64,
    /// Arrow-key volume step
    pub volume_step: f64,
    /// Level restored when unmuting from a stored volume of 0
    pub default_unmute_volume: f64,
    /// Volume when a controller is created
    pub initial_volume: f64,
    /// Retry a rejected autoplay once with audio muted
    pub autoplay_muted_retry: bool,
    /// Give up on a quality switch that never becomes ready (milliseconds).
    /// `None` waits indefinitely.
    pub quality_switch_timeout_ms: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            controls_hide_delay_ms: 3000,
            cue_duration_ms: 400,
            seek_step_secs: 5.0,
            volume_step: 0.1,
            default_unmute_volume: 0.5,
            initial_volume: 1.0,
            autoplay_muted_retry: true,
            quality_switch_timeout_ms: None,
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(body: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(body)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is within its usable range
    pub fn validate(&self) -> Result<()> {
        if self.controls_hide_delay_ms == 0 {
            return Err(Error::InvalidConfig(
                "controls_hide_delay_ms must be positive".into(),
            ));
        }
        if !(self.seek_step_secs.is_finite() && self.seek_step_secs > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "seek_step_secs must be positive, got {}",
                self.seek_step_secs
            )));
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "volume_step must be in (0, 1], got {}",
                self.volume_step
            )));
        }
        if !(self.default_unmute_volume > 0.0 && self.default_unmute_volume <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "default_unmute_volume must be in (0, 1], got {}",
                self.default_unmute_volume
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::InvalidConfig(format!(
                "initial_volume must be in [0, 1], got {}",
                self.initial_volume
            )));
        }
        if self.quality_switch_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "quality_switch_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }

    pub fn controls_hide_delay(&self) -> Duration {
        Duration::from_millis(self.controls_hide_delay_ms)
    }

    pub fn cue_duration(&self) -> Duration {
        Duration::from_millis(self.cue_duration_ms)
    }

    pub fn quality_switch_timeout(&self) -> Option<Duration> {
        self.quality_switch_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.controls_hide_delay(), Duration::from_millis(3000));
        assert_eq!(config.cue_duration(), Duration::from_millis(400));
        assert_eq!(config.default_unmute_volume, 0.5);
        assert!(config.quality_switch_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = PlayerConfig::from_json(r#"{"seek_step_secs": 10.0}"#).unwrap();
        assert_eq!(config.seek_step_secs, 10.0);
        assert_eq!(config.volume_step, 0.1);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = PlayerConfig::from_json(r#"{"volume_step": 0}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let config = PlayerConfig {
            initial_volume: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
