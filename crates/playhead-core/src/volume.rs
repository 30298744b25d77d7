//! Volume controller
//!
//! Owns the stored level and the mute flag. Muting never rewrites the stored
//! level, so unmuting returns to what the viewer had before; the one exception
//! is unmuting from a stored level of 0, which restores a default so the
//! unmute is audible.

use crate::media::MediaResource;
use tracing::debug;

/// Levels are kept on a 1e-6 grid so repeated keyboard steps land exactly
const VOLUME_RESOLUTION: f64 = 1e6;

#[derive(Debug, Clone)]
pub struct VolumeController {
    volume: f64,
    muted: bool,
    default_unmute_volume: f64,
}

impl VolumeController {
    pub fn new(initial_volume: f64, default_unmute_volume: f64) -> Self {
        let volume = initial_volume.clamp(0.0, 1.0);
        Self {
            volume,
            muted: volume == 0.0,
            default_unmute_volume,
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Level actually heard
    pub fn effective(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Clamp to `[0, 1]`; a level of 0 is muted, anything above is not
    pub fn set_volume(&mut self, volume: f64) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            (volume.clamp(0.0, 1.0) * VOLUME_RESOLUTION).round() / VOLUME_RESOLUTION
        };
        self.volume = volume;
        self.muted = volume == 0.0;
        debug!(volume, muted = self.muted, "Volume set");
    }

    pub fn adjust(&mut self, delta: f64) {
        self.set_volume(self.volume + delta);
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        if !self.muted && self.volume == 0.0 {
            self.volume = self.default_unmute_volume;
        }
        debug!(volume = self.volume, muted = self.muted, "Mute toggled");
    }

    /// Mute without touching the stored level (autoplay retry)
    pub fn force_mute(&mut self) {
        self.muted = true;
    }

    /// Write both fields to the resource together
    pub fn apply(&self, media: &mut dyn MediaResource) {
        media.set_volume(self.volume);
        media.set_muted(self.muted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(volume: f64) -> VolumeController {
        VolumeController::new(volume, 0.5)
    }

    #[test]
    fn test_set_volume_derives_mute() {
        let mut v = controller(1.0);
        v.set_volume(0.0);
        assert!(v.muted());
        v.set_volume(0.4);
        assert!(!v.muted());
        assert_eq!(v.volume(), 0.4);
    }

    #[test]
    fn test_set_volume_clamps() {
        let mut v = controller(1.0);
        v.set_volume(1.7);
        assert_eq!(v.volume(), 1.0);
        v.set_volume(-0.2);
        assert_eq!(v.volume(), 0.0);
        assert!(v.muted());
    }

    #[test]
    fn test_mute_roundtrip_keeps_level() {
        let mut v = controller(0.3);
        v.toggle_mute();
        assert!(v.muted());
        assert_eq!(v.effective(), 0.0);
        assert_eq!(v.volume(), 0.3);
        v.toggle_mute();
        assert!(!v.muted());
        assert_eq!(v.volume(), 0.3);
    }

    #[test]
    fn test_unmute_from_zero_restores_default() {
        let mut v = controller(0.0);
        assert!(v.muted());
        v.toggle_mute();
        assert!(!v.muted());
        assert_eq!(v.volume(), 0.5);
    }

    #[test]
    fn test_adjust_steps() {
        let mut v = controller(0.95);
        v.adjust(0.1);
        assert_eq!(v.volume(), 1.0);
        v.set_volume(0.05);
        v.adjust(-0.1);
        assert_eq!(v.volume(), 0.0);
        assert!(v.muted());
    }

    #[test]
    fn test_repeated_steps_reach_silence() {
        let mut v = controller(1.0);
        for _ in 0..10 {
            v.adjust(-0.1);
        }
        assert_eq!(v.volume(), 0.0);
        assert!(v.muted());

        for _ in 0..3 {
            v.adjust(0.1);
        }
        assert_eq!(v.volume(), 0.3);
        assert!(!v.muted());
    }

    #[test]
    fn test_force_mute_keeps_level() {
        let mut v = controller(0.8);
        v.force_mute();
        assert!(v.muted());
        assert_eq!(v.volume(), 0.8);
    }
}
