//! Controls visibility: debounced auto-hide of the control surface

use crate::{timer::TimerSlot, types::PlaybackStatus};
use std::time::Duration;
use tracing::trace;

#[derive(Debug)]
pub struct ControlsVisibility {
    visible: bool,
    menu_open: bool,
    hide_delay: Duration,
    hide_timer: TimerSlot,
}

impl ControlsVisibility {
    pub fn new(hide_delay: Duration) -> Self {
        Self {
            visible: true,
            menu_open: false,
            hide_delay,
            hide_timer: TimerSlot::new(),
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn quality_menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.hide_timer.deadline()
    }

    /// Pointer moved: show controls and restart the hide countdown
    pub fn on_activity(&mut self, now: Duration) {
        self.visible = true;
        self.hide_timer.schedule(now, self.hide_delay);
        trace!(?now, "Controls activity");
    }

    /// Pointer left the player
    pub fn on_leave(&mut self, status: PlaybackStatus) {
        if status == PlaybackStatus::Playing {
            self.visible = false;
        }
        self.menu_open = false;
    }

    pub fn toggle_quality_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    pub fn close_quality_menu(&mut self) {
        self.menu_open = false;
    }

    /// Fire the hide timer if due. Expiry only hides while still playing.
    pub fn poll(&mut self, now: Duration, status: PlaybackStatus) -> bool {
        if self.hide_timer.fire_if_due(now) && status == PlaybackStatus::Playing {
            self.visible = false;
            return true;
        }
        false
    }

    /// Controls are always shown unless playing
    pub fn reconcile(&mut self, status: PlaybackStatus) {
        if status != PlaybackStatus::Playing {
            self.visible = true;
        }
    }

    /// Teardown: cancel the outstanding timer and reset
    pub fn reset(&mut self) {
        self.hide_timer.cancel();
        self.visible = true;
        self.menu_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_hides_after_delay_while_playing() {
        let mut c = ControlsVisibility::new(ms(3000));
        c.on_activity(ms(1000));
        assert!(!c.poll(ms(3999), PlaybackStatus::Playing));
        assert!(c.visible());
        assert!(c.poll(ms(4000), PlaybackStatus::Playing));
        assert!(!c.visible());
    }

    #[test]
    fn test_stale_timer_does_not_hide_when_paused() {
        let mut c = ControlsVisibility::new(ms(3000));
        c.on_activity(ms(0));
        assert!(!c.poll(ms(3000), PlaybackStatus::Paused));
        assert!(c.visible());
        assert!(c.deadline().is_none());
    }

    #[test]
    fn test_activity_debounces() {
        let mut c = ControlsVisibility::new(ms(3000));
        c.on_activity(ms(0));
        c.on_activity(ms(2000));
        assert!(!c.poll(ms(3000), PlaybackStatus::Playing));
        assert_eq!(c.deadline(), Some(ms(5000)));
    }

    #[test]
    fn test_leave_hides_and_closes_menu() {
        let mut c = ControlsVisibility::new(ms(3000));
        c.toggle_quality_menu();
        c.on_leave(PlaybackStatus::Paused);
        assert!(c.visible());
        assert!(!c.quality_menu_open());

        c.toggle_quality_menu();
        c.on_leave(PlaybackStatus::Playing);
        assert!(!c.visible());
        assert!(!c.quality_menu_open());
    }

    #[test]
    fn test_reset_cancels_timer() {
        let mut c = ControlsVisibility::new(ms(3000));
        c.on_activity(ms(0));
        c.reset();
        assert!(c.deadline().is_none());
        assert!(!c.poll(ms(10_000), PlaybackStatus::Playing));
    }
}
