//! Single cancellable deadline
//!
//! The controller never blocks or spawns: a scheduled callback is a stored
//! deadline that the host fires through `PlaybackEngine::poll_timers`.
//! Scheduling again replaces the previous deadline, so at most one handle per
//! slot is ever outstanding.

use std::time::Duration;

/// Identifies one scheduling of a slot; stale ids never match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

#[derive(Debug, Default)]
pub struct TimerSlot {
    deadline: Option<(TimerId, Duration)>,
    next_id: u64,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot to fire `delay` after `now`, cancelling any earlier arm
    pub fn schedule(&mut self, now: Duration, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.deadline = Some((id, now + delay));
        id
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(|(_, at)| at)
    }

    /// Disarm and return true if the deadline has been reached
    pub fn fire_if_due(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some((_, at)) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines
pub(crate) fn earliest(deadlines: impl IntoIterator<Item = Option<Duration>>) -> Option<Duration> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_fires_at_deadline() {
        let mut slot = TimerSlot::new();
        slot.schedule(ms(100), ms(400));
        assert!(!slot.fire_if_due(ms(499)));
        assert!(slot.fire_if_due(ms(500)));
        assert!(!slot.is_armed());
        assert!(!slot.fire_if_due(ms(600)));
    }

    #[test]
    fn test_reschedule_replaces() {
        let mut slot = TimerSlot::new();
        let first = slot.schedule(ms(0), ms(3000));
        let second = slot.schedule(ms(1000), ms(3000));
        assert_ne!(first, second);
        assert_eq!(slot.deadline(), Some(ms(4000)));
        assert!(!slot.fire_if_due(ms(3000)));
        assert!(slot.fire_if_due(ms(4000)));
    }

    #[test]
    fn test_cancel() {
        let mut slot = TimerSlot::new();
        slot.schedule(ms(0), ms(10));
        slot.cancel();
        assert!(!slot.fire_if_due(ms(100)));
        assert_eq!(earliest([None, Some(ms(5)), Some(ms(3))]), Some(ms(3)));
    }
}
