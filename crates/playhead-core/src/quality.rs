//! Quality switch coordinator
//!
//! Swapping the source URL resets the media resource, so a switch records the
//! playhead and play/pause status, loads the new URL, and restores both once
//! the resource reports data ready. The restore step is a one-shot
//! continuation identified by a [`SwitchToken`]: a newer switch replaces it
//! and the older token can never run.

use crate::{
    locator::AssetLocator,
    media::MediaResource,
    timer::TimerSlot,
    types::{QualityLevel, QualitySet, ReadyState},
    Error, Result,
};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Identity of one requested switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchToken(u64);

impl std::fmt::Display for SwitchToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "switch#{}", self.0)
    }
}

/// Continuation armed by a switch, run on the next data-ready event
#[derive(Debug, Clone, Copy)]
struct PendingSwitch {
    token: SwitchToken,
    target: QualityLevel,
    saved_time: f64,
    was_playing: bool,
}

/// What the continuation did when it ran
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchCompletion {
    pub token: SwitchToken,
    pub target: QualityLevel,
    pub restored_time: f64,
    /// Playback was running before the switch
    pub was_playing: bool,
    /// Playback was running and the resume request was accepted
    pub resumed: bool,
}

#[derive(Debug)]
pub struct QualitySwitchCoordinator {
    available: QualitySet,
    current: QualityLevel,
    pending: Option<PendingSwitch>,
    next_token: u64,
    timeout: Option<Duration>,
    watchdog: TimerSlot,
}

impl QualitySwitchCoordinator {
    /// Start at the highest available level
    pub fn new(available: QualitySet, timeout: Option<Duration>) -> Self {
        Self {
            current: available.default_level(),
            available,
            pending: None,
            next_token: 0,
            timeout,
            watchdog: TimerSlot::new(),
        }
    }

    pub fn current(&self) -> QualityLevel {
        self.current
    }

    pub fn available(&self) -> &QualitySet {
        &self.available
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<SwitchToken> {
        self.pending.map(|p| p.token)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.watchdog.deadline()
    }

    /// URL of `source_path` at the current level
    pub fn source_url(&self, locator: &dyn AssetLocator, source_path: &str) -> Result<String> {
        let quality = self.available.has_variants().then_some(self.current);
        Ok(locator.video_url(source_path, quality)?.to_string())
    }

    /// Switch the resource to `target`.
    ///
    /// Returns `Ok(None)` when `target` is already active. `current_time` and
    /// `was_playing` describe the playhead right now; a switch that replaces a
    /// pending one keeps the pending one's saved values instead.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, media, locator))]
    pub fn switch_to(
        &mut self,
        target: QualityLevel,
        current_time: f64,
        was_playing: bool,
        media: &mut dyn MediaResource,
        locator: &dyn AssetLocator,
        source_path: &str,
        now: Duration,
    ) -> Result<Option<SwitchToken>> {
        if target == self.current {
            debug!(quality = %target, "Quality already active");
            return Ok(None);
        }
        if !self.available.contains(target) {
            return Err(Error::QualityUnavailable(target));
        }

        // Resolve first so a bad path leaves everything untouched
        let url = locator.video_url(source_path, Some(target))?;

        let (saved_time, was_playing) = match self.pending.take() {
            Some(stale) => {
                debug!(stale = %stale.token, target = %stale.target, "Pending switch superseded");
                (stale.saved_time, stale.was_playing)
            }
            None => (current_time, was_playing),
        };

        self.next_token += 1;
        let token = SwitchToken(self.next_token);
        self.pending = Some(PendingSwitch {
            token,
            target,
            saved_time,
            was_playing,
        });
        match self.timeout {
            Some(timeout) => {
                self.watchdog.schedule(now, timeout);
            }
            None => self.watchdog.cancel(),
        }

        info!(
            %token,
            from = %self.current,
            to = %target,
            saved_time,
            was_playing,
            "Switching quality"
        );
        self.current = target;
        media.load(url.as_str());

        Ok(Some(token))
    }

    /// Run the pending continuation, if any, on a data-ready event.
    ///
    /// A data-ready that reaches us while the resource holds no data belongs
    /// to a source replaced since it was dispatched; the continuation stays
    /// armed for the current one.
    pub fn on_data_ready(&mut self, media: &mut dyn MediaResource) -> Option<SwitchCompletion> {
        let token = self.pending.as_ref()?.token;
        if media.ready_state() == ReadyState::Nothing {
            debug!(%token, "Data-ready from a replaced source ignored");
            return None;
        }
        let pending = self.pending.take()?;
        self.watchdog.cancel();

        media.seek(pending.saved_time);
        let resumed = if pending.was_playing {
            match media.play() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, token = %pending.token, "Failed to resume playback after quality switch");
                    false
                }
            }
        } else {
            false
        };

        debug!(token = %pending.token, time = pending.saved_time, resumed, "Quality switch completed");
        Some(SwitchCompletion {
            token: pending.token,
            target: pending.target,
            restored_time: pending.saved_time,
            was_playing: pending.was_playing,
            resumed,
        })
    }

    /// Fire the watchdog if due; drops the pending continuation on expiry
    pub fn poll(&mut self, now: Duration) -> Option<SwitchToken> {
        if !self.watchdog.fire_if_due(now) {
            return None;
        }
        let stale = self.pending.take()?;
        warn!(token = %stale.token, target = %stale.target, "Quality switch timed out");
        Some(stale.token)
    }

    /// Teardown: drop any in-flight continuation
    pub fn cancel(&mut self) {
        if let Some(stale) = self.pending.take() {
            debug!(token = %stale.token, "Pending switch cancelled");
        }
        self.watchdog.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{locator::StorageLocator, sim::SimulatedResource};

    fn setup() -> (QualitySwitchCoordinator, SimulatedResource, StorageLocator) {
        let set = QualitySet::parse_list("1080p,720p,480p").unwrap();
        (
            QualitySwitchCoordinator::new(set, None),
            SimulatedResource::new(),
            StorageLocator::new("https://cdn.example.com/storage").unwrap(),
        )
    }

    #[test]
    fn test_same_quality_is_noop() {
        let (mut q, mut sim, loc) = setup();
        let token = q
            .switch_to(QualityLevel::Fhd1080, 10.0, true, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap();
        assert!(token.is_none());
        assert_eq!(sim.load_count(), 0);
    }

    #[test]
    fn test_unavailable_quality_rejected() {
        let (mut q, mut sim, loc) = setup();
        let err = q
            .switch_to(QualityLevel::Uhd4k, 0.0, false, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, Error::QualityUnavailable(QualityLevel::Uhd4k)));
        assert_eq!(q.current(), QualityLevel::Fhd1080);
    }

    #[test]
    fn test_continuation_runs_once() {
        let (mut q, mut sim, loc) = setup();
        q.switch_to(QualityLevel::Hd720, 45.0, true, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap();
        assert_eq!(
            sim.src().as_deref(),
            Some("https://cdn.example.com/storage/content/videos/720p/a.mp4")
        );

        sim.finish_loading(120.0);
        let done = q.on_data_ready(&mut sim).unwrap();
        assert_eq!(done.restored_time, 45.0);
        assert!(done.resumed);
        assert!(q.on_data_ready(&mut sim).is_none());
        assert_eq!(sim.seeks(), vec![45.0]);
    }

    #[test]
    fn test_superseding_switch_inherits_saved_state() {
        let (mut q, mut sim, loc) = setup();
        let first = q
            .switch_to(QualityLevel::Hd720, 30.0, true, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap()
            .unwrap();
        let second = q
            .switch_to(QualityLevel::Sd480, 0.0, false, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(q.pending_token(), Some(second));

        sim.finish_loading(120.0);
        let done = q.on_data_ready(&mut sim).unwrap();
        assert_eq!(done.token, second);
        assert_eq!(done.target, QualityLevel::Sd480);
        assert_eq!(done.restored_time, 30.0);
        assert!(done.was_playing);
    }

    #[test]
    fn test_data_ready_before_new_source_loads_is_ignored() {
        let (mut q, mut sim, loc) = setup();
        let token = q
            .switch_to(QualityLevel::Hd720, 45.0, true, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap()
            .unwrap();
        assert!(q.on_data_ready(&mut sim).is_none());
        assert_eq!(q.pending_token(), Some(token));
        assert!(sim.seeks().is_empty());

        sim.finish_loading(120.0);
        assert_eq!(q.on_data_ready(&mut sim).unwrap().token, token);
    }

    #[test]
    fn test_watchdog_drops_pending() {
        let set = QualitySet::parse_list("1080p,720p").unwrap();
        let mut q = QualitySwitchCoordinator::new(set, Some(Duration::from_secs(10)));
        let mut sim = SimulatedResource::new();
        let loc = StorageLocator::new("https://cdn.example.com/storage").unwrap();
        q.switch_to(QualityLevel::Hd720, 5.0, false, &mut sim, &loc, "a.mp4", Duration::ZERO)
            .unwrap();

        assert!(q.poll(Duration::from_secs(9)).is_none());
        assert!(q.poll(Duration::from_secs(10)).is_some());
        assert!(!q.is_pending());
        assert!(q.on_data_ready(&mut sim).is_none());
    }
}
