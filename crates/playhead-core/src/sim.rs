//! Deterministic in-memory media resource
//!
//! `SimulatedResource` behaves like a browser video element closely enough to
//! drive the engine headlessly: commands update its state and queue the same
//! lifecycle events a real element would dispatch. Handles are cheap clones
//! sharing one state, so a test or driver can keep a handle after giving one
//! to the engine.

use crate::{
    media::{FullscreenHost, MediaEvent, MediaResource},
    types::{BufferedRange, ReadyState},
    Error, Result,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// How the simulated platform treats play requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayPolicy {
    /// Every play request succeeds
    #[default]
    Allow,
    /// Only muted playback may start
    MutedOnly,
    /// Every play request is rejected
    Block,
}

#[derive(Debug, Default)]
struct SimState {
    src: Option<String>,
    poster: Option<String>,
    load_count: u32,
    play_calls: u32,
    seeks: Vec<f64>,
    paused: bool,
    current_time: f64,
    duration: Option<f64>,
    buffered: Vec<BufferedRange>,
    volume: f64,
    muted: bool,
    ready: ReadyState,
    policy: AutoplayPolicy,
    deferred_rejection: bool,
    released: bool,
    events: VecDeque<MediaEvent>,
}

impl SimState {
    fn emit(&mut self, event: MediaEvent) {
        self.events.push_back(event);
    }

    fn play_allowed(&self) -> bool {
        match self.policy {
            AutoplayPolicy::Allow => true,
            AutoplayPolicy::MutedOnly => self.muted,
            AutoplayPolicy::Block => false,
        }
    }
}

/// Simulated media element
#[derive(Debug, Clone)]
pub struct SimulatedResource {
    inner: Rc<RefCell<SimState>>,
}

impl Default for SimulatedResource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedResource {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimState {
                paused: true,
                volume: 1.0,
                ..Default::default()
            })),
        }
    }

    pub fn with_policy(self, policy: AutoplayPolicy) -> Self {
        self.inner.borrow_mut().policy = policy;
        self
    }

    /// Report rejections through [`MediaEvent::PlayRejected`] instead of an
    /// immediate error, like a rejected promise
    pub fn with_deferred_rejection(self) -> Self {
        self.inner.borrow_mut().deferred_rejection = true;
        self
    }

    pub fn set_policy(&self, policy: AutoplayPolicy) {
        self.inner.borrow_mut().policy = policy;
    }

    /// Metadata and first frame arrive for the current source
    pub fn finish_loading(&self, duration: f64) {
        let mut s = self.inner.borrow_mut();
        s.duration = Some(duration);
        s.ready = ReadyState::CanPlay;
        s.emit(MediaEvent::DurationChange);
        s.emit(MediaEvent::LoadedMetadata);
        s.emit(MediaEvent::LoadedData);
        s.emit(MediaEvent::CanPlay);
    }

    /// Advance the playhead by `secs` if playing
    pub fn advance(&self, secs: f64) {
        let mut s = self.inner.borrow_mut();
        if s.paused {
            return;
        }
        let end = s.duration.unwrap_or(f64::INFINITY);
        s.current_time = (s.current_time + secs).min(end);
        s.emit(MediaEvent::TimeUpdate);
        if s.current_time >= end {
            s.paused = true;
            s.emit(MediaEvent::Pause);
            s.emit(MediaEvent::Ended);
        }
    }

    /// Playback runs out of data
    pub fn stall(&self) {
        self.inner.borrow_mut().emit(MediaEvent::Waiting);
    }

    /// Data arrives again after a stall
    pub fn recover(&self) {
        let mut s = self.inner.borrow_mut();
        s.emit(MediaEvent::CanPlay);
        if !s.paused {
            s.emit(MediaEvent::Playing);
        }
    }

    pub fn set_buffered(&self, ranges: Vec<BufferedRange>) {
        let mut s = self.inner.borrow_mut();
        s.buffered = ranges;
        s.emit(MediaEvent::Progress);
    }

    pub fn src(&self) -> Option<String> {
        self.inner.borrow().src.clone()
    }

    pub fn poster(&self) -> Option<String> {
        self.inner.borrow().poster.clone()
    }

    pub fn load_count(&self) -> u32 {
        self.inner.borrow().load_count
    }

    pub fn play_calls(&self) -> u32 {
        self.inner.borrow().play_calls
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.inner.borrow().seeks.clone()
    }

    pub fn volume(&self) -> f64 {
        self.inner.borrow().volume
    }

    pub fn muted(&self) -> bool {
        self.inner.borrow().muted
    }

    pub fn is_released(&self) -> bool {
        self.inner.borrow().released
    }

    pub fn pending_events(&self) -> usize {
        self.inner.borrow().events.len()
    }
}

impl MediaResource for SimulatedResource {
    fn load(&mut self, url: &str) {
        let mut s = self.inner.borrow_mut();
        s.src = Some(url.to_string());
        s.load_count += 1;
        s.ready = ReadyState::Nothing;
        s.current_time = 0.0;
        s.duration = None;
        s.buffered.clear();
        // Events still queued for the previous source are dropped
        s.events.clear();
        s.emit(MediaEvent::Emptied);
        if !s.paused {
            s.paused = true;
            s.emit(MediaEvent::Pause);
        }
    }

    fn set_poster(&mut self, url: &str) {
        self.inner.borrow_mut().poster = Some(url.to_string());
    }

    fn play(&mut self) -> Result<()> {
        let mut s = self.inner.borrow_mut();
        s.play_calls += 1;
        if !s.play_allowed() {
            if s.deferred_rejection {
                s.emit(MediaEvent::PlayRejected);
                return Ok(());
            }
            return Err(Error::PlayRejected(format!("{:?} policy", s.policy)));
        }
        if s.paused {
            s.paused = false;
            s.emit(MediaEvent::Play);
            if s.ready >= ReadyState::CanPlay {
                s.emit(MediaEvent::Playing);
            } else {
                s.emit(MediaEvent::Waiting);
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut s = self.inner.borrow_mut();
        if !s.paused {
            s.paused = true;
            s.emit(MediaEvent::Pause);
        }
    }

    fn seek(&mut self, time: f64) {
        let mut s = self.inner.borrow_mut();
        s.current_time = time;
        s.seeks.push(time);
        s.emit(MediaEvent::Seeked);
        s.emit(MediaEvent::TimeUpdate);
    }

    fn set_volume(&mut self, volume: f64) {
        let mut s = self.inner.borrow_mut();
        s.volume = volume;
        s.emit(MediaEvent::VolumeChange);
    }

    fn set_muted(&mut self, muted: bool) {
        let mut s = self.inner.borrow_mut();
        s.muted = muted;
        s.emit(MediaEvent::VolumeChange);
    }

    fn paused(&self) -> bool {
        self.inner.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.inner.borrow().current_time
    }

    fn duration(&self) -> Option<f64> {
        self.inner.borrow().duration
    }

    fn buffered(&self) -> Vec<BufferedRange> {
        self.inner.borrow().buffered.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.inner.borrow().ready
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.inner.borrow_mut().events.pop_front()
    }

    fn release(&mut self) {
        let mut s = self.inner.borrow_mut();
        s.released = true;
        s.events.clear();
    }
}

#[derive(Debug, Default)]
struct FullscreenState {
    fullscreen: bool,
    reject: bool,
    requests: u32,
    released: bool,
}

/// Simulated fullscreen container.
///
/// Requests flip the platform flag but the engine only learns about it once
/// the driver forwards the change with `handle_fullscreen_change`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFullscreen {
    inner: Rc<RefCell<FullscreenState>>,
}

impl SimulatedFullscreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request, as a permission-denied platform would
    pub fn rejecting() -> Self {
        let host = Self::default();
        host.inner.borrow_mut().reject = true;
        host
    }

    /// Leave fullscreen from outside the controller (Escape key)
    pub fn exit_externally(&self) {
        self.inner.borrow_mut().fullscreen = false;
    }

    pub fn requests(&self) -> u32 {
        self.inner.borrow().requests
    }

    pub fn is_released(&self) -> bool {
        self.inner.borrow().released
    }
}

impl FullscreenHost for SimulatedFullscreen {
    fn is_fullscreen(&self) -> bool {
        self.inner.borrow().fullscreen
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        let mut s = self.inner.borrow_mut();
        s.requests += 1;
        if s.reject {
            return Err(Error::FullscreenRejected("permission denied".into()));
        }
        s.fullscreen = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        let mut s = self.inner.borrow_mut();
        s.requests += 1;
        s.fullscreen = false;
        Ok(())
    }

    fn release(&mut self) {
        self.inner.borrow_mut().released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_queues_events() {
        let mut sim = SimulatedResource::new();
        sim.load("a.mp4");
        sim.finish_loading(10.0);
        while sim.poll_event().is_some() {}

        sim.play().unwrap();
        assert!(!sim.paused());
        assert_eq!(sim.poll_event(), Some(MediaEvent::Play));
        assert_eq!(sim.poll_event(), Some(MediaEvent::Playing));
        assert_eq!(sim.poll_event(), None);
    }

    #[test]
    fn test_load_drops_events_of_previous_source() {
        let mut sim = SimulatedResource::new();
        sim.load("a.mp4");
        sim.finish_loading(10.0);
        sim.load("b.mp4");
        assert_eq!(sim.ready_state(), ReadyState::Nothing);
        assert_eq!(sim.poll_event(), Some(MediaEvent::Emptied));
        assert_eq!(sim.poll_event(), None);
    }

    #[test]
    fn test_muted_only_policy() {
        let mut sim = SimulatedResource::new().with_policy(AutoplayPolicy::MutedOnly);
        assert!(matches!(sim.play(), Err(Error::PlayRejected(_))));
        sim.set_muted(true);
        assert!(sim.play().is_ok());
        assert_eq!(sim.play_calls(), 2);
    }

    #[test]
    fn test_advance_to_end() {
        let mut sim = SimulatedResource::new();
        sim.finish_loading(2.0);
        sim.play().unwrap();
        sim.advance(5.0);
        assert_eq!(sim.current_time(), 2.0);
        assert!(sim.paused());
        let events: Vec<_> = std::iter::from_fn(|| sim.poll_event()).collect();
        assert_eq!(events.last(), Some(&MediaEvent::Ended));
    }
}
