//! Playback engine - the aggregating state machine
//!
//! Coordinates:
//! - Media lifecycle events (play, pause, waiting, data ready, ...)
//! - User commands (keyboard, pointer, control buttons)
//! - Platform presentation changes (fullscreen entered or left externally)
//! - Timer firings (auto-hide, play/pause cue, switch watchdog)
//!
//! Every transition runs to completion on the caller's thread. Time is passed
//! in by the host as a monotonic `Duration`; nothing here reads a clock.

use crate::{
    config::PlayerConfig,
    keyboard::{ControlAction, KeyboardRouter},
    locator::AssetLocator,
    media::{FullscreenHost, MediaEvent, MediaResource},
    presentation::PresentationController,
    progress,
    quality::QualitySwitchCoordinator,
    timer::{self, TimerSlot},
    types::*,
    visibility::ControlsVisibility,
    volume::VolumeController,
    Result,
};
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

type TimeUpdateCallback = Box<dyn FnMut(f64, f64)>;
type EndedCallback = Box<dyn FnMut()>;

/// Optional observers invoked from inside event handling
#[derive(Default)]
pub struct PlaybackCallbacks {
    on_time_update: Option<TimeUpdateCallback>,
    on_ended: Option<EndedCallback>,
}

impl PlaybackCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `(current_time, duration)` on every time update
    pub fn on_time_update(mut self, f: impl FnMut(f64, f64) + 'static) -> Self {
        self.on_time_update = Some(Box::new(f));
        self
    }

    pub fn on_ended(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_ended = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for PlaybackCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCallbacks")
            .field("on_time_update", &self.on_time_update.is_some())
            .field("on_ended", &self.on_ended.is_some())
            .finish()
    }
}

/// Autoplay negotiation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Autoplay {
    Off,
    /// Waiting for enough data before the first attempt
    AwaitingCanPlay,
    /// A play request is outstanding
    Trying { muted: bool },
    /// Started, or blocked for good
    Settled,
}

/// Everything that exists only while a source is attached
struct Attachment {
    media: Box<dyn MediaResource>,
    locator: Box<dyn AssetLocator>,
    source: MediaSource,
    callbacks: PlaybackCallbacks,
    autoplay: Autoplay,
}

/// Playback controller for a single media resource
pub struct PlaybackEngine {
    config: PlayerConfig,
    attachment: Option<Attachment>,
    state: PlaybackState,
    volume: VolumeController,
    presentation: PresentationController,
    visibility: ControlsVisibility,
    quality: QualitySwitchCoordinator,
    keyboard: KeyboardRouter,
    cue_timer: TimerSlot,
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("attached", &self.attachment.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl PlaybackEngine {
    /// Create a detached engine
    pub fn new(config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            volume: VolumeController::new(
                config.initial_volume,
                config.default_unmute_volume,
            ),
            presentation: PresentationController::new(),
            visibility: ControlsVisibility::new(config.controls_hide_delay()),
            quality: QualitySwitchCoordinator::new(
                QualitySet::default(),
                config.quality_switch_timeout(),
            ),
            keyboard: KeyboardRouter::new(config.seek_step_secs, config.volume_step),
            cue_timer: TimerSlot::new(),
            state: PlaybackState::default(),
            attachment: None,
            config,
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current snapshot
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn available_qualities(&self) -> Option<&QualitySet> {
        self.attachment.as_ref().map(|_| self.quality.available())
    }

    pub fn keyboard(&self) -> &KeyboardRouter {
        &self.keyboard
    }

    /// Bind to a media resource and start loading `source`.
    ///
    /// Attaching over an existing attachment detaches it first. Fails, leaving
    /// the engine detached, only when the source URL cannot be resolved.
    #[instrument(skip_all, fields(source = %source.source_path, autoplay = source.autoplay))]
    pub fn attach(
        &mut self,
        mut media: Box<dyn MediaResource>,
        host: Box<dyn FullscreenHost>,
        locator: Box<dyn AssetLocator>,
        source: MediaSource,
        callbacks: PlaybackCallbacks,
    ) -> Result<()> {
        if self.attachment.is_some() {
            self.detach();
        }

        let quality = QualitySwitchCoordinator::new(
            source.available_qualities.clone(),
            self.config.quality_switch_timeout(),
        );
        let url = quality.source_url(locator.as_ref(), &source.source_path)?;

        if let Some(poster) = source.poster_path.as_deref() {
            match locator.poster_url(poster) {
                Ok(poster_url) => media.set_poster(poster_url.as_str()),
                Err(e) => warn!(error = %e, poster, "Poster path not resolvable"),
            }
        }

        self.volume.apply(media.as_mut());
        media.load(&url);

        self.quality = quality;
        self.presentation.attach(host);
        self.keyboard.attach();
        self.visibility.reset();
        self.cue_timer.cancel();
        self.state = PlaybackState {
            status: PlaybackStatus::Loading,
            ..PlaybackState::default()
        };

        let autoplay = if source.autoplay {
            Autoplay::AwaitingCanPlay
        } else {
            Autoplay::Off
        };
        info!(
            url = %url,
            quality = %self.quality.current(),
            qualities = self.quality.available().len(),
            "Attached"
        );
        let ready = media.ready_state();
        self.attachment = Some(Attachment {
            media,
            locator,
            source,
            callbacks,
            autoplay,
        });
        if autoplay == Autoplay::AwaitingCanPlay && ready >= ReadyState::CanPlay {
            self.attempt_autoplay();
        }

        self.sync();
        Ok(())
    }

    /// Release the resource and every timer and subscription tied to it
    pub fn detach(&mut self) {
        let Some(mut attachment) = self.attachment.take() else {
            return;
        };
        self.quality.cancel();
        self.visibility.reset();
        self.cue_timer.cancel();
        self.keyboard.detach();
        self.presentation.detach();
        attachment.media.release();
        self.state = PlaybackState::default();
        self.sync();
        info!(source = %attachment.source.source_path, "Detached");
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Apply a user action. Without an attached resource this does nothing.
    pub fn command(&mut self, action: ControlAction, now: Duration) -> Result<()> {
        match action {
            ControlAction::TogglePlay => self.toggle_play(now),
            ControlAction::Seek(time) => self.seek(time),
            ControlAction::SeekRelative(delta) => self.seek_relative(delta),
            ControlAction::SetQuality(quality) => return self.set_quality(quality, now),
            ControlAction::SetVolume(volume) => self.set_volume(volume),
            ControlAction::AdjustVolume(delta) => self.adjust_volume(delta),
            ControlAction::ToggleMute => self.toggle_mute(),
            ControlAction::ToggleFullscreen => self.toggle_fullscreen(),
            ControlAction::ToggleTheater => self.toggle_theater(),
        }
        Ok(())
    }

    pub fn toggle_play(&mut self, now: Duration) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        if self.quality.is_pending() {
            debug!("Toggle ignored during quality switch");
            return;
        }
        let cue = if att.media.paused() {
            if let Err(e) = att.media.play() {
                debug!(error = %e, "Play request rejected");
            }
            TransientCue::Play
        } else {
            att.media.pause();
            TransientCue::Pause
        };
        self.state.transient_cue = cue;
        self.cue_timer.schedule(now, self.config.cue_duration());
        self.sync();
    }

    /// Seek to `time`, clamped to the known duration. The snapshot moves
    /// immediately rather than waiting for the resource's time update.
    pub fn seek(&mut self, time: f64) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        if time.is_nan() {
            return;
        }
        if self.quality.is_pending() {
            debug!(time, "Seek ignored during quality switch");
            return;
        }
        let target = if self.state.duration > 0.0 {
            time.clamp(0.0, self.state.duration)
        } else {
            time.max(0.0)
        };
        att.media.seek(target);
        self.state.current_time = target;
        debug!(target, "Seek");
        self.sync();
    }

    pub fn seek_relative(&mut self, delta: f64) {
        self.seek(self.state.current_time + delta);
    }

    /// Seek to where the progress track was clicked
    pub fn seek_to_position(&mut self, click_x: f64, track_left: f64, track_width: f64) {
        let time = progress::position_to_time(click_x, track_left, track_width, self.state.duration);
        self.seek(time);
    }

    /// Switch the source to another quality, keeping the playhead and
    /// play/pause status once the new source is ready. A resource that is
    /// not paused counts as playing, buffering included.
    pub fn set_quality(&mut self, quality: QualityLevel, now: Duration) -> Result<()> {
        let Some(att) = self.attachment.as_mut() else {
            return Ok(());
        };
        self.visibility.close_quality_menu();
        let was_playing = !att.media.paused();
        let result = self.quality.switch_to(
            quality,
            self.state.current_time,
            was_playing,
            att.media.as_mut(),
            att.locator.as_ref(),
            &att.source.source_path,
            now,
        );
        if let Ok(Some(_)) = result {
            self.set_status(PlaybackStatus::Loading);
        }
        self.sync();
        result.map(|_| ())
    }

    pub fn set_volume(&mut self, volume: f64) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        self.volume.set_volume(volume);
        self.volume.apply(att.media.as_mut());
        self.sync();
    }

    pub fn adjust_volume(&mut self, delta: f64) {
        self.set_volume(self.volume.volume() + delta);
    }

    pub fn toggle_mute(&mut self) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        self.volume.toggle_mute();
        self.volume.apply(att.media.as_mut());
        self.sync();
    }

    pub fn toggle_fullscreen(&mut self) {
        if self.attachment.is_none() {
            return;
        }
        self.presentation.toggle_fullscreen();
        self.sync();
    }

    pub fn toggle_theater(&mut self) {
        if self.attachment.is_none() {
            return;
        }
        self.presentation.toggle_theater();
        self.sync();
    }

    // =========================================================================
    // Pointer and keyboard input
    // =========================================================================

    pub fn pointer_activity(&mut self, now: Duration) {
        if self.attachment.is_none() {
            return;
        }
        self.visibility.on_activity(now);
        self.sync();
    }

    pub fn pointer_leave(&mut self) {
        if self.attachment.is_none() {
            return;
        }
        self.visibility.on_leave(self.state.status);
        self.sync();
    }

    pub fn toggle_quality_menu(&mut self) {
        if self.attachment.is_none() {
            return;
        }
        self.visibility.toggle_quality_menu();
        self.sync();
    }

    pub fn close_quality_menu(&mut self) {
        if self.attachment.is_none() {
            return;
        }
        self.visibility.close_quality_menu();
        self.sync();
    }

    /// Route a key press; returns true when the key was consumed
    pub fn handle_key(&mut self, key: &str, has_text_focus: bool, now: Duration) -> bool {
        let Some(action) = self.keyboard.handle_key(key, has_text_focus) else {
            return false;
        };
        if let Err(e) = self.command(action, now) {
            warn!(error = %e, key, "Key command failed");
        }
        true
    }

    // =========================================================================
    // Platform notifications
    // =========================================================================

    /// Fullscreen-change notification from the platform
    pub fn handle_fullscreen_change(&mut self, fullscreen: bool) {
        self.presentation.on_fullscreen_change(fullscreen);
        self.sync();
    }

    /// Drain and apply every event queued on the resource
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self
            .attachment
            .as_mut()
            .and_then(|att| att.media.poll_event())
        {
            self.handle_media_event(event);
            handled += 1;
        }
        handled
    }

    /// Apply one media lifecycle event
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        let switching = self.quality.is_pending();
        trace!(%event, switching, "Media event");

        match event {
            MediaEvent::Play | MediaEvent::Playing => {
                if let Autoplay::Trying { .. } = att.autoplay {
                    att.autoplay = Autoplay::Settled;
                }
                if !switching {
                    self.set_status(PlaybackStatus::Playing);
                }
            }
            MediaEvent::Pause => {
                if !switching && self.state.status != PlaybackStatus::Ended {
                    self.set_status(PlaybackStatus::Paused);
                }
            }
            MediaEvent::Waiting => {
                if !switching {
                    self.set_status(PlaybackStatus::Buffering);
                }
            }
            MediaEvent::Stalled => {
                if !switching && self.state.status == PlaybackStatus::Playing {
                    self.set_status(PlaybackStatus::Buffering);
                }
            }
            MediaEvent::CanPlay => {
                let awaiting_autoplay = att.autoplay == Autoplay::AwaitingCanPlay;
                if !switching && self.state.status == PlaybackStatus::Buffering {
                    let next = if att.media.paused() {
                        PlaybackStatus::Paused
                    } else {
                        PlaybackStatus::Playing
                    };
                    self.set_status(next);
                }
                if awaiting_autoplay {
                    self.attempt_autoplay();
                }
            }
            MediaEvent::TimeUpdate => {
                if !switching {
                    let mut time = att.media.current_time().max(0.0);
                    if self.state.duration > 0.0 {
                        time = time.min(self.state.duration);
                    }
                    self.state.current_time = time;
                    if let Some(cb) = att.callbacks.on_time_update.as_mut() {
                        cb(time, self.state.duration);
                    }
                }
            }
            MediaEvent::DurationChange | MediaEvent::LoadedMetadata => {
                if let Some(duration) = att.media.duration().filter(|d| d.is_finite() && *d >= 0.0) {
                    self.state.duration = duration;
                    self.state.current_time = self.state.current_time.min(duration);
                }
                if !switching && self.state.status == PlaybackStatus::Loading {
                    let next = if att.media.paused() {
                        PlaybackStatus::Paused
                    } else {
                        PlaybackStatus::Playing
                    };
                    self.set_status(next);
                }
            }
            MediaEvent::LoadedData => {
                if let Some(done) = self.quality.on_data_ready(att.media.as_mut()) {
                    self.state.current_time = done.restored_time;
                    let next = if done.resumed {
                        PlaybackStatus::Playing
                    } else {
                        PlaybackStatus::Paused
                    };
                    self.set_status(next);
                }
            }
            MediaEvent::Progress => {
                let duration = att
                    .media
                    .duration()
                    .or((self.state.duration > 0.0).then_some(self.state.duration));
                self.state.buffered_pct = progress::buffered_percent(&att.media.buffered(), duration);
            }
            MediaEvent::Ended => {
                if !switching {
                    if let Some(cb) = att.callbacks.on_ended.as_mut() {
                        cb();
                    }
                    self.set_status(PlaybackStatus::Ended);
                }
            }
            MediaEvent::PlayRejected => self.on_play_rejected(),
            MediaEvent::Seeked | MediaEvent::VolumeChange | MediaEvent::Emptied => {}
        }
        self.sync();
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Fire every timer whose deadline is at or before `now`
    pub fn poll_timers(&mut self, now: Duration) {
        if self.attachment.is_none() {
            return;
        }
        if self.cue_timer.fire_if_due(now) {
            self.state.transient_cue = TransientCue::None;
        }
        if self.visibility.poll(now, self.state.status) {
            debug!("Controls hidden after inactivity");
        }
        if self.quality.poll(now).is_some() {
            self.set_status(PlaybackStatus::Paused);
        }
        self.sync();
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        if self.attachment.is_none() {
            return None;
        }
        timer::earliest([
            self.cue_timer.deadline(),
            self.visibility.deadline(),
            self.quality.deadline(),
        ])
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn attempt_autoplay(&mut self) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        att.autoplay = Autoplay::Trying {
            muted: self.volume.muted(),
        };
        debug!(muted = self.volume.muted(), "Attempting autoplay");
        if let Err(e) = att.media.play() {
            debug!(error = %e, "Autoplay rejected");
            self.on_play_rejected();
        }
    }

    /// Autoplay negotiation: one muted retry, then give up quietly
    fn on_play_rejected(&mut self) {
        let Some(att) = self.attachment.as_mut() else {
            return;
        };
        match att.autoplay {
            Autoplay::Trying { muted: false } if self.config.autoplay_muted_retry => {
                self.volume.force_mute();
                self.volume.apply(att.media.as_mut());
                att.autoplay = Autoplay::Trying { muted: true };
                debug!("Retrying autoplay muted");
                if let Err(e) = att.media.play() {
                    debug!(error = %e, "Muted autoplay rejected; staying paused");
                    att.autoplay = Autoplay::Settled;
                }
            }
            Autoplay::Trying { .. } => {
                debug!("Autoplay blocked; staying paused");
                att.autoplay = Autoplay::Settled;
            }
            _ => debug!("Play request rejected"),
        }
        self.sync();
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.state.status != status {
            debug!(from = %self.state.status, to = %status, "Status transition");
            self.state.status = status;
        }
        self.visibility.reconcile(status);
    }

    /// Copy sub-controller state into the snapshot
    fn sync(&mut self) {
        self.visibility.reconcile(self.state.status);
        self.state.quality = self.quality.current();
        self.state.volume = self.volume.volume();
        self.state.muted = self.volume.muted();
        self.state.fullscreen = self.presentation.fullscreen();
        self.state.theater = self.presentation.theater();
        self.state.controls_visible = self.visibility.visible();
        self.state.quality_menu_open = self.visibility.quality_menu_open();
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.detach();
    }
}
