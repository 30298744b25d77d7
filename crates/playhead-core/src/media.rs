//! Media resource adapter
//!
//! The engine talks to the platform through two narrow traits:
//! [`MediaResource`] wraps one playable handle (a video element or a native
//! pipeline) and [`FullscreenHost`] wraps the container that can enter
//! fullscreen. Both are driven from a single thread; implementations must not
//! call back into the engine from inside a command.

use crate::{
    types::{BufferedRange, ReadyState},
    Result,
};
use serde::{Deserialize, Serialize};

/// Lifecycle events emitted by a media resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    /// Playback was requested and accepted
    Play,
    /// Playback actually started or resumed after a stall
    Playing,
    Pause,
    /// Playhead moved; read `current_time()`
    TimeUpdate,
    /// Duration became known or changed; read `duration()`
    DurationChange,
    LoadedMetadata,
    /// First frame of the current source is available (data ready)
    LoadedData,
    /// Buffered ranges changed; read `buffered()`
    Progress,
    /// Playback stopped because the next frame is not available
    Waiting,
    /// Fetching stalled
    Stalled,
    /// Enough data to start playing
    CanPlay,
    Seeked,
    Ended,
    VolumeChange,
    /// Source was reset
    Emptied,
    /// A pending play request was rejected by platform policy
    PlayRejected,
}

impl MediaEvent {
    /// DOM event name
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::Play => "play",
            MediaEvent::Playing => "playing",
            MediaEvent::Pause => "pause",
            MediaEvent::TimeUpdate => "timeupdate",
            MediaEvent::DurationChange => "durationchange",
            MediaEvent::LoadedMetadata => "loadedmetadata",
            MediaEvent::LoadedData => "loadeddata",
            MediaEvent::Progress => "progress",
            MediaEvent::Waiting => "waiting",
            MediaEvent::Stalled => "stalled",
            MediaEvent::CanPlay => "canplay",
            MediaEvent::Seeked => "seeked",
            MediaEvent::Ended => "ended",
            MediaEvent::VolumeChange => "volumechange",
            MediaEvent::Emptied => "emptied",
            MediaEvent::PlayRejected => "playrejected",
        }
    }

    /// Events a platform element dispatches natively
    pub const DOM_EVENTS: [MediaEvent; 15] = [
        MediaEvent::Play,
        MediaEvent::Playing,
        MediaEvent::Pause,
        MediaEvent::TimeUpdate,
        MediaEvent::DurationChange,
        MediaEvent::LoadedMetadata,
        MediaEvent::LoadedData,
        MediaEvent::Progress,
        MediaEvent::Waiting,
        MediaEvent::Stalled,
        MediaEvent::CanPlay,
        MediaEvent::Seeked,
        MediaEvent::Ended,
        MediaEvent::VolumeChange,
        MediaEvent::Emptied,
    ];
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One playable handle
pub trait MediaResource {
    /// Replace the source URL and begin loading it
    fn load(&mut self, url: &str);

    /// Set the poster image shown before playback
    fn set_poster(&mut self, _url: &str) {}

    /// Request playback. An immediate policy rejection is returned as
    /// `Error::PlayRejected`; a deferred one arrives as
    /// [`MediaEvent::PlayRejected`].
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn seek(&mut self, time: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    fn paused(&self) -> bool;

    fn current_time(&self) -> f64;

    /// `None` while the duration is unknown
    fn duration(&self) -> Option<f64>;

    fn buffered(&self) -> Vec<BufferedRange>;

    fn ready_state(&self) -> ReadyState;

    /// Next queued lifecycle event, if any
    fn poll_event(&mut self) -> Option<MediaEvent> {
        None
    }

    /// Drop event subscriptions; called once when the controller detaches
    fn release(&mut self) {}
}

/// The container that can enter platform fullscreen.
///
/// Fullscreen can change outside the controller (Escape key, browser chrome),
/// so the engine only trusts the host's change notifications.
pub trait FullscreenHost {
    /// Whether the platform currently shows this container fullscreen
    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&mut self) -> Result<()>;

    fn exit_fullscreen(&mut self) -> Result<()>;

    /// Drop the change subscription; called once when the controller detaches
    fn release(&mut self) {}
}

/// Host for platforms without fullscreen support; every request is rejected
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFullscreen;

impl FullscreenHost for NoFullscreen {
    fn is_fullscreen(&self) -> bool {
        false
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        Err(crate::Error::FullscreenRejected("fullscreen unsupported".into()))
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        Ok(())
    }
}
