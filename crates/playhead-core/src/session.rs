//! Player session - async driver for a playback engine
//!
//! Coordinates:
//! - Input delivery over an mpsc channel
//! - Timer firing (sleeps until the engine's next deadline)
//! - Snapshot broadcasting over a watch channel
//! - Teardown when detached or when every handle is dropped
//!
//! The session runs on the task that awaits [`PlayerSession::run`]; it never
//! spawns, so non-`Send` media resources work on a current-thread runtime.

use crate::{
    engine::PlaybackEngine,
    keyboard::ControlAction,
    media::MediaEvent,
    types::PlaybackState,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Inputs buffered between a handle and its session
const INPUT_CAPACITY: usize = 64;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a host can tell a running session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Command(ControlAction),
    Key { key: String, has_text_focus: bool },
    /// Event delivered out-of-band by the host
    Media(MediaEvent),
    /// Drain events queued on the resource
    Poll,
    FullscreenChanged(bool),
    PointerActivity,
    PointerLeave,
    ToggleQualityMenu,
    CloseQualityMenu,
    SeekToPosition {
        click_x: f64,
        track_left: f64,
        track_width: f64,
    },
    Detach,
}

/// Sending half and snapshot view of a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::Sender<SessionInput>,
    state_rx: watch::Receiver<PlaybackState>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Deliver an input; fails once the session has ended
    pub async fn send(&self, input: SessionInput) -> Result<()> {
        self.tx.send(input).await.map_err(|_| Error::NotAttached)
    }

    pub async fn command(&self, action: ControlAction) -> Result<()> {
        self.send(SessionInput::Command(action)).await
    }

    /// Latest published snapshot
    pub fn state(&self) -> PlaybackState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_rx.clone()
    }

    pub async fn detach(&self) -> Result<()> {
        self.send(SessionInput::Detach).await
    }
}

/// Player session managing a single engine
pub struct PlayerSession {
    id: SessionId,
    engine: PlaybackEngine,
    inputs: mpsc::Receiver<SessionInput>,
    state_tx: watch::Sender<PlaybackState>,
    epoch: Instant,
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("id", &self.id)
            .field("engine", &self.engine)
            .finish()
    }
}

impl PlayerSession {
    /// Wrap an engine, usually already attached to a source
    pub fn new(engine: PlaybackEngine) -> (Self, SessionHandle) {
        let id = SessionId::new();
        let (tx, inputs) = mpsc::channel(INPUT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(engine.state().clone());
        let session = Self {
            id,
            engine,
            inputs,
            state_tx,
            epoch: Instant::now(),
        };
        let handle = SessionHandle { id, tx, state_rx };
        (session, handle)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Time since the session was created, as the engine's clock
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.engine.state().clone());
    }

    /// Process inputs and timers until detached or every handle is dropped.
    /// Returns the detached engine.
    pub async fn run(mut self) -> PlaybackEngine {
        info!(session_id = %self.id, "Session started");
        self.engine.pump();
        self.publish();

        loop {
            let deadline = self.engine.next_deadline().map(|d| self.epoch + d);
            tokio::select! {
                input = self.inputs.recv() => match input {
                    None | Some(SessionInput::Detach) => break,
                    Some(input) => self.apply(input),
                },
                _ = wait_until(deadline) => {
                    let now = self.now();
                    self.engine.poll_timers(now);
                }
            }
            self.engine.pump();
            self.publish();
        }

        self.engine.detach();
        self.publish();
        info!(session_id = %self.id, "Session ended");
        self.engine
    }

    fn apply(&mut self, input: SessionInput) {
        let now = self.now();
        debug!(?input, "Session input");
        match input {
            SessionInput::Command(action) => {
                if let Err(e) = self.engine.command(action, now) {
                    warn!(error = %e, code = e.error_code(), "Command failed");
                }
            }
            SessionInput::Key {
                key,
                has_text_focus,
            } => {
                self.engine.handle_key(&key, has_text_focus, now);
            }
            SessionInput::Media(event) => self.engine.handle_media_event(event),
            SessionInput::Poll => {}
            SessionInput::FullscreenChanged(fullscreen) => {
                self.engine.handle_fullscreen_change(fullscreen)
            }
            SessionInput::PointerActivity => self.engine.pointer_activity(now),
            SessionInput::PointerLeave => self.engine.pointer_leave(),
            SessionInput::ToggleQualityMenu => self.engine.toggle_quality_menu(),
            SessionInput::CloseQualityMenu => self.engine.close_quality_menu(),
            SessionInput::SeekToPosition {
                click_x,
                track_left,
                track_width,
            } => self.engine.seek_to_position(click_x, track_left, track_width),
            SessionInput::Detach => {}
        }
        // Inputs may land after a deadline passed while we were busy
        self.engine.poll_timers(now);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PlayerConfig,
        engine::PlaybackCallbacks,
        locator::StorageLocator,
        sim::{SimulatedFullscreen, SimulatedResource},
        types::{MediaSource, PlaybackStatus},
    };

    fn attached_engine(sim: &SimulatedResource) -> PlaybackEngine {
        let mut engine = PlaybackEngine::new(PlayerConfig::default()).unwrap();
        engine
            .attach(
                Box::new(sim.clone()),
                Box::new(SimulatedFullscreen::new()),
                Box::new(StorageLocator::new("https://cdn.example.com/storage").unwrap()),
                MediaSource::new("clip.mp4"),
                PlaybackCallbacks::new(),
            )
            .unwrap();
        sim.finish_loading(120.0);
        engine.pump();
        engine
    }

    #[tokio::test]
    async fn test_session_creation() {
        let sim = SimulatedResource::new();
        let (session, handle) = PlayerSession::new(attached_engine(&sim));
        assert_eq!(session.id(), handle.id());
        assert_eq!(handle.state().status, PlaybackStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_hide_after_delay() {
        let sim = SimulatedResource::new();
        let (session, handle) = PlayerSession::new(attached_engine(&sim));

        let driver = async {
            handle.command(ControlAction::TogglePlay).await.unwrap();
            handle.send(SessionInput::PointerActivity).await.unwrap();
            let started = Instant::now();

            let mut rx = handle.subscribe();
            rx.wait_for(|s| s.is_playing()).await.unwrap();
            rx.wait_for(|s| !s.controls_visible).await.unwrap();

            let elapsed = started.elapsed();
            assert!(elapsed >= Duration::from_millis(3000), "{:?}", elapsed);
            assert!(elapsed < Duration::from_millis(3010), "{:?}", elapsed);
            handle.detach().await.unwrap();
        };

        let (engine, ()) = tokio::join!(session.run(), driver);
        assert!(!engine.is_attached());
        assert!(sim.is_released());
    }

    #[tokio::test]
    async fn test_dropping_handles_ends_session() {
        let sim = SimulatedResource::new();
        let (session, handle) = PlayerSession::new(attached_engine(&sim));
        let mut rx = handle.subscribe();
        drop(handle);

        let engine = session.run().await;
        assert!(!engine.is_attached());
        assert_eq!(rx.borrow_and_update().status, PlaybackStatus::Idle);
        assert!(sim.is_released());
    }
}
