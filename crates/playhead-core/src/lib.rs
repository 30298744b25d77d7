//! Playhead Core - Interactive Media Playback Controller
//!
//! This crate owns a single playable media resource and reconciles it with
//! an asynchronous control surface:
//! - Play/pause, seeking, and progress-track mapping
//! - Volume and mute bookkeeping
//! - Per-quality source switching with playhead continuity
//! - Fullscreen (platform-owned) and theater presentation modes
//! - Auto-hiding controls and global keyboard shortcuts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Playhead Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Volume    │  │ Presentation │  │   Controls   │          │
//! │  │  Controller  │  │    Modes     │  │  Visibility  │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │                              │
//! │                    │   Engine    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │   Quality    │  │    Media    │  │   Keyboard   │           │
//! │  │    Switch    │  │  Resource   │  │    Router    │           │
//! │  └──────────────┘  └─────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use playhead_core::{
//!     MediaSource, PlaybackCallbacks, PlaybackEngine, PlayerConfig, QualitySet,
//!     SimulatedFullscreen, SimulatedResource, StorageLocator,
//! };
//!
//! let media = SimulatedResource::new();
//! let mut engine = PlaybackEngine::new(PlayerConfig::default()).unwrap();
//! engine
//!     .attach(
//!         Box::new(media.clone()),
//!         Box::new(SimulatedFullscreen::new()),
//!         Box::new(StorageLocator::new("https://cdn.example.com/storage").unwrap()),
//!         MediaSource::new("clip.mp4")
//!             .with_qualities(QualitySet::parse_list("1080p,720p").unwrap()),
//!         PlaybackCallbacks::new(),
//!     )
//!     .unwrap();
//!
//! media.finish_loading(120.0);
//! engine.pump();
//! assert_eq!(engine.state().duration, 120.0);
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod timer;
pub mod media;
pub mod sim;
pub mod locator;
pub mod volume;
pub mod presentation;
pub mod visibility;
pub mod quality;
pub mod keyboard;
pub mod progress;
pub mod engine;
#[cfg(feature = "runtime")]
pub mod session;

pub use error::{Error, Result};
pub use types::*;
pub use config::PlayerConfig;
pub use media::{FullscreenHost, MediaEvent, MediaResource, NoFullscreen};
pub use sim::{AutoplayPolicy, SimulatedFullscreen, SimulatedResource};
pub use locator::{AssetLocator, StorageLocator};
pub use volume::VolumeController;
pub use presentation::PresentationController;
pub use visibility::ControlsVisibility;
pub use quality::{QualitySwitchCoordinator, SwitchCompletion, SwitchToken};
pub use keyboard::{ControlAction, KeyboardRouter};
pub use progress::{format_duration, position_to_time};
pub use engine::{PlaybackCallbacks, PlaybackEngine};
#[cfg(feature = "runtime")]
pub use session::{PlayerSession, SessionHandle, SessionId, SessionInput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at host startup
pub fn init() {
    tracing::info!(version = VERSION, "Playhead Core initialized");
}
