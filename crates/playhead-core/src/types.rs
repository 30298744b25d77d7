//! Core types for Playhead

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quality level of a source rendition.
///
/// Variants are declared lowest first so the derived ordering matches
/// resolution: `Uhd4k > Qhd2k > Fhd1080 > Hd720 > Sd480 > Sd360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityLevel {
    #[serde(rename = "360p")]
    Sd360,
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Fhd1080,
    #[serde(rename = "2k")]
    Qhd2k,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl QualityLevel {
    /// All levels, highest first (default selection priority)
    pub const PRIORITY: [QualityLevel; 6] = [
        QualityLevel::Uhd4k,
        QualityLevel::Qhd2k,
        QualityLevel::Fhd1080,
        QualityLevel::Hd720,
        QualityLevel::Sd480,
        QualityLevel::Sd360,
    ];

    /// Path segment / label used by storage URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Sd360 => "360p",
            QualityLevel::Sd480 => "480p",
            QualityLevel::Hd720 => "720p",
            QualityLevel::Fhd1080 => "1080p",
            QualityLevel::Qhd2k => "2k",
            QualityLevel::Uhd4k => "4k",
        }
    }
}

impl Default for QualityLevel {
    fn default() -> Self {
        QualityLevel::Hd720
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        QualityLevel::PRIORITY
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| Error::UnknownQuality(s.to_string()))
    }
}

/// The subset of quality levels a given source is available in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<QualityLevel>", into = "Vec<QualityLevel>")]
pub struct QualitySet {
    /// Sorted highest first, no duplicates, never empty
    levels: Vec<QualityLevel>,
}

impl QualitySet {
    /// Build a set from any collection of levels.
    ///
    /// An empty input falls back to a single 720p level.
    pub fn new(levels: impl IntoIterator<Item = QualityLevel>) -> Self {
        let mut levels: Vec<QualityLevel> = levels.into_iter().collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();
        if levels.is_empty() {
            levels.push(QualityLevel::default());
        }
        Self { levels }
    }

    /// Set containing exactly one level
    pub fn single(level: QualityLevel) -> Self {
        Self { levels: vec![level] }
    }

    /// Parse a comma separated list such as `"1080p,720p"`
    pub fn parse_list(list: &str) -> Result<Self> {
        let levels = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(QualityLevel::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(levels))
    }

    /// Highest available level in priority order
    pub fn default_level(&self) -> QualityLevel {
        self.levels[0]
    }

    pub fn contains(&self, level: QualityLevel) -> bool {
        self.levels.contains(&level)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// True when the source exists in more than one quality, which changes
    /// how its storage URL is built
    pub fn has_variants(&self) -> bool {
        self.levels.len() > 1
    }

    /// Levels, highest first
    pub fn iter(&self) -> impl Iterator<Item = QualityLevel> + '_ {
        self.levels.iter().copied()
    }
}

impl Default for QualitySet {
    fn default() -> Self {
        Self::single(QualityLevel::default())
    }
}

impl From<Vec<QualityLevel>> for QualitySet {
    fn from(levels: Vec<QualityLevel>) -> Self {
        Self::new(levels)
    }
}

impl From<QualitySet> for Vec<QualityLevel> {
    fn from(set: QualitySet) -> Self {
        set.levels
    }
}

/// Playback status derived from media lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// No source attached
    #[default]
    Idle,
    /// Source (or a new quality) is loading
    Loading,
    /// Content is playing
    Playing,
    /// Playback paused
    Paused,
    /// Playback stalled waiting for data
    Buffering,
    /// Playback reached the end
    Ended,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "idle"),
            PlaybackStatus::Loading => write!(f, "loading"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Buffering => write!(f, "buffering"),
            PlaybackStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Short-lived play/pause animation marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransientCue {
    #[default]
    None,
    Play,
    Pause,
}

/// How much of the resource is ready, collapsed from the platform's levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
    #[default]
    Nothing,
    Metadata,
    CanPlay,
}

impl ReadyState {
    /// Map an HTML media `readyState` value (0..=4)
    pub fn from_html(value: u16) -> Self {
        match value {
            0 => ReadyState::Nothing,
            1 | 2 => ReadyState::Metadata,
            _ => ReadyState::CanPlay,
        }
    }
}

/// One contiguous buffered interval, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferedRange {
    pub start: f64,
    pub end: f64,
}

impl BufferedRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Read-only snapshot of the controller, republished after every event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    /// Seconds, within `[0, duration]` once duration is known
    pub current_time: f64,
    /// Seconds, 0 while unknown
    pub duration: f64,
    /// Percentage of the timeline buffered, `[0, 100]`
    pub buffered_pct: f64,
    pub quality: QualityLevel,
    /// Stored level in `[0, 1]`; not forced to 0 by muting
    pub volume: f64,
    pub muted: bool,
    pub fullscreen: bool,
    pub theater: bool,
    pub controls_visible: bool,
    pub quality_menu_open: bool,
    pub transient_cue: TransientCue,
}

impl PlaybackState {
    /// Volume actually heard: 0 while muted
    pub fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Playhead position as a percentage of the duration
    pub fn progress_percent(&self) -> f64 {
        crate::progress::progress_percent(self.current_time, self.duration)
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            duration: 0.0,
            buffered_pct: 0.0,
            quality: QualityLevel::default(),
            volume: 1.0,
            muted: false,
            fullscreen: false,
            theater: false,
            controls_visible: true,
            quality_menu_open: false,
            transient_cue: TransientCue::None,
        }
    }
}

/// What to play: the initialization input of a controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    /// Storage path or absolute URL of the video file
    pub source_path: String,
    /// Storage path or absolute URL of the poster image
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub available_qualities: QualitySet,
    #[serde(default)]
    pub autoplay: bool,
}

impl MediaSource {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            poster_path: None,
            available_qualities: QualitySet::default(),
            autoplay: false,
        }
    }

    pub fn with_poster(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    pub fn with_qualities(mut self, qualities: QualitySet) -> Self {
        self.available_qualities = qualities;
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_ordering() {
        assert!(QualityLevel::Uhd4k > QualityLevel::Qhd2k);
        assert!(QualityLevel::Qhd2k > QualityLevel::Fhd1080);
        assert!(QualityLevel::Fhd1080 > QualityLevel::Hd720);
        assert!(QualityLevel::Sd480 > QualityLevel::Sd360);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("1080p".parse::<QualityLevel>().unwrap(), QualityLevel::Fhd1080);
        assert_eq!("4K".parse::<QualityLevel>().unwrap(), QualityLevel::Uhd4k);
        assert!(matches!(
            "8k".parse::<QualityLevel>(),
            Err(Error::UnknownQuality(_))
        ));
    }

    #[test]
    fn test_quality_set_default_is_highest() {
        let set = QualitySet::parse_list("480p,1080p,720p").unwrap();
        assert_eq!(set.default_level(), QualityLevel::Fhd1080);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![QualityLevel::Fhd1080, QualityLevel::Hd720, QualityLevel::Sd480]
        );
        assert!(set.has_variants());
    }

    #[test]
    fn test_quality_set_empty_falls_back() {
        let set = QualitySet::new(Vec::new());
        assert_eq!(set.len(), 1);
        assert_eq!(set.default_level(), QualityLevel::Hd720);
        assert!(!set.has_variants());
    }

    #[test]
    fn test_ready_state_from_html() {
        assert_eq!(ReadyState::from_html(0), ReadyState::Nothing);
        assert_eq!(ReadyState::from_html(2), ReadyState::Metadata);
        assert_eq!(ReadyState::from_html(3), ReadyState::CanPlay);
        assert_eq!(ReadyState::from_html(4), ReadyState::CanPlay);
    }

    #[test]
    fn test_effective_volume() {
        let mut state = PlaybackState {
            volume: 0.3,
            ..Default::default()
        };
        assert_eq!(state.effective_volume(), 0.3);
        state.muted = true;
        assert_eq!(state.effective_volume(), 0.0);
        assert_eq!(state.volume, 0.3);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_string(&PlaybackState::default()).unwrap();
        assert!(json.contains("\"controlsVisible\":true"));
        assert!(json.contains("\"quality\":\"720p\""));
        assert!(json.contains("\"status\":\"idle\""));
    }
}
