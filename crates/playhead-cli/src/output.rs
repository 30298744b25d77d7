//! Output formatting for CLI

use console::style;
use playhead_core::{format_duration, PlaybackState, PlaybackStatus, TransientCue};
use serde::Serialize;
use std::time::Duration;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// One JSON line per published snapshot
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotLine<'a> {
    elapsed_ms: u128,
    trigger: &'a str,
    state: &'a PlaybackState,
}

pub fn snapshot(format: OutputFormat, elapsed: Duration, trigger: &str, state: &PlaybackState) -> String {
    match format {
        OutputFormat::Json => {
            let line = SnapshotLine {
                elapsed_ms: elapsed.as_millis(),
                trigger,
                state,
            };
            serde_json::to_string(&line).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => format!(
            "[{:>7.3}s] {:<14} {}",
            elapsed.as_secs_f64(),
            trigger,
            describe(state)
        ),
    }
}

/// Single-line summary of a snapshot
pub fn describe(state: &PlaybackState) -> String {
    let status = match state.status {
        PlaybackStatus::Playing => style(state.status).green(),
        PlaybackStatus::Buffering | PlaybackStatus::Loading => style(state.status).yellow(),
        PlaybackStatus::Ended => style(state.status).magenta(),
        _ => style(state.status).dim(),
    };

    let mut line = format!(
        "{:<9} {}/{} buf {:>3.0}% q {:<5} vol {:>3.0}%",
        status,
        format_duration(state.current_time),
        format_duration(state.duration),
        state.buffered_pct,
        state.quality,
        state.effective_volume() * 100.0,
    );
    if state.muted {
        line.push_str(" muted");
    }
    if state.fullscreen {
        line.push_str(" fullscreen");
    }
    if state.theater {
        line.push_str(" theater");
    }
    if !state.controls_visible {
        line.push_str(" controls-hidden");
    }
    if state.quality_menu_open {
        line.push_str(" menu");
    }
    match state.transient_cue {
        TransientCue::Play => line.push_str(" [>]"),
        TransientCue::Pause => line.push_str(" [||]"),
        TransientCue::None => {}
    }
    line
}

/// Format any serializable value for the selected output
pub fn format_value<T: Serialize>(data: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => serde_json::to_value(data)
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_describe_flags() {
        console::set_colors_enabled(false);
        let state = PlaybackState {
            status: PlaybackStatus::Playing,
            current_time: 45.0,
            duration: 120.0,
            muted: true,
            controls_visible: false,
            ..Default::default()
        };
        let line = describe(&state);
        assert!(line.starts_with("playing"));
        assert!(line.contains("0:45/2:00"));
        assert!(line.contains("vol   0%"));
        assert!(line.contains(" muted"));
        assert!(line.contains("controls-hidden"));
    }

    #[test]
    fn test_json_snapshot_line() {
        let state = PlaybackState::default();
        let line = snapshot(OutputFormat::Json, Duration::from_millis(1500), "load", &state);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["elapsedMs"], 1500);
        assert_eq!(value["trigger"], "load");
        assert_eq!(value["state"]["status"], "idle");
    }
}
