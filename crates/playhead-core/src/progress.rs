//! Progress bar mapping and time formatting

use crate::types::BufferedRange;

/// Map a click on the progress track to a media time.
///
/// A zero-width track maps to 0 instead of dividing by zero.
pub fn position_to_time(click_x: f64, track_left: f64, track_width: f64, duration: f64) -> f64 {
    if track_width <= 0.0 || !duration.is_finite() {
        return 0.0;
    }
    let fraction = ((click_x - track_left) / track_width).clamp(0.0, 1.0);
    fraction * duration
}

/// Playhead position as a percentage; 0 while the duration is unknown
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
    if duration > 0.0 && duration.is_finite() {
        (current_time / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Furthest buffered end as a percentage of the duration
pub fn buffered_percent(ranges: &[BufferedRange], duration: Option<f64>) -> f64 {
    let Some(duration) = duration.filter(|d| *d > 0.0 && d.is_finite()) else {
        return 0.0;
    };
    ranges
        .iter()
        .map(|r| r.end)
        .fold(None, |max: Option<f64>, end| Some(max.map_or(end, |m| m.max(end))))
        .map(|end| (end / duration * 100.0).clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// Render seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
