//! Playback scripts
//!
//! A script is a JSON array of steps. Each step waits `afterMs` since the
//! previous one, then either drives the simulated resource or sends an
//! input to the session:
//!
//! ```json
//! [
//!   { "step": "load", "duration": 120 },
//!   { "afterMs": 200, "step": "command", "action": { "action": "togglePlay" } },
//!   { "afterMs": 500, "step": "key", "key": "ArrowRight" }
//! ]
//! ```

use anyhow::Context;
use playhead_core::{ControlAction, QualityLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub op: StepOp,
}

impl Step {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.after_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum StepOp {
    /// Resource finishes loading the current source
    Load { duration: f64 },
    /// Resource plays forward
    Advance { secs: f64 },
    /// Resource runs out of data
    Stall,
    /// Resource has data again
    Recover,
    /// Resource reports buffered data up to `end`
    Buffered { end: f64 },
    Command { action: ControlAction },
    Key {
        key: String,
        #[serde(default)]
        text_focus: bool,
    },
    PointerMove,
    PointerLeave,
    QualityMenu,
    /// Platform reports a fullscreen change
    Fullscreen { active: bool },
    /// Click on the progress track
    TrackClick { x: f64, left: f64, width: f64 },
    Detach,
}

impl StepOp {
    pub fn label(&self) -> &'static str {
        match self {
            StepOp::Load { .. } => "load",
            StepOp::Advance { .. } => "advance",
            StepOp::Stall => "stall",
            StepOp::Recover => "recover",
            StepOp::Buffered { .. } => "buffered",
            StepOp::Command { .. } => "command",
            StepOp::Key { .. } => "key",
            StepOp::PointerMove => "pointer-move",
            StepOp::PointerLeave => "pointer-leave",
            StepOp::QualityMenu => "quality-menu",
            StepOp::Fullscreen { .. } => "fullscreen",
            StepOp::TrackClick { .. } => "track-click",
            StepOp::Detach => "detach",
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Step>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    parse(&body).with_context(|| format!("parsing script {}", path.display()))
}

pub fn parse(body: &str) -> anyhow::Result<Vec<Step>> {
    Ok(serde_json::from_str(body)?)
}

fn step(after_ms: u64, op: StepOp) -> Step {
    Step { after_ms, op }
}

/// Load, play, switch quality mid-playback, then let the controls hide
pub fn demo() -> Vec<Step> {
    vec![
        step(0, StepOp::Load { duration: 120.0 }),
        step(100, StepOp::PointerMove),
        step(100, StepOp::Command { action: ControlAction::TogglePlay }),
        step(200, StepOp::Advance { secs: 45.0 }),
        step(0, StepOp::Buffered { end: 60.0 }),
        step(100, StepOp::QualityMenu),
        step(100, StepOp::Command {
            action: ControlAction::SetQuality(QualityLevel::Hd720),
        }),
        step(300, StepOp::Load { duration: 120.0 }),
        step(100, StepOp::Key {
            key: "ArrowRight".into(),
            text_focus: false,
        }),
        step(100, StepOp::Key {
            key: "m".into(),
            text_focus: true,
        }),
        step(100, StepOp::Key {
            key: "m".into(),
            text_focus: false,
        }),
        step(3200, StepOp::Stall),
        step(200, StepOp::Recover),
        step(100, StepOp::Detach),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let steps = parse(
            r#"[
                { "step": "load", "duration": 120 },
                { "afterMs": 250, "step": "command", "action": { "action": "seek", "value": 30 } },
                { "afterMs": 10, "step": "key", "key": " ", "textFocus": true },
                { "step": "fullscreen", "active": true }
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].after_ms, 0);
        assert_eq!(steps[1].delay(), Duration::from_millis(250));
        assert_eq!(
            steps[1].op,
            StepOp::Command {
                action: ControlAction::Seek(30.0)
            }
        );
        assert_eq!(
            steps[2].op,
            StepOp::Key {
                key: " ".into(),
                text_focus: true
            }
        );
        assert_eq!(steps[3].op.label(), "fullscreen");
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(parse(r#"[{ "step": "rewind" }]"#).is_err());
    }

    #[test]
    fn test_demo_ends_detached() {
        let demo = demo();
        assert_eq!(demo.first().map(|s| s.op.label()), Some("load"));
        assert_eq!(demo.last().map(|s| s.op.label()), Some("detach"));
    }
}
