//! Keyboard command routing

use crate::types::QualityLevel;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Keyboard/pointer control actions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "camelCase")]
pub enum ControlAction {
    TogglePlay,
    /// Seek to an absolute time (seconds)
    Seek(f64),
    /// Seek by a signed offset (seconds)
    SeekRelative(f64),
    SetQuality(QualityLevel),
    SetVolume(f64),
    /// Change volume by a signed step
    AdjustVolume(f64),
    ToggleMute,
    ToggleFullscreen,
    ToggleTheater,
}

/// Fixed key binding table, owned by one controller.
///
/// The router only dispatches while attached, so a host listener that outlives
/// its controller cannot reach a detached engine.
#[derive(Debug, Clone)]
pub struct KeyboardRouter {
    attached: bool,
    seek_step: f64,
    volume_step: f64,
}

impl KeyboardRouter {
    pub fn new(seek_step: f64, volume_step: f64) -> Self {
        Self {
            attached: false,
            seek_step,
            volume_step,
        }
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Map a key press to an action.
    ///
    /// `key` is the platform key name (`" "`, `"k"`, `"ArrowLeft"`), matched
    /// case-insensitively. Nothing is dispatched while a text field has focus.
    pub fn handle_key(&self, key: &str, has_text_focus: bool) -> Option<ControlAction> {
        if !self.attached || has_text_focus {
            return None;
        }
        let action = self.lookup(&key.to_ascii_lowercase());
        trace!(key, ?action, "Key routed");
        action
    }

    fn lookup(&self, key: &str) -> Option<ControlAction> {
        let action = match key {
            " " | "space" | "spacebar" | "k" => ControlAction::TogglePlay,
            "f" => ControlAction::ToggleFullscreen,
            "t" => ControlAction::ToggleTheater,
            "m" => ControlAction::ToggleMute,
            "arrowleft" => ControlAction::SeekRelative(-self.seek_step),
            "arrowright" => ControlAction::SeekRelative(self.seek_step),
            "arrowup" => ControlAction::AdjustVolume(self.volume_step),
            "arrowdown" => ControlAction::AdjustVolume(-self.volume_step),
            _ => return None,
        };
        Some(action)
    }

    /// The binding table as `(key label, action)` pairs
    pub fn bindings(&self) -> Vec<(&'static str, ControlAction)> {
        ["Space", "k", "f", "t", "m", "ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown"]
            .into_iter()
            .filter_map(|label| {
                self.lookup(&label.to_ascii_lowercase())
                    .map(|action| (label, action))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> KeyboardRouter {
        let mut r = KeyboardRouter::new(5.0, 0.1);
        r.attach();
        r
    }

    #[test]
    fn test_binding_table() {
        let r = router();
        assert_eq!(r.handle_key(" ", false), Some(ControlAction::TogglePlay));
        assert_eq!(r.handle_key("k", false), Some(ControlAction::TogglePlay));
        assert_eq!(r.handle_key("F", false), Some(ControlAction::ToggleFullscreen));
        assert_eq!(r.handle_key("t", false), Some(ControlAction::ToggleTheater));
        assert_eq!(r.handle_key("m", false), Some(ControlAction::ToggleMute));
        assert_eq!(r.handle_key("ArrowLeft", false), Some(ControlAction::SeekRelative(-5.0)));
        assert_eq!(r.handle_key("ArrowRight", false), Some(ControlAction::SeekRelative(5.0)));
        assert_eq!(r.handle_key("ArrowUp", false), Some(ControlAction::AdjustVolume(0.1)));
        assert_eq!(r.handle_key("ArrowDown", false), Some(ControlAction::AdjustVolume(-0.1)));
    }

    #[test]
    fn test_unmapped_key() {
        assert_eq!(router().handle_key("x", false), None);
        assert_eq!(router().handle_key("Enter", false), None);
    }

    #[test]
    fn test_text_focus_suppresses_everything() {
        let r = router();
        for key in [" ", "k", "f", "t", "m", "ArrowLeft", "ArrowUp"] {
            assert_eq!(r.handle_key(key, true), None);
        }
    }

    #[test]
    fn test_detached_router_is_silent() {
        let mut r = router();
        r.detach();
        assert_eq!(r.handle_key("k", false), None);
    }

    #[test]
    fn test_bindings_listing() {
        let bindings = router().bindings();
        assert_eq!(bindings.len(), 9);
        assert_eq!(bindings[0], ("Space", ControlAction::TogglePlay));
    }
}
