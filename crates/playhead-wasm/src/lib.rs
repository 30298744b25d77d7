//! Playhead WASM - Browser binding for the playback controller
//!
//! Binds [`playhead_core::PlaybackEngine`] to an `HTMLVideoElement`:
//! - Media element events drive the engine's state machine
//! - Document key presses map to playback shortcuts
//! - Fullscreen follows the document's `fullscreenchange`
//! - Timers (auto-hide, cues) run on `setTimeout`
//!
//! ## Usage
//!
//! ```javascript
//! import init, { WasmPlayer, formatDuration } from '@playhead/wasm';
//!
//! await init();
//! const player = new WasmPlayer(
//!   video, container,
//!   { sourcePath: 'clip.mp4', availableQualities: ['1080p', '720p'], autoplay: true },
//!   { apiUrl: 'http://localhost:4200/api' },
//! );
//! player.onChange((state) => render(state));
//! ```

use wasm_bindgen::prelude::*;

mod dom;
mod fullscreen;
mod player;
mod video;

pub use player::WasmPlayer;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&format!("[Playhead WASM] v{} initialized", playhead_core::VERSION).into());
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    playhead_core::VERSION.to_string()
}

/// Render seconds as `m:ss`, or `h:mm:ss` from one hour up
#[wasm_bindgen(js_name = formatDuration)]
pub fn format_duration(seconds: f64) -> String {
    playhead_core::format_duration(seconds)
}

/// Media time for a click on the progress track
#[wasm_bindgen(js_name = positionToTime)]
pub fn position_to_time(click_x: f64, track_left: f64, track_width: f64, duration: f64) -> f64 {
    playhead_core::position_to_time(click_x, track_left, track_width, duration)
}
