//! Browser player - binds a playback engine to a video element
//!
//! The browser event loop is the driver: media events, key presses, pointer
//! movement and `setTimeout` firings each run one engine step, after which
//! queued media events are drained and the next timer is armed.

use crate::dom::{self, Listener};
use crate::fullscreen::DocumentFullscreen;
use crate::video::{Notify, VideoResource};
use js_sys::{Array, Function};
use playhead_core::{
    Error, MediaSource, PlaybackCallbacks, PlaybackEngine, PlaybackState, PlayerConfig,
    QualityLevel, StorageLocator,
};
use serde::Deserialize;
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, HtmlElement, HtmlVideoElement, KeyboardEvent, Window};

/// Constructor options
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct PlayerOptions {
    /// Storage root such as `https://cdn.example.com/storage`
    pub storage_base: Option<String>,
    /// Content API URL; the storage root is derived from it
    pub api_url: Option<String>,
    pub config: PlayerConfig,
}

impl PlayerOptions {
    pub(crate) fn locator(&self) -> playhead_core::Result<StorageLocator> {
        match (&self.storage_base, &self.api_url) {
            (Some(base), _) => StorageLocator::new(base),
            (None, Some(api)) => StorageLocator::from_api_url(api),
            (None, None) => Err(Error::InvalidConfig(
                "storageBase or apiUrl is required".into(),
            )),
        }
    }
}

fn to_js(e: Error) -> JsValue {
    js_sys::Error::new(&format!("{} ({})", e, e.error_code())).into()
}

/// The engine, borrowed once per step. JS callbacks run inside a step, so a
/// detach they request is held until the step finishes with the engine.
pub(crate) struct EngineSlot {
    engine: RefCell<PlaybackEngine>,
    detach_pending: Cell<bool>,
}

impl EngineSlot {
    pub(crate) fn new(engine: PlaybackEngine) -> Self {
        Self {
            engine: RefCell::new(engine),
            detach_pending: Cell::new(false),
        }
    }

    /// `None` while a step holds the engine
    pub(crate) fn get(&self) -> Option<Ref<'_, PlaybackEngine>> {
        self.engine.try_borrow().ok()
    }

    /// Apply `f`, then drain queued media events. Returns `None` when the
    /// engine is already busy further up the stack.
    pub(crate) fn run<R>(
        &self,
        now: Duration,
        f: impl FnOnce(&mut PlaybackEngine, Duration) -> R,
    ) -> Option<R> {
        let mut engine = self.engine.try_borrow_mut().ok()?;
        let result = f(&mut engine, now);
        engine.pump();
        if self.detach_pending.take() {
            engine.detach();
        }
        Some(result)
    }

    /// Detach now, or once the running step is done. Returns `true` when
    /// the engine was detached immediately.
    pub(crate) fn detach(&self) -> bool {
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => {
                engine.detach();
                true
            }
            Err(_) => {
                self.detach_pending.set(true);
                false
            }
        }
    }
}

struct Inner {
    engine: EngineSlot,
    window: Window,
    document: Document,
    listeners: RefCell<Vec<Listener>>,
    timeout: Cell<Option<i32>>,
    timer_cb: RefCell<Option<Closure<dyn FnMut()>>>,
    on_change: RefCell<Option<Function>>,
    last: RefCell<Option<PlaybackState>>,
}

impl Inner {
    fn now(&self) -> Duration {
        let ms = self.window.performance().map(|p| p.now()).unwrap_or(0.0);
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }

    /// Run one engine step, drain queued media events, re-arm the timer and
    /// publish the snapshot. Returns `None` when the engine is already busy
    /// further up the stack; its caller drains the queue afterwards.
    fn step<R>(&self, f: impl FnOnce(&mut PlaybackEngine, Duration) -> R) -> Option<R> {
        let result = self.engine.run(self.now(), f)?;
        self.reschedule();
        self.publish();
        Some(result)
    }

    fn reschedule(&self) {
        if let Some(id) = self.timeout.take() {
            self.window.clear_timeout_with_handle(id);
        }
        let Some(deadline) = self.engine.get().and_then(|engine| engine.next_deadline()) else {
            return;
        };
        let delay = deadline.saturating_sub(self.now());
        let delay_ms = (delay.as_secs_f64() * 1000.0).ceil() as i32;

        let timer_cb = self.timer_cb.borrow();
        let Some(cb) = timer_cb.as_ref() else {
            return;
        };
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), delay_ms)
        {
            Ok(id) => self.timeout.set(Some(id)),
            Err(e) => web_sys::console::warn_1(
                &format!("[Playhead] timer not armed: {}", dom::describe(&e)).into(),
            ),
        }
    }

    fn publish(&self) {
        let Some(engine) = self.engine.get() else {
            return;
        };
        let state = engine.state().clone();
        drop(engine);
        if self.last.borrow().as_ref() == Some(&state) {
            return;
        }
        *self.last.borrow_mut() = Some(state.clone());

        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            if let Ok(value) = serde_wasm_bindgen::to_value(&state) {
                let _ = callback.call1(&JsValue::NULL, &value);
            }
        }
    }

    fn listen(
        self: &Rc<Self>,
        target: &web_sys::EventTarget,
        event: &'static str,
        handler: impl Fn(&Inner, &Event) + 'static,
    ) -> Result<(), JsValue> {
        let weak: Weak<Inner> = Rc::downgrade(self);
        let listener = Listener::attach(target, event, move |e| {
            if let Some(inner) = weak.upgrade() {
                handler(&inner, &e);
            }
        })?;
        self.listeners.borrow_mut().push(listener);
        Ok(())
    }

    fn teardown(&self) {
        self.listeners.borrow_mut().clear();
        if let Some(id) = self.timeout.take() {
            self.window.clear_timeout_with_handle(id);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Playback controller bound to an HTML video element
#[wasm_bindgen]
pub struct WasmPlayer {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Attach to `video`, using `container` for fullscreen and pointer
    /// tracking. `source` is `{ sourcePath, posterPath?, availableQualities?,
    /// autoplay? }`; `options` is `{ storageBase? | apiUrl?, config? }`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        video: HtmlVideoElement,
        container: HtmlElement,
        source: JsValue,
        options: JsValue,
        on_time_update: Option<Function>,
        on_ended: Option<Function>,
    ) -> Result<WasmPlayer, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let source: MediaSource = serde_wasm_bindgen::from_value(source)?;
        let options: PlayerOptions = if options.is_undefined() || options.is_null() {
            PlayerOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        let locator = options.locator().map_err(to_js)?;
        let engine = PlaybackEngine::new(options.config).map_err(to_js)?;

        let inner = Rc::new(Inner {
            engine: EngineSlot::new(engine),
            window,
            document: document.clone(),
            listeners: RefCell::new(Vec::new()),
            timeout: Cell::new(None),
            timer_cb: RefCell::new(None),
            on_change: RefCell::new(None),
            last: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        *inner.timer_cb.borrow_mut() = Some(Closure::<dyn FnMut()>::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.timeout.set(None);
                inner.step(|engine, now| engine.poll_timers(now));
            }
        }));

        let weak = Rc::downgrade(&inner);
        let notify: Notify = Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.step(|_, _| ());
            }
        });
        let resource = VideoResource::new(video, notify)?;
        let host = DocumentFullscreen::new(document.clone(), container.clone().into());

        let mut callbacks = PlaybackCallbacks::new();
        if let Some(f) = on_time_update {
            callbacks = callbacks.on_time_update(move |time, duration| {
                let _ = f.call2(&JsValue::NULL, &JsValue::from_f64(time), &JsValue::from_f64(duration));
            });
        }
        if let Some(f) = on_ended {
            callbacks = callbacks.on_ended(move || {
                let _ = f.call0(&JsValue::NULL);
            });
        }

        inner
            .step(|engine, _| {
                engine.attach(
                    Box::new(resource),
                    Box::new(host),
                    Box::new(locator),
                    source,
                    callbacks,
                )
            })
            .ok_or_else(|| JsValue::from_str("engine busy"))?
            .map_err(to_js)?;

        inner.listen(document.as_ref(), "keydown", |inner, event| {
            let Some(key_event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            let key = key_event.key();
            let focus = dom::targets_text_field(event);
            if inner.step(|engine, now| engine.handle_key(&key, focus, now)) == Some(true) {
                event.prevent_default();
            }
        })?;
        inner.listen(document.as_ref(), "fullscreenchange", |inner, _| {
            let fullscreen = inner.document.fullscreen_element().is_some();
            inner.step(|engine, _| engine.handle_fullscreen_change(fullscreen));
        })?;
        inner.listen(container.as_ref(), "mousemove", |inner, _| {
            inner.step(|engine, now| engine.pointer_activity(now));
        })?;
        inner.listen(container.as_ref(), "mouseleave", |inner, _| {
            inner.step(|engine, _| engine.pointer_leave());
        })?;

        web_sys::console::log_1(&"[Playhead WASM] Player attached".into());
        Ok(WasmPlayer { inner })
    }

    /// Current snapshot as a plain object. From inside a playback callback
    /// this is the last published snapshot.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let value = match self.inner.engine.get() {
            Some(engine) => serde_wasm_bindgen::to_value(engine.state())?,
            None => serde_wasm_bindgen::to_value(&self.inner.last.borrow().clone().unwrap_or_default())?,
        };
        Ok(value)
    }

    /// Register a callback receiving every changed snapshot
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Option<Function>) {
        *self.inner.on_change.borrow_mut() = callback;
        *self.inner.last.borrow_mut() = None;
        self.inner.publish();
    }

    /// Qualities offered for this source, best first
    pub fn qualities(&self) -> Array {
        let Some(engine) = self.inner.engine.get() else {
            return Array::new();
        };
        engine
            .available_qualities()
            .map(|set| set.iter().map(|q| JsValue::from_str(q.as_str())).collect())
            .unwrap_or_else(Array::new)
    }

    #[wasm_bindgen(js_name = togglePlay)]
    pub fn toggle_play(&self) {
        self.inner.step(|engine, now| engine.toggle_play(now));
    }

    pub fn seek(&self, time: f64) {
        self.inner.step(|engine, _| engine.seek(time));
    }

    #[wasm_bindgen(js_name = seekRelative)]
    pub fn seek_relative(&self, delta: f64) {
        self.inner.step(|engine, _| engine.seek_relative(delta));
    }

    /// Seek to a click on the progress track, in client coordinates
    #[wasm_bindgen(js_name = seekToPosition)]
    pub fn seek_to_position(&self, click_x: f64, track_left: f64, track_width: f64) {
        self.inner
            .step(|engine, _| engine.seek_to_position(click_x, track_left, track_width));
    }

    #[wasm_bindgen(js_name = setQuality)]
    pub fn set_quality(&self, quality: &str) -> Result<(), JsValue> {
        let quality: QualityLevel = quality.parse().map_err(to_js)?;
        match self.inner.step(|engine, now| engine.set_quality(quality, now)) {
            Some(result) => result.map_err(to_js),
            None => Ok(()),
        }
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, volume: f64) {
        self.inner.step(|engine, _| engine.set_volume(volume));
    }

    #[wasm_bindgen(js_name = adjustVolume)]
    pub fn adjust_volume(&self, delta: f64) {
        self.inner.step(|engine, _| engine.adjust_volume(delta));
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) {
        self.inner.step(|engine, _| engine.toggle_mute());
    }

    #[wasm_bindgen(js_name = toggleFullscreen)]
    pub fn toggle_fullscreen(&self) {
        self.inner.step(|engine, _| engine.toggle_fullscreen());
    }

    #[wasm_bindgen(js_name = toggleTheater)]
    pub fn toggle_theater(&self) {
        self.inner.step(|engine, _| engine.toggle_theater());
    }

    #[wasm_bindgen(js_name = toggleQualityMenu)]
    pub fn toggle_quality_menu(&self) {
        self.inner.step(|engine, _| engine.toggle_quality_menu());
    }

    #[wasm_bindgen(js_name = closeQualityMenu)]
    pub fn close_quality_menu(&self) {
        self.inner.step(|engine, _| engine.close_quality_menu());
    }

    /// Release the element, every listener and the pending timer. Called
    /// from a playback callback, the engine half completes when the current
    /// step unwinds.
    pub fn detach(&self) {
        self.inner.teardown();
        if self.inner.engine.detach() {
            self.inner.publish();
        } else {
            web_sys::console::debug_1(&"[Playhead WASM] Engine busy, detach deferred".into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playhead_core::{NoFullscreen, SimulatedResource};

    #[test]
    fn test_options_locator() {
        let options = PlayerOptions {
            api_url: Some("http://localhost:4200/api".into()),
            ..Default::default()
        };
        assert_eq!(
            options.locator().unwrap().base(),
            "http://localhost:4200/storage"
        );

        let options = PlayerOptions {
            storage_base: Some("https://cdn.example.com/storage/".into()),
            api_url: Some("http://ignored/api".into()),
            ..Default::default()
        };
        assert_eq!(options.locator().unwrap().base(), "https://cdn.example.com/storage");
    }

    #[test]
    fn test_options_without_storage() {
        let err = PlayerOptions::default().locator().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_detach_from_callback_runs_after_step() {
        let media = SimulatedResource::new();
        let slot = Rc::new(EngineSlot::new(
            PlaybackEngine::new(PlayerConfig::default()).unwrap(),
        ));
        let detached_now = Rc::new(Cell::new(None));

        let weak = Rc::downgrade(&slot);
        let seen = detached_now.clone();
        let callbacks = PlaybackCallbacks::new().on_time_update(move |_, _| {
            if let Some(slot) = weak.upgrade() {
                seen.set(Some(slot.detach()));
            }
        });
        slot.run(Duration::ZERO, |engine, _| {
            engine.attach(
                Box::new(media.clone()),
                Box::new(NoFullscreen),
                Box::new(StorageLocator::new("https://cdn.example.com/storage").unwrap()),
                MediaSource::new("clip.mp4"),
                callbacks,
            )
        })
        .unwrap()
        .unwrap();
        media.finish_loading(60.0);

        slot.run(Duration::ZERO, |engine, _| engine.seek(10.0)).unwrap();
        assert_eq!(detached_now.get(), Some(false));
        assert!(media.is_released());
        assert!(!slot.get().unwrap().is_attached());
    }

    #[test]
    fn test_detach_outside_step_is_immediate() {
        let slot = EngineSlot::new(PlaybackEngine::new(PlayerConfig::default()).unwrap());
        assert!(slot.detach());
        assert_eq!(slot.run(Duration::ZERO, |engine, _| engine.is_attached()), Some(false));
    }
}
