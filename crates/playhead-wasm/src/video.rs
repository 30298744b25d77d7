//! HTML video element as a media resource

use crate::dom::{self, Listener};
use playhead_core::{BufferedRange, Error, MediaEvent, MediaResource, ReadyState, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::HtmlVideoElement;

pub(crate) type EventQueue = Rc<RefCell<VecDeque<MediaEvent>>>;

/// Called after an event lands in the queue
pub(crate) type Notify = Rc<dyn Fn()>;

/// Autoplay policy rejections surface as this DOMException name
const NOT_ALLOWED: &str = "NotAllowedError";

pub(crate) struct VideoResource {
    video: HtmlVideoElement,
    queue: EventQueue,
    notify: Notify,
    listeners: Vec<Listener>,
}

impl VideoResource {
    pub(crate) fn new(video: HtmlVideoElement, notify: Notify) -> std::result::Result<Self, JsValue> {
        let queue: EventQueue = Rc::default();
        let mut listeners = Vec::with_capacity(MediaEvent::DOM_EVENTS.len());
        for event in MediaEvent::DOM_EVENTS {
            let queue = queue.clone();
            let notify = notify.clone();
            listeners.push(Listener::attach(video.as_ref(), event.name(), move |_| {
                queue.borrow_mut().push_back(event);
                notify();
            })?);
        }
        Ok(Self {
            video,
            queue,
            notify,
            listeners,
        })
    }
}

impl MediaResource for VideoResource {
    fn load(&mut self, url: &str) {
        // The element discards its pending tasks on load; match that for
        // events already queued here
        self.queue.borrow_mut().clear();
        self.video.set_src(url);
        self.video.load();
    }

    fn set_poster(&mut self, url: &str) {
        self.video.set_poster(url);
    }

    fn play(&mut self) -> Result<()> {
        let promise = self
            .video
            .play()
            .map_err(|e| Error::PlayRejected(dom::describe(&e)))?;

        // Policy rejection arrives later through the promise
        let queue = self.queue.clone();
        let notify = self.notify.clone();
        spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                let name = js_sys::Reflect::get(&e, &JsValue::from_str("name"))
                    .ok()
                    .and_then(|n| n.as_string());
                if name.as_deref() == Some(NOT_ALLOWED) {
                    queue.borrow_mut().push_back(MediaEvent::PlayRejected);
                    notify();
                }
            }
        });
        Ok(())
    }

    fn pause(&mut self) {
        let _ = self.video.pause();
    }

    fn seek(&mut self, time: f64) {
        self.video.set_current_time(time);
    }

    fn set_volume(&mut self, volume: f64) {
        self.video.set_volume(volume);
    }

    fn set_muted(&mut self, muted: bool) {
        self.video.set_muted(muted);
    }

    fn paused(&self) -> bool {
        self.video.paused()
    }

    fn current_time(&self) -> f64 {
        self.video.current_time()
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.video.duration();
        duration.is_finite().then_some(duration)
    }

    fn buffered(&self) -> Vec<BufferedRange> {
        let ranges = self.video.buffered();
        (0..ranges.length())
            .filter_map(|i| Some(BufferedRange::new(ranges.start(i).ok()?, ranges.end(i).ok()?)))
            .collect()
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_html(self.video.ready_state())
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.queue.borrow_mut().pop_front()
    }

    fn release(&mut self) {
        self.listeners.clear();
        let _ = self.video.pause();
        let _ = self.video.remove_attribute("src");
        self.video.load();
        self.queue.borrow_mut().clear();
    }
}
