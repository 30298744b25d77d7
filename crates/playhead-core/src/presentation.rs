//! Presentation modes: fullscreen and theater
//!
//! Fullscreen is owned by the platform. A toggle only *asks*; the stored flag
//! changes when the host reports a change, which also covers exits the
//! controller never requested.

use crate::media::FullscreenHost;
use tracing::{debug, warn};

pub struct PresentationController {
    host: Option<Box<dyn FullscreenHost>>,
    fullscreen: bool,
    theater: bool,
}

impl std::fmt::Debug for PresentationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationController")
            .field("attached", &self.host.is_some())
            .field("fullscreen", &self.fullscreen)
            .field("theater", &self.theater)
            .finish()
    }
}

impl Default for PresentationController {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationController {
    pub fn new() -> Self {
        Self {
            host: None,
            fullscreen: false,
            theater: false,
        }
    }

    pub fn attach(&mut self, host: Box<dyn FullscreenHost>) {
        self.fullscreen = host.is_fullscreen();
        self.host = Some(host);
    }

    /// Release the host subscription and forget platform state
    pub fn detach(&mut self) {
        if let Some(mut host) = self.host.take() {
            host.release();
        }
        self.fullscreen = false;
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn theater(&self) -> bool {
        self.theater
    }

    /// Ask the platform to enter or leave fullscreen. Failures are logged and
    /// otherwise ignored.
    pub fn toggle_fullscreen(&mut self) {
        let Some(host) = self.host.as_mut() else {
            debug!("Fullscreen toggle without host ignored");
            return;
        };
        let result = if host.is_fullscreen() {
            host.exit_fullscreen()
        } else {
            host.request_fullscreen()
        };
        if let Err(e) = result {
            warn!(error = %e, code = e.error_code(), "Fullscreen request failed");
        }
    }

    /// Platform fullscreen-change notification
    pub fn on_fullscreen_change(&mut self, fullscreen: bool) {
        if self.host.is_none() {
            return;
        }
        if self.fullscreen != fullscreen {
            debug!(fullscreen, "Fullscreen changed");
        }
        self.fullscreen = fullscreen;
    }

    pub fn toggle_theater(&mut self) {
        self.theater = !self.theater;
        debug!(theater = self.theater, "Theater mode toggled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedFullscreen;

    #[test]
    fn test_toggle_does_not_set_state_speculatively() {
        let host = SimulatedFullscreen::new();
        let mut p = PresentationController::new();
        p.attach(Box::new(host.clone()));

        p.toggle_fullscreen();
        assert_eq!(host.requests(), 1);
        assert!(!p.fullscreen());

        p.on_fullscreen_change(host.is_fullscreen());
        assert!(p.fullscreen());
    }

    #[test]
    fn test_rejected_request_leaves_state() {
        let host = SimulatedFullscreen::rejecting();
        let mut p = PresentationController::new();
        p.attach(Box::new(host.clone()));
        p.toggle_fullscreen();
        p.on_fullscreen_change(host.is_fullscreen());
        assert!(!p.fullscreen());
    }

    #[test]
    fn test_external_exit() {
        let host = SimulatedFullscreen::new();
        let mut p = PresentationController::new();
        p.attach(Box::new(host.clone()));
        p.toggle_fullscreen();
        p.on_fullscreen_change(true);

        host.exit_externally();
        p.on_fullscreen_change(false);
        assert!(!p.fullscreen());
    }

    #[test]
    fn test_theater_is_local() {
        let mut p = PresentationController::new();
        p.toggle_theater();
        assert!(p.theater());
        p.toggle_theater();
        assert!(!p.theater());
    }

    #[test]
    fn test_detach_releases_host() {
        let host = SimulatedFullscreen::new();
        let mut p = PresentationController::new();
        p.attach(Box::new(host.clone()));
        p.detach();
        assert!(host.is_released());
        p.on_fullscreen_change(true);
        assert!(!p.fullscreen());
    }
}
