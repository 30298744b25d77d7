//! Document fullscreen API as a fullscreen host

use crate::dom;
use playhead_core::{Error, FullscreenHost, Result};
use web_sys::{Document, Element};

/// Requests fullscreen for the player container. The engine learns the
/// outcome from `fullscreenchange`, never from the request itself.
pub(crate) struct DocumentFullscreen {
    document: Document,
    container: Element,
}

impl DocumentFullscreen {
    pub(crate) fn new(document: Document, container: Element) -> Self {
        Self {
            document,
            container,
        }
    }
}

impl FullscreenHost for DocumentFullscreen {
    fn is_fullscreen(&self) -> bool {
        self.document.fullscreen_element().is_some()
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        self.container
            .request_fullscreen()
            .map_err(|e| Error::FullscreenRejected(dom::describe(&e)))
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.document.exit_fullscreen();
        Ok(())
    }
}
