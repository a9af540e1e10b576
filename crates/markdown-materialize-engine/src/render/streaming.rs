//! The materialising decorator.
//!
//! [`StreamingRenderer`] holds a base renderer and forwards every call to it
//! first, then hides newly opened blocks and schedules their reveal. It
//! implements [`Renderer`] itself, so it can stand in wherever the base
//! renderer is used.

use super::{RenderEvent, Renderer};
use crate::dom::{ElementId, SharedDocument};
use crate::error::RenderError;
use crate::event_loop::EventLoop;
use crate::options::MaterializeOptions;
use crate::style::{self, StyleInjection};
use crate::token::{Attr, TokenType};
use crate::tracker::LifecycleTracker;

#[derive(Debug)]
pub struct StreamingRenderer<R> {
    base: R,
    document: SharedDocument,
    root: ElementId,
    root_was_connected: bool,
    tracker: LifecycleTracker,
}

impl<R: Renderer> StreamingRenderer<R> {
    /// Wraps `base`, injecting the style sheet into `document` if no other
    /// renderer did already and tagging `root` with the scoping class.
    pub fn new(
        base: R,
        document: SharedDocument,
        root: ElementId,
        event_loop: EventLoop,
        options: MaterializeOptions,
    ) -> Self {
        let root_was_connected = {
            let mut doc = document.borrow_mut();
            match style::ensure_styles(&mut doc, &options) {
                Ok(StyleInjection::Injected(id)) => log::debug!("style sheet injected as {id}"),
                Ok(StyleInjection::AlreadyPresent(_)) => {}
                Err(err) => log::warn!("{err}"),
            }
            if let Err(err) = doc.add_class(root, &options.root_class) {
                log::warn!("cannot tag root: {err}");
            }
            doc.is_connected(root)
        };

        Self {
            tracker: LifecycleTracker::new(document.clone(), event_loop, &options),
            base,
            document,
            root,
            root_was_connected,
        }
    }

    pub fn base(&self) -> &R {
        &self.base
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    fn root_detached(&self) -> bool {
        self.root_was_connected && !self.document.borrow().is_connected(self.root)
    }
}

impl<R: Renderer> Renderer for StreamingRenderer<R> {
    fn open(&mut self, event: &mut RenderEvent, token: TokenType) {
        self.base.open(event, token);

        let element = match event.current() {
            Ok(element) => element,
            Err(err) => {
                log::warn!("not materializing {token}: {err}");
                return;
            }
        };
        if self.root_detached() {
            log::warn!("not materializing {token}: {}", RenderError::DetachedRoot);
            self.tracker.release();
            return;
        }
        self.tracker.on_open(element, token);
    }

    fn close(&mut self, event: &mut RenderEvent) {
        self.base.close(event);
    }

    fn text(&mut self, event: &mut RenderEvent, text: &str) {
        self.base.text(event, text);
    }

    fn set_attr(&mut self, event: &mut RenderEvent, attr: Attr, value: &str) {
        self.base.set_attr(event, attr, value);
    }

    fn discard(&mut self, element: ElementId) {
        log::trace!("discarding {element}");
        self.base.discard(element);
    }

    fn move_before(&mut self, element: ElementId, anchor: ElementId) {
        self.base.move_before(element, anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::render::DefaultRenderer;
    use std::time::Duration;

    struct Fixture {
        document: SharedDocument,
        event_loop: EventLoop,
        renderer: StreamingRenderer<DefaultRenderer>,
        event: RenderEvent,
    }

    fn fixture() -> Fixture {
        let document = Document::new_shared();
        let root = {
            let mut doc = document.borrow_mut();
            let root = doc.create_element("div");
            let body = doc.body();
            doc.append_child(body, root).unwrap();
            root
        };
        let event_loop = EventLoop::new();
        let renderer = StreamingRenderer::new(
            DefaultRenderer::new(document.clone()),
            document.clone(),
            root,
            event_loop.clone(),
            MaterializeOptions::default(),
        );
        Fixture {
            document,
            event_loop,
            renderer,
            event: RenderEvent::new(root),
        }
    }

    #[test]
    fn construction_tags_root_and_injects_styles() {
        let f = fixture();
        let doc = f.document.borrow();
        assert!(doc.has_class(f.renderer.root(), "streaming-markdown-root"));
        assert_eq!(doc.query_all("style", "data-streaming-markdown").len(), 1);
    }

    #[test]
    fn block_hidden_synchronously() {
        let mut f = fixture();
        f.renderer.open(&mut f.event, TokenType::Heading2);
        let h2 = f.event.current().unwrap();
        assert!(f.document.borrow().has_class(h2, "stream-block"));
        assert!(!f.document.borrow().has_class(h2, "fade-in"));

        f.event_loop.advance(Duration::from_millis(10));
        assert!(f.document.borrow().has_class(h2, "fade-in"));
    }

    #[test]
    fn close_leaves_classes_alone() {
        let mut f = fixture();
        f.renderer.open(&mut f.event, TokenType::Paragraph);
        let p = f.event.current().unwrap();
        let before = f.document.borrow().element(p).unwrap().classes().to_vec();
        f.renderer.close(&mut f.event);
        assert_eq!(f.document.borrow().element(p).unwrap().classes(), before);
    }

    #[test]
    fn invalid_index_does_not_panic() {
        let mut f = fixture();
        f.event.index = 3;
        f.renderer.open(&mut f.event, TokenType::Paragraph);
        assert!(f.renderer.tracker().pending().is_empty());
    }

    #[test]
    fn detached_root_releases_timer() {
        let mut f = fixture();
        f.renderer.open(&mut f.event, TokenType::Paragraph);
        f.renderer.close(&mut f.event);
        assert_eq!(f.event_loop.pending(), 1);

        let root = f.renderer.root();
        f.document.borrow_mut().remove(root).unwrap();
        f.renderer.open(&mut f.event, TokenType::Paragraph);
        assert_eq!(f.event_loop.pending(), 0);
        assert!(f.renderer.tracker().pending().is_empty());
    }
}
