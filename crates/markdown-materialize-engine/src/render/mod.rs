//! Renderers turn structural events into elements.
//!
//! The parser drives a [`Renderer`] with well-nested `open`/`close` pairs and
//! the text and attributes in between. [`DefaultRenderer`] builds plain
//! elements; [`streaming::StreamingRenderer`] wraps any renderer and adds the
//! fade-in lifecycle on top.

pub mod streaming;

use crate::dom::{Document, ElementId, SharedDocument};
use crate::error::RenderError;
use crate::token::{Attr, TokenType};

/// Cursor into the stack of open elements.
///
/// `nodes[0]` is the root container, `nodes[index]` the element most recently
/// opened and not yet closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEvent {
    pub nodes: Vec<ElementId>,
    pub index: usize,
}

impl RenderEvent {
    pub fn new(root: ElementId) -> Self {
        Self {
            nodes: vec![root],
            index: 0,
        }
    }

    /// The element at `index`.
    pub fn current(&self) -> Result<ElementId, RenderError> {
        self.nodes
            .get(self.index)
            .copied()
            .ok_or(RenderError::InvalidEventIndex {
                index: self.index,
                len: self.nodes.len(),
            })
    }

    pub fn root(&self) -> Option<ElementId> {
        self.nodes.first().copied()
    }
}

pub trait Renderer {
    /// Creates one element for `token` under the current element and makes it
    /// current.
    fn open(&mut self, event: &mut RenderEvent, token: TokenType);
    /// Finalises the current element; it stays in the tree.
    fn close(&mut self, event: &mut RenderEvent);
    fn text(&mut self, event: &mut RenderEvent, text: &str);
    fn set_attr(&mut self, event: &mut RenderEvent, attr: Attr, value: &str);

    /// Takes a top-level element opened earlier, and its subtree, out of the
    /// tree. Renderers that keep no tree can ignore it.
    fn discard(&mut self, _element: ElementId) {}

    /// Moves a top-level element in front of `anchor`.
    fn move_before(&mut self, _element: ElementId, _anchor: ElementId) {}
}

/// Builds plain elements into a shared document.
#[derive(Debug, Clone)]
pub struct DefaultRenderer {
    document: SharedDocument,
}

impl DefaultRenderer {
    pub fn new(document: SharedDocument) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }
}

impl Renderer for DefaultRenderer {
    fn open(&mut self, event: &mut RenderEvent, token: TokenType) {
        let parent = match event.current() {
            Ok(parent) => parent,
            Err(err) => {
                log::warn!("cannot open {token}: {err}");
                return;
            }
        };

        let mut doc = self.document.borrow_mut();
        let element = doc.create_element(token.tag());
        let attached = if token.is_preformatted() {
            let pre = doc.create_element("pre");
            doc.append_child(parent, pre)
                .and_then(|_| doc.append_child(pre, element))
        } else {
            doc.append_child(parent, element)
        };
        if let Err(err) = attached {
            log::warn!("failed to attach {token}: {err}");
        }
        if token == TokenType::Checkbox
            && let Err(err) = doc.set_attribute(element, "type", "checkbox")
        {
            log::warn!("{err}");
        }

        event.index += 1;
        event.nodes.truncate(event.index);
        event.nodes.push(element);
    }

    fn close(&mut self, event: &mut RenderEvent) {
        if event.index == 0 {
            log::warn!("close without a matching open");
            return;
        }
        event.index -= 1;
    }

    fn text(&mut self, event: &mut RenderEvent, text: &str) {
        let result = event
            .current()
            .and_then(|current| self.document.borrow_mut().append_text(current, text));
        if let Err(err) = result {
            log::warn!("dropping text: {err}");
        }
    }

    fn set_attr(&mut self, event: &mut RenderEvent, attr: Attr, value: &str) {
        let result = event.current().and_then(|current| {
            let mut doc = self.document.borrow_mut();
            match attr {
                Attr::Lang => doc
                    .add_class(current, &format!("language-{value}"))
                    .map(|_| ()),
                Attr::Checked => doc.set_attribute(current, attr.html_name(), ""),
                _ => doc.set_attribute(current, attr.html_name(), value),
            }
        });
        if let Err(err) = result {
            log::warn!("dropping {attr:?} attribute: {err}");
        }
    }

    fn discard(&mut self, element: ElementId) {
        let mut doc = self.document.borrow_mut();
        let outer = outermost(&doc, element);
        if let Err(err) = doc.remove(outer) {
            log::warn!("cannot discard {element}: {err}");
        }
    }

    fn move_before(&mut self, element: ElementId, anchor: ElementId) {
        let mut doc = self.document.borrow_mut();
        let (outer, anchor) = (outermost(&doc, element), outermost(&doc, anchor));
        if let Err(err) = doc.insert_before(anchor, outer) {
            log::warn!("cannot move {element}: {err}");
        }
    }
}

/// The `pre` wrapper of a preformatted element, otherwise the element.
fn outermost(doc: &Document, element: ElementId) -> ElementId {
    let Ok(el) = doc.element(element) else {
        return element;
    };
    match el.parent() {
        Some(parent)
            if el.tag() == "code" && doc.element(parent).is_ok_and(|p| p.tag() == "pre") =>
        {
            parent
        }
        _ => element,
    }
}
