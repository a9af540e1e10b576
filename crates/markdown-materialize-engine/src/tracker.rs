use crate::classify::{Category, classify};
use crate::dom::{ElementId, SharedDocument};
use crate::event_loop::EventLoop;
use crate::fade::FadeScheduler;
use crate::options::MaterializeOptions;
use crate::token::TokenType;

/// Attribute recording a container's token type.
pub const TOKEN_TYPE_ATTR: &str = "data-token-type";

/// Per-render-pass lifecycle state.
///
/// Owns the [`FadeScheduler`], and with it the slot of elements waiting to be
/// revealed; nothing else writes to that slot.
#[derive(Debug)]
pub struct LifecycleTracker {
    document: SharedDocument,
    scheduler: FadeScheduler,
    hidden_class: String,
    current_block: Option<ElementId>,
}

impl LifecycleTracker {
    pub fn new(document: SharedDocument, event_loop: EventLoop, options: &MaterializeOptions) -> Self {
        Self {
            scheduler: FadeScheduler::new(document.clone(), event_loop, options),
            document,
            hidden_class: options.hidden_class.clone(),
            current_block: None,
        }
    }

    /// Applies the lifecycle for a freshly opened `element`.
    ///
    /// Blocks are hidden synchronously and scheduled for reveal. Containers
    /// stay visible and get tagged with their token type.
    pub fn on_open(&mut self, element: ElementId, token: TokenType) -> Category {
        let category = classify(token);
        log::trace!("open {token} as {category:?} on {element}");
        match category {
            Category::Block => {
                let hidden = self
                    .document
                    .borrow_mut()
                    .add_class(element, &self.hidden_class);
                if let Err(err) = hidden {
                    log::warn!("cannot hide {token}: {err}");
                    return category;
                }
                self.current_block = Some(element);
                self.scheduler.schedule(element);
            }
            Category::Container => {
                let tagged = self.document.borrow_mut().set_attribute(
                    element,
                    TOKEN_TYPE_ATTR,
                    token.as_str(),
                );
                if let Err(err) = tagged {
                    log::warn!("cannot tag {token}: {err}");
                }
            }
            Category::Unclassified => {}
        }
        category
    }

    /// Last block element opened.
    pub fn current_block(&self) -> Option<ElementId> {
        self.current_block
    }

    /// Elements still waiting for their reveal.
    pub fn pending(&self) -> Vec<ElementId> {
        self.scheduler.pending()
    }

    pub fn scheduler(&self) -> &FadeScheduler {
        &self.scheduler
    }

    /// Releases the outstanding timer without revealing anything.
    pub fn release(&self) {
        self.scheduler.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn setup() -> (SharedDocument, LifecycleTracker, ElementId) {
        let document = Document::new_shared();
        let element = {
            let mut doc = document.borrow_mut();
            let el = doc.create_element("p");
            let body = doc.body();
            doc.append_child(body, el).unwrap();
            el
        };
        let tracker = LifecycleTracker::new(
            document.clone(),
            EventLoop::new(),
            &MaterializeOptions::default(),
        );
        (document, tracker, element)
    }

    #[test]
    fn block_is_hidden_and_pending() {
        let (document, mut tracker, el) = setup();
        assert_eq!(tracker.on_open(el, TokenType::Paragraph), Category::Block);
        assert!(document.borrow().has_class(el, "stream-block"));
        assert_eq!(tracker.current_block(), Some(el));
        assert_eq!(tracker.pending(), vec![el]);
    }

    #[test]
    fn container_is_tagged_not_hidden() {
        let (document, mut tracker, el) = setup();
        assert_eq!(
            tracker.on_open(el, TokenType::ListOrdered),
            Category::Container
        );
        let doc = document.borrow();
        assert!(!doc.has_class(el, "stream-block"));
        assert_eq!(doc.attribute(el, TOKEN_TYPE_ATTR), Some("list_ordered"));
        assert!(tracker.pending().is_empty());
        assert_eq!(tracker.current_block(), None);
    }

    #[test]
    fn unclassified_is_untouched() {
        let (document, mut tracker, el) = setup();
        assert_eq!(tracker.on_open(el, TokenType::Strong), Category::Unclassified);
        let doc = document.borrow();
        assert!(doc.element(el).unwrap().classes().is_empty());
        assert!(doc.element(el).unwrap().attributes().is_empty());
    }
}
