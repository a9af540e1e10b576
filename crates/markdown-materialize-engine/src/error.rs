use crate::dom::ElementId;

/// Faults raised while rendering or animating.
///
/// None of these are allowed to reach the parser: the streaming renderer logs
/// them and carries on, since losing the stream is worse than a missed
/// animation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Event index {index} out of range for {len} nodes")]
    InvalidEventIndex { index: usize, len: usize },
    #[error("Root element is no longer attached to the document")]
    DetachedRoot,
    #[error("Style sheet injected {count} times into one document")]
    DoubleInjection { count: usize },
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),
    #[error("Element {0} has no parent")]
    Orphan(ElementId),
    #[error("Cannot append {child} under {parent}: would create a cycle")]
    InvalidHierarchy { parent: ElementId, child: ElementId },
}
