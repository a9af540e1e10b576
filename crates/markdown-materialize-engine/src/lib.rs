//! Incremental markdown rendering with fade-in of newly opened blocks.
//!
//! Markdown arrives in chunks (typically from a model's token stream) and is
//! rendered into an element tree as it arrives. Every block element is
//! hidden the moment it opens and revealed once the stream has been quiet for
//! a short period, so content materialises instead of popping in.
//!
//! ```text
//! mdstream ──blocks──▶ StreamingParser ──open/close──▶ StreamingRenderer ──▶ DefaultRenderer ──▶ Document
//!                                                             │
//!                                                             └──▶ LifecycleTracker ──▶ FadeScheduler ──▶ EventLoop
//! ```
//!
//! Everything runs on one thread. Timers only fire when the owner drives the
//! [`EventLoop`]; callers must not hold a borrow of the document while doing so.

pub mod classify;
pub mod dom;
pub mod error;
pub mod event_loop;
pub mod fade;
pub mod options;
pub mod parser;
pub mod render;
pub mod style;
pub mod token;
pub mod tracker;

pub use classify::{Category, classify};
pub use dom::{Document, ElementId, SharedDocument};
pub use error::RenderError;
pub use event_loop::{EventLoop, TimerHandle};
pub use fade::FadeScheduler;
pub use options::{MaterializeOptions, RevealPolicy};
pub use parser::{MdStreamOptions, StreamingParser};
pub use render::streaming::StreamingRenderer;
pub use render::{DefaultRenderer, RenderEvent, Renderer};
pub use token::{Attr, TokenType};
pub use tracker::LifecycleTracker;

/// Parser wired to a materialising renderer over the default one.
pub type MaterializingParser = StreamingParser<StreamingRenderer<DefaultRenderer>>;

/// Creates a parser rendering into `root` with default options.
pub fn create_streaming_parser(
    document: SharedDocument,
    root: ElementId,
    event_loop: EventLoop,
) -> MaterializingParser {
    create_streaming_parser_with_options(document, root, event_loop, MaterializeOptions::default())
}

pub fn create_streaming_parser_with_options(
    document: SharedDocument,
    root: ElementId,
    event_loop: EventLoop,
    options: MaterializeOptions,
) -> MaterializingParser {
    let base = DefaultRenderer::new(document.clone());
    let renderer = StreamingRenderer::new(base, document, root, event_loop, options);
    StreamingParser::new(renderer, root)
}
