//! Incremental front end.
//!
//! [`mdstream`] splits the incoming text into committed blocks and one pending
//! block that is still growing. Each block is translated with `pulldown-cmark`
//! into renderer calls. The pending block is rendered straight away and kept in
//! step with the source: every update re-translates it, compares the result with
//! the calls already made and only sends the difference. Elements therefore open
//! the moment their syntax is recognisable and their text fills in as it
//! arrives.
//!
//! Input that may still change meaning (a partial line that could become a list
//! marker or fence, a lone `*` that may open emphasis) is held back until it is
//! settled. When an update still contradicts what was rendered, the block is
//! discarded and rendered again.

use crate::dom::ElementId;
use crate::render::{RenderEvent, Renderer};
use crate::token::{Attr, TokenType};
use mdstream::{BlockKind, DocumentState, MdStream};
use pulldown_cmark::{BrokenLink, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use std::collections::HashMap;

pub type MdStreamOptions = mdstream::Options;

/// Reference definitions seen so far, keyed by normalised label.
type Definitions = HashMap<String, (String, String)>;

/// One renderer call.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Open(TokenType),
    Attr(Attr, String),
    Text(String),
    Close,
}

pub struct StreamingParser<R> {
    stream: MdStream,
    state: DocumentState,
    /// Committed blocks already rendered in full.
    settled: usize,
    ended: bool,
    emitter: Emitter<R>,
}

impl<R: Renderer> StreamingParser<R> {
    pub fn new(renderer: R, root: ElementId) -> Self {
        Self::with_stream_options(renderer, root, MdStreamOptions::default())
    }

    pub fn with_stream_options(renderer: R, root: ElementId, options: MdStreamOptions) -> Self {
        let mut markdown = Options::empty();
        markdown.insert(Options::ENABLE_TABLES);
        markdown.insert(Options::ENABLE_STRIKETHROUGH);
        markdown.insert(Options::ENABLE_TASKLISTS);
        Self {
            stream: MdStream::new(options),
            state: DocumentState::new(),
            settled: 0,
            ended: false,
            emitter: Emitter {
                renderer,
                event: RenderEvent::new(root),
                options: markdown,
                live: LiveBlock::default(),
                rendered: Vec::new(),
                definitions: Definitions::new(),
                unresolved: Vec::new(),
            },
        }
    }

    /// Feeds a chunk and renders what it adds.
    pub fn write(&mut self, chunk: &str) {
        if self.ended {
            log::warn!("write after end ignored ({} bytes)", chunk.len());
            return;
        }
        let update = self.stream.append(chunk);
        self.apply(update);
    }

    /// Completes the last block. Further writes are ignored.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        let update = self.stream.finalize();
        self.apply(update);
        self.emitter.unwind();
    }

    /// Source of the block still being received.
    pub fn buffered(&self) -> &str {
        if self.ended {
            return "";
        }
        self.state.pending().map_or("", |block| block.raw.as_str())
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn event(&self) -> &RenderEvent {
        &self.emitter.event
    }

    pub fn renderer(&self) -> &R {
        &self.emitter.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.emitter.renderer
    }

    pub fn into_renderer(self) -> R {
        self.emitter.renderer
    }

    fn apply(&mut self, update: mdstream::Update) {
        let applied = self.state.apply(update);
        if applied.reset {
            log::debug!("block stream reset, rendering from scratch");
            self.emitter.clear();
            self.settled = 0;
        }

        while self.settled < self.state.committed().len() {
            let block = &self.state.committed()[self.settled];
            self.emitter.commit(&block.raw);
            self.settled += 1;
        }

        if let Some(block) = self.state.pending() {
            self.emitter.preview(&block.raw, block.kind == BlockKind::CodeFence);
        }
    }
}

/// Renderer calls made for the block currently being received.
#[derive(Debug, Default)]
struct LiveBlock {
    emitted: Vec<Op>,
    depth: usize,
    /// Top-level elements opened for this block.
    elements: Vec<ElementId>,
    /// Source length at the last full translation.
    source_len: usize,
}

/// A committed block that used reference labels nobody had defined yet.
#[derive(Debug)]
struct Unresolved {
    raw: String,
    labels: Vec<String>,
    elements: Vec<ElementId>,
}

struct Emitter<R> {
    renderer: R,
    event: RenderEvent,
    options: Options,
    live: LiveBlock,
    /// Top-level elements of every rendered block, in document order.
    rendered: Vec<ElementId>,
    definitions: Definitions,
    unresolved: Vec<Unresolved>,
}

impl<R: Renderer> Emitter<R> {
    /// Renders a block that will not change any more.
    fn commit(&mut self, raw: &str) {
        let learned = self.learn_definitions(raw);
        let (ops, labels) = translate(raw, self.options, &self.definitions);
        self.sync(&ops);
        self.unwind();

        let live = std::mem::take(&mut self.live);
        if !labels.is_empty() {
            self.unresolved.push(Unresolved {
                raw: raw.to_string(),
                labels,
                elements: live.elements,
            });
        }
        self.resolve(&learned);
    }

    /// Renders the settled part of the block still being received.
    fn preview(&mut self, raw: &str, fenced: bool) {
        if fenced && self.extend_fence(raw) {
            return;
        }
        if !self.worth_translating(raw) {
            return;
        }
        self.live.source_len = raw.len();

        let (mut ops, _) = translate(stable_source(raw), self.options, &self.definitions);
        settle_tail(&mut ops);
        self.sync(&ops);
    }

    /// Re-translating a growing block costs its whole length, so long blocks
    /// are refreshed on new lines or after growing by a sixteenth.
    fn worth_translating(&self, raw: &str) -> bool {
        let seen = self.live.source_len.min(raw.len());
        if seen == 0 || !raw.is_char_boundary(seen) {
            return true;
        }
        let fresh = &raw[seen..];
        fresh.contains('\n') || fresh.len() >= (seen / 16).max(1)
    }

    /// Streams the body of an open code fence without translating it again.
    /// Returns `false` when the fence has to go through [`translate`].
    fn extend_fence(&mut self, raw: &str) -> bool {
        let Some(newline) = raw.find('\n') else {
            return self.live.emitted.is_empty();
        };
        let opening = &raw[..newline];
        if opening.starts_with([' ', '\t']) {
            return false;
        }
        let body = &raw[newline + 1..];
        let complete = body.rfind('\n').map_or(0, |i| i + 1);
        let (lines, partial) = body.split_at(complete);
        if lines.lines().next_back().is_some_and(is_fence_run) {
            return false;
        }
        let shown = if is_fence_run(partial) { lines } else { body };

        let mut header = vec![Op::Open(TokenType::CodeFence)];
        let info = opening.trim_start_matches(['`', '~']).trim();
        if let Some(lang) = info.split_whitespace().next() {
            header.push(Op::Attr(Attr::Lang, lang.to_string()));
        }

        let sent = match self.live.emitted.as_slice() {
            [] => 0,
            ops if ops == header.as_slice() => 0,
            [rest @ .., Op::Text(text)] if rest == header.as_slice() => text.len(),
            _ => return false,
        };
        if shown.len() < sent || !shown.is_char_boundary(sent) {
            return false;
        }

        if self.live.emitted.is_empty() {
            for op in &header {
                self.emit(op);
            }
            self.live.emitted = header;
        }
        let fresh = &shown[sent..];
        if !fresh.is_empty() {
            self.renderer.text(&mut self.event, fresh);
            match self.live.emitted.last_mut() {
                Some(Op::Text(text)) => text.push_str(fresh),
                _ => self.live.emitted.push(Op::Text(fresh.to_string())),
            }
        }
        true
    }

    /// Brings the live block in line with `target`.
    fn sync(&mut self, target: &[Op]) {
        let emitted = &self.live.emitted;
        let mut common = emitted
            .iter()
            .zip(target)
            .take_while(|(sent, wanted)| sent == wanted)
            .count();

        if common < emitted.len() {
            let grown = match (&emitted[common], target.get(common)) {
                (Op::Text(sent), Some(Op::Text(wanted)))
                    if common + 1 == emitted.len() && wanted.starts_with(sent.as_str()) =>
                {
                    Some(wanted[sent.len()..].to_string())
                }
                _ => None,
            };
            match grown {
                Some(tail) => {
                    self.renderer.text(&mut self.event, &tail);
                    self.live.emitted[common] = target[common].clone();
                    common += 1;
                }
                None => {
                    log::debug!(
                        "block diverged after {common} of {} calls, rendering again",
                        emitted.len()
                    );
                    self.rollback();
                    common = 0;
                }
            }
        }

        for op in &target[common..] {
            self.emit(op);
            self.live.emitted.push(op.clone());
        }
    }

    fn emit(&mut self, op: &Op) {
        match op {
            Op::Open(token) => {
                self.renderer.open(&mut self.event, *token);
                if self.live.depth == 0
                    && let Ok(element) = self.event.current()
                {
                    self.live.elements.push(element);
                    self.rendered.push(element);
                }
                self.live.depth += 1;
            }
            Op::Close => {
                self.renderer.close(&mut self.event);
                self.live.depth = self.live.depth.saturating_sub(1);
            }
            Op::Text(text) => self.renderer.text(&mut self.event, text),
            Op::Attr(attr, value) => self.renderer.set_attr(&mut self.event, *attr, value),
        }
    }

    /// Closes whatever the live block still has open.
    fn unwind(&mut self) {
        while self.live.depth > 0 {
            self.renderer.close(&mut self.event);
            self.live.depth -= 1;
        }
    }

    /// Throws away everything rendered for the live block.
    fn rollback(&mut self) {
        self.unwind();
        let live = std::mem::take(&mut self.live);
        for element in live.elements {
            self.discard(element);
        }
    }

    fn discard(&mut self, element: ElementId) {
        self.renderer.discard(element);
        self.rendered.retain(|e| *e != element);
    }

    /// Removes every rendered element and forgets all state.
    fn clear(&mut self) {
        self.unwind();
        self.live = LiveBlock::default();
        for element in std::mem::take(&mut self.rendered) {
            self.renderer.discard(element);
        }
        self.definitions.clear();
        self.unresolved.clear();
    }

    /// Records the reference definitions in `raw`. Returns the new labels.
    fn learn_definitions(&mut self, raw: &str) -> Vec<String> {
        let parser = Parser::new_ext(raw, self.options);
        let mut learned = Vec::new();
        for (label, def) in parser.reference_definitions().iter() {
            let label = normalize_label(label);
            if self.definitions.contains_key(&label) {
                continue;
            }
            let title = def.title.as_deref().unwrap_or_default().to_string();
            self.definitions
                .insert(label.clone(), (def.dest.to_string(), title));
            learned.push(label);
        }
        learned
    }

    /// Renders again, in place, the blocks waiting on any of `learned`.
    fn resolve(&mut self, learned: &[String]) {
        if learned.is_empty() {
            return;
        }
        let (ready, waiting) = std::mem::take(&mut self.unresolved)
            .into_iter()
            .partition(|block| block.labels.iter().any(|l| learned.contains(l)));
        self.unresolved = waiting;

        for block in ready {
            log::debug!("references {:?} now defined, rendering again", block.labels);
            let (ops, labels) = translate(&block.raw, self.options, &self.definitions);
            self.sync(&ops);
            self.unwind();
            let fresh = std::mem::take(&mut self.live).elements;

            if let Some(anchor) = block.elements.first() {
                for element in &fresh {
                    self.renderer.move_before(*element, *anchor);
                }
            }
            for element in block.elements {
                self.discard(element);
            }
            if !labels.is_empty() {
                self.unresolved.push(Unresolved {
                    raw: block.raw,
                    labels,
                    elements: fresh,
                });
            }
        }
    }
}

/// Translates one block into renderer calls, resolving reference links from
/// `definitions`. Also returns the labels that stayed undefined.
fn translate(
    markdown: &str,
    options: Options,
    definitions: &Definitions,
) -> (Vec<Op>, Vec<String>) {
    let mut missing = Vec::new();
    let callback = |link: BrokenLink| {
        let label = normalize_label(&link.reference);
        match definitions.get(&label) {
            Some((dest, title)) => {
                Some((CowStr::from(dest.clone()), CowStr::from(title.clone())))
            }
            None => {
                if !missing.contains(&label) {
                    missing.push(label);
                }
                None
            }
        }
    };

    let mut builder = OpBuilder::default();
    for event in Parser::new_with_broken_link_callback(markdown, options, Some(callback)) {
        builder.push(event);
    }
    (builder.ops, missing)
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collects renderer calls from parser events.
#[derive(Default)]
struct OpBuilder {
    ops: Vec<Op>,
    /// One entry per `Start`, `true` when it opened a token.
    opened: Vec<bool>,
    /// Alt text collected for the image open at the given depth.
    image_alt: Option<(usize, String)>,
}

impl OpBuilder {
    fn push(&mut self, event: Event<'_>) {
        if let Some((_, alt)) = self.image_alt.as_mut() {
            match &event {
                Event::Text(text) | Event::Code(text) => {
                    alt.push_str(text);
                    return;
                }
                Event::Start(_) => {
                    self.opened.push(false);
                    return;
                }
                _ => {}
            }
        }

        match event {
            Event::Start(tag) => {
                let token = token_for(&tag);
                if let Some(token) = token {
                    self.ops.push(Op::Open(token));
                    self.start_attrs(&tag);
                }
                self.opened.push(token.is_some());
                if token == Some(TokenType::Image) {
                    self.image_alt = Some((self.opened.len(), String::new()));
                }
            }
            Event::End(_) => {
                let depth = self.opened.len();
                let opened = self.opened.pop().unwrap_or(false);
                if let Some((image_depth, alt)) = self.image_alt.take() {
                    if image_depth == depth {
                        self.ops.push(Op::Attr(Attr::Alt, alt));
                    } else {
                        self.image_alt = Some((image_depth, alt));
                    }
                }
                if opened {
                    self.ops.push(Op::Close);
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.text(&text),
            Event::Code(text) => {
                self.ops.push(Op::Open(TokenType::Code));
                self.text(&text);
                self.ops.push(Op::Close);
            }
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => self.leaf(TokenType::LineBreak),
            Event::Rule => self.leaf(TokenType::Rule),
            Event::TaskListMarker(checked) => {
                self.ops.push(Op::Open(TokenType::Checkbox));
                if checked {
                    self.ops.push(Op::Attr(Attr::Checked, String::new()));
                }
                self.ops.push(Op::Close);
            }
            _ => {}
        }
    }

    /// Appends text, merging with a preceding text call.
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.ops.last_mut() {
            Some(Op::Text(last)) => last.push_str(text),
            _ => self.ops.push(Op::Text(text.to_string())),
        }
    }

    fn leaf(&mut self, token: TokenType) {
        self.ops.push(Op::Open(token));
        self.ops.push(Op::Close);
    }

    fn start_attrs(&mut self, tag: &Tag<'_>) {
        let attr = match tag {
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => info
                .split_whitespace()
                .next()
                .map(|lang| (Attr::Lang, lang.to_string())),
            Tag::List(Some(start)) if *start != 1 => Some((Attr::Start, start.to_string())),
            Tag::Link { dest_url, .. } => Some((Attr::Href, dest_url.to_string())),
            Tag::Image { dest_url, .. } => Some((Attr::Src, dest_url.to_string())),
            _ => None,
        };
        if let Some((attr, value)) = attr {
            self.ops.push(Op::Attr(attr, value));
        }
    }
}

fn token_for(tag: &Tag<'_>) -> Option<TokenType> {
    let token = match tag {
        Tag::Paragraph => TokenType::Paragraph,
        Tag::Heading { level, .. } => TokenType::heading(*level as u8),
        Tag::BlockQuote(_) => TokenType::Blockquote,
        Tag::CodeBlock(CodeBlockKind::Fenced(_)) => TokenType::CodeFence,
        Tag::CodeBlock(CodeBlockKind::Indented) => TokenType::CodeBlock,
        Tag::List(Some(_)) => TokenType::ListOrdered,
        Tag::List(None) => TokenType::ListUnordered,
        Tag::Item => TokenType::ListItem,
        Tag::Table(_) => TokenType::Table,
        Tag::TableHead | Tag::TableRow => TokenType::TableRow,
        Tag::TableCell => TokenType::TableCell,
        Tag::Emphasis => TokenType::Italic,
        Tag::Strong => TokenType::Strong,
        Tag::Strikethrough => TokenType::Strike,
        Tag::Link { .. } => TokenType::Link,
        Tag::Image { .. } => TokenType::Image,
        _ => return None,
    };
    Some(token)
}

/// The part of a growing block whose block structure is settled: a trailing
/// partial line made only of marker characters is dropped, and a lone pipe row
/// waits for its delimiter row.
fn stable_source(raw: &str) -> &str {
    let complete = raw.rfind('\n').map_or(0, |i| i + 1);
    let visible = if could_become_marker(&raw[complete..]) {
        &raw[..complete]
    } else {
        raw
    };
    if visible.trim_start().starts_with('|') && visible.lines().count() < 2 {
        return "";
    }
    visible
}

fn could_become_marker(partial: &str) -> bool {
    partial
        .trim()
        .chars()
        .all(|c| c.is_ascii_digit() || "-*+=_#>|`~:.)[]".contains(c) || c.is_whitespace())
}

fn is_fence_run(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (line.chars().all(|c| c == '`') || line.chars().all(|c| c == '~'))
}

/// Prepares a pending block's calls for sending: elements still open at the end
/// stay open, and trailing inline text is cut where it may still turn into
/// markup.
fn settle_tail(ops: &mut Vec<Op>) {
    while ops.last() == Some(&Op::Close) {
        ops.pop();
    }

    let mut open = Vec::new();
    for op in ops.iter() {
        match op {
            Op::Open(token) => open.push(*token),
            Op::Close => {
                open.pop();
            }
            _ => {}
        }
    }
    let literal = open
        .last()
        .is_some_and(|token| token.is_preformatted() || *token == TokenType::Code);
    if literal {
        return;
    }

    if let Some(Op::Text(text)) = ops.last_mut() {
        let keep = settled_text_len(text);
        text.truncate(keep);
        if text.is_empty() {
            ops.pop();
        }
    }
}

/// Length of the prefix of `text` that later input cannot turn into markup.
fn settled_text_len(text: &str) -> usize {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for (i, &(at, c)) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| chars[j].1);
        let next = chars.get(i + 1).map(|&(_, c)| c);
        let literal = match c {
            '*' | '~' => next.is_some_and(char::is_whitespace),
            '_' => {
                next.is_some_and(char::is_whitespace)
                    || (prev.is_some_and(char::is_alphanumeric)
                        && next.is_some_and(char::is_alphanumeric))
            }
            '<' => next.is_some_and(char::is_whitespace),
            '!' => next.is_some_and(|n| n != '['),
            '&' => text[at..].contains(char::is_whitespace),
            '`' | '[' | '\\' => false,
            _ => true,
        };
        if !literal {
            return at;
        }
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(s: &str) -> Op {
        Op::Text(s.to_string())
    }

    #[rstest]
    #[case("Hello wor", "Hello wor")]
    #[case("- one\n- ", "- one\n")]
    #[case("- one\n2", "- one\n")]
    #[case("- one\n- two", "- one\n- two")]
    #[case("Title\n==", "Title\n")]
    #[case("```rust\nlet x = 1;\n``", "```rust\nlet x = 1;\n")]
    #[case("| a | b |\n", "")]
    #[case("| a | b |\n|--", "")]
    #[case("| a | b |\n|---|---|\n| 1", "| a | b |\n|---|---|\n")]
    #[case("> quoted", "> quoted")]
    fn holds_back_partial_markers(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(stable_source(raw), expected);
    }

    #[rstest]
    #[case("plain words", 11)]
    #[case("Hello *wor", 6)]
    #[case("a * b", 5)]
    #[case("snake_case name", 15)]
    #[case("trailing_", 8)]
    #[case("see [lin", 4)]
    #[case("1 < 2", 5)]
    #[case("&am", 0)]
    #[case("fish & chips", 12)]
    #[case("wow!", 3)]
    #[case("![al", 0)]
    fn settles_text_before_possible_markup(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(settled_text_len(input), expected);
    }

    #[test]
    fn pending_calls_keep_elements_open() {
        let mut ops = vec![
            Op::Open(TokenType::Paragraph),
            text("Hello *wor"),
            Op::Close,
        ];
        settle_tail(&mut ops);
        assert_eq!(ops, vec![Op::Open(TokenType::Paragraph), text("Hello ")]);
    }

    #[test]
    fn code_text_is_never_cut() {
        let mut ops = vec![
            Op::Open(TokenType::CodeFence),
            text("let x = *y;\n"),
            Op::Close,
        ];
        settle_tail(&mut ops);
        assert_eq!(ops.last(), Some(&text("let x = *y;\n")));
    }

    #[test]
    fn translation_merges_text_and_breaks() {
        let (ops, missing) = translate("one\ntwo\n", Options::empty(), &Definitions::new());
        assert_eq!(
            ops,
            vec![Op::Open(TokenType::Paragraph), text("one\ntwo"), Op::Close]
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn translation_reports_and_resolves_labels() {
        let (ops, missing) =
            translate("See [Docs].\n", Options::empty(), &Definitions::new());
        assert_eq!(missing, vec!["docs".to_string()]);
        assert_eq!(ops[1], text("See [Docs]."));

        let mut definitions = Definitions::new();
        definitions.insert("docs".to_string(), ("https://x".to_string(), String::new()));
        let (ops, missing) = translate("See [Docs].\n", Options::empty(), &definitions);
        assert!(missing.is_empty());
        assert_eq!(ops[2], Op::Open(TokenType::Link));
        assert_eq!(ops[3], Op::Attr(Attr::Href, "https://x".to_string()));
    }

    #[rstest]
    #[case("Docs", "docs")]
    #[case("  My   Site ", "my site")]
    fn labels_normalise(#[case] label: &str, #[case] expected: &str) {
        assert_eq!(normalize_label(label), expected);
    }

    #[rstest]
    #[case("```", true)]
    #[case("~~~~\n", true)]
    #[case("``` rust", false)]
    #[case("", false)]
    fn recognises_fence_runs(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_fence_run(line), expected);
    }
}
