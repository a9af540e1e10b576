use markdown_materialize_engine::{
    Attr, Document, RenderEvent, Renderer, StreamingParser, TokenType,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Records calls instead of building elements.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    depth: usize,
}

impl Renderer for Recorder {
    fn open(&mut self, event: &mut RenderEvent, token: TokenType) {
        self.depth += 1;
        event.index += 1;
        self.calls.push(format!("open {token}"));
    }

    fn close(&mut self, event: &mut RenderEvent) {
        assert!(self.depth > 0, "close without open");
        self.depth -= 1;
        event.index -= 1;
        self.calls.push("close".to_string());
    }

    fn text(&mut self, _event: &mut RenderEvent, text: &str) {
        self.calls.push(format!("text {text:?}"));
    }

    fn set_attr(&mut self, _event: &mut RenderEvent, attr: Attr, value: &str) {
        self.calls.push(format!("attr {attr:?}={value}"));
    }
}

fn parse(markdown: &str) -> Recorder {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    parser.write(markdown);
    parser.end();
    assert_eq!(parser.event().index, 0);
    parser.into_renderer()
}

#[rstest]
#[case("3. x\n", &["open list_ordered", "attr Start=3", "open list_item", "text \"x\"", "close", "close"])]
#[case("1. x\n", &["open list_ordered", "open list_item", "text \"x\"", "close", "close"])]
#[case(
    "```rust ignore\nx\n```\n",
    &["open code_fence", "attr Lang=rust", "text \"x\\n\"", "close"]
)]
#[case(
    "![alt *text*](img.png)\n",
    &["open paragraph", "open image", "attr Src=img.png", "attr Alt=alt text", "close", "close"]
)]
#[case(
    "[site](https://example.com)\n",
    &["open paragraph", "open link", "attr Href=https://example.com", "text \"site\"", "close", "close"]
)]
#[case("---\n", &["open rule", "close"])]
fn translates_events(#[case] markdown: &str, #[case] expected: &[&str]) {
    assert_eq!(parse(markdown).calls, expected);
}

#[test]
fn tables_emit_rows_and_cells() {
    let calls = parse("| a | b |\n|---|---|\n| 1 | 2 |\n").calls;
    let opens: Vec<_> = calls.iter().filter(|c| c.starts_with("open")).collect();
    assert_eq!(
        opens,
        vec![
            "open table",
            "open table_row",
            "open table_cell",
            "open table_cell",
            "open table_row",
            "open table_cell",
            "open table_cell",
        ]
    );
}

#[test]
fn task_markers_become_checkboxes() {
    let calls = parse("- [x] done\n- [ ] todo\n").calls;
    let checkboxes = calls.iter().filter(|c| *c == "open checkbox").count();
    let checked = calls.iter().filter(|c| c.starts_with("attr Checked")).count();
    assert_eq!(checkboxes, 2);
    assert_eq!(checked, 1);
}

#[test]
fn paragraph_text_grows_with_each_chunk() {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    parser.write("Hello wor");
    assert_eq!(
        parser.renderer().calls,
        ["open paragraph", "text \"Hello wor\""]
    );
    assert_eq!(parser.buffered(), "Hello wor");

    parser.write("ld\n\n");
    parser.write("Next\n");
    parser.end();
    assert_eq!(
        parser.renderer().calls,
        [
            "open paragraph",
            "text \"Hello wor\"",
            "text \"ld\"",
            "close",
            "open paragraph",
            "text \"Next\"",
            "close",
        ]
    );
}

#[test]
fn emphasis_marker_waits_for_its_word() {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    parser.write("Say *");
    assert_eq!(parser.renderer().calls, ["open paragraph", "text \"Say \""]);
    parser.write("this* now\n");
    parser.end();
    assert_eq!(
        parser.renderer().calls,
        [
            "open paragraph",
            "text \"Say \"",
            "open italic",
            "text \"this\"",
            "close",
            "text \" now\"",
            "close",
        ]
    );
}

#[test]
fn list_items_open_as_their_lines_arrive() {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    parser.write("- one\n");
    assert_eq!(
        parser.renderer().calls,
        ["open list_unordered", "open list_item", "text \"one\""]
    );
    parser.write("- ");
    assert_eq!(parser.renderer().calls.len(), 3);
    parser.write("two\n");
    assert_eq!(
        parser.renderer().calls[3..],
        ["close", "open list_item", "text \"two\""]
    );
    parser.end();
    assert_eq!(parser.event().index, 0);
}

#[test]
fn open_fence_streams_its_body() {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    parser.write("```\nfirst\n\nsec");
    assert_eq!(
        parser.renderer().calls,
        ["open code_fence", "text \"first\\n\\nsec\""]
    );
    parser.write("ond\n``");
    assert_eq!(parser.renderer().calls[2], "text \"ond\\n\"");
    parser.write("`\n\nafter\n");
    parser.end();
    assert_eq!(
        parser.renderer().calls[3..],
        ["close", "open paragraph", "text \"after\"", "close"]
    );
}

#[test]
fn block_quote_spans_marker_only_lines() {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    for chunk in ["> one\n", ">\n", "> two\n", "\nafter\n"] {
        parser.write(chunk);
    }
    parser.end();
    let opens: Vec<_> = parser
        .renderer()
        .calls
        .iter()
        .filter(|c| c.starts_with("open"))
        .collect();
    assert_eq!(
        opens,
        vec![
            "open blockquote",
            "open paragraph",
            "open paragraph",
            "open paragraph",
        ]
    );
}

#[test]
fn writes_after_end_are_ignored() {
    let root = Document::new().body();
    let mut parser = StreamingParser::new(Recorder::default(), root);
    parser.write("Done\n");
    parser.end();
    parser.write("late\n\nmore\n");
    assert!(parser.is_ended());
    assert_eq!(parser.buffered(), "");
    assert_eq!(parser.renderer().calls.len(), 3);
}
