//! Structural token types emitted by the parser.
//!
//! A token type identifies one markdown construct (paragraph, heading, list,
//! ...). Values are compared by equality only; the renderer maps each one to
//! an element tag.

use std::fmt;

/// A structural markdown construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Document,
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    /// Indented code block.
    CodeBlock,
    /// Fenced code block (``` or ~~~).
    CodeFence,
    /// Inline code span.
    Code,
    Italic,
    Strong,
    Strike,
    Link,
    Image,
    Blockquote,
    LineBreak,
    /// Thematic break (`---`).
    Rule,
    ListUnordered,
    ListOrdered,
    ListItem,
    Checkbox,
    Table,
    TableRow,
    TableCell,
}

impl TokenType {
    /// Every token type, in declaration order.
    pub const ALL: [TokenType; 26] = [
        TokenType::Document,
        TokenType::Paragraph,
        TokenType::Heading1,
        TokenType::Heading2,
        TokenType::Heading3,
        TokenType::Heading4,
        TokenType::Heading5,
        TokenType::Heading6,
        TokenType::CodeBlock,
        TokenType::CodeFence,
        TokenType::Code,
        TokenType::Italic,
        TokenType::Strong,
        TokenType::Strike,
        TokenType::Link,
        TokenType::Image,
        TokenType::Blockquote,
        TokenType::LineBreak,
        TokenType::Rule,
        TokenType::ListUnordered,
        TokenType::ListOrdered,
        TokenType::ListItem,
        TokenType::Checkbox,
        TokenType::Table,
        TokenType::TableRow,
        TokenType::TableCell,
    ];

    /// Heading token for a level in `1..=6`, clamping anything outside.
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => TokenType::Heading1,
            2 => TokenType::Heading2,
            3 => TokenType::Heading3,
            4 => TokenType::Heading4,
            5 => TokenType::Heading5,
            _ => TokenType::Heading6,
        }
    }

    /// Stable lowercase name, used for `data-token-type` attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Document => "document",
            TokenType::Paragraph => "paragraph",
            TokenType::Heading1 => "heading_1",
            TokenType::Heading2 => "heading_2",
            TokenType::Heading3 => "heading_3",
            TokenType::Heading4 => "heading_4",
            TokenType::Heading5 => "heading_5",
            TokenType::Heading6 => "heading_6",
            TokenType::CodeBlock => "code_block",
            TokenType::CodeFence => "code_fence",
            TokenType::Code => "code",
            TokenType::Italic => "italic",
            TokenType::Strong => "strong",
            TokenType::Strike => "strike",
            TokenType::Link => "link",
            TokenType::Image => "image",
            TokenType::Blockquote => "blockquote",
            TokenType::LineBreak => "line_break",
            TokenType::Rule => "rule",
            TokenType::ListUnordered => "list_unordered",
            TokenType::ListOrdered => "list_ordered",
            TokenType::ListItem => "list_item",
            TokenType::Checkbox => "checkbox",
            TokenType::Table => "table",
            TokenType::TableRow => "table_row",
            TokenType::TableCell => "table_cell",
        }
    }

    /// HTML tag the default renderer creates for this token.
    ///
    /// Code blocks are wrapped: the renderer creates a `pre` and the returned
    /// `code` element inside it.
    pub fn tag(self) -> &'static str {
        match self {
            TokenType::Document => "div",
            TokenType::Paragraph => "p",
            TokenType::Heading1 => "h1",
            TokenType::Heading2 => "h2",
            TokenType::Heading3 => "h3",
            TokenType::Heading4 => "h4",
            TokenType::Heading5 => "h5",
            TokenType::Heading6 => "h6",
            TokenType::CodeBlock | TokenType::CodeFence | TokenType::Code => "code",
            TokenType::Italic => "em",
            TokenType::Strong => "strong",
            TokenType::Strike => "s",
            TokenType::Link => "a",
            TokenType::Image => "img",
            TokenType::Blockquote => "blockquote",
            TokenType::LineBreak => "br",
            TokenType::Rule => "hr",
            TokenType::ListUnordered => "ul",
            TokenType::ListOrdered => "ol",
            TokenType::ListItem => "li",
            TokenType::Checkbox => "input",
            TokenType::Table => "table",
            TokenType::TableRow => "tr",
            TokenType::TableCell => "td",
        }
    }

    /// Whether the rendered element sits inside a `pre` wrapper.
    pub fn is_preformatted(self) -> bool {
        matches!(self, TokenType::CodeBlock | TokenType::CodeFence)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes the parser can attach to the element currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    Href,
    Src,
    Alt,
    /// Code fence info string; rendered as a `language-*` class.
    Lang,
    Checked,
    /// Start number of an ordered list.
    Start,
}

impl Attr {
    /// The HTML attribute name this maps onto.
    pub fn html_name(self) -> &'static str {
        match self {
            Attr::Href => "href",
            Attr::Src => "src",
            Attr::Alt => "alt",
            Attr::Lang => "class",
            Attr::Checked => "checked",
            Attr::Start => "start",
        }
    }
}
