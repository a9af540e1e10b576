use crate::token::TokenType;

/// How the lifecycle tracker treats an opened element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Terminal structural unit that accretes content and fades in by itself.
    Block,
    /// Multi-child wrapper; its children drive visibility, it starts visible.
    Container,
    /// No special handling.
    Unclassified,
}

/// Tokens that individually fade in.
pub const BLOCK_TOKENS: [TokenType; 13] = [
    TokenType::Paragraph,
    TokenType::Heading1,
    TokenType::Heading2,
    TokenType::Heading3,
    TokenType::Heading4,
    TokenType::Heading5,
    TokenType::Heading6,
    TokenType::ListItem,
    TokenType::CodeBlock,
    TokenType::CodeFence,
    TokenType::Blockquote,
    TokenType::TableRow,
    TokenType::Rule,
];

/// Wrappers whose own open never triggers a transition.
pub const CONTAINER_TOKENS: [TokenType; 3] = [
    TokenType::ListUnordered,
    TokenType::ListOrdered,
    TokenType::Table,
];

/// Classifies a token type. Must agree with [`BLOCK_TOKENS`] and
/// [`CONTAINER_TOKENS`].
pub fn classify(token: TokenType) -> Category {
    match token {
        TokenType::Paragraph
        | TokenType::Heading1
        | TokenType::Heading2
        | TokenType::Heading3
        | TokenType::Heading4
        | TokenType::Heading5
        | TokenType::Heading6
        | TokenType::ListItem
        | TokenType::CodeBlock
        | TokenType::CodeFence
        | TokenType::Blockquote
        | TokenType::TableRow
        | TokenType::Rule => Category::Block,
        TokenType::ListUnordered | TokenType::ListOrdered | TokenType::Table => {
            Category::Container
        }
        _ => Category::Unclassified,
    }
}
