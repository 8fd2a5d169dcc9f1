use crate::error::{ParseError, SymlError};
use crate::lexer::{lex_named, Token, TokenKind, TokenType};
use crate::stream::TokenStream;
use crate::tree::{NodeId, NodeKind, Tree};
use crate::value::Value;
use miette::NamedSource;

const EXPECT_INDENT: &[TokenKind] = &[TokenKind::Indent];
const EXPECT_LINE: &[TokenKind] = &[TokenKind::Key, TokenKind::Comment, TokenKind::ListItem];
const EXPECT_COMMENT: &[TokenKind] = &[TokenKind::Comment];
const EXPECT_LIST_ITEM: &[TokenKind] = &[TokenKind::ListItem];
const EXPECT_COLON: &[TokenKind] = &[TokenKind::Colon];
const EXPECT_VALUE_OR_BREAK: &[TokenKind] = &[TokenKind::Value, TokenKind::LineBreak];
const EXPECT_BREAK: &[TokenKind] = &[TokenKind::LineBreak];

/// An open indentation level: its width and the node that owns its keys.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndentFrame {
    width: usize,
    parent: NodeId,
}

/// Everything the parser remembers between two tokens.
///
/// Kept apart from the token source so that a sequence of tokens can be replayed
/// through [`ParseState::step`] directly.
#[derive(Debug, Clone)]
pub(crate) struct ParseState {
    expected: &'static [TokenKind],
    root_frame: IndentFrame,
    frames: Vec<IndentFrame>,
    current: Option<NodeId>,
    comment: Option<String>,
}

impl ParseState {
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            expected: EXPECT_INDENT,
            root_frame: IndentFrame {
                width: 0,
                parent: root,
            },
            frames: Vec::new(),
            current: None,
            comment: None,
        }
    }

    /// Nesting depth; 0 for keys of the root.
    pub(crate) fn level(&self) -> usize {
        self.frames.len()
    }

    fn top(&self) -> IndentFrame {
        self.frames.last().copied().unwrap_or(self.root_frame)
    }

    /// Applies one token. `next` is the token after it, if any.
    /// On failure returns the message for a parse error at `token`.
    pub(crate) fn step(
        &mut self,
        tree: &mut Tree,
        token: &Token,
        next: Option<&Token>,
    ) -> Result<(), String> {
        let kind = token.kind();
        if !self.expected.contains(&kind) {
            return Err(self.unexpected(kind));
        }
        match token.ttype() {
            TokenType::Indent(width) => self.indent(tree, *width, next),
            TokenType::Comment(text) => {
                self.comment(text.as_deref());
                Ok(())
            }
            TokenType::Key(name) => self.key(tree, name),
            TokenType::Colon => {
                self.expected = EXPECT_VALUE_OR_BREAK;
                Ok(())
            }
            TokenType::Value(text) => self.value(tree, text),
            TokenType::ListItem(item) => self.list_item(tree, item),
            TokenType::LineBreak => {
                self.expected = EXPECT_INDENT;
                Ok(())
            }
        }
    }

    fn indent(&mut self, tree: &Tree, width: usize, next: Option<&Token>) -> Result<(), String> {
        // Comments and list items never open or close a level.
        match next.map(Token::kind) {
            Some(TokenKind::Comment) => {
                self.expected = EXPECT_COMMENT;
                return Ok(());
            }
            Some(TokenKind::ListItem) => {
                self.expected = EXPECT_LIST_ITEM;
                return Ok(());
            }
            _ => {}
        }

        let current_width = self.top().width;
        if width > current_width {
            let Some(parent) = self.current.filter(|&id| tree[id].is_branch()) else {
                return Err(format!(
                    "Indent mismatch! Expected {current_width} spaces, but found {width}"
                ));
            };
            self.frames.push(IndentFrame { width, parent });
        } else if width < current_width {
            while width < self.top().width {
                self.frames.pop();
            }
            let landed = self.top().width;
            if width != landed {
                return Err(format!(
                    "Indent mismatch! Expected {landed} spaces, but found only {width}"
                ));
            }
        }

        self.expected = EXPECT_LINE;
        Ok(())
    }

    fn comment(&mut self, text: Option<&str>) {
        match text {
            // A blank line separates a comment from whatever follows.
            None => self.comment = None,
            Some(text) => {
                let buffer = self.comment.get_or_insert_with(String::new);
                buffer.push_str(if text.is_empty() { " " } else { text });
                buffer.push('\n');
            }
        }
        self.expected = EXPECT_BREAK;
    }

    fn key(&mut self, tree: &mut Tree, name: &str) -> Result<(), String> {
        let node = tree
            .resolve_or_create(self.top().parent, name)
            .map_err(|err| err.to_string())?;
        if let Some(mut comment) = self.comment.take() {
            comment.pop();
            tree.set_comment(node, Some(comment));
        }
        self.current = Some(node);
        self.expected = EXPECT_COLON;
        Ok(())
    }

    fn value(&mut self, tree: &mut Tree, text: &str) -> Result<(), String> {
        let node = self.current.ok_or("Value without a key.")?;
        tree.set_value(node, Value::infer(text))
            .map_err(|err| err.to_string())?;
        self.expected = EXPECT_BREAK;
        Ok(())
    }

    fn list_item(&mut self, tree: &mut Tree, item: &str) -> Result<(), String> {
        let node = self.current.ok_or("List item without a key.")?;
        let starts_list = matches!(tree[node].kind(), NodeKind::Branch(children) if children.is_empty());
        if starts_list {
            tree.set_value(node, Value::List(vec![item.to_string()]))
                .map_err(|err| err.to_string())?;
        } else if let Some(Value::List(items)) = tree.value_mut(node) {
            items.push(item.to_string());
        } else {
            return Err("Unexpected data object in node.".to_string());
        }
        self.expected = EXPECT_BREAK;
        Ok(())
    }

    fn unexpected(&self, found: TokenKind) -> String {
        match self.expected {
            [only] => format!("Expected {only}, but found {found}"),
            many => {
                let names: Vec<String> = many.iter().map(ToString::to_string).collect();
                format!("Expected one of {}, but found {found}", names.join(", "))
            }
        }
    }
}

/// The SYML parser: a state machine over a token stream that builds a [`Tree`].
#[derive(Debug)]
pub struct Parser {
    source: NamedSource<String>,
    tokens: TokenStream,
}

impl Parser {
    pub fn new(source_text: &str) -> Result<Self, SymlError> {
        Self::new_with_name(source_text, "source.syml")
    }

    /// Lexes `source_text` up front; lex errors surface here.
    pub fn new_with_name(source_text: &str, name: &str) -> Result<Self, SymlError> {
        let tokens = lex_named(source_text, name)?;
        Ok(Self::from_stream(
            tokens,
            NamedSource::new(name, source_text.to_string()),
        ))
    }

    /// Wraps an already lexed stream. `source` is only used for diagnostics.
    pub fn from_stream(tokens: TokenStream, source: NamedSource<String>) -> Self {
        Self { source, tokens }
    }

    /// Populates `root` from the token stream.
    ///
    /// Stops at the first error. Nodes created before the error stay in `tree`, so
    /// callers that need all-or-nothing behavior parse into a fresh tree.
    pub fn parse_into(mut self, tree: &mut Tree, root: NodeId) -> Result<(), ParseError> {
        let mut state = ParseState::new(root);
        while let Some(token) = self.tokens.next() {
            log::trace!("level {}: {}", state.level(), token);
            if let Err(message) = state.step(tree, &token, self.tokens.peek()) {
                return Err(self.error(&token, message));
            }
        }
        Ok(())
    }

    /// Parses into a fresh tree.
    pub fn parse_tree(self) -> Result<Tree, ParseError> {
        let mut tree = Tree::new();
        let root = tree.root();
        self.parse_into(&mut tree, root)?;
        Ok(tree)
    }

    fn error(&self, token: &Token, message: String) -> ParseError {
        ParseError {
            message,
            src: self.source.clone(),
            span: (token.pos_start(), token.pos_end() - token.pos_start()).into(),
            line_text: token.line_text().to_string(),
            line: token.line(),
            column: token.column(),
        }
    }
}

/// Lexes and parses `source_text` into a new tree.
pub fn parse(source_text: &str) -> Result<Tree, SymlError> {
    parse_named(source_text, "source.syml")
}

/// Like [`parse`], with a source name for diagnostics.
pub fn parse_named(source_text: &str, name: &str) -> Result<Tree, SymlError> {
    Ok(Parser::new_with_name(source_text, name)?.parse_tree()?)
}
