use crate::error::LexError;
use crate::stream::TokenStream;
use crate::utils::column_of;
use miette::NamedSource;
use std::fmt;
use std::sync::Arc;

/// Leading tabs advance the indent to the next multiple of this many columns.
pub const TAB_WIDTH: usize = 4;

/// Represents the different kinds of tokens that the lexer can produce.
/// Each source line becomes a short, fixed-shape run of these.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenType {
    /// Leading whitespace of a line, measured in columns. Emitted for every line, even at width 0.
    Indent(usize),
    /// End of a source line.
    LineBreak,
    /// A `#` comment, holding everything after the `#` verbatim.
    /// `None` stands for a blank line.
    Comment(Option<String>),
    /// The text before the colon of a node line.
    Key(String),
    /// The `:` of a node line.
    Colon,
    /// The trimmed inline value after `: `.
    Value(String),
    /// The raw text after `- ` on a list item line.
    ListItem(String),
}

/// Payload-free discriminant of [`TokenType`], used by the parser's expectation table.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    Indent,
    LineBreak,
    Comment,
    Key,
    Colon,
    Value,
    ListItem,
}

impl TokenType {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenType::Indent(_) => TokenKind::Indent,
            TokenType::LineBreak => TokenKind::LineBreak,
            TokenType::Comment(_) => TokenKind::Comment,
            TokenType::Key(_) => TokenKind::Key,
            TokenType::Colon => TokenKind::Colon,
            TokenType::Value(_) => TokenKind::Value,
            TokenType::ListItem(_) => TokenKind::ListItem,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Indent => "INDENT",
            TokenKind::LineBreak => "LINEBREAK",
            TokenKind::Comment => "COMMENT",
            TokenKind::Key => "KEY",
            TokenKind::Colon => "COLON",
            TokenKind::Value => "VALUE",
            TokenKind::ListItem => "LISTITEM",
        };
        f.write_str(name)
    }
}

/// A token with its type and position.
///
/// Tokens are immutable once the lexer hands them out. The line text is shared by
/// every token of the same line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    ttype: TokenType,
    line_text: Arc<str>,
    line: usize,
    column: usize,
    pos_start: usize,
    pos_end: usize,
}

impl Token {
    pub fn new(
        ttype: TokenType,
        line_text: Arc<str>,
        line: usize,
        column: usize,
        pos_start: usize,
        pos_end: usize,
    ) -> Token {
        Token {
            ttype,
            line_text,
            line,
            column,
            pos_start,
            pos_end,
        }
    }

    pub fn ttype(&self) -> &TokenType {
        &self.ttype
    }

    pub fn kind(&self) -> TokenKind {
        self.ttype.kind()
    }

    /// The source line this token was cut from.
    pub fn line_text(&self) -> &str {
        &self.line_text
    }

    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column number.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Byte offset of the token in the whole input.
    pub fn pos_start(&self) -> usize {
        self.pos_start
    }

    pub fn pos_end(&self) -> usize {
        self.pos_end
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ttype {
            TokenType::Indent(width) => write!(f, "INDENT[amount={width}]"),
            TokenType::LineBreak => f.write_str("LINEBREAK"),
            TokenType::Comment(Some(text)) => write!(f, "COMMENT[{text}]"),
            TokenType::Comment(None) => f.write_str("COMMENT[]"),
            TokenType::Key(key) => write!(f, "KEY[{key}]"),
            TokenType::Colon => f.write_str("COLON"),
            TokenType::Value(value) => write!(f, "VALUE[{value}]"),
            TokenType::ListItem(item) => write!(f, "LISTITEM[{item}]"),
        }
    }
}

/// The line currently being tokenized.
struct Line<'a> {
    text: &'a str,
    shared: Arc<str>,
    number: usize,
    offset: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    name: String,
    tokens: Vec<Token>,
    line_count: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::new_with_name(input, "source.syml")
    }

    /// `name` only shows up in diagnostics.
    pub fn new_with_name(input: &'a str, name: impl Into<String>) -> Self {
        Self {
            input,
            name: name.into(),
            tokens: Vec::new(),
            line_count: 0,
        }
    }

    /// Tokenizes the whole input, one line at a time.
    ///
    /// Lines are split on `\n` with an optional trailing `\r` removed. A newline at the
    /// very end of the input does not start another line.
    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let input = self.input;
        let mut offset = 0;
        let mut lines = input.split('\n').peekable();
        while let Some(raw) = lines.next() {
            if raw.is_empty() && lines.peek().is_none() {
                break;
            }
            let text = raw.strip_suffix('\r').unwrap_or(raw);
            self.line_count += 1;
            let line = Line {
                text,
                shared: Arc::from(text),
                number: self.line_count,
                offset,
            };
            log::trace!("lexing line {}: {:?}", line.number, text);
            self.line(&line)?;
            offset += raw.len() + 1;
        }
        Ok(self.tokens)
    }

    fn line(&mut self, line: &Line<'_>) -> Result<(), LexError> {
        let start = self.indent(line);
        let rest = &line.text[start..];

        // Blank lines become empty comments so the parser can treat them as separators.
        if rest.trim().is_empty() {
            self.push(line, TokenType::Comment(None), start, line.text.len());
            self.push(line, TokenType::LineBreak, line.text.len(), line.text.len());
            return Ok(());
        }

        match rest.as_bytes()[0] {
            b'#' => self.comment(line, start),
            b'-' => self.list_item(line, start)?,
            _ => self.node(line, start)?,
        }

        self.push(line, TokenType::LineBreak, line.text.len(), line.text.len());
        Ok(())
    }

    /// Emits the indent token and returns the byte index of the first non-indent character.
    fn indent(&mut self, line: &Line<'_>) -> usize {
        let mut width = 0;
        let mut end = line.text.len();
        for (i, c) in line.text.char_indices() {
            match c {
                ' ' => width += 1,
                '\t' => width += TAB_WIDTH - width % TAB_WIDTH,
                _ => {
                    end = i;
                    break;
                }
            }
        }
        self.push(line, TokenType::Indent(width), 0, end);
        end
    }

    fn comment(&mut self, line: &Line<'_>, start: usize) {
        let text = line.text[start + 1..].to_string();
        self.push(line, TokenType::Comment(Some(text)), start, line.text.len());
    }

    fn list_item(&mut self, line: &Line<'_>, start: usize) -> Result<(), LexError> {
        let after = &line.text[start + 1..];
        if !after.starts_with(' ') {
            return Err(self.error(
                line,
                start + 1,
                "List items must have a space between the hyphen and the first symbol.",
            ));
        }
        let item = after[1..].to_string();
        self.push(line, TokenType::ListItem(item), start, line.text.len());
        Ok(())
    }

    fn node(&mut self, line: &Line<'_>, start: usize) -> Result<(), LexError> {
        let rest = &line.text[start..];
        let mut colon = None;
        for (i, c) in rest.char_indices() {
            match c {
                ':' => {
                    colon = Some(start + i);
                    break;
                }
                '#' => {
                    return Err(self.error(
                        line,
                        start + i,
                        "Illegal character in key. The pound sign # is reserved for comments.",
                    ))
                }
                _ => {}
            }
        }

        let Some(colon) = colon else {
            return Err(self.error(
                line,
                line.text.trim_end().len(),
                "A key must always be followed by a colon.",
            ));
        };

        let key = line.text[start..colon].to_string();
        self.push(line, TokenType::Key(key), start, colon);
        self.push(line, TokenType::Colon, colon, colon + 1);

        let after = &line.text[colon + 1..];
        if after.trim().is_empty() {
            return Ok(());
        }
        if !after.starts_with(' ') {
            return Err(self.error(
                line,
                colon + 1,
                "There must be a space between the colon and the value.",
            ));
        }

        let raw = &after[1..];
        let value = raw.trim();
        if value.is_empty() {
            return Ok(());
        }
        let value_start = colon + 2 + (raw.len() - raw.trim_start().len());
        self.push(
            line,
            TokenType::Value(value.to_string()),
            value_start,
            value_start + value.len(),
        );
        Ok(())
    }

    fn push(&mut self, line: &Line<'_>, ttype: TokenType, start: usize, end: usize) {
        self.tokens.push(Token::new(
            ttype,
            Arc::clone(&line.shared),
            line.number,
            column_of(line.text, start),
            line.offset + start,
            line.offset + end,
        ));
    }

    fn error(&self, line: &Line<'_>, at: usize, message: &str) -> LexError {
        let at = at.min(line.text.len());
        LexError {
            message: message.to_string(),
            src: NamedSource::new(self.name.clone(), self.input.to_string()),
            span: (line.offset + at, 0).into(),
            line_text: line.text.to_string(),
            line: line.number,
            column: column_of(line.text, at),
        }
    }
}

/// Tokenizes `input` into a stream ready for the parser.
pub fn lex(input: &str) -> Result<TokenStream, LexError> {
    lex_named(input, "source.syml")
}

/// Like [`lex`], with a source name for diagnostics.
pub fn lex_named(input: &str, name: &str) -> Result<TokenStream, LexError> {
    Lexer::new_with_name(input, name).lex().map(TokenStream::new)
}
