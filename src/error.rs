use crate::utils::caret_snippet;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SymlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Node(#[from] NodeError),

    #[error("No file is bound to this document")]
    #[diagnostic(
        code(syml::no_path),
        help("Bind a file with `Document::set_path`, or call `load_from` with an explicit path.")
    )]
    NoPath,
}

/// Malformed line structure found while tokenizing.
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message} (line {line}, column {column})")]
#[diagnostic(
    code(syml::lex),
    help("Every non-comment line must be `key:`, `key: value` or `- item`.")
)]
pub struct LexError {
    pub(crate) message: String,
    #[source_code]
    pub(crate) src: NamedSource<String>,
    #[label("here")]
    pub(crate) span: SourceSpan,
    pub(crate) line_text: String,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

/// A token arrived out of order, or an indent did not line up with any open level.
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message} (line {line}, column {column})")]
#[diagnostic(code(syml::parse))]
pub struct ParseError {
    pub(crate) message: String,
    #[source_code]
    pub(crate) src: NamedSource<String>,
    #[label("{message}")]
    pub(crate) span: SourceSpan,
    pub(crate) line_text: String,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

macro_rules! positioned_error_accessors {
    ($ty:ty) => {
        impl $ty {
            pub fn message(&self) -> &str {
                &self.message
            }

            /// The full source the error was raised against.
            pub fn input(&self) -> &NamedSource<String> {
                &self.src
            }

            /// The offending line, without its line terminator.
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

            /// Message, position and the offending line with a caret under the column.
            pub fn snippet(&self) -> String {
                caret_snippet(&self.message, &self.line_text, self.line, self.column)
            }
        }
    };
}

positioned_error_accessors!(LexError);
positioned_error_accessors!(ParseError);

/// Structural errors raised when mutating a document tree.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Invalid node name `{0}`: names must be non-empty and encodable as a key")]
    #[diagnostic(
        code(syml::node::invalid_name),
        help("Names cannot contain `.`, `:`, `#` or line breaks, and cannot start with whitespace or `-`.")
    )]
    InvalidName(String),

    #[error("Cycle detected: `{node}` cannot be placed below `{target}`")]
    #[diagnostic(code(syml::node::cycle))]
    Cycle { node: String, target: String },

    #[error("The root node cannot hold a value")]
    #[diagnostic(code(syml::node::root_value))]
    RootValue,
}
