pub mod document;
pub mod encoder;
pub mod encoding;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod serialization;
pub mod stream;
pub mod tree;
pub mod utils;
pub mod value;

pub use document::Document;
pub use encoder::{encode, EncodeOptions};
pub use encoding::TextEncoding;
pub use error::{LexError, NodeError, ParseError, SymlError};
pub use parser::parse;
pub use tree::{Node, NodeId, NodeKind, Tree};
pub use value::Value;
