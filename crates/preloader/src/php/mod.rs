//! PHP front end used by the preloader, on top of tree-sitter-php.
//!
//! Only the constructs the bundler rewrites get their own node kinds
//! (namespaces, `declare`, the `__DIR__`/`__FILE__` magic constants, class-like
//! declarations and `use` imports). Everything else is carried verbatim as
//! code fragments, so printing a tree that no visitor touched reproduces the
//! statements exactly as they were written.

pub mod ast;
pub mod parser;
pub mod printer;
pub mod strip;
mod tree;

pub use ast::{Ast, Node, NodeId, NodeKind};
pub use parser::parse;
pub use printer::print;
pub use strip::strip_comments;

/// A parsing failure, located by line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} on line {line}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}
