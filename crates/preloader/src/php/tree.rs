//! Concrete syntax tree from tree-sitter-php.
//!
//! The grammar recovers from errors, so a tree containing an `ERROR` or
//! `MISSING` node is turned into a [`SyntaxError`] here and the rest of the
//! front end only ever sees valid trees.

use log::trace;
use tree_sitter::{Node, Parser, Tree};

use super::SyntaxError;

const HALT_COMPILER: &str = "__halt_compiler";

/// Node kinds whose text is copied as written and never looked into.
pub(crate) const OPAQUE_KINDS: [&str; 7] = [
    "string",
    "encapsed_string",
    "heredoc",
    "nowdoc",
    "shell_command_expression",
    "text",
    "text_interpolation",
];

/// A successfully parsed source file.
///
/// Everything after `__halt_compiler();` is raw data: only the code before
/// it is handed to the grammar, and the rest is kept as an opaque tail.
#[derive(Debug)]
pub(crate) struct SourceTree<'src> {
    source: &'src str,
    tree: Tree,
    /// Length of the code part of `source`
    code_len: usize,
}

impl<'src> SourceTree<'src> {
    pub(crate) fn parse(source: &'src str) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|err| SyntaxError::new(1, format!("Cannot load the PHP grammar: {err}")))?;

        let mut tree = parse_text(&mut parser, source)?;
        let mut code_len = source.len();
        if let Some(end) = halt_compiler_end(&tree, source) {
            trace!("__halt_compiler() ends the code at byte {end}");
            code_len = end;
            tree = parse_text(&mut parser, &source[..end])?;
        }

        if let Some(node) = first_error(tree.root_node()) {
            return Err(describe_error(node, source));
        }
        Ok(Self {
            source,
            tree,
            code_len,
        })
    }

    pub(crate) fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// The code part of the source, up to and including `__halt_compiler();`
    pub(crate) fn code(&self) -> &'src str {
        &self.source[..self.code_len]
    }

    /// Raw data following `__halt_compiler();`
    pub(crate) fn halt_data(&self) -> Option<&'src str> {
        (self.code_len < self.source.len()).then(|| &self.source[self.code_len..])
    }

    pub(crate) fn text(&self, node: Node<'_>) -> &'src str {
        self.slice(node.start_byte(), node.end_byte())
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'src str {
        self.source.get(start..end).unwrap_or_default()
    }
}

fn parse_text(parser: &mut Parser, text: &str) -> Result<Tree, SyntaxError> {
    parser
        .parse(text, None)
        .ok_or_else(|| SyntaxError::new(1, "The PHP parser produced no tree"))
}

/// All children, including anonymous tokens and comments.
pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Pre-order walk; `visit` returns whether to descend into the node.
pub(crate) fn walk<'tree>(node: Node<'tree>, visit: &mut impl FnMut(Node<'tree>) -> bool) {
    if visit(node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk(child, visit);
        }
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    children(node)
        .into_iter()
        .find_map(first_error)
        .or(Some(node))
}

fn describe_error(node: Node<'_>, source: &str) -> SyntaxError {
    if node.is_missing() {
        // a missing token sits where the parser gave up, so report the
        // construct that needed it
        let line = node.parent().unwrap_or(node).start_position().row + 1;
        return SyntaxError::new(line, format!("Missing '{}'", node.kind()));
    }
    let line = node.start_position().row + 1;
    let text = source
        .get(node.byte_range())
        .unwrap_or_default()
        .trim_start()
        .lines()
        .next()
        .unwrap_or_default();
    if text.is_empty() {
        return SyntaxError::new(line, "Unexpected end of file");
    }
    let snippet: String = text.chars().take(20).collect();
    SyntaxError::new(line, format!("Unexpected '{snippet}'"))
}

/// End offset of the first `__halt_compiler();` statement, if any.
fn halt_compiler_end(tree: &Tree, source: &str) -> Option<usize> {
    if !source.to_ascii_lowercase().contains(HALT_COMPILER) {
        return None;
    }
    let mut found = None;
    walk(tree.root_node(), &mut |node| {
        if found.is_some() || OPAQUE_KINDS.contains(&node.kind()) || node.kind() == "comment" {
            return false;
        }
        if node.child_count() == 0
            && source
                .get(node.byte_range())
                .is_some_and(|text| text.eq_ignore_ascii_case(HALT_COMPILER))
        {
            found = call_end(source, node.end_byte());
        }
        true
    });
    found
}

/// Offset just past `()` and the terminating `;` or `?>`.
fn call_end(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut pos = from;
    for expected in [b'(', b')'] {
        pos = skip_whitespace(bytes, pos);
        if bytes.get(pos) != Some(&expected) {
            return None;
        }
        pos += 1;
    }
    pos = skip_whitespace(bytes, pos);
    if bytes.get(pos) == Some(&b';') {
        Some(pos + 1)
    } else if bytes[pos..].starts_with(b"?>") {
        Some(pos + 2)
    } else {
        None
    }
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}
