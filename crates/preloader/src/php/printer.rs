//! Turns a tree back into source text.

use std::fmt::Write;

use super::ast::{Ast, NodeId, NodeKind, StmtKind};

pub fn print(ast: &Ast) -> String {
    let mut out = String::new();
    if matches!(ast.kind(ast.root()), NodeKind::Root { open_tag: true }) {
        out.push_str("<?php\n");
    }
    out.push_str(&print_block(ast, ast.top_level()));
    out
}

/// Prints a sequence of statements, one per line.
fn print_block(ast: &Ast, statements: &[NodeId]) -> String {
    statements
        .iter()
        .map(|id| print_statement(ast, *id))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_statement(ast: &Ast, id: NodeId) -> String {
    match ast.kind(id) {
        NodeKind::Namespace(decl) => {
            let mut out = leading_comments(&decl.leading);
            let body = print_block(ast, ast.children(id));
            let name = decl.name.as_deref();
            match (decl.braced, name) {
                (true, Some(name)) => {
                    let _ = write!(out, "namespace {name} {{\n{body}\n}}");
                }
                (true, None) => {
                    let _ = write!(out, "namespace {{\n{body}\n}}");
                }
                (false, name) => {
                    let _ = write!(out, "namespace {};\n{body}", name.unwrap_or_default());
                }
            }
            out
        }
        NodeKind::Declare(decl) => {
            if decl.directives.is_empty() {
                return String::new();
            }
            let directives = decl
                .directives
                .iter()
                .map(|d| format!("{}={}", d.name, d.value))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}declare({directives});", leading_comments(&decl.leading))
        }
        NodeKind::Statement(StmtKind::Halt) => print_inline(ast, id).trim_start().to_owned(),
        _ => print_inline(ast, id).trim().to_owned(),
    }
}

fn leading_comments(trivia: &str) -> String {
    let trimmed = trivia.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

fn print_inline(ast: &Ast, id: NodeId) -> String {
    match ast.kind(id) {
        NodeKind::Code(text) => text.clone(),
        NodeKind::MagicDir => "__DIR__".to_owned(),
        NodeKind::MagicFile => "__FILE__".to_owned(),
        NodeKind::StringLiteral(value) => quote(value),
        NodeKind::InlineHtml { html, echo } => {
            format!("?>{html}{}", if *echo { "<?=" } else { "<?php" })
        }
        NodeKind::Nop => String::new(),
        NodeKind::Statement(_) | NodeKind::Root { .. } => ast
            .children(id)
            .iter()
            .map(|child| print_inline(ast, *child))
            .collect(),
        NodeKind::Namespace(_) | NodeKind::Declare(_) => print_statement(ast, id),
    }
}

/// Single-quoted PHP string literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}
