//! Builds the coarse statement tree from the tree-sitter-php syntax tree.
//!
//! Only top-level statements and namespace bodies are split into nodes.
//! Namespaces and `declare` get dedicated nodes; every other statement keeps
//! its source text, cut around the `__DIR__`/`__FILE__` constants it
//! contains, and is classified as a class-like declaration or `use` import
//! when it is one.

use log::trace;
use tree_sitter::Node as SyntaxNode;

use super::{
    SyntaxError,
    ast::{
        Ast, DeclareDecl, Directive, NamespaceDecl, Node, NodeId, NodeKind, StmtKind, TypeDecl,
        TypeKind, UseImport,
    },
    tree::{SourceTree, children, walk},
};

/// Parents under which a `__DIR__`/`__FILE__` name is a member, method,
/// function or type name rather than the magic constant.
const NAME_POSITIONS: [&str; 11] = [
    "member_access_expression",
    "nullsafe_member_access_expression",
    "member_call_expression",
    "nullsafe_member_call_expression",
    "scoped_call_expression",
    "class_constant_access_expression",
    "function_call_expression",
    "function_definition",
    "method_declaration",
    "named_type",
    "qualified_name",
];

pub fn parse(source: &str) -> Result<Ast, SyntaxError> {
    let tree = SourceTree::parse(source)?;
    Ok(Builder::new(&tree).build())
}

struct Builder<'t, 'src> {
    tree: &'t SourceTree<'src>,
    ast: Ast,
}

impl<'t, 'src> Builder<'t, 'src> {
    fn new(tree: &'t SourceTree<'src>) -> Self {
        let open_tag = children(tree.root())
            .first()
            .is_some_and(|node| node.kind() == "php_tag");
        Self {
            tree,
            ast: Ast::new(open_tag),
        }
    }

    fn build(mut self) -> Ast {
        let root = self.tree.root();
        let nodes = children(root);
        let mut body = Vec::new();
        let mut start = 0;
        let mut rest = nodes.as_slice();

        match rest {
            [tag, tail @ ..] if tag.kind() == "php_tag" => {
                start = skip_one_whitespace(self.tree.code(), tag.end_byte());
                rest = tail;
            }
            // html before the first open tag
            [text, tag, tail @ ..] if text.kind() == "text" && tag.kind() == "php_tag" => {
                let html = self.tree.slice(0, tag.start_byte()).to_owned();
                let echo = self.tree.text(*tag) == "<?=";
                body.push(self.ast.push(Node::leaf(NodeKind::InlineHtml { html, echo })));
                start = tag.end_byte();
                rest = tail;
            }
            [text] if text.kind() == "text" => {
                let html = self.tree.code().to_owned();
                body.push(self.ast.push(Node::leaf(NodeKind::InlineHtml { html, echo: false })));
                rest = &[];
            }
            _ => {}
        }

        body.extend(self.body(rest, start, self.tree.code().len()));
        self.ast.set_top_level(body);
        if let Some(data) = self.tree.halt_data() {
            self.attach_halt_data(data);
        }
        self.ast
    }

    /// Statements of a file or namespace body. `start..end` is the byte range
    /// the body covers, so comments before the first and after the last
    /// statement are kept.
    fn body(&mut self, nodes: &[SyntaxNode<'t>], start: usize, end: usize) -> Vec<NodeId> {
        let mut body = Vec::new();
        let mut cursor = start;
        let mut index = 0;

        while let Some(node) = nodes.get(index).copied() {
            index += 1;
            match node.kind() {
                // comments stay in the text between statements
                "comment" => continue,
                "php_tag" => {}
                "text_interpolation" => {
                    self.push_comments(&mut body, cursor, node.start_byte());
                    if let Some(html) = self.inline_html(node) {
                        body.push(html);
                    }
                }
                "namespace_definition" if node.child_by_field_name("body").is_none() => {
                    // an unbraced namespace owns everything up to the next one
                    let next = nodes[index..]
                        .iter()
                        .position(|n| n.kind() == "namespace_definition")
                        .map_or(nodes.len(), |offset| index + offset);
                    let owned = &nodes[index..next];
                    let owned_end = if next < nodes.len() {
                        owned
                            .iter()
                            .rev()
                            .find(|n| n.kind() != "comment")
                            .map_or(node.end_byte(), SyntaxNode::end_byte)
                    } else {
                        end
                    };
                    let leading = self.tree.slice(cursor, node.start_byte()).to_owned();
                    let children = self.body(owned, node.end_byte(), owned_end);
                    body.push(self.namespace(node, leading, false, children));
                    cursor = owned_end;
                    index = next;
                    continue;
                }
                "namespace_definition" => {
                    let leading = self.tree.slice(cursor, node.start_byte()).to_owned();
                    let children = node
                        .child_by_field_name("body")
                        .map(|block| self.block(block))
                        .unwrap_or_default();
                    body.push(self.namespace(node, leading, true, children));
                }
                "declare_statement" => body.push(self.declare(node, cursor)),
                _ => body.push(self.statement(node, cursor)),
            }
            cursor = node.end_byte();
        }

        self.push_comments(&mut body, cursor, end);
        body
    }

    /// Statements between the braces of a `{ ... }` block.
    fn block(&mut self, block: SyntaxNode<'t>) -> Vec<NodeId> {
        let nodes = children(block);
        let (start, inner) = match nodes.split_first() {
            Some((open, rest)) if open.kind() == "{" => (open.end_byte(), rest),
            _ => (block.start_byte(), nodes.as_slice()),
        };
        let (end, inner) = match inner.split_last() {
            Some((close, rest)) if close.kind() == "}" => (close.start_byte(), rest),
            _ => (block.end_byte(), inner),
        };
        self.body(inner, start, end)
    }

    /// Keeps comments that are not followed by any statement.
    fn push_comments(&mut self, body: &mut Vec<NodeId>, start: usize, end: usize) {
        let trivia = self.tree.slice(start, end);
        if trivia.trim().is_empty() {
            return;
        }
        let code = self.ast.push(Node::leaf(NodeKind::Code(trivia.to_owned())));
        body.push(self.ast.push(Node::with_children(
            NodeKind::Statement(StmtKind::Other),
            vec![code],
        )));
    }

    fn namespace(
        &mut self,
        node: SyntaxNode<'t>,
        leading: String,
        braced: bool,
        body: Vec<NodeId>,
    ) -> NodeId {
        let name = node.child_by_field_name("name").map(|name| {
            let name = compact_name(self.tree.text(name));
            name.trim_start_matches('\\').to_owned()
        });
        trace!(
            "namespace {name:?} (braced: {braced}) on line {}",
            node.start_position().row + 1
        );
        self.ast.push(Node::with_children(
            NodeKind::Namespace(NamespaceDecl {
                name,
                braced,
                leading,
            }),
            body,
        ))
    }

    /// `?>html<?php`; a trailing close tag followed by nothing but
    /// whitespace produces no node.
    fn inline_html(&mut self, node: SyntaxNode<'t>) -> Option<NodeId> {
        let tag = children(node)
            .into_iter()
            .find(|child| child.kind() == "php_tag");
        let html_end = tag.map_or(node.end_byte(), |tag| tag.start_byte());
        let html = self
            .tree
            .slice(node.start_byte(), html_end)
            .strip_prefix("?>")
            .unwrap_or_default()
            .to_owned();
        let echo = match tag {
            Some(tag) => self.tree.text(tag) == "<?=",
            None if html.trim().is_empty() => return None,
            None => false,
        };
        Some(self.ast.push(Node::leaf(NodeKind::InlineHtml { html, echo })))
    }

    /// Semicolon-form declares become [`NodeKind::Declare`]; the block forms
    /// are ordinary statements.
    fn declare(&mut self, node: SyntaxNode<'t>, leading_start: usize) -> NodeId {
        let parts = children(node);
        let body_free = parts
            .iter()
            .rev()
            .find(|part| part.kind() != "comment")
            .is_some_and(|last| matches!(last.kind(), ";" | ")" | "empty_statement"));
        if !body_free {
            return self.statement(node, leading_start);
        }

        let directives = parts
            .iter()
            .filter(|part| part.kind() == "declare_directive")
            .filter_map(|directive| {
                let (name, value) = self.tree.text(*directive).split_once('=')?;
                Some(Directive {
                    name: name.trim().to_owned(),
                    value: value.trim().to_owned(),
                })
            })
            .collect();
        let leading = self.tree.slice(leading_start, node.start_byte()).to_owned();
        self.ast.push(Node::leaf(NodeKind::Declare(DeclareDecl {
            directives,
            leading,
        })))
    }

    fn statement(&mut self, node: SyntaxNode<'t>, leading_start: usize) -> NodeId {
        let kind = self.classify(node);
        let mut children = Vec::new();
        let mut pos = leading_start;
        for (magic, constant) in self.magic_constants(node) {
            self.push_code(&mut children, pos, magic.start_byte());
            children.push(self.ast.push(Node::leaf(constant)));
            pos = magic.end_byte();
        }
        self.push_code(&mut children, pos, node.end_byte());

        // a close tag ended the statement; make that explicit
        let text = self.tree.text(node).trim_end();
        if !text.ends_with([';', '}']) {
            children.push(self.ast.push(Node::leaf(NodeKind::Code(";".to_owned()))));
        }
        self.ast
            .push(Node::with_children(NodeKind::Statement(kind), children))
    }

    fn push_code(&mut self, children: &mut Vec<NodeId>, start: usize, end: usize) {
        let text = self.tree.slice(start, end);
        if !text.is_empty() {
            children.push(self.ast.push(Node::leaf(NodeKind::Code(text.to_owned()))));
        }
    }

    fn magic_constants(&self, node: SyntaxNode<'t>) -> Vec<(SyntaxNode<'t>, NodeKind)> {
        let mut found = Vec::new();
        walk(node, &mut |child| {
            if child.kind() != "name" {
                return true;
            }
            let identifier = child.parent().is_some_and(|parent| match parent.kind() {
                // `const __DIR__ = ...` names the constant, the value may be magic
                "const_element" => parent.start_byte() == child.start_byte(),
                kind => NAME_POSITIONS.contains(&kind),
            });
            if !identifier {
                let text = self.tree.text(child);
                if text.eq_ignore_ascii_case("__DIR__") {
                    found.push((child, NodeKind::MagicDir));
                } else if text.eq_ignore_ascii_case("__FILE__") {
                    found.push((child, NodeKind::MagicFile));
                }
            }
            false
        });
        found
    }

    fn classify(&self, node: SyntaxNode<'t>) -> StmtKind {
        let kind = match node.kind() {
            "namespace_use_declaration" => {
                return parse_use(self.tree.text(node)).map_or(StmtKind::Other, StmtKind::Use);
            }
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "trait_declaration" => TypeKind::Trait,
            "enum_declaration" => TypeKind::Enum,
            _ => return StmtKind::Other,
        };
        let Some(name) = node.child_by_field_name("name") else {
            return StmtKind::Other;
        };

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        for clause in children(node) {
            let target = match clause.kind() {
                "base_clause" => &mut extends,
                "class_interface_clause" => &mut implements,
                _ => continue,
            };
            target.extend(
                children(clause)
                    .into_iter()
                    .filter(|n| matches!(n.kind(), "name" | "qualified_name"))
                    .map(|n| compact_name(self.tree.text(n))),
            );
        }

        StmtKind::TypeDecl(TypeDecl {
            kind,
            name: self.tree.text(name).to_owned(),
            extends,
            implements,
        })
    }

    /// Appends the data after `__halt_compiler();` to the statement that
    /// holds the call, which is the last one in the file.
    fn attach_halt_data(&mut self, data: &str) {
        let mut container = self.ast.root();
        loop {
            let Some(last) = self.ast.children(container).last().copied() else {
                break;
            };
            match self.ast.kind(last) {
                NodeKind::Namespace(_) => {
                    container = last;
                    continue;
                }
                NodeKind::Statement(_) => {}
                _ => break,
            }
            let code = self.ast.push(Node::leaf(NodeKind::Code(data.to_owned())));
            let node = self.ast.node_mut(last);
            node.kind = NodeKind::Statement(StmtKind::Halt);
            node.children.push(code);
            return;
        }
        let code = self.ast.push(Node::leaf(NodeKind::Code(data.to_owned())));
        let halt = self
            .ast
            .push(Node::with_children(NodeKind::Statement(StmtKind::Halt), vec![code]));
        self.ast.node_mut(container).children.push(halt);
    }
}

/// The open tag owns one line break or space after it.
fn skip_one_whitespace(source: &str, pos: usize) -> usize {
    let rest = source.get(pos..).unwrap_or_default();
    if rest.starts_with("\r\n") {
        pos + 2
    } else if rest.starts_with([' ', '\t', '\n', '\r']) {
        pos + 1
    } else {
        pos
    }
}

/// A name as written, without whitespace.
fn compact_name(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Class imports of a `use` statement, including the group form
/// `use A\{B, C as D};`. Function and constant imports are ignored.
fn parse_use(text: &str) -> Option<Vec<UseImport>> {
    let body = text
        .trim()
        .get(3..)
        .unwrap_or_default()
        .trim()
        .trim_end_matches(';')
        .trim();
    if is_function_or_const(body) {
        return None;
    }

    let mut imports = Vec::new();
    if let Some((prefix, group)) = body.split_once('{') {
        let prefix = compact_name(prefix);
        let prefix = prefix.trim_matches('\\');
        let group = group.trim_end().trim_end_matches('}');
        for entry in group.split(',') {
            if !is_function_or_const(entry.trim()) {
                imports.extend(use_import(Some(prefix), entry));
            }
        }
    } else {
        for entry in body.split(',') {
            imports.extend(use_import(None, entry));
        }
    }
    Some(imports)
}

fn is_function_or_const(entry: &str) -> bool {
    entry.split_whitespace().next().is_some_and(|word| {
        word.eq_ignore_ascii_case("function") || word.eq_ignore_ascii_case("const")
    })
}

/// `Name` or `Name as Alias`; `None` for an empty entry, as left by a
/// trailing comma.
fn use_import(prefix: Option<&str>, entry: &str) -> Option<UseImport> {
    let mut words = entry.split_whitespace();
    let name = words.next()?.trim_start_matches('\\');
    let alias = match (words.next(), words.next()) {
        (Some(keyword), Some(alias)) if keyword.eq_ignore_ascii_case("as") => Some(alias),
        _ => None,
    };
    let full = match prefix {
        Some(prefix) => format!("{prefix}\\{name}"),
        None => name.to_owned(),
    };
    let alias = alias.map_or_else(
        || full.rsplit('\\').next().unwrap_or(&full).to_owned(),
        str::to_owned,
    );
    Some(UseImport { name: full, alias })
}
