//! Removal of `declare(strict_types=...)`.
//!
//! A strict-types declaration is only valid as the first statement of a
//! file, so it cannot survive concatenation. Files with different modes are
//! bundled together and the bundle header carries the mode instead.

use log::debug;

use super::NodeVisitor;
use crate::{
    error::SkipFile,
    php::{
        Ast, Node, NodeId, NodeKind,
        ast::{DeclareDecl, StmtKind},
    },
};

const STRICT_TYPES: &str = "strict_types";

#[derive(Debug, Clone, Copy, Default)]
pub struct StrictTypesVisitor;

impl NodeVisitor for StrictTypesVisitor {
    fn name(&self) -> &'static str {
        "strict_types"
    }

    fn enter_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile> {
        let NodeKind::Declare(decl) = ast.kind(id) else {
            return Ok(None);
        };
        if !decl.has_directive(STRICT_TYPES) {
            return Ok(None);
        }
        debug!("Removing strict_types declaration");

        let directives = decl
            .directives
            .iter()
            .filter(|d| !d.name.eq_ignore_ascii_case(STRICT_TYPES))
            .cloned()
            .collect::<Vec<_>>();
        let leading = decl.leading.clone();

        if !directives.is_empty() {
            return Ok(Some(Node::leaf(NodeKind::Declare(DeclareDecl {
                directives,
                leading,
            }))));
        }
        if leading.trim().is_empty() {
            return Ok(Some(Node::nop()));
        }
        // keep the comments that preceded the declaration
        let comments = ast.push(Node::leaf(NodeKind::Code(leading)));
        Ok(Some(Node::with_children(
            NodeKind::Statement(StmtKind::Other),
            vec![comments],
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        php::{parse, print},
        traverser::NodeTraverser,
    };

    fn strip(source: &str) -> String {
        let mut traverser = NodeTraverser::new();
        traverser.add_visitor(Box::new(StrictTypesVisitor));
        let mut ast = parse(source).unwrap();
        traverser
            .traverse_file(&mut ast, Path::new("/app/A.php"))
            .unwrap();
        print(&ast)
    }

    #[test]
    fn test_removes_declaration() {
        assert_eq!(
            strip("<?php\ndeclare(strict_types=1);\n\nclass A {}\n"),
            "<?php\nclass A {}"
        );
    }

    #[test]
    fn test_keeps_other_directives() {
        assert_eq!(
            strip("<?php\ndeclare(strict_types=1);\ndeclare(ticks=1);\necho 1;\n"),
            "<?php\ndeclare(ticks=1);\necho 1;"
        );
        assert_eq!(
            strip("<?php\ndeclare(ticks=1);\n"),
            "<?php\ndeclare(ticks=1);"
        );
    }

    #[test]
    fn test_keeps_leading_comments() {
        assert_eq!(
            strip("<?php\n/* license */\ndeclare(strict_types=1);\nclass A {}\n"),
            "<?php\n/* license */\nclass A {}"
        );
    }
}
