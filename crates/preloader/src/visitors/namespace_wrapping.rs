//! Wraps code that sits outside of any namespace in a global namespace block.

use log::trace;

use super::{FileContext, NodeVisitor};
use crate::{
    error::SkipFile,
    php::{Ast, Node, NodeId, NodeKind, ast::NamespaceDecl},
};

/// Puts every top-level statement into a namespace.
///
/// Each run of consecutive statements at namespace depth zero becomes one
/// `namespace { ... }` block, so imports stay in scope of the code that uses
/// them and a statement split by inline HTML is never torn apart. `declare`
/// statements stay outside, in front of the blocks. The depth goes up on
/// entering a namespace (including one this visitor created) and down on
/// leaving it, so the two always balance.
#[derive(Debug, Clone, Default)]
pub struct NamespaceWrappingVisitor {
    depth: usize,
}

impl NamespaceWrappingVisitor {
    fn wrap_top_level(ast: &mut Ast, root: NodeId) -> Option<Node> {
        let mut top_level = Vec::new();
        let mut run = Vec::new();
        let mut wrapped = false;

        let flush = |ast: &mut Ast, run: &mut Vec<NodeId>, top_level: &mut Vec<NodeId>| {
            if run.is_empty() {
                return false;
            }
            trace!("Wrapping {} top-level statement(s) in a global namespace", run.len());
            top_level.push(ast.push(Node::with_children(
                NodeKind::Namespace(NamespaceDecl::global()),
                std::mem::take(run),
            )));
            true
        };

        for id in ast.children(root).to_vec() {
            if matches!(
                ast.kind(id),
                NodeKind::Statement(_) | NodeKind::InlineHtml { .. }
            ) {
                run.push(id);
            } else {
                wrapped |= flush(ast, &mut run, &mut top_level);
                top_level.push(id);
            }
        }
        wrapped |= flush(ast, &mut run, &mut top_level);

        wrapped.then(|| Node::with_children(ast.kind(root).clone(), top_level))
    }
}

impl NodeVisitor for NamespaceWrappingVisitor {
    fn name(&self) -> &'static str {
        "namespace_wrapping"
    }

    fn set_file(&mut self, _file: &FileContext) {
        self.depth = 0;
    }

    fn enter_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile> {
        match ast.kind(id) {
            NodeKind::Root { .. } if self.depth == 0 => Ok(Self::wrap_top_level(ast, id)),
            NodeKind::Namespace(_) => {
                self.depth += 1;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn leave_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile> {
        if matches!(ast.kind(id), NodeKind::Namespace(_)) {
            self.depth = self.depth.saturating_sub(1);
        }
        Ok(None)
    }
}
