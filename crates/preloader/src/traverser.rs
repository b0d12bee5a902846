//! Pre-order traversal driving the registered visitors over one file.

use std::{fmt, path::Path};

use log::debug;

use crate::{
    error::SkipFile,
    php::{Ast, NodeId},
    visitors::{FileContext, NodeVisitor},
};

#[derive(Default)]
pub struct NodeTraverser {
    visitors: Vec<Box<dyn NodeVisitor>>,
}

impl fmt::Debug for NodeTraverser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTraverser")
            .field("visitors", &self.visitor_names())
            .finish()
    }
}

impl NodeTraverser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a visitor; visitors run in registration order
    pub fn add_visitor(&mut self, visitor: Box<dyn NodeVisitor>) {
        self.visitors.push(visitor);
    }

    pub fn visitor_names(&self) -> Vec<&'static str> {
        self.visitors.iter().map(|v| v.name()).collect()
    }

    /// Traverse the tree of the file at `path`, rewriting it in place.
    ///
    /// Every visitor learns which file it is working on before the first
    /// node is entered. A [`SkipFile`] raised by any visitor stops the
    /// traversal and is handed to the caller; the tree is then in an
    /// unspecified, partially rewritten state.
    pub fn traverse_file(&mut self, ast: &mut Ast, path: &Path) -> Result<(), SkipFile> {
        let context = FileContext::new(path);
        for visitor in &mut self.visitors {
            visitor.set_file(&context);
        }
        let root = ast.root();
        self.visit(ast, root).inspect_err(|skip| {
            debug!("Traversal of {} stopped: {skip}", path.display());
        })
    }

    fn visit(&mut self, ast: &mut Ast, id: NodeId) -> Result<(), SkipFile> {
        for visitor in &mut self.visitors {
            if let Some(replacement) = visitor.enter_node(ast, id)? {
                ast.replace(id, replacement);
            }
        }

        let children = ast.children(id).to_vec();
        for child in children {
            self.visit(ast, child)?;
        }

        for visitor in &mut self.visitors {
            if let Some(replacement) = visitor.leave_node(ast, id)? {
                ast.replace(id, replacement);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::php::{Node, NodeKind, parse, print};

    /// Records what it sees and replaces `Code` nodes containing "old".
    struct Recorder {
        name: &'static str,
        seen: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl NodeVisitor for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn enter_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile> {
            if let NodeKind::Code(text) = ast.kind(id) {
                self.seen.borrow_mut().push(format!("{}:{}", self.name, text.trim()));
                if text.contains("old") {
                    return Ok(Some(Node::leaf(NodeKind::Code(text.replace("old", "new")))));
                }
            }
            Ok(None)
        }
    }

    #[test]
    fn test_later_visitors_see_replacements() {
        let seen = std::rc::Rc::default();
        let mut traverser = NodeTraverser::new();
        for name in ["first", "second"] {
            traverser.add_visitor(Box::new(Recorder {
                name,
                seen: std::rc::Rc::clone(&seen),
            }));
        }

        let mut ast = parse("<?php\nold();\n").unwrap();
        traverser
            .traverse_file(&mut ast, Path::new("/app/a.php"))
            .unwrap();

        assert_eq!(print(&ast), "<?php\nnew();");
        assert_eq!(*seen.borrow(), vec!["first:old();", "second:new();"]);
        assert_eq!(traverser.visitor_names(), vec!["first", "second"]);
        assert_eq!(
            format!("{traverser:?}"),
            "NodeTraverser { visitors: [\"first\", \"second\"] }"
        );
    }

    #[test]
    fn test_skip_stops_traversal() {
        struct Skipper;
        impl NodeVisitor for Skipper {
            fn name(&self) -> &'static str {
                "skipper"
            }
            fn enter_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile> {
                match ast.kind(id) {
                    NodeKind::MagicFile => Err(SkipFile::new("found")),
                    _ => Ok(None),
                }
            }
        }

        let mut traverser = NodeTraverser::new();
        traverser.add_visitor(Box::new(Skipper));
        let mut ast = parse("<?php\necho __FILE__;\n").unwrap();
        let err = traverser
            .traverse_file(&mut ast, Path::new("/app/a.php"))
            .unwrap_err();
        assert_eq!(err, SkipFile::new("found"));
    }
}
