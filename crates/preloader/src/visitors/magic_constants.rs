//! Substitution of the `__DIR__` and `__FILE__` magic constants.
//!
//! Once a file is concatenated into the bundle both constants would point at
//! the bundle itself, so they are replaced with the original location as a
//! string literal. In skip mode a file using them is dropped instead, which
//! keeps the bundle free of build-time absolute paths.

use log::debug;

use super::{FileContext, NodeVisitor};
use crate::{
    error::SkipFile,
    php::{Ast, Node, NodeId, NodeKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MagicConstant {
    Dir,
    File,
}

impl MagicConstant {
    const fn token(self) -> &'static str {
        match self {
            MagicConstant::Dir => "__DIR__",
            MagicConstant::File => "__FILE__",
        }
    }

    fn matches(self, kind: &NodeKind) -> bool {
        matches!(
            (self, kind),
            (MagicConstant::Dir, NodeKind::MagicDir) | (MagicConstant::File, NodeKind::MagicFile)
        )
    }
}

#[derive(Debug, Clone)]
pub struct MagicConstantVisitor {
    constant: MagicConstant,
    skip: bool,
    /// Literal for the file being traversed
    value: String,
}

impl MagicConstantVisitor {
    /// Visitor for `__DIR__`, replaced by the file's directory
    pub fn dir(skip: bool) -> Self {
        Self::new(MagicConstant::Dir, skip)
    }

    /// Visitor for `__FILE__`, replaced by the file's path
    pub fn file(skip: bool) -> Self {
        Self::new(MagicConstant::File, skip)
    }

    const fn new(constant: MagicConstant, skip: bool) -> Self {
        Self {
            constant,
            skip,
            value: String::new(),
        }
    }
}

impl NodeVisitor for MagicConstantVisitor {
    fn name(&self) -> &'static str {
        match self.constant {
            MagicConstant::Dir => "dir",
            MagicConstant::File => "file",
        }
    }

    fn set_file(&mut self, file: &FileContext) {
        let value = match self.constant {
            MagicConstant::Dir => &file.dir,
            MagicConstant::File => &file.path,
        };
        self.value = value.to_string_lossy().into_owned();
    }

    fn enter_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile> {
        if !self.constant.matches(ast.kind(id)) {
            return Ok(None);
        }
        if self.skip {
            return Err(SkipFile::new(format!(
                "{} constant found, skipping...",
                self.constant.token()
            )));
        }
        debug!("Replacing {} with '{}'", self.constant.token(), self.value);
        Ok(Some(Node::leaf(NodeKind::StringLiteral(self.value.clone()))))
    }
}
