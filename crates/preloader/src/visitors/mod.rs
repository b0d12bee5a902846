//! AST visitor implementations for the preloader
//!
//! Each visitor is a single-purpose rewrite rule. The traverser calls
//! [`NodeVisitor::enter_node`] on every node in pre-order; a visitor that
//! returns a node replaces the visited one, and every visitor registered after
//! it sees the replacement.

mod magic_constants;
mod namespace_wrapping;
mod strict_types;

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::Deserialize;

pub use magic_constants::MagicConstantVisitor;
pub use namespace_wrapping::NamespaceWrappingVisitor;
pub use strict_types::StrictTypesVisitor;

use crate::{
    error::SkipFile,
    php::{Ast, Node, NodeId},
    traverser::NodeTraverser,
};

/// The file a traversal is working on, injected into every visitor before
/// the traversal starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// Canonical path of the file, or its absolute form when it cannot be
    /// resolved on disk
    pub path: PathBuf,
    /// Absolute path of the directory containing the file
    pub dir: PathBuf,
}

impl FileContext {
    pub fn new(path: &Path) -> Self {
        let path = fs::canonicalize(path)
            .or_else(|_| std::path::absolute(path))
            .unwrap_or_else(|_| path.to_path_buf());
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { path, dir }
    }
}

/// A rewrite rule applied by the [`NodeTraverser`].
///
/// Visitors must tolerate nodes they have no interest in: returning
/// `Ok(None)` leaves the node, and its children, to the other visitors.
pub trait NodeVisitor {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Called once per file, before the traversal starts
    fn set_file(&mut self, _file: &FileContext) {}

    /// Called before the node's children are visited. Returning a node
    /// replaces the visited one; returning [`SkipFile`] drops the whole file.
    fn enter_node(&mut self, ast: &mut Ast, id: NodeId) -> Result<Option<Node>, SkipFile>;

    /// Called after the node's children were visited
    fn leave_node(&mut self, _ast: &mut Ast, _id: NodeId) -> Result<Option<Node>, SkipFile> {
        Ok(None)
    }
}

/// Visitors that can be registered by name from a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorKind {
    StrictTypes,
    NamespaceWrapping,
}

impl VisitorKind {
    fn build(self) -> Box<dyn NodeVisitor> {
        match self {
            VisitorKind::StrictTypes => Box::new(StrictTypesVisitor),
            VisitorKind::NamespaceWrapping => Box::new(NamespaceWrappingVisitor::default()),
        }
    }
}

/// Which visitors a compile run registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorConfig {
    /// Replace `__DIR__` with the file's directory
    pub fix_dir: bool,
    /// Replace `__FILE__` with the file's path
    pub fix_file: bool,
    /// Skip files using `__DIR__`/`__FILE__` instead of replacing the constants
    pub skip_dir_file: bool,
    pub strip_strict_types: bool,
    pub wrap_namespaces: bool,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            fix_dir: true,
            fix_file: true,
            skip_dir_file: false,
            strip_strict_types: false,
            wrap_namespaces: false,
        }
    }
}

impl VisitorConfig {
    /// Build a traverser with the configured visitors, followed by `extras`.
    /// A kind that is already registered is not added twice.
    pub fn build_traverser(&self, extras: &[VisitorKind]) -> NodeTraverser {
        let mut traverser = NodeTraverser::new();
        if self.fix_dir {
            traverser.add_visitor(Box::new(MagicConstantVisitor::dir(self.skip_dir_file)));
        }
        if self.fix_file {
            traverser.add_visitor(Box::new(MagicConstantVisitor::file(self.skip_dir_file)));
        }

        let mut kinds = Vec::new();
        if self.strip_strict_types {
            kinds.push(VisitorKind::StrictTypes);
        }
        if self.wrap_namespaces {
            kinds.push(VisitorKind::NamespaceWrapping);
        }
        for kind in extras {
            if kinds.contains(kind) {
                debug!("Visitor {kind:?} is already registered");
            } else {
                kinds.push(*kind);
            }
        }
        for kind in kinds {
            traverser.add_visitor(kind.build());
        }
        traverser
    }
}
