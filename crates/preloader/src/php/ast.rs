//! Arena-backed syntax tree.
//!
//! Nodes live in a single table and refer to their children by [`NodeId`].
//! Replacing a node overwrites its slot, so a rewrite never has to relink
//! parents or siblings.

pub use crate::types::TypeKind;

/// Index of a node in its [`Ast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

impl Node {
    pub const fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub const fn with_children(kind: NodeKind, children: Vec<NodeId>) -> Self {
        Self { kind, children }
    }

    pub const fn nop() -> Self {
        Self::leaf(NodeKind::Nop)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The file; children are the top-level statements
    Root { open_tag: bool },
    /// Children are the statements in the namespace body
    Namespace(NamespaceDecl),
    /// Semicolon-form `declare(...)`
    Declare(DeclareDecl),
    /// Any other statement; children are [`NodeKind::Code`] fragments and
    /// the constructs nested in it
    Statement(StmtKind),
    /// Text between `?>` and the next open tag
    InlineHtml { html: String, echo: bool },
    /// Verbatim source text
    Code(String),
    MagicDir,
    MagicFile,
    /// A synthesized single-quoted string
    StringLiteral(String),
    /// A removed node, prints as nothing
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `None` for the global namespace
    pub name: Option<String>,
    pub braced: bool,
    /// Comments that preceded the declaration
    pub leading: String,
}

impl NamespaceDecl {
    pub const fn global() -> Self {
        Self {
            name: None,
            braced: true,
            leading: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareDecl {
    pub directives: Vec<Directive>,
    pub leading: String,
}

impl DeclareDecl {
    pub fn has_directive(&self, name: &str) -> bool {
        self.directives
            .iter()
            .any(|d| d.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Use(Vec<UseImport>),
    TypeDecl(TypeDecl),
    /// `__halt_compiler();` and the raw data after it, kept byte for byte
    Halt,
    Other,
}

/// One class import from a `use` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseImport {
    /// Fully qualified name, without a leading backslash
    pub name: String,
    pub alias: String,
}

/// A class-like declaration, with names as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    /// Parent class, or parent interfaces for an interface
    pub extends: Vec<String>,
    pub implements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    const ROOT: NodeId = NodeId(0);

    pub fn new(open_tag: bool) -> Self {
        Self {
            nodes: vec![Node::leaf(NodeKind::Root { open_tag })],
        }
    }

    pub const fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Overwrites the slot of `id`, returning the previous node.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Node {
        std::mem::replace(self.node_mut(id), node)
    }

    pub fn top_level(&self) -> &[NodeId] {
        self.children(self.root())
    }

    pub fn set_top_level(&mut self, children: Vec<NodeId>) {
        self.node_mut(Self::ROOT).children = children;
    }

    /// Whether any top-level statement is a namespace declaration.
    /// Namespaces can only appear at the top level, so that is all we check.
    pub fn has_namespace(&self) -> bool {
        self.top_level()
            .iter()
            .any(|id| matches!(self.kind(*id), NodeKind::Namespace(_)))
    }

    /// Pre-order walk over every node reachable from the root.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }
}
