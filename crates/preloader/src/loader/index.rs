//! Extraction of class-like declarations with fully qualified names.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::{
    php::{
        Ast, NodeId, NodeKind,
        ast::{StmtKind, TypeDecl},
    },
    types::TypeKind,
};

/// A declared class, interface, trait or enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Fully qualified name without the leading backslash
    pub name: String,
    pub kind: TypeKind,
    pub file: PathBuf,
    /// Parent class
    pub parent: Option<String>,
    /// Implemented interfaces, or the parents of an interface
    pub interfaces: Vec<String>,
}

/// Lowercased lookup key; type names are case-insensitive
pub fn type_key(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

/// Every class-like declaration at namespace level in `ast`, in source order.
/// Declarations nested in functions or conditionals are not indexed.
pub fn declarations(ast: &Ast, file: &Path) -> Vec<TypeInfo> {
    let mut found = Vec::new();
    let mut global = NameResolver::default();
    for id in ast.top_level() {
        match ast.kind(*id) {
            NodeKind::Namespace(decl) => {
                let mut resolver = NameResolver::new(decl.name.clone());
                collect(ast, ast.children(*id), &mut resolver, file, &mut found);
            }
            _ => collect(ast, &[*id], &mut global, file, &mut found),
        }
    }
    found
}

fn collect(
    ast: &Ast,
    statements: &[NodeId],
    resolver: &mut NameResolver,
    file: &Path,
    found: &mut Vec<TypeInfo>,
) {
    for id in statements {
        match ast.kind(*id) {
            NodeKind::Statement(StmtKind::Use(imports)) => {
                for import in imports {
                    resolver
                        .imports
                        .insert(import.alias.to_ascii_lowercase(), import.name.clone());
                }
            }
            NodeKind::Statement(StmtKind::TypeDecl(decl)) => {
                found.push(resolver.type_info(decl, file));
            }
            _ => {}
        }
    }
}

/// Resolves names the way the language does for class references
#[derive(Debug, Default)]
struct NameResolver {
    namespace: Option<String>,
    /// Lowercased alias to fully qualified name
    imports: FxHashMap<String, String>,
}

impl NameResolver {
    fn new(namespace: Option<String>) -> Self {
        Self {
            namespace,
            imports: FxHashMap::default(),
        }
    }

    fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}\\{name}"),
            None => name.to_owned(),
        }
    }

    fn resolve(&self, name: &str) -> String {
        if let Some(qualified) = name.strip_prefix('\\') {
            return qualified.to_owned();
        }
        if let Some(prefix) = name.get(..10)
            && prefix.eq_ignore_ascii_case("namespace\\")
        {
            return self.qualify(&name[10..]);
        }

        let (first, rest) = match name.split_once('\\') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };
        match (self.imports.get(&first.to_ascii_lowercase()), rest) {
            (Some(import), Some(rest)) => format!("{import}\\{rest}"),
            (Some(import), None) => import.clone(),
            (None, _) => self.qualify(name),
        }
    }

    fn type_info(&self, decl: &TypeDecl, file: &Path) -> TypeInfo {
        let resolve_all =
            |names: &[String]| -> Vec<String> { names.iter().map(|n| self.resolve(n)).collect() };
        let (parent, interfaces) = match decl.kind {
            TypeKind::Class => (
                decl.extends.first().map(|n| self.resolve(n)),
                resolve_all(&decl.implements),
            ),
            TypeKind::Interface => (None, resolve_all(&decl.extends)),
            TypeKind::Enum => (None, resolve_all(&decl.implements)),
            TypeKind::Trait => (None, Vec::new()),
        };
        TypeInfo {
            name: self.qualify(&decl.name),
            kind: decl.kind,
            file: file.to_path_buf(),
            parent,
            interfaces,
        }
    }
}
