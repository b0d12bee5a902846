//! Shared type definitions for the preloader crate
//!
//! This module contains types that are passed between the file-list
//! resolution, dependency tracking and bundling stages.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use indexmap::IndexSet;

/// Ordered, de-duplicated list of files to bundle
///
/// Insertion order is the bundle order. Adding a path that is already present
/// keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    files: IndexSet<PathBuf>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file, returning false if it was already listed
    pub fn push(&mut self, path: impl Into<PathBuf>) -> bool {
        self.files.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for FileList {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<P: Into<PathBuf>> Extend<P> for FileList {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for path in iter {
            self.push(path);
        }
    }
}

impl IntoIterator for FileList {
    type Item = PathBuf;
    type IntoIter = indexmap::set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// Kind of a class-like declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl TypeKind {
    /// Interfaces never contribute a file of their own to a captured load
    /// order, only as dependencies of the types implementing them.
    pub fn is_interface(self) -> bool {
        matches!(self, TypeKind::Interface)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Class => write!(f, "class"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Trait => write!(f, "trait"),
            TypeKind::Enum => write!(f, "enum"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_list_keeps_first_position() {
        let list: FileList = ["/a.php", "/b.php", "/a.php", "/c.php", "/b.php"]
            .into_iter()
            .collect();
        let files: Vec<_> = list.iter().collect();
        assert_eq!(
            files,
            vec![
                Path::new("/a.php"),
                Path::new("/b.php"),
                Path::new("/c.php")
            ]
        );
    }
}
