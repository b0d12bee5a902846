//! Ready-made [`ClassProvider`]s.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use super::{ClassProvider, declarations, type_key};
use crate::{
    error::{PreloadError, Result},
    php,
};

/// Maps a namespace prefix onto a base directory, PSR-4 style:
/// `App\Http\Kernel` under prefix `App\` is `<base_dir>/Http/Kernel.php`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psr4Provider {
    /// Namespace prefix with a trailing backslash, or empty for any name
    prefix: String,
    base_dir: PathBuf,
}

impl Psr4Provider {
    pub fn new(prefix: &str, base_dir: impl Into<PathBuf>) -> Self {
        let prefix = prefix.trim_matches('\\');
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}\\")
        };
        Self {
            prefix,
            base_dir: base_dir.into(),
        }
    }
}

impl ClassProvider for Psr4Provider {
    fn try_resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = name.trim_start_matches('\\').strip_prefix(&self.prefix)?;
        if relative.is_empty() {
            return None;
        }
        let mut path = self.base_dir.clone();
        for segment in relative.split('\\') {
            path.push(segment);
        }
        path.set_extension("php");
        path.is_file().then_some(path)
    }
}

/// Explicit map from type name to file
#[derive(Debug, Clone, Default)]
pub struct ClassMapProvider {
    map: FxHashMap<String, PathBuf>,
}

impl ClassMapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; the first registration of a name wins
    pub fn insert(&mut self, name: &str, path: impl Into<PathBuf>) {
        self.map.entry(type_key(name)).or_insert_with(|| path.into());
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Build the map by scanning every `.php` file below `dirs`.
    ///
    /// Files that do not parse are logged and left out; a directory that
    /// cannot be read is an error.
    pub fn from_directories(dirs: &[PathBuf]) -> Result<Self> {
        let mut provider = Self::new();
        for dir in dirs {
            if !dir.is_dir() {
                return Err(PreloadError::configuration(format!(
                    "Class map directory \"{}\" does not exist.",
                    dir.display()
                )));
            }
            for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|err| {
                    PreloadError::io(format!("Unable to scan {}", dir.display()), err.into())
                })?;
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "php") {
                    provider.scan_file(path);
                }
            }
        }
        debug!("Class map holds {} types", provider.len());
        Ok(provider)
    }

    fn scan_file(&mut self, path: &Path) {
        let ast = match fs::read_to_string(path)
            .map_err(|err| err.to_string())
            .and_then(|source| php::parse(&source).map_err(|err| err.to_string()))
        {
            Ok(ast) => ast,
            Err(err) => {
                warn!("Skipping {} in class map: {err}", path.display());
                return;
            }
        };
        for info in declarations(&ast, path) {
            self.insert(&info.name, path);
        }
    }
}

impl ClassProvider for ClassMapProvider {
    fn try_resolve(&self, name: &str) -> Option<PathBuf> {
        self.map.get(&type_key(name)).cloned()
    }
}
