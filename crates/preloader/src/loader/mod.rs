//! Class loading simulation used to discover which files a program needs.
//!
//! [`Runtime`] plays the part of the PHP autoloader chain: asking it for a
//! type consults the registered [`ClassProvider`]s in order, includes the
//! file the first successful one returns, and declares the types found in it.
//! Declaring a type first loads its parent and interfaces through the same
//! chain, exactly like the engine does, so a load of one class can trigger
//! nested loads.
//!
//! The [`DependencyTracker`] records every type the chain is asked for during
//! a callback and turns the record into an ordered file list.

mod index;
mod providers;
mod tracker;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use indexmap::IndexSet;
use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};

pub use index::{TypeInfo, declarations, type_key};
pub use providers::{ClassMapProvider, Psr4Provider};
pub use tracker::{CaptureSession, DependencyTracker};

use crate::php;

/// One link of the autoloader chain
pub trait ClassProvider {
    /// Path of the file expected to declare `name`, if this provider knows it
    fn try_resolve(&self, name: &str) -> Option<PathBuf>;
}

impl<F> ClassProvider for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn try_resolve(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}

#[derive(Default)]
pub struct Runtime {
    providers: Vec<Box<dyn ClassProvider>>,
    /// Declared types by lowercased name
    types: FxHashMap<String, TypeInfo>,
    included: FxHashSet<PathBuf>,
    /// Names asked for while a capture session is installed
    record: Option<IndexSet<String>>,
    /// Types whose load is in progress, guards against inheritance cycles
    loading: FxHashSet<String>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("providers", &self.providers.len())
            .field("types", &self.types.len())
            .field("included", &self.included.len())
            .field("recording", &self.record.is_some())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain
    pub fn register(&mut self, provider: impl ClassProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl ClassProvider + 'static) -> Self {
        self.register(provider);
        self
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.types.contains_key(&type_key(name))
    }

    pub fn type_info(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(&type_key(name))
    }

    pub fn is_included(&self, path: &Path) -> bool {
        self.included.contains(path)
    }

    /// Make `name` available, loading it through the provider chain if it is
    /// not declared yet. Returns whether the type is declared afterwards.
    pub fn load_class(&mut self, name: &str) -> bool {
        let key = type_key(name);
        if self.types.contains_key(&key) {
            return true;
        }
        if let Some(record) = &mut self.record
            && record.insert(name.trim_start_matches('\\').to_owned())
        {
            trace!("Recorded load of {name}");
        }
        if !self.loading.insert(key.clone()) {
            warn!("{name} is already being loaded, inheritance cycle?");
            return false;
        }

        let mut loaded = false;
        for index in 0..self.providers.len() {
            let Some(path) = self.providers[index].try_resolve(name) else {
                continue;
            };
            self.include(&path);
            if self.types.contains_key(&key) {
                loaded = true;
                break;
            }
        }

        self.loading.remove(&key);
        if !loaded {
            debug!("No provider could load {name}");
        }
        loaded
    }

    /// Include a file once, declaring the types it contains. Returns false
    /// if the file was already included or could not be read or parsed.
    pub fn include(&mut self, path: &Path) -> bool {
        if !self.included.insert(path.to_path_buf()) {
            return false;
        }
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!("Unable to read {}: {err}", path.display());
                return false;
            }
        };
        let ast = match php::parse(&source) {
            Ok(ast) => ast,
            Err(err) => {
                warn!("Unable to parse {}: {err}", path.display());
                return false;
            }
        };

        debug!("Including {}", path.display());
        for info in declarations(&ast, path) {
            self.declare(info);
        }
        true
    }

    fn declare(&mut self, info: TypeInfo) {
        if let Some(parent) = &info.parent
            && !self.load_class(parent)
        {
            warn!("Parent {parent} of {} could not be loaded", info.name);
        }
        for interface in &info.interfaces {
            if !self.load_class(interface) {
                warn!("Interface {interface} of {} could not be loaded", info.name);
            }
        }
        trace!("Declared {} {}", info.kind, info.name);
        self.types.entry(type_key(&info.name)).or_insert(info);
    }

    fn install_recorder(&mut self) {
        self.record = Some(IndexSet::new());
    }

    fn uninstall_recorder(&mut self) -> IndexSet<String> {
        self.record.take().unwrap_or_default()
    }
}
