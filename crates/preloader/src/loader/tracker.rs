//! Records the types a callback loads and orders their files.

use indexmap::IndexSet;
use log::{debug, trace, warn};
use rustc_hash::FxHashSet;

use super::{Runtime, TypeInfo, type_key};
use crate::types::FileList;

/// A recording hook installed in front of a [`Runtime`]'s provider chain.
///
/// While the session lives, every type the chain is asked for is recorded,
/// whichever provider ends up loading it. Dropping the session uninstalls the
/// hook, so it is removed even when the tracked code panics.
#[derive(Debug)]
#[must_use = "the hook is uninstalled as soon as the session is dropped"]
pub struct CaptureSession<'rt> {
    runtime: &'rt mut Runtime,
}

impl<'rt> CaptureSession<'rt> {
    pub fn install(runtime: &'rt mut Runtime) -> Self {
        runtime.install_recorder();
        Self { runtime }
    }

    pub fn runtime(&mut self) -> &mut Runtime {
        &mut *self.runtime
    }

    /// Uninstall the hook and return the recorded names, in the order they
    /// were first asked for
    pub fn finish(mut self) -> IndexSet<String> {
        self.runtime.uninstall_recorder()
    }
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        self.runtime.uninstall_recorder();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyTracker;

impl DependencyTracker {
    /// Run `callback` with a recording hook installed and return the files
    /// the recorded types need, dependencies first.
    ///
    /// For each recorded type the files of its ancestors and interfaces come
    /// before its own. Interfaces are only emitted as such dependencies, and
    /// names that never resolved to a declared type are dropped.
    pub fn capture_load_order<F>(runtime: &mut Runtime, callback: F) -> FileList
    where
        F: FnOnce(&mut Runtime),
    {
        let recorded = {
            let mut session = CaptureSession::install(runtime);
            callback(session.runtime());
            session.finish()
        };
        debug!("Captured {} type loads", recorded.len());
        Self::files_for(runtime, &recorded)
    }

    /// Map recorded type names onto an ordered file list
    pub fn files_for<'a>(
        runtime: &Runtime,
        names: impl IntoIterator<Item = &'a String>,
    ) -> FileList {
        let mut files = FileList::new();
        let mut visited = FxHashSet::default();
        for name in names {
            match runtime.type_info(name) {
                None => warn!("{name} was requested but never declared, ignoring"),
                Some(info) if info.kind.is_interface() => {
                    trace!("Interface {name} is only emitted as a dependency");
                }
                Some(info) => emit(runtime, info, &mut files, &mut visited),
            }
        }
        files
    }
}

fn emit(
    runtime: &Runtime,
    info: &TypeInfo,
    files: &mut FileList,
    visited: &mut FxHashSet<String>,
) {
    if !visited.insert(type_key(&info.name)) {
        return;
    }
    if let Some(parent) = info.parent.as_deref().and_then(|name| runtime.type_info(name)) {
        emit(runtime, parent, files, visited);
    }
    for interface in info
        .interfaces
        .iter()
        .filter_map(|name| runtime.type_info(name))
    {
        emit(runtime, interface, files, visited);
    }
    files.push(info.file.clone());
}
