//! Turns each listed file into a namespace-wrapped block and concatenates
//! the blocks into the bundle.

use std::{
    fs,
    io::Write,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{PreloadError, Result, SkipFile},
    output::OutputWriter,
    php::{
        self, Ast, Node, NodeKind, SyntaxError,
        ast::NamespaceDecl,
    },
    traverser::NodeTraverser,
    types::FileList,
};

/// Blank lines right after a namespace opening brace
static BLANK_AFTER_OPENING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(namespace\b[^\n]*\{)\r?\n(?:[ \t]*\r?\n)+").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleOptions {
    /// Keep comments; when false they are stripped before parsing
    pub keep_comments: bool,
    /// Start the bundle with `declare(strict_types=1)`
    pub strict_header: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            keep_comments: true,
            strict_header: false,
        }
    }
}

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file's block, ending with a newline
    Compiled(String),
    Skipped(SkipFile),
}

/// Progress notification emitted while the bundle is built
#[derive(Debug, Clone, Copy)]
pub enum BundleEvent<'a> {
    Writing(&'a Path),
    Skipping(&'a Path, &'a SkipFile),
}

/// Totals of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleStats {
    /// Files attempted
    pub files: usize,
    pub skipped: usize,
    /// Size of the bundle, header included
    pub bytes: u64,
}

impl BundleStats {
    pub const fn written(&self) -> usize {
        self.files - self.skipped
    }

    /// Size in kilobytes, rounded to the nearest integer
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn size_kb(&self) -> u64 {
        (self.bytes as f64 / 1024.0).round() as u64
    }
}

#[derive(Debug)]
pub struct Bundler {
    traverser: NodeTraverser,
    options: BundleOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl Bundler {
    pub fn new(traverser: NodeTraverser, options: BundleOptions) -> Self {
        Self {
            traverser,
            options,
            cancel: None,
        }
    }

    /// Stop before the next file once `flag` is set. The bundle written so
    /// far is left on disk.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Write the opening tag and one block per file, in list order.
    ///
    /// A file skipped by a visitor is reported through `on_event` and
    /// counted; any other failure aborts the run.
    pub fn build_artifact<W: Write>(
        &mut self,
        files: &FileList,
        output: &mut OutputWriter<W>,
        mut on_event: impl FnMut(BundleEvent<'_>),
    ) -> Result<BundleStats> {
        output.write_opening_tag(self.options.strict_header)?;

        let mut stats = BundleStats::default();
        for file in files.iter() {
            if self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                info!("Cancelled after {} files", stats.files);
                return Err(PreloadError::Cancelled);
            }

            stats.files += 1;
            match self.compile_file(file)? {
                FileOutcome::Compiled(block) => {
                    on_event(BundleEvent::Writing(file));
                    output.write_block(&block)?;
                    output.write_block("\n")?;
                }
                FileOutcome::Skipped(skip) => {
                    stats.skipped += 1;
                    on_event(BundleEvent::Skipping(file, &skip));
                }
            }
        }

        stats.bytes = output.bytes_written();
        Ok(stats)
    }

    /// Read, parse, rewrite and print one file as a bundle block.
    pub fn compile_file(&mut self, path: &Path) -> Result<FileOutcome> {
        debug!("Compiling {}", path.display());
        let source = fs::read_to_string(path).map_err(|err| {
            PreloadError::io(format!("Cannot open {} for reading", path.display()), err)
        })?;

        let source = if self.options.keep_comments {
            source
        } else {
            php::strip_comments(&source).map_err(|err| parse_error(path, err))?
        };
        let mut ast = php::parse(&source).map_err(|err| parse_error(path, err))?;

        if let Err(skip) = self.traverser.traverse_file(&mut ast, path) {
            debug!("Skipping {}: {skip}", path.display());
            return Ok(FileOutcome::Skipped(skip));
        }

        normalize_namespaces(&mut ast);
        Ok(FileOutcome::Compiled(finish_block(&php::print(&ast))))
    }
}

fn parse_error(path: &Path, err: SyntaxError) -> PreloadError {
    PreloadError::Parse {
        path: path.to_path_buf(),
        line: err.line,
        message: err.message,
    }
}

/// Make every namespace of the file a braced block, or put the whole file in
/// a global namespace block when it declares none.
///
/// Leading `declare(strict_types=...)` statements stay in front of the
/// global block, since they are not allowed inside one.
fn normalize_namespaces(ast: &mut Ast) {
    let top_level = ast.top_level().to_vec();
    if ast.has_namespace() {
        for id in top_level {
            if let NodeKind::Namespace(decl) = &mut ast.node_mut(id).kind {
                decl.braced = true;
            }
        }
        return;
    }

    let declares = top_level
        .iter()
        .take_while(|id| {
            matches!(ast.kind(**id), NodeKind::Declare(decl) if decl.has_directive("strict_types"))
        })
        .count();
    let (head, body) = top_level.split_at(declares);
    let wrapper = ast.push(Node::with_children(
        NodeKind::Namespace(NamespaceDecl::global()),
        body.to_vec(),
    ));

    let mut statements = head.to_vec();
    statements.push(wrapper);
    ast.set_top_level(statements);
}

/// Drop the per-file opening tag and the blank lines at the start of each
/// namespace block.
fn finish_block(printed: &str) -> String {
    let code = printed
        .strip_prefix("<?php")
        .map_or(printed, |rest| rest.strip_prefix('\n').unwrap_or(rest));
    let code = code.trim_start_matches(['\r', '\n']);

    let mut block = BLANK_AFTER_OPENING.replace_all(code, "$1\n").into_owned();
    if !block.ends_with('\n') {
        block.push('\n');
    }
    block
}
