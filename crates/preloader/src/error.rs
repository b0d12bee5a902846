//! Error taxonomy of the preloader.

use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = PreloadError> = std::result::Result<T, E>;

/// Failures that abort a compile run.
#[derive(Debug, Error)]
pub enum PreloadError {
    /// A missing or invalid option or file-list source. Raised before any
    /// file is processed.
    #[error("{0}")]
    Configuration(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// An input file is not valid PHP. A bundle with a broken file in it is
    /// useless, so this ends the whole run.
    #[error("Syntax error in {}: {message} on line {line}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Compilation cancelled")]
    Cancelled,
}

impl PreloadError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Raised by a visitor to leave the current file out of the bundle.
///
/// This is not a failure: the bundler catches it at the file boundary,
/// counts the file as skipped and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SkipFile {
    pub reason: String,
}

impl SkipFile {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
