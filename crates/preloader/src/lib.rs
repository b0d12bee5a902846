//! Compile a dependency ordered set of PHP files into one preload file.
//!
//! Each input file is parsed, rewritten by a configurable set of visitors
//! (magic constant fixing, strict types removal, namespace wrapping) and
//! printed as a braced namespace block; the blocks are concatenated behind a
//! single opening tag.

pub mod bundler;
pub mod compile;
pub mod config;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod output;
pub mod php;
pub mod traverser;
pub mod types;
pub mod visitors;

pub use error::{PreloadError, Result, SkipFile};
