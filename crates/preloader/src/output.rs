//! Sequential writer for the bundle file.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::error::{PreloadError, Result};

const OPENING_TAG: &str = "<?php\n";
const STRICT_OPENING_TAG: &str = "<?php declare(strict_types=1);\n";

/// Append-only sink for the bundle.
///
/// Nothing is rolled back on failure: whatever was written before an error
/// stays on disk.
#[derive(Debug)]
pub struct OutputWriter<W: Write = BufWriter<File>> {
    writer: W,
    bytes_written: u64,
}

impl OutputWriter {
    /// Create (or truncate) the bundle file, creating missing parent
    /// directories first.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
            && !dir.is_dir()
        {
            debug!("Creating output directory {}", dir.display());
            fs::create_dir_all(dir).map_err(|err| {
                PreloadError::io(
                    format!("Unable to create directory {}.", dir.display()),
                    err,
                )
            })?;
        }

        let file = File::create(path).map_err(|err| {
            PreloadError::io(
                format!("Unable to open {} for writing.", path.display()),
                err,
            )
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> OutputWriter<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    /// The single opening tag of the bundle, optionally declaring strict
    /// types for all of it
    pub fn write_opening_tag(&mut self, strict_types: bool) -> Result<()> {
        let tag = if strict_types {
            STRICT_OPENING_TAG
        } else {
            OPENING_TAG
        };
        self.write(tag, "Unable to write opening tag to the output file.")
    }

    pub fn write_block(&mut self, block: &str) -> Result<()> {
        self.write(block, "Unable to write file content to the output file.")
    }

    fn write(&mut self, text: &str, context: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .map_err(|err| PreloadError::io(context, err))?;
        self.bytes_written += text.len() as u64;
        Ok(())
    }

    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and hand back the underlying writer
    pub fn close(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|err| PreloadError::io("Unable to close the output file.", err))?;
        Ok(self.writer)
    }
}
