//! The `compile` command: validate the request, resolve the file list and
//! write the bundle while reporting progress.

use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
};

use log::info;

use crate::{
    bundler::{BundleEvent, BundleStats, Bundler},
    config::Config,
    error::{PreloadError, Result},
    manifest::resolve_file_list,
    output::OutputWriter,
};

#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    /// File-list source, see [`resolve_file_list`]
    pub config: Option<String>,
    /// Destination of the bundle
    pub output: Option<PathBuf>,
    pub settings: Config,
    /// Directory relative manifest paths are taken from
    pub cwd: PathBuf,
}

/// Progress lines of a run, written to any sink
struct Reporter<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> Reporter<'a, W> {
    const fn new(out: &'a mut W) -> Self {
        Self { out }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        writeln!(self.out, "{args}")
            .map_err(|err| PreloadError::io("Unable to write progress output.", err))
    }

    fn event(&mut self, event: BundleEvent<'_>) -> Result<()> {
        match event {
            BundleEvent::Writing(path) => self.line(format_args!("- Writing {}", path.display())),
            BundleEvent::Skipping(path, _) => {
                self.line(format_args!("- Skipping {}", path.display()))
            }
        }
    }
}

/// Run the whole command, writing progress lines to `out`
pub fn execute(request: &CompileRequest, out: &mut impl Write) -> Result<BundleStats> {
    let output = request
        .output
        .as_deref()
        .ok_or_else(|| PreloadError::configuration("An output option is required."))?;
    let config = request
        .config
        .as_deref()
        .ok_or_else(|| PreloadError::configuration("A config option is required."))?;

    let mut reporter = Reporter::new(out);
    reporter.line(format_args!("> Loading configuration file"))?;
    let resolved = resolve_file_list(config, &request.cwd)?;
    reporter.line(format_args!("- Found {} files", resolved.files.len()))?;

    let traverser = request
        .settings
        .visitor_config()
        .build_traverser(&resolved.visitors);
    info!("Visitors: {}", traverser.visitor_names().join(", "));
    let mut bundler = Bundler::new(traverser, request.settings.bundle_options());

    let mut writer = OutputWriter::open(output)?;
    reporter.line(format_args!("> Compiling classes"))?;

    let mut report_error = None;
    let stats = bundler.build_artifact(&resolved.files, &mut writer, |event| {
        if report_error.is_none()
            && let Err(err) = reporter.event(event)
        {
            report_error = Some(err);
        }
    })?;
    writer.close()?;
    if let Some(err) = report_error {
        return Err(err);
    }

    summarize(&mut reporter, output, &stats)?;
    Ok(stats)
}

fn summarize<W: Write>(
    reporter: &mut Reporter<'_, W>,
    output: &Path,
    stats: &BundleStats,
) -> Result<()> {
    reporter.line(format_args!(
        "> Compiled loader written to {}",
        output.display()
    ))?;
    reporter.line(format_args!(
        "- Files: {}/{} (skipped: {})",
        stats.written(),
        stats.files,
        stats.skipped
    ))?;
    reporter.line(format_args!("- Filesize: {} kb", stats.size_kb()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn request(dir: &Path) -> CompileRequest {
        CompileRequest {
            config: Some("a.php,b.php".to_owned()),
            output: Some(dir.join("out/preload.php")),
            settings: Config::default(),
            cwd: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_required_options() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        let mut missing_output = request(dir.path());
        missing_output.output = None;
        missing_output.config = None;
        let err = execute(&missing_output, &mut out).unwrap_err();
        assert_eq!(err.to_string(), "An output option is required.");

        let mut missing_config = request(dir.path());
        missing_config.config = None;
        let err = execute(&missing_config, &mut out).unwrap_err();
        assert_eq!(err.to_string(), "A config option is required.");
        assert!(out.is_empty());
    }

    #[test]
    fn test_progress_report_for_relative_list() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.php");
        let b = dir.path().join("b.php");
        fs::write(&a, "<?php\nclass A {}\n").unwrap();
        fs::write(&b, "<?php\nfunction here() { return __DIR__; }\n").unwrap();

        // list entries are relative to the working directory
        let mut req = request(dir.path());
        req.settings.skip_dir_file = true;
        let mut out = Vec::new();
        let stats = execute(&req, &mut out).unwrap();

        let output = dir.path().join("out/preload.php");
        let bundle = fs::read_to_string(&output).unwrap();
        assert_eq!(bundle, "<?php\nnamespace {\nclass A {}\n}\n\n");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!(
                "> Loading configuration file\n- Found 2 files\n> Compiling classes\n\
                 - Writing {}\n- Skipping {}\n> Compiled loader written to {}\n\
                 - Files: 1/2 (skipped: 1)\n- Filesize: 0 kb\n",
                a.display(),
                b.display(),
                output.display()
            )
        );
        assert_eq!(stats.bytes, bundle.len() as u64);
    }
}
