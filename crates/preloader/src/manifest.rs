//! Resolution of the `--config` value into the list of files to bundle.
//!
//! The value is either a literal comma separated list of paths or the path
//! of a TOML manifest:
//!
//! ```toml
//! files = ["vendor/lib/src/Base.php", "src/App.php"]
//! visitors = ["strict_types"]
//!
//! [capture]
//! load = ["App\\Http\\Kernel"]
//! classmap = ["legacy"]
//!
//! [[capture.psr4]]
//! prefix = "App\\"
//! dir = "src"
//! ```
//!
//! Relative paths inside a manifest are relative to the manifest's own
//! directory. Files found by the capture session follow the explicit `files`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{
    error::{PreloadError, Result},
    loader::{ClassMapProvider, DependencyTracker, Psr4Provider, Runtime},
    types::FileList,
    visitors::VisitorKind,
};

static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid regex"));

/// Files to bundle plus the visitors the manifest asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub files: FileList,
    pub visitors: Vec<VisitorKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    files: Option<Vec<PathBuf>>,
    #[serde(default)]
    visitors: Vec<VisitorKind>,
    capture: Option<CaptureManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureManifest {
    /// Types to load, in order
    load: Vec<String>,
    #[serde(default)]
    psr4: Vec<Psr4Entry>,
    /// Directories scanned into a class map
    #[serde(default)]
    classmap: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Psr4Entry {
    prefix: String,
    dir: PathBuf,
}

/// Resolve the `--config` value. Relative manifest paths and relative
/// entries of a literal list are taken from `cwd`.
pub fn resolve_file_list(config: &str, cwd: &Path) -> Result<ResolvedConfig> {
    if config.find(',').is_some_and(|pos| pos > 0) {
        let files = config
            .split(',')
            .filter(|entry| !entry.is_empty())
            .map(|entry| resolve_path(entry, cwd))
            .collect();
        return Ok(ResolvedConfig {
            files,
            visitors: Vec::new(),
        });
    }

    let path = resolve_path(config, cwd);
    if !path.is_file() {
        return Err(PreloadError::configuration(format!(
            "Configuration file \"{}\" does not exist.",
            path.display()
        )));
    }
    load_manifest(&path)
}

fn load_manifest(path: &Path) -> Result<ResolvedConfig> {
    debug!("Reading manifest {}", path.display());
    let text = fs::read_to_string(path).map_err(|err| {
        PreloadError::io(format!("Cannot open {} for reading", path.display()), err)
    })?;
    let manifest: Manifest = toml::from_str(&text).map_err(|err| {
        PreloadError::configuration(format!(
            "Invalid configuration file \"{}\": {err}",
            path.display()
        ))
    })?;

    if manifest.files.is_none() && manifest.capture.is_none() {
        return Err(PreloadError::configuration(format!(
            "Configuration file \"{}\" must provide a list of files or a capture session.",
            path.display()
        )));
    }

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut files: FileList = manifest
        .files
        .unwrap_or_default()
        .into_iter()
        .map(|file| base.join(file))
        .collect();
    if let Some(capture) = manifest.capture {
        files.extend(run_capture(&capture, base)?);
    }

    Ok(ResolvedConfig {
        files,
        visitors: manifest.visitors,
    })
}

fn run_capture(capture: &CaptureManifest, base: &Path) -> Result<FileList> {
    let mut runtime = Runtime::new();
    for entry in &capture.psr4 {
        runtime.register(Psr4Provider::new(&entry.prefix, base.join(&entry.dir)));
    }
    if !capture.classmap.is_empty() {
        let dirs: Vec<_> = capture.classmap.iter().map(|dir| base.join(dir)).collect();
        runtime.register(ClassMapProvider::from_directories(&dirs)?);
    }

    let files = DependencyTracker::capture_load_order(&mut runtime, |runtime| {
        for name in &capture.load {
            if !runtime.load_class(name) {
                warn!("Unable to load {name} during capture");
            }
        }
    });
    info!(
        "Capture of {} types produced {} files",
        capture.load.len(),
        files.len()
    );
    Ok(files)
}

fn resolve_path(path: &str, cwd: &Path) -> PathBuf {
    if is_absolute_path(path) {
        PathBuf::from(path)
    } else {
        cwd.join(path)
    }
}

/// Absolute paths start with a separator, a drive letter (`C:\`, `C:/`) or a
/// URL scheme.
pub fn is_absolute_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    let separator = |b: u8| b == b'/' || b == b'\\';

    bytes.first().copied().is_some_and(separator)
        || (bytes.len() > 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && separator(bytes[2]))
        || URL_SCHEME.is_match(path)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_literal_list() {
        let resolved = resolve_file_list("a.php,,/b.php,a.php", Path::new("/app")).unwrap();
        assert_eq!(
            resolved.files.iter().collect::<Vec<_>>(),
            vec![Path::new("/app/a.php"), Path::new("/b.php")]
        );
        assert!(resolved.visitors.is_empty());
    }

    #[test]
    fn test_leading_comma_is_not_a_list() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_file_list(",a.php", dir.path()).unwrap_err();
        assert!(matches!(err, PreloadError::Configuration(_)));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_file_list("preload.toml", dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Configuration file \"{}\" does not exist.",
                dir.path().join("preload.toml").display()
            )
        );
    }

    #[test]
    fn test_manifest_files_and_visitors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("preload.toml"),
            "files = [\"src/A.php\", \"/abs/B.php\"]\nvisitors = [\"strict_types\"]\n",
        )
        .unwrap();

        let resolved = resolve_file_list("preload.toml", dir.path()).unwrap();
        assert_eq!(
            resolved.files.iter().collect::<Vec<_>>(),
            vec![
                dir.path().join("src/A.php").as_path(),
                Path::new("/abs/B.php")
            ]
        );
        assert_eq!(resolved.visitors, vec![VisitorKind::StrictTypes]);
    }

    #[test]
    fn test_manifest_shape_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "visitors = []\n").unwrap();
        let err = resolve_file_list(path.to_str().unwrap(), dir.path()).unwrap_err();
        assert!(err.to_string().ends_with("must provide a list of files or a capture session."));

        fs::write(&path, "files = []\nvisitors = [\"minify\"]\n").unwrap();
        let err = resolve_file_list(path.to_str().unwrap(), dir.path()).unwrap_err();
        assert!(matches!(err, PreloadError::Configuration(_)));
    }

    #[test]
    fn test_capture_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/Model")).unwrap();
        fs::write(
            dir.path().join("src/Model/Base.php"),
            "<?php\nnamespace App\\Model;\nabstract class Base {}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/Model/User.php"),
            "<?php\nnamespace App\\Model;\nfinal class User extends Base {}\n",
        )
        .unwrap();
        fs::write(dir.path().join("boot.php"), "<?php\n").unwrap();
        fs::write(
            dir.path().join("preload.toml"),
            "files = [\"boot.php\"]\n\n[capture]\nload = [\"App\\\\Model\\\\User\"]\n\n[[capture.psr4]]\nprefix = \"App\\\\\"\ndir = \"src\"\n",
        )
        .unwrap();

        let resolved = resolve_file_list("preload.toml", dir.path()).unwrap();
        assert_eq!(
            resolved.files.iter().collect::<Vec<_>>(),
            vec![
                dir.path().join("boot.php").as_path(),
                dir.path().join("src/Model/Base.php").as_path(),
                dir.path().join("src/Model/User.php").as_path(),
            ]
        );
    }

    #[test]
    fn test_is_absolute_path() {
        assert!(is_absolute_path("/etc/preload.toml"));
        assert!(is_absolute_path("\\\\server\\share"));
        assert!(is_absolute_path("C:\\preload.toml"));
        assert!(is_absolute_path("c:/preload.toml"));
        assert!(is_absolute_path("phar://app.phar/preload.toml"));
        assert!(!is_absolute_path("C:"));
        assert!(!is_absolute_path("config/preload.toml"));
    }
}
