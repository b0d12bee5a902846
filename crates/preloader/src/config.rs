//! Layered configuration of a compile run
//!
//! Settings are merged from, lowest to highest precedence:
//! 1. built-in defaults
//! 2. the user config file (`<config dir>/preloader/preloader.toml`)
//! 3. `preloader.toml` in the working directory
//! 4. `PRELOADER_*` environment variables
//! 5. command line flags, merged by the caller with [`Config::merge`]

use std::{
    fs,
    path::{Path, PathBuf},
};

use etcetera::BaseStrategy;
use log::debug;
use serde::Deserialize;

use crate::{
    bundler::BundleOptions,
    error::{PreloadError, Result},
    visitors::VisitorConfig,
};

pub const CONFIG_FILE_NAME: &str = "preloader.toml";
const ENV_PREFIX: &str = "PRELOADER_";

/// Effective settings of a compile run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Replace `__DIR__` with the directory of the original file
    pub fix_dir: bool,
    /// Replace `__FILE__` with the path of the original file
    pub fix_file: bool,
    /// Skip files that use `__DIR__`/`__FILE__`, keeping the bundle portable
    pub skip_dir_file: bool,
    pub strip_comments: bool,
    /// Remove `declare(strict_types=...)` from every file
    pub strip_strict_types: bool,
    /// Declare strict types once, at the top of the bundle
    pub strict_header: bool,
    /// Register the namespace wrapping visitor
    pub wrap_namespaces: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fix_dir: true,
            fix_file: true,
            skip_dir_file: false,
            strip_comments: false,
            strip_strict_types: false,
            strict_header: false,
            wrap_namespaces: false,
        }
    }
}

/// One configuration layer; unset fields leave the lower layers alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub fix_dir: Option<bool>,
    pub fix_file: Option<bool>,
    pub skip_dir_file: Option<bool>,
    pub strip_comments: Option<bool>,
    pub strip_strict_types: Option<bool>,
    pub strict_header: Option<bool>,
    pub wrap_namespaces: Option<bool>,
}

impl PartialConfig {
    /// Read a layer from a TOML file, `None` when the file does not exist
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path).map_err(|err| {
            PreloadError::io(format!("Cannot open {} for reading", path.display()), err)
        })?;
        toml::from_str(&text).map(Some).map_err(|err| {
            PreloadError::configuration(format!(
                "Invalid configuration file \"{}\": {err}",
                path.display()
            ))
        })
    }

    /// Read a layer from the `PRELOADER_*` environment variables
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| -> Result<Option<bool>> {
            let key = format!("{ENV_PREFIX}{name}");
            match std::env::var(&key) {
                Ok(value) => parse_flag(&value).map(Some).map_err(|_| {
                    PreloadError::configuration(format!("Invalid value \"{value}\" for {key}"))
                }),
                Err(_) => Ok(None),
            }
        };
        Ok(Self {
            fix_dir: read("FIX_DIR")?,
            fix_file: read("FIX_FILE")?,
            skip_dir_file: read("SKIP_DIR_FILE")?,
            strip_comments: read("STRIP_COMMENTS")?,
            strip_strict_types: read("STRIP_STRICT_TYPES")?,
            strict_header: read("STRICT_HEADER")?,
            wrap_namespaces: read("WRAP_NAMESPACES")?,
        })
    }
}

impl Config {
    /// Defaults, then the config files, then the environment
    pub fn load(cwd: &Path) -> Result<Self> {
        let mut files = Vec::new();
        if let Some(user) = user_config_path() {
            files.push(user);
        }
        files.push(cwd.join(CONFIG_FILE_NAME));
        Self::load_from(&files)
    }

    /// Defaults, then each existing file of `files` in order, then the
    /// environment
    pub fn load_from(files: &[PathBuf]) -> Result<Self> {
        let mut config = Self::default();
        for path in files {
            if let Some(layer) = PartialConfig::from_file(path)? {
                config.merge(layer);
            }
        }
        config.merge(PartialConfig::from_env()?);
        Ok(config)
    }

    /// Apply the fields set in `layer`
    pub fn merge(&mut self, layer: PartialConfig) {
        let PartialConfig {
            fix_dir,
            fix_file,
            skip_dir_file,
            strip_comments,
            strip_strict_types,
            strict_header,
            wrap_namespaces,
        } = layer;
        self.fix_dir = fix_dir.unwrap_or(self.fix_dir);
        self.fix_file = fix_file.unwrap_or(self.fix_file);
        self.skip_dir_file = skip_dir_file.unwrap_or(self.skip_dir_file);
        self.strip_comments = strip_comments.unwrap_or(self.strip_comments);
        self.strip_strict_types = strip_strict_types.unwrap_or(self.strip_strict_types);
        self.strict_header = strict_header.unwrap_or(self.strict_header);
        self.wrap_namespaces = wrap_namespaces.unwrap_or(self.wrap_namespaces);
    }

    pub fn visitor_config(&self) -> VisitorConfig {
        VisitorConfig {
            fix_dir: self.fix_dir,
            fix_file: self.fix_file,
            skip_dir_file: self.skip_dir_file,
            strip_strict_types: self.strip_strict_types,
            wrap_namespaces: self.wrap_namespaces,
        }
    }

    pub fn bundle_options(&self) -> BundleOptions {
        BundleOptions {
            keep_comments: !self.strip_comments,
            strict_header: self.strict_header,
        }
    }
}

/// `<config dir>/preloader/preloader.toml`, if a home directory exists
fn user_config_path() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .ok()
        .map(|strategy| strategy.config_dir().join("preloader").join(CONFIG_FILE_NAME))
}

/// Boolean flag value: `1`/`0`, `true`/`false`, `yes`/`no` or `on`/`off`
pub fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected 0 or 1, got \"{other}\"")),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    /// Sets an environment variable and restores the previous value on drop
    struct EnvGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests touching the environment run serially
            unsafe { std::env::set_var(key, value) };
            Self { key, original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: see `EnvGuard::set`
            unsafe {
                match &self.original {
                    Some(original) => std::env::set_var(self.key, original),
                    None => std::env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("Yes"), Ok(true));
        assert_eq!(parse_flag("0"), Ok(false));
        assert!(parse_flag("2").is_err());
    }

    #[test]
    #[serial]
    fn test_layers_override_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&user, "fix_dir = false\nstrip_comments = true\n").unwrap();
        fs::write(&project, "strip_comments = false\nwrap_namespaces = true\n").unwrap();
        let _env = EnvGuard::set("PRELOADER_WRAP_NAMESPACES", "0");

        let config = Config::load_from(&[user, project, dir.path().join("missing.toml")]).unwrap();
        assert_eq!(
            config,
            Config {
                fix_dir: false,
                strip_comments: false,
                wrap_namespaces: false,
                ..Config::default()
            }
        );
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        let _env = EnvGuard::set("PRELOADER_FIX_FILE", "maybe");
        let err = PartialConfig::from_env().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value \"maybe\" for PRELOADER_FIX_FILE"
        );
    }

    #[test]
    #[serial]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "fix_dirs = true\n").unwrap();
        assert!(matches!(
            Config::load_from(&[path]),
            Err(PreloadError::Configuration(_))
        ));
    }

    #[test]
    fn test_cli_layer_and_derived_options() {
        let mut config = Config::default();
        config.merge(PartialConfig {
            strip_comments: Some(true),
            strict_header: Some(true),
            ..PartialConfig::default()
        });
        assert_eq!(
            config.bundle_options(),
            BundleOptions {
                keep_comments: false,
                strict_header: true
            }
        );
        assert!(config.visitor_config().fix_dir);
    }
}
