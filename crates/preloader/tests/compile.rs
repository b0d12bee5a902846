use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use pretty_assertions::assert_eq;
use preloader::{
    compile::{CompileRequest, execute},
    config::Config,
    loader::declarations,
    php,
};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn stub(name: &str) -> PathBuf {
    fixtures().join("stubs").join(name)
}

fn file_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| stub(name).display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Compile `config` into a fresh temporary directory, returning the bundle
/// and the progress output
fn compile(config: &str, cwd: &Path, settings: Config) -> (String, String, TempDir) {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("preload.php");
    let request = CompileRequest {
        config: Some(config.to_owned()),
        output: Some(output.clone()),
        settings,
        cwd: cwd.to_path_buf(),
    };
    let mut progress = Vec::new();
    execute(&request, &mut progress).unwrap();
    (
        fs::read_to_string(output).unwrap(),
        String::from_utf8(progress).unwrap(),
        dir,
    )
}

#[test]
fn test_default_bundle() {
    let config = file_list(&["Bar.php", "Foo.php", "Baz.php"]);
    let (bundle, _, _dir) = compile(&config, &fixtures(), Config::default());

    let stubs = fs::canonicalize(fixtures().join("stubs")).unwrap();
    let expected = format!(
        "<?php
namespace {{
use Tests\\Stubs\\Baz;
/**
 * Plain class outside any namespace.
 */
class Bar
{{
    public function getBaz()
    {{
        return new Baz();
    }}

    public function getDir()
    {{
        return '{}';
    }}
}}
}}

namespace {{
class Foo extends Bar
{{
    // where this file lives
    public function getFile()
    {{
        return '{}';
    }}
}}
}}

namespace Tests\\Stubs {{
class Baz
{{
}}
}}

",
        stubs.display(),
        stubs.join("Foo.php").display()
    );
    assert_eq!(bundle, expected);
}

#[test]
fn test_bundle_declares_every_type() {
    let config = file_list(&["Bar.php", "Foo.php", "Baz.php"]);
    let (bundle, _, _dir) = compile(&config, &fixtures(), Config::default());

    let ast = php::parse(&bundle).unwrap();
    let names: Vec<_> = declarations(&ast, Path::new("preload.php"))
        .into_iter()
        .map(|info| info.name)
        .collect();
    assert_eq!(names, vec!["Bar", "Foo", "Tests\\Stubs\\Baz"]);
}

#[test]
fn test_strip_comments() {
    let settings = Config {
        strip_comments: true,
        ..Config::default()
    };
    let (bundle, _, _dir) = compile(&file_list(&["Bar.php", "Foo.php"]), &fixtures(), settings);

    assert!(!bundle.contains("/**"));
    assert!(!bundle.contains("// where this file lives"));
    assert!(bundle.contains("class Foo extends Bar\n{\npublic function getFile()"));
}

#[test]
fn test_magic_constants_left_alone_when_disabled() {
    let settings = Config {
        fix_dir: false,
        fix_file: false,
        ..Config::default()
    };
    let (bundle, _, _dir) = compile(&file_list(&["Bar.php", "Foo.php"]), &fixtures(), settings);

    assert!(bundle.contains("return __DIR__;"));
    assert!(bundle.contains("return __FILE__;"));
}

#[test]
fn test_skip_dir_file() {
    let settings = Config {
        skip_dir_file: true,
        ..Config::default()
    };
    let config = file_list(&["Bar.php", "Foo.php", "Baz.php"]);
    let (bundle, progress, _dir) = compile(&config, &fixtures(), settings);

    assert_eq!(
        bundle,
        "<?php\nnamespace Tests\\Stubs {\nclass Baz\n{\n}\n}\n\n"
    );
    assert!(progress.contains(&format!("- Skipping {}\n", stub("Bar.php").display())));
    assert!(progress.contains(&format!("- Skipping {}\n", stub("Foo.php").display())));
    assert!(progress.contains(&format!("- Writing {}\n", stub("Baz.php").display())));
    assert!(progress.contains("- Files: 1/3 (skipped: 2)\n"));
}

#[test]
fn test_strict_types_handling() {
    let config = file_list(&["StrictClass.php"]);
    let settings = Config {
        strip_strict_types: true,
        strict_header: true,
        ..Config::default()
    };
    let (bundle, _, _dir) = compile(&config, &fixtures(), settings);

    assert!(bundle.starts_with("<?php declare(strict_types=1);\nnamespace Tests\\Stubs {\n"));
    assert_eq!(bundle.matches("strict_types").count(), 1);

    let (bundle, _, _dir) = compile(&config, &fixtures(), Config::default());
    assert!(bundle.starts_with("<?php\ndeclare(strict_types=1);\nnamespace Tests\\Stubs {\n"));
}

#[test]
fn test_capture_manifest() {
    let app = fixtures().join("app");
    let (bundle, progress, _dir) = compile("preload.toml", &app, Config::default());

    assert!(progress.starts_with("> Loading configuration file\n- Found 3 files\n"));
    let base = bundle.find("abstract class BaseController").unwrap();
    let responder = bundle.find("interface Responder").unwrap();
    let controller = bundle.find("class Controller extends").unwrap();
    assert!(base < responder && responder < controller);
    assert!(bundle.contains(&format!(
        "return '{}' . '/views';",
        fs::canonicalize(app.join("src/Http")).unwrap().display()
    )));
}

#[test]
fn test_missing_manifest_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let request = CompileRequest {
        config: Some("missing.toml".to_owned()),
        output: Some(dir.path().join("preload.php")),
        settings: Config::default(),
        cwd: dir.path().to_path_buf(),
    };
    let err = execute(&request, &mut Vec::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Configuration file \"{}\" does not exist.",
            dir.path().join("missing.toml").display()
        )
    );
    assert!(!dir.path().join("preload.php").exists());
}

#[test]
fn test_cli_reports_missing_config() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_preloader"))
        .current_dir(dir.path())
        .args(["compile", "--output", "preload.php"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("A config option is required."));
}

#[test]
fn test_cli_compiles() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_preloader"))
        .current_dir(dir.path())
        .args(["compile", "--config"])
        .arg(file_list(&["Baz.php"]))
        .args(["--output", "build/preload.php", "--strip_comments", "1"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("- Files: 1/1 (skipped: 0)"));
    assert_eq!(
        fs::read_to_string(dir.path().join("build/preload.php")).unwrap(),
        "<?php\nnamespace Tests\\Stubs {\nclass Baz\n{\n}\n}\n\n"
    );
}
