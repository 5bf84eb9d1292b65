//! Root folder resolution and TOML loading tests
//!
//! Tests that touch DROPS_ROOT_FOLDER are marked #[serial] so they do not
//! race on the process environment.

use drops_common::config::{
    default_root_folder, ensure_root_folder, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert_eq!(resolved, default_root_folder());
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/drops-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/drops-toml-root")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/drops-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/drops-toml-root")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/drops-toml-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_cli_beats_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/drops-env-root");

    let resolved = resolve_root_folder(
        Some(Path::new("/tmp/drops-cli-root")),
        &TomlConfig::default(),
    );
    assert_eq!(resolved, PathBuf::from("/tmp/drops-cli-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = TomlConfig::load_or_default(Some(&missing)).unwrap();
    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "root_folder = \"/srv/drops\"\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let config = TomlConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/drops")));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_broken_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging\nlevel = ").unwrap();

    assert!(TomlConfig::load_or_default(Some(&path)).is_err());
}

#[test]
fn test_ensure_root_folder_creates_nested_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");

    ensure_root_folder(&nested).unwrap();
    assert!(nested.is_dir());
}
