//! Configuration resolution tests
//!
//! Environment-variable tests are serialized because the process
//! environment is shared between test threads.

use horarium_common::config::{load_toml_config_from, RootFolderInitializer, RootFolderResolver};
use serial_test::serial;
use std::io::Write;

#[test]
fn test_toml_config_parses_all_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("horarium.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
root_folder = "/var/lib/horarium"
freetext_endpoint = "https://extract.example.net/v1/extract"
freetext_api_key = "secret"

[logging]
level = "horarium_se=debug"
"#
    )
    .unwrap();

    let config = load_toml_config_from(&path).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/var/lib/horarium"));
    assert_eq!(
        config.freetext_endpoint.as_deref(),
        Some("https://extract.example.net/v1/extract")
    );
    assert_eq!(config.freetext_api_key.as_deref(), Some("secret"));
    assert_eq!(config.logging.level.as_deref(), Some("horarium_se=debug"));
}

#[test]
fn test_toml_config_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("horarium.toml");
    std::fs::write(&path, "root_folder = [not toml").unwrap();

    assert!(load_toml_config_from(&path).is_err());
}

#[test]
#[serial]
fn test_root_folder_env_override_wins() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("HORARIUM_ROOT_FOLDER", dir.path());

    let resolved = RootFolderResolver::new("test").resolve();
    assert_eq!(resolved, dir.path());

    std::env::remove_var("HORARIUM_ROOT_FOLDER");
}

#[test]
#[serial]
fn test_initializer_creates_root_and_derives_db_path() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("horarium.db"));
}
