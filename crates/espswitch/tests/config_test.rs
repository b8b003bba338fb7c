use std::io::Write;
use std::time::Duration;

use espswitch::config::LogLevel;
use espswitch::Config;
use espswitch::ConfigError;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
        [logging]
        level = "warn"

        [accessory]
        name = "Garage Door"
        host = "192.168.1.40"
        updateInterval = 20000

        [api]
        listen = "0.0.0.0"
        "#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.accessory.name, "Garage Door");
    assert_eq!(
        config.accessory.effective_update_interval(),
        Duration::from_secs(20)
    );

    let api = config.api.unwrap();
    assert_eq!(api.listen, "0.0.0.0");
    assert_eq!(api.port, 8565);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::from_file(&path).unwrap_err();
    match err {
        ConfigError::Io(p, e) => {
            assert_eq!(p, path);
            assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected io error, got {:?}", other),
    }
}

#[test]
fn test_unknown_log_level_is_parse_error() {
    let file = write_config(
        r#"
        [logging]
        level = "chatty"

        [accessory]
        name = "Relay"
        host = "10.0.0.5"
        "#,
    );

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_validation_messages() {
    let file = write_config(
        r#"
        [accessory]
        name = ""
        host = "10.0.0.5"
        "#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"Invalid value for accessory.name: must not be empty");

    let file = write_config(
        r#"
        [accessory]
        name = "Relay"
        host = "10.0.0.5/state"
        "#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"Invalid value for accessory.host: expected host[:port], got "10.0.0.5/state""#);
}
