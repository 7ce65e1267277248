use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use seedline_config::{ConfigError, ConfigOverlay, PathRewrite, load, load_file};

#[test]
fn yaml_file_is_layered_under_cli_flags() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        r"
url: http://nas.local:8080
username: admin
password: adminadmin
poll_interval: 5
degraded_threshold: 4
path_rewrites:
  - /downloads:/mnt/nas/downloads
log_format: json
",
    )?;

    let cli = ConfigOverlay {
        poll_interval: Some(1.5),
        remote_mode: Some(true),
        ..ConfigOverlay::default()
    };
    let config = load(Some(&path), cli)?;

    assert_eq!(config.url.as_str(), "http://nas.local:8080/");
    assert_eq!(config.credentials(), Some(("admin", "adminadmin")));
    assert_eq!(config.poll_interval, Duration::from_millis(1500));
    assert_eq!(config.degraded_threshold, 4);
    assert!(config.remote_mode);
    assert_eq!(
        config.path_rewrites,
        vec![PathRewrite {
            from: PathBuf::from("/downloads"),
            to: PathBuf::from("/mnt/nas/downloads"),
        }]
    );
    Ok(())
}

#[test]
fn unknown_keys_and_missing_files_are_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(&path, "url: http://localhost:8080\npol_interval: 3\n")?;
    assert!(matches!(load_file(&path), Err(ConfigError::Parse { .. })));

    let missing = dir.path().join("absent.yaml");
    assert!(matches!(
        load(Some(&missing), ConfigOverlay::default()),
        Err(ConfigError::Io { .. })
    ));
    Ok(())
}

#[test]
fn empty_file_defers_to_cli() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(&path, "\n")?;
    let cli = ConfigOverlay {
        url: Some("https://seedbox.example:443/qbt".into()),
        ..ConfigOverlay::default()
    };
    let config = load(Some(&path), cli)?;
    assert_eq!(config.url.as_str(), "https://seedbox.example/qbt");
    Ok(())
}

#[test]
fn validation_errors_name_the_field() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(&path, "url: http://localhost:8080\nrequest_timeout: -1\n")?;
    match load(Some(&path), ConfigOverlay::default()) {
        Err(ConfigError::InvalidField { field, .. }) => assert_eq!(field, "request_timeout"),
        other => panic!("expected invalid field, got {other:?}"),
    }
    Ok(())
}
