//! Configuration resolution and loading tests
//!
//! Uses serial_test to prevent environment variable races between tests
//! that manipulate PMMS_TEST_CONFIG.

use pmms_common::config::{load_toml_or_default, parse_toml, resolve_config_path, LoggingConfig};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Sample {
    #[serde(default)]
    port: u16,
    #[serde(default)]
    logging: Option<LoggingConfig>,
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var("PMMS_TEST_CONFIG", "/tmp/from-env.toml");
    let cli = PathBuf::from("/tmp/from-cli.toml");

    let resolved = resolve_config_path(Some(&cli), "PMMS_TEST_CONFIG");
    assert_eq!(resolved, Some(cli));

    env::remove_var("PMMS_TEST_CONFIG");
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var("PMMS_TEST_CONFIG", "/tmp/from-env.toml");

    let resolved = resolve_config_path(None, "PMMS_TEST_CONFIG");
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var("PMMS_TEST_CONFIG");
}

#[test]
fn test_missing_file_yields_defaults() {
    let path = PathBuf::from("/nonexistent/pmms/config.toml");
    let cfg: Sample = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(cfg, Sample::default());

    let cfg: Sample = load_toml_or_default(None).unwrap();
    assert_eq!(cfg, Sample::default());
}

#[test]
fn test_existing_file_is_parsed() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = 30121\n[logging]\nlevel = \"debug\"").unwrap();

    let cfg: Sample = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(cfg.port, 30121);
    assert_eq!(cfg.logging.unwrap().level, "debug");
}

#[test]
fn test_malformed_file_is_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "port = [this is not toml").unwrap();

    let result: pmms_common::Result<Sample> = load_toml_or_default(Some(file.path()));
    assert!(result.is_err());
}

#[test]
fn test_logging_level_defaults_to_info() {
    let cfg: Sample = parse_toml("[logging]\n").unwrap();
    assert_eq!(cfg.logging.unwrap().level, "info");
}
