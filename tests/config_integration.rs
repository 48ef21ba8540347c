//! Integration tests for configuration resolution
//!
//! Every malformed configuration must be rejected before a pipeline exists.

mod common;

use clap::Parser;
use matflow_rs::{Cli, ConfigError, FlowError, PipelineBuilder, PipelineConfig};
use std::io::Write;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("matflow").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_zero_limit_rejected() {
    assert!(matches!(
        PipelineConfig::new(128, 0),
        Err(ConfigError::ZeroMaxInFlight)
    ));
    assert!(matches!(
        cli(&["-b", "128", "-l", "0"]).resolve(),
        Err(ConfigError::ZeroMaxInFlight)
    ));
}

#[test]
fn test_brightness_range() {
    assert!(PipelineConfig::new(0, 1).is_ok());
    assert!(PipelineConfig::new(255, 1).is_ok());
    assert!(matches!(
        cli(&["-b", "256", "-l", "1"]).resolve(),
        Err(ConfigError::BrightnessOutOfRange(256))
    ));
    assert!(matches!(
        cli(&["-b", "-1", "-l", "1"]).resolve(),
        Err(ConfigError::BrightnessOutOfRange(-1))
    ));
}

#[test]
fn test_required_options() {
    assert!(matches!(
        cli(&[]).resolve(),
        Err(ConfigError::MissingOption("brightness"))
    ));
    assert!(matches!(
        cli(&["-b", "10"]).resolve(),
        Err(ConfigError::MissingOption("max_in_flight"))
    ));
}

#[test]
fn test_non_numeric_flag_is_usage_error() {
    let err = Cli::try_parse_from(["matflow", "-b", "bright", "-l", "1"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_config_file_layer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("matflow.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "brightness = 64\nmax_in_flight = 3\nitem_count = 7\nrows = 9\ncols = 4\nextremum_seed = \"zero\""
    )
    .unwrap();

    let config = cli(&["--config", path.to_str().unwrap(), "-n", "2"])
        .resolve()
        .unwrap();
    assert_eq!(config.brightness, 64);
    assert_eq!(config.max_in_flight.get(), 3);
    assert_eq!(config.item_count, 2);
    assert_eq!((config.rows, config.cols), (9, 4));
    assert_eq!(config.extremum_seed, matflow_rs::ExtremumSeed::Zero);
}

#[test]
fn test_bad_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "brightness = \"high\"\n").unwrap();
    assert!(matches!(
        cli(&["--config", path.to_str().unwrap()]).resolve(),
        Err(ConfigError::Parse { .. })
    ));

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        cli(&["--config", missing.to_str().unwrap()]).resolve(),
        Err(ConfigError::ReadFile { .. })
    ));
}

#[test]
fn test_unopenable_log_file_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::builders::ConfigBuilder::new()
        .log_file(dir.path().join("absent").join("out.log"))
        .build();
    let err = PipelineBuilder::new(config).build().err().unwrap();
    assert!(err.is_config());
    assert!(matches!(err, FlowError::Config(ConfigError::LogFile { .. })));
}
