//! Configuration module for matflow-rs
//!
//! Configuration is resolved in two layers:
//! - [`RawConfig`] - every option optional, loaded from a TOML file and/or
//!   the command line (see [`cli`]). Later layers override earlier ones.
//! - [`PipelineConfig`] - the validated, immutable result that the pipeline
//!   is built from.
//!
//! Resolution fails with a [`ConfigError`] before any pipeline stage exists,
//! so a malformed configuration never starts a partial run.
//!
//! # File format
//!
//! ```toml
//! brightness = 128
//! max_in_flight = 4
//! log_file = "brightness.log"
//! item_count = 100
//! rows = 700
//! cols = 500
//! seed = 0
//! extremum_seed = "first_sample"
//! ```

pub mod cli;

pub use cli::Cli;

use crate::pipeline::nodes::analysis::ExtremumSeed;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of matrices produced before the source is exhausted
pub const DEFAULT_ITEM_COUNT: u64 = 100;

/// Default matrix height (rows)
pub const DEFAULT_ROWS: usize = 700;

/// Default matrix width (columns, the row stride)
pub const DEFAULT_COLS: usize = 500;

/// Default seed for matrix generation
pub const DEFAULT_SEED: u64 = 0;

/// Errors raised while resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required option: {0}")]
    MissingOption(&'static str),

    #[error("brightness value {0} is outside [0, 255]")]
    BrightnessOutOfRange(i64),

    #[error("max in-flight count {0} is negative")]
    NegativeMaxInFlight(i64),

    #[error("max in-flight count must be at least 1; 0 would never admit an item")]
    ZeroMaxInFlight,

    #[error("matrix dimensions {rows}x{cols} are empty")]
    EmptyMatrix { rows: usize, cols: usize },

    #[error("failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to create log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Unvalidated configuration layer.
///
/// Signed integers are kept signed here so that negative input is reported
/// as a range error instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub brightness: Option<i64>,
    pub max_in_flight: Option<i64>,
    pub log_file: Option<PathBuf>,
    pub item_count: Option<u64>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub seed: Option<u64>,
    pub extremum_seed: Option<ExtremumSeed>,
}

impl RawConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a TOML config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Overlay `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        RawConfig {
            brightness: overrides.brightness.or(self.brightness),
            max_in_flight: overrides.max_in_flight.or(self.max_in_flight),
            log_file: overrides.log_file.or(self.log_file),
            item_count: overrides.item_count.or(self.item_count),
            rows: overrides.rows.or(self.rows),
            cols: overrides.cols.or(self.cols),
            seed: overrides.seed.or(self.seed),
            extremum_seed: overrides.extremum_seed.or(self.extremum_seed),
        }
    }
}

/// Validated pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Target value searched for by the equality finder
    pub brightness: u8,

    /// Maximum number of matrices admitted but not yet released
    pub max_in_flight: NonZeroUsize,

    /// Optional destination for aggregate brightness values
    pub log_file: Option<PathBuf>,

    /// Number of matrices the source produces before exhaustion
    pub item_count: u64,

    /// Matrix height
    pub rows: usize,

    /// Matrix width
    pub cols: usize,

    /// Seed for the source's generator
    pub seed: u64,

    /// Starting value of the extremum finders' running extremum
    pub extremum_seed: ExtremumSeed,
}

impl PipelineConfig {
    /// Shorthand for the two required options with every other option defaulted.
    pub fn new(brightness: i64, max_in_flight: i64) -> Result<Self, ConfigError> {
        Self::from_raw(RawConfig {
            brightness: Some(brightness),
            max_in_flight: Some(max_in_flight),
            ..RawConfig::default()
        })
    }

    /// Validate a raw layer into a pipeline configuration.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let brightness = raw
            .brightness
            .ok_or(ConfigError::MissingOption("brightness"))?;
        let brightness =
            u8::try_from(brightness).map_err(|_| ConfigError::BrightnessOutOfRange(brightness))?;

        let max_in_flight = raw
            .max_in_flight
            .ok_or(ConfigError::MissingOption("max_in_flight"))?;
        if max_in_flight < 0 {
            return Err(ConfigError::NegativeMaxInFlight(max_in_flight));
        }
        let max_in_flight = usize::try_from(max_in_flight)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::ZeroMaxInFlight)?;

        let rows = raw.rows.unwrap_or(DEFAULT_ROWS);
        let cols = raw.cols.unwrap_or(DEFAULT_COLS);
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyMatrix { rows, cols });
        }

        Ok(Self {
            brightness,
            max_in_flight,
            log_file: raw.log_file,
            item_count: raw.item_count.unwrap_or(DEFAULT_ITEM_COUNT),
            rows,
            cols,
            seed: raw.seed.unwrap_or(DEFAULT_SEED),
            extremum_seed: raw.extremum_seed.unwrap_or_default(),
        })
    }

    pub fn with_item_count(mut self, item_count: u64) -> Self {
        self.item_count = item_count;
        self
    }

    pub fn with_dimensions(mut self, rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "matrix dimensions must be non-zero");
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_extremum_seed(mut self, extremum_seed: ExtremumSeed) -> Self {
        self.extremum_seed = extremum_seed;
        self
    }

    /// Number of samples in one matrix.
    pub fn matrix_len(&self) -> usize {
        self.rows * self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(brightness: Option<i64>, max_in_flight: Option<i64>) -> RawConfig {
        RawConfig {
            brightness,
            max_in_flight,
            ..RawConfig::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = PipelineConfig::new(128, 4).unwrap();
        assert_eq!(config.brightness, 128);
        assert_eq!(config.max_in_flight.get(), 4);
        assert_eq!(config.item_count, DEFAULT_ITEM_COUNT);
        assert_eq!(config.rows, DEFAULT_ROWS);
        assert_eq!(config.cols, DEFAULT_COLS);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.extremum_seed, ExtremumSeed::FirstSample);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_brightness_bounds() {
        assert_eq!(PipelineConfig::new(0, 1).unwrap().brightness, 0);
        assert_eq!(PipelineConfig::new(255, 1).unwrap().brightness, 255);
        assert!(matches!(
            PipelineConfig::new(256, 1),
            Err(ConfigError::BrightnessOutOfRange(256))
        ));
        assert!(matches!(
            PipelineConfig::new(-1, 1),
            Err(ConfigError::BrightnessOutOfRange(-1))
        ));
    }

    #[test]
    fn test_missing_required_options() {
        assert!(matches!(
            PipelineConfig::from_raw(raw(None, Some(1))),
            Err(ConfigError::MissingOption("brightness"))
        ));
        assert!(matches!(
            PipelineConfig::from_raw(raw(Some(1), None)),
            Err(ConfigError::MissingOption("max_in_flight"))
        ));
    }

    #[test]
    fn test_max_in_flight_rejections() {
        assert!(matches!(
            PipelineConfig::new(10, -3),
            Err(ConfigError::NegativeMaxInFlight(-3))
        ));
        assert!(matches!(
            PipelineConfig::new(10, 0),
            Err(ConfigError::ZeroMaxInFlight)
        ));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let mut r = raw(Some(1), Some(1));
        r.cols = Some(0);
        assert!(matches!(
            PipelineConfig::from_raw(r),
            Err(ConfigError::EmptyMatrix { rows: 700, cols: 0 })
        ));
    }

    #[test]
    fn test_toml_layer_resolves() {
        let content = r#"
            brightness = 7
            max_in_flight = 2
            item_count = 3
            extremum_seed = "zero"
        "#;
        let raw = RawConfig::from_toml_str(content, Path::new("inline.toml")).unwrap();
        let config = PipelineConfig::from_raw(raw).unwrap();
        assert_eq!(config.brightness, 7);
        assert_eq!(config.max_in_flight.get(), 2);
        assert_eq!(config.item_count, 3);
        assert_eq!(config.extremum_seed, ExtremumSeed::Zero);
    }

    #[test]
    fn test_toml_unknown_field_rejected() {
        let err = RawConfig::from_toml_str("brigthness = 7", Path::new("typo.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_overrides_win() {
        let file = RawConfig {
            brightness: Some(1),
            max_in_flight: Some(8),
            seed: Some(42),
            ..RawConfig::default()
        };
        let cli = RawConfig {
            brightness: Some(200),
            ..RawConfig::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.brightness, Some(200));
        assert_eq!(merged.max_in_flight, Some(8));
        assert_eq!(merged.seed, Some(42));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RawConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
