//! Command-line surface.
//!
//! Every flag maps onto one [`RawConfig`] field so that the command line can
//! be layered over a config file. Range checks happen in
//! [`PipelineConfig::from_raw`], not in clap, so that the file and the
//! command line report identical errors.

use super::{ConfigError, PipelineConfig, RawConfig};
use crate::pipeline::nodes::analysis::ExtremumSeed;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "matflow", version, about, long_about = None)]
pub struct Cli {
    /// Brightness value to search for [0..255]
    #[arg(short = 'b', long = "brightness", value_name = "NUM", allow_negative_numbers = true)]
    pub brightness: Option<i64>,

    /// Max number of matrices processed at a time
    #[arg(short = 'l', long = "limit", value_name = "LIMIT", allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Log file receiving one aggregate brightness value per matrix
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Number of matrices to generate
    #[arg(short = 'n', long = "count", value_name = "N")]
    pub count: Option<u64>,

    /// Seed for matrix generation
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Matrix height
    #[arg(long, value_name = "N")]
    pub rows: Option<usize>,

    /// Matrix width
    #[arg(long, value_name = "N")]
    pub cols: Option<usize>,

    /// TOML file with default options; command-line flags take precedence
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start the extremum finders at 0 instead of the first sample
    #[arg(long)]
    pub zero_seeded_extrema: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging for the pipeline
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The configuration layer expressed by the flags alone.
    pub fn raw(&self) -> RawConfig {
        RawConfig {
            brightness: self.brightness,
            max_in_flight: self.limit,
            log_file: self.log_file.clone(),
            item_count: self.count,
            rows: self.rows,
            cols: self.cols,
            seed: self.seed,
            extremum_seed: self.zero_seeded_extrema.then_some(ExtremumSeed::Zero),
        }
    }

    /// Resolve the final configuration: config file (if any), then flags.
    pub fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => RawConfig::load(path)?,
            None => RawConfig::default(),
        };
        PipelineConfig::from_raw(base.merge(self.raw()))
    }

    /// Usage text printed alongside configuration errors.
    pub fn usage() -> String {
        Self::command().render_help().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("matflow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["-b", "128", "-l", "4", "-f", "out.log"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.brightness, 128);
        assert_eq!(config.max_in_flight.get(), 4);
        assert_eq!(config.log_file, Some(PathBuf::from("out.log")));
    }

    #[test]
    fn test_negative_limit_is_config_error() {
        let cli = parse(&["-b", "1", "-l", "-2"]);
        assert!(matches!(
            cli.resolve(),
            Err(ConfigError::NegativeMaxInFlight(-2))
        ));
    }

    #[test]
    fn test_missing_brightness() {
        let cli = parse(&["-l", "2"]);
        assert!(matches!(
            cli.resolve(),
            Err(ConfigError::MissingOption("brightness"))
        ));
    }

    #[test]
    fn test_zero_seeded_flag() {
        let cli = parse(&["-b", "1", "-l", "1", "--zero-seeded-extrema"]);
        assert_eq!(cli.resolve().unwrap().extremum_seed, ExtremumSeed::Zero);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "brightness = 3\nmax_in_flight = 5\nseed = 9").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["--config", &path, "-b", "200"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.brightness, 200);
        assert_eq!(config.max_in_flight.get(), 5);
        assert_eq!(config.seed, 9);
    }

    #[test]
    fn test_usage_mentions_options() {
        let usage = Cli::usage();
        assert!(usage.contains("--brightness"));
        assert!(usage.contains("--limit"));
        assert!(usage.contains("--log-file"));
    }
}
