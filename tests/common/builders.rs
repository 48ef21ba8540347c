//! Test data builders for creating test objects

use matflow_rs::{ExtremumSeed, PipelineConfig};
use std::path::PathBuf;

/// Builder for small, fast pipeline configurations
pub struct ConfigBuilder {
    brightness: i64,
    max_in_flight: i64,
    item_count: u64,
    rows: usize,
    cols: usize,
    seed: u64,
    log_file: Option<PathBuf>,
    extremum_seed: ExtremumSeed,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            brightness: 128,
            max_in_flight: 1,
            item_count: 5,
            rows: 16,
            cols: 12,
            seed: 42,
            log_file: None,
            extremum_seed: ExtremumSeed::FirstSample,
        }
    }

    pub fn brightness(mut self, brightness: i64) -> Self {
        self.brightness = brightness;
        self
    }

    pub fn max_in_flight(mut self, max_in_flight: i64) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn items(mut self, item_count: u64) -> Self {
        self.item_count = item_count;
        self
    }

    pub fn dimensions(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn zero_seeded(mut self) -> Self {
        self.extremum_seed = ExtremumSeed::Zero;
        self
    }

    pub fn build(self) -> PipelineConfig {
        let config = PipelineConfig::new(self.brightness, self.max_in_flight)
            .expect("builder produced an invalid configuration")
            .with_item_count(self.item_count)
            .with_dimensions(self.rows, self.cols)
            .with_seed(self.seed)
            .with_extremum_seed(self.extremum_seed);
        match self.log_file {
            Some(path) => config.with_log_file(path),
            None => config,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new().max_in_flight(3).items(9).build();
        assert_eq!(config.max_in_flight.get(), 3);
        assert_eq!(config.item_count, 9);
        assert_eq!(config.brightness, 128);
        assert!(config.log_file.is_none());
    }
}
