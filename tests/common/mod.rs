//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use matflow_rs::pipeline::nodes::{aggregate_brightness, AnalysisKind, MatrixSource};
use matflow_rs::pipeline::{AnalysisResult, CombinedRecord};
use matflow_rs::PipelineConfig;
use std::sync::Arc;

/// Aggregates the pipeline must produce for `config`, in item order,
/// computed on the test thread from the same seeded source.
pub fn expected_aggregates(config: &PipelineConfig) -> Vec<Option<u64>> {
    MatrixSource::new(config.seed, config.rows, config.cols, config.item_count)
        .map(|matrix| {
            let matrix = Arc::new(matrix);
            let analyse = |kind: AnalysisKind| AnalysisResult {
                kind,
                positions: kind.scan(matrix.samples(), config.extremum_seed),
                matrix: matrix.clone(),
            };
            let record = CombinedRecord {
                max: analyse(AnalysisKind::Maximum),
                equal: analyse(AnalysisKind::Equal(config.brightness)),
                min: analyse(AnalysisKind::Minimum),
            };
            aggregate_brightness(&record)
        })
        .collect()
}

/// Parse one decimal value per line.
pub fn parse_log(text: &str) -> Vec<u64> {
    text.lines()
        .map(|line| {
            line.parse()
                .unwrap_or_else(|_| panic!("log line {line:?} is not a decimal integer"))
        })
        .collect()
}
