//! AnalysisNode — per-matrix position finders.
//!
//! Three instances run side by side behind the matrix broadcaster, one per
//! [`AnalysisKind`]. Each is a single left-to-right pass over the samples.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::StageContext;
use crate::pipeline::packet::{AnalysisResult, Matrix, PositionSet};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortKind::Matrix),
    PortDescriptor::output("out", PortKind::Analysis),
];

/// Starting value of the running extremum in the max/min finders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumSeed {
    /// Start at the first sample, so every matrix yields its true extremum.
    #[default]
    FirstSample,
    /// Start at 0. The minimum finder then only ever reports zero-valued
    /// samples and is empty for a matrix without any.
    Zero,
}

/// Which positions a finder flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Maximum,
    Equal(u8),
    Minimum,
}

impl AnalysisKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::Maximum => "max_finder",
            AnalysisKind::Equal(_) => "equal_finder",
            AnalysisKind::Minimum => "min_finder",
        }
    }

    /// Run this finder over `samples`.
    pub fn scan(&self, samples: &[u8], seed: ExtremumSeed) -> PositionSet {
        match *self {
            AnalysisKind::Maximum => find_maximum_positions(samples, seed),
            AnalysisKind::Equal(target) => find_equal_positions(samples, target),
            AnalysisKind::Minimum => find_minimum_positions(samples, seed),
        }
    }
}

/// Every index holding the largest sample.
pub fn find_maximum_positions(samples: &[u8], seed: ExtremumSeed) -> PositionSet {
    scan_extremum(samples, seed, |sample, running| sample > running)
}

/// Every index holding the smallest sample.
///
/// With [`ExtremumSeed::Zero`] this only reports positions holding 0.
pub fn find_minimum_positions(samples: &[u8], seed: ExtremumSeed) -> PositionSet {
    scan_extremum(samples, seed, |sample, running| sample < running)
}

/// Every index whose sample equals `target`.
pub fn find_equal_positions(samples: &[u8], target: u8) -> PositionSet {
    samples
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s == target)
        .map(|(i, _)| i)
        .collect()
}

fn scan_extremum(
    samples: &[u8],
    seed: ExtremumSeed,
    beats: impl Fn(u8, u8) -> bool,
) -> PositionSet {
    let mut positions = PositionSet::new();
    let Some(&first) = samples.first() else {
        return positions;
    };

    let mut running = match seed {
        ExtremumSeed::FirstSample => first,
        ExtremumSeed::Zero => 0,
    };

    for (i, &sample) in samples.iter().enumerate() {
        if beats(sample, running) {
            running = sample;
            positions.clear();
            positions.push(i);
        } else if sample == running {
            positions.push(i);
        }
    }
    positions
}

/// One finder stage: matrix in, `AnalysisResult` out.
pub struct AnalysisNode {
    kind: AnalysisKind,
    seed: ExtremumSeed,
    input: Receiver<Arc<Matrix>>,
    output: Sender<AnalysisResult>,
}

impl AnalysisNode {
    pub fn new(
        kind: AnalysisKind,
        seed: ExtremumSeed,
        input: Receiver<Arc<Matrix>>,
        output: Sender<AnalysisResult>,
    ) -> Self {
        Self {
            kind,
            seed,
            input,
            output,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    pub fn run(self, ctx: &StageContext) -> PipelineResult<()> {
        for matrix in self.input.iter() {
            let positions = self.kind.scan(matrix.samples(), self.seed);
            tracing::trace!(
                stage = ctx.name,
                item = %matrix.id(),
                flagged = positions.len(),
                "scan complete"
            );

            let result = AnalysisResult {
                kind: self.kind,
                matrix,
                positions,
            };
            self.output
                .send(result)
                .map_err(|_| PipelineError::Disconnected(ctx.name))?;
        }
        Ok(())
    }
}
