//! MatrixSourceNode — seeded synthetic matrix generator.
//!
//! The generator owns its `StdRng`; the same seed, dimensions and `rand`
//! version always produce the same sequence of matrices.

use crate::pipeline::bridge::PipelineEvent;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::ItemId;
use crate::pipeline::node::StageContext;
use crate::pipeline::packet::Matrix;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", PortKind::Matrix)];

/// Produces `limit` random matrices, then stays exhausted.
pub struct MatrixSource {
    rng: StdRng,
    rows: usize,
    cols: usize,
    limit: u64,
    generated: u64,
}

impl MatrixSource {
    pub fn new(seed: u64, rows: usize, cols: usize, limit: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rows,
            cols,
            limit,
            generated: 0,
        }
    }

    /// Generate the next matrix, or `None` once `limit` matrices exist.
    pub fn activate(&mut self) -> Option<Matrix> {
        if self.is_exhausted() {
            return None;
        }

        let mut samples = vec![0u8; self.rows * self.cols];
        self.rng.fill_bytes(&mut samples);

        let id = ItemId(self.generated);
        self.generated += 1;
        Some(Matrix::new(id, self.rows, self.cols, samples))
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn is_exhausted(&self) -> bool {
        self.generated >= self.limit
    }
}

impl Iterator for MatrixSource {
    type Item = Matrix;

    fn next(&mut self) -> Option<Matrix> {
        self.activate()
    }
}

pub struct MatrixSourceNode {
    source: MatrixSource,
    output: Sender<Arc<Matrix>>,
}

impl MatrixSourceNode {
    pub fn new(source: MatrixSource, output: Sender<Arc<Matrix>>) -> Self {
        Self { source, output }
    }

    pub fn name(&self) -> &'static str {
        "matrix_source"
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    /// Offer matrices to the gate until exhausted. Dropping the output on
    /// return is what tells the gate no more items will come.
    pub fn run(mut self, ctx: &StageContext) -> PipelineResult<()> {
        while let Some(matrix) = self.source.activate() {
            let item = matrix.id();
            ctx.emit(PipelineEvent::Generated { item });
            self.output
                .send(Arc::new(matrix))
                .map_err(|_| PipelineError::Disconnected(ctx.name))?;
        }

        tracing::debug!(generated = self.source.generated(), "source exhausted");
        Ok(())
    }
}
