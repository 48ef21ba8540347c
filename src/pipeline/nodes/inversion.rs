//! InversionNode — local-neighborhood transform branch.
//!
//! Computes the byte-inverted neighborhood of every flagged position. The
//! transformed samples are a workload, not an output: only a completion
//! token leaves this stage.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::Tagged;
use crate::pipeline::node::StageContext;
use crate::pipeline::packet::{CombinedRecord, Completion};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{Receiver, Sender};
use std::hint::black_box;
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortKind::Record),
    PortDescriptor::output("done", PortKind::Completion),
];

/// Invert every flagged neighborhood of `record`; returns how many were
/// transformed.
pub fn invert_neighborhoods(record: &CombinedRecord) -> usize {
    record
        .neighborhoods()
        .map(|hood| black_box(hood.inverted()))
        .count()
}

pub struct InversionNode {
    input: Receiver<Arc<CombinedRecord>>,
    output: Sender<Completion>,
}

impl InversionNode {
    pub fn new(input: Receiver<Arc<CombinedRecord>>, output: Sender<Completion>) -> Self {
        Self { input, output }
    }

    pub fn name(&self) -> &'static str {
        "inversion"
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    pub fn run(self, ctx: &StageContext) -> PipelineResult<()> {
        for record in self.input.iter() {
            let item = record.item();
            let transformed = invert_neighborhoods(&record);
            tracing::trace!(stage = ctx.name, %item, transformed, "neighborhoods inverted");

            self.output
                .send(Completion { item })
                .map_err(|_| PipelineError::Disconnected(ctx.name))?;
        }
        Ok(())
    }
}
