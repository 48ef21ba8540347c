//! BroadcastNode — duplicates every input to each of its outputs.
//!
//! Payloads are `Arc`s, so a "copy" is a reference-count bump.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::StageContext;
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{Receiver, Sender};

static MATRIX_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortKind::Matrix),
    PortDescriptor::output("out", PortKind::Matrix),
];

static RECORD_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortKind::Record),
    PortDescriptor::output("out", PortKind::Record),
];

pub struct BroadcastNode<T> {
    name: &'static str,
    ports: &'static [PortDescriptor],
    input: Receiver<T>,
    outputs: Vec<Sender<T>>,
}

impl<T: Clone> BroadcastNode<T> {
    fn new(
        name: &'static str,
        ports: &'static [PortDescriptor],
        input: Receiver<T>,
        outputs: Vec<Sender<T>>,
    ) -> Self {
        Self {
            name,
            ports,
            input,
            outputs,
        }
    }

    /// Stage-1 fan-out of admitted matrices to the finders.
    pub fn matrices(input: Receiver<T>, outputs: Vec<Sender<T>>) -> Self {
        Self::new("broadcast_matrix", MATRIX_PORTS, input, outputs)
    }

    /// Stage-2 fan-out of combined records to the aggregation branches.
    pub fn records(input: Receiver<T>, outputs: Vec<Sender<T>>) -> Self {
        Self::new("broadcast_record", RECORD_PORTS, input, outputs)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        self.ports
    }

    pub fn fan_out(&self) -> usize {
        self.outputs.len()
    }

    pub fn run(self, ctx: &StageContext) -> PipelineResult<()> {
        for item in self.input.iter() {
            for output in &self.outputs {
                output
                    .send(item.clone())
                    .map_err(|_| PipelineError::Disconnected(ctx.name))?;
            }
        }
        Ok(())
    }
}
