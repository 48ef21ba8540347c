//! FeedbackNode — turns a joined completion into one decrement pulse.
//!
//! This is the only sender on the gate's decrement channel, which is the
//! single feedback edge of the graph.

use crate::pipeline::bridge::PipelineEvent;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::StageContext;
use crate::pipeline::packet::{DecrementPulse, JoinedCompletion};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{Receiver, Sender};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("done", PortKind::Completion),
    PortDescriptor::output("decrement", PortKind::Decrement),
];

pub struct FeedbackNode {
    input: Receiver<JoinedCompletion>,
    output: Sender<DecrementPulse>,
}

impl FeedbackNode {
    pub fn new(input: Receiver<JoinedCompletion>, output: Sender<DecrementPulse>) -> Self {
        Self { input, output }
    }

    pub fn name(&self) -> &'static str {
        "feedback"
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    pub fn run(self, ctx: &StageContext) -> PipelineResult<()> {
        for done in self.input.iter() {
            let item = done.item;
            self.output
                .send(DecrementPulse { item })
                .map_err(|_| PipelineError::Disconnected(ctx.name))?;
            ctx.emit(PipelineEvent::Completed { item });
        }
        Ok(())
    }
}
