//! JoinNode — fan-in synchronizer.
//!
//! Receives one message per input port, in port order, then assembles them
//! into a single output. Branches are paired by arrival order; each branch
//! is a single-threaded FIFO so the n-th message on every port belongs to
//! the same item. The `ItemId` on every part is still checked, and a
//! mismatch is a fatal contract violation.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::Tagged;
use crate::pipeline::node::StageContext;
use crate::pipeline::nodes::analysis::AnalysisKind;
use crate::pipeline::packet::{AnalysisResult, CombinedRecord, Completion, JoinedCompletion};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

static ANALYSIS_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("max", PortKind::Analysis),
    PortDescriptor::input("equal", PortKind::Analysis),
    PortDescriptor::input("min", PortKind::Analysis),
    PortDescriptor::output("record", PortKind::Record),
];

static COMPLETION_PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("inversion", PortKind::Completion),
    PortDescriptor::input("brightness", PortKind::Completion),
    PortDescriptor::output("done", PortKind::Completion),
];

/// Builds the joined output from one part per port, in port order.
pub type Assemble<T, O> = fn(&'static str, Vec<T>) -> PipelineResult<O>;

pub struct JoinNode<T, O> {
    name: &'static str,
    ports: &'static [PortDescriptor],
    inputs: Vec<Receiver<T>>,
    output: Sender<O>,
    assemble: Assemble<T, O>,
}

impl<T: Tagged, O> JoinNode<T, O> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        self.ports
    }

    pub fn run(self, ctx: &StageContext) -> PipelineResult<()> {
        let width = self.inputs.len();

        loop {
            let mut parts = Vec::with_capacity(width);
            for rx in &self.inputs {
                match rx.recv() {
                    Ok(part) => parts.push(part),
                    // upstream finished between items
                    Err(_) if parts.is_empty() => return Ok(()),
                    Err(_) => {
                        return Err(PipelineError::PartialJoin {
                            name: self.name,
                            received: parts.len(),
                            ports: width,
                        })
                    }
                }
            }

            check_same_item(self.name, &parts)?;
            let item = parts[0].item();
            tracing::trace!(stage = ctx.name, %item, "joined");

            let joined = (self.assemble)(self.name, parts)?;
            self.output
                .send(joined)
                .map_err(|_| PipelineError::Disconnected(ctx.name))?;
        }
    }
}

impl JoinNode<AnalysisResult, Arc<CombinedRecord>> {
    /// Join 1: (max, equal, min) results into one `CombinedRecord`.
    pub fn analyses(
        max: Receiver<AnalysisResult>,
        equal: Receiver<AnalysisResult>,
        min: Receiver<AnalysisResult>,
        output: Sender<Arc<CombinedRecord>>,
    ) -> Self {
        Self {
            name: "join_analyses",
            ports: ANALYSIS_PORTS,
            inputs: vec![max, equal, min],
            output,
            assemble: combine_analyses,
        }
    }
}

impl JoinNode<Completion, JoinedCompletion> {
    /// Join 2: completions of both stage-2 branches.
    pub fn completions(
        inversion: Receiver<Completion>,
        brightness: Receiver<Completion>,
        output: Sender<JoinedCompletion>,
    ) -> Self {
        Self {
            name: "join_completions",
            ports: COMPLETION_PORTS,
            inputs: vec![inversion, brightness],
            output,
            assemble: join_completions,
        }
    }
}

/// Fails unless every part carries the item of the first part.
pub fn check_same_item<T: Tagged>(name: &'static str, parts: &[T]) -> PipelineResult<()> {
    let Some(expected) = parts.first().map(Tagged::item) else {
        return Ok(());
    };
    for (port, part) in parts.iter().enumerate().skip(1) {
        let found = part.item();
        if found != expected {
            return Err(PipelineError::Misattributed {
                name,
                expected,
                found,
                port,
            });
        }
    }
    Ok(())
}

pub fn combine_analyses(
    name: &'static str,
    parts: Vec<AnalysisResult>,
) -> PipelineResult<Arc<CombinedRecord>> {
    let received = parts.len();
    let [max, equal, min]: [AnalysisResult; 3] =
        parts.try_into().map_err(|_| PipelineError::PartialJoin {
            name,
            received,
            ports: 3,
        })?;

    debug_assert_eq!(max.kind, AnalysisKind::Maximum);
    debug_assert!(matches!(equal.kind, AnalysisKind::Equal(_)));
    debug_assert_eq!(min.kind, AnalysisKind::Minimum);

    Ok(Arc::new(CombinedRecord { max, equal, min }))
}

pub fn join_completions(
    _name: &'static str,
    parts: Vec<Completion>,
) -> PipelineResult<JoinedCompletion> {
    // ids already checked equal
    let item = parts.first().map(|c| c.item).unwrap_or_default();
    Ok(JoinedCompletion { item })
}
