//! Stage abstraction for the pipeline.
//!
//! The set of stages is closed, so they are variants of one `StageNode`
//! enum rather than trait objects. Each variant owns its channel endpoints
//! and is consumed by `run` on its own thread.

use crate::pipeline::bridge::{event_channel, EventSender, PipelineEvent};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::NodeId;
use crate::pipeline::nodes::{
    AdmissionGateNode, AnalysisNode, BroadcastNode, BrightnessNode, FeedbackNode, InversionNode,
    JoinNode, MatrixSourceNode,
};
use crate::pipeline::packet::{
    AnalysisResult, CombinedRecord, Completion, JoinedCompletion, Matrix,
};
use crate::pipeline::port::PortDescriptor;
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// Per-thread context handed to a running stage.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub node_id: NodeId,
    pub name: &'static str,
    events: EventSender,
}

impl StageContext {
    pub fn new(node_id: NodeId, name: &'static str, events: EventSender) -> Self {
        Self {
            node_id,
            name,
            events,
        }
    }

    /// A context with its own event channel, for driving one stage by hand.
    pub fn detached(node_id: NodeId, name: &'static str) -> (Self, Receiver<PipelineEvent>) {
        let (events, rx) = event_channel();
        (Self::new(node_id, name, events), rx)
    }

    #[inline]
    pub fn emit(&self, event: PipelineEvent) {
        self.events.emit(event);
    }
}

/// Enum dispatch over the built-in stages.
pub enum StageNode {
    Source(MatrixSourceNode),
    Gate(AdmissionGateNode),
    MatrixBroadcast(BroadcastNode<Arc<Matrix>>),
    Analysis(AnalysisNode),
    AnalysisJoin(JoinNode<AnalysisResult, Arc<CombinedRecord>>),
    RecordBroadcast(BroadcastNode<Arc<CombinedRecord>>),
    Inversion(InversionNode),
    Brightness(BrightnessNode),
    CompletionJoin(JoinNode<Completion, JoinedCompletion>),
    Feedback(FeedbackNode),
}

impl StageNode {
    pub fn name(&self) -> &'static str {
        match self {
            StageNode::Source(n) => n.name(),
            StageNode::Gate(n) => n.name(),
            StageNode::MatrixBroadcast(n) => n.name(),
            StageNode::Analysis(n) => n.name(),
            StageNode::AnalysisJoin(n) => n.name(),
            StageNode::RecordBroadcast(n) => n.name(),
            StageNode::Inversion(n) => n.name(),
            StageNode::Brightness(n) => n.name(),
            StageNode::CompletionJoin(n) => n.name(),
            StageNode::Feedback(n) => n.name(),
        }
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        match self {
            StageNode::Source(n) => n.ports(),
            StageNode::Gate(n) => n.ports(),
            StageNode::MatrixBroadcast(n) => n.ports(),
            StageNode::Analysis(n) => n.ports(),
            StageNode::AnalysisJoin(n) => n.ports(),
            StageNode::RecordBroadcast(n) => n.ports(),
            StageNode::Inversion(n) => n.ports(),
            StageNode::Brightness(n) => n.ports(),
            StageNode::CompletionJoin(n) => n.ports(),
            StageNode::Feedback(n) => n.ports(),
        }
    }

    /// Process messages until the inputs close. Consumes the stage so that
    /// its senders are dropped on return.
    pub fn run(self, ctx: &StageContext) -> PipelineResult<()> {
        match self {
            StageNode::Source(n) => n.run(ctx),
            StageNode::Gate(n) => n.run(ctx),
            StageNode::MatrixBroadcast(n) => n.run(ctx),
            StageNode::Analysis(n) => n.run(ctx),
            StageNode::AnalysisJoin(n) => n.run(ctx),
            StageNode::RecordBroadcast(n) => n.run(ctx),
            StageNode::Inversion(n) => n.run(ctx),
            StageNode::Brightness(n) => n.run(ctx),
            StageNode::CompletionJoin(n) => n.run(ctx),
            StageNode::Feedback(n) => n.run(ctx),
        }
    }
}
