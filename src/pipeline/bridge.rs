//! Thread boundary between the stage threads and the executor.
//!
//! Every stage reports through an [`EventSender`]; the executor drains the
//! matching receiver, folds events into the run report and forwards them to
//! an optional observer. The channel disconnects once every stage thread has
//! exited, which is how the executor detects quiescence.

use crate::pipeline::id::{EdgeId, ItemId, NodeId};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;

/// Messages sent from stages to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The source produced a matrix.
    Generated { item: ItemId },

    /// The gate forwarded an item; `in_flight` includes it.
    Admitted { item: ItemId, in_flight: usize },

    /// The gate had no free slot and is holding the item.
    Held { item: ItemId },

    /// A decrement pulse for `item` reached the gate.
    CapacityReturned { item: ItemId, in_flight: usize },

    /// Aggregate brightness of one matrix.
    Aggregate { item: ItemId, value: u64 },

    /// A matrix with no flagged position; no aggregate was produced.
    EmptyRecord { item: ItemId },

    /// The brightness log lost `count` lines during the run. Sent once,
    /// when the aggregate stage exits.
    LogWriteFailures { count: u64 },

    /// Both stage-2 branches finished and the decrement pulse was sent.
    Completed { item: ItemId },

    /// A stage returned normally.
    StageExited { node_id: NodeId, name: &'static str },

    /// A stage returned an error.
    StageFailed {
        node_id: NodeId,
        name: &'static str,
        message: String,
    },
}

/// Channel capacity for stage events (stages → executor).
const MSG_CHANNEL_CAPACITY: usize = 10_000;

/// Stage-side handle of the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PipelineEvent>,
}

impl EventSender {
    /// Send an event. Once the executor is gone events are dropped.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Create the event channel: `(sender_for_stages, receiver_for_executor)`.
pub fn event_channel() -> (EventSender, Receiver<PipelineEvent>) {
    let (tx, rx) = bounded(MSG_CHANNEL_CAPACITY);
    (EventSender { tx }, rx)
}

/// Snapshot of a single pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: &'static str,
    pub ports: Vec<PortDescriptor>,
}

/// Snapshot of a single pipeline edge.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub kind: PortKind,
    /// The edge closing the cycle back into the gate.
    pub feedback: bool,
}

/// Complete topology snapshot of the pipeline graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl TopologySnapshot {
    pub fn node(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn feedback_edges(&self) -> impl Iterator<Item = &EdgeSnapshot> {
        self.edges.iter().filter(|e| e.feedback)
    }

    /// Edges leaving `node`.
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &EdgeSnapshot> {
        self.edges.iter().filter(move |e| e.from_node == node)
    }

    /// Edges entering `node`.
    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &EdgeSnapshot> {
        self.edges.iter().filter(move |e| e.to_node == node)
    }
}
