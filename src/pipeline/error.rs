//! Pipeline-specific error types.
//!
//! Every variant here is a contract violation or a lost peer, never a
//! recoverable runtime condition: stages are pure functions over in-memory
//! data, so nothing is retried.

use crate::pipeline::id::{ItemId, NodeId};
use thiserror::Error;

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{name}' ({node_id:?}) failed: {message}")]
    StageFailed {
        node_id: NodeId,
        name: &'static str,
        message: String,
    },

    #[error("Stage '{0}' lost its downstream peer")]
    Disconnected(&'static str),

    #[error("Capacity returned while all {max} slots were already free")]
    CapacityOverflow { max: usize },

    #[error("Feedback edge closed with {in_flight} item(s) still in flight")]
    FeedbackLost { in_flight: usize },

    #[error("Join '{name}' received {expected:?} on port 0 but {found:?} on port {port}")]
    Misattributed {
        name: &'static str,
        expected: ItemId,
        found: ItemId,
        port: usize,
    },

    #[error("Join '{name}' closed with {received} of {ports} branch results for one item")]
    PartialJoin {
        name: &'static str,
        received: usize,
        ports: usize,
    },

    #[error("No port of '{from}' can feed '{to}'")]
    IncompatiblePorts {
        from: &'static str,
        to: &'static str,
    },

    #[error("Cycle detected in forward edges of the pipeline graph")]
    CycleDetected,

    #[error("Expected exactly one feedback edge, found {0}")]
    FeedbackEdgeCount(usize),

    #[error("Failed to spawn stage thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl PipelineError {
    /// Errors a stage reports because a peer went away first. When a run
    /// fails, these are symptoms; the root cause is some other error.
    pub fn is_cascade(&self) -> bool {
        matches!(
            self,
            PipelineError::Disconnected(_)
                | PipelineError::FeedbackLost { .. }
                | PipelineError::PartialJoin { .. }
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
