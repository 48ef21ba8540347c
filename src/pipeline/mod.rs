//! Stage-based matrix dataflow pipeline.
//!
//! Matrices flow through typed stages connected by crossbeam channels. Each
//! stage runs on its own thread and handles one item at a time; the three
//! finders, and the two stage-2 branches, work concurrently.
//!
//! # Architecture
//!
//! ```text
//! [MatrixSource] ──► [AdmissionGate] ──► [Broadcast] ──┬──► [Max] ─────┐
//!                          ▲                           ├──► [Equal] ───┼──► [Join]
//!                          │                           └──► [Min] ─────┘      │
//!                          │                                                  ▼
//!                          │              [Join] ◄──┬── [Inversion]  ◄──┬── [Broadcast]
//!                          │                 │      └── [Brightness] ◄──┘
//!                          └── [Feedback] ◄──┘
//! ```
//!
//! # Design
//!
//! - **Credit-based admission** — the gate admits at most `max_in_flight`
//!   matrices; a slot is only returned by the decrement pulse sent once both
//!   stage-2 branches finished the item.
//! - **Feedback as a channel** — the pulse travels on a dedicated channel,
//!   the single edge excluded from the DAG check.
//! - **Enum dispatch** — `StageNode` enum over a closed set of stages.
//! - **Shared, immutable payloads** — matrices and combined records travel
//!   as `Arc`s and are never copied.
//! - **Quiescence by disconnection** — stages return when their inputs close.

pub mod bridge;
pub mod error;
pub mod executor;
pub mod id;
pub mod node;
pub mod nodes;
pub mod packet;
pub mod port;
pub mod report;

pub use bridge::{EdgeSnapshot, EventSender, NodeSnapshot, PipelineEvent, TopologySnapshot};
pub use error::{PipelineError, PipelineResult};
pub use executor::{topological_order, Pipeline, PipelineBuilder};
pub use id::{EdgeId, ItemId, NodeId, Tagged};
pub use node::{StageContext, StageNode};
pub use packet::{
    AnalysisResult, CombinedRecord, Completion, DecrementPulse, JoinedCompletion, Matrix,
    Neighborhood, PositionSet, MAX_NEIGHBORHOOD,
};
pub use port::{PortDescriptor, PortDirection, PortKind};
pub use report::PipelineReport;
