//! Built-in pipeline stage implementations.

pub mod admission_gate;
pub mod analysis;
pub mod brightness;
pub mod broadcast;
pub mod feedback;
pub mod inversion;
pub mod join;
pub mod matrix_source;

pub use admission_gate::{AdmissionGateNode, CapacityCounter, GateState};
pub use analysis::{AnalysisKind, AnalysisNode, ExtremumSeed};
pub use brightness::{aggregate_brightness, BrightnessLog, BrightnessNode};
pub use broadcast::BroadcastNode;
pub use feedback::FeedbackNode;
pub use inversion::{invert_neighborhoods, InversionNode};
pub use join::JoinNode;
pub use matrix_source::{MatrixSource, MatrixSourceNode};
