//! Port descriptors for the stage system.
//!
//! Each stage declares its ports (inputs/outputs) via static `PortDescriptor` arrays.
//! The builder uses these to validate edges and to render the topology.

use serde::Serialize;

/// The kind of message flowing through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortKind {
    /// Shared, immutable matrix.
    Matrix,
    /// One finder's positions over a matrix.
    Analysis,
    /// The joined triple of analysis results.
    Record,
    /// Completion token of a stage-2 branch, or the join of both.
    Completion,
    /// Capacity returned to the admission gate.
    Decrement,
}

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for a stage's port.
#[derive(Debug, Clone, Serialize)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    pub kind: PortKind,
}

impl PortDescriptor {
    pub const fn input(name: &'static str, kind: PortKind) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind,
        }
    }

    pub const fn output(name: &'static str, kind: PortKind) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            kind,
        }
    }
}

/// Finds the first output of `kind` on `from` that some input of `to` accepts.
pub fn compatible(from: &[PortDescriptor], to: &[PortDescriptor]) -> Option<PortKind> {
    from.iter()
        .filter(|p| p.direction == PortDirection::Output)
        .map(|p| p.kind)
        .find(|kind| {
            to.iter()
                .any(|p| p.direction == PortDirection::Input && p.kind == *kind)
        })
}
