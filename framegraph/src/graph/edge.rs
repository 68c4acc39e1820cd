//! Resource edges declared by passes.

use crate::resource::{ResourceId, ResourceState};

/// Whether a pass reads or writes the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    /// The pass reads the resource.
    Input,
    /// The pass writes the resource and becomes its latest producer.
    Output,
}

/// What an edge contributes to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// A GPU access; the resource is transitioned to the edge's state.
    Access,
    /// Ordering only; never produces a barrier.
    OrderOnly,
}

/// A pass's declared use of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Resource used by the pass.
    pub resource: ResourceId,
    /// State the resource must be in while the pass executes.
    pub state: ResourceState,
    /// Read or write.
    pub direction: EdgeDirection,
    /// Access or ordering only.
    pub kind: EdgeKind,
}

impl Edge {
    /// An access edge.
    pub fn access(resource: ResourceId, state: ResourceState, direction: EdgeDirection) -> Self {
        Self {
            resource,
            state,
            direction,
            kind: EdgeKind::Access,
        }
    }

    /// An ordering-only edge.
    pub fn order_only(resource: ResourceId, direction: EdgeDirection) -> Self {
        Self {
            resource,
            state: ResourceState::COMMON,
            direction,
            kind: EdgeKind::OrderOnly,
        }
    }

    /// Check if the pass writes the resource through this edge.
    pub fn is_output(&self) -> bool {
        self.direction == EdgeDirection::Output
    }

    /// Check if this edge only orders passes.
    pub fn is_order_only(&self) -> bool {
        self.kind == EdgeKind::OrderOnly
    }
}
