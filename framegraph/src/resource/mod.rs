//! Resources tracked by the frame graph.
//!
//! A resource is anything a pass reads or writes: a texture, a buffer, an
//! acceleration structure. The graph never creates or owns GPU memory; owners
//! register an opaque [`ResourceHandle`] under a stable [`ResourceId`] each
//! frame, and the graph tracks the GPU-visible [`ResourceState`] of that
//! resource across frames.
//!
//! Resources without physical storage are *ordering tokens*. They let one pass
//! run after another without a data dependency and never produce barriers.

mod double_buffer;
mod state;
mod table;

pub use double_buffer::{DoubleBuffered, FrameParity, PingPong};
pub use state::ResourceState;
pub use table::{ResourceEntry, ResourceTable};

use std::fmt;

use framegraph_core::path::{PathId, fnv1a_64};

/// Stable identifier of a resource, usually the hash of its path.
///
/// The upper half of the identifier space, with the top bit set, is reserved
/// for ordering tokens created with [`ResourceId::synthetic`]. Path hashes are
/// folded into the lower half so they never collide with those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    const SYNTHETIC_BIT: u64 = 1 << 63;

    /// Identifier of the resource at `path`.
    pub const fn from_path(path: &str) -> Self {
        Self(fnv1a_64(path.as_bytes()) & !Self::SYNTHETIC_BIT)
    }

    /// Reserved identifier of the `index`-th ordering token.
    pub const fn synthetic(index: u32) -> Self {
        Self(Self::SYNTHETIC_BIT | index as u64)
    }

    /// Wrap a raw identifier.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw identifier.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Check if this identifier lies in the range reserved for ordering
    /// tokens.
    pub const fn is_reserved(self) -> bool {
        self.0 & Self::SYNTHETIC_BIT != 0
    }
}

impl From<PathId> for ResourceId {
    fn from(path: PathId) -> Self {
        Self(path.value() & !Self::SYNTHETIC_BIT)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reserved() {
            write!(f, "token#{}", self.0 & !Self::SYNTHETIC_BIT)
        } else {
            write!(f, "{:#018x}", self.0)
        }
    }
}

/// Opaque handle to the physical storage of a resource, as understood by the
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// Wrap a backend-specific value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the backend-specific value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Whether a resource is backed by GPU memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Backed by physical storage; transitions produce barriers.
    Physical(ResourceHandle),
    /// Ordering token only.
    Synthetic,
}

impl ResourceKind {
    /// Get the physical handle, if any.
    pub fn handle(self) -> Option<ResourceHandle> {
        match self {
            Self::Physical(handle) => Some(handle),
            Self::Synthetic => None,
        }
    }

    /// Check if this is an ordering token.
    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::Synthetic)
    }
}
