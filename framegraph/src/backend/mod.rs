//! GPU backend abstraction layer.
//!
//! The frame graph never talks to a graphics API directly. It records through
//! the [`CommandContext`] trait and submits through the [`GpuBackend`] trait,
//! both passed in explicitly by the caller; there is no global device state.
//!
//! # Available Backends
//!
//! - `dummy` (default feature): Records every command in memory, for tests and
//!   tooling without a GPU
//!
//! # Context Kinds
//!
//! A context can record its own kind of work and every less capable kind:
//! graphics contexts accept compute and copy passes, compute contexts accept
//! copy passes.

mod error;

#[cfg(feature = "dummy")]
pub mod dummy;

pub use error::BackendError;

use std::any::Any;

use crate::barrier::Barrier;
use crate::graph::PassKind;
use crate::resource::ResourceHandle;

/// Capability of a command-recording context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKind {
    /// Copies only.
    Copy,
    /// Compute and copies.
    Compute,
    /// Everything.
    Graphics,
}

impl ContextKind {
    /// The least capable context able to record `kind`.
    pub fn for_pass(kind: PassKind) -> Self {
        match kind {
            PassKind::Copy => Self::Copy,
            PassKind::Compute => Self::Compute,
            PassKind::Graphics => Self::Graphics,
        }
    }

    /// Check if a pass of `kind` may record into this context.
    pub fn supports(self, kind: PassKind) -> bool {
        Self::for_pass(kind) <= self
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Compute => "compute",
            Self::Graphics => "graphics",
        }
    }
}

/// A command list being recorded.
///
/// Passes receive a `&mut dyn CommandContext`. Backend-specific commands are
/// reached by downcasting through [`CommandContext::as_any_mut`].
pub trait CommandContext: Send {
    /// Capability of this context.
    fn kind(&self) -> ContextKind;

    /// Record a batch of barriers as a single call.
    fn resource_barriers(&mut self, barriers: &[Barrier]);

    /// Open a named debug region.
    fn begin_event(&mut self, name: &str);

    /// Close the innermost debug region.
    fn end_event(&mut self);

    /// Record a compute dispatch.
    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);

    /// Record a non-indexed draw.
    fn draw(&mut self, vertex_count: u32, instance_count: u32);

    /// Record a full-resource copy.
    fn copy_resource(&mut self, dst: ResourceHandle, src: ResourceHandle);

    /// Access the concrete context type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A device able to hand out command contexts and execute them.
///
/// Implementations must be shareable between recording threads.
pub trait GpuBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Allocate a context for recording.
    fn create_context(&self, kind: ContextKind) -> Result<Box<dyn CommandContext>, BackendError>;

    /// Close the contexts and execute them on the device queue in the given
    /// order.
    fn submit(&self, contexts: Vec<Box<dyn CommandContext>>) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_kind_support() {
        assert!(ContextKind::Graphics.supports(PassKind::Graphics));
        assert!(ContextKind::Graphics.supports(PassKind::Compute));
        assert!(ContextKind::Graphics.supports(PassKind::Copy));
        assert!(ContextKind::Compute.supports(PassKind::Copy));
        assert!(!ContextKind::Compute.supports(PassKind::Graphics));
        assert!(!ContextKind::Copy.supports(PassKind::Compute));
    }

    #[test]
    fn test_context_kind_for_pass() {
        assert_eq!(ContextKind::for_pass(PassKind::Compute), ContextKind::Compute);
        assert_eq!(
            ContextKind::for_pass(PassKind::Compute).max(ContextKind::for_pass(PassKind::Graphics)),
            ContextKind::Graphics
        );
    }
}
