//! Frame graph error types.

use std::fmt;

use crate::backend::{BackendError, ContextKind};
use crate::graph::{PassHandle, PassKind};
use crate::resource::{ResourceId, ResourceState};

/// Errors raised while building or executing a frame.
///
/// Everything except [`GraphError::Backend`] indicates a mistake in how passes
/// were declared. The frame cannot be scheduled and rendering should stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A resource was referenced before being registered in the current frame.
    UnregisteredResource(ResourceId),
    /// A physical resource was registered with an identifier from the
    /// synthetic range.
    ReservedResourceId(ResourceId),
    /// The same identifier was registered twice in one frame with different
    /// storage.
    ConflictingResourceHandle(ResourceId),
    /// Two passes registered under the same name in one frame.
    DuplicatePassName(String),
    /// More passes were registered than the configured limit.
    TooManyPasses {
        /// Configured maximum.
        limit: usize,
    },
    /// A pass handle from another frame or out of range.
    InvalidPassHandle(PassHandle),
    /// A state combining a write state with other bits.
    InvalidResourceState {
        /// Resource the edge was declared on.
        resource: ResourceId,
        /// Offending state.
        state: ResourceState,
    },
    /// An order-only input with no producer in the current frame.
    MissingProducer {
        /// Name of the consuming pass.
        pass: String,
        /// Ordering token nobody produced.
        resource: ResourceId,
    },
    /// The pass dependencies contain a cycle.
    CyclicDependency {
        /// Names of the passes forming one of the cycles, in dependency order.
        cycle: Vec<String>,
    },
    /// A pass was handed a context that cannot record its kind of work.
    IncompatibleContext {
        /// Name of the pass.
        pass: String,
        /// Kind of the pass.
        kind: PassKind,
        /// Kind of the context.
        context: ContextKind,
    },
    /// The execution order was built for another frame or before more passes
    /// were registered.
    StaleExecutionOrder,
    /// The backend failed to record or submit.
    Backend(BackendError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredResource(id) => {
                write!(f, "resource {id} is not registered in this frame")
            }
            Self::ReservedResourceId(id) => {
                write!(f, "resource {id} uses an identifier reserved for ordering tokens")
            }
            Self::ConflictingResourceHandle(id) => {
                write!(f, "resource {id} registered twice with different storage")
            }
            Self::DuplicatePassName(name) => write!(f, "duplicate pass name '{name}'"),
            Self::TooManyPasses { limit } => write!(f, "more than {limit} passes registered"),
            Self::InvalidPassHandle(handle) => write!(f, "invalid pass handle {handle:?}"),
            Self::InvalidResourceState { resource, state } => {
                write!(f, "invalid state {state} for resource {resource}")
            }
            Self::MissingProducer { pass, resource } => {
                write!(f, "pass '{pass}' waits on {resource} but no pass produces it")
            }
            Self::CyclicDependency { cycle } => {
                write!(f, "cyclic dependency: {}", cycle.join(" -> "))
            }
            Self::IncompatibleContext {
                pass,
                kind,
                context,
            } => write!(
                f,
                "pass '{pass}' ({}) cannot record into a {} context",
                kind.name(),
                context.name()
            ),
            Self::StaleExecutionOrder => {
                write!(f, "execution order does not match the frame being executed")
            }
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for GraphError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}
