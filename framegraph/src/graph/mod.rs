//! Frame graph infrastructure.
//!
//! The frame graph provides a declarative way to describe one frame of GPU
//! work. Passes declare the resources they read and write; the graph then:
//!
//! - Orders passes via topological sort, keeping registration order where
//!   the edges allow it
//! - Inserts state transitions and UAV barriers
//! - Records independent pass groups on several threads
//! - Submits everything to the backend in a single call
//!
//! # Architecture
//!
//! | Layer | Type | Lifetime |
//! |-------|------|----------|
//! | Graph | [`FrameGraph`] | Application; owns tracked resource state |
//! | **Frame** | [`Frame`] | One frame (this module) |
//! | Pass | [`Pass`] | One frame; owned by the [`PassRegistry`] |
//!
//! # Example
//!
//! ```
//! use framegraph::{DummyBackend, FrameGraph, PassKind, ResourceId, ResourceState};
//!
//! const HDR: ResourceId = ResourceId::from_path("Renderer/Hdr");
//!
//! let backend = DummyBackend::new();
//! let hdr = backend.create_resource("hdr");
//! let mut graph = FrameGraph::with_defaults();
//!
//! let mut frame = graph.begin_frame();
//! frame.register_resource(HDR, Some(hdr), ResourceState::COMMON)?;
//!
//! let lighting = frame.register_pass("Lighting", PassKind::Compute, |ctx| {
//!     ctx.dispatch(120, 68, 1);
//! })?;
//! frame.add_output(lighting, HDR, ResourceState::UNORDERED_ACCESS)?;
//!
//! let present = frame.register_pass("Present", PassKind::Graphics, |ctx| {
//!     ctx.draw(3, 1);
//! })?;
//! frame.add_input(present, HDR, ResourceState::PIXEL_SHADER_RESOURCE)?;
//!
//! let order = frame.build()?;
//! let report = frame.execute(&order, &backend)?;
//! assert_eq!(report.pass_count, 2);
//! assert_eq!(report.transition_barriers, 2);
//! # Ok::<(), framegraph::GraphError>(())
//! ```

mod edge;
mod pass;

pub use edge::{Edge, EdgeDirection, EdgeKind};
pub use pass::{Pass, PassHandle, PassKind, PassRegistry, RecordPass};

use std::fmt;

use crate::backend::{CommandContext, GpuBackend};
use crate::compiler::{self, ExecutionOrder};
use crate::config::FrameGraphConfig;
use crate::error::GraphError;
use crate::executor::{self, ExecutionReport};
use crate::resource::{ResourceHandle, ResourceId, ResourceKind, ResourceState, ResourceTable};

/// Long-lived frame graph.
///
/// Holds the configuration and the resource state that survives from one
/// frame to the next. Everything else lives in the [`Frame`] returned by
/// [`FrameGraph::begin_frame`].
#[derive(Debug)]
pub struct FrameGraph {
    config: FrameGraphConfig,
    resources: ResourceTable,
}

impl FrameGraph {
    /// Create a frame graph.
    pub fn new(config: FrameGraphConfig) -> Self {
        log::info!(
            "FrameGraph: created (recording threads: {}, max passes: {})",
            config.max_recording_threads,
            config.max_passes
        );
        Self {
            config,
            resources: ResourceTable::new(),
        }
    }

    /// Create a frame graph with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FrameGraphConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Get the tracked resources.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Index of the most recently started frame.
    pub fn frame_index(&self) -> u64 {
        self.resources.frame_index()
    }

    /// Start a new frame.
    ///
    /// Ordering tokens of the previous frame are dropped. Physical resources
    /// keep their tracked state but have to be registered again.
    pub fn begin_frame<'p>(&mut self) -> Frame<'_, 'p> {
        self.resources.begin_frame();
        let frame = self.resources.frame_index() as u32;
        log::trace!("FrameGraph: begin frame {frame}");
        Frame {
            registry: PassRegistry::new(frame, self.config.max_passes),
            resources: &mut self.resources,
            config: &self.config,
        }
    }

    /// Forget every tracked resource, e.g. after a window resize recreated
    /// the render targets.
    pub fn reset(&mut self) {
        log::info!(
            "FrameGraph: reset ({} resources forgotten)",
            self.resources.iter().count()
        );
        self.resources.clear();
    }
}

impl Default for FrameGraph {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One frame being declared.
///
/// `'g` borrows the owning [`FrameGraph`]; `'p` is the lifetime of data the
/// pass callbacks borrow.
pub struct Frame<'g, 'p> {
    registry: PassRegistry<'p>,
    resources: &'g mut ResourceTable,
    config: &'g FrameGraphConfig,
}

impl<'g, 'p> Frame<'g, 'p> {
    /// Index of this frame.
    pub fn frame_index(&self) -> u64 {
        self.resources.frame_index()
    }

    /// Get the configuration.
    pub fn config(&self) -> &FrameGraphConfig {
        self.config
    }

    /// Get the tracked resources.
    pub fn resources(&self) -> &ResourceTable {
        self.resources
    }

    /// Get the passes registered so far.
    pub fn registry(&self) -> &PassRegistry<'p> {
        &self.registry
    }

    /// Number of passes registered so far.
    pub fn pass_count(&self) -> usize {
        self.registry.len()
    }

    /// Register a resource for this frame.
    ///
    /// With a handle the resource is physical and `initial_state` becomes its
    /// tracked state. Without one it is an ordering token.
    pub fn register_resource(
        &mut self,
        id: ResourceId,
        handle: Option<ResourceHandle>,
        initial_state: ResourceState,
    ) -> Result<(), GraphError> {
        match handle {
            Some(handle) => self.resources.register(id, handle, initial_state),
            None => self.resources.register_synthetic(id, initial_state),
        }
    }

    /// Register a physical resource, keeping the state earlier frames left it
    /// in. Returns the state it starts this frame in.
    pub fn register_tracked_resource(
        &mut self,
        id: ResourceId,
        handle: ResourceHandle,
        fallback_state: ResourceState,
    ) -> Result<ResourceState, GraphError> {
        self.resources.register_tracked(id, handle, fallback_state)
    }

    /// Register an ordering token for this frame.
    pub fn register_order_token(&mut self, id: ResourceId) -> Result<(), GraphError> {
        self.resources.register_synthetic(id, ResourceState::COMMON)
    }

    /// Register a pass whose commands are recorded by `callback`.
    ///
    /// The callback runs exactly once, during [`Frame::execute`].
    pub fn register_pass<F>(
        &mut self,
        name: &str,
        kind: PassKind,
        callback: F,
    ) -> Result<PassHandle, GraphError>
    where
        F: FnMut(&mut dyn CommandContext) + Send + 'p,
    {
        self.registry.register(name, kind, Box::new(callback))
    }

    /// Register a pass recorded by a [`RecordPass`] implementation.
    pub fn register_pass_with(
        &mut self,
        name: &str,
        kind: PassKind,
        recorder: impl RecordPass + 'p,
    ) -> Result<PassHandle, GraphError> {
        self.registry.register(name, kind, Box::new(recorder))
    }

    /// Declare that `pass` reads `id` in `state`.
    pub fn add_input(
        &mut self,
        pass: PassHandle,
        id: ResourceId,
        state: ResourceState,
    ) -> Result<(), GraphError> {
        self.add_access(pass, id, state, EdgeDirection::Input)
    }

    /// Declare that `pass` writes `id` in `state`.
    pub fn add_output(
        &mut self,
        pass: PassHandle,
        id: ResourceId,
        state: ResourceState,
    ) -> Result<(), GraphError> {
        self.add_access(pass, id, state, EdgeDirection::Output)
    }

    /// Declare that `pass` runs after the producer of `token`.
    pub fn add_order_input(
        &mut self,
        pass: PassHandle,
        token: ResourceId,
    ) -> Result<(), GraphError> {
        self.add_order(pass, token, EdgeDirection::Input)
    }

    /// Declare that `pass` produces `token`.
    pub fn add_order_output(
        &mut self,
        pass: PassHandle,
        token: ResourceId,
    ) -> Result<(), GraphError> {
        self.add_order(pass, token, EdgeDirection::Output)
    }

    /// Order `dependent` after `dependency`.
    pub fn add_dependency(
        &mut self,
        dependent: PassHandle,
        dependency: PassHandle,
    ) -> Result<(), GraphError> {
        self.registry.add_dependency(dependent, dependency)
    }

    fn add_access(
        &mut self,
        pass: PassHandle,
        id: ResourceId,
        state: ResourceState,
        direction: EdgeDirection,
    ) -> Result<(), GraphError> {
        self.registry.resolve(pass)?;
        let kind = self.resources.kind(id)?;
        if !state.is_valid() {
            return Err(GraphError::InvalidResourceState {
                resource: id,
                state,
            });
        }

        // Tokens never carry a state.
        let edge = match kind {
            ResourceKind::Synthetic => Edge::order_only(id, direction),
            ResourceKind::Physical(_) => Edge::access(id, state, direction),
        };

        // Reads of one resource by one pass are merged into a single state.
        if edge.kind == EdgeKind::Access && direction == EdgeDirection::Input {
            let merged = self
                .registry
                .get(pass)?
                .inputs()
                .filter(|e| e.kind == EdgeKind::Access && e.resource == id)
                .fold(state, |merged, e| merged | e.state);
            if !merged.is_valid() {
                return Err(GraphError::InvalidResourceState {
                    resource: id,
                    state: merged,
                });
            }
        }
        self.registry.add_edge(pass, edge)
    }

    fn add_order(
        &mut self,
        pass: PassHandle,
        token: ResourceId,
        direction: EdgeDirection,
    ) -> Result<(), GraphError> {
        self.registry.resolve(pass)?;
        self.resources.kind(token)?;
        self.registry.add_edge(pass, Edge::order_only(token, direction))
    }

    /// Compute the execution order of the passes registered so far.
    ///
    /// Does not touch the tracked resource states; more passes may still be
    /// registered afterwards, at the cost of building again.
    pub fn build(&self) -> Result<ExecutionOrder, GraphError> {
        compiler::compile(&self.registry, self.resources)
    }

    /// Synthesize barriers, record every pass and submit the result.
    ///
    /// `order` must come from [`Frame::build`] after the last pass was
    /// registered.
    pub fn execute(
        self,
        order: &ExecutionOrder,
        backend: &dyn GpuBackend,
    ) -> Result<ExecutionReport, GraphError> {
        if order.frame() != self.registry.frame()
            || order.revision() != self.registry.revision()
            || order.pass_count() != self.registry.len()
        {
            return Err(GraphError::StaleExecutionOrder);
        }

        let Frame {
            registry,
            resources,
            config,
        } = self;
        executor::execute(registry.into_passes(), order, resources, backend, config)
    }
}

impl fmt::Debug for Frame<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("frame_index", &self.frame_index())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
