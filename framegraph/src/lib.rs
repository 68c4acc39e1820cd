//! # Frame Graph
//!
//! Per-frame scheduler for GPU render passes.
//!
//! ## Overview
//!
//! Every frame, renderer features register the resources they own and the
//! passes they want to run, declaring which resources each pass reads and
//! writes. The frame graph then:
//! - Orders the passes so every consumer runs after its producer
//! - Inserts state transitions and UAV barriers before each pass
//! - Records independent groups of passes on several threads
//! - Submits all command contexts to the backend in one call
//!
//! Features that are disabled simply do not register their passes. There is
//! no per-pass enable flag.
//!
//! ## Example
//!
//! ```
//! use framegraph::{
//!     DummyBackend, FrameGraph, FrameGraphConfig, PassKind, ResourceId, ResourceState,
//! };
//!
//! const DEPTH: ResourceId = ResourceId::from_path("Renderer/Depth");
//!
//! let backend = DummyBackend::new();
//! let depth = backend.create_resource("depth");
//! let mut graph = FrameGraph::new(FrameGraphConfig::new().with_max_recording_threads(2));
//!
//! for _ in 0..3 {
//!     let mut frame = graph.begin_frame();
//!     frame.register_tracked_resource(DEPTH, depth, ResourceState::COMMON)?;
//!
//!     let prepass = frame.register_pass("DepthPrepass", PassKind::Graphics, |ctx| {
//!         ctx.draw(36, 100);
//!     })?;
//!     frame.add_output(prepass, DEPTH, ResourceState::DEPTH_WRITE)?;
//!
//!     let order = frame.build()?;
//!     frame.execute(&order, &backend)?;
//! }
//!
//! // The depth buffer stays in DEPTH_WRITE, so only the first frame
//! // transitioned it.
//! assert!(backend.submissions()[2][0].barriers().is_empty());
//! # Ok::<(), framegraph::GraphError>(())
//! ```

pub mod backend;
pub mod barrier;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod profiling;
pub mod resource;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::dummy::DummyBackend;
pub use backend::{BackendError, CommandContext, ContextKind, GpuBackend};
pub use barrier::{Barrier, BarrierBatch, BarrierPlan, BarrierSynthesizer};
pub use compiler::{ExecutionOrder, RecordingGroup, compile};
pub use config::FrameGraphConfig;
pub use error::GraphError;
pub use executor::ExecutionReport;
pub use graph::{
    Edge, EdgeDirection, EdgeKind, Frame, FrameGraph, Pass, PassHandle, PassKind, PassRegistry,
    RecordPass,
};
pub use resource::{
    DoubleBuffered, FrameParity, PingPong, ResourceHandle, ResourceId, ResourceKind,
    ResourceState, ResourceTable,
};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the frame graph library.
pub fn init() {
    framegraph_core::init();
    log::info!("Frame Graph v{} initialized", VERSION);
}

// Recording threads share these.
static_assertions::assert_impl_all!(Barrier: Send, Sync, Copy);
static_assertions::assert_impl_all!(BarrierBatch: Send, Sync);
static_assertions::assert_impl_all!(ResourceId: Send, Sync, Copy);
static_assertions::assert_impl_all!(ResourceState: Send, Sync, Copy);
static_assertions::assert_impl_all!(GraphError: Send, Sync);
static_assertions::assert_impl_all!(Pass<'static>: Send);
static_assertions::assert_impl_all!(Box<dyn CommandContext>: Send);
static_assertions::assert_impl_all!(ExecutionReport: Send, Sync);
#[cfg(feature = "dummy")]
static_assertions::assert_impl_all!(DummyBackend: GpuBackend, Send, Sync);
