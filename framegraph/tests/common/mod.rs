//! Common utilities for frame graph integration tests.

#![allow(dead_code)]

use framegraph::{
    CommandContext, DummyBackend, ExecutionOrder, FrameGraph, FrameGraphConfig, ResourceHandle,
    ResourceId,
};

/// Initialize logging once for the whole test binary.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// A frame graph paired with the backend it executes on.
pub struct TestContext {
    pub backend: DummyBackend,
    pub graph: FrameGraph,
}

impl TestContext {
    /// Create a context recording on up to `threads` threads.
    pub fn new(threads: usize) -> Self {
        init_logging();
        let config = FrameGraphConfig::new()
            .with_max_recording_threads(threads)
            .with_execution_plan_dump(true);
        Self {
            backend: DummyBackend::new(),
            graph: FrameGraph::new(config),
        }
    }

    /// Allocate a fake physical resource.
    pub fn resource(&self, label: &str) -> ResourceHandle {
        self.backend.create_resource(label)
    }
}

/// A pass callback that records nothing.
pub fn noop(_: &mut dyn CommandContext) {}

/// Pass names in execution order.
pub fn pass_names(order: &ExecutionOrder) -> Vec<String> {
    order
        .pass_order()
        .iter()
        .filter_map(|&handle| order.pass_name(handle))
        .map(str::to_string)
        .collect()
}

/// Linear position of the pass named `name`.
pub fn position_of(order: &ExecutionOrder, name: &str) -> usize {
    pass_names(order)
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("pass '{name}' not scheduled"))
}

/// Identifier for a test resource.
pub fn id(path: &str) -> ResourceId {
    ResourceId::from_path(path)
}
