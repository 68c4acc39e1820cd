//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. Every context it creates records the
//! commands it receives, and every submission is kept in memory so tests can
//! inspect exactly what the frame graph produced.

use std::any::Any;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::barrier::Barrier;
use crate::resource::ResourceHandle;

use super::{BackendError, CommandContext, ContextKind, GpuBackend};

/// A command recorded by a [`DummyCommandContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummyCommand {
    /// A barrier batch.
    Barriers(Vec<Barrier>),
    /// Start of a debug region.
    BeginEvent(String),
    /// End of a debug region.
    EndEvent,
    /// A compute dispatch.
    Dispatch {
        /// Group counts.
        groups: [u32; 3],
    },
    /// A draw.
    Draw {
        /// Vertices per instance.
        vertex_count: u32,
        /// Instances.
        instance_count: u32,
    },
    /// A resource copy.
    Copy {
        /// Destination.
        dst: ResourceHandle,
        /// Source.
        src: ResourceHandle,
    },
}

/// Command context of the dummy backend.
#[derive(Debug)]
pub struct DummyCommandContext {
    kind: ContextKind,
    commands: Vec<DummyCommand>,
}

impl DummyCommandContext {
    /// Create an empty context.
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            commands: Vec::new(),
        }
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> &[DummyCommand] {
        &self.commands
    }
}

impl CommandContext for DummyCommandContext {
    fn kind(&self) -> ContextKind {
        self.kind
    }

    fn resource_barriers(&mut self, barriers: &[Barrier]) {
        log::trace!("DummyBackend: recording {} barriers", barriers.len());
        self.commands.push(DummyCommand::Barriers(barriers.to_vec()));
    }

    fn begin_event(&mut self, name: &str) {
        self.commands.push(DummyCommand::BeginEvent(name.to_string()));
    }

    fn end_event(&mut self) {
        self.commands.push(DummyCommand::EndEvent);
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.commands.push(DummyCommand::Dispatch {
            groups: [groups_x, groups_y, groups_z],
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.commands.push(DummyCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn copy_resource(&mut self, dst: ResourceHandle, src: ResourceHandle) {
        self.commands.push(DummyCommand::Copy { dst, src });
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A context after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedContext {
    /// Capability the context was created with.
    pub kind: ContextKind,
    /// Recorded commands.
    pub commands: Vec<DummyCommand>,
}

impl SubmittedContext {
    /// Names of the debug regions opened in this context, in order.
    pub fn event_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DummyCommand::BeginEvent(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Barriers recorded right before the debug region named `pass`.
    pub fn barriers_before(&self, pass: &str) -> Vec<Barrier> {
        let Some(at) = self
            .commands
            .iter()
            .position(|c| matches!(c, DummyCommand::BeginEvent(name) if name == pass))
        else {
            return Vec::new();
        };
        match at.checked_sub(1).map(|prev| &self.commands[prev]) {
            Some(DummyCommand::Barriers(barriers)) => barriers.clone(),
            _ => Vec::new(),
        }
    }

    /// Every barrier in the context.
    pub fn barriers(&self) -> Vec<Barrier> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DummyCommand::Barriers(barriers) => Some(barriers.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_handle: AtomicU64,
    contexts_created: AtomicUsize,
    submissions: Mutex<Vec<Vec<SubmittedContext>>>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fake physical resource.
    pub fn create_resource(&self, label: &str) -> ResourceHandle {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("DummyBackend: creating resource '{label}' as #{raw}");
        ResourceHandle::new(raw)
    }

    /// Number of contexts created so far.
    pub fn contexts_created(&self) -> usize {
        self.contexts_created.load(Ordering::Relaxed)
    }

    /// Every submission so far, oldest first.
    pub fn submissions(&self) -> Vec<Vec<SubmittedContext>> {
        self.submissions.lock().clone()
    }

    /// The most recent submission.
    pub fn last_submission(&self) -> Option<Vec<SubmittedContext>> {
        self.submissions.lock().last().cloned()
    }

    /// Debug region names of the most recent submission in submission order.
    pub fn last_event_names(&self) -> Vec<String> {
        self.last_submission()
            .unwrap_or_default()
            .iter()
            .flat_map(|ctx| ctx.event_names().into_iter().map(str::to_string))
            .collect()
    }

    /// Forget recorded submissions.
    pub fn clear_submissions(&self) {
        self.submissions.lock().clear();
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_context(&self, kind: ContextKind) -> Result<Box<dyn CommandContext>, BackendError> {
        self.contexts_created.fetch_add(1, Ordering::Relaxed);
        log::trace!("DummyBackend: creating {} context", kind.name());
        Ok(Box::new(DummyCommandContext::new(kind)))
    }

    fn submit(&self, contexts: Vec<Box<dyn CommandContext>>) -> Result<(), BackendError> {
        let mut submitted = Vec::with_capacity(contexts.len());
        for mut ctx in contexts {
            let dummy = ctx
                .as_any_mut()
                .downcast_mut::<DummyCommandContext>()
                .ok_or(BackendError::ForeignContext)?;
            submitted.push(SubmittedContext {
                kind: dummy.kind,
                commands: std::mem::take(&mut dummy.commands),
            });
        }

        log::trace!("DummyBackend: submitting {} contexts", submitted.len());
        self.submissions.lock().push(submitted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceId, ResourceState};

    #[test]
    fn test_dummy_backend_name() {
        assert_eq!(DummyBackend::new().name(), "Dummy");
    }

    #[test]
    fn test_create_resource_handles_are_unique() {
        let backend = DummyBackend::new();
        let a = backend.create_resource("a");
        let b = backend.create_resource("b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_submit_records_commands() {
        let backend = DummyBackend::new();
        let mut ctx = backend.create_context(ContextKind::Compute).unwrap();
        let handle = backend.create_resource("buffer");
        let barrier = Barrier::Transition {
            resource: ResourceId::from_path("buffer"),
            handle,
            before: ResourceState::COMMON,
            after: ResourceState::UNORDERED_ACCESS,
        };
        ctx.resource_barriers(&[barrier]);
        ctx.begin_event("Simulate");
        ctx.dispatch(8, 8, 1);
        ctx.end_event();
        backend.submit(vec![ctx]).unwrap();

        let submission = backend.last_submission().unwrap();
        assert_eq!(submission.len(), 1);
        assert_eq!(submission[0].kind, ContextKind::Compute);
        assert_eq!(submission[0].event_names(), vec!["Simulate"]);
        assert_eq!(submission[0].barriers_before("Simulate"), vec![barrier]);
        assert_eq!(
            submission[0].commands[2],
            DummyCommand::Dispatch { groups: [8, 8, 1] }
        );
        assert_eq!(backend.contexts_created(), 1);
    }

    #[test]
    fn test_foreign_context_rejected() {
        struct Foreign;
        impl CommandContext for Foreign {
            fn kind(&self) -> ContextKind {
                ContextKind::Copy
            }
            fn resource_barriers(&mut self, _: &[Barrier]) {}
            fn begin_event(&mut self, _: &str) {}
            fn end_event(&mut self) {}
            fn dispatch(&mut self, _: u32, _: u32, _: u32) {}
            fn draw(&mut self, _: u32, _: u32) {}
            fn copy_resource(&mut self, _: ResourceHandle, _: ResourceHandle) {}
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let backend = DummyBackend::new();
        assert_eq!(
            backend.submit(vec![Box::new(Foreign)]),
            Err(BackendError::ForeignContext)
        );
    }
}
