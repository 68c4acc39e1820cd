//! Passes and the per-frame pass registry.

use std::collections::HashMap;
use std::fmt;

use crate::backend::CommandContext;
use crate::error::GraphError;

use super::edge::{Edge, EdgeDirection};

/// Kind of GPU work a pass records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Rasterization (draws into render targets).
    Graphics,
    /// Compute dispatches, including ray tracing.
    Compute,
    /// Copies only.
    Copy,
}

impl PassKind {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Graphics => "graphics",
            Self::Compute => "compute",
            Self::Copy => "copy",
        }
    }
}

/// Handle to a pass registered in a specific frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassHandle {
    frame: u32,
    index: u32,
}

impl PassHandle {
    /// Create a new pass handle.
    pub fn new(frame: u32, index: u32) -> Self {
        Self { frame, index }
    }

    /// Registration index within the frame.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Frame the pass was registered in (wrapping).
    pub fn frame(&self) -> u32 {
        self.frame
    }
}

/// Anything that can record a pass's commands.
///
/// Closures taking `&mut dyn CommandContext` implement this automatically;
/// implement it by hand for renderer objects that record themselves.
pub trait RecordPass: Send {
    /// Record the pass's commands. Barriers are already recorded.
    fn record(&mut self, ctx: &mut dyn CommandContext);
}

impl<F> RecordPass for F
where
    F: FnMut(&mut dyn CommandContext) + Send,
{
    fn record(&mut self, ctx: &mut dyn CommandContext) {
        self(ctx)
    }
}

/// A unit of GPU work and the resources it uses.
pub struct Pass<'p> {
    name: String,
    kind: PassKind,
    edges: Vec<Edge>,
    recorder: Box<dyn RecordPass + 'p>,
}

impl<'p> Pass<'p> {
    fn new(name: String, kind: PassKind, recorder: Box<dyn RecordPass + 'p>) -> Self {
        Self {
            name,
            kind,
            edges: Vec::new(),
            recorder,
        }
    }

    /// Get the pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pass kind.
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// All edges in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges the pass reads through.
    pub fn inputs(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(|e| e.direction == EdgeDirection::Input)
    }

    /// Edges the pass writes through.
    pub fn outputs(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(|e| e.direction == EdgeDirection::Output)
    }

    pub(crate) fn record(&mut self, ctx: &mut dyn CommandContext) {
        self.recorder.record(ctx);
    }
}

impl fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("edges", &self.edges)
            .finish_non_exhaustive()
    }
}

/// Ordered list of the passes registered in one frame.
///
/// Registration order is the tie-break the scheduler uses between passes that
/// are not ordered by their edges.
pub struct PassRegistry<'p> {
    frame: u32,
    max_passes: usize,
    passes: Vec<Pass<'p>>,
    names: HashMap<String, u32>,
    dependencies: Vec<(u32, u32)>,
    revision: u64,
}

impl<'p> PassRegistry<'p> {
    /// Create an empty registry for `frame`.
    pub fn new(frame: u32, max_passes: usize) -> Self {
        Self {
            frame,
            max_passes,
            passes: Vec::new(),
            names: HashMap::new(),
            dependencies: Vec::new(),
            revision: 0,
        }
    }

    /// Frame this registry belongs to (wrapping).
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Counter bumped by every change to the passes, their edges or the
    /// explicit dependencies.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Append a pass.
    pub fn register(
        &mut self,
        name: &str,
        kind: PassKind,
        recorder: Box<dyn RecordPass + 'p>,
    ) -> Result<PassHandle, GraphError> {
        if self.passes.len() >= self.max_passes {
            return Err(GraphError::TooManyPasses {
                limit: self.max_passes,
            });
        }
        if self.names.contains_key(name) {
            return Err(GraphError::DuplicatePassName(name.to_string()));
        }

        let index = self.passes.len() as u32;
        self.names.insert(name.to_string(), index);
        self.passes.push(Pass::new(name.to_string(), kind, recorder));
        self.revision += 1;

        log::trace!("PassRegistry: registered {} pass '{name}' #{index}", kind.name());
        Ok(PassHandle::new(self.frame, index))
    }

    /// Resolve a handle to a registration index.
    pub fn resolve(&self, handle: PassHandle) -> Result<usize, GraphError> {
        let index = handle.index() as usize;
        if handle.frame() != self.frame || index >= self.passes.len() {
            return Err(GraphError::InvalidPassHandle(handle));
        }
        Ok(index)
    }

    /// Append an edge to a pass.
    pub fn add_edge(&mut self, handle: PassHandle, edge: Edge) -> Result<(), GraphError> {
        let index = self.resolve(handle)?;
        let pass = &mut self.passes[index];
        if !pass.edges.contains(&edge) {
            pass.edges.push(edge);
            self.revision += 1;
        }
        Ok(())
    }

    /// Order `dependent` after `dependency` without a resource.
    pub fn add_dependency(
        &mut self,
        dependent: PassHandle,
        dependency: PassHandle,
    ) -> Result<(), GraphError> {
        let to = self.resolve(dependent)? as u32;
        let from = self.resolve(dependency)? as u32;
        self.dependencies.push((from, to));
        self.revision += 1;
        Ok(())
    }

    /// Explicit `(dependency, dependent)` pairs by registration index.
    pub fn dependencies(&self) -> &[(u32, u32)] {
        &self.dependencies
    }

    /// Get a pass.
    pub fn get(&self, handle: PassHandle) -> Result<&Pass<'p>, GraphError> {
        let index = self.resolve(handle)?;
        Ok(&self.passes[index])
    }

    /// Find a pass by name.
    pub fn find(&self, name: &str) -> Option<PassHandle> {
        self.names
            .get(name)
            .map(|&index| PassHandle::new(self.frame, index))
    }

    /// All passes in registration order.
    pub fn passes(&self) -> &[Pass<'p>] {
        &self.passes
    }

    /// Number of registered passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if no passes were registered.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub(crate) fn into_passes(self) -> Vec<Pass<'p>> {
        self.passes
    }
}

impl fmt::Debug for PassRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassRegistry")
            .field("frame", &self.frame)
            .field("passes", &self.passes)
            .field("dependencies", &self.dependencies)
            .field("revision", &self.revision)
            .finish()
    }
}
