//! Persistent resource state tracking.

use std::collections::HashMap;

use crate::error::GraphError;

use super::{ResourceHandle, ResourceId, ResourceKind, ResourceState};

/// Tracked information about one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Physical storage or ordering token.
    pub kind: ResourceKind,
    /// State after the most recently executed edge.
    pub state: ResourceState,
    /// Frame in which the resource was last registered.
    pub registered_frame: u64,
}

/// Registry of resources and their current GPU-visible state.
///
/// The table outlives individual frames so the state of long-lived resources
/// (history buffers, acceleration structures) is remembered. Each frame the
/// owners register their resources again; only resources registered in the
/// current frame can be referenced by edges. Ordering tokens are forgotten at
/// the start of every frame.
#[derive(Debug, Default)]
pub struct ResourceTable {
    entries: HashMap<ResourceId, ResourceEntry>,
    frame: u64,
}

impl ResourceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the current frame.
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Start a new frame.
    ///
    /// Ordering tokens are dropped; physical resources keep their tracked
    /// state but must be registered again before use.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        self.entries.retain(|_, entry| !entry.kind.is_synthetic());
    }

    /// Forget every resource, e.g. after the swap chain was resized and all
    /// render targets were recreated.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Register a physical resource for the current frame.
    ///
    /// The tracked state is overwritten with `initial_state`. Registering the
    /// same identifier again in this frame with the same handle only updates
    /// the state; a different handle is an error.
    pub fn register(
        &mut self,
        id: ResourceId,
        handle: ResourceHandle,
        initial_state: ResourceState,
    ) -> Result<(), GraphError> {
        if id.is_reserved() {
            return Err(GraphError::ReservedResourceId(id));
        }
        self.insert(id, ResourceKind::Physical(handle), initial_state)
    }

    /// Register a long-lived physical resource, keeping the state it was left
    /// in by earlier frames.
    ///
    /// `fallback_state` is used the first time the identifier is seen, or when
    /// it now names different storage. Returns the state the resource starts
    /// the frame in.
    pub fn register_tracked(
        &mut self,
        id: ResourceId,
        handle: ResourceHandle,
        fallback_state: ResourceState,
    ) -> Result<ResourceState, GraphError> {
        let state = self
            .entries
            .get(&id)
            .filter(|entry| entry.kind == ResourceKind::Physical(handle))
            .map_or(fallback_state, |entry| entry.state);
        self.register(id, handle, state)?;
        Ok(state)
    }

    /// Register an ordering token for the current frame.
    ///
    /// `initial_state` is kept as a logical marker and never turned into a
    /// barrier.
    pub fn register_synthetic(
        &mut self,
        id: ResourceId,
        initial_state: ResourceState,
    ) -> Result<(), GraphError> {
        self.insert(id, ResourceKind::Synthetic, initial_state)
    }

    fn insert(
        &mut self,
        id: ResourceId,
        kind: ResourceKind,
        state: ResourceState,
    ) -> Result<(), GraphError> {
        if let Some(existing) = self.entries.get(&id)
            && existing.registered_frame == self.frame
            && existing.kind != kind
        {
            return Err(GraphError::ConflictingResourceHandle(id));
        }

        log::trace!("ResourceTable: registering {id} as {kind:?} in {state}");
        self.entries.insert(
            id,
            ResourceEntry {
                kind,
                state,
                registered_frame: self.frame,
            },
        );
        Ok(())
    }

    /// Check if `id` is registered in the current frame.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.get(id).is_some()
    }

    /// Get the entry of a resource registered in the current frame.
    pub fn get(&self, id: ResourceId) -> Option<&ResourceEntry> {
        self.entries
            .get(&id)
            .filter(|entry| entry.registered_frame == self.frame)
    }

    /// Get the kind of a resource registered in the current frame.
    pub fn kind(&self, id: ResourceId) -> Result<ResourceKind, GraphError> {
        self.get(id)
            .map(|entry| entry.kind)
            .ok_or(GraphError::UnregisteredResource(id))
    }

    /// Get the recorded state of a resource registered in the current frame.
    pub fn current_state(&self, id: ResourceId) -> Result<ResourceState, GraphError> {
        self.get(id)
            .map(|entry| entry.state)
            .ok_or(GraphError::UnregisteredResource(id))
    }

    /// Record a new state for a resource registered in the current frame.
    pub(crate) fn set_state(
        &mut self,
        id: ResourceId,
        state: ResourceState,
    ) -> Result<(), GraphError> {
        let frame = self.frame;
        match self.entries.get_mut(&id) {
            Some(entry) if entry.registered_frame == frame => {
                entry.state = state;
                Ok(())
            }
            _ => Err(GraphError::UnregisteredResource(id)),
        }
    }

    /// Get the last tracked state of a physical resource, whether or not it
    /// was registered in the current frame.
    ///
    /// Owners of long-lived resources use this to carry the state over when
    /// re-registering.
    pub fn last_known_state(&self, id: ResourceId) -> Option<ResourceState> {
        self.entries
            .get(&id)
            .filter(|entry| !entry.kind.is_synthetic())
            .map(|entry| entry.state)
    }

    /// Number of resources registered in the current frame.
    pub fn registered_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.registered_frame == self.frame)
            .count()
    }

    /// Iterate over the resources registered in the current frame.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &ResourceEntry)> {
        let frame = self.frame;
        self.entries
            .iter()
            .filter(move |(_, entry)| entry.registered_frame == frame)
            .map(|(id, entry)| (*id, entry))
    }
}
