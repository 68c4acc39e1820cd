//! Barrier synthesis.
//!
//! Walks a compiled frame in execution order and compares, for every resource
//! a pass accesses, the tracked state with the state the pass requires. A
//! mismatch becomes a transition barrier. Two accesses in `UNORDERED_ACCESS`
//! become a UAV barrier when either of them writes; consecutive readers share
//! the barrier in front of the first one. All
//! barriers of one pass are collected into a [`BarrierBatch`] recorded as a
//! single call right before the pass's own commands.
//!
//! Ordering tokens never produce barriers.

use std::collections::HashMap;
use std::fmt;

use framegraph_core::profiling::{profile_plot, profile_scope};

use crate::compiler::ExecutionOrder;
use crate::error::GraphError;
use crate::graph::{EdgeKind, Pass};
use crate::resource::{ResourceHandle, ResourceId, ResourceKind, ResourceState, ResourceTable};

/// A single synchronization instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    /// Move a resource from one state to another.
    Transition {
        /// Resource being transitioned.
        resource: ResourceId,
        /// Physical storage of the resource.
        handle: ResourceHandle,
        /// State before the barrier.
        before: ResourceState,
        /// State after the barrier.
        after: ResourceState,
    },
    /// Order unordered-access reads/writes on either side of the barrier.
    Uav {
        /// Resource being synchronized.
        resource: ResourceId,
        /// Physical storage of the resource.
        handle: ResourceHandle,
    },
}

impl Barrier {
    /// Resource the barrier applies to.
    pub fn resource(&self) -> ResourceId {
        match self {
            Self::Transition { resource, .. } | Self::Uav { resource, .. } => *resource,
        }
    }

    /// Physical storage the barrier applies to.
    pub fn handle(&self) -> ResourceHandle {
        match self {
            Self::Transition { handle, .. } | Self::Uav { handle, .. } => *handle,
        }
    }

    /// Check if this is a state transition.
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition { .. })
    }
}

impl fmt::Display for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition {
                resource,
                before,
                after,
                ..
            } => write!(f, "{resource}: {before} -> {after}"),
            Self::Uav { resource, .. } => write!(f, "{resource}: UAV"),
        }
    }
}

/// Barriers recorded together before one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrierBatch {
    barriers: Vec<Barrier>,
}

impl BarrierBatch {
    /// Create a new empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a barrier.
    pub fn push(&mut self, barrier: Barrier) {
        self.barriers.push(barrier);
    }

    /// Check if the batch has any barriers.
    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Get the number of barriers in the batch.
    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    /// Barriers in the batch.
    pub fn as_slice(&self) -> &[Barrier] {
        &self.barriers
    }

    /// Iterate over the barriers.
    pub fn iter(&self) -> impl Iterator<Item = &Barrier> {
        self.barriers.iter()
    }

    /// Number of state transitions in the batch.
    pub fn transition_count(&self) -> usize {
        self.barriers.iter().filter(|b| b.is_transition()).count()
    }

    /// Number of UAV barriers in the batch.
    pub fn uav_count(&self) -> usize {
        self.len() - self.transition_count()
    }

    /// Clear all barriers from the batch.
    pub fn clear(&mut self) {
        self.barriers.clear();
    }
}

/// Barrier batches of a frame, one per pass.
#[derive(Debug, Clone, Default)]
pub struct BarrierPlan {
    batches: Vec<BarrierBatch>,
    previous_states: Vec<(ResourceId, ResourceState)>,
}

impl BarrierPlan {
    /// Batch of the pass with the given registration index.
    pub fn batch(&self, pass_index: usize) -> Option<&BarrierBatch> {
        self.batches.get(pass_index)
    }

    /// All batches by registration index.
    pub fn batches(&self) -> &[BarrierBatch] {
        &self.batches
    }

    /// Total number of state transitions.
    pub fn transition_count(&self) -> usize {
        self.batches.iter().map(BarrierBatch::transition_count).sum()
    }

    /// Total number of UAV barriers.
    pub fn uav_count(&self) -> usize {
        self.batches.iter().map(BarrierBatch::uav_count).sum()
    }

    /// Put every resource the plan transitioned back into the state it had
    /// before synthesis, for frames that never reached the GPU.
    pub fn restore(&self, resources: &mut ResourceTable) -> Result<(), GraphError> {
        for &(id, state) in &self.previous_states {
            resources.set_state(id, state)?;
        }
        log::debug!(
            "Restored {} resource states after a failed frame",
            self.previous_states.len()
        );
        Ok(())
    }
}

/// Computes barriers and advances the tracked resource states.
///
/// The synthesizer remembers how unordered-access resources were used since
/// their last barrier; create a new one for every frame.
#[derive(Debug, Default)]
pub struct BarrierSynthesizer {
    uav_accesses: HashMap<ResourceId, UavAccesses>,
    previous_states: HashMap<ResourceId, ResourceState>,
}

/// Unordered accesses to one resource since its last barrier.
#[derive(Debug, Clone, Copy, Default)]
struct UavAccesses {
    written: bool,
}

impl BarrierSynthesizer {
    /// Create a new synthesizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the barriers of every pass in `order`, updating `resources` to
    /// the state each resource is left in.
    pub fn synthesize(
        &mut self,
        order: &ExecutionOrder,
        passes: &[Pass<'_>],
        resources: &mut ResourceTable,
    ) -> Result<BarrierPlan, GraphError> {
        profile_scope!("framegraph_barriers");

        let mut plan = BarrierPlan {
            batches: vec![BarrierBatch::new(); passes.len()],
            previous_states: Vec::new(),
        };
        for handle in order.pass_order() {
            let index = handle.index() as usize;
            let pass = passes
                .get(index)
                .ok_or(GraphError::InvalidPassHandle(*handle))?;
            self.pass_barriers(pass, resources, &mut plan.batches[index])?;
        }
        plan.previous_states = self.previous_states.drain().collect();

        profile_plot!("framegraph transitions", plan.transition_count());
        profile_plot!("framegraph uav barriers", plan.uav_count());
        Ok(plan)
    }

    /// Compute the barriers needed before `pass` executes.
    pub fn pass_barriers(
        &mut self,
        pass: &Pass<'_>,
        resources: &mut ResourceTable,
        batch: &mut BarrierBatch,
    ) -> Result<(), GraphError> {
        for access in merged_accesses(pass) {
            let ResourceKind::Physical(handle) = resources.kind(access.resource)? else {
                continue;
            };

            let current = resources.current_state(access.resource)?;
            if current != access.state {
                batch.push(Barrier::Transition {
                    resource: access.resource,
                    handle,
                    before: current,
                    after: access.state,
                });
                resources.set_state(access.resource, access.state)?;
                self.previous_states.entry(access.resource).or_insert(current);
                self.uav_accesses.remove(&access.resource);
            } else if access.state.is_unordered_access() {
                let hazard = self
                    .uav_accesses
                    .get(&access.resource)
                    .is_some_and(|earlier| earlier.written || access.writes);
                if hazard {
                    batch.push(Barrier::Uav {
                        resource: access.resource,
                        handle,
                    });
                    self.uav_accesses.remove(&access.resource);
                }
            }

            if access.state.is_unordered_access() {
                self.uav_accesses.entry(access.resource).or_default().written |= access.writes;
            }
        }

        for barrier in batch.iter() {
            log::trace!("Barrier before '{}': {barrier}", pass.name());
        }
        Ok(())
    }
}

struct Access {
    resource: ResourceId,
    state: ResourceState,
    writes: bool,
}

/// One access per resource: inputs first and merged together, an output
/// overriding the input's state on the same resource.
fn merged_accesses(pass: &Pass<'_>) -> Vec<Access> {
    let mut accesses: Vec<Access> = Vec::with_capacity(pass.edges().len());
    let edges = pass.inputs().chain(pass.outputs());
    for edge in edges.filter(|e| e.kind == EdgeKind::Access) {
        match accesses.iter_mut().find(|a| a.resource == edge.resource) {
            Some(access) => {
                if edge.is_output() {
                    if access.state != edge.state {
                        log::warn!(
                            "Pass '{}' uses {} as {} and {}; using the output state",
                            pass.name(),
                            edge.resource,
                            access.state,
                            edge.state
                        );
                    }
                    access.state = edge.state;
                    access.writes = true;
                } else if !access.writes {
                    access.state |= edge.state;
                }
            }
            None => accesses.push(Access {
                resource: edge.resource,
                state: edge.state,
                writes: edge.is_output(),
            }),
        }
    }
    accesses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CommandContext;
    use crate::compiler::compile;
    use crate::graph::{Edge, EdgeDirection, PassHandle, PassKind, PassRegistry};

    const BUF: ResourceId = ResourceId::from_path("Buffer");
    const TEX: ResourceId = ResourceId::from_path("Texture");

    fn add(
        registry: &mut PassRegistry<'static>,
        name: &str,
        edges: &[(ResourceId, ResourceState, EdgeDirection)],
    ) -> PassHandle {
        let handle = registry
            .register(
                name,
                PassKind::Compute,
                Box::new(|_: &mut dyn CommandContext| {}),
            )
            .unwrap();
        for &(id, state, dir) in edges {
            registry.add_edge(handle, Edge::access(id, state, dir)).unwrap();
        }
        handle
    }

    fn synthesize(registry: &PassRegistry<'_>, table: &mut ResourceTable) -> BarrierPlan {
        let order = compile(registry, table).unwrap();
        BarrierSynthesizer::new()
            .synthesize(&order, registry.passes(), table)
            .unwrap()
    }

    fn table_with(initial: ResourceState) -> ResourceTable {
        let mut table = ResourceTable::new();
        table.register(BUF, ResourceHandle::new(1), initial).unwrap();
        table.register(TEX, ResourceHandle::new(2), initial).unwrap();
        table
    }

    #[test]
    fn test_no_barrier_when_state_matches() {
        let mut table = table_with(ResourceState::UNORDERED_ACCESS);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "A",
            &[(BUF, ResourceState::UNORDERED_ACCESS, EdgeDirection::Output)],
        );

        let plan = synthesize(&registry, &mut table);
        assert!(plan.batch(0).unwrap().is_empty());
    }

    #[test]
    fn test_transition_updates_table() {
        let mut table = table_with(ResourceState::COMMON);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "A",
            &[(TEX, ResourceState::RENDER_TARGET, EdgeDirection::Output)],
        );

        let plan = synthesize(&registry, &mut table);
        assert_eq!(
            plan.batch(0).unwrap().as_slice(),
            &[Barrier::Transition {
                resource: TEX,
                handle: ResourceHandle::new(2),
                before: ResourceState::COMMON,
                after: ResourceState::RENDER_TARGET,
            }]
        );
        assert_eq!(
            table.current_state(TEX).unwrap(),
            ResourceState::RENDER_TARGET
        );
    }

    #[test]
    fn test_uav_write_then_write() {
        let mut table = table_with(ResourceState::UNORDERED_ACCESS);
        let mut registry = PassRegistry::new(0, 8);
        let uav = ResourceState::UNORDERED_ACCESS;
        add(&mut registry, "A", &[(BUF, uav, EdgeDirection::Output)]);
        add(&mut registry, "B", &[(BUF, uav, EdgeDirection::Output)]);

        let plan = synthesize(&registry, &mut table);
        assert!(plan.batch(0).unwrap().is_empty());
        assert_eq!(
            plan.batch(1).unwrap().as_slice(),
            &[Barrier::Uav {
                resource: BUF,
                handle: ResourceHandle::new(1),
            }]
        );
        assert_eq!(plan.uav_count(), 1);
        assert_eq!(plan.transition_count(), 0);
    }

    #[test]
    fn test_uav_readers_need_single_barrier() {
        let mut table = table_with(ResourceState::UNORDERED_ACCESS);
        let mut registry = PassRegistry::new(0, 8);
        let uav = ResourceState::UNORDERED_ACCESS;
        add(&mut registry, "W", &[(BUF, uav, EdgeDirection::Output)]);
        add(&mut registry, "R1", &[(BUF, uav, EdgeDirection::Input)]);
        add(&mut registry, "R2", &[(BUF, uav, EdgeDirection::Input)]);

        let plan = synthesize(&registry, &mut table);
        assert_eq!(plan.batch(1).unwrap().uav_count(), 1);
        assert!(plan.batch(2).unwrap().is_empty());
    }

    #[test]
    fn test_uav_writer_after_reader_needs_barrier() {
        let mut table = table_with(ResourceState::UNORDERED_ACCESS);
        let mut registry = PassRegistry::new(0, 8);
        let uav = ResourceState::UNORDERED_ACCESS;
        add(&mut registry, "W1", &[(BUF, uav, EdgeDirection::Output)]);
        add(&mut registry, "R", &[(BUF, uav, EdgeDirection::Input)]);
        add(&mut registry, "W2", &[(BUF, uav, EdgeDirection::Output)]);

        let plan = synthesize(&registry, &mut table);
        assert!(plan.batch(0).unwrap().is_empty());
        assert_eq!(plan.batch(1).unwrap().uav_count(), 1);
        assert_eq!(plan.batch(2).unwrap().uav_count(), 1);
        assert_eq!(plan.transition_count(), 0);
    }

    #[test]
    fn test_uav_readers_then_writer() {
        let mut table = table_with(ResourceState::UNORDERED_ACCESS);
        let mut registry = PassRegistry::new(0, 8);
        let uav = ResourceState::UNORDERED_ACCESS;
        add(&mut registry, "R1", &[(BUF, uav, EdgeDirection::Input)]);
        add(&mut registry, "R2", &[(BUF, uav, EdgeDirection::Input)]);
        add(&mut registry, "W", &[(BUF, uav, EdgeDirection::Output)]);

        let plan = synthesize(&registry, &mut table);
        assert!(plan.batch(0).unwrap().is_empty());
        assert!(plan.batch(1).unwrap().is_empty());
        assert_eq!(plan.batch(2).unwrap().uav_count(), 1);
    }

    #[test]
    fn test_read_states_of_one_pass_are_merged() {
        let mut table = table_with(ResourceState::COMMON);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "Shade",
            &[
                (TEX, ResourceState::NON_PIXEL_SHADER_RESOURCE, EdgeDirection::Input),
                (TEX, ResourceState::PIXEL_SHADER_RESOURCE, EdgeDirection::Input),
            ],
        );

        let plan = synthesize(&registry, &mut table);
        assert_eq!(plan.transition_count(), 1);
        assert_eq!(
            table.current_state(TEX).unwrap(),
            ResourceState::ALL_SHADER_RESOURCE
        );
    }

    #[test]
    fn test_restore_undoes_transitions() {
        let mut table = table_with(ResourceState::COMMON);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "A",
            &[(TEX, ResourceState::RENDER_TARGET, EdgeDirection::Output)],
        );
        add(
            &mut registry,
            "B",
            &[(TEX, ResourceState::PIXEL_SHADER_RESOURCE, EdgeDirection::Input)],
        );

        let plan = synthesize(&registry, &mut table);
        assert_eq!(plan.transition_count(), 2);
        plan.restore(&mut table).unwrap();
        assert_eq!(table.current_state(TEX).unwrap(), ResourceState::COMMON);
        assert_eq!(table.current_state(BUF).unwrap(), ResourceState::COMMON);
    }

    #[test]
    fn test_single_producer_many_consumers() {
        let mut table = table_with(ResourceState::COMMON);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "Produce",
            &[(TEX, ResourceState::UNORDERED_ACCESS, EdgeDirection::Output)],
        );
        for name in ["C1", "C2", "C3"] {
            add(
                &mut registry,
                name,
                &[(TEX, ResourceState::ALL_SHADER_RESOURCE, EdgeDirection::Input)],
            );
        }

        let plan = synthesize(&registry, &mut table);
        assert_eq!(plan.transition_count(), 2);
        assert_eq!(plan.batch(1).unwrap().transition_count(), 1);
        assert!(plan.batch(2).unwrap().is_empty());
        assert!(plan.batch(3).unwrap().is_empty());
    }

    #[test]
    fn test_output_state_wins_over_input() {
        let mut table = table_with(ResourceState::COMMON);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "Mixed",
            &[
                (TEX, ResourceState::PIXEL_SHADER_RESOURCE, EdgeDirection::Input),
                (TEX, ResourceState::RENDER_TARGET, EdgeDirection::Output),
            ],
        );

        let plan = synthesize(&registry, &mut table);
        let batch = plan.batch(0).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(
            table.current_state(TEX).unwrap(),
            ResourceState::RENDER_TARGET
        );
    }

    #[test]
    fn test_batch_per_pass_covers_all_resources() {
        let mut table = table_with(ResourceState::COMMON);
        let mut registry = PassRegistry::new(0, 8);
        add(
            &mut registry,
            "Copy",
            &[
                (BUF, ResourceState::COPY_SOURCE, EdgeDirection::Input),
                (TEX, ResourceState::COPY_DEST, EdgeDirection::Output),
            ],
        );

        let plan = synthesize(&registry, &mut table);
        let batch = plan.batch(0).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.as_slice()[0].resource(), BUF);
        assert_eq!(batch.as_slice()[1].resource(), TEX);
    }

    #[test]
    fn test_barrier_display() {
        let barrier = Barrier::Transition {
            resource: ResourceId::synthetic(3),
            handle: ResourceHandle::new(0),
            before: ResourceState::UNORDERED_ACCESS,
            after: ResourceState::PIXEL_SHADER_RESOURCE,
        };
        assert_eq!(
            barrier.to_string(),
            "token#3: UNORDERED_ACCESS -> PIXEL_SHADER_RESOURCE"
        );
    }
}
