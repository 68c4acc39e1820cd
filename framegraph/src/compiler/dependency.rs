//! Pass dependencies derived from resource edges.

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::graph::Pass;
use crate::resource::{ResourceId, ResourceKind, ResourceTable};

/// Why one pass must run after another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Both passes access the same physical resource.
    Data,
    /// Ordering through a token or an order-only edge.
    OrderOnly,
    /// Declared directly between the two passes.
    Explicit,
}

/// A single ordering constraint, by registration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Pass that runs first.
    pub from: usize,
    /// Pass that runs after `from`.
    pub to: usize,
    /// Origin of the constraint.
    pub kind: DependencyKind,
    /// Resource that caused it, if any.
    pub resource: Option<ResourceId>,
}

/// One pass's use of one resource, merged over all its edges on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTouch {
    /// Registration index of the pass.
    pub pass: usize,
    /// The pass declared at least one output on the resource.
    pub writes: bool,
    /// Every edge of the pass on the resource is order-only.
    pub order_only: bool,
}

/// All passes touching one resource, in registration order.
#[derive(Debug, Clone)]
pub struct ResourceUsers {
    resource: ResourceId,
    kind: ResourceKind,
    touches: Vec<ResourceTouch>,
}

impl ResourceUsers {
    fn new(resource: ResourceId, kind: ResourceKind) -> Self {
        Self {
            resource,
            kind,
            touches: Vec::new(),
        }
    }

    fn touch(&mut self, pass: usize, writes: bool, order_only: bool) {
        // Edges are visited pass by pass, so a pass's touches are adjacent.
        if let Some(last) = self.touches.last_mut()
            && last.pass == pass
        {
            last.writes |= writes;
            last.order_only &= order_only;
            return;
        }
        self.touches.push(ResourceTouch {
            pass,
            writes,
            order_only,
        });
    }

    /// The resource.
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Physical or synthetic.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Every touching pass in registration order.
    pub fn touches(&self) -> &[ResourceTouch] {
        &self.touches
    }

    /// Passes writing the resource, in registration order.
    pub fn producers(&self) -> impl Iterator<Item = usize> + '_ {
        self.touches.iter().filter(|t| t.writes).map(|t| t.pass)
    }

    /// Passes only reading the resource, in registration order.
    pub fn readers(&self) -> impl Iterator<Item = usize> + '_ {
        self.touches.iter().filter(|t| !t.writes).map(|t| t.pass)
    }
}

/// Adjacency between the passes of one frame.
///
/// For every resource the producers are chained in registration order. A
/// pass that only reads a resource runs after the latest producer registered
/// before it and before the next one; a reader registered ahead of every
/// producer runs after the last producer. Self-dependencies are never
/// created.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: Vec<Dependency>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    resources: Vec<ResourceUsers>,
    resource_index: HashMap<ResourceId, usize>,
}

impl DependencyGraph {
    /// Build the graph from passes in registration order, explicit
    /// `(dependency, dependent)` pairs and the frame's resources.
    pub fn build(
        passes: &[Pass<'_>],
        explicit: &[(u32, u32)],
        resources: &ResourceTable,
    ) -> Result<Self, GraphError> {
        let mut graph = Self {
            successors: vec![Vec::new(); passes.len()],
            predecessors: vec![Vec::new(); passes.len()],
            ..Self::default()
        };

        for (pass_index, pass) in passes.iter().enumerate() {
            for edge in pass.edges() {
                let slot = match graph.resource_index.get(&edge.resource) {
                    Some(&slot) => slot,
                    None => {
                        let kind = resources.kind(edge.resource)?;
                        graph.resources.push(ResourceUsers::new(edge.resource, kind));
                        let slot = graph.resources.len() - 1;
                        graph.resource_index.insert(edge.resource, slot);
                        slot
                    }
                };
                graph.resources[slot].touch(pass_index, edge.is_output(), edge.is_order_only());
            }
        }

        let mut seen = HashSet::new();
        for slot in 0..graph.resources.len() {
            let resource = graph.resources[slot].resource;
            let pairs = resource_dependencies(&graph.resources[slot], passes)?;
            for (from, to, kind) in pairs {
                graph.push(&mut seen, from, to, kind, Some(resource));
            }
        }
        for &(from, to) in explicit {
            graph.push(
                &mut seen,
                from as usize,
                to as usize,
                DependencyKind::Explicit,
                None,
            );
        }

        Ok(graph)
    }

    fn push(
        &mut self,
        seen: &mut HashSet<(usize, usize)>,
        from: usize,
        to: usize,
        kind: DependencyKind,
        resource: Option<ResourceId>,
    ) {
        if from == to || !seen.insert((from, to)) {
            return;
        }
        self.successors[from].push(to);
        self.predecessors[to].push(from);
        self.dependencies.push(Dependency {
            from,
            to,
            kind,
            resource,
        });
    }

    /// Number of passes.
    pub fn pass_count(&self) -> usize {
        self.successors.len()
    }

    /// All constraints, without duplicates.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Passes that must run after `pass`.
    pub fn successors(&self, pass: usize) -> &[usize] {
        &self.successors[pass]
    }

    /// Passes that must run before `pass`.
    pub fn predecessors(&self, pass: usize) -> &[usize] {
        &self.predecessors[pass]
    }

    /// Resource usage in first-touch order.
    pub fn resources(&self) -> &[ResourceUsers] {
        &self.resources
    }

    /// Usage of one resource.
    pub fn users(&self, resource: ResourceId) -> Option<&ResourceUsers> {
        self.resource_index
            .get(&resource)
            .map(|&slot| &self.resources[slot])
    }

    /// Check if `to` directly depends on `from`.
    pub fn has_dependency(&self, from: usize, to: usize) -> bool {
        self.successors
            .get(from)
            .is_some_and(|succ| succ.contains(&to))
    }
}

fn resource_dependencies(
    users: &ResourceUsers,
    passes: &[Pass<'_>],
) -> Result<Vec<(usize, usize, DependencyKind)>, GraphError> {
    let synthetic = users.kind.is_synthetic();
    let kind_between = |a: &ResourceTouch, b: &ResourceTouch| {
        if synthetic || a.order_only || b.order_only {
            DependencyKind::OrderOnly
        } else {
            DependencyKind::Data
        }
    };

    let last_producer = users.touches.iter().rev().find(|t| t.writes);
    let mut latest: Option<&ResourceTouch> = None;
    let mut readers_since: Vec<&ResourceTouch> = Vec::new();
    let mut pairs = Vec::new();

    for touch in &users.touches {
        if touch.writes {
            for reader in readers_since.drain(..) {
                pairs.push((reader.pass, touch.pass, kind_between(reader, touch)));
            }
            if let Some(prev) = latest {
                pairs.push((prev.pass, touch.pass, kind_between(prev, touch)));
            }
            latest = Some(touch);
            continue;
        }

        match (latest, last_producer) {
            (Some(producer), _) => {
                pairs.push((producer.pass, touch.pass, kind_between(producer, touch)));
                readers_since.push(touch);
            }
            (None, Some(producer)) => {
                pairs.push((producer.pass, touch.pass, kind_between(producer, touch)));
            }
            (None, None) if synthetic || touch.order_only => {
                return Err(GraphError::MissingProducer {
                    pass: passes[touch.pass].name().to_string(),
                    resource: users.resource,
                });
            }
            // Produced in an earlier frame or uploaded outside the graph.
            (None, None) => {}
        }
    }

    Ok(pairs)
}
