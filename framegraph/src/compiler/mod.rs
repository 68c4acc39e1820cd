//! Frame graph compilation.
//!
//! This module turns the passes registered in a frame into an execution plan
//! ([`ExecutionOrder`]). It performs:
//!
//! 1. **Dependency resolution** - Derive pass-to-pass constraints from the
//!    declared resource edges ([`DependencyGraph`])
//! 2. **Topological sort** - Kahn's algorithm, always picking the ready pass
//!    registered first, so the order is stable from frame to frame
//! 3. **Cycle detection** - A graph that cannot be fully sorted is rejected
//!    together with the passes forming the cycle
//! 4. **Grouping** - Passes that transitively share no resource are split into
//!    recording groups that can be recorded on separate threads
//!
//! Barriers are not computed here; they depend on resource state at execution
//! time and are synthesized by [`crate::barrier`].
//!
//! # Example
//!
//! ```ignore
//! let mut frame = graph.begin_frame();
//! let depth = frame.register_pass("Depth", PassKind::Graphics, |_| {})?;
//! let lighting = frame.register_pass("Lighting", PassKind::Compute, |_| {})?;
//! frame.add_output(depth, DEPTH, ResourceState::DEPTH_WRITE)?;
//! frame.add_input(lighting, DEPTH, ResourceState::NON_PIXEL_SHADER_RESOURCE)?;
//!
//! let order = frame.build()?;
//! assert_eq!(order.pass_order(), &[depth, lighting]);
//! ```

mod dependency;

pub use dependency::{
    Dependency, DependencyGraph, DependencyKind, ResourceTouch, ResourceUsers,
};

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use framegraph_core::profiling::profile_scope;

use crate::error::GraphError;
use crate::graph::{PassHandle, PassKind, PassRegistry};
use crate::resource::ResourceTable;

/// Passes recorded into the same command context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingGroup {
    passes: Vec<PassHandle>,
}

impl RecordingGroup {
    /// Passes of the group in execution order.
    pub fn passes(&self) -> &[PassHandle] {
        &self.passes
    }

    /// Number of passes in the group.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// A compiled frame ready for execution.
///
/// Contains the topologically sorted pass order, the dependency level of every
/// pass and the independent recording groups.
#[derive(Debug, Clone)]
pub struct ExecutionOrder {
    frame: u32,
    revision: u64,
    pass_order: Vec<PassHandle>,
    positions: Vec<usize>,
    levels: Vec<u32>,
    groups: Vec<RecordingGroup>,
    pass_names: Vec<String>,
    pass_kinds: Vec<PassKind>,
    graph: DependencyGraph,
}

impl ExecutionOrder {
    /// Frame the order was built for (wrapping).
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Registry revision the order was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Pass execution order.
    pub fn pass_order(&self) -> &[PassHandle] {
        &self.pass_order
    }

    /// Get the number of passes.
    pub fn pass_count(&self) -> usize {
        self.pass_order.len()
    }

    /// Check if no passes were registered.
    pub fn is_empty(&self) -> bool {
        self.pass_order.is_empty()
    }

    /// Position of a pass in the execution order.
    pub fn position(&self, pass: PassHandle) -> Option<usize> {
        self.check(pass).map(|index| self.positions[index])
    }

    /// Length of the longest dependency chain ending at `pass`. Passes with no
    /// dependencies are on level 0.
    pub fn level(&self, pass: PassHandle) -> Option<u32> {
        self.check(pass).map(|index| self.levels[index])
    }

    /// Number of distinct dependency levels.
    pub fn level_count(&self) -> usize {
        self.levels.iter().max().map_or(0, |&max| max as usize + 1)
    }

    /// Independent recording groups, ordered by their first pass.
    pub fn groups(&self) -> &[RecordingGroup] {
        &self.groups
    }

    /// The dependency graph the order was computed from.
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Name of a pass.
    pub fn pass_name(&self, pass: PassHandle) -> Option<&str> {
        self.check(pass).map(|index| self.pass_names[index].as_str())
    }

    fn check(&self, pass: PassHandle) -> Option<usize> {
        let index = pass.index() as usize;
        (pass.frame() == self.frame && index < self.positions.len()).then_some(index)
    }

    /// Render the dependency graph in Graphviz DOT format.
    ///
    /// Order-only dependencies are dashed and explicit ones dotted.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_dot(&mut out);
        out
    }

    fn write_dot(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "digraph frame_{} {{", self.frame)?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out, "    node [shape=box];")?;
        for handle in &self.pass_order {
            let index = handle.index() as usize;
            writeln!(
                out,
                "    p{index} [label=\"{}\\n{} L{}\"];",
                self.pass_names[index],
                self.pass_kinds[index].name(),
                self.levels[index]
            )?;
        }
        for dep in self.graph.dependencies() {
            let style = match dep.kind {
                DependencyKind::Data => "solid",
                DependencyKind::OrderOnly => "dashed",
                DependencyKind::Explicit => "dotted",
            };
            writeln!(out, "    p{} -> p{} [style={style}];", dep.from, dep.to)?;
        }
        writeln!(out, "}}")
    }
}

/// Compile the passes of a frame into an execution plan.
///
/// # Returns
///
/// * `Ok(ExecutionOrder)` - Passes in dependency order
/// * `Err(GraphError::CyclicDependency)` - If the dependencies contain a cycle
/// * `Err(GraphError::MissingProducer)` - If a pass waits on a token no pass
///   produces
pub fn compile(
    registry: &PassRegistry<'_>,
    resources: &ResourceTable,
) -> Result<ExecutionOrder, GraphError> {
    profile_scope!("framegraph_compile");

    let passes = registry.passes();
    let graph = DependencyGraph::build(passes, registry.dependencies(), resources)?;
    let sorted = topological_sort(&graph).map_err(|cycle| GraphError::CyclicDependency {
        cycle: cycle
            .into_iter()
            .map(|index| passes[index].name().to_string())
            .collect(),
    })?;

    let n = passes.len();
    let mut positions = vec![0; n];
    let mut levels = vec![0u32; n];
    for (position, &index) in sorted.iter().enumerate() {
        let level = graph
            .predecessors(index)
            .iter()
            .map(|&pred| levels[pred] + 1)
            .max()
            .unwrap_or(0);
        positions[index] = position;
        levels[index] = level;
    }

    let frame = registry.frame();
    let groups = recording_groups(&graph, &sorted, frame);
    let pass_order: Vec<PassHandle> = sorted
        .iter()
        .map(|&index| PassHandle::new(frame, index as u32))
        .collect();

    log::debug!(
        "Compiled frame {frame}: {} passes, {} dependencies, {} groups",
        pass_order.len(),
        graph.dependencies().len(),
        groups.len()
    );

    Ok(ExecutionOrder {
        frame,
        revision: registry.revision(),
        pass_order,
        positions,
        levels,
        groups,
        pass_names: passes.iter().map(|p| p.name().to_string()).collect(),
        pass_kinds: passes.iter().map(|p| p.kind()).collect(),
        graph,
    })
}

/// Kahn's algorithm; among ready passes the lowest registration index wins.
///
/// On failure returns one cycle in dependency order, first pass repeated at
/// the end.
fn topological_sort(graph: &DependencyGraph) -> Result<Vec<usize>, Vec<usize>> {
    let n = graph.pass_count();
    let mut in_degree: Vec<usize> = (0..n).map(|i| graph.predecessors(i).len()).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for &next in graph.successors(index) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err(find_cycle(graph, &in_degree))
    }
}

/// Walk unsorted predecessors from an unsorted pass until one repeats.
///
/// Every pass left with a non-zero in-degree has at least one unsorted
/// predecessor, so the walk always closes a cycle.
fn find_cycle(graph: &DependencyGraph, in_degree: &[usize]) -> Vec<usize> {
    let Some(start) = (0..in_degree.len()).find(|&i| in_degree[i] > 0) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&pred) = graph
            .predecessors(current)
            .iter()
            .filter(|&&p| in_degree[p] > 0)
            .min()
        else {
            return path;
        };
        if let Some(at) = path.iter().position(|&p| p == pred) {
            let mut cycle: Vec<usize> = path[at..].to_vec();
            cycle.reverse();
            cycle.push(cycle[0]);
            return cycle;
        }
        path.push(pred);
        current = pred;
    }
}

/// Partition passes into groups that transitively share no resource.
fn recording_groups(graph: &DependencyGraph, sorted: &[usize], frame: u32) -> Vec<RecordingGroup> {
    let mut sets = DisjointSet::new(graph.pass_count());
    for users in graph.resources() {
        let mut touches = users.touches().iter();
        if let Some(first) = touches.next() {
            for touch in touches {
                sets.union(first.pass, touch.pass);
            }
        }
    }
    for dep in graph.dependencies() {
        sets.union(dep.from, dep.to);
    }

    let mut group_of_root: Vec<Option<usize>> = vec![None; graph.pass_count()];
    let mut groups: Vec<RecordingGroup> = Vec::new();
    for &index in sorted {
        let root = sets.find(index);
        let group = *group_of_root[root].get_or_insert_with(|| {
            groups.push(RecordingGroup { passes: Vec::new() });
            groups.len() - 1
        });
        groups[group]
            .passes
            .push(PassHandle::new(frame, index as u32));
    }
    groups
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the lower index as root for stable grouping.
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}
