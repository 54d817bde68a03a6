//! Resumable A* search over the navmesh with a blocked-edge filter.
//!
//! A [`PathSearch`] owns all of its traversal state: an arena of
//! [`PathNode`]s addressed by index, the open heap, and the set of edges it
//! must not cross. Dropping the search frees everything. The mesh is only
//! borrowed for the duration of each [`PathSearch::step`].

use crate::error::PathError;
use crate::geometry::Vec2;
use crate::navmesh::{NavMesh, NodeId};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// Directed navmesh edges a search may not traverse.
///
/// Every edge in the set exists in the mesh it was validated against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedEdges {
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl BlockedEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block traversal from `from` into `to`.
    ///
    /// Returns `Ok(false)` if the edge was already blocked.
    pub fn block(&mut self, mesh: &NavMesh, from: NodeId, to: NodeId) -> Result<bool, PathError> {
        for id in [from, to] {
            if !mesh.has_node(id) {
                return Err(PathError::UnknownNode(id));
            }
        }
        if !mesh.has_edge(from, to) {
            return Err(PathError::NotAdjacent { from, to });
        }
        Ok(self.edges.insert((from, to)))
    }

    pub fn contains(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Edges in ascending `(from, to)` order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    /// Add every edge of `other` to this set.
    pub fn extend_from(&mut self, other: &BlockedEdges) {
        self.edges.extend(other.edges.iter().copied());
    }
}

/// Lifecycle of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeStatus {
    Open,
    Closed,
}

/// Per-search wrapper around a navmesh node.
#[derive(Debug, Clone)]
struct PathNode {
    node: NodeId,
    cost: f32,
    heuristic: f32,
    /// Arena index of the predecessor on the best known route.
    previous: Option<usize>,
    status: NodeStatus,
}

/// Heap entry; ordered so the `BinaryHeap` pops the lowest estimate first,
/// then the lowest heuristic, then the earliest push.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    estimate: f32,
    heuristic: f32,
    cost: f32,
    seq: u64,
    handle: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.heuristic.total_cmp(&self.heuristic))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Incremental best-first search from one node towards a target node.
#[derive(Debug, Clone)]
pub struct PathSearch {
    to_node: NodeId,
    to_coords: Vec2,
    target_centroid: Vec2,
    blocked: BlockedEdges,
    arena: Vec<PathNode>,
    lookup: HashMap<NodeId, usize>,
    open: BinaryHeap<OpenEntry>,
    completed: Vec<usize>,
    best: usize,
    state: SearchState,
    expansions: usize,
    seq: u64,
}

/// Arena index of the source node; it is always the first node created.
const SOURCE: usize = 0;

impl PathSearch {
    /// Start a search from `from` towards `to`.
    ///
    /// `to_coords` is the requested destination point; it only decides
    /// whether the finished route counts as reaching the target. Every
    /// blocked edge must belong to `mesh`.
    pub fn new(
        mesh: &NavMesh,
        from: NodeId,
        to: NodeId,
        to_coords: Vec2,
        blocked: BlockedEdges,
    ) -> Result<Self, PathError> {
        if mesh.is_empty() {
            return Err(PathError::EmptyMesh);
        }
        let source = mesh.node(from).ok_or(PathError::UnknownNode(from))?;
        let target = mesh.node(to).ok_or(PathError::UnknownNode(to))?;
        let target_centroid = target.centroid();
        if let Some((a, b)) = blocked.iter().find(|&(a, b)| !mesh.has_edge(a, b)) {
            return Err(PathError::NotAdjacent { from: a, to: b });
        }

        let heuristic = source.centroid().distance(target_centroid);
        let mut search = Self {
            to_node: to,
            to_coords,
            target_centroid,
            blocked,
            arena: vec![PathNode {
                node: from,
                cost: 0.0,
                heuristic,
                previous: None,
                status: NodeStatus::Open,
            }],
            lookup: HashMap::from([(from, SOURCE)]),
            open: BinaryHeap::new(),
            completed: Vec::new(),
            best: SOURCE,
            state: SearchState::Running,
            expansions: 0,
            seq: 0,
        };
        search.push_open(SOURCE);
        Ok(search)
    }

    /// Start a search between two map points, snapping each to the node
    /// containing it (or the nearest node when it lies off the mesh).
    pub fn between_points(
        mesh: &NavMesh,
        from: Vec2,
        to: Vec2,
        blocked: BlockedEdges,
    ) -> Result<Self, PathError> {
        let from_node = mesh.locate_or_nearest(from).ok_or(PathError::EmptyMesh)?;
        let to_node = mesh.locate_or_nearest(to).ok_or(PathError::EmptyMesh)?;
        Self::new(mesh, from_node, to_node, to, blocked)
    }

    /// Expand at most `max_expansions` nodes (at least one) and report the
    /// state afterwards. Calling this on a finished search does nothing.
    pub fn step(&mut self, mesh: &NavMesh, max_expansions: usize) -> SearchState {
        let mut budget = max_expansions.max(1);
        while self.state == SearchState::Running && budget > 0 {
            let Some(entry) = self.open.pop() else {
                self.finish();
                break;
            };
            let current = &self.arena[entry.handle];
            if current.status == NodeStatus::Closed || entry.cost > current.cost {
                // stale entry left behind by a cost improvement
                continue;
            }

            let handle = entry.handle;
            self.arena[handle].status = NodeStatus::Closed;
            self.completed.push(handle);
            self.expansions += 1;
            budget -= 1;

            let node = self.arena[handle].node;
            if node == self.to_node {
                self.best = handle;
                self.finish();
                break;
            }
            self.expand(mesh, handle);
        }
        self.state
    }

    /// Run until the search finishes.
    pub fn run(&mut self, mesh: &NavMesh) -> SearchState {
        while self.step(mesh, usize::MAX) == SearchState::Running {}
        self.state
    }

    fn expand(&mut self, mesh: &NavMesh, handle: usize) {
        let node = self.arena[handle].node;
        let base_cost = self.arena[handle].cost;
        let centroid = node_centroid(mesh, node);

        for adj in mesh.neighbors(node) {
            if self.blocked.contains(node, adj.node) {
                continue;
            }
            let next_centroid = node_centroid(mesh, adj.node);
            let cost = base_cost + centroid.distance(next_centroid);

            match self.lookup.get(&adj.node) {
                Some(&existing) => {
                    let known = &mut self.arena[existing];
                    if known.status == NodeStatus::Closed || cost >= known.cost {
                        continue;
                    }
                    known.cost = cost;
                    known.previous = Some(handle);
                    self.push_open(existing);
                    self.consider_best(existing);
                }
                None => {
                    let new_handle = self.arena.len();
                    self.arena.push(PathNode {
                        node: adj.node,
                        cost,
                        heuristic: next_centroid.distance(self.target_centroid),
                        previous: Some(handle),
                        status: NodeStatus::Open,
                    });
                    self.lookup.insert(adj.node, new_handle);
                    self.push_open(new_handle);
                    self.consider_best(new_handle);
                }
            }
        }
    }

    fn push_open(&mut self, handle: usize) {
        let node = &self.arena[handle];
        self.open.push(OpenEntry {
            estimate: node.cost + node.heuristic,
            heuristic: node.heuristic,
            cost: node.cost,
            seq: self.seq,
            handle,
        });
        self.seq += 1;
    }

    fn consider_best(&mut self, handle: usize) {
        let candidate = &self.arena[handle];
        let best = &self.arena[self.best];
        let better = candidate
            .heuristic
            .total_cmp(&best.heuristic)
            .then_with(|| candidate.cost.total_cmp(&best.cost))
            == Ordering::Less;
        if better {
            self.best = handle;
        }
    }

    fn finish(&mut self) {
        self.state = SearchState::Finished;
        log::debug!(
            "search {:?} -> {:?} finished after {} expansions, best node {:?}",
            self.from_node(),
            self.to_node,
            self.expansions,
            self.best_node()
        );
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SearchState::Finished
    }

    /// Closest-to-target node found so far; the target itself once reached.
    pub fn best_node(&self) -> NodeId {
        self.arena[self.best].node
    }

    pub fn from_node(&self) -> NodeId {
        self.arena[SOURCE].node
    }

    pub fn to_node(&self) -> NodeId {
        self.to_node
    }

    pub fn to_coords(&self) -> Vec2 {
        self.to_coords
    }

    /// Number of nodes closed so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Closed nodes in the order they were expanded. Debugging aid.
    pub fn completed_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.completed.iter().map(|&h| self.arena[h].node)
    }

    pub fn blocked_edges(&self) -> &BlockedEdges {
        &self.blocked
    }

    /// Add this search's blocked edges to `target`.
    pub fn copy_blocked_edges(&self, target: &mut BlockedEdges) {
        target.extend_from(&self.blocked);
    }

    /// Nodes from the source to the current best node, following
    /// back-pointers. Valid mid-search as a partial route.
    pub fn route(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut current = Some(self.best);
        while let Some(handle) = current {
            let path_node = &self.arena[handle];
            nodes.push(path_node.node);
            current = path_node.previous;
        }
        nodes.reverse();
        nodes
    }

    /// Cost of the best known route to the current best node.
    pub fn best_cost(&self) -> f32 {
        self.arena[self.best].cost
    }
}

fn node_centroid(mesh: &NavMesh, id: NodeId) -> Vec2 {
    mesh.node(id).map(|n| n.centroid()).unwrap_or_default()
}
