//! Lazily materialized view over a search result.
//!
//! A [`Path`] becomes usable once its search finishes. The node list is built
//! on first access by walking back-pointers from the best node and is never
//! recomputed afterwards, even if the path's blocked edges change.

use crate::error::PathError;
use crate::geometry::{Polygon, Vec2};
use crate::navmesh::{NavMesh, NodeId};
use crate::search::{BlockedEdges, PathSearch, SearchState};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Path {
    search: PathSearch,
    nodes: OnceLock<Vec<NodeId>>,
    blocked: BlockedEdges,
}

impl Path {
    /// Wrap a search; the path starts with a copy of the search's blocked edges.
    pub fn new(search: PathSearch) -> Self {
        let mut blocked = BlockedEdges::new();
        search.copy_blocked_edges(&mut blocked);
        Self {
            search,
            nodes: OnceLock::new(),
            blocked,
        }
    }

    /// Convenience: start a search between two nodes and wrap it.
    pub fn request(
        mesh: &NavMesh,
        from: NodeId,
        to: NodeId,
        to_coords: Vec2,
        blocked: BlockedEdges,
    ) -> Result<Self, PathError> {
        PathSearch::new(mesh, from, to, to_coords, blocked).map(Self::new)
    }

    /// Advance the underlying search. No-op once it has finished.
    pub fn step(&mut self, mesh: &NavMesh, max_expansions: usize) -> SearchState {
        self.search.step(mesh, max_expansions)
    }

    pub fn is_ready_for_use(&self) -> bool {
        self.search.is_finished()
    }

    /// Node expansions the underlying search has performed.
    pub fn expansions(&self) -> usize {
        self.search.expansions()
    }

    /// Route nodes from source to the best node reached.
    pub fn nodes(&self) -> Result<&[NodeId], PathError> {
        if !self.is_ready_for_use() {
            return Err(PathError::NotReady);
        }
        Ok(self.nodes.get_or_init(|| self.search.route()))
    }

    /// Whether the final node actually contains the requested destination.
    pub fn is_target_found(&self, mesh: &NavMesh) -> Result<bool, PathError> {
        let nodes = self.nodes()?;
        let last = nodes[nodes.len() - 1];
        Ok(mesh.contains(last, self.to_coords()))
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> Result<usize, PathError> {
        Ok(self.nodes()?.len())
    }

    pub fn path_node(&self, index: usize) -> Result<NodeId, PathError> {
        let nodes = self.nodes()?;
        nodes
            .get(index)
            .copied()
            .ok_or(PathError::IndexOutOfRange {
                index,
                len: nodes.len(),
            })
    }

    /// Polygon of the `index`th node on the route.
    pub fn polygon<'m>(&self, mesh: &'m NavMesh, index: usize) -> Result<&'m Polygon, PathError> {
        let id = self.path_node(index)?;
        mesh.node(id)
            .map(|n| n.polygon())
            .ok_or(PathError::UnknownNode(id))
    }

    /// Position of `node` on the route, if it is on it.
    pub fn index_of(&self, node: NodeId) -> Result<Option<usize>, PathError> {
        Ok(self.nodes()?.iter().position(|&n| n == node))
    }

    /// Drop the inherited blocked edges so the next replan starts clean.
    pub fn forget_blocked_edges(&mut self) -> Result<(), PathError> {
        if !self.is_ready_for_use() {
            return Err(PathError::NotReady);
        }
        self.blocked.clear();
        Ok(())
    }

    /// Mark an edge as congested for searches spawned from this path.
    ///
    /// The already materialized route is unaffected.
    pub fn block_edge(&mut self, mesh: &NavMesh, from: NodeId, to: NodeId) -> Result<bool, PathError> {
        self.blocked.block(mesh, from, to)
    }

    /// Add this path's blocked edges to `target`.
    pub fn copy_blocked_edges(&self, target: &mut BlockedEdges) {
        target.extend_from(&self.blocked);
    }

    pub fn blocked_edges(&self) -> &BlockedEdges {
        &self.blocked
    }

    /// Start a new path from `from` to the same destination, inheriting the
    /// current blocked edges.
    pub fn replan(&self, mesh: &NavMesh, from: NodeId) -> Result<Path, PathError> {
        let mut blocked = BlockedEdges::new();
        self.copy_blocked_edges(&mut blocked);
        Path::request(mesh, from, self.search.to_node(), self.to_coords(), blocked)
    }

    pub fn from_node(&self) -> NodeId {
        self.search.from_node()
    }

    pub fn to_node(&self) -> NodeId {
        self.search.to_node()
    }

    pub fn to_coords(&self) -> Vec2 {
        self.search.to_coords()
    }

    /// Nodes the search closed, in expansion order. Debugging aid.
    pub fn completed_nodes(&self) -> Vec<NodeId> {
        self.search.completed_nodes().collect()
    }
}
