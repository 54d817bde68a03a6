//! Navigation mesh: convex polygon nodes joined by shared edges.
//!
//! The mesh is immutable once built. Searches keep their own traversal state
//! and only ever read from it, so one mesh can serve any number of searches.

use crate::geometry::{Polygon, Vec2, EPSILON};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable handle of a navmesh node, valid for the lifetime of its mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Segment shared by two neighbouring nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: Vec2,
    pub b: Vec2,
}

impl Edge {
    pub fn midpoint(&self) -> Vec2 {
        self.a.lerp(self.b, 0.5)
    }

    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }
}

/// One neighbour of a node and the edge crossed to reach it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjacency {
    pub node: NodeId,
    pub edge: Edge,
}

#[derive(Debug, Clone)]
pub struct NavMeshNode {
    id: NodeId,
    polygon: Polygon,
    centroid: Vec2,
    neighbors: Vec<Adjacency>,
}

impl NavMeshNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub fn neighbors(&self) -> &[Adjacency] {
        &self.neighbors
    }
}

/// Mesh construction failure.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Polygon at this input index has fewer than three vertices.
    TooFewVertices(usize),
    /// Polygon at this input index has zero area.
    Degenerate(usize),
    /// Grid cells must have a finite, positive size.
    InvalidCellSize(f32),
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::TooFewVertices(i) => write!(f, "polygon #{} has fewer than 3 vertices", i),
            MeshError::Degenerate(i) => write!(f, "polygon #{} has zero area", i),
            MeshError::InvalidCellSize(size) => write!(f, "invalid grid cell size {}", size),
        }
    }
}

impl std::error::Error for MeshError {}

/// Read-only planar subdivision used for coarse route planning.
#[derive(Debug, Clone, Default)]
pub struct NavMesh {
    nodes: Vec<NavMeshNode>,
}

impl NavMesh {
    /// Build a mesh from convex polygons; neighbours are polygons sharing an
    /// edge with identical endpoints.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Result<Self, MeshError> {
        let mut builder = NavMeshBuilder::default();
        for polygon in polygons {
            builder.add_polygon(polygon);
        }
        builder.build()
    }

    /// One square node per walkable cell of a `columns` × `rows` grid.
    ///
    /// Nodes are numbered in row-major order over walkable cells only.
    /// A grid with no walkable cells yields an empty mesh.
    pub fn from_grid(
        columns: usize,
        rows: usize,
        cell_size: f32,
        walkable: impl Fn(usize, usize) -> bool,
    ) -> Result<Self, MeshError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(MeshError::InvalidCellSize(cell_size));
        }
        let mut builder = NavMeshBuilder::default();
        for row in 0..rows {
            for col in 0..columns {
                if walkable(col, row) {
                    let origin = Vec2::new(col as f32 * cell_size, row as f32 * cell_size);
                    builder.add_polygon(Polygon::square(origin, cell_size));
                }
            }
        }
        builder.build()
    }

    pub fn node(&self, id: NodeId) -> Option<&NavMeshNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn nodes(&self) -> &[NavMeshNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    /// Neighbours of `id` in construction order. Empty for foreign handles.
    pub fn neighbors(&self, id: NodeId) -> &[Adjacency] {
        self.node(id).map(|n| n.neighbors()).unwrap_or(&[])
    }

    /// Whether `point` lies inside (or on the boundary of) node `id`.
    pub fn contains(&self, id: NodeId, point: Vec2) -> bool {
        self.node(id).is_some_and(|n| n.polygon.contains(point))
    }

    /// The shared edge between two nodes, if they are neighbours.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<Edge> {
        self.neighbors(from)
            .iter()
            .find(|adj| adj.node == to)
            .map(|adj| adj.edge)
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge(from, to).is_some()
    }

    /// First node whose polygon contains `point`.
    pub fn locate(&self, point: Vec2) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.polygon.contains(point))
            .map(|n| n.id)
    }

    /// Node whose centroid is closest to `point`.
    pub fn nearest(&self, point: Vec2) -> Option<NodeId> {
        self.nodes
            .iter()
            .min_by(|a, b| {
                a.centroid
                    .distance(point)
                    .total_cmp(&b.centroid.distance(point))
            })
            .map(|n| n.id)
    }

    /// Containing node, falling back to the nearest one for points off the mesh.
    pub fn locate_or_nearest(&self, point: Vec2) -> Option<NodeId> {
        self.locate(point).or_else(|| self.nearest(point))
    }

    /// Total number of directed adjacencies.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum()
    }
}

/// Quantized vertex used to match shared edges despite float noise.
type VertexKey = (i64, i64);

fn vertex_key(v: Vec2) -> VertexKey {
    const SCALE: f32 = 1000.0;
    ((v.x * SCALE).round() as i64, (v.y * SCALE).round() as i64)
}

fn edge_key(a: Vec2, b: Vec2) -> (VertexKey, VertexKey) {
    let (ka, kb) = (vertex_key(a), vertex_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// Incremental mesh builder.
#[derive(Debug, Default)]
pub struct NavMeshBuilder {
    polygons: Vec<Polygon>,
}

impl NavMeshBuilder {
    /// Queue a polygon; its node id is its insertion index.
    pub fn add_polygon(&mut self, polygon: Polygon) -> NodeId {
        self.polygons.push(polygon);
        NodeId(self.polygons.len() as u32 - 1)
    }

    pub fn build(self) -> Result<NavMesh, MeshError> {
        for (i, polygon) in self.polygons.iter().enumerate() {
            if polygon.vertices().len() < 3 {
                return Err(MeshError::TooFewVertices(i));
            }
            if polygon.signed_area2().abs() <= EPSILON {
                return Err(MeshError::Degenerate(i));
            }
        }

        // edge key → owners in insertion order
        let mut owners: HashMap<_, Vec<(usize, Edge)>> = HashMap::new();
        for (i, polygon) in self.polygons.iter().enumerate() {
            for (a, b) in polygon.edges() {
                owners
                    .entry(edge_key(a, b))
                    .or_default()
                    .push((i, Edge { a, b }));
            }
        }

        let nodes = self
            .polygons
            .into_iter()
            .enumerate()
            .map(|(i, polygon)| {
                let neighbors = polygon
                    .edges()
                    .flat_map(|(a, b)| {
                        owners
                            .get(&edge_key(a, b))
                            .into_iter()
                            .flatten()
                            .filter(move |(owner, _)| *owner != i)
                            .map(move |&(owner, _)| Adjacency {
                                node: NodeId(owner as u32),
                                edge: Edge { a, b },
                            })
                    })
                    .collect();
                NavMeshNode {
                    id: NodeId(i as u32),
                    centroid: polygon.centroid(),
                    polygon,
                    neighbors,
                }
            })
            .collect();

        Ok(NavMesh { nodes })
    }
}
