//! Contract-violation errors for the pathfinding API.
//!
//! Expected outcomes (unreachable target, no safe velocity this tick) are not
//! errors; they are reported through return values.

use crate::navmesh::NodeId;

/// Misuse of a search, path, or blocked-edge set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path result was read before its search finished.
    NotReady,
    /// Node index past the end of the materialized path.
    IndexOutOfRange { index: usize, len: usize },
    /// A node handle that does not belong to the mesh.
    UnknownNode(NodeId),
    /// An edge that is not part of the mesh.
    NotAdjacent { from: NodeId, to: NodeId },
    /// The mesh has no nodes to search.
    EmptyMesh,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::NotReady => write!(f, "path is not ready for use"),
            PathError::IndexOutOfRange { index, len } => {
                write!(f, "path index {} out of range (length {})", index, len)
            }
            PathError::UnknownNode(id) => write!(f, "node {} is not part of the navmesh", id.0),
            PathError::NotAdjacent { from, to } => {
                write!(f, "nodes {} and {} share no edge", from.0, to.0)
            }
            PathError::EmptyMesh => write!(f, "navmesh has no nodes"),
        }
    }
}

impl std::error::Error for PathError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(PathError::NotReady.to_string(), "path is not ready for use");
        assert_eq!(
            PathError::IndexOutOfRange { index: 4, len: 2 }.to_string(),
            "path index 4 out of range (length 2)"
        );
        assert_eq!(
            PathError::NotAdjacent {
                from: NodeId(1),
                to: NodeId(7)
            }
            .to_string(),
            "nodes 1 and 7 share no edge"
        );
    }
}
