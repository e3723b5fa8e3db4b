//! Identifier allocation for new nodes and elements.
//!
//! Each allocator remembers the identifier after the last one it handed out
//! and resumes scanning from there, so sequential allocation into a mesh
//! costs one lookup per call instead of a rescan from the start.

use crate::mesh_error::MeshError;
use crate::topology::id::{ElementId, NodeId};
use crate::topology::mesh::MeshQuery;

/// Hands out unused node identifiers in increasing order.
#[derive(Clone, Debug)]
pub struct NodeIdentifierAllocator {
    hint: Option<NodeId>,
}

impl NodeIdentifierAllocator {
    pub fn new(start: NodeId) -> Self {
        Self { hint: Some(start) }
    }

    /// Next identifier not used in `mesh`, at or above the cached hint.
    ///
    /// # Errors
    /// `AllocationFailure` once the identifier space is exhausted.
    pub fn next<M: MeshQuery + ?Sized>(&mut self, mesh: &M) -> Result<NodeId, MeshError> {
        let hint = self
            .hint
            .ok_or_else(|| MeshError::AllocationFailure("node identifiers exhausted".into()))?;
        let id = mesh.next_free_node_identifier(hint)?;
        self.hint = id.checked_next();
        Ok(id)
    }

    /// Where the next scan starts.
    #[inline]
    pub fn hint(&self) -> Option<NodeId> {
        self.hint
    }
}

/// Hands out unused element identifiers of one dimension in increasing order.
#[derive(Clone, Debug)]
pub struct ElementIdentifierAllocator {
    dimension: usize,
    hint: Option<ElementId>,
}

impl ElementIdentifierAllocator {
    pub fn new(dimension: usize, start: ElementId) -> Self {
        Self {
            dimension,
            hint: Some(start),
        }
    }

    pub fn next<M: MeshQuery + ?Sized>(&mut self, mesh: &M) -> Result<ElementId, MeshError> {
        let hint = self.hint.ok_or_else(|| {
            MeshError::AllocationFailure(format!("{}D element identifiers exhausted", self.dimension))
        })?;
        let id = mesh.next_free_element_identifier(self.dimension, hint)?;
        self.hint = id.checked_next();
        Ok(id)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn hint(&self) -> Option<ElementId> {
        self.hint
    }
}
