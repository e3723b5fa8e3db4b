//! Mesh access traits.
//!
//! The conversion engine and the selection structures never touch a concrete
//! mesh type; they read through [`MeshQuery`] and write through
//! [`MeshWriter`]. [`crate::topology::region::Region`] is the in-memory
//! implementation shipped with the crate.

use crate::data::field::{FieldDefinition, FieldHandle};
use crate::data::template::{ElementTemplate, NodeTemplate};
use crate::mesh_error::MeshError;
use crate::topology::element::Element;
use crate::topology::id::{ElementId, ElementKey, NodeId};
use crate::topology::node::Node;
use std::ops::{Deref, DerefMut};

/// Read access to a mesh.
pub trait MeshQuery {
    /// Visits every element of `dimension` in ascending identifier order,
    /// stopping at the first error returned by `visitor`.
    fn for_each_element_of_dimension(
        &self,
        dimension: usize,
        visitor: &mut dyn FnMut(&Element) -> Result<(), MeshError>,
    ) -> Result<(), MeshError>;

    fn element(&self, key: ElementKey) -> Option<&Element>;

    fn node(&self, id: NodeId) -> Option<&Node>;

    fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn contains_element(&self, key: ElementKey) -> bool {
        self.element(key).is_some()
    }

    /// Smallest unused node identifier `>= hint`.
    fn next_free_node_identifier(&self, hint: NodeId) -> Result<NodeId, MeshError>;

    /// Smallest unused element identifier of `dimension` that is `>= hint`.
    fn next_free_element_identifier(
        &self,
        dimension: usize,
        hint: ElementId,
    ) -> Result<ElementId, MeshError>;

    /// True if `element` is `top_level` or lies (through face/line parent
    /// links) on its boundary.
    fn is_element_within(&self, element: ElementKey, top_level: ElementKey) -> bool;

    fn find_field_by_name(&self, name: &str) -> Option<FieldHandle>;

    fn field_definition(&self, field: FieldHandle) -> Option<&FieldDefinition>;
}

/// Mutation access to a mesh.
///
/// Nodes and elements are built detached from a template, filled in, then
/// merged; only merging makes them part of the mesh.
pub trait MeshWriter: MeshQuery {
    fn define_field(&mut self, definition: FieldDefinition) -> Result<FieldHandle, MeshError>;

    /// A detached node with the template's structure.
    fn create_node(&self, id: NodeId, template: &NodeTemplate) -> Result<Node, MeshError>;

    fn set_node_field_values(
        &self,
        node: &mut Node,
        field: FieldHandle,
        values: &[f64],
    ) -> Result<(), MeshError> {
        node.set_values(field, values)
    }

    /// Adds a detached node to the mesh.
    fn merge_node(&mut self, node: Node) -> Result<NodeId, MeshError>;

    /// A detached element with the template's structure.
    fn create_element(&self, id: ElementId, template: &ElementTemplate) -> Result<Element, MeshError>;

    fn set_element_node(
        &self,
        element: &mut Element,
        local: usize,
        node: NodeId,
    ) -> Result<(), MeshError> {
        element.set_node(local, node)
    }

    /// Adds a detached element to the mesh.
    fn merge_element(&mut self, element: Element) -> Result<ElementKey, MeshError>;

    /// Opens a bulk change; calls nest.
    fn begin_change(&mut self);

    /// Closes a bulk change; the outermost close publishes the batch.
    fn end_change(&mut self);
}

/// Keeps a bulk change open for its lifetime.
///
/// `begin_change` runs on construction and `end_change` on drop, so the
/// bracket closes on every exit path, including early `?` returns.
pub struct ChangeCache<'a, W: MeshWriter + ?Sized> {
    mesh: &'a mut W,
}

impl<'a, W: MeshWriter + ?Sized> ChangeCache<'a, W> {
    pub fn new(mesh: &'a mut W) -> Self {
        mesh.begin_change();
        Self { mesh }
    }
}

impl<W: MeshWriter + ?Sized> Deref for ChangeCache<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.mesh
    }
}

impl<W: MeshWriter + ?Sized> DerefMut for ChangeCache<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.mesh
    }
}

impl<W: MeshWriter + ?Sized> Drop for ChangeCache<'_, W> {
    fn drop(&mut self) {
        self.mesh.end_change();
    }
}
