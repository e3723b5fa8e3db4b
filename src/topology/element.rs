//! Elements: shape, local node list, per-field basis and parent links.

use crate::data::basis::Basis;
use crate::data::field::FieldHandle;
use crate::data::template::ElementTemplate;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementShape;
use crate::topology::id::{ElementId, ElementKey, NodeId};

/// A mesh element.
///
/// `parents` lists the higher-dimensional elements this element is a face
/// (or line) of; it drives the is-within relation used by selections.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    key: ElementKey,
    shape: ElementShape,
    nodes: Vec<Option<NodeId>>,
    bases: Vec<(FieldHandle, Basis)>,
    parents: Vec<ElementKey>,
}

impl Element {
    pub(crate) fn from_template(id: ElementId, template: &ElementTemplate) -> Self {
        Self {
            key: ElementKey::new(template.shape.dimension(), id),
            shape: template.shape,
            nodes: vec![None; template.number_of_nodes],
            bases: template.fields.clone(),
            parents: Vec::new(),
        }
    }

    #[inline]
    pub fn key(&self) -> ElementKey {
        self.key
    }

    #[inline]
    pub fn id(&self) -> ElementId {
        self.key.id
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.key.dimension
    }

    #[inline]
    pub fn shape(&self) -> ElementShape {
        self.shape
    }

    /// Local node slots; `None` until assigned.
    #[inline]
    pub fn nodes(&self) -> &[Option<NodeId>] {
        &self.nodes
    }

    pub fn node(&self, local: usize) -> Option<NodeId> {
        self.nodes.get(local).copied().flatten()
    }

    /// Basis interpolating `field` over this element, if the field is defined here.
    pub fn basis(&self, field: FieldHandle) -> Option<Basis> {
        self.bases.iter().find(|(f, _)| *f == field).map(|(_, b)| *b)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldHandle> + '_ {
        self.bases.iter().map(|(f, _)| *f)
    }

    #[inline]
    pub fn parents(&self) -> &[ElementKey] {
        &self.parents
    }

    /// Assigns local node `local`.
    pub fn set_node(&mut self, local: usize, node: NodeId) -> Result<(), MeshError> {
        let count = self.nodes.len();
        let slot = self.nodes.get_mut(local).ok_or_else(|| {
            MeshError::invalid_argument(format!(
                "local node {local} out of range for element {} with {count} nodes",
                self.key
            ))
        })?;
        *slot = Some(node);
        Ok(())
    }

    pub(crate) fn add_parent(&mut self, parent: ElementKey) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_start_unset() {
        let template = ElementTemplate::new(ElementShape::Square, 4);
        let mut element = Element::from_template(ElementId::new(3).unwrap(), &template);
        assert_eq!(element.dimension(), 2);
        assert!(element.nodes().iter().all(Option::is_none));
        element.set_node(2, NodeId::new(9).unwrap()).unwrap();
        assert_eq!(element.node(2).map(NodeId::get), Some(9));
        assert!(element.set_node(4, NodeId::new(1).unwrap()).is_err());
    }
}
