//! Nodes and their per-field parameters.

use crate::data::field::FieldHandle;
use crate::data::template::{NodeTemplate, NodeValueType};
use crate::mesh_error::MeshError;
use crate::topology::id::NodeId;
use hashbrown::HashMap;

/// Parameters of one field at one node.
///
/// Values are stored component-major: `values[c * value_types.len() + k]` is
/// component `c`, value type `value_types[k]`.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeFieldValues {
    value_types: Vec<NodeValueType>,
    number_of_components: usize,
    values: Vec<f64>,
}

impl NodeFieldValues {
    fn new(number_of_components: usize, value_types: Vec<NodeValueType>) -> Self {
        let len = number_of_components * value_types.len();
        Self {
            value_types,
            number_of_components,
            values: vec![0.0; len],
        }
    }

    #[inline]
    pub fn value_types(&self) -> &[NodeValueType] {
        &self.value_types
    }

    #[inline]
    pub fn number_of_components(&self) -> usize {
        self.number_of_components
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of `component` for `value_type`, if the node stores that type.
    pub fn get(&self, component: usize, value_type: NodeValueType) -> Option<f64> {
        let k = self.value_types.iter().position(|t| *t == value_type)?;
        if component >= self.number_of_components {
            return None;
        }
        self.values.get(component * self.value_types.len() + k).copied()
    }
}

/// A mesh node: an identifier plus parameters for each field defined on it.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    fields: HashMap<FieldHandle, NodeFieldValues>,
}

impl Node {
    /// A fresh node with the template's fields defined and zero-filled.
    pub(crate) fn from_template(id: NodeId, template: &NodeTemplate) -> Self {
        let fields = template
            .fields
            .iter()
            .map(|layout| {
                (
                    layout.field,
                    NodeFieldValues::new(layout.number_of_components, layout.value_types.clone()),
                )
            })
            .collect();
        Self { id, fields }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn defines_field(&self, field: FieldHandle) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn field_values(&self, field: FieldHandle) -> Option<&NodeFieldValues> {
        self.fields.get(&field)
    }

    /// All parameters of `field`, component-major.
    pub fn values(&self, field: FieldHandle) -> Option<&[f64]> {
        self.fields.get(&field).map(NodeFieldValues::values)
    }

    pub fn value(&self, field: FieldHandle, component: usize, value_type: NodeValueType) -> Option<f64> {
        self.fields.get(&field)?.get(component, value_type)
    }

    /// Replaces every parameter of `field`.
    ///
    /// # Errors
    /// `UnknownField` if the node does not define `field`;
    /// `InvalidArgument` if `values` has the wrong length.
    pub fn set_values(&mut self, field: FieldHandle, values: &[f64]) -> Result<(), MeshError> {
        let entry = self
            .fields
            .get_mut(&field)
            .ok_or_else(|| MeshError::UnknownField(format!("#{} at node {}", field.index(), self.id)))?;
        if entry.values.len() != values.len() {
            return Err(MeshError::invalid_argument(format!(
                "node {} expects {} values for field #{}, got {}",
                self.id,
                entry.values.len(),
                field.index(),
                values.len()
            )));
        }
        entry.values.copy_from_slice(values);
        Ok(())
    }

    /// Sets one parameter of `field`.
    pub fn set_value(
        &mut self,
        field: FieldHandle,
        component: usize,
        value_type: NodeValueType,
        value: f64,
    ) -> Result<(), MeshError> {
        let id = self.id;
        let entry = self
            .fields
            .get_mut(&field)
            .ok_or_else(|| MeshError::UnknownField(format!("#{} at node {id}", field.index())))?;
        let k = entry
            .value_types
            .iter()
            .position(|t| *t == value_type)
            .ok_or_else(|| {
                MeshError::invalid_argument(format!("node {id} does not store {value_type:?}"))
            })?;
        if component >= entry.number_of_components {
            return Err(MeshError::invalid_argument(format!(
                "component {component} out of range at node {id}"
            )));
        }
        let stride = entry.value_types.len();
        entry.values[component * stride + k] = value;
        Ok(())
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&FieldHandle, &NodeFieldValues)> {
        self.fields.iter()
    }
}
