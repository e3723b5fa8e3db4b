//! Node and element templates.
//!
//! A template describes the structure (which fields, which value types,
//! which basis) that newly created nodes and elements start out with. Each
//! `create_node` / `create_element` call copies the template; the template
//! itself is never merged into a region.

use crate::data::basis::Basis;
use crate::data::field::FieldHandle;
use crate::topology::cell_type::ElementShape;
use serde::{Deserialize, Serialize};

/// Kind of nodal parameter stored for each field component.
///
/// The discriminant is the per-axis derivative bit mask, which is also the
/// parameter's position within a Hermite node (see [`crate::data::basis`]).
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeValueType {
    Value = 0,
    D_DS1 = 1,
    D_DS2 = 2,
    D2_DS1DS2 = 3,
    D_DS3 = 4,
    D2_DS1DS3 = 5,
    D2_DS2DS3 = 6,
    D3_DS1DS2DS3 = 7,
}

impl NodeValueType {
    const ALL: [NodeValueType; 8] = [
        NodeValueType::Value,
        NodeValueType::D_DS1,
        NodeValueType::D_DS2,
        NodeValueType::D2_DS1DS2,
        NodeValueType::D_DS3,
        NodeValueType::D2_DS1DS3,
        NodeValueType::D2_DS2DS3,
        NodeValueType::D3_DS1DS2DS3,
    ];

    /// Derivative bit mask: bit `a` set for a derivative along xi `a+1`.
    #[inline]
    pub fn mask(self) -> usize {
        self as usize
    }

    /// Value types a Hermite node of `dimension` stores, in parameter order.
    pub fn hermite(dimension: usize) -> &'static [NodeValueType] {
        &Self::ALL[..(1usize << dimension.min(3))]
    }
}

/// One field's layout at a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFieldLayout {
    pub field: FieldHandle,
    pub number_of_components: usize,
    pub value_types: Vec<NodeValueType>,
}

impl NodeFieldLayout {
    /// Number of stored values: components × value types.
    #[inline]
    pub fn number_of_values(&self) -> usize {
        self.number_of_components * self.value_types.len()
    }
}

/// Prototype for new nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub fields: Vec<NodeFieldLayout>,
}

impl NodeTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `field` at the node with the given value types.
    pub fn define_field(
        &mut self,
        field: FieldHandle,
        number_of_components: usize,
        value_types: &[NodeValueType],
    ) -> &mut Self {
        self.fields.retain(|f| f.field != field);
        self.fields.push(NodeFieldLayout {
            field,
            number_of_components,
            value_types: value_types.to_vec(),
        });
        self
    }

    pub fn layout(&self, field: FieldHandle) -> Option<&NodeFieldLayout> {
        self.fields.iter().find(|f| f.field == field)
    }
}

/// Prototype for new elements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementTemplate {
    pub shape: ElementShape,
    pub number_of_nodes: usize,
    pub fields: Vec<(FieldHandle, Basis)>,
}

impl ElementTemplate {
    pub fn new(shape: ElementShape, number_of_nodes: usize) -> Self {
        Self {
            shape,
            number_of_nodes,
            fields: Vec::new(),
        }
    }

    /// Interpolates `field` with `basis` over the element's nodes.
    pub fn define_field(&mut self, field: FieldHandle, basis: Basis) -> &mut Self {
        self.fields.retain(|(f, _)| *f != field);
        self.fields.push((field, basis));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hermite_value_types_follow_masks() {
        let types = NodeValueType::hermite(2);
        assert_eq!(
            types,
            &[
                NodeValueType::Value,
                NodeValueType::D_DS1,
                NodeValueType::D_DS2,
                NodeValueType::D2_DS1DS2
            ]
        );
        for (i, t) in NodeValueType::hermite(3).iter().enumerate() {
            assert_eq!(t.mask(), i);
        }
    }

    #[test]
    fn redefining_a_field_replaces_it() {
        let mut template = NodeTemplate::new();
        template
            .define_field(FieldHandle(0), 3, &[NodeValueType::Value])
            .define_field(FieldHandle(0), 3, NodeValueType::hermite(2));
        assert_eq!(template.fields.len(), 1);
        assert_eq!(template.layout(FieldHandle(0)).unwrap().number_of_values(), 12);
    }
}
