//! In-memory mesh region.
//!
//! A [`Region`] owns its field definitions, nodes and elements (of dimension
//! 1 to 3) outright. Mutations are grouped into change batches: between the
//! outermost [`MeshWriter::begin_change`] and the matching
//! [`MeshWriter::end_change`] all additions accumulate into one
//! [`RegionChanges`] record, which is published when the bracket closes.
//! Mutations made outside any bracket publish one record each.
//!
//! # Invariants
//! - Every element's local nodes are assigned and exist in the region.
//! - Every parent link points to an existing element of higher dimension.
//! - Every field referenced by a node or element is defined in the region.
//!
//! These are checked when a change batch closes in debug builds and with the
//! `check-invariants` feature.

use crate::data::field::{FieldDefinition, FieldHandle};
use crate::data::template::{ElementTemplate, NodeTemplate};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::element::Element;
use crate::topology::id::{ElementId, ElementKey, NodeId};
use crate::topology::mesh::{MeshQuery, MeshWriter};
use crate::topology::node::Node;
use std::collections::{BTreeMap, HashSet, VecDeque};

const MAX_DIMENSION: usize = 3;

/// Additions published by one closed change batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionChanges {
    pub fields_defined: Vec<FieldHandle>,
    pub nodes_added: Vec<NodeId>,
    pub elements_added: Vec<ElementKey>,
}

impl RegionChanges {
    pub fn is_empty(&self) -> bool {
        self.fields_defined.is_empty() && self.nodes_added.is_empty() && self.elements_added.is_empty()
    }
}

/// An in-memory finite-element mesh with fields.
#[derive(Clone, Debug, Default)]
pub struct Region {
    name: String,
    fields: Vec<FieldDefinition>,
    nodes: BTreeMap<NodeId, Node>,
    elements: [BTreeMap<ElementId, Element>; MAX_DIMENSION],
    change_level: u32,
    pending: RegionChanges,
    notifications: Vec<RegionChanges>,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_elements(&self, dimension: usize) -> usize {
        self.elements_of(dimension).map_or(0, BTreeMap::len)
    }

    /// Nodes in ascending identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Elements of `dimension` in ascending identifier order.
    pub fn elements(&self, dimension: usize) -> impl Iterator<Item = &Element> {
        self.elements_of(dimension).into_iter().flat_map(BTreeMap::values)
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldHandle, &FieldDefinition)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, def)| (FieldHandle(i), def))
    }

    /// Current nesting depth of change brackets.
    #[inline]
    pub fn change_level(&self) -> u32 {
        self.change_level
    }

    /// Drains the published change batches, oldest first.
    pub fn take_notifications(&mut self) -> Vec<RegionChanges> {
        std::mem::take(&mut self.notifications)
    }

    /// Records that `face` lies on the boundary of `parent`.
    ///
    /// # Errors
    /// `MissingElement` if either element is absent; `InvalidArgument` unless
    /// the face has lower dimension than the parent.
    pub fn add_element_face(&mut self, parent: ElementKey, face: ElementKey) -> Result<(), MeshError> {
        if !self.contains_element(parent) {
            return Err(MeshError::MissingElement(parent));
        }
        if face.dimension >= parent.dimension {
            return Err(MeshError::invalid_argument(format!(
                "face {face} must have lower dimension than parent {parent}"
            )));
        }
        let element = self
            .elements_of_mut(face.dimension)
            .and_then(|m| m.get_mut(&face.id))
            .ok_or(MeshError::MissingElement(face))?;
        element.add_parent(parent);
        Ok(())
    }

    fn elements_of(&self, dimension: usize) -> Option<&BTreeMap<ElementId, Element>> {
        dimension
            .checked_sub(1)
            .and_then(|d| self.elements.get(d))
    }

    fn elements_of_mut(&mut self, dimension: usize) -> Option<&mut BTreeMap<ElementId, Element>> {
        dimension
            .checked_sub(1)
            .and_then(|d| self.elements.get_mut(d))
    }

    fn check_field(&self, field: FieldHandle) -> Result<&FieldDefinition, MeshError> {
        self.fields
            .get(field.index())
            .ok_or_else(|| MeshError::UnknownField(format!("#{} in region `{}`", field.index(), self.name)))
    }

    fn record(&mut self, change: impl FnOnce(&mut RegionChanges)) {
        change(&mut self.pending);
        if self.change_level == 0 {
            self.publish();
        }
    }

    fn publish(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.debug_assert_invariants();
        let batch = std::mem::take(&mut self.pending);
        log::trace!(
            "region `{}`: published {} nodes, {} elements, {} fields",
            self.name,
            batch.nodes_added.len(),
            batch.elements_added.len(),
            batch.fields_defined.len()
        );
        self.notifications.push(batch);
    }
}

impl MeshQuery for Region {
    fn for_each_element_of_dimension(
        &self,
        dimension: usize,
        visitor: &mut dyn FnMut(&Element) -> Result<(), MeshError>,
    ) -> Result<(), MeshError> {
        for element in self.elements(dimension) {
            visitor(element)?;
        }
        Ok(())
    }

    fn element(&self, key: ElementKey) -> Option<&Element> {
        self.elements_of(key.dimension)?.get(&key.id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn next_free_node_identifier(&self, hint: NodeId) -> Result<NodeId, MeshError> {
        next_free(self.nodes.range(hint..).map(|(id, _)| *id), hint, NodeId::checked_next)
            .ok_or_else(|| MeshError::AllocationFailure("node identifiers exhausted".into()))
    }

    fn next_free_element_identifier(
        &self,
        dimension: usize,
        hint: ElementId,
    ) -> Result<ElementId, MeshError> {
        let Some(elements) = self.elements_of(dimension) else {
            return Err(MeshError::invalid_argument(format!(
                "no elements of dimension {dimension}"
            )));
        };
        next_free(elements.range(hint..).map(|(id, _)| *id), hint, ElementId::checked_next)
            .ok_or_else(|| MeshError::AllocationFailure(format!("{dimension}D element identifiers exhausted")))
    }

    fn is_element_within(&self, element: ElementKey, top_level: ElementKey) -> bool {
        if element == top_level {
            return self.contains_element(element);
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([element]);
        while let Some(key) = queue.pop_front() {
            let Some(current) = self.element(key) else {
                continue;
            };
            for parent in current.parents() {
                if *parent == top_level {
                    return true;
                }
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
        false
    }

    fn find_field_by_name(&self, name: &str) -> Option<FieldHandle> {
        self.fields
            .iter()
            .position(|def| def.name == name)
            .map(FieldHandle)
    }

    fn field_definition(&self, field: FieldHandle) -> Option<&FieldDefinition> {
        self.fields.get(field.index())
    }
}

impl MeshWriter for Region {
    fn define_field(&mut self, definition: FieldDefinition) -> Result<FieldHandle, MeshError> {
        if definition.name.is_empty() {
            return Err(MeshError::invalid_argument("field name must not be empty"));
        }
        if definition.number_of_components() == 0 {
            return Err(MeshError::invalid_argument(format!(
                "field `{}` must have at least one component",
                definition.name
            )));
        }
        if self.find_field_by_name(&definition.name).is_some() {
            return Err(MeshError::invalid_argument(format!(
                "field `{}` already exists in region `{}`",
                definition.name, self.name
            )));
        }
        let handle = FieldHandle(self.fields.len());
        self.fields.push(definition);
        self.record(|c| c.fields_defined.push(handle));
        Ok(handle)
    }

    fn create_node(&self, id: NodeId, template: &NodeTemplate) -> Result<Node, MeshError> {
        for layout in &template.fields {
            let def = self.check_field(layout.field)?;
            if def.number_of_components() != layout.number_of_components {
                return Err(MeshError::invalid_argument(format!(
                    "node template gives field `{}` {} components, region defines {}",
                    def.name,
                    layout.number_of_components,
                    def.number_of_components()
                )));
            }
        }
        Ok(Node::from_template(id, template))
    }

    fn merge_node(&mut self, node: Node) -> Result<NodeId, MeshError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(MeshError::merge_failure(format!(
                "node {id} already exists in region `{}`",
                self.name
            )));
        }
        for (field, _) in node.fields() {
            self.check_field(*field)
                .map_err(|e| MeshError::merge_failure(format!("node {id}: {e}")))?;
        }
        self.nodes.insert(id, node);
        self.record(|c| c.nodes_added.push(id));
        Ok(id)
    }

    fn create_element(&self, id: ElementId, template: &ElementTemplate) -> Result<Element, MeshError> {
        let dimension = template.shape.dimension();
        for (field, basis) in &template.fields {
            self.check_field(*field)?;
            if basis.number_of_nodes(dimension) != template.number_of_nodes {
                return Err(MeshError::invalid_argument(format!(
                    "{basis:?} needs {} nodes in {dimension}D, template has {}",
                    basis.number_of_nodes(dimension),
                    template.number_of_nodes
                )));
            }
        }
        Ok(Element::from_template(id, template))
    }

    fn merge_element(&mut self, element: Element) -> Result<ElementKey, MeshError> {
        let key = element.key();
        let Some(existing) = self.elements_of(key.dimension) else {
            return Err(MeshError::merge_failure(format!("element {key}: unsupported dimension")));
        };
        if existing.contains_key(&key.id) {
            return Err(MeshError::merge_failure(format!(
                "element {key} already exists in region `{}`",
                self.name
            )));
        }
        for (local, slot) in element.nodes().iter().enumerate() {
            let id = slot.ok_or_else(|| {
                MeshError::merge_failure(format!("element {key}: local node {local} not set"))
            })?;
            let node = self
                .nodes
                .get(&id)
                .ok_or_else(|| MeshError::merge_failure(format!("element {key}: node {id} missing")))?;
            for field in element.fields() {
                let Some(basis) = element.basis(field) else { continue };
                let expected = basis.parameters_per_node(key.dimension);
                let stored = node.field_values(field).map(|v| v.value_types().len());
                if stored.is_none_or(|n| n < expected) {
                    return Err(MeshError::merge_failure(format!(
                        "element {key}: node {id} lacks {expected} parameters for field #{}",
                        field.index()
                    )));
                }
            }
        }
        if let Some(elements) = self.elements_of_mut(key.dimension) {
            elements.insert(key.id, element);
        }
        self.record(|c| c.elements_added.push(key));
        Ok(key)
    }

    fn begin_change(&mut self) {
        self.change_level += 1;
    }

    fn end_change(&mut self) {
        match self.change_level {
            0 => log::warn!("region `{}`: end_change without matching begin_change", self.name),
            1 => {
                self.change_level = 0;
                self.publish();
            }
            _ => self.change_level -= 1,
        }
    }
}

impl DebugInvariants for Region {
    const LABEL: &'static str = "Region";

    fn validate_invariants(&self) -> Result<(), MeshError> {
        for element in self.elements.iter().flat_map(BTreeMap::values) {
            for slot in element.nodes() {
                match slot {
                    Some(id) if self.nodes.contains_key(id) => {}
                    Some(id) => return Err(MeshError::MissingNode(*id)),
                    None => {
                        return Err(MeshError::merge_failure(format!(
                            "element {} has an unset node",
                            element.key()
                        )));
                    }
                }
            }
            for parent in element.parents() {
                if parent.dimension <= element.dimension() || !self.contains_element(*parent) {
                    return Err(MeshError::MissingElement(*parent));
                }
            }
            for field in element.fields() {
                self.check_field(field)?;
            }
        }
        for node in self.nodes.values() {
            for (field, _) in node.fields() {
                self.check_field(*field)?;
            }
        }
        Ok(())
    }
}

/// First identifier at or above `hint` missing from the ascending `used` run.
fn next_free<I: Copy + PartialEq>(
    used: impl Iterator<Item = I>,
    hint: I,
    next: impl Fn(I) -> Option<I>,
) -> Option<I> {
    let mut candidate = hint;
    for id in used {
        if id != candidate {
            break;
        }
        candidate = next(candidate)?;
    }
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::basis::Basis;
    use crate::data::template::NodeValueType;
    use crate::topology::cell_type::ElementShape;

    fn nid(raw: u64) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    fn eid(raw: u64) -> ElementId {
        ElementId::new(raw).unwrap()
    }

    fn region_with_line() -> (Region, FieldHandle) {
        let mut region = Region::new("test");
        let field = region
            .define_field(FieldDefinition::coordinates("coordinates", 1))
            .unwrap();
        let mut nt = NodeTemplate::new();
        nt.define_field(field, 1, &[NodeValueType::Value]);
        for (raw, x) in [(1, 0.0), (2, 1.0)] {
            let mut node = region.create_node(nid(raw), &nt).unwrap();
            node.set_values(field, &[x]).unwrap();
            region.merge_node(node).unwrap();
        }
        let mut et = ElementTemplate::new(ElementShape::Line, 2);
        et.define_field(field, Basis::LinearLagrange);
        let mut element = region.create_element(eid(1), &et).unwrap();
        element.set_node(0, nid(1)).unwrap();
        element.set_node(1, nid(2)).unwrap();
        region.merge_element(element).unwrap();
        (region, field)
    }

    #[test]
    fn identifier_scan_skips_used_run() {
        let (region, _) = region_with_line();
        assert_eq!(region.next_free_node_identifier(nid(1)).unwrap(), nid(3));
        assert_eq!(region.next_free_node_identifier(nid(2)).unwrap(), nid(3));
        assert_eq!(region.next_free_node_identifier(nid(7)).unwrap(), nid(7));
        assert_eq!(region.next_free_element_identifier(1, eid(1)).unwrap(), eid(2));
        assert_eq!(region.next_free_element_identifier(3, eid(1)).unwrap(), eid(1));
        assert!(region.next_free_element_identifier(4, eid(1)).is_err());
    }

    #[test]
    fn merge_rejects_collisions_and_unset_nodes() {
        let (mut region, field) = region_with_line();
        let mut nt = NodeTemplate::new();
        nt.define_field(field, 1, &[NodeValueType::Value]);
        let dup = region.create_node(nid(1), &nt).unwrap();
        assert!(matches!(region.merge_node(dup), Err(MeshError::MergeFailure(_))));

        let mut et = ElementTemplate::new(ElementShape::Line, 2);
        et.define_field(field, Basis::LinearLagrange);
        let mut partial = region.create_element(eid(2), &et).unwrap();
        partial.set_node(0, nid(1)).unwrap();
        assert!(matches!(region.merge_element(partial), Err(MeshError::MergeFailure(_))));

        let mut dangling = region.create_element(eid(2), &et).unwrap();
        dangling.set_node(0, nid(1)).unwrap();
        dangling.set_node(1, nid(99)).unwrap();
        assert!(matches!(region.merge_element(dangling), Err(MeshError::MergeFailure(_))));
    }

    #[test]
    fn hermite_element_needs_derivative_parameters() {
        let (mut region, field) = region_with_line();
        let mut et = ElementTemplate::new(ElementShape::Line, 2);
        et.define_field(field, Basis::CubicHermite);
        let mut element = region.create_element(eid(5), &et).unwrap();
        element.set_node(0, nid(1)).unwrap();
        element.set_node(1, nid(2)).unwrap();
        assert!(matches!(region.merge_element(element), Err(MeshError::MergeFailure(_))));
    }

    #[test]
    fn change_brackets_batch_notifications() {
        let (mut region, _) = region_with_line();
        // field + 2 nodes + 1 element, each outside a bracket
        assert_eq!(region.take_notifications().len(), 4);

        region.begin_change();
        region.begin_change();
        let f = region.define_field(FieldDefinition::new("a", 1)).unwrap();
        region.end_change();
        assert!(region.take_notifications().is_empty());
        let g = region.define_field(FieldDefinition::new("b", 2)).unwrap();
        region.end_change();
        let batches = region.take_notifications();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].fields_defined, vec![f, g]);

        region.end_change();
        assert_eq!(region.change_level(), 0);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let (mut region, field) = region_with_line();
        assert_eq!(region.find_field_by_name("coordinates"), Some(field));
        assert!(region
            .define_field(FieldDefinition::new("coordinates", 3))
            .is_err());
        assert!(region.define_field(FieldDefinition::new("empty", 0)).is_err());
    }

    #[test]
    fn faces_are_within_their_parents() {
        let mut region = Region::new("faces");
        let square = Element::from_template(eid(1), &ElementTemplate::new(ElementShape::Square, 0));
        let line = Element::from_template(eid(1), &ElementTemplate::new(ElementShape::Line, 0));
        let other = Element::from_template(eid(2), &ElementTemplate::new(ElementShape::Square, 0));
        let sq = region.merge_element(square).unwrap();
        let ln = region.merge_element(line).unwrap();
        let ot = region.merge_element(other).unwrap();
        region.add_element_face(sq, ln).unwrap();

        assert!(region.is_element_within(ln, sq));
        assert!(region.is_element_within(sq, sq));
        assert!(!region.is_element_within(ln, ot));
        assert!(!region.is_element_within(sq, ln));
        assert!(region.add_element_face(ln, sq).is_err());
        region.validate_invariants().unwrap();
    }
}
