//! Structured generators for line-shaped meshes.

use crate::algs::id_allocator::{ElementIdentifierAllocator, NodeIdentifierAllocator};
use crate::data::basis::{Basis, axis_indices};
use crate::data::field::{FieldDefinition, FieldHandle};
use crate::data::template::{ElementTemplate, NodeTemplate, NodeValueType};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementShape;
use crate::topology::id::{ElementId, NodeId};
use crate::topology::mesh::{ChangeCache, MeshWriter};

/// Components of the generated coordinate field; unused axes stay zero.
const COORDINATE_COMPONENTS: usize = 3;

fn invalid(message: impl Into<String>) -> MeshError {
    MeshError::InvalidArgument(message.into())
}

/// Generate a block of `counts[0] × counts[1] × ...` linear Lagrange elements
/// spanning `[min, max]`, with a 3-component coordinate field `field_name`.
///
/// The dimension is `counts.len()` (1 to 3). Nodes and elements take the
/// lowest free identifiers, numbered with x varying fastest. All additions
/// are published as one change batch.
pub fn generate_line_shaped_mesh<W: MeshWriter + ?Sized>(
    mesh: &mut W,
    counts: &[usize],
    min: &[f64],
    max: &[f64],
    field_name: &str,
) -> Result<FieldHandle, MeshError> {
    let dimension = counts.len();
    let shape = ElementShape::from_dimension(dimension)?;
    if min.len() != dimension || max.len() != dimension {
        return Err(invalid(format!(
            "min/max must have {dimension} entries, got {} and {}",
            min.len(),
            max.len()
        )));
    }
    if counts.iter().any(|&n| n == 0) {
        return Err(invalid("element counts must be positive"));
    }

    let mut mesh = ChangeCache::new(mesh);
    let field = mesh.define_field(FieldDefinition::coordinates(field_name, COORDINATE_COMPONENTS))?;

    let mut node_template = NodeTemplate::new();
    node_template.define_field(field, COORDINATE_COMPONENTS, &[NodeValueType::Value]);
    let mut element_template = ElementTemplate::new(shape, shape.number_of_vertices());
    element_template.define_field(field, Basis::LinearLagrange);

    let points: Vec<usize> = counts.iter().map(|n| n + 1).collect();
    let number_of_points: usize = points.iter().product();
    let mut node_ids = Vec::with_capacity(number_of_points);
    let mut node_alloc = NodeIdentifierAllocator::new(NodeId::new(1)?);
    for index in 0..number_of_points {
        let lattice = mixed_radix(index, &points);
        let mut position = [0.0; COORDINATE_COMPONENTS];
        for a in 0..dimension {
            let t = lattice[a] as f64 / counts[a] as f64;
            position[a] = min[a] + t * (max[a] - min[a]);
        }
        let id = node_alloc.next(&*mesh)?;
        let mut node = mesh.create_node(id, &node_template)?;
        mesh.set_node_field_values(&mut node, field, &position)?;
        node_ids.push(mesh.merge_node(node)?);
    }

    let number_of_elements: usize = counts.iter().product();
    let mut element_alloc = ElementIdentifierAllocator::new(dimension, ElementId::new(1)?);
    for index in 0..number_of_elements {
        let base = mixed_radix(index, counts);
        let id = element_alloc.next(&*mesh)?;
        let mut element = mesh.create_element(id, &element_template)?;
        for local in 0..shape.number_of_vertices() {
            let corner = axis_indices(local, 2, dimension);
            let mut flat = 0;
            for a in (0..dimension).rev() {
                flat = flat * points[a] + base[a] + corner[a];
            }
            mesh.set_element_node(&mut element, local, node_ids[flat])?;
        }
        mesh.merge_element(element)?;
    }
    log::debug!(
        "generated {number_of_elements} {dimension}D elements on {number_of_points} nodes"
    );
    Ok(field)
}

fn mixed_radix(mut index: usize, radices: &[usize]) -> Vec<usize> {
    radices
        .iter()
        .map(|&r| {
            let digit = index % r;
            index /= r;
            digit
        })
        .collect()
}
