//! Field evaluation at mesh locations.
//!
//! [`FieldEvaluator`] is the only way the conversion engine and the
//! selection structures read field values. Two implementations ship with
//! the crate:
//! - [`RegionFieldEvaluator`] interpolates a field stored on a mesh through
//!   each element's basis and node parameters;
//! - [`FnFieldEvaluator`] wraps closures, for analytic or computed fields.

use crate::data::field::{CoordinateSystem, FieldDefinition, FieldHandle, FieldKind};
use crate::data::template::NodeValueType;
use crate::mesh_error::MeshError;
use crate::topology::element::Element;
use crate::topology::mesh::MeshQuery;

/// An element plus local (xi) coordinates within it.
#[derive(Clone, Copy, Debug)]
pub struct MeshLocation<'a> {
    pub element: &'a Element,
    pub xi: &'a [f64],
}

impl<'a> MeshLocation<'a> {
    pub fn new(element: &'a Element, xi: &'a [f64]) -> Self {
        Self { element, xi }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.element.dimension()
    }
}

/// Field values with first derivatives with respect to xi.
///
/// `derivatives[c * dimension + k]` is d(component c)/d(xi k+1).
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatedField {
    pub values: Vec<f64>,
    pub derivatives: Vec<f64>,
    pub dimension: usize,
}

impl EvaluatedField {
    #[inline]
    pub fn derivative(&self, component: usize, xi_direction: usize) -> f64 {
        self.derivatives[component * self.dimension + xi_direction]
    }
}

/// Something that can be evaluated at a mesh location.
pub trait FieldEvaluator {
    fn name(&self) -> &str;

    fn number_of_components(&self) -> usize;

    fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem::RectangularCartesian
    }

    fn component_names(&self) -> Vec<String> {
        (1..=self.number_of_components())
            .map(|c| c.to_string())
            .collect()
    }

    /// Role the field plays, when the evaluator knows it.
    fn kind_hint(&self) -> Option<FieldKind> {
        None
    }

    fn evaluate(&self, location: &MeshLocation<'_>) -> Result<Vec<f64>, MeshError>;

    fn evaluate_with_derivatives(&self, location: &MeshLocation<'_>) -> Result<EvaluatedField, MeshError>;
}

fn failure(field: &str, location: &MeshLocation<'_>, message: impl Into<String>) -> MeshError {
    MeshError::EvaluationFailure {
        field: field.to_string(),
        element: location.element.key(),
        message: message.into(),
    }
}

fn check_xi(field: &str, location: &MeshLocation<'_>) -> Result<(), MeshError> {
    if location.xi.len() != location.dimension() {
        return Err(failure(
            field,
            location,
            format!(
                "expected {} xi coordinates, got {}",
                location.dimension(),
                location.xi.len()
            ),
        ));
    }
    if location.xi.iter().any(|x| !x.is_finite()) {
        return Err(failure(field, location, "non-finite xi"));
    }
    Ok(())
}

/// Evaluates a field stored on a mesh by interpolating node parameters.
pub struct RegionFieldEvaluator<'a, M: MeshQuery + ?Sized> {
    mesh: &'a M,
    field: FieldHandle,
    definition: &'a FieldDefinition,
}

impl<'a, M: MeshQuery + ?Sized> RegionFieldEvaluator<'a, M> {
    /// # Errors
    /// `UnknownField` if `field` is not defined on `mesh`.
    pub fn new(mesh: &'a M, field: FieldHandle) -> Result<Self, MeshError> {
        let definition = mesh
            .field_definition(field)
            .ok_or_else(|| MeshError::UnknownField(format!("#{}", field.index())))?;
        Ok(Self {
            mesh,
            field,
            definition,
        })
    }

    /// Looks the field up by name.
    pub fn by_name(mesh: &'a M, name: &str) -> Result<Self, MeshError> {
        let field = mesh
            .find_field_by_name(name)
            .ok_or_else(|| MeshError::UnknownField(name.to_string()))?;
        Self::new(mesh, field)
    }

    #[inline]
    pub fn field(&self) -> FieldHandle {
        self.field
    }

    fn interpolate(&self, location: &MeshLocation<'_>, with_derivatives: bool) -> Result<EvaluatedField, MeshError> {
        let name = self.definition.name.as_str();
        check_xi(name, location)?;
        let element = location.element;
        let dimension = element.dimension();
        let basis = element
            .basis(self.field)
            .ok_or_else(|| failure(name, location, "field not defined on element"))?;
        let components = self.definition.number_of_components();
        let per_node = basis.parameters_per_node(dimension);
        let value_types = &NodeValueType::hermite(3)[..per_node];

        let nodes = element.nodes();
        if nodes.len() != basis.number_of_nodes(dimension) {
            return Err(failure(name, location, "element node count does not match basis"));
        }
        // element parameters per component, in basis order
        let mut parameters = vec![Vec::with_capacity(nodes.len() * per_node); components];
        for (local, slot) in nodes.iter().enumerate() {
            let id = slot.ok_or_else(|| failure(name, location, format!("local node {local} not set")))?;
            let node = self
                .mesh
                .node(id)
                .ok_or_else(|| failure(name, location, format!("node {id} missing")))?;
            let stored = node
                .field_values(self.field)
                .ok_or_else(|| failure(name, location, format!("field not defined at node {id}")))?;
            for value_type in value_types {
                for (c, column) in parameters.iter_mut().enumerate() {
                    let parameter = stored.get(c, *value_type).ok_or_else(|| {
                        failure(name, location, format!("node {id} lacks {value_type:?}"))
                    })?;
                    column.push(parameter);
                }
            }
        }

        let mut values = Vec::with_capacity(components);
        let mut derivatives = Vec::with_capacity(if with_derivatives { components * dimension } else { 0 });
        for column in &parameters {
            if with_derivatives {
                let (value, d) = basis
                    .interpolate_with_derivatives(dimension, location.xi, column)
                    .map_err(|e| failure(name, location, e.to_string()))?;
                values.push(value);
                derivatives.extend(d);
            } else {
                let value = basis
                    .interpolate(dimension, location.xi, column)
                    .map_err(|e| failure(name, location, e.to_string()))?;
                values.push(value);
            }
        }
        Ok(EvaluatedField {
            values,
            derivatives,
            dimension,
        })
    }
}

impl<M: MeshQuery + ?Sized> FieldEvaluator for RegionFieldEvaluator<'_, M> {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn number_of_components(&self) -> usize {
        self.definition.number_of_components()
    }

    fn coordinate_system(&self) -> CoordinateSystem {
        self.definition.coordinate_system
    }

    fn component_names(&self) -> Vec<String> {
        self.definition.component_names.clone()
    }

    fn kind_hint(&self) -> Option<FieldKind> {
        Some(self.definition.kind)
    }

    fn evaluate(&self, location: &MeshLocation<'_>) -> Result<Vec<f64>, MeshError> {
        self.interpolate(location, false).map(|e| e.values)
    }

    fn evaluate_with_derivatives(&self, location: &MeshLocation<'_>) -> Result<EvaluatedField, MeshError> {
        self.interpolate(location, true)
    }
}

type ValueFn<'f> = dyn Fn(&MeshLocation<'_>) -> Result<Vec<f64>, MeshError> + 'f;
type DerivativeFn<'f> = dyn Fn(&MeshLocation<'_>) -> Result<Vec<f64>, MeshError> + 'f;

/// Step used for central-difference derivatives of closure fields.
const DIFFERENCE_STEP: f64 = 1.0e-6;

/// A field computed by closures of the mesh location.
///
/// Without a derivative closure, xi derivatives are estimated by central
/// differences, which evaluates the value closure slightly outside `[0, 1]`
/// at element boundaries.
pub struct FnFieldEvaluator<'f> {
    name: String,
    number_of_components: usize,
    kind: Option<FieldKind>,
    coordinate_system: CoordinateSystem,
    value: Box<ValueFn<'f>>,
    derivative: Option<Box<DerivativeFn<'f>>>,
}

impl<'f> FnFieldEvaluator<'f> {
    pub fn new(
        name: impl Into<String>,
        number_of_components: usize,
        value: impl Fn(&MeshLocation<'_>) -> Result<Vec<f64>, MeshError> + 'f,
    ) -> Self {
        Self {
            name: name.into(),
            number_of_components,
            kind: None,
            coordinate_system: CoordinateSystem::RectangularCartesian,
            value: Box::new(value),
            derivative: None,
        }
    }

    /// Supplies exact derivatives, laid out as in [`EvaluatedField`].
    pub fn with_derivatives(
        mut self,
        derivative: impl Fn(&MeshLocation<'_>) -> Result<Vec<f64>, MeshError> + 'f,
    ) -> Self {
        self.derivative = Some(Box::new(derivative));
        self
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self
    }

    fn checked_value(&self, location: &MeshLocation<'_>) -> Result<Vec<f64>, MeshError> {
        let values = (self.value)(location)?;
        if values.len() != self.number_of_components {
            return Err(failure(
                &self.name,
                location,
                format!("returned {} values, expected {}", values.len(), self.number_of_components),
            ));
        }
        Ok(values)
    }

    fn central_differences(&self, location: &MeshLocation<'_>) -> Result<Vec<f64>, MeshError> {
        let dimension = location.dimension();
        let mut derivatives = vec![0.0; self.number_of_components * dimension];
        let mut xi = location.xi.to_vec();
        for k in 0..dimension {
            let centre = xi[k];
            xi[k] = centre + DIFFERENCE_STEP;
            let plus = self.checked_value(&MeshLocation::new(location.element, &xi))?;
            xi[k] = centre - DIFFERENCE_STEP;
            let minus = self.checked_value(&MeshLocation::new(location.element, &xi))?;
            xi[k] = centre;
            for c in 0..self.number_of_components {
                derivatives[c * dimension + k] = (plus[c] - minus[c]) / (2.0 * DIFFERENCE_STEP);
            }
        }
        Ok(derivatives)
    }
}

impl FieldEvaluator for FnFieldEvaluator<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn number_of_components(&self) -> usize {
        self.number_of_components
    }

    fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    fn kind_hint(&self) -> Option<FieldKind> {
        self.kind
    }

    fn evaluate(&self, location: &MeshLocation<'_>) -> Result<Vec<f64>, MeshError> {
        check_xi(&self.name, location)?;
        self.checked_value(location)
    }

    fn evaluate_with_derivatives(&self, location: &MeshLocation<'_>) -> Result<EvaluatedField, MeshError> {
        let values = self.evaluate(location)?;
        let dimension = location.dimension();
        let derivatives = match &self.derivative {
            Some(derivative) => derivative(location)?,
            None => self.central_differences(location)?,
        };
        if derivatives.len() != self.number_of_components * dimension {
            return Err(failure(
                &self.name,
                location,
                format!("returned {} derivatives", derivatives.len()),
            ));
        }
        Ok(EvaluatedField {
            values,
            derivatives,
            dimension,
        })
    }
}
