//! Resample fields from a source mesh onto a new regular destination mesh.
//!
//! [`convert`] visits every source element of the mode's dimension, divides
//! it into `refinement[0] × refinement[1] (× refinement[2])` subelements and
//! creates one destination element per subelement. Destination node values
//! are obtained by evaluating each source field at the subelement's local
//! node positions (see [`ConversionMode::local_node_xi`]).
//!
//! - **Hermite bicubic**: every destination element gets four fresh nodes.
//!   Field values carry first derivatives scaled by the subelement size; the
//!   cross derivative d2/ds1ds2 is set to zero since it cannot be recovered
//!   from first derivatives.
//! - **Trilinear / triquadratic**: nodes are shared. A sample point whose
//!   primary (first) field value lies within `tolerance` of an existing
//!   destination node reuses that node; otherwise a new node is created with
//!   every field's value and indexed in an octree. Reused nodes keep the
//!   values they were created with.
//!
//! All destination mutations happen inside a single change bracket. The
//! first failure aborts the conversion; whatever was merged before it stays
//! in the destination mesh and the bracket still closes.

use crate::algs::field_eval::{FieldEvaluator, MeshLocation};
use crate::algs::id_allocator::{ElementIdentifierAllocator, NodeIdentifierAllocator};
use crate::algs::refinement_tables::{ConversionMode, subelement_count, subelement_offset};
use crate::algs::spatial_index::{Octree, OctreeConfig};
use crate::data::field::{FieldDefinition, FieldHandle, FieldKind};
use crate::data::template::{ElementTemplate, NodeTemplate};
use crate::mesh_error::MeshError;
use crate::topology::element::Element;
use crate::topology::id::{ElementId, NodeId};
use crate::topology::mesh::{ChangeCache, MeshQuery, MeshWriter};
use serde::{Deserialize, Serialize};

/// Components the primary field must have in the volumetric modes.
const VOLUMETRIC_PRIMARY_COMPONENTS: usize = 3;

/// Parameters of one conversion run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub mode: ConversionMode,
    /// Subdivisions along each xi axis; only the first `mode.dimension()`
    /// entries are used.
    pub refinement: [usize; 3],
    /// Distance below which sample points share a destination node.
    pub tolerance: f64,
    /// First node identifier tried in the destination.
    pub node_identifier_start: u64,
    /// First element identifier tried in the destination.
    pub element_identifier_start: u64,
    pub octree: OctreeConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::default(),
            refinement: [1, 1, 1],
            tolerance: 1.0e-6,
            node_identifier_start: 1,
            element_identifier_start: 1,
            octree: OctreeConfig::default(),
        }
    }
}

impl ConversionConfig {
    pub fn new(mode: ConversionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_refinement(mut self, refinement: [usize; 3]) -> Self {
        self.refinement = refinement;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_identifier_starts(mut self, node: u64, element: u64) -> Self {
        self.node_identifier_start = node;
        self.element_identifier_start = element;
        self
    }
}

/// Summary of a completed conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Destination field for each source field, in input order.
    pub destination_fields: Vec<FieldHandle>,
    pub source_elements: usize,
    pub elements_created: usize,
    pub nodes_created: usize,
    /// Sample points resolved to an already created node.
    pub nodes_reused: usize,
}

/// Convert `fields` on `source` into new elements and nodes in `destination`.
///
/// `fields[0]` is the primary (coordinate) field. Source elements whose
/// dimension differs from `config.mode.dimension()` are ignored.
///
/// # Errors
/// - `InvalidArgument` for an empty field list, negative or non-finite
///   tolerance, zero or missing refinement counts, a primary field without
///   exactly 3 components in a volumetric mode, zero identifier starts, or a
///   destination field of the same name with a different component count.
///   Nothing is modified in these cases.
/// - Any evaluation, allocation or merge error met while converting; the
///   conversion stops there.
pub fn convert<S, W>(
    source: &S,
    fields: &[&dyn FieldEvaluator],
    destination: &mut W,
    config: &ConversionConfig,
) -> Result<ConversionReport, MeshError>
where
    S: MeshQuery + ?Sized,
    W: MeshWriter + ?Sized,
{
    validate(fields, &*destination, config)?;
    let mode = config.mode;
    log::debug!(
        "converting {} field(s) with {:?}, refinement {:?}, tolerance {}",
        fields.len(),
        mode,
        &config.refinement[..mode.dimension()],
        config.tolerance
    );

    let handles = define_destination_fields(destination, fields)?;
    let (node_template, element_template) = build_templates(mode, fields, &handles);

    let mut converter = Converter {
        mode,
        refinement: &config.refinement[..mode.dimension()],
        tolerance: config.tolerance,
        fields,
        handles: &handles,
        node_template,
        element_template,
        node_ids: NodeIdentifierAllocator::new(NodeId::new(config.node_identifier_start)?),
        element_ids: ElementIdentifierAllocator::new(
            mode.dimension(),
            ElementId::new(config.element_identifier_start)?,
        ),
        octree: Octree::with_config(config.octree),
        report: ConversionReport::default(),
    };

    let result = {
        let mut mesh = ChangeCache::new(destination);
        source.for_each_element_of_dimension(mode.dimension(), &mut |element| {
            converter.convert_element(&mut *mesh, element)
        })
    };
    if let Err(e) = result {
        log::warn!(
            "conversion aborted after {} element(s): {e}",
            converter.report.source_elements
        );
        return Err(e);
    }

    let mut report = converter.report;
    report.destination_fields = handles;
    log::debug!(
        "converted {} source element(s) into {} element(s), {} node(s) created, {} reused",
        report.source_elements,
        report.elements_created,
        report.nodes_created,
        report.nodes_reused
    );
    Ok(report)
}

fn validate<W: MeshQuery + ?Sized>(
    fields: &[&dyn FieldEvaluator],
    destination: &W,
    config: &ConversionConfig,
) -> Result<(), MeshError> {
    let primary = fields
        .first()
        .ok_or_else(|| MeshError::invalid_argument("at least one field is required"))?;
    if !(config.tolerance >= 0.0 && config.tolerance.is_finite()) {
        return Err(MeshError::invalid_argument(format!(
            "tolerance must be finite and non-negative, got {}",
            config.tolerance
        )));
    }
    subelement_count(config.mode, &config.refinement)?;
    if config.mode.shares_nodes() && primary.number_of_components() != VOLUMETRIC_PRIMARY_COMPONENTS {
        return Err(MeshError::invalid_argument(format!(
            "{:?} needs a {VOLUMETRIC_PRIMARY_COMPONENTS}-component primary field, `{}` has {}",
            config.mode,
            primary.name(),
            primary.number_of_components()
        )));
    }
    if config.node_identifier_start == 0 || config.element_identifier_start == 0 {
        return Err(MeshError::invalid_argument("identifier starts must be positive"));
    }
    for field in fields {
        if field.number_of_components() == 0 {
            return Err(MeshError::invalid_argument(format!(
                "field `{}` has no components",
                field.name()
            )));
        }
        if let Some(existing) = destination
            .find_field_by_name(field.name())
            .and_then(|h| destination.field_definition(h))
        {
            if existing.number_of_components() != field.number_of_components() {
                return Err(MeshError::invalid_argument(format!(
                    "destination field `{}` has {} components, source has {}",
                    field.name(),
                    existing.number_of_components(),
                    field.number_of_components()
                )));
            }
        }
    }
    Ok(())
}

/// One destination field per source field: the first is the coordinate
/// field, the others keep the source's kind (or become general fields).
fn define_destination_fields<W: MeshWriter + ?Sized>(
    destination: &mut W,
    fields: &[&dyn FieldEvaluator],
) -> Result<Vec<FieldHandle>, MeshError> {
    let mut handles = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        if let Some(existing) = destination.find_field_by_name(field.name()) {
            log::warn!("reusing existing destination field `{}`", field.name());
            handles.push(existing);
            continue;
        }
        let kind = if index == 0 {
            FieldKind::Coordinate
        } else {
            field.kind_hint().unwrap_or(FieldKind::General)
        };
        let mut names = field.component_names();
        names.resize_with(field.number_of_components(), String::new);
        for (c, name) in names.iter_mut().enumerate() {
            if name.is_empty() {
                *name = (c + 1).to_string();
            }
        }
        let definition = FieldDefinition::new(field.name(), field.number_of_components())
            .with_kind(kind)
            .with_coordinate_system(field.coordinate_system())
            .with_component_names(names);
        handles.push(destination.define_field(definition)?);
    }
    Ok(handles)
}

fn build_templates(
    mode: ConversionMode,
    fields: &[&dyn FieldEvaluator],
    handles: &[FieldHandle],
) -> (NodeTemplate, ElementTemplate) {
    let mut node_template = NodeTemplate::new();
    let mut element_template = ElementTemplate::new(mode.shape(), mode.number_of_local_nodes());
    for (field, handle) in fields.iter().zip(handles) {
        node_template.define_field(*handle, field.number_of_components(), mode.node_value_types());
        element_template.define_field(*handle, mode.basis());
    }
    (node_template, element_template)
}

struct Converter<'a> {
    mode: ConversionMode,
    refinement: &'a [usize],
    tolerance: f64,
    fields: &'a [&'a dyn FieldEvaluator],
    handles: &'a [FieldHandle],
    node_template: NodeTemplate,
    element_template: ElementTemplate,
    node_ids: NodeIdentifierAllocator,
    element_ids: ElementIdentifierAllocator,
    octree: Octree<NodeId>,
    report: ConversionReport,
}

impl Converter<'_> {
    fn convert_element<W: MeshWriter + ?Sized>(&mut self, mesh: &mut W, element: &Element) -> Result<(), MeshError> {
        let dimension = self.mode.dimension();
        let subelements = subelement_count(self.mode, self.refinement)?;
        log::trace!("converting source element {} into {subelements} subelement(s)", element.key());

        let mut xi = vec![0.0; dimension];
        let mut local_nodes = Vec::with_capacity(self.mode.number_of_local_nodes());
        for s in 0..subelements {
            let offset = subelement_offset(self.mode, self.refinement, s)?;
            local_nodes.clear();
            for local_xi in self.mode.local_node_xi() {
                for d in 0..dimension {
                    xi[d] = (offset[d] as f64 + local_xi[d]) / self.refinement[d] as f64;
                }
                let location = MeshLocation::new(element, &xi);
                let node = match self.mode {
                    ConversionMode::HermiteBicubic => self.hermite_node(mesh, &location)?,
                    ConversionMode::Trilinear | ConversionMode::Triquadratic => {
                        self.shared_node(mesh, &location)?
                    }
                };
                local_nodes.push(node);
            }

            let id = self.element_ids.next(&*mesh)?;
            let mut new_element = mesh.create_element(id, &self.element_template)?;
            for (local, node) in local_nodes.iter().enumerate() {
                mesh.set_element_node(&mut new_element, local, *node)?;
            }
            mesh.merge_element(new_element)?;
            self.report.elements_created += 1;
        }
        self.report.source_elements += 1;
        Ok(())
    }

    /// A fresh node carrying value, scaled first derivatives and a zero
    /// cross derivative for every field.
    fn hermite_node<W: MeshWriter + ?Sized>(&mut self, mesh: &mut W, location: &MeshLocation<'_>) -> Result<NodeId, MeshError> {
        let delta_xi: Vec<f64> = self.refinement.iter().map(|&n| 1.0 / n as f64).collect();
        let id = self.node_ids.next(&*mesh)?;
        let mut node = mesh.create_node(id, &self.node_template)?;
        for (field, handle) in self.fields.iter().zip(self.handles) {
            let evaluated = field.evaluate_with_derivatives(location)?;
            let dimension = self.mode.dimension();
            check_output(*field, location, evaluated.values.len())?;
            if evaluated.dimension != dimension
                || evaluated.derivatives.len() != evaluated.values.len() * dimension
            {
                return Err(evaluation_failure(
                    *field,
                    location,
                    format!(
                        "returned {} derivatives for {dimension} xi directions, expected {}",
                        evaluated.derivatives.len(),
                        evaluated.values.len() * dimension
                    ),
                ));
            }
            let mut parameters = Vec::with_capacity(evaluated.values.len() * 4);
            for (c, value) in evaluated.values.iter().enumerate() {
                parameters.push(*value);
                parameters.push(evaluated.derivative(c, 0) * delta_xi[0]);
                parameters.push(evaluated.derivative(c, 1) * delta_xi[1]);
                parameters.push(0.0);
            }
            mesh.set_node_field_values(&mut node, *handle, &parameters)?;
        }
        let id = mesh.merge_node(node)?;
        self.report.nodes_created += 1;
        Ok(id)
    }

    /// The node at `location`'s primary field value: an existing one within
    /// tolerance, or a new one holding every field's value.
    fn shared_node<W: MeshWriter + ?Sized>(&mut self, mesh: &mut W, location: &MeshLocation<'_>) -> Result<NodeId, MeshError> {
        let values = self
            .fields
            .iter()
            .map(|field| {
                let values = field.evaluate(location)?;
                check_output(*field, location, values.len())?;
                Ok(values)
            })
            .collect::<Result<Vec<_>, MeshError>>()?;
        let primary = &values[0];
        let key = [primary[0], primary[1], primary[2]];
        if key.iter().any(|c| !c.is_finite()) {
            return Err(evaluation_failure(
                self.fields[0],
                location,
                format!("degenerate coordinates {key:?}"),
            ));
        }
        if let Some(&existing) = self.octree.find_nearest_within(&key, self.tolerance) {
            self.report.nodes_reused += 1;
            return Ok(existing);
        }

        let id = self.node_ids.next(&*mesh)?;
        let mut node = mesh.create_node(id, &self.node_template)?;
        for (handle, value) in self.handles.iter().zip(&values) {
            mesh.set_node_field_values(&mut node, *handle, value)?;
        }
        let id = mesh.merge_node(node)?;
        self.octree.insert(key, id)?;
        self.report.nodes_created += 1;
        Ok(id)
    }
}

fn evaluation_failure(field: &dyn FieldEvaluator, location: &MeshLocation<'_>, message: String) -> MeshError {
    MeshError::EvaluationFailure {
        field: field.name().to_string(),
        element: location.element.key(),
        message,
    }
}

/// Rejects output whose length disagrees with the declared component count.
fn check_output(field: &dyn FieldEvaluator, location: &MeshLocation<'_>, returned: usize) -> Result<(), MeshError> {
    if returned == field.number_of_components() {
        Ok(())
    } else {
        Err(evaluation_failure(
            field,
            location,
            format!(
                "returned {returned} values, expected {}",
                field.number_of_components()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::field_eval::{EvaluatedField, FnFieldEvaluator, RegionFieldEvaluator};
    use crate::algs::meshgen::generate_line_shaped_mesh;
    use crate::topology::region::Region;

    fn unit_cube() -> (Region, FieldHandle) {
        let mut region = Region::new("source");
        let field =
            generate_line_shaped_mesh(&mut region, &[1, 1, 1], &[0.0; 3], &[1.0; 3], "coordinates")
                .unwrap();
        (region, field)
    }

    #[test]
    fn rejects_invalid_arguments_without_mutation() {
        let (source, field) = unit_cube();
        let coords = RegionFieldEvaluator::new(&source, field).unwrap();
        let scalar = FnFieldEvaluator::new("s", 1, |_| Ok(vec![0.0]));
        let mut dest = Region::new("dest");

        let cases = [
            (vec![], ConversionConfig::default()),
            (vec![&coords as &dyn FieldEvaluator], ConversionConfig::default().with_tolerance(-1.0)),
            (vec![&coords as &dyn FieldEvaluator], ConversionConfig::default().with_tolerance(f64::NAN)),
            (vec![&coords as &dyn FieldEvaluator], ConversionConfig::default().with_refinement([1, 0, 1])),
            (vec![&scalar as &dyn FieldEvaluator], ConversionConfig::default()),
            (vec![&coords as &dyn FieldEvaluator], ConversionConfig::default().with_identifier_starts(0, 1)),
        ];
        for (fields, config) in cases {
            let err = convert(&source, &fields, &mut dest, &config).unwrap_err();
            assert!(matches!(err, MeshError::InvalidArgument(_)), "{err}");
        }
        assert_eq!(dest.fields().count(), 0);
        assert!(dest.take_notifications().is_empty());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ConversionConfig::new(ConversionMode::Triquadratic)
            .with_refinement([2, 3, 4])
            .with_tolerance(1e-3);
        let json = serde_json::to_string(&config).unwrap();
        let back: ConversionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        let partial: ConversionConfig = serde_json::from_str(r#"{"mode":"HermiteBicubic"}"#).unwrap();
        assert_eq!(partial.refinement, [1, 1, 1]);
        assert_eq!(partial.mode, ConversionMode::HermiteBicubic);
    }

    #[test]
    fn one_change_batch_for_the_elements() {
        let (source, field) = unit_cube();
        let coords = RegionFieldEvaluator::new(&source, field).unwrap();
        let mut dest = Region::new("dest");
        let report = convert(&source, &[&coords], &mut dest, &ConversionConfig::default()).unwrap();
        assert_eq!(report.elements_created, 1);
        assert_eq!(report.nodes_created, 8);
        let batches = dest.take_notifications();
        // field definition, then the bracketed conversion
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].elements_added.len(), 1);
        assert_eq!(batches[1].nodes_added.len(), 8);
        assert_eq!(dest.change_level(), 0);
    }

    #[test]
    fn evaluation_failure_aborts_and_closes_bracket() {
        let (source, field) = unit_cube();
        let coords = RegionFieldEvaluator::new(&source, field).unwrap();
        let failing = FnFieldEvaluator::new("broken", 1, |loc| {
            if loc.xi[2] > 0.5 {
                Err(MeshError::EvaluationFailure {
                    field: "broken".into(),
                    element: loc.element.key(),
                    message: "undefined".into(),
                })
            } else {
                Ok(vec![1.0])
            }
        });
        let mut dest = Region::new("dest");
        let config = ConversionConfig::default().with_refinement([1, 1, 2]);
        let err = convert(&source, &[&coords, &failing], &mut dest, &config).unwrap_err();
        assert!(matches!(err, MeshError::EvaluationFailure { .. }));
        assert_eq!(dest.change_level(), 0);
        // the first subelement was merged before the failure
        assert_eq!(dest.number_of_elements(3), 1);
    }

    /// Declares three components but returns short output.
    struct ShortEvaluator;

    impl FieldEvaluator for ShortEvaluator {
        fn name(&self) -> &str {
            "short"
        }

        fn number_of_components(&self) -> usize {
            3
        }

        fn evaluate(&self, _location: &MeshLocation<'_>) -> Result<Vec<f64>, MeshError> {
            Ok(vec![0.0; 2])
        }

        fn evaluate_with_derivatives(&self, _location: &MeshLocation<'_>) -> Result<EvaluatedField, MeshError> {
            Ok(EvaluatedField {
                values: vec![0.0; 3],
                derivatives: vec![0.0; 2],
                dimension: 2,
            })
        }
    }

    #[test]
    fn short_evaluator_output_is_an_evaluation_failure() {
        let (source, _) = unit_cube();
        let mut dest = Region::new("dest");
        let err = convert(&source, &[&ShortEvaluator], &mut dest, &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, MeshError::EvaluationFailure { ref field, .. } if field == "short"), "{err}");
        assert_eq!(dest.number_of_nodes(), 0);
        assert_eq!(dest.change_level(), 0);

        let mut square = Region::new("square");
        generate_line_shaped_mesh(&mut square, &[1, 1], &[0.0; 2], &[1.0; 2], "coordinates").unwrap();
        let mut dest = Region::new("dest");
        let config = ConversionConfig::new(ConversionMode::HermiteBicubic);
        let err = convert(&square, &[&ShortEvaluator], &mut dest, &config).unwrap_err();
        assert!(matches!(err, MeshError::EvaluationFailure { .. }), "{err}");
        assert_eq!(dest.number_of_nodes(), 0);
    }
}
