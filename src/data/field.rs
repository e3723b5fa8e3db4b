//! Field definitions held by a region.
//!
//! A field is a scalar or vector quantity defined over a mesh. The region
//! only stores its metadata here; values live on nodes (see
//! [`crate::topology::node::Node`]) and are interpolated by the element basis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a field within the region that defined it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldHandle(pub(crate) usize);

impl FieldHandle {
    /// Position of the field in its region's field table.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Role of a field in the model.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Geometric coordinates.
    Coordinate,
    /// Material directions such as fibre angles.
    Anatomical,
    /// Anything else.
    #[default]
    General,
}

/// Coordinate system a field's components are expressed in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    #[default]
    RectangularCartesian,
    CylindricalPolar,
    SphericalPolar,
    ProlateSpheroidal { focus: f64 },
    OblateSpheroidal { focus: f64 },
    Fibre,
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSystem::RectangularCartesian => write!(f, "rectangular cartesian"),
            CoordinateSystem::CylindricalPolar => write!(f, "cylindrical polar"),
            CoordinateSystem::SphericalPolar => write!(f, "spherical polar"),
            CoordinateSystem::ProlateSpheroidal { focus } => {
                write!(f, "prolate spheroidal (focus {focus})")
            }
            CoordinateSystem::OblateSpheroidal { focus } => {
                write!(f, "oblate spheroidal (focus {focus})")
            }
            CoordinateSystem::Fibre => write!(f, "fibre"),
        }
    }
}

/// Metadata describing one field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub component_names: Vec<String>,
    pub coordinate_system: CoordinateSystem,
    pub kind: FieldKind,
}

impl FieldDefinition {
    /// A general field with default component names `"1"`, `"2"`, ...
    pub fn new(name: impl Into<String>, number_of_components: usize) -> Self {
        Self {
            name: name.into(),
            component_names: (1..=number_of_components).map(|c| c.to_string()).collect(),
            coordinate_system: CoordinateSystem::RectangularCartesian,
            kind: FieldKind::General,
        }
    }

    /// A rectangular-cartesian coordinate field named `x`, `y`, `z` per component.
    pub fn coordinates(name: impl Into<String>, number_of_components: usize) -> Self {
        const AXES: [&str; 3] = ["x", "y", "z"];
        let mut def = Self::new(name, number_of_components).with_kind(FieldKind::Coordinate);
        if number_of_components <= AXES.len() {
            def.component_names = AXES[..number_of_components]
                .iter()
                .map(|s| s.to_string())
                .collect();
        }
        def
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_coordinate_system(mut self, coordinate_system: CoordinateSystem) -> Self {
        self.coordinate_system = coordinate_system;
        self
    }

    pub fn with_component_names(mut self, names: Vec<String>) -> Self {
        self.component_names = names;
        self
    }

    #[inline]
    pub fn number_of_components(&self) -> usize {
        self.component_names.len()
    }
}
