//! Per-mode sample tables for mesh conversion.
//!
//! Each [`ConversionMode`] fixes the destination element type and the local
//! xi of its nodes. Entry `i` of a table is destination local node `i`.

use crate::data::basis::Basis;
use crate::data::template::NodeValueType;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementShape;
use serde::{Deserialize, Serialize};

/// Destination element type produced by a conversion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionMode {
    /// 2D source elements → bicubic Hermite squares (4 nodes, no sharing).
    HermiteBicubic,
    /// 3D source elements → trilinear cubes (8 nodes).
    #[default]
    Trilinear,
    /// 3D source elements → triquadratic cubes (27 nodes).
    Triquadratic,
}

static HERMITE_BICUBIC_XI: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
];

static TRILINEAR_XI: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

static TRIQUADRATIC_XI: [[f64; 3]; 27] = [
    [0.0, 0.0, 0.0],
    [0.5, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.5, 0.0],
    [0.5, 0.5, 0.0],
    [1.0, 0.5, 0.0],
    [0.0, 1.0, 0.0],
    [0.5, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 0.5],
    [0.5, 0.0, 0.5],
    [1.0, 0.0, 0.5],
    [0.0, 0.5, 0.5],
    [0.5, 0.5, 0.5],
    [1.0, 0.5, 0.5],
    [0.0, 1.0, 0.5],
    [0.5, 1.0, 0.5],
    [1.0, 1.0, 0.5],
    [0.0, 0.0, 1.0],
    [0.5, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 0.5, 1.0],
    [0.5, 0.5, 1.0],
    [1.0, 0.5, 1.0],
    [0.0, 1.0, 1.0],
    [0.5, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

impl ConversionMode {
    /// Dimension of both the source elements visited and the elements produced.
    pub fn dimension(self) -> usize {
        match self {
            ConversionMode::HermiteBicubic => 2,
            ConversionMode::Trilinear | ConversionMode::Triquadratic => 3,
        }
    }

    /// Local xi of each destination node; only the first `dimension()`
    /// entries of a row are meaningful.
    pub fn local_node_xi(self) -> &'static [[f64; 3]] {
        match self {
            ConversionMode::HermiteBicubic => &HERMITE_BICUBIC_XI,
            ConversionMode::Trilinear => &TRILINEAR_XI,
            ConversionMode::Triquadratic => &TRIQUADRATIC_XI,
        }
    }

    pub fn number_of_local_nodes(self) -> usize {
        self.local_node_xi().len()
    }

    pub fn basis(self) -> Basis {
        match self {
            ConversionMode::HermiteBicubic => Basis::CubicHermite,
            ConversionMode::Trilinear => Basis::LinearLagrange,
            ConversionMode::Triquadratic => Basis::QuadraticLagrange,
        }
    }

    pub fn shape(self) -> ElementShape {
        match self.dimension() {
            2 => ElementShape::Square,
            _ => ElementShape::Cube,
        }
    }

    /// Nodal value types stored per field component.
    pub fn node_value_types(self) -> &'static [NodeValueType] {
        match self {
            ConversionMode::HermiteBicubic => NodeValueType::hermite(2),
            ConversionMode::Trilinear | ConversionMode::Triquadratic => &[NodeValueType::Value],
        }
    }

    /// True when coincident destination nodes are merged through the octree.
    pub fn shares_nodes(self) -> bool {
        !matches!(self, ConversionMode::HermiteBicubic)
    }
}

/// Number of subelements each source element is divided into:
/// the product of `refinement` over the mode's axes.
pub fn subelement_count(mode: ConversionMode, refinement: &[usize]) -> Result<usize, MeshError> {
    let axes = refinement_axes(mode, refinement)?;
    axes.iter().try_fold(1usize, |acc, &n| {
        acc.checked_mul(n)
            .ok_or_else(|| MeshError::invalid_argument("refinement product overflows"))
    })
}

/// Per-axis offsets of subelement `index` (axis 0 varies fastest).
pub fn subelement_offset(mode: ConversionMode, refinement: &[usize], index: usize) -> Result<Vec<usize>, MeshError> {
    let axes = refinement_axes(mode, refinement)?;
    let mut rest = index;
    let offsets = axes
        .iter()
        .map(|&n| {
            let digit = rest % n;
            rest /= n;
            digit
        })
        .collect();
    if rest != 0 {
        return Err(MeshError::invalid_argument(format!(
            "subelement {index} out of range"
        )));
    }
    Ok(offsets)
}

fn refinement_axes(mode: ConversionMode, refinement: &[usize]) -> Result<&[usize], MeshError> {
    let dimension = mode.dimension();
    let axes = refinement.get(..dimension).ok_or_else(|| {
        MeshError::invalid_argument(format!(
            "{mode:?} needs {dimension} refinement counts, got {}",
            refinement.len()
        ))
    })?;
    if let Some(axis) = axes.iter().position(|&n| n == 0) {
        return Err(MeshError::invalid_argument(format!(
            "refinement count for axis {axis} must be at least 1"
        )));
    }
    Ok(axes)
}
