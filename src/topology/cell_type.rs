//! Element shape metadata.

use crate::mesh_error::MeshError;

/// Line-shaped (tensor-product) element shapes.
///
/// Every xi direction of these shapes spans `[0, 1]` independently, so a
/// shape is fully described by its dimension.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum ElementShape {
    /// 1D line.
    Line,
    /// 2D square (line × line).
    Square,
    /// 3D cube (line × line × line).
    Cube,
}

impl ElementShape {
    /// Returns the topological dimension of the shape.
    pub fn dimension(self) -> usize {
        match self {
            ElementShape::Line => 1,
            ElementShape::Square => 2,
            ElementShape::Cube => 3,
        }
    }

    /// The line-shaped element of the given dimension.
    pub fn from_dimension(dimension: usize) -> Result<Self, MeshError> {
        match dimension {
            1 => Ok(ElementShape::Line),
            2 => Ok(ElementShape::Square),
            3 => Ok(ElementShape::Cube),
            d => Err(MeshError::invalid_argument(format!(
                "no line-shaped element of dimension {d}"
            ))),
        }
    }

    /// Number of corner vertices (`2^dimension`).
    pub fn number_of_vertices(self) -> usize {
        1 << self.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_round_trips() {
        for shape in [ElementShape::Line, ElementShape::Square, ElementShape::Cube] {
            assert_eq!(ElementShape::from_dimension(shape.dimension()).unwrap(), shape);
        }
        assert!(ElementShape::from_dimension(0).is_err());
        assert!(ElementShape::from_dimension(4).is_err());
        assert_eq!(ElementShape::Cube.number_of_vertices(), 8);
    }
}
