//! Sample-point discretization of line-shaped elements.
//!
//! A discretization enumerates the points at which something (a selection,
//! a glyph, a grid value) is sampled inside one element. Points are numbered
//! from 0 with xi1 varying fastest.

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};

/// How sample points are laid out in an element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum XiDiscretizationMode {
    /// Centres of an `n1 × n2 × n3` grid of cells.
    CellCentres,
    /// Corners of an `n1 × n2 × n3` grid of cells: `(n1+1) × ...` points.
    CellCorners,
    /// One point at an explicit xi.
    ExactXi,
}

impl XiDiscretizationMode {
    /// True for modes that place points on a regular grid.
    pub fn is_grid(self) -> bool {
        !matches!(self, XiDiscretizationMode::ExactXi)
    }
}

fn check_counts(dimension: usize, number_in_xi: &[usize]) -> Result<&[usize], MeshError> {
    let counts = number_in_xi.get(..dimension).ok_or_else(|| {
        MeshError::invalid_argument(format!(
            "need {dimension} numbers in xi, got {}",
            number_in_xi.len()
        ))
    })?;
    if counts.contains(&0) {
        return Err(MeshError::invalid_argument("numbers in xi must be at least 1"));
    }
    Ok(counts)
}

/// Points per axis for a grid mode.
fn points_per_axis(mode: XiDiscretizationMode, n: usize) -> usize {
    match mode {
        XiDiscretizationMode::CellCorners => n + 1,
        XiDiscretizationMode::CellCentres | XiDiscretizationMode::ExactXi => n,
    }
}

/// Number of sample points in an element of `dimension`.
pub fn sample_point_count(
    dimension: usize,
    mode: XiDiscretizationMode,
    number_in_xi: &[usize],
) -> Result<usize, MeshError> {
    if mode == XiDiscretizationMode::ExactXi {
        return Ok(1);
    }
    let counts = check_counts(dimension, number_in_xi)?;
    counts.iter().try_fold(1usize, |acc, &n| {
        acc.checked_mul(points_per_axis(mode, n))
            .ok_or_else(|| MeshError::invalid_argument("sample point count overflows"))
    })
}

/// Xi of sample point `point_number`.
///
/// # Errors
/// `InvalidRange` if `point_number` is not below [`sample_point_count`].
pub fn sample_point_xi(
    dimension: usize,
    mode: XiDiscretizationMode,
    number_in_xi: &[usize],
    exact_xi: &[f64],
    point_number: usize,
) -> Result<Vec<f64>, MeshError> {
    let count = sample_point_count(dimension, mode, number_in_xi)?;
    if point_number >= count {
        return Err(MeshError::InvalidRange {
            start: point_number as i64,
            stop: point_number as i64,
            limit: count as i64,
        });
    }
    if mode == XiDiscretizationMode::ExactXi {
        return exact_xi
            .get(..dimension)
            .map(<[f64]>::to_vec)
            .ok_or_else(|| MeshError::invalid_argument(format!("need {dimension} exact xi values")));
    }
    let counts = check_counts(dimension, number_in_xi)?;
    let mut rest = point_number;
    Ok(counts
        .iter()
        .map(|&n| {
            let per_axis = points_per_axis(mode, n);
            let i = rest % per_axis;
            rest /= per_axis;
            match mode {
                XiDiscretizationMode::CellCentres => (i as f64 + 0.5) / n as f64,
                _ => i as f64 / n as f64,
            }
        })
        .collect())
}
