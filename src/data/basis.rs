//! Tensor-product interpolation bases on line-shaped elements.
//!
//! Local nodes are numbered with xi1 varying fastest. For Lagrange bases
//! each node carries one parameter per component. For the cubic Hermite
//! basis each node carries `2^dimension` parameters per component, ordered by
//! a derivative bit mask (bit `a` set = derivative with respect to xi `a+1`):
//! value, d/ds1, d/ds2, d2/ds1ds2, d/ds3, ...
//!
//! Hermite derivative parameters are taken with respect to xi directly (unit
//! scale factors).

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};

/// One-dimensional basis family applied along every xi direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    LinearLagrange,
    QuadraticLagrange,
    CubicHermite,
}

/// Weights of every basis function at one xi location.
#[derive(Clone, Debug, PartialEq)]
pub struct BasisWeights {
    /// Function values, one per element parameter.
    pub values: Vec<f64>,
    /// `derivatives[a][p]` = d(function p)/d(xi a).
    pub derivatives: Vec<Vec<f64>>,
}

impl Basis {
    /// Nodes along each xi direction.
    #[inline]
    pub fn nodes_per_axis(self) -> usize {
        match self {
            Basis::LinearLagrange | Basis::CubicHermite => 2,
            Basis::QuadraticLagrange => 3,
        }
    }

    /// Local nodes of an element of `dimension`.
    pub fn number_of_nodes(self, dimension: usize) -> usize {
        self.nodes_per_axis().pow(dimension as u32)
    }

    /// Parameters stored per node and component.
    pub fn parameters_per_node(self, dimension: usize) -> usize {
        match self {
            Basis::CubicHermite => 1 << dimension,
            _ => 1,
        }
    }

    /// Parameters per component over the whole element.
    pub fn number_of_parameters(self, dimension: usize) -> usize {
        self.number_of_nodes(dimension) * self.parameters_per_node(dimension)
    }

    /// Xi location of local node `local`.
    pub fn node_xi(self, dimension: usize, local: usize) -> Result<Vec<f64>, MeshError> {
        check_dimension(dimension)?;
        let n = self.nodes_per_axis();
        if local >= self.number_of_nodes(dimension) {
            return Err(MeshError::invalid_argument(format!(
                "local node {local} out of range for {self:?} in {dimension}D"
            )));
        }
        let step = 1.0 / (n - 1) as f64;
        Ok(axis_indices(local, n, dimension)
            .into_iter()
            .map(|i| i as f64 * step)
            .collect())
    }

    /// Evaluates all basis functions and their first xi derivatives at `xi`.
    pub fn weights(self, dimension: usize, xi: &[f64]) -> Result<BasisWeights, MeshError> {
        check_dimension(dimension)?;
        if xi.len() != dimension {
            return Err(MeshError::invalid_argument(format!(
                "expected {dimension} xi coordinates, got {}",
                xi.len()
            )));
        }
        let n = self.nodes_per_axis();
        let ppn = self.parameters_per_node(dimension);
        let total = self.number_of_nodes(dimension) * ppn;
        let mut values = Vec::with_capacity(total);
        let mut derivatives = vec![Vec::with_capacity(total); dimension];

        for node in 0..self.number_of_nodes(dimension) {
            let indices = axis_indices(node, n, dimension);
            for mask in 0..ppn {
                let factors: Vec<(f64, f64)> = (0..dimension)
                    .map(|a| self.one_d(indices[a], (mask >> a) & 1 == 1, xi[a]))
                    .collect();
                values.push(factors.iter().map(|f| f.0).product());
                for (a, d) in derivatives.iter_mut().enumerate() {
                    let w: f64 = factors
                        .iter()
                        .enumerate()
                        .map(|(b, f)| if a == b { f.1 } else { f.0 })
                        .product();
                    d.push(w);
                }
            }
        }
        Ok(BasisWeights {
            values,
            derivatives,
        })
    }

    /// Interpolated value of one component from its element parameters.
    pub fn interpolate(self, dimension: usize, xi: &[f64], parameters: &[f64]) -> Result<f64, MeshError> {
        let weights = self.weights(dimension, xi)?;
        check_parameters(self, dimension, parameters)?;
        Ok(dot(&weights.values, parameters))
    }

    /// Interpolated value and xi derivatives of one component.
    pub fn interpolate_with_derivatives(
        self,
        dimension: usize,
        xi: &[f64],
        parameters: &[f64],
    ) -> Result<(f64, Vec<f64>), MeshError> {
        let weights = self.weights(dimension, xi)?;
        check_parameters(self, dimension, parameters)?;
        let derivatives = weights
            .derivatives
            .iter()
            .map(|d| dot(d, parameters))
            .collect();
        Ok((dot(&weights.values, parameters), derivatives))
    }

    /// 1D function for node index `i` (and Hermite derivative flag) at `x`:
    /// returns (value, d/dx).
    fn one_d(self, i: usize, derivative: bool, x: f64) -> (f64, f64) {
        match (self, i, derivative) {
            (Basis::LinearLagrange, 0, _) => (1.0 - x, -1.0),
            (Basis::LinearLagrange, _, _) => (x, 1.0),
            (Basis::QuadraticLagrange, 0, _) => (2.0 * x * x - 3.0 * x + 1.0, 4.0 * x - 3.0),
            (Basis::QuadraticLagrange, 1, _) => (4.0 * x * (1.0 - x), 4.0 - 8.0 * x),
            (Basis::QuadraticLagrange, _, _) => (x * (2.0 * x - 1.0), 4.0 * x - 1.0),
            (Basis::CubicHermite, 0, false) => (
                1.0 - 3.0 * x * x + 2.0 * x * x * x,
                6.0 * x * (x - 1.0),
            ),
            (Basis::CubicHermite, 0, true) => (
                x * (1.0 - x) * (1.0 - x),
                1.0 - 4.0 * x + 3.0 * x * x,
            ),
            (Basis::CubicHermite, _, false) => (
                x * x * (3.0 - 2.0 * x),
                6.0 * x * (1.0 - x),
            ),
            (Basis::CubicHermite, _, true) => (x * x * (x - 1.0), x * (3.0 * x - 2.0)),
        }
    }
}

/// Per-axis node indices of a local node, xi1 fastest.
pub(crate) fn axis_indices(mut local: usize, per_axis: usize, dimension: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        out.push(local % per_axis);
        local /= per_axis;
    }
    out
}

fn check_dimension(dimension: usize) -> Result<(), MeshError> {
    if (1..=3).contains(&dimension) {
        Ok(())
    } else {
        Err(MeshError::invalid_argument(format!(
            "basis dimension must be 1, 2 or 3, got {dimension}"
        )))
    }
}

fn check_parameters(basis: Basis, dimension: usize, parameters: &[f64]) -> Result<(), MeshError> {
    let expected = basis.number_of_parameters(dimension);
    if parameters.len() != expected {
        return Err(MeshError::invalid_argument(format!(
            "{basis:?} in {dimension}D needs {expected} parameters, got {}",
            parameters.len()
        )));
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn lagrange_partition_of_unity() {
        for basis in [Basis::LinearLagrange, Basis::QuadraticLagrange] {
            for dim in 1..=3 {
                let xi = vec![0.3; dim];
                let w = basis.weights(dim, &xi).unwrap();
                let sum: f64 = w.values.iter().sum();
                assert!((sum - 1.0).abs() < EPS, "{basis:?} {dim}D sum {sum}");
                for d in &w.derivatives {
                    assert!(d.iter().sum::<f64>().abs() < EPS);
                }
            }
        }
    }

    #[test]
    fn lagrange_interpolates_nodes() {
        let basis = Basis::QuadraticLagrange;
        for local in 0..basis.number_of_nodes(2) {
            let xi = basis.node_xi(2, local).unwrap();
            let w = basis.weights(2, &xi).unwrap();
            for (p, v) in w.values.iter().enumerate() {
                let expected = if p == local { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < EPS);
            }
        }
    }

    #[test]
    fn trilinear_node_order_is_xi1_fastest() {
        let basis = Basis::LinearLagrange;
        assert_eq!(basis.node_xi(3, 1).unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(basis.node_xi(3, 2).unwrap(), vec![0.0, 1.0, 0.0]);
        assert_eq!(basis.node_xi(3, 4).unwrap(), vec![0.0, 0.0, 1.0]);
        assert!(basis.node_xi(3, 8).is_err());
    }

    #[test]
    fn hermite_reproduces_cubic() {
        // f(x) = x^3 on [0,1]: f(0)=0, f'(0)=0, f(1)=1, f'(1)=3
        let params = [0.0, 0.0, 1.0, 3.0];
        for x in [0.0, 0.25, 0.5, 0.9] {
            let (v, d) = Basis::CubicHermite
                .interpolate_with_derivatives(1, &[x], &params)
                .unwrap();
            assert!((v - x * x * x).abs() < EPS);
            assert!((d[0] - 3.0 * x * x).abs() < EPS);
        }
    }

    #[test]
    fn bicubic_hermite_reproduces_bilinear_product() {
        // f = x*y: value, d/ds1 = y, d/ds2 = x, d2/ds1ds2 = 1 at each corner
        let mut params = Vec::new();
        for local in 0..4 {
            let xi = Basis::CubicHermite.node_xi(2, local).unwrap();
            params.extend([xi[0] * xi[1], xi[1], xi[0], 1.0]);
        }
        let (v, d) = Basis::CubicHermite
            .interpolate_with_derivatives(2, &[0.3, 0.8], &params)
            .unwrap();
        assert!((v - 0.24).abs() < EPS);
        assert!((d[0] - 0.8).abs() < EPS);
        assert!((d[1] - 0.3).abs() < EPS);
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let err = Basis::LinearLagrange.interpolate(2, &[0.5, 0.5], &[1.0; 3]);
        assert!(matches!(err, Err(MeshError::InvalidArgument(_))));
        assert!(Basis::LinearLagrange.weights(2, &[0.5]).is_err());
        assert!(Basis::LinearLagrange.weights(4, &[0.5; 4]).is_err());
    }
}
