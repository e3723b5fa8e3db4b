//! Octree over 3D points carrying arbitrary payloads.
//!
//! Used by the conversion engine to find an existing destination node whose
//! coordinates coincide (within a tolerance) with a new sample point.
//!
//! The tree is adaptive and unbounded: leaves split once they hold more than
//! [`OctreeConfig::leaf_capacity`] points, and the root doubles in size
//! whenever a point lands outside it. Cells live in an arena (`Vec`) and
//! refer to their children by index.

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};

/// Tuning knobs for [`Octree`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OctreeConfig {
    /// Points a leaf holds before it splits.
    pub leaf_capacity: usize,
    /// Leaves at this depth below the root never split.
    pub max_depth: usize,
    /// Half the edge length of the first root cell.
    pub initial_half_width: f64,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 8,
            max_depth: 32,
            initial_half_width: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
enum CellBody {
    Leaf(Vec<usize>),
    Branch([usize; 8]),
}

#[derive(Clone, Debug)]
struct Cell {
    centre: [f64; 3],
    half_width: f64,
    body: CellBody,
}

impl Cell {
    fn leaf(centre: [f64; 3], half_width: f64) -> Self {
        Self {
            centre,
            half_width,
            body: CellBody::Leaf(Vec::new()),
        }
    }

    fn contains(&self, p: &[f64; 3]) -> bool {
        (0..3).all(|a| (p[a] - self.centre[a]).abs() <= self.half_width)
    }

    fn octant(&self, p: &[f64; 3]) -> usize {
        (0..3).fold(0, |o, a| if p[a] >= self.centre[a] { o | (1 << a) } else { o })
    }

    fn child_centre(&self, octant: usize) -> [f64; 3] {
        let h = self.half_width / 2.0;
        std::array::from_fn(|a| {
            if octant & (1 << a) != 0 {
                self.centre[a] + h
            } else {
                self.centre[a] - h
            }
        })
    }

    /// Squared distance from `p` to the closest point of the cell box.
    fn distance_squared_to(&self, p: &[f64; 3]) -> f64 {
        (0..3)
            .map(|a| {
                let d = ((p[a] - self.centre[a]).abs() - self.half_width).max(0.0);
                d * d
            })
            .sum()
    }
}

#[derive(Clone, Debug)]
struct Entry<T> {
    coordinates: [f64; 3],
    payload: T,
}

/// A point found by a query.
#[derive(Debug)]
pub struct Neighbour<'a, T> {
    pub coordinates: [f64; 3],
    pub payload: &'a T,
    /// Euclidean distance to the query point.
    pub distance: f64,
    /// Insertion position; earlier points have smaller values.
    pub order: usize,
}

impl<T> Clone for Neighbour<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Neighbour<'_, T> {}

/// Adaptive octree keyed by `[f64; 3]`.
#[derive(Clone, Debug)]
pub struct Octree<T> {
    config: OctreeConfig,
    cells: Vec<Cell>,
    root: Option<usize>,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Octree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Octree<T> {
    pub fn new() -> Self {
        Self::with_config(OctreeConfig::default())
    }

    pub fn with_config(config: OctreeConfig) -> Self {
        Self {
            config,
            cells: Vec::new(),
            root: None,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a point, returning its insertion position.
    ///
    /// # Errors
    /// `InvalidGeometry` if any coordinate is not finite.
    pub fn insert(&mut self, coordinates: [f64; 3], payload: T) -> Result<usize, MeshError> {
        if coordinates.iter().any(|c| !c.is_finite()) {
            return Err(MeshError::InvalidGeometry(format!(
                "cannot index non-finite point {coordinates:?}"
            )));
        }
        let order = self.entries.len();
        self.entries.push(Entry {
            coordinates,
            payload,
        });

        let root = match self.root {
            Some(root) => root,
            None => {
                let half_width = if self.config.initial_half_width > 0.0 {
                    self.config.initial_half_width
                } else {
                    1.0
                };
                self.cells.push(Cell::leaf(coordinates, half_width));
                let root = self.cells.len() - 1;
                self.root = Some(root);
                root
            }
        };
        let mut root = root;
        while !self.cells[root].contains(&coordinates) {
            root = self.grow(root, &coordinates);
        }
        self.root = Some(root);

        let mut cell = root;
        let mut depth = 0;
        loop {
            let octant = self.cells[cell].octant(&coordinates);
            match &mut self.cells[cell].body {
                CellBody::Branch(children) => {
                    cell = children[octant];
                    depth += 1;
                }
                CellBody::Leaf(items) => {
                    items.push(order);
                    let overflowing = items.len() > self.config.leaf_capacity;
                    if overflowing && depth < self.config.max_depth {
                        self.split(cell, depth);
                    }
                    break;
                }
            }
        }
        Ok(order)
    }

    /// Replaces `root` by a cell twice its size, extended towards `toward`.
    fn grow(&mut self, root: usize, toward: &[f64; 3]) -> usize {
        let old = &self.cells[root];
        let half_width = old.half_width;
        let centre: [f64; 3] = std::array::from_fn(|a| {
            if toward[a] >= old.centre[a] {
                old.centre[a] + half_width
            } else {
                old.centre[a] - half_width
            }
        });
        let mut parent = Cell::leaf(centre, 2.0 * half_width);
        let old_octant = parent.octant(&self.cells[root].centre);
        let mut children = [0usize; 8];
        for (octant, child) in children.iter_mut().enumerate() {
            if octant == old_octant {
                *child = root;
            } else {
                self.cells.push(Cell::leaf(parent.child_centre(octant), half_width));
                *child = self.cells.len() - 1;
            }
        }
        parent.body = CellBody::Branch(children);
        self.cells.push(parent);
        self.cells.len() - 1
    }

    fn split(&mut self, cell: usize, depth: usize) {
        let items = match &mut self.cells[cell].body {
            CellBody::Leaf(items) => std::mem::take(items),
            CellBody::Branch(_) => return,
        };
        let parent = self.cells[cell].clone();
        let mut children = [0usize; 8];
        for (octant, child) in children.iter_mut().enumerate() {
            self.cells
                .push(Cell::leaf(parent.child_centre(octant), parent.half_width / 2.0));
            *child = self.cells.len() - 1;
        }
        for item in items {
            let octant = parent.octant(&self.entries[item].coordinates);
            if let CellBody::Leaf(bucket) = &mut self.cells[children[octant]].body {
                bucket.push(item);
            }
        }
        self.cells[cell].body = CellBody::Branch(children);
        for child in children {
            let overflowing = matches!(
                &self.cells[child].body,
                CellBody::Leaf(items) if items.len() > self.config.leaf_capacity
            );
            if overflowing && depth + 1 < self.config.max_depth {
                self.split(child, depth + 1);
            }
        }
    }

    /// All points within Euclidean `radius` of `coordinates` (inclusive),
    /// in insertion order. A negative or NaN radius matches nothing.
    pub fn query_radius(&self, coordinates: &[f64; 3], radius: f64) -> Vec<Neighbour<'_, T>> {
        let mut found = Vec::new();
        let Some(root) = self.root else {
            return found;
        };
        if !(radius >= 0.0) {
            return found;
        }
        let radius_squared = radius * radius;
        let mut stack = vec![root];
        while let Some(cell) = stack.pop() {
            let cell = &self.cells[cell];
            if !(cell.distance_squared_to(coordinates) <= radius_squared) {
                continue;
            }
            match &cell.body {
                CellBody::Branch(children) => stack.extend_from_slice(children),
                CellBody::Leaf(items) => {
                    for &item in items {
                        let entry = &self.entries[item];
                        let d2 = distance_squared(&entry.coordinates, coordinates);
                        if d2 <= radius_squared {
                            found.push(Neighbour {
                                coordinates: entry.coordinates,
                                payload: &entry.payload,
                                distance: d2.sqrt(),
                                order: item,
                            });
                        }
                    }
                }
            }
        }
        found.sort_by_key(|n| n.order);
        found
    }

    /// Payload of the candidate closest to `coordinates`; ties go to the
    /// earliest inserted point.
    pub fn nearest<'a>(candidates: &[Neighbour<'a, T>], coordinates: &[f64; 3]) -> Option<&'a T> {
        candidates
            .iter()
            .map(|n| (distance_squared(&n.coordinates, coordinates), n.order, n.payload))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, _, payload)| payload)
    }

    /// Closest point within `radius`, if any.
    pub fn find_nearest_within(&self, coordinates: &[f64; 3], radius: f64) -> Option<&T> {
        let candidates = self.query_radius(coordinates, radius);
        Self::nearest(&candidates, coordinates)
    }

    /// Iterates over all points in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64; 3], &T)> {
        self.entries.iter().map(|e| (&e.coordinates, &e.payload))
    }
}

fn distance_squared(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(lhs, rhs)| {
            let diff = lhs - rhs;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;

    fn lattice(n: usize, spacing: f64) -> Octree<usize> {
        let mut tree = Octree::new();
        for (k, j, i) in iproduct!(0..n, 0..n, 0..n) {
            let p = [i as f64 * spacing, j as f64 * spacing, k as f64 * spacing];
            tree.insert(p, tree.len()).unwrap();
        }
        tree
    }

    #[test]
    fn finds_exact_and_near_points() {
        let tree = lattice(6, 0.5);
        assert_eq!(tree.len(), 216);
        assert_eq!(tree.find_nearest_within(&[1.0, 0.5, 2.0], 0.0), Some(&(2 + 6 + 4 * 36)));
        assert_eq!(tree.find_nearest_within(&[1.01, 0.5, 2.0], 0.05), Some(&(2 + 6 + 4 * 36)));
        assert_eq!(tree.find_nearest_within(&[1.25, 0.5, 2.0], 0.1), None);
    }

    #[test]
    fn radius_query_matches_brute_force() {
        let tree = lattice(5, 0.3);
        let centre = [0.61, 0.59, 0.4];
        let radius = 0.45;
        let found: Vec<usize> = tree.query_radius(&centre, radius).iter().map(|n| *n.payload).collect();
        let expected: Vec<usize> = tree
            .iter()
            .filter(|(p, _)| distance_squared(p, &centre) <= radius * radius)
            .map(|(_, v)| *v)
            .collect();
        assert_eq!(found, expected);
        assert!(!found.is_empty());
    }

    #[test]
    fn root_grows_in_every_direction() {
        let mut tree = Octree::new();
        let points = [[0.0, 0.0, 0.0], [100.0, -50.0, 3.0], [-1e4, 7.0, 1e3], [0.5, 0.5, 0.5]];
        for (i, p) in points.iter().enumerate() {
            tree.insert(*p, i).unwrap();
        }
        for (i, p) in points.iter().enumerate() {
            assert_eq!(tree.find_nearest_within(p, 1e-12), Some(&i));
        }
    }

    #[test]
    fn coincident_points_do_not_split_forever() {
        let mut tree = Octree::with_config(OctreeConfig {
            leaf_capacity: 2,
            max_depth: 4,
            initial_half_width: 1.0,
        });
        for i in 0..20 {
            tree.insert([0.25, 0.25, 0.25], i).unwrap();
        }
        let found = tree.query_radius(&[0.25, 0.25, 0.25], 0.0);
        assert_eq!(found.len(), 20);
        // ties resolve to the first insertion
        assert_eq!(Octree::nearest(&found, &[0.25, 0.25, 0.25]), Some(&0));
    }

    #[test]
    fn nearest_prefers_closest_candidate() {
        let mut tree = Octree::new();
        tree.insert([0.0, 0.0, 0.0], 'a').unwrap();
        tree.insert([0.1, 0.0, 0.0], 'b').unwrap();
        let found = tree.query_radius(&[0.08, 0.0, 0.0], 0.2);
        assert_eq!(found.len(), 2);
        assert_eq!(Octree::nearest(&found, &[0.08, 0.0, 0.0]), Some(&'b'));
        assert_eq!(Octree::<char>::nearest(&[], &[0.0; 3]), None);
    }

    #[test]
    fn rejects_non_finite_points_and_radii() {
        let mut tree = Octree::new();
        assert!(tree.insert([f64::NAN, 0.0, 0.0], ()).is_err());
        assert!(tree.is_empty());
        tree.insert([0.0; 3], ()).unwrap();
        assert!(tree.query_radius(&[0.0; 3], -1.0).is_empty());
        assert!(tree.query_radius(&[0.0; 3], f64::NAN).is_empty());
    }
}
