//! Selections of sample points inside elements.
//!
//! An [`ElementPointRangesIdentifier`] names one way of sampling one element
//! (element, top-level element, discretization mode and its parameters).
//! [`ElementPointRangesList`] maps identifiers to the [`MultiRange`] of
//! selected sample-point numbers. Identifiers that differ in any
//! discretization parameter are separate entries; an entry disappears as
//! soon as its range set becomes empty.

use crate::algs::field_eval::{FieldEvaluator, MeshLocation};
use crate::algs::multi_range::MultiRange;
use crate::data::discretization::{XiDiscretizationMode, sample_point_count, sample_point_xi};
use crate::mesh_error::MeshError;
use crate::topology::id::ElementKey;
use crate::topology::mesh::MeshQuery;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

const MAX_XI: usize = 3;

/// Which sample points of which element a set of ranges refers to.
///
/// Equality and ordering compare, in turn: element, top-level element,
/// mode, then `number_in_xi` (grid modes) or `exact_xi` (exact mode) over
/// the element's dimension only. Parameters beyond the element's dimension
/// are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementPointRangesIdentifier {
    pub element: ElementKey,
    pub top_level_element: ElementKey,
    pub mode: XiDiscretizationMode,
    pub number_in_xi: [usize; MAX_XI],
    pub exact_xi: [f64; MAX_XI],
}

impl ElementPointRangesIdentifier {
    /// Grid sampling (cell centres or corners) of `element`.
    pub fn grid(
        element: ElementKey,
        top_level_element: ElementKey,
        mode: XiDiscretizationMode,
        number_in_xi: [usize; MAX_XI],
    ) -> Self {
        Self {
            element,
            top_level_element,
            mode,
            number_in_xi,
            exact_xi: [0.0; MAX_XI],
        }
    }

    /// A single point of `element` at `exact_xi`.
    pub fn exact(element: ElementKey, top_level_element: ElementKey, exact_xi: [f64; MAX_XI]) -> Self {
        Self {
            element,
            top_level_element,
            mode: XiDiscretizationMode::ExactXi,
            number_in_xi: [1; MAX_XI],
            exact_xi,
        }
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.element.dimension.min(MAX_XI)
    }

    /// True if both elements exist, `element` lies within
    /// `top_level_element`, and the parameters suit the mode: every count
    /// at least 1 for grids, exactly 1 for exact xi.
    pub fn is_valid<M: MeshQuery + ?Sized>(&self, mesh: &M) -> bool {
        if !mesh.contains_element(self.element)
            || !mesh.contains_element(self.top_level_element)
            || !mesh.is_element_within(self.element, self.top_level_element)
        {
            return false;
        }
        self.check_parameters().is_ok()
    }

    /// Checks the dimension and the mode parameters, without a mesh.
    ///
    /// # Errors
    /// `InvalidArgument` for a dimension outside 1 to 3, a zero grid count,
    /// or an exact-xi tuple whose counts are not all 1 or whose xi is not
    /// finite.
    pub fn check_parameters(&self) -> Result<(), MeshError> {
        let dimension = self.element.dimension;
        if !(1..=MAX_XI).contains(&dimension) {
            return Err(MeshError::invalid_argument(format!(
                "element dimension {dimension} is not between 1 and {MAX_XI}"
            )));
        }
        let counts = &self.number_in_xi[..dimension];
        if self.mode.is_grid() {
            if counts.contains(&0) {
                return Err(MeshError::invalid_argument("numbers in xi must be at least 1"));
            }
        } else {
            if counts.iter().any(|&n| n != 1) {
                return Err(MeshError::invalid_argument(format!(
                    "exact xi needs numbers in xi of 1, got {counts:?}"
                )));
            }
            if self.exact_xi[..dimension].iter().any(|x| !x.is_finite()) {
                return Err(MeshError::invalid_argument(format!(
                    "exact xi must be finite, got {:?}",
                    &self.exact_xi[..dimension]
                )));
            }
        }
        Ok(())
    }

    /// Sample points in the element under this discretization.
    pub fn number_of_sample_points(&self) -> Result<usize, MeshError> {
        sample_point_count(self.dimension(), self.mode, &self.number_in_xi)
    }

    /// Xi of sample point `point_number`.
    pub fn sample_point_xi(&self, point_number: usize) -> Result<Vec<f64>, MeshError> {
        sample_point_xi(
            self.dimension(),
            self.mode,
            &self.number_in_xi,
            &self.exact_xi,
            point_number,
        )
    }
}

impl Ord for ElementPointRangesIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        let dimension = self.dimension();
        self.element
            .cmp(&other.element)
            .then_with(|| self.top_level_element.cmp(&other.top_level_element))
            .then_with(|| self.mode.cmp(&other.mode))
            .then_with(|| {
                if self.mode.is_grid() {
                    self.number_in_xi[..dimension].cmp(&other.number_in_xi[..dimension])
                } else {
                    self.exact_xi[..dimension]
                        .iter()
                        .zip(&other.exact_xi[..dimension])
                        // -0.0 + 0.0 is 0.0, so signed zeros compare equal
                        .map(|(a, b)| (a + 0.0).total_cmp(&(b + 0.0)))
                        .find(|o| o.is_ne())
                        .unwrap_or(Ordering::Equal)
                }
            })
    }
}

impl PartialOrd for ElementPointRangesIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ElementPointRangesIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ElementPointRangesIdentifier {}

/// An identifier together with its selected sample points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementPointRanges {
    pub identifier: ElementPointRangesIdentifier,
    pub ranges: MultiRange,
}

impl ElementPointRanges {
    pub fn new(identifier: ElementPointRangesIdentifier) -> Self {
        Self {
            identifier,
            ranges: MultiRange::new(),
        }
    }

    /// Adds `[start, stop]` after checking it against the sample-point count.
    pub fn add_range(&mut self, start: i64, stop: i64) -> Result<(), MeshError> {
        check_range(&self.identifier, start, stop)?;
        self.ranges.add_range(start, stop);
        Ok(())
    }
}

/// Value of a field at one selected sample point.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleValue {
    pub identifier: ElementPointRangesIdentifier,
    pub point_number: usize,
    pub xi: Vec<f64>,
    pub values: Vec<f64>,
}

fn check_range(identifier: &ElementPointRangesIdentifier, start: i64, stop: i64) -> Result<(), MeshError> {
    identifier.check_parameters()?;
    let limit = identifier.number_of_sample_points()?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    if 0 <= start && start <= stop && stop < limit {
        Ok(())
    } else {
        Err(MeshError::InvalidRange { start, stop, limit })
    }
}

/// Collection of element point ranges, one entry per distinct identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementPointRangesList {
    entries: BTreeMap<ElementPointRangesIdentifier, MultiRange>,
}

impl ElementPointRangesList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers with a non-empty selection.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Selects sample points `[start, stop]`, creating the entry if needed.
    ///
    /// # Errors
    /// `InvalidRange` unless `0 <= start <= stop < number_of_sample_points`.
    pub fn add_range(
        &mut self,
        identifier: &ElementPointRangesIdentifier,
        start: i64,
        stop: i64,
    ) -> Result<(), MeshError> {
        check_range(identifier, start, stop)?;
        self.entries
            .entry(identifier.clone())
            .or_default()
            .add_range(start, stop);
        Ok(())
    }

    /// Deselects `[start, stop]`; drops the entry once nothing is left.
    pub fn remove_range(
        &mut self,
        identifier: &ElementPointRangesIdentifier,
        start: i64,
        stop: i64,
    ) -> Result<(), MeshError> {
        check_range(identifier, start, stop)?;
        if let Entry::Occupied(mut entry) = self.entries.entry(identifier.clone()) {
            entry.get_mut().remove_range(start, stop);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
        Ok(())
    }

    /// Flips the selection of every point in `[start, stop]`.
    pub fn toggle_range(
        &mut self,
        identifier: &ElementPointRangesIdentifier,
        start: i64,
        stop: i64,
    ) -> Result<(), MeshError> {
        check_range(identifier, start, stop)?;
        let ranges = self.entries.entry(identifier.clone()).or_default();
        ranges.toggle_range(start, stop);
        if ranges.is_empty() {
            self.entries.remove(identifier);
        }
        Ok(())
    }

    pub fn has_ranges(&self, identifier: &ElementPointRangesIdentifier) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn ranges(&self, identifier: &ElementPointRangesIdentifier) -> Option<&MultiRange> {
        self.entries.get(identifier)
    }

    /// Merges all of `other`'s ranges into its identifier's entry.
    pub fn add_element_point_ranges(&mut self, other: &ElementPointRanges) -> Result<(), MeshError> {
        other.identifier.check_parameters()?;
        for &(start, stop) in other.ranges.ranges() {
            check_range(&other.identifier, start, stop)?;
        }
        if other.ranges.is_empty() {
            return Ok(());
        }
        self.entries
            .entry(other.identifier.clone())
            .or_default()
            .union_with(&other.ranges);
        Ok(())
    }

    /// Removes all of `other`'s ranges from its identifier's entry.
    pub fn remove_element_point_ranges(&mut self, other: &ElementPointRanges) {
        if let Entry::Occupied(mut entry) = self.entries.entry(other.identifier.clone()) {
            entry.get_mut().subtract(&other.ranges);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&ElementPointRangesIdentifier, &MultiRange)> {
        self.entries.iter()
    }

    /// Total number of selected sample points.
    pub fn number_of_points(&self) -> u64 {
        self.entries.values().map(MultiRange::number_of_values).sum()
    }

    /// Evaluates `field` at every selected sample point, in list order.
    ///
    /// # Errors
    /// `MissingElement` if an entry's element is not in `mesh`; any error
    /// from the evaluator.
    pub fn evaluate_field<M: MeshQuery + ?Sized>(
        &self,
        mesh: &M,
        field: &dyn FieldEvaluator,
    ) -> Result<Vec<SampleValue>, MeshError> {
        let mut out = Vec::new();
        for (identifier, ranges) in &self.entries {
            let element = mesh
                .element(identifier.element)
                .ok_or(MeshError::MissingElement(identifier.element))?;
            for point in ranges.values() {
                let point_number = usize::try_from(point).map_err(|_| MeshError::InvalidRange {
                    start: point,
                    stop: point,
                    limit: 0,
                })?;
                let xi = identifier.sample_point_xi(point_number)?;
                let values = field.evaluate(&MeshLocation::new(element, &xi))?;
                out.push(SampleValue {
                    identifier: identifier.clone(),
                    point_number,
                    xi,
                    values,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::id::ElementId;
    use proptest::prelude::*;

    fn key(dimension: usize, raw: u64) -> ElementKey {
        ElementKey::new(dimension, ElementId::new(raw).unwrap())
    }

    fn centres(n: [usize; 3]) -> ElementPointRangesIdentifier {
        ElementPointRangesIdentifier::grid(key(2, 1), key(2, 1), XiDiscretizationMode::CellCentres, n)
    }

    #[test]
    fn parameters_beyond_dimension_are_ignored() {
        assert_eq!(centres([2, 3, 1]), centres([2, 3, 7]));
        assert_ne!(centres([2, 3, 1]), centres([2, 4, 1]));
        let a = ElementPointRangesIdentifier::exact(key(1, 4), key(3, 1), [0.5, 0.1, 0.0]);
        let b = ElementPointRangesIdentifier::exact(key(1, 4), key(3, 1), [0.5, 0.9, 0.3]);
        let c = ElementPointRangesIdentifier::exact(key(1, 4), key(3, 1), [0.25, 0.1, 0.0]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn mode_and_elements_distinguish_entries() {
        let corners = ElementPointRangesIdentifier::grid(
            key(2, 1),
            key(2, 1),
            XiDiscretizationMode::CellCorners,
            [2, 3, 1],
        );
        assert_ne!(centres([2, 3, 1]), corners);
        let other_top = ElementPointRangesIdentifier::grid(
            key(2, 1),
            key(3, 1),
            XiDiscretizationMode::CellCentres,
            [2, 3, 1],
        );
        assert_ne!(centres([2, 3, 1]), other_top);
    }

    #[test]
    fn equal_identifiers_collapse_into_one_entry() {
        let mut list = ElementPointRangesList::new();
        list.add_range(&centres([2, 2, 5]), 0, 1).unwrap();
        list.add_range(&centres([2, 2, 9]), 3, 3).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.ranges(&centres([2, 2, 1])).unwrap().ranges(), &[(0, 1), (3, 3)]);
        list.add_range(&centres([4, 1, 1]), 0, 0).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.number_of_points(), 4);
    }

    #[test]
    fn ranges_are_checked_against_sample_count() {
        let mut list = ElementPointRangesList::new();
        let id = centres([2, 2, 1]);
        assert!(matches!(
            list.add_range(&id, 0, 4),
            Err(MeshError::InvalidRange { limit: 4, .. })
        ));
        assert!(list.add_range(&id, -1, 0).is_err());
        assert!(list.add_range(&id, 2, 1).is_err());
        assert!(list.is_empty());
        let exact = ElementPointRangesIdentifier::exact(key(2, 1), key(2, 1), [0.5; 3]);
        list.add_range(&exact, 0, 0).unwrap();
        assert!(list.add_range(&exact, 0, 1).is_err());
    }

    #[test]
    fn malformed_identifiers_are_not_stored() {
        let mut list = ElementPointRangesList::new();
        let mut exact = ElementPointRangesIdentifier::exact(key(2, 1), key(2, 1), [0.5; 3]);
        exact.number_in_xi = [2, 3, 1];
        assert!(matches!(list.add_range(&exact, 0, 0), Err(MeshError::InvalidArgument(_))));
        assert!(list.toggle_range(&exact, 0, 0).is_err());

        // counts beyond the element's dimension do not matter
        exact.number_in_xi = [1, 1, 4];
        list.add_range(&exact, 0, 0).unwrap();

        let nan = ElementPointRangesIdentifier::exact(key(2, 1), key(2, 1), [f64::NAN, 0.5, 0.0]);
        assert!(list.add_range(&nan, 0, 0).is_err());
        let zero_dimension = ElementPointRangesIdentifier::grid(
            key(0, 1),
            key(2, 1),
            XiDiscretizationMode::CellCentres,
            [1, 1, 1],
        );
        assert!(list.add_range(&zero_dimension, 0, 0).is_err());
        let four_dimensions = ElementPointRangesIdentifier::exact(key(4, 1), key(4, 1), [0.5; 3]);
        assert!(list.add_range(&four_dimensions, 0, 0).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn signed_zero_exact_xi_is_one_entry() {
        let positive = ElementPointRangesIdentifier::exact(key(2, 1), key(2, 1), [0.0, 0.5, 0.0]);
        let negative = ElementPointRangesIdentifier::exact(key(2, 1), key(2, 1), [-0.0, 0.5, 0.0]);
        assert_eq!(positive, negative);
        let mut list = ElementPointRangesList::new();
        list.add_range(&positive, 0, 0).unwrap();
        list.toggle_range(&negative, 0, 0).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn emptied_entries_are_removed() {
        let mut list = ElementPointRangesList::new();
        let id = centres([3, 3, 1]);
        list.add_range(&id, 2, 6).unwrap();
        list.remove_range(&id, 0, 8).unwrap();
        assert!(!list.has_ranges(&id));
        list.toggle_range(&id, 1, 1).unwrap();
        assert!(list.has_ranges(&id));
        list.toggle_range(&id, 1, 1).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn whole_entries_merge_and_subtract() {
        let mut list = ElementPointRangesList::new();
        let mut epr = ElementPointRanges::new(centres([4, 1, 1]));
        epr.add_range(0, 1).unwrap();
        epr.add_range(3, 3).unwrap();
        list.add_element_point_ranges(&epr).unwrap();
        list.add_range(&centres([4, 1, 1]), 2, 2).unwrap();
        assert_eq!(list.ranges(&epr.identifier).unwrap().ranges(), &[(0, 3)]);
        list.remove_element_point_ranges(&epr);
        assert_eq!(list.ranges(&epr.identifier).unwrap().ranges(), &[(2, 2)]);
        assert!(epr.add_range(0, 4).is_err());
    }

    proptest! {
        #[test]
        fn add_twice_equals_add_once(a in 0i64..12, b in 0i64..12) {
            let id = centres([3, 4, 1]);
            let (a, b) = if a <= b { (a, b) } else { (b, a) };
            let mut once = ElementPointRangesList::new();
            once.add_range(&id, a, b).unwrap();
            let mut twice = once.clone();
            twice.add_range(&id, a, b).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn toggle_twice_restores(seed in proptest::collection::vec((0i64..12, 0i64..12), 0..6), a in 0i64..12, b in 0i64..12) {
            let id = centres([3, 4, 1]);
            let mut list = ElementPointRangesList::new();
            for (x, y) in seed {
                list.add_range(&id, x.min(y), x.max(y)).unwrap();
            }
            let original = list.clone();
            let (a, b) = (a.min(b), a.max(b));
            list.toggle_range(&id, a, b).unwrap();
            list.toggle_range(&id, a, b).unwrap();
            prop_assert_eq!(list, original);
        }

        #[test]
        fn ordering_is_consistent_with_equality(n1 in 1usize..4, n2 in 1usize..4, m1 in 1usize..4, m2 in 1usize..4) {
            let a = centres([n1, n2, 1]);
            let b = centres([m1, m2, 1]);
            prop_assert_eq!(a == b, (n1, n2) == (m1, m2));
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }
    }
}
