//! Sets of integers stored as disjoint closed ranges.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use itertools::Itertools;

/// An ordered set of integers kept as sorted, disjoint, non-adjacent closed
/// ranges: `[1,3]` and `[4,6]` are always stored as `[1,6]`.
///
/// Ranges passed with `start > stop` are treated as `[stop, start]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MultiRange {
    ranges: Vec<(i64, i64)>,
}

impl MultiRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored ranges in ascending order.
    #[inline]
    pub fn ranges(&self) -> &[(i64, i64)] {
        &self.ranges
    }

    #[inline]
    pub fn number_of_ranges(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Count of integers in the set.
    pub fn number_of_values(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(a, b)| b.abs_diff(a).saturating_add(1))
            .fold(0u64, u64::saturating_add)
    }

    pub fn contains(&self, value: i64) -> bool {
        self.find(value).is_ok()
    }

    /// True if any integer of `[start, stop]` is in the set.
    pub fn intersects(&self, start: i64, stop: i64) -> bool {
        let (start, stop) = ordered(start, stop);
        self.ranges.iter().any(|&(a, b)| a <= stop && b >= start)
    }

    /// Adds every integer of `[start, stop]`.
    pub fn add_range(&mut self, start: i64, stop: i64) {
        let (mut start, mut stop) = ordered(start, stop);
        // ranges overlapping or touching [start, stop] are absorbed
        let first = self
            .ranges
            .partition_point(|&(_, b)| b < start.saturating_sub(1));
        let last = self
            .ranges
            .partition_point(|&(a, _)| a <= stop.saturating_add(1));
        if first < last {
            start = start.min(self.ranges[first].0);
            stop = stop.max(self.ranges[last - 1].1);
        }
        self.ranges.splice(first..last, [(start, stop)]);
        self.debug_assert_invariants();
    }

    /// Removes every integer of `[start, stop]`.
    pub fn remove_range(&mut self, start: i64, stop: i64) {
        let (start, stop) = ordered(start, stop);
        let first = self.ranges.partition_point(|&(_, b)| b < start);
        let last = self.ranges.partition_point(|&(a, _)| a <= stop);
        if first >= last {
            return;
        }
        let mut kept = Vec::with_capacity(2);
        let (a, _) = self.ranges[first];
        if a < start {
            kept.push((a, start - 1));
        }
        let (_, b) = self.ranges[last - 1];
        if b > stop {
            kept.push((stop + 1, b));
        }
        self.ranges.splice(first..last, kept);
        self.debug_assert_invariants();
    }

    /// Flips membership of every integer of `[start, stop]`.
    pub fn toggle_range(&mut self, start: i64, stop: i64) {
        let (start, stop) = ordered(start, stop);
        let mut gaps = Vec::new();
        let mut next = Some(start);
        for &(a, b) in &self.ranges {
            let Some(from) = next else { break };
            if b < from {
                continue;
            }
            if a > stop {
                break;
            }
            if a > from {
                gaps.push((from, a - 1));
            }
            next = b.checked_add(1).filter(|&v| v <= stop);
        }
        if let Some(from) = next {
            gaps.push((from, stop));
        }
        self.remove_range(start, stop);
        for (a, b) in gaps {
            self.add_range(a, b);
        }
    }

    /// Adds every range of `other`.
    pub fn union_with(&mut self, other: &MultiRange) {
        for &(a, b) in &other.ranges {
            self.add_range(a, b);
        }
    }

    /// Removes every range of `other`.
    pub fn subtract(&mut self, other: &MultiRange) {
        for &(a, b) in &other.ranges {
            self.remove_range(a, b);
        }
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// All integers in the set, ascending.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.ranges.iter().flat_map(|&(a, b)| a..=b)
    }

    fn find(&self, value: i64) -> Result<usize, usize> {
        let i = self.ranges.partition_point(|&(_, b)| b < value);
        match self.ranges.get(i) {
            Some(&(a, _)) if a <= value => Ok(i),
            _ => Err(i),
        }
    }
}

fn ordered(start: i64, stop: i64) -> (i64, i64) {
    if start <= stop { (start, stop) } else { (stop, start) }
}

impl DebugInvariants for MultiRange {
    const LABEL: &'static str = "MultiRange";

    fn validate_invariants(&self) -> Result<(), MeshError> {
        if let Some(&(a, b)) = self.ranges.iter().find(|(a, b)| a > b) {
            return Err(MeshError::InvalidRange {
                start: a,
                stop: b,
                limit: b,
            });
        }
        for ((_, b0), (a1, b1)) in self.ranges.iter().tuple_windows() {
            if b0.saturating_add(1) >= *a1 {
                return Err(MeshError::InvalidRange {
                    start: *a1,
                    stop: *b1,
                    limit: *b0,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn from(ranges: &[(i64, i64)]) -> MultiRange {
        let mut m = MultiRange::new();
        for &(a, b) in ranges {
            m.add_range(a, b);
        }
        m
    }

    #[test]
    fn adjacent_ranges_merge() {
        let m = from(&[(1, 3), (4, 6), (10, 12)]);
        assert_eq!(m.ranges(), &[(1, 6), (10, 12)]);
        assert_eq!(m.number_of_values(), 9);
        let m = from(&[(10, 12), (1, 3), (5, 9)]);
        assert_eq!(m.ranges(), &[(1, 3), (5, 12)]);
    }

    #[test]
    fn remove_splits() {
        let mut m = from(&[(0, 10)]);
        m.remove_range(3, 5);
        assert_eq!(m.ranges(), &[(0, 2), (6, 10)]);
        m.remove_range(0, 0);
        m.remove_range(10, 20);
        assert_eq!(m.ranges(), &[(1, 2), (6, 9)]);
        m.remove_range(-5, 100);
        assert!(m.is_empty());
    }

    #[test]
    fn toggle_flips_each_value() {
        let mut m = from(&[(2, 4), (8, 9)]);
        m.toggle_range(0, 10);
        assert_eq!(m.ranges(), &[(0, 1), (5, 7), (10, 10)]);
        assert!(m.contains(6));
        assert!(!m.contains(8));
        assert!(m.intersects(9, 12));
        assert!(!m.intersects(8, 9));
    }

    #[test]
    fn reversed_bounds_are_ordered() {
        let m = from(&[(5, 2)]);
        assert_eq!(m.ranges(), &[(2, 5)]);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let mut m = from(&[(i64::MAX - 1, i64::MAX), (i64::MIN, i64::MIN + 1)]);
        m.toggle_range(i64::MAX - 2, i64::MAX);
        assert_eq!(m.ranges(), &[(i64::MIN, i64::MIN + 1), (i64::MAX - 2, i64::MAX - 2)]);
    }

    fn reference(ops: &[(u8, i64, i64)]) -> BTreeSet<i64> {
        let mut set = BTreeSet::new();
        for &(op, a, b) in ops {
            let (a, b) = ordered(a, b);
            for v in a..=b {
                match op % 3 {
                    0 => {
                        set.insert(v);
                    }
                    1 => {
                        set.remove(&v);
                    }
                    _ => {
                        if !set.remove(&v) {
                            set.insert(v);
                        }
                    }
                }
            }
        }
        set
    }

    proptest! {
        #[test]
        fn matches_a_plain_set(ops in proptest::collection::vec((0u8..3, 0i64..40, 0i64..40), 0..30)) {
            let mut m = MultiRange::new();
            for &(op, a, b) in &ops {
                match op {
                    0 => m.add_range(a, b),
                    1 => m.remove_range(a, b),
                    _ => m.toggle_range(a, b),
                }
            }
            prop_assert!(m.validate_invariants().is_ok());
            let got: Vec<i64> = m.values().collect();
            let expected: Vec<i64> = reference(&ops).into_iter().collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn add_is_idempotent(seed in proptest::collection::vec((0i64..50, 0i64..50), 0..8), a in 0i64..50, b in 0i64..50) {
            let mut once = from(&seed);
            once.add_range(a, b);
            let mut twice = once.clone();
            twice.add_range(a, b);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn toggle_is_an_involution(seed in proptest::collection::vec((0i64..50, 0i64..50), 0..8), a in 0i64..50, b in 0i64..50) {
            let original = from(&seed);
            let mut m = original.clone();
            m.toggle_range(a, b);
            m.toggle_range(a, b);
            prop_assert_eq!(m, original);
        }
    }
}
