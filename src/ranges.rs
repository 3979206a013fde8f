//! Sorted set of disjoint integer ranges
// (c) 2024 Ross Younger

use std::ops::Range;

/// A set of u64 values stored as sorted, disjoint, half-open ranges.
///
/// This is how acknowledged packet numbers are represented. ACK frames usually hold
/// very few ranges (packet numbers are consecutive unless there was reordering or loss),
/// so a flat vector is the right shape.
///
/// Insertion keeps the ranges sorted by start and merges any range that overlaps or
/// touches a neighbour, so no two stored ranges ever overlap or abut.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RangeSet(Vec<Range<u64>>);

impl RangeSet {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from qlog-style inclusive pairs: `[n]` or `[start, end]`.
    ///
    /// Returns `None` if any entry has the wrong arity, has `end < start`, or ends at `u64::MAX`.
    #[must_use]
    pub fn from_inclusive_pairs<'a, I>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [u64]>,
    {
        let mut set = Self::new();
        for pair in pairs {
            let range = match *pair {
                [n] => n..n.checked_add(1)?,
                [start, end] if end >= start => start..end.checked_add(1)?,
                _ => return None,
            };
            let _ = set.insert(range);
        }
        Some(set)
    }

    /// Iterates the stored ranges in ascending order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Range<u64>> + '_ {
        self.0.iter().cloned()
    }

    /// Iterates every element, lowest first
    pub fn elements(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().flatten()
    }

    /// Iterates every element, highest first
    pub fn elements_rev(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().rev().flat_map(Iterator::rev)
    }

    /// Number of stored ranges (not elements)
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Is the set empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Are there gaps between the acknowledged ranges?
    #[must_use]
    pub fn has_missing_ranges(&self) -> bool {
        self.0.len() >= 2
    }

    /// Smallest element
    #[must_use]
    pub fn lowest(&self) -> Option<u64> {
        self.0.first().map(|r| r.start)
    }

    /// Largest element
    #[must_use]
    pub fn highest(&self) -> Option<u64> {
        self.0.last().map(|r| r.end - 1)
    }

    /// Finds the stored range holding `x`, with its index
    #[must_use]
    pub fn containing_range(&self, x: u64) -> Option<(usize, Range<u64>)> {
        // first range which ends beyond x; it holds x iff it also starts at or before x
        let idx = self.0.partition_point(|r| r.end <= x);
        self.0
            .get(idx)
            .filter(|r| r.start <= x)
            .map(|r| (idx, r.clone()))
    }

    /// Membership test
    #[must_use]
    pub fn contains(&self, x: u64) -> bool {
        self.containing_range(x).is_some()
    }

    /// Inserts a single value
    pub fn insert_one(&mut self, x: u64) -> bool {
        self.insert(x..x + 1)
    }

    /// Inserts a range, merging with any overlapping or adjacent ranges.
    ///
    /// Returns true if the set changed.
    pub fn insert(&mut self, x: Range<u64>) -> bool {
        if x.is_empty() {
            return false;
        }
        // ranges entirely before x (not even touching)
        let lo = self.0.partition_point(|r| r.end < x.start);
        // ranges starting at or before x.end touch or overlap x
        let hi = self.0.partition_point(|r| r.start <= x.end);
        if lo == hi {
            self.0.insert(lo, x);
            return true;
        }
        let start = x.start.min(self.0[lo].start);
        let end = x.end.max(self.0[hi - 1].end);
        if hi - lo == 1 && self.0[lo] == (start..end) {
            // already fully covered
            return false;
        }
        let _ = self.0.drain(lo + 1..hi);
        self.0[lo] = start..end;
        true
    }
}

impl FromIterator<Range<u64>> for RangeSet {
    fn from_iter<T: IntoIterator<Item = Range<u64>>>(iter: T) -> Self {
        let mut set = Self::new();
        for r in iter {
            let _ = set.insert(r);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::RangeSet;

    fn assert_invariants(set: &RangeSet) {
        let ranges: Vec<_> = set.iter().collect();
        for r in &ranges {
            assert!(r.start < r.end, "empty range stored: {r:?}");
        }
        for pair in ranges.windows(2) {
            assert!(
                pair[0].end < pair[1].start,
                "ranges overlap or touch: {pair:?}"
            );
        }
    }

    #[test]
    fn empty() {
        let set = RangeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.lowest(), None);
        assert_eq!(set.highest(), None);
        assert!(!set.contains(0));
        assert_eq!(set.containing_range(0), None);
        assert_eq!(set.elements_rev().next(), None);
    }

    #[test]
    fn inclusive_pairs() {
        let pairs: Vec<Vec<u64>> = vec![vec![7, 9], vec![1], vec![3, 4]];
        let set = RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice)).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1..2, 3..5, 7..10]);
        assert_eq!(set.lowest(), Some(1));
        assert_eq!(set.highest(), Some(9));
        assert!(set.has_missing_ranges());
        assert_invariants(&set);
    }

    #[test]
    fn bad_pairs() {
        let pairs: Vec<Vec<u64>> = vec![vec![1, 2, 3]];
        assert!(RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice)).is_none());
        let pairs: Vec<Vec<u64>> = vec![vec![5, 4]];
        assert!(RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice)).is_none());
        let pairs: Vec<Vec<u64>> = vec![vec![]];
        assert!(RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice)).is_none());
        // no half-open upper bound exists
        let pairs: Vec<Vec<u64>> = vec![vec![u64::MAX]];
        assert!(RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice)).is_none());
        let pairs: Vec<Vec<u64>> = vec![vec![1, u64::MAX]];
        assert!(RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice)).is_none());
    }

    #[test]
    fn merge_overlapping_and_adjacent() {
        let mut set = RangeSet::new();
        assert!(set.insert(10..20));
        assert!(set.insert(30..40));
        assert!(set.insert(20..25)); // touches the first
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![10..25, 30..40]);
        assert!(set.insert(5..35)); // swallows both
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5..40]);
        assert!(!set.insert(6..8)); // already covered
        assert!(!set.insert(9..9)); // empty
        assert_invariants(&set);
    }

    #[test]
    fn insert_in_order() {
        let mut set = RangeSet::new();
        for x in [50, 10, 30, 11, 49, 70] {
            let _ = set.insert_one(x);
            assert_invariants(&set);
        }
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![10..12, 30..31, 49..51, 70..71]
        );
    }

    #[test]
    fn containing() {
        let set: RangeSet = [1..3, 5..8, 10..11].into_iter().collect();
        assert_eq!(set.containing_range(0), None);
        assert_eq!(set.containing_range(1), Some((0, 1..3)));
        assert_eq!(set.containing_range(2), Some((0, 1..3)));
        assert_eq!(set.containing_range(3), None);
        assert_eq!(set.containing_range(7), Some((1, 5..8)));
        assert_eq!(set.containing_range(10), Some((2, 10..11)));
        assert_eq!(set.containing_range(11), None);
        assert!(set.contains(6));
        assert!(!set.contains(9));
    }

    #[test]
    fn element_iteration() {
        let set: RangeSet = [1..3, 5..7].into_iter().collect();
        assert_eq!(set.elements().collect::<Vec<_>>(), vec![1, 2, 5, 6]);
        assert_eq!(set.elements_rev().collect::<Vec<_>>(), vec![6, 5, 2, 1]);
    }

    #[test]
    fn pseudo_random_inserts_keep_invariants() {
        // simple LCG so the test is deterministic
        let mut seed = 0x2545_f491_u64;
        let mut set = RangeSet::new();
        let mut reference = std::collections::BTreeSet::new();
        for _ in 0..500 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let start = (seed >> 33) % 200;
            let len = (seed >> 20) % 6;
            let _ = set.insert(start..start + len);
            reference.extend(start..start + len);
            assert_invariants(&set);
        }
        assert_eq!(
            set.elements().collect::<Vec<_>>(),
            reference.into_iter().collect::<Vec<_>>()
        );
    }
}
