//! Interval sets over `i32`, used for character/token classes and FOLLOW sets.
//!
//! An `IntervalSet` is kept as an ordered sequence of disjoint, non-adjacent
//! closed intervals `[a, b]`. Every mutation re-establishes that invariant so
//! that `contains` can binary-search and iteration yields values in order.

use std::fmt;

/// A closed interval `[start, stop]`, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: i32,
    pub stop: i32,
}

impl Interval {
    pub const fn new(start: i32, stop: i32) -> Self {
        Self { start, stop }
    }

    #[inline]
    pub fn len(&self) -> i64 {
        self.stop as i64 - self.start as i64 + 1
    }

    #[inline]
    pub fn contains(&self, v: i32) -> bool {
        v >= self.start && v <= self.stop
    }

    /// Two intervals merge into one if they overlap or touch (`a.stop + 1 == b.start`).
    fn adjacent_or_overlapping(&self, other: &Interval) -> bool {
        self.start <= other.stop.saturating_add(1) && other.start <= self.stop.saturating_add(1)
    }
}

/// Sentinel representing end-of-file in character/token interval sets.
pub const EOF: i32 = -1;

/// An ordered, disjoint, non-adjacent set of `i32` intervals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(start: i32, stop: i32) -> Self {
        let mut set = Self::new();
        set.add(start, stop);
        set
    }

    pub fn single(v: i32) -> Self {
        Self::of(v, v)
    }

    /// Insert `[start, stop]`, merging with any overlapping or adjacent interval.
    ///
    /// Idempotent and commutative: the intervals present after any sequence
    /// of `add` calls depend only on the multiset of ranges added, not on
    /// call order.
    pub fn add(&mut self, start: i32, stop: i32) {
        debug_assert!(start <= stop);
        let incoming = Interval::new(start, stop);

        // Find insertion point: first interval whose start is >= incoming.start - 1
        // isn't quite right for merging from the left, so scan linearly — interval
        // sets in grammars are small (dozens of ranges), this is not a hot path
        // outside of deserialization.
        let mut merged = incoming;
        let mut i = 0;
        while i < self.intervals.len() {
            let cur = self.intervals[i];
            if merged.adjacent_or_overlapping(&cur) {
                merged = Interval::new(merged.start.min(cur.start), merged.stop.max(cur.stop));
                self.intervals.remove(i);
                // Restart the scan from 0: the merged interval may now also
                // touch an interval we already passed (ranges are added out
                // of order during deserialization).
                i = 0;
                continue;
            }
            i += 1;
        }

        let pos = self
            .intervals
            .binary_search_by_key(&merged.start, |iv| iv.start)
            .unwrap_or_else(|p| p);
        self.intervals.insert(pos, merged);
    }

    pub fn add_one(&mut self, v: i32) {
        self.add(v, v);
    }

    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add(iv.start, iv.stop);
        }
    }

    pub fn contains(&self, v: i32) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if v < iv.start {
                    std::cmp::Ordering::Greater
                } else if v > iv.stop {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Total count of integers covered by the set.
    pub fn size(&self) -> i64 {
        self.intervals.iter().map(Interval::len).sum()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Union: values in `self` or `other`.
    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        result.add_set(other);
        result
    }

    /// Intersection: values in both `self` and `other`.
    pub fn and(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        for a in &self.intervals {
            for b in &other.intervals {
                let start = a.start.max(b.start);
                let stop = a.stop.min(b.stop);
                if start <= stop {
                    result.add(start, stop);
                }
            }
        }
        result
    }

    /// Complement within `[min, max]`: values in `[min, max]` not in `self`.
    pub fn complement(&self, min: i32, max: i32) -> IntervalSet {
        let mut result = IntervalSet::new();
        let mut cursor = min;
        for iv in &self.intervals {
            if iv.start > cursor {
                result.add(cursor, iv.start - 1);
            }
            cursor = iv.stop.saturating_add(1);
            if cursor > max {
                return result;
            }
        }
        if cursor <= max {
            result.add(cursor, max);
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals
            .iter()
            .flat_map(|iv| iv.start..=iv.stop)
    }
}

impl fmt::Display for IntervalSet {
    /// Matches the reference textual form: a lone element prints bare, a
    /// multi-element set is braced and comma-separated, ranges use `a..b`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.len() == 1 && self.intervals[0].len() == 1 {
            return write!(f, "{}", self.intervals[0].start);
        }

        let body = self
            .intervals
            .iter()
            .map(|iv| {
                if iv.start == iv.stop {
                    iv.start.to_string()
                } else {
                    format!("{}..{}", iv.start, iv.stop)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        if self.intervals.len() == 1 {
            write!(f, "{body}")
        } else {
            write!(f, "{{{body}}}")
        }
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = IntervalSet::new();
        for v in iter {
            set.add_one(v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_single_element() {
        let mut s = IntervalSet::new();
        s.add(42, 42);
        assert_eq!(s.to_string(), "42");
    }

    #[test]
    fn text_form_mixed_set() {
        let mut s = IntervalSet::new();
        s.add_one(1);
        s.add(97, 122);
        s.add(48, 57);
        assert_eq!(s.to_string(), "{1, 48..57, 97..122}");
    }

    #[test]
    fn merges_adjacent_ranges_regardless_of_order() {
        let mut a = IntervalSet::new();
        a.add(1, 3);
        a.add(5, 7);
        a.add(4, 5);
        assert_eq!(a.to_string(), "1..7");

        let mut b = IntervalSet::new();
        b.add(4, 5);
        b.add(5, 7);
        b.add(1, 3);
        assert_eq!(b.to_string(), "1..7");
    }

    #[test]
    fn contains_uses_binary_search() {
        let mut s = IntervalSet::new();
        s.add(10, 20);
        s.add(30, 40);
        assert!(s.contains(15));
        assert!(s.contains(30));
        assert!(!s.contains(25));
        assert!(!s.contains(41));
    }

    #[test]
    fn complement_fills_gaps() {
        let mut s = IntervalSet::new();
        s.add(5, 10);
        let c = s.complement(0, 15);
        assert_eq!(c.to_string(), "{0..4, 11..15}");
    }

    #[test]
    fn and_computes_intersection() {
        let mut a = IntervalSet::new();
        a.add(0, 10);
        let mut b = IntervalSet::new();
        b.add(5, 15);
        assert_eq!(a.and(&b).to_string(), "5..10");
    }

    #[test]
    fn size_sums_interval_lengths() {
        let mut s = IntervalSet::new();
        s.add(1, 3);
        s.add(10, 10);
        assert_eq!(s.size(), 4);
    }
}
