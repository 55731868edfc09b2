// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # Dynamic Interval Tree
//!
//! A *dynamic interval tree* is a balanced binary search tree storing
//! intervals so that both point queries (intervals containing a query
//! point) and overlap queries (intervals overlapping a query interval)
//! complete in O(log(n) + k) time, where n is the number of stored
//! intervals and k is the size of the result set. Insertion and deletion
//! complete in O(log(n)); space is linear.
//!
//! Every node carries the *span* of its subtree: the minimum low and
//! maximum high endpoint (with closure flags, a closed bound dominating an
//! open bound at the same coordinate) over the node's own interval and
//! both children's spans. Queries prune a subtree as soon as its span
//! cannot contain the query point or reach the query interval. The span is
//! maintained through the engine's augmentation hooks, so it stays exact
//! across every rotation and fixup.
//!
//! Closed, open, and half-open intervals are all supported.

use crate::rbtree::{Augment, Iter, NaturalOrder, NodeId, RedBlackTree};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::marker::PhantomData;
use trellis_core::interval::Interval;

/// The closure-aware minimum-low/maximum-high summary of a subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span<U> {
    low: U,
    closed_on_low: bool,
    high: U,
    closed_on_high: bool,
}

impl<U> Span<U>
where
    U: Ord + Clone,
{
    fn of(interval: &Interval<U>) -> Self {
        Self {
            low: interval.low().clone(),
            closed_on_low: interval.is_closed_on_low(),
            high: interval.high().clone(),
            closed_on_high: interval.is_closed_on_high(),
        }
    }

    /// Widens this span to cover a child subtree's span. A closed bound
    /// dominates an open bound at the same coordinate.
    fn absorb(&mut self, child: &Self) {
        match child.low.cmp(&self.low) {
            Ordering::Less => {
                self.low = child.low.clone();
                self.closed_on_low = child.closed_on_low;
            }
            Ordering::Equal if child.closed_on_low => self.closed_on_low = true,
            _ => {}
        }
        match child.high.cmp(&self.high) {
            Ordering::Greater => {
                self.high = child.high.clone();
                self.closed_on_high = child.closed_on_high;
            }
            Ordering::Equal if child.closed_on_high => self.closed_on_high = true,
            _ => {}
        }
    }

    /// Returns the minimum low endpoint of the summarized subtree.
    #[inline]
    pub fn low(&self) -> &U {
        &self.low
    }

    /// Returns the maximum high endpoint of the summarized subtree.
    #[inline]
    pub fn high(&self) -> &U {
        &self.high
    }

    /// Returns `true` if some interval in the subtree attains the span's
    /// low endpoint with a closed bound.
    #[inline]
    pub fn is_closed_on_low(&self) -> bool {
        self.closed_on_low
    }

    /// Returns `true` if some interval in the subtree attains the span's
    /// high endpoint with a closed bound.
    #[inline]
    pub fn is_closed_on_high(&self) -> bool {
        self.closed_on_high
    }

    /// Tests whether the span's high end reaches up to `point`; an equal
    /// bound counts only when the span is closed there and the comparison
    /// is inclusive.
    #[inline]
    fn high_reaches(&self, point: &U, inclusive: bool) -> bool {
        match self.high.cmp(point) {
            Ordering::Greater => true,
            Ordering::Equal => inclusive && self.closed_on_high,
            Ordering::Less => false,
        }
    }

    /// Tests whether the span's low end reaches down to `point`.
    #[inline]
    fn low_reaches(&self, point: &U, inclusive: bool) -> bool {
        match self.low.cmp(point) {
            Ordering::Less => true,
            Ordering::Equal => inclusive && self.closed_on_low,
            Ordering::Greater => false,
        }
    }
}

/// Augmentation strategy maintaining a [`Span`] per node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpanAugment<U>(PhantomData<U>);

impl<U> Default for SpanAugment<U> {
    #[inline]
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<U> Augment<Interval<U>> for SpanAugment<U>
where
    U: Ord + Clone,
{
    type Data = Span<U>;

    fn seed(&self, value: &Interval<U>) -> Self::Data {
        Span::of(value)
    }

    fn refresh(
        &self,
        value: &Interval<U>,
        left: Option<&Self::Data>,
        right: Option<&Self::Data>,
    ) -> Self::Data {
        let mut span = Span::of(value);
        if let Some(left) = left {
            span.absorb(left);
        }
        if let Some(right) = right {
            span.absorb(right);
        }
        span
    }
}

/// A balanced interval tree supporting arbitrary insertion and deletion.
///
/// Intervals are stored under their natural order (low endpoint, closed
/// sorting before open at equal low, then the interval's remaining total
/// order), so equal-low intervals with different highs or closures
/// coexist. Structurally equal intervals are rejected as duplicates.
///
/// # Examples
///
/// ```rust
/// # use trellis_tree::dynamic::DynamicIntervalTree;
/// use trellis_core::interval::Interval;
///
/// let mut tree = DynamicIntervalTree::new();
/// tree.insert(Interval::closed(0, 100));
/// tree.insert(Interval::closed(50, 150));
/// tree.insert(Interval::closed(200, 300));
///
/// let hits = tree.containing_intervals(&75);
/// assert_eq!(hits.len(), 2);
///
/// let overlaps = tree.overlapping_intervals(&Interval::closed(140, 210));
/// assert_eq!(overlaps.len(), 2);
/// ```
pub struct DynamicIntervalTree<U>
where
    U: Ord + Clone,
{
    tree: RedBlackTree<Interval<U>, NaturalOrder, SpanAugment<U>>,
}

impl<U> DynamicIntervalTree<U>
where
    U: Ord + Clone,
{
    /// Creates a new, empty tree.
    #[inline]
    pub fn new() -> Self {
        Self {
            tree: RedBlackTree::new(),
        }
    }

    /// Returns the number of intervals stored in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the tree holds no intervals.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Clears the contents of the tree.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Inserts the specified interval.
    ///
    /// Returns `true` if an element was inserted as a result of this
    /// call, `false` if a structurally equal interval is already present.
    #[inline]
    pub fn insert(&mut self, interval: Interval<U>) -> bool {
        self.tree.insert(interval).is_some()
    }

    /// Deletes the specified interval.
    ///
    /// Returns `true` if an element was deleted as a result of this call.
    #[inline]
    pub fn delete(&mut self, interval: &Interval<U>) -> bool {
        self.tree.delete(interval).is_some()
    }

    /// Tests whether the specified interval is stored in the tree.
    #[inline]
    pub fn contains(&self, interval: &Interval<U>) -> bool {
        self.tree.contains(interval)
    }

    /// Returns an ascending iterator over the stored intervals.
    #[inline]
    pub fn iter(&self) -> Iter<'_, Interval<U>, NaturalOrder, SpanAugment<U>> {
        self.tree.iter()
    }

    /// Fetches all intervals containing the specified point.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trellis_tree::dynamic::DynamicIntervalTree;
    /// use trellis_core::interval::Interval;
    ///
    /// let mut tree = DynamicIntervalTree::new();
    /// tree.insert(Interval::closed_open(0, 10));
    /// tree.insert(Interval::closed(10, 20));
    ///
    /// assert_eq!(tree.containing_intervals(&10), vec![&Interval::closed(10, 20)]);
    /// ```
    pub fn containing_intervals(&self, point: &U) -> Vec<&Interval<U>> {
        let mut result = Vec::new();
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        if let Some(root) = self.tree.root() {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            let interval = self.tree.value_of(id);
            if interval.contains_point(point) {
                result.push(interval);
            }
            if let Some(left) = self.tree.left(id) {
                if self.span(left).high_reaches(point, true) {
                    stack.push(left);
                }
            }
            if let Some(right) = self.tree.right(id) {
                if self.span(right).low_reaches(point, true) {
                    stack.push(right);
                }
            }
        }
        result
    }

    /// Fetches all intervals overlapping the specified interval.
    pub fn overlapping_intervals(&self, query: &Interval<U>) -> Vec<&Interval<U>> {
        let mut result = Vec::new();
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        if let Some(root) = self.tree.root() {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            let interval = self.tree.value_of(id);
            if interval.overlaps(query) {
                result.push(interval);
            }
            if let Some(left) = self.tree.left(id) {
                if self
                    .span(left)
                    .high_reaches(query.low(), query.is_closed_on_low())
                {
                    stack.push(left);
                }
            }
            if let Some(right) = self.tree.right(id) {
                if self
                    .span(right)
                    .low_reaches(query.high(), query.is_closed_on_high())
                {
                    stack.push(right);
                }
            }
        }
        result
    }

    /// Fetches a *witness*: some interval containing the specified point,
    /// if any exists. Which matching interval is returned is unspecified;
    /// use [`DynamicIntervalTree::containing_intervals`] to enumerate.
    ///
    /// Completes in O(log(n)) regardless of how many intervals match.
    pub fn find_containing_interval(&self, point: &U) -> Option<&Interval<U>> {
        let mut current = self.tree.root();
        while let Some(id) = current {
            let interval = self.tree.value_of(id);
            if interval.contains_point(point) {
                return Some(interval);
            }
            current = self.tree.right(id);
            if let Some(left) = self.tree.left(id) {
                if self.span(left).high_reaches(point, true) {
                    current = Some(left);
                }
            }
        }
        None
    }

    /// Fetches a *witness*: some interval overlapping the specified
    /// query interval, if any exists.
    ///
    /// Completes in O(log(n)) regardless of how many intervals match.
    pub fn find_overlapping_interval(&self, query: &Interval<U>) -> Option<&Interval<U>> {
        let mut current = self.tree.root();
        while let Some(id) = current {
            let interval = self.tree.value_of(id);
            if interval.overlaps(query) {
                return Some(interval);
            }
            current = self.tree.right(id);
            if let Some(left) = self.tree.left(id) {
                if self
                    .span(left)
                    .high_reaches(query.low(), query.is_closed_on_low())
                {
                    current = Some(left);
                }
            }
        }
        None
    }

    #[inline]
    fn span(&self, id: NodeId) -> &Span<U> {
        self.tree
            .data(id)
            .expect("a structurally reachable node has span data")
    }
}

impl<U> Default for DynamicIntervalTree<U>
where
    U: Ord + Clone,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<U> std::fmt::Debug for DynamicIntervalTree<U>
where
    U: Ord + Clone + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rustc_hash::FxHashSet;

    /// Builds the four canonical populations: twenty intervals of width
    /// 100 (ten aligned, ten offset by 50) per closure combination.
    fn master(closed_on_low: bool, closed_on_high: bool) -> Vec<Interval<i64>> {
        let width = 100;
        let mut intervals = Vec::new();
        for j in 0..10 {
            let low = width * j;
            intervals.push(Interval::new(low, closed_on_low, low + width, closed_on_high));
            intervals.push(Interval::new(
                low + width / 2,
                closed_on_low,
                low + width + width / 2,
                closed_on_high,
            ));
        }
        intervals
    }

    fn tree_of(intervals: &[Interval<i64>]) -> DynamicIntervalTree<i64> {
        let mut tree = DynamicIntervalTree::new();
        for interval in intervals {
            assert!(tree.insert(interval.clone()));
        }
        tree
    }

    fn oracle_containing<'a>(
        intervals: &'a [Interval<i64>],
        point: &i64,
    ) -> FxHashSet<&'a Interval<i64>> {
        intervals.iter().filter(|i| i.contains_point(point)).collect()
    }

    fn oracle_overlapping<'a>(
        intervals: &'a [Interval<i64>],
        query: &Interval<i64>,
    ) -> FxHashSet<&'a Interval<i64>> {
        intervals.iter().filter(|i| i.overlaps(query)).collect()
    }

    fn assert_spans_exact(tree: &DynamicIntervalTree<i64>) {
        let mut stack = Vec::new();
        if let Some(root) = tree.tree.root() {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            let mut expected = Span::of(tree.tree.value_of(id));
            if let Some(left) = tree.tree.left(id) {
                expected.absorb(tree.span(left));
                stack.push(left);
            }
            if let Some(right) = tree.tree.right(id) {
                expected.absorb(tree.span(right));
                stack.push(right);
            }
            assert_eq!(tree.span(id), &expected, "stale span");
        }
    }

    #[test]
    fn test_insert_delete_reports() {
        let mut tree = DynamicIntervalTree::new();
        assert!(tree.insert(Interval::closed(0, 10)));
        assert!(!tree.insert(Interval::closed(0, 10)));
        assert_eq!(tree.len(), 1);
        assert!(tree.delete(&Interval::closed(0, 10)));
        assert!(!tree.delete(&Interval::closed(0, 10)));
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn test_equal_low_different_closures_coexist() {
        let mut tree = DynamicIntervalTree::new();
        assert!(tree.insert(Interval::closed(0, 10)));
        assert!(tree.insert(Interval::open(0, 10)));
        assert!(tree.insert(Interval::closed_open(0, 10)));
        assert!(tree.insert(Interval::open_closed(0, 10)));
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.containing_intervals(&0).len(), 2);
        assert_eq!(tree.containing_intervals(&10).len(), 2);
        assert_eq!(tree.containing_intervals(&5).len(), 4);
    }

    #[test]
    fn test_point_query_shared_endpoint() {
        // [0, 100] and [50, 150]: the point 75 is inside both; the point
        // 100 is in both while the first is closed on high, but leaves
        // only the second when the first is half-open.
        let mut tree = DynamicIntervalTree::new();
        tree.insert(Interval::closed(0, 100));
        tree.insert(Interval::closed(50, 150));
        assert_eq!(tree.containing_intervals(&75).len(), 2);
        assert_eq!(tree.containing_intervals(&100).len(), 2);

        let mut tree = DynamicIntervalTree::new();
        tree.insert(Interval::closed_open(0, 100));
        tree.insert(Interval::closed(50, 150));
        let hits = tree.containing_intervals(&100);
        assert_eq!(hits, vec![&Interval::closed(50, 150)]);
    }

    #[test]
    fn test_containing_matches_oracle() {
        for (closed_on_low, closed_on_high) in
            [(true, true), (false, true), (true, false), (false, false)]
        {
            let intervals = master(closed_on_low, closed_on_high);
            let tree = tree_of(&intervals);
            for point in (0..1_100).step_by(25) {
                let got: FxHashSet<_> = tree.containing_intervals(&point).into_iter().collect();
                assert_eq!(got, oracle_containing(&intervals, &point));
            }
        }
    }

    #[test]
    fn test_overlapping_matches_oracle() {
        let populations: Vec<Vec<Interval<i64>>> =
            [(true, true), (false, true), (true, false), (false, false)]
                .into_iter()
                .map(|(l, h)| master(l, h))
                .collect();
        for intervals in &populations {
            let tree = tree_of(intervals);
            for queries in &populations {
                for query in queries {
                    let got: FxHashSet<_> =
                        tree.overlapping_intervals(query).into_iter().collect();
                    assert_eq!(got, oracle_overlapping(intervals, query));
                }
            }
        }
    }

    #[test]
    fn test_witness_queries() {
        let intervals = master(true, true);
        let tree = tree_of(&intervals);
        for point in (0..1_100).step_by(10) {
            let oracle = oracle_containing(&intervals, &point);
            match tree.find_containing_interval(&point) {
                Some(witness) => assert!(oracle.contains(witness)),
                None => assert!(oracle.is_empty()),
            }
        }
        for query in &master(false, false) {
            let oracle = oracle_overlapping(&intervals, query);
            match tree.find_overlapping_interval(query) {
                Some(witness) => assert!(oracle.contains(witness)),
                None => assert!(oracle.is_empty()),
            }
        }
        // Far away from every stored interval.
        assert_eq!(tree.find_containing_interval(&5_000), None);
        assert_eq!(
            tree.find_overlapping_interval(&Interval::closed(5_000, 6_000)),
            None
        );
    }

    #[test]
    fn test_spans_stay_exact_under_churn() {
        let mut rng = StdRng::seed_from_u64(0x51AB);
        let mut tree = DynamicIntervalTree::new();
        let mut stored: Vec<Interval<i64>> = Vec::new();
        for _ in 0..600 {
            if stored.is_empty() || rng.gen_bool(0.65) {
                let low = rng.gen_range(-500..500);
                let interval = Interval::new(
                    low,
                    rng.gen_bool(0.5),
                    low + rng.gen_range(0..250),
                    rng.gen_bool(0.5),
                );
                if tree.insert(interval.clone()) {
                    stored.push(interval);
                }
            } else {
                let victim = stored.swap_remove(rng.gen_range(0..stored.len()));
                assert!(tree.delete(&victim));
            }
            assert_eq!(tree.len(), stored.len());
            assert_spans_exact(&tree);
        }
        // Queries remain exact after the churn.
        for point in (-600..900).step_by(37) {
            let got: FxHashSet<_> = tree.containing_intervals(&point).into_iter().collect();
            assert_eq!(got, oracle_containing(&stored, &point));
        }
    }

    #[test]
    fn test_clear() {
        let intervals = master(true, true);
        let mut tree = tree_of(&intervals);
        assert_eq!(tree.len(), intervals.len());
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.containing_intervals(intervals[0].low()).is_empty());
    }
}
