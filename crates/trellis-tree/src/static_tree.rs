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

//! # Static Interval Tree
//!
//! A *static interval tree* is built once for a pre-specified set of
//! intervals so that point queries and overlap queries complete in
//! O(log(n) + k) time, where n is the size of the set the tree was built
//! for and k is the size of the result set. Construction completes in
//! O(n*log(n)); a built tree consumes linear space.
//!
//! The tree is *semi-static*: the skeleton of points is fixed at build
//! time, but intervals from the build set may be inserted and deleted at
//! will in O(log(n)). Each skeleton node owns four order-linked trees
//! holding the intervals anchored at that node — split by whether the
//! interval contains the node's point, and ordered once by low endpoint
//! and once by high endpoint — so that query scans can stop at the first
//! interval that cannot match.
//!
//! Closed, open, and half-open intervals are all supported. Inserting or
//! deleting an interval that was not part of the build set is not
//! detected; it reports `false` once the descent runs off the skeleton.

use crate::order_linked::OrderLinkedTree;
use crate::rbtree::TreeOrder;
use smallvec::SmallVec;
use std::cmp::Ordering;
use trellis_core::interval::Interval;

/// Orders intervals by ascending low endpoint, ties broken by the
/// interval's total order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LowEndpointOrder;

impl<U> TreeOrder<Interval<U>> for LowEndpointOrder
where
    U: Ord,
{
    fn cmp(&self, lhs: &Interval<U>, rhs: &Interval<U>) -> Ordering {
        lhs.low().cmp(rhs.low()).then_with(|| lhs.cmp(rhs))
    }
}

/// Orders intervals by descending high endpoint, a closed high bound
/// sorting before an open one at the same coordinate, remaining ties
/// broken by the reversed total order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HighEndpointOrder;

impl<U> TreeOrder<Interval<U>> for HighEndpointOrder
where
    U: Ord,
{
    fn cmp(&self, lhs: &Interval<U>, rhs: &Interval<U>) -> Ordering {
        lhs.high()
            .cmp(rhs.high())
            .then_with(|| lhs.is_closed_on_high().cmp(&rhs.is_closed_on_high()))
            .then_with(|| lhs.cmp(rhs))
            .reverse()
    }
}

fn low_admits<U>(interval: &Interval<U>, point: &U, inclusive: bool) -> bool
where
    U: Ord,
{
    match interval.low().cmp(point) {
        Ordering::Less => true,
        Ordering::Equal => inclusive && interval.is_closed_on_low(),
        Ordering::Greater => false,
    }
}

fn high_admits<U>(interval: &Interval<U>, point: &U, inclusive: bool) -> bool
where
    U: Ord,
{
    match interval.high().cmp(point) {
        Ordering::Greater => true,
        Ordering::Equal => inclusive && interval.is_closed_on_high(),
        Ordering::Less => false,
    }
}

/// A skeleton node: an immutable point, immutable children, and the four
/// mutable interval buckets anchored at the point.
///
/// An interval anchored here either contains the point, or touches it
/// only at an open endpoint; the two classes are kept apart so that a
/// query at the point itself takes the whole containing class without
/// inspecting the excluding one.
struct SkeletonNode<U>
where
    U: Ord + Clone,
{
    point: U,
    left: Option<Box<SkeletonNode<U>>>,
    right: Option<Box<SkeletonNode<U>>>,
    low_containing: OrderLinkedTree<Interval<U>, LowEndpointOrder>,
    high_containing: OrderLinkedTree<Interval<U>, HighEndpointOrder>,
    low_excluding: OrderLinkedTree<Interval<U>, LowEndpointOrder>,
    high_excluding: OrderLinkedTree<Interval<U>, HighEndpointOrder>,
}

impl<U> SkeletonNode<U>
where
    U: Ord + Clone,
{
    fn new(point: U) -> Self {
        Self {
            point,
            left: None,
            right: None,
            low_containing: OrderLinkedTree::new(),
            high_containing: OrderLinkedTree::new(),
            low_excluding: OrderLinkedTree::new(),
            high_excluding: OrderLinkedTree::new(),
        }
    }

    fn clear(&mut self) {
        self.low_containing.clear();
        self.high_containing.clear();
        self.low_excluding.clear();
        self.high_excluding.clear();
    }

    fn insert(&mut self, interval: Interval<U>) -> bool {
        if interval.contains_point(&self.point) {
            if !self.low_containing.insert(interval.clone()) {
                return false;
            }
            self.high_containing.insert(interval);
        } else {
            if !self.low_excluding.insert(interval.clone()) {
                return false;
            }
            self.high_excluding.insert(interval);
        }
        true
    }

    fn delete(&mut self, interval: &Interval<U>) -> bool {
        if interval.contains_point(&self.point) {
            if self.low_containing.delete(interval).is_none() {
                return false;
            }
            self.high_containing.delete(interval);
        } else {
            if self.low_excluding.delete(interval).is_none() {
                return false;
            }
            self.high_excluding.delete(interval);
        }
        true
    }

    /// Collects every interval anchored here that contains the point
    /// itself, which is the entire containing class.
    fn collect_at_point<'a>(&'a self, out: &mut Vec<&'a Interval<U>>) {
        out.extend(self.high_containing.iter());
    }

    /// Collects intervals whose low endpoint admits `point`. Called when
    /// `point` lies below this node's point; both low-ordered buckets are
    /// scanned in ascending-low order and the scan stops at the first
    /// interval starting past the point.
    fn collect_reaching_down<'a>(
        &'a self,
        out: &mut Vec<&'a Interval<U>>,
        point: &U,
        inclusive: bool,
    ) {
        for interval in self.low_containing.iter() {
            if !low_admits(interval, point, inclusive) {
                break;
            }
            out.push(interval);
        }
        for interval in self.low_excluding.iter() {
            if !low_admits(interval, point, inclusive) {
                break;
            }
            out.push(interval);
        }
    }

    /// Collects intervals whose high endpoint admits `point`. Called when
    /// `point` lies above this node's point; the high-ordered buckets are
    /// scanned in descending-high order.
    fn collect_reaching_up<'a>(
        &'a self,
        out: &mut Vec<&'a Interval<U>>,
        point: &U,
        inclusive: bool,
    ) {
        for interval in self.high_containing.iter() {
            if !high_admits(interval, point, inclusive) {
                break;
            }
            out.push(interval);
        }
        for interval in self.high_excluding.iter() {
            if !high_admits(interval, point, inclusive) {
                break;
            }
            out.push(interval);
        }
    }

    /// Collects every interval anchored here that overlaps `query`.
    /// By contract `query.low() <= self.point <= query.high()`.
    fn collect_overlapping<'a>(&'a self, out: &mut Vec<&'a Interval<U>>, query: &Interval<U>) {
        if *query.low() == self.point {
            self.collect_reaching_up(out, query.low(), query.is_closed_on_low());
        } else if *query.high() == self.point {
            self.collect_reaching_down(out, query.high(), query.is_closed_on_high());
        } else {
            // The node's point is interior to the query, so everything
            // anchored here overlaps it, excluding class included.
            self.collect_at_point(out);
            out.extend(self.high_excluding.iter());
        }
    }
}

/// A semi-static interval tree over a pre-specified set of intervals.
///
/// [`StaticIntervalTree::build`] fixes the skeleton but stores nothing;
/// each interval of the build set becomes queryable once passed to
/// [`StaticIntervalTree::insert`]. Inserting or deleting intervals
/// outside the build set is an unchecked contract violation.
///
/// # Examples
///
/// ```rust
/// # use trellis_tree::static_tree::StaticIntervalTree;
/// use trellis_core::interval::Interval;
///
/// let intervals = vec![
///     Interval::closed(0, 100),
///     Interval::closed(200, 300),
///     Interval::closed(400, 500),
/// ];
/// let mut tree = StaticIntervalTree::new();
/// tree.build(intervals.iter().cloned());
/// for interval in &intervals {
///     tree.insert(interval.clone());
/// }
///
/// let mut hits = Vec::new();
/// tree.containing_intervals(&mut hits, &250);
/// assert_eq!(hits, vec![&Interval::closed(200, 300)]);
/// ```
pub struct StaticIntervalTree<U>
where
    U: Ord + Clone,
{
    root: Option<Box<SkeletonNode<U>>>,
    len: usize,
}

impl<U> StaticIntervalTree<U>
where
    U: Ord + Clone,
{
    /// Creates a tree with no skeleton; every operation reports nothing
    /// until [`StaticIntervalTree::build`] is called.
    #[inline]
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Returns the number of intervals currently inserted.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no intervals are currently inserted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Builds the skeleton supporting the specified set of intervals.
    ///
    /// The set is expected to contain no structural duplicates. Building
    /// does not insert: the tree is empty afterwards, and each interval
    /// must be passed to [`StaticIntervalTree::insert`] to become
    /// queryable. A previous skeleton and its contents are discarded.
    pub fn build(&mut self, intervals: impl IntoIterator<Item = Interval<U>>) {
        let mut list: Vec<Interval<U>> = intervals.into_iter().collect();
        list.sort_by(|lhs, rhs| lhs.low().cmp(rhs.low()));
        let size = list.len();
        self.root = if size == 0 {
            None
        } else {
            Some(Self::build_subtree(&mut list, 0, size))
        };
        self.len = 0;
    }

    /// Builds the subtree for `list[low..high]`, which must be ordered by
    /// low endpoint.
    fn build_subtree(
        list: &mut Vec<Interval<U>>,
        low: usize,
        high: usize,
    ) -> Box<SkeletonNode<U>> {
        let point = list[(low + high) >> 1].low().clone();

        // Three-way partition around the point: intervals entirely below
        // it move to the front and recurse left; since the list is
        // ordered by low endpoint, the tail starting at the first
        // interval entirely above it recurses right; the rest anchor at
        // this node.
        let mut low_pointer = low;
        let mut high_pointer = high;
        let mut j = low;
        while j < high_pointer {
            if *list[j].high() < point {
                list.swap(low_pointer, j);
                low_pointer += 1;
            } else if *list[j].low() > point {
                high_pointer = j;
            }
            j += 1;
        }

        let mut node = Box::new(SkeletonNode::new(point));
        if low < low_pointer {
            node.left = Some(Self::build_subtree(list, low, low_pointer));
        }
        if high_pointer < high {
            node.right = Some(Self::build_subtree(list, high_pointer, high));
        }
        node
    }

    /// Inserts the specified interval.
    ///
    /// Returns `true` if an element was inserted as a result of this
    /// call; `false` for a duplicate, or when no skeleton node supports
    /// the interval (it was not part of the build set).
    pub fn insert(&mut self, interval: Interval<U>) -> bool {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            if *interval.low() <= node.point && node.point <= *interval.high() {
                // This is the unique node supporting the interval, so a
                // failed bucket insert settles the call.
                if node.insert(interval) {
                    self.len += 1;
                    return true;
                }
                return false;
            } else if *interval.high() < node.point {
                current = node.left.as_deref_mut();
            } else {
                current = node.right.as_deref_mut();
            }
        }
        false
    }

    /// Deletes the specified interval.
    ///
    /// Returns `true` if an element was deleted as a result of this call.
    pub fn delete(&mut self, interval: &Interval<U>) -> bool {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            if *interval.low() <= node.point && node.point <= *interval.high() {
                if node.delete(interval) {
                    self.len -= 1;
                    return true;
                }
                return false;
            } else if *interval.high() < node.point {
                current = node.left.as_deref_mut();
            } else {
                current = node.right.as_deref_mut();
            }
        }
        false
    }

    /// Clears the contents of the tree, leaving the skeleton intact.
    pub fn clear(&mut self) {
        let mut stack: SmallVec<[&mut SkeletonNode<U>; 32]> = SmallVec::new();
        if let Some(root) = self.root.as_deref_mut() {
            stack.push(root);
        }
        while let Some(node) = stack.pop() {
            node.clear();
            if let Some(left) = node.left.as_deref_mut() {
                stack.push(left);
            }
            if let Some(right) = node.right.as_deref_mut() {
                stack.push(right);
            }
        }
        self.len = 0;
    }

    /// Fetches all inserted intervals containing the specified point into
    /// `out`.
    ///
    /// The skeleton is walked root to leaf once; at each node only the
    /// bucket prefix that can still match is scanned.
    pub fn containing_intervals<'a>(&'a self, out: &mut Vec<&'a Interval<U>>, point: &U) {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match point.cmp(&node.point) {
                Ordering::Equal => {
                    node.collect_at_point(out);
                    current = None;
                }
                Ordering::Less => {
                    node.collect_reaching_down(out, point, true);
                    current = node.left.as_deref();
                }
                Ordering::Greater => {
                    node.collect_reaching_up(out, point, true);
                    current = node.right.as_deref();
                }
            }
        }
    }

    /// Fetches all inserted intervals overlapping the specified query
    /// interval into `out`.
    pub fn overlapping_intervals<'a>(
        &'a self,
        out: &mut Vec<&'a Interval<U>>,
        query: &Interval<U>,
    ) {
        let mut stack: SmallVec<[&'a SkeletonNode<U>; 32]> = SmallVec::new();
        if let Some(root) = self.root.as_deref() {
            stack.push(root);
        }
        while let Some(node) = stack.pop() {
            if *query.low() <= node.point && node.point <= *query.high() {
                node.collect_overlapping(out, query);
                if let Some(left) = node.left.as_deref() {
                    stack.push(left);
                }
                if let Some(right) = node.right.as_deref() {
                    stack.push(right);
                }
            } else if *query.high() < node.point {
                node.collect_reaching_down(out, query.high(), query.is_closed_on_high());
                if let Some(left) = node.left.as_deref() {
                    stack.push(left);
                }
            } else {
                node.collect_reaching_up(out, query.low(), query.is_closed_on_low());
                if let Some(right) = node.right.as_deref() {
                    stack.push(right);
                }
            }
        }
    }
}

impl<U> Default for StaticIntervalTree<U>
where
    U: Ord + Clone,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

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

    fn built_tree(intervals: &[Interval<i64>]) -> StaticIntervalTree<i64> {
        let mut tree = StaticIntervalTree::new();
        tree.build(intervals.iter().cloned());
        for interval in intervals {
            assert!(tree.insert(interval.clone()));
        }
        tree
    }

    fn sorted(mut intervals: Vec<Interval<i64>>) -> Vec<Interval<i64>> {
        intervals.sort();
        intervals
    }

    fn query_containing(tree: &StaticIntervalTree<i64>, point: i64) -> Vec<Interval<i64>> {
        let mut out = Vec::new();
        tree.containing_intervals(&mut out, &point);
        sorted(out.into_iter().cloned().collect())
    }

    fn query_overlapping(
        tree: &StaticIntervalTree<i64>,
        query: &Interval<i64>,
    ) -> Vec<Interval<i64>> {
        let mut out = Vec::new();
        tree.overlapping_intervals(&mut out, query);
        sorted(out.into_iter().cloned().collect())
    }

    fn oracle_containing(intervals: &[Interval<i64>], point: i64) -> Vec<Interval<i64>> {
        sorted(
            intervals
                .iter()
                .filter(|i| i.contains_point(&point))
                .cloned()
                .collect(),
        )
    }

    fn oracle_overlapping(
        intervals: &[Interval<i64>],
        query: &Interval<i64>,
    ) -> Vec<Interval<i64>> {
        sorted(
            intervals
                .iter()
                .filter(|i| i.overlaps(query))
                .cloned()
                .collect(),
        )
    }

    #[test]
    fn test_disjoint_set_point_query() {
        let intervals = vec![
            Interval::closed(0, 100),
            Interval::closed(200, 300),
            Interval::closed(400, 500),
            Interval::closed(600, 700),
        ];
        let tree = built_tree(&intervals);
        assert_eq!(query_containing(&tree, 250), vec![Interval::closed(200, 300)]);
        assert_eq!(query_containing(&tree, 150), Vec::<Interval<i64>>::new());
        assert_eq!(query_containing(&tree, 700), vec![Interval::closed(600, 700)]);
    }

    #[test]
    fn test_build_does_not_insert() {
        let intervals = master(true, true);
        let mut tree = StaticIntervalTree::new();
        tree.build(intervals.iter().cloned());
        assert!(tree.is_empty());
        assert_eq!(query_containing(&tree, 50), Vec::<Interval<i64>>::new());
        assert!(tree.insert(intervals[0].clone()));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_build_empty_set() {
        let mut tree: StaticIntervalTree<i64> = StaticIntervalTree::new();
        tree.build(std::iter::empty());
        assert!(tree.is_empty());
        assert!(!tree.insert(Interval::closed(0, 1)));
        assert!(!tree.delete(&Interval::closed(0, 1)));
        assert_eq!(query_containing(&tree, 0), Vec::<Interval<i64>>::new());
    }

    #[test]
    fn test_duplicate_insert_and_absent_delete() {
        let intervals = master(true, true);
        let mut tree = built_tree(&intervals);
        let size = tree.len();
        assert!(!tree.insert(intervals[3].clone()));
        assert_eq!(tree.len(), size);
        assert!(tree.delete(&intervals[3]));
        assert!(!tree.delete(&intervals[3]));
        assert_eq!(tree.len(), size - 1);
    }

    #[test]
    fn test_foreign_interval_reports_false() {
        let intervals = vec![Interval::closed(0, 100), Interval::closed(200, 300)];
        let mut tree = built_tree(&intervals);
        // No skeleton point falls within this interval.
        assert!(!tree.insert(Interval::closed(120, 180)));
        assert!(!tree.delete(&Interval::closed(120, 180)));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_point_query_matches_oracle() {
        for (closed_on_low, closed_on_high) in
            [(true, true), (false, true), (true, false), (false, false)]
        {
            let intervals = master(closed_on_low, closed_on_high);
            let tree = built_tree(&intervals);
            for point in (-50..1_150).step_by(25) {
                assert_eq!(
                    query_containing(&tree, point),
                    oracle_containing(&intervals, point),
                    "point {point} on ({closed_on_low}, {closed_on_high})"
                );
            }
        }
    }

    #[test]
    fn test_overlap_query_matches_oracle() {
        let populations: Vec<Vec<Interval<i64>>> =
            [(true, true), (false, true), (true, false), (false, false)]
                .into_iter()
                .map(|(l, h)| master(l, h))
                .collect();
        for intervals in &populations {
            let tree = built_tree(intervals);
            for queries in &populations {
                for query in queries {
                    assert_eq!(
                        query_overlapping(&tree, query),
                        oracle_overlapping(intervals, query),
                        "query {query}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_partial_population() {
        // Only half the build set is inserted; queries must reflect the
        // inserted half exactly.
        let intervals = master(true, false);
        let mut tree = StaticIntervalTree::new();
        tree.build(intervals.iter().cloned());
        let inserted: Vec<_> = intervals.iter().step_by(2).cloned().collect();
        for interval in &inserted {
            assert!(tree.insert(interval.clone()));
        }
        for point in (0..1_100).step_by(25) {
            assert_eq!(
                query_containing(&tree, point),
                oracle_containing(&inserted, point)
            );
        }
    }

    #[test]
    fn test_clear_keeps_skeleton() {
        let intervals = master(true, true);
        let mut tree = built_tree(&intervals);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(query_containing(&tree, 50), Vec::<Interval<i64>>::new());
        // The skeleton still supports the original set.
        for interval in &intervals {
            assert!(tree.insert(interval.clone()));
        }
        assert_eq!(tree.len(), intervals.len());
        assert_eq!(
            query_containing(&tree, 50),
            oracle_containing(&intervals, 50)
        );
    }

    #[test]
    fn test_randomized_build_against_oracle() {
        let mut rng = StdRng::seed_from_u64(0x57A7);
        for _ in 0..20 {
            let mut intervals = Vec::new();
            let count = rng.gen_range(1..60);
            while intervals.len() < count {
                let low = rng.gen_range(-400..400);
                let interval = Interval::new(
                    low,
                    rng.gen_bool(0.5),
                    low + rng.gen_range(0..200),
                    rng.gen_bool(0.5),
                );
                if !intervals.contains(&interval) {
                    intervals.push(interval);
                }
            }
            let mut tree = built_tree(&intervals);
            for point in (-450..650).step_by(13) {
                assert_eq!(
                    query_containing(&tree, point),
                    oracle_containing(&intervals, point)
                );
            }
            let low = rng.gen_range(-450..450);
            let query = Interval::new(
                low,
                rng.gen_bool(0.5),
                low + rng.gen_range(0..300),
                rng.gen_bool(0.5),
            );
            assert_eq!(
                query_overlapping(&tree, &query),
                oracle_overlapping(&intervals, &query)
            );
            // Delete a handful and re-check.
            for _ in 0..intervals.len() / 3 {
                let victim = intervals.swap_remove(rng.gen_range(0..intervals.len()));
                assert!(tree.delete(&victim));
            }
            for point in (-450..650).step_by(29) {
                assert_eq!(
                    query_containing(&tree, point),
                    oracle_containing(&intervals, point)
                );
            }
        }
    }
}
