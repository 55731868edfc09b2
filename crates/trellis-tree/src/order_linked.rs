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

//! # Order-Linked Red-Black Tree
//!
//! A red-black tree decorated with per-node predecessor and successor
//! links and a cached minimum, so that `first`, neighbor lookups, and
//! in-order traversal are O(1) per step instead of requiring a tree
//! descent.
//!
//! The links live in a table parallel to the engine's node arena and are
//! spliced incrementally: an insert links the new node between its
//! structural neighbors (each computed once), and a delete repairs the
//! list from the engine's removal report — in particular across the
//! two-child deletion case, where the slot that retains a value inherits
//! the freed slot's list position.

use crate::rbtree::{
    CursorError, MaybeNodeId, NaturalOrder, NoAugment, NodeId, RedBlackTree, Removal, TreeOrder,
};
use std::iter::FusedIterator;

#[derive(Clone, Copy, Debug, Default)]
struct Links {
    predecessor: MaybeNodeId,
    successor: MaybeNodeId,
}

/// A red-black tree augmented to support constant-time partial iteration
/// by storing predecessor and successor links alongside each node.
///
/// # Examples
///
/// ```rust
/// # use trellis_tree::order_linked::OrderLinkedTree;
///
/// let mut tree: OrderLinkedTree<i32> = OrderLinkedTree::new();
/// for value in [30, 10, 20] {
///     tree.insert(value);
/// }
/// assert_eq!(tree.first(), Some(&10));
/// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![10, 20, 30]);
/// ```
pub struct OrderLinkedTree<T, O = NaturalOrder>
where
    O: TreeOrder<T>,
{
    tree: RedBlackTree<T, O, NoAugment>,
    links: Vec<Links>,
    head: MaybeNodeId,
}

impl<T, O> OrderLinkedTree<T, O>
where
    O: TreeOrder<T> + Default,
{
    /// Creates a new, empty tree with the default ordering strategy.
    #[inline]
    pub fn new() -> Self {
        Self::with_order(O::default())
    }
}

impl<T, O> Default for OrderLinkedTree<T, O>
where
    O: TreeOrder<T> + Default,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O> OrderLinkedTree<T, O>
where
    O: TreeOrder<T>,
{
    /// Creates a new, empty tree with the specified ordering strategy.
    pub fn with_order(order: O) -> Self {
        Self {
            tree: RedBlackTree::with_strategies(order, NoAugment),
            links: Vec::new(),
            head: MaybeNodeId::NONE,
        }
    }

    /// Returns the number of elements in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the tree holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Tests whether the specified value is an element of this tree.
    #[inline]
    pub fn contains(&self, value: &T) -> bool {
        self.tree.contains(value)
    }

    /// Returns a reference to the stored element equal to `value`.
    #[inline]
    pub fn find(&self, value: &T) -> Option<&T> {
        self.tree.find(value)
    }

    /// Returns the value stored at `id`.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.tree.get(id)
    }

    /// Returns the node holding the smallest element, without a descent.
    #[inline]
    pub fn first_node(&self) -> Option<NodeId> {
        self.head.get()
    }

    /// Returns the smallest element, without a descent.
    #[inline]
    pub fn first(&self) -> Option<&T> {
        self.head.get().map(|id| self.tree.value_of(id))
    }

    /// Returns the in-order predecessor of `id` from the link table.
    #[inline]
    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        self.links.get(id.get())?.predecessor.get()
    }

    /// Returns the in-order successor of `id` from the link table.
    #[inline]
    pub fn successor(&self, id: NodeId) -> Option<NodeId> {
        self.links.get(id.get())?.successor.get()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.links.clear();
        self.head = MaybeNodeId::NONE;
    }

    /// Inserts the specified value, splicing it into the order links.
    ///
    /// Returns `false` if an equal value is already present.
    pub fn insert(&mut self, value: T) -> bool {
        let id = match self.tree.insert(value) {
            Some(id) => id,
            None => return false,
        };
        if self.links.len() < self.tree.slot_count() {
            self.links.resize(self.tree.slot_count(), Links::default());
        }
        // The structural neighbors are computed once; afterwards the
        // links answer neighbor queries in O(1).
        let predecessor = self.tree.predecessor(id);
        let successor = self.tree.successor(id);
        self.links[id.get()] = Links {
            predecessor: MaybeNodeId::from_option(predecessor),
            successor: MaybeNodeId::from_option(successor),
        };
        if let Some(predecessor) = predecessor {
            self.links[predecessor.get()].successor = MaybeNodeId::some(id);
        }
        if let Some(successor) = successor {
            self.links[successor.get()].predecessor = MaybeNodeId::some(id);
        }
        match self.head.get() {
            None => self.head = MaybeNodeId::some(id),
            Some(head) => {
                if let Some(new_head) = self.links[head.get()].predecessor.get() {
                    self.head = MaybeNodeId::some(new_head);
                }
            }
        }
        true
    }

    /// Deletes the element equal to `value`, splicing it out of the order
    /// links.
    ///
    /// Returns the removed element, or `None` if no equal element exists.
    pub fn delete(&mut self, value: &T) -> Option<T> {
        let target = self.tree.node_of(value)?;
        Some(self.delete_node(target).value)
    }

    /// Returns an ascending iterator walking the order links.
    pub fn iter(&self) -> LinkedIter<'_, T, O> {
        LinkedIter {
            tree: self,
            next: self.head,
            remaining: self.len(),
        }
    }

    /// Returns an ascending cursor supporting in-place removal.
    pub fn cursor(&mut self) -> LinkedCursorMut<'_, T, O> {
        let next = self.head;
        LinkedCursorMut {
            tree: self,
            next,
            last: MaybeNodeId::NONE,
            started: false,
        }
    }

    fn delete_node(&mut self, target: NodeId) -> Removal<T> {
        if self.head == target {
            self.head = self.links[target.get()].successor;
        }
        let removal = self.tree.delete_id(target);
        let freed_links = std::mem::take(&mut self.links[removal.freed.get()]);
        if removal.target == removal.freed {
            // Plain removal: splice the freed node out of the list.
            if let Some(predecessor) = freed_links.predecessor.get() {
                self.links[predecessor.get()].successor = freed_links.successor;
            }
            if let Some(successor) = freed_links.successor.get() {
                self.links[successor.get()].predecessor = freed_links.predecessor;
            }
        } else {
            // Value exchange: the retaining node inherits the freed
            // node's list position; its predecessor link is already
            // correct because the freed node was its direct successor.
            self.links[removal.target.get()].successor = freed_links.successor;
            if let Some(successor) = freed_links.successor.get() {
                self.links[successor.get()].predecessor = MaybeNodeId::some(removal.target);
            }
        }
        removal
    }
}

impl<T, O> std::fmt::Debug for OrderLinkedTree<T, O>
where
    T: std::fmt::Debug,
    O: TreeOrder<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// An ascending iterator over an [`OrderLinkedTree`], advancing through
/// the successor links.
pub struct LinkedIter<'a, T, O>
where
    O: TreeOrder<T>,
{
    tree: &'a OrderLinkedTree<T, O>,
    next: MaybeNodeId,
    remaining: usize,
}

impl<'a, T, O> Iterator for LinkedIter<'a, T, O>
where
    O: TreeOrder<T>,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.get()?;
        self.next = self.tree.links[id.get()].successor;
        self.remaining -= 1;
        Some(self.tree.tree.value_of(id))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, O> ExactSizeIterator for LinkedIter<'a, T, O> where O: TreeOrder<T> {}

impl<'a, T, O> FusedIterator for LinkedIter<'a, T, O> where O: TreeOrder<T> {}

impl<'a, T, O> IntoIterator for &'a OrderLinkedTree<T, O>
where
    O: TreeOrder<T>,
{
    type Item = &'a T;
    type IntoIter = LinkedIter<'a, T, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An ascending cursor over an [`OrderLinkedTree`] supporting removal of
/// the most recently yielded element.
pub struct LinkedCursorMut<'a, T, O>
where
    O: TreeOrder<T>,
{
    tree: &'a mut OrderLinkedTree<T, O>,
    next: MaybeNodeId,
    last: MaybeNodeId,
    started: bool,
}

impl<'a, T, O> LinkedCursorMut<'a, T, O>
where
    O: TreeOrder<T>,
{
    /// Advances to and returns the next element in ascending order.
    pub fn next(&mut self) -> Option<&T> {
        let id = self.next.get()?;
        self.started = true;
        self.last = MaybeNodeId::some(id);
        self.next = self.tree.links[id.get()].successor;
        Some(self.tree.tree.value_of(id))
    }

    /// Removes the most recently yielded element.
    ///
    /// Fails with [`CursorError::NotStarted`] before the first call to
    /// [`LinkedCursorMut::next`] and with [`CursorError::AlreadyRemoved`]
    /// when invoked twice without an intervening `next`.
    pub fn remove_current(&mut self) -> Result<T, CursorError> {
        let last = match self.last.take() {
            Some(last) => last,
            None => {
                return Err(if self.started {
                    CursorError::AlreadyRemoved
                } else {
                    CursorError::NotStarted
                });
            }
        };
        let removal = self.tree.delete_node(last);
        // When the engine removed the successor slot in the two-child
        // case, the value to yield next now lives in the retained slot.
        if self.next == removal.freed {
            self.next = MaybeNodeId::some(removal.target);
        }
        Ok(removal.value)
    }
}
