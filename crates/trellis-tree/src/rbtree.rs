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

//! # Red-Black Tree Engine
//!
//! A *red-black tree* is a binary search tree guaranteeing that no path
//! from root to leaf is more than twice as long as any other such path,
//! which bounds the height logarithmically in the number of nodes. The
//! rebalancing scheme follows Cormen, Leiserson, Rivest, and Stein,
//! *Introduction to Algorithms*, 2nd ed. (MIT Press, 2001), chapter 13.
//!
//! Nodes live in a slab arena indexed by [`NodeId`]; parent and child
//! links are sentinel-encoded indices, so the cyclic link graph carries no
//! ownership. Two strategy objects parameterize the tree:
//!
//! - [`TreeOrder`] supplies the element ordering ([`NaturalOrder`]
//!   delegates to [`Ord`]).
//! - [`Augment`] attaches per-node data maintained as a function of the
//!   node's value and its children's data. The engine reseeds a node on
//!   creation, refreshes the two displaced nodes immediately after every
//!   rotation, and refreshes every ancestor of a structurally changed
//!   position before running the corresponding fixup, so augmented data is
//!   consistent whenever control returns to the caller. [`NoAugment`]
//!   disables all of this at compile time.

use std::cmp::Ordering;
use std::iter::FusedIterator;
use trellis_core::index::{ArenaIndex, ArenaIndexTag, MaybeIndex};

/// Tag for slots in the tree node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeNodeTag;

impl ArenaIndexTag for TreeNodeTag {
    const NAME: &'static str = "TreeNode";
}

/// Handle to a node in a [`RedBlackTree`] arena.
///
/// Handles are invalidated by the deletion that frees their node and by
/// [`RedBlackTree::clear`]; a stale handle is never dereferenced unsafely,
/// the accessors simply return `None` or, for freed-and-reused slots,
/// another live node.
pub type NodeId = ArenaIndex<TreeNodeTag>;

/// A possibly absent [`NodeId`] link.
pub type MaybeNodeId = MaybeIndex<TreeNodeTag>;

/// Element ordering strategy for a tree.
///
/// Implementations are typically zero-sized; the tree stores the strategy
/// by value and consults it on every comparison.
pub trait TreeOrder<T> {
    /// Compares two elements.
    fn cmp(&self, lhs: &T, rhs: &T) -> Ordering;
}

/// Orders elements by their [`Ord`] implementation.
///
/// # Examples
///
/// ```rust
/// # use trellis_tree::rbtree::{NaturalOrder, TreeOrder};
/// use std::cmp::Ordering;
///
/// assert_eq!(NaturalOrder.cmp(&1, &2), Ordering::Less);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T> TreeOrder<T> for NaturalOrder
where
    T: Ord,
{
    #[inline]
    fn cmp(&self, lhs: &T, rhs: &T) -> Ordering {
        lhs.cmp(rhs)
    }
}

/// Augmentation strategy: per-node data maintained as an invariant
/// function of the subtree rooted at the node.
///
/// `seed` produces the data of a fresh leaf from its value alone;
/// `refresh` recomputes a node's data from its value and its children's
/// current data. The engine guarantees `refresh` runs bottom-up along
/// every path whose structure or values changed, so an implementation may
/// assume child data is already correct.
pub trait Augment<T> {
    /// The per-node augmented payload.
    type Data;

    /// Whether the engine performs augmentation maintenance at all. The
    /// no-op strategy sets this to `false`, which compiles the ancestor
    /// walks and rotation refreshes out of the tree entirely.
    const ACTIVE: bool = true;

    /// Computes the data of a newly created leaf node.
    fn seed(&self, value: &T) -> Self::Data;

    /// Recomputes a node's data from its value and children data.
    fn refresh(
        &self,
        value: &T,
        left: Option<&Self::Data>,
        right: Option<&Self::Data>,
    ) -> Self::Data;
}

/// The no-op augmentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoAugment;

impl<T> Augment<T> for NoAugment {
    type Data = ();

    const ACTIVE: bool = false;

    #[inline]
    fn seed(&self, _value: &T) -> Self::Data {}

    #[inline]
    fn refresh(
        &self,
        _value: &T,
        _left: Option<&Self::Data>,
        _right: Option<&Self::Data>,
    ) -> Self::Data {
    }
}

/// The domain of values from which a node's color is assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<T, D> {
    value: T,
    color: Color,
    parent: MaybeNodeId,
    left: MaybeNodeId,
    right: MaybeNodeId,
    data: D,
}

#[derive(Debug)]
enum Slot<T, D> {
    Occupied(Node<T, D>),
    Vacant(MaybeNodeId),
}

/// Report of a physical deletion, for wrappers that maintain state keyed
/// by node identity. `target` is the node the search located; `freed` is
/// the slot actually released. They differ exactly when the two-child
/// case exchanged the target's value with its in-order successor's and
/// removed the successor instead.
pub(crate) struct Removal<T> {
    pub(crate) value: T,
    pub(crate) target: NodeId,
    pub(crate) freed: NodeId,
}

/// The error type for invalid [`CursorMut::remove_current`] calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorError {
    /// The cursor has not yielded any element yet.
    NotStarted,
    /// The most recently yielded element was already removed.
    AlreadyRemoved,
}

impl std::fmt::Display for CursorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CursorError::NotStarted => {
                write!(f, "no element has been yielded by this cursor yet")
            }
            CursorError::AlreadyRemoved => {
                write!(f, "the current element was already removed")
            }
        }
    }
}

impl std::error::Error for CursorError {}

/// A red-black tree over a slab arena, parameterized by an ordering
/// strategy and an augmentation strategy.
///
/// Duplicates (elements comparing equal under the ordering) are rejected
/// on insert; absence on delete is an outcome, not an error. The tree is
/// not internally synchronized.
///
/// # Examples
///
/// ```rust
/// # use trellis_tree::rbtree::RedBlackTree;
///
/// let mut tree: RedBlackTree<i32> = RedBlackTree::new();
/// assert!(tree.insert(2).is_some());
/// assert!(tree.insert(1).is_some());
/// assert!(tree.insert(3).is_some());
/// assert!(tree.insert(2).is_none()); // duplicate
///
/// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
/// assert_eq!(tree.delete(&2), Some(2));
/// assert_eq!(tree.delete(&2), None);
/// assert_eq!(tree.len(), 2);
/// ```
pub struct RedBlackTree<T, O = NaturalOrder, A = NoAugment>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    slots: Vec<Slot<T, A::Data>>,
    free_head: MaybeNodeId,
    root: MaybeNodeId,
    len: usize,
    order: O,
    augment: A,
}

impl<T, O, A> RedBlackTree<T, O, A>
where
    O: TreeOrder<T> + Default,
    A: Augment<T> + Default,
{
    /// Creates a new, empty tree with default strategies.
    #[inline]
    pub fn new() -> Self {
        Self::with_strategies(O::default(), A::default())
    }

    /// Creates an empty tree preallocated for `capacity` nodes.
    #[inline]
    pub fn preallocated(capacity: usize) -> Self {
        let mut tree = Self::new();
        tree.slots.reserve(capacity);
        tree
    }
}

impl<T, O, A> Default for RedBlackTree<T, O, A>
where
    O: TreeOrder<T> + Default,
    A: Augment<T> + Default,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O, A> RedBlackTree<T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    /// Creates a new, empty tree with the specified strategies.
    pub fn with_strategies(order: O, augment: A) -> Self {
        Self {
            slots: Vec::new(),
            free_head: MaybeNodeId::NONE,
            root: MaybeNodeId::NONE,
            len: 0,
            order,
            augment,
        }
    }

    /// Returns the number of elements in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every element. Allocated slots are released.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = MaybeNodeId::NONE;
        self.root = MaybeNodeId::NONE;
        self.len = 0;
    }

    /// Returns the root node, if any.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root.get()
    }

    /// Returns the value stored at `id`, or `None` for a vacant slot.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.get()) {
            Some(Slot::Occupied(node)) => Some(&node.value),
            _ => None,
        }
    }

    /// Returns the augmented data stored at `id`.
    #[inline]
    pub fn data(&self, id: NodeId) -> Option<&A::Data> {
        match self.slots.get(id.get()) {
            Some(Slot::Occupied(node)) => Some(&node.data),
            _ => None,
        }
    }

    /// Returns the left child of `id`.
    #[inline]
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        match self.slots.get(id.get()) {
            Some(Slot::Occupied(node)) => node.left.get(),
            _ => None,
        }
    }

    /// Returns the right child of `id`.
    #[inline]
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        match self.slots.get(id.get()) {
            Some(Slot::Occupied(node)) => node.right.get(),
            _ => None,
        }
    }

    /// Returns the parent of `id`.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self.slots.get(id.get()) {
            Some(Slot::Occupied(node)) => node.parent.get(),
            _ => None,
        }
    }

    /// Tests whether the specified value is an element of this tree.
    #[inline]
    pub fn contains(&self, value: &T) -> bool {
        self.find_id(value).is_some()
    }

    /// Returns a reference to the stored element equal to `value`.
    #[inline]
    pub fn find(&self, value: &T) -> Option<&T> {
        self.find_id(value).map(|id| &self.node(id).value)
    }

    /// Returns the node holding the element equal to `value`.
    #[inline]
    pub fn node_of(&self, value: &T) -> Option<NodeId> {
        self.find_id(value)
    }

    /// Returns the node containing the smallest element.
    pub fn first_node(&self) -> Option<NodeId> {
        self.root.get().map(|root| self.min_from(root))
    }

    /// Returns the node with the largest element smaller than the element
    /// at `node`.
    pub fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        if let Some(left) = self.node(node).left.get() {
            return Some(self.max_from(left));
        }
        let mut current = node;
        loop {
            let parent = self.node(current).parent.get()?;
            if self.node(parent).left == current {
                current = parent;
            } else {
                return Some(parent);
            }
        }
    }

    /// Returns the node with the smallest element larger than the element
    /// at `node`.
    pub fn successor(&self, node: NodeId) -> Option<NodeId> {
        if let Some(right) = self.node(node).right.get() {
            return Some(self.min_from(right));
        }
        let mut current = node;
        loop {
            let parent = self.node(current).parent.get()?;
            if self.node(parent).right == current {
                current = parent;
            } else {
                return Some(parent);
            }
        }
    }

    /// Inserts the specified value.
    ///
    /// Returns the new node, or `None` if an equal value is already
    /// present (the offered value is dropped and the tree is unchanged).
    pub fn insert(&mut self, value: T) -> Option<NodeId> {
        let id = match self.root.get() {
            None => {
                let id = self.alloc(value);
                self.root = MaybeNodeId::some(id);
                id
            }
            Some(mut parent) => loop {
                match self.order.cmp(&self.node(parent).value, &value) {
                    Ordering::Less => match self.node(parent).right.get() {
                        Some(right) => parent = right,
                        None => {
                            let id = self.alloc(value);
                            self.node_mut(parent).right = MaybeNodeId::some(id);
                            self.node_mut(id).parent = MaybeNodeId::some(parent);
                            break id;
                        }
                    },
                    Ordering::Greater => match self.node(parent).left.get() {
                        Some(left) => parent = left,
                        None => {
                            let id = self.alloc(value);
                            self.node_mut(parent).left = MaybeNodeId::some(id);
                            self.node_mut(id).parent = MaybeNodeId::some(parent);
                            break id;
                        }
                    },
                    Ordering::Equal => return None,
                }
            },
        };
        if A::ACTIVE {
            self.refresh_upward(self.node(id).parent);
        }
        self.fix_after_insertion(id);
        self.len += 1;
        Some(id)
    }

    /// Deletes the element equal to `value`.
    ///
    /// Returns the removed element, or `None` if no equal element exists.
    pub fn delete(&mut self, value: &T) -> Option<T> {
        let target = self.find_id(value)?;
        Some(self.delete_id(target).value)
    }

    /// Returns an ascending iterator over the elements.
    pub fn iter(&self) -> Iter<'_, T, O, A> {
        Iter {
            tree: self,
            next: MaybeNodeId::from_option(self.first_node()),
            remaining: self.len,
        }
    }

    /// Returns an ascending cursor supporting in-place removal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trellis_tree::rbtree::RedBlackTree;
    ///
    /// let mut tree: RedBlackTree<i32> = RedBlackTree::new();
    /// for v in [1, 2, 3, 4] {
    ///     tree.insert(v);
    /// }
    /// let mut cursor = tree.cursor();
    /// while let Some(&v) = cursor.next() {
    ///     if v % 2 == 0 {
    ///         cursor.remove_current().unwrap();
    ///     }
    /// }
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    /// ```
    pub fn cursor(&mut self) -> CursorMut<'_, T, O, A> {
        let next = MaybeNodeId::from_option(self.first_node());
        CursorMut {
            tree: self,
            next,
            last: MaybeNodeId::NONE,
            started: false,
        }
    }

    /// Deletes the node `target`, reporting the freed slot.
    pub(crate) fn delete_id(&mut self, target: NodeId) -> Removal<T> {
        let mut node = target;
        // Two children: exchange values with the in-order successor and
        // physically remove the successor instead.
        if self.node(node).left.is_some() && self.node(node).right.is_some() {
            let successor = self
                .successor(node)
                .expect("node with a right child has a successor");
            self.exchange_values(node, successor);
            node = successor;
        }
        let child = if self.node(node).left.is_some() {
            self.node(node).left
        } else {
            self.node(node).right
        };
        let parent = self.node(node).parent;
        if let Some(child_id) = child.get() {
            self.node_mut(child_id).parent = parent;
        }
        match parent.get() {
            None => self.root = child,
            Some(parent_id) => {
                if self.node(parent_id).left == node {
                    self.node_mut(parent_id).left = child;
                } else {
                    self.node_mut(parent_id).right = child;
                }
            }
        }
        if self.node(node).color == Color::Black {
            if self.root.is_some() {
                if A::ACTIVE {
                    self.refresh_upward(parent);
                }
                // With no replacement child, the detached node itself acts
                // as the fixup's starting point; its parent link is still
                // intact and its slot is released only afterwards.
                let fix_at = match child.get() {
                    Some(child_id) => child_id,
                    None => node,
                };
                self.fix_after_deletion(fix_at);
            }
        } else if A::ACTIVE {
            self.refresh_upward(parent);
        }
        let released = self.release(node);
        self.len -= 1;
        Removal {
            value: released.value,
            target,
            freed: node,
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn value_of(&self, id: NodeId) -> &T {
        &self.node(id).value
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node<T, A::Data> {
        match &self.slots[id.get()] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => panic!("vacant arena slot {}", id),
        }
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T, A::Data> {
        match &mut self.slots[id.get()] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => panic!("vacant arena slot {}", id),
        }
    }

    fn alloc(&mut self, value: T) -> NodeId {
        let data = self.augment.seed(&value);
        let node = Node {
            value,
            color: Color::Red,
            parent: MaybeNodeId::NONE,
            left: MaybeNodeId::NONE,
            right: MaybeNodeId::NONE,
            data,
        };
        match self.free_head.get() {
            Some(id) => {
                let next_free = match &self.slots[id.get()] {
                    Slot::Vacant(next) => *next,
                    Slot::Occupied(_) => panic!("occupied slot {} on the free list", id),
                };
                self.free_head = next_free;
                self.slots[id.get()] = Slot::Occupied(node);
                id
            }
            None => {
                let id = NodeId::new(self.slots.len());
                self.slots.push(Slot::Occupied(node));
                id
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node<T, A::Data> {
        let slot = std::mem::replace(&mut self.slots[id.get()], Slot::Vacant(self.free_head));
        self.free_head = MaybeNodeId::some(id);
        match slot {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => panic!("released a vacant arena slot {}", id),
        }
    }

    fn find_id(&self, value: &T) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current.get() {
            let node = self.node(id);
            match self.order.cmp(&node.value, value) {
                Ordering::Less => current = node.right,
                Ordering::Greater => current = node.left,
                Ordering::Equal => return Some(id),
            }
        }
        None
    }

    fn min_from(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left.get() {
            id = left;
        }
        id
    }

    fn max_from(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.node(id).right.get() {
            id = right;
        }
        id
    }

    #[inline]
    fn color_of(&self, id: MaybeNodeId) -> Color {
        // A null leaf is black.
        match id.get() {
            Some(id) => self.node(id).color,
            None => Color::Black,
        }
    }

    #[inline]
    fn set_color(&mut self, id: MaybeNodeId, color: Color) {
        if let Some(id) = id.get() {
            self.node_mut(id).color = color;
        }
    }

    fn exchange_values(&mut self, a: NodeId, b: NodeId) {
        let (low, high) = if a.get() < b.get() {
            (a.get(), b.get())
        } else {
            (b.get(), a.get())
        };
        let (head, tail) = self.slots.split_at_mut(high);
        match (&mut head[low], &mut tail[0]) {
            (Slot::Occupied(first), Slot::Occupied(second)) => {
                std::mem::swap(&mut first.value, &mut second.value);
            }
            _ => panic!("value exchange touched a vacant arena slot"),
        }
    }

    fn refresh_node(&mut self, id: NodeId) {
        let data = {
            let node = self.node(id);
            let left = node.left.get().map(|left| &self.node(left).data);
            let right = node.right.get().map(|right| &self.node(right).data);
            self.augment.refresh(&node.value, left, right)
        };
        self.node_mut(id).data = data;
    }

    fn refresh_upward(&mut self, mut current: MaybeNodeId) {
        while let Some(id) = current.get() {
            self.refresh_node(id);
            current = self.node(id).parent;
        }
    }

    /// Performs a left rotation on `node`; the sole primitive that rewires
    /// parent/child links.
    fn rotate_left(&mut self, node: NodeId) {
        let pivot = self
            .node(node)
            .right
            .get()
            .expect("left rotation requires a right child");
        let inner = self.node(pivot).left;
        self.node_mut(node).right = inner;
        if let Some(inner_id) = inner.get() {
            self.node_mut(inner_id).parent = MaybeNodeId::some(node);
        }
        let parent = self.node(node).parent;
        self.node_mut(pivot).parent = parent;
        match parent.get() {
            None => self.root = MaybeNodeId::some(pivot),
            Some(parent_id) => {
                if self.node(parent_id).left == node {
                    self.node_mut(parent_id).left = MaybeNodeId::some(pivot);
                } else {
                    self.node_mut(parent_id).right = MaybeNodeId::some(pivot);
                }
            }
        }
        self.node_mut(pivot).left = MaybeNodeId::some(node);
        self.node_mut(node).parent = MaybeNodeId::some(pivot);
        if A::ACTIVE {
            self.refresh_node(node);
            self.refresh_node(pivot);
        }
    }

    /// Performs a right rotation on `node`.
    fn rotate_right(&mut self, node: NodeId) {
        let pivot = self
            .node(node)
            .left
            .get()
            .expect("right rotation requires a left child");
        let inner = self.node(pivot).right;
        self.node_mut(node).left = inner;
        if let Some(inner_id) = inner.get() {
            self.node_mut(inner_id).parent = MaybeNodeId::some(node);
        }
        let parent = self.node(node).parent;
        self.node_mut(pivot).parent = parent;
        match parent.get() {
            None => self.root = MaybeNodeId::some(pivot),
            Some(parent_id) => {
                if self.node(parent_id).right == node {
                    self.node_mut(parent_id).right = MaybeNodeId::some(pivot);
                } else {
                    self.node_mut(parent_id).left = MaybeNodeId::some(pivot);
                }
            }
        }
        self.node_mut(pivot).right = MaybeNodeId::some(node);
        self.node_mut(node).parent = MaybeNodeId::some(pivot);
        if A::ACTIVE {
            self.refresh_node(node);
            self.refresh_node(pivot);
        }
    }

    /// Re-balances the tree after an insert operation.
    fn fix_after_insertion(&mut self, mut node: NodeId) {
        while self.color_of(self.node(node).parent) == Color::Red {
            let parent = self
                .node(node)
                .parent
                .get()
                .expect("a red node has a parent");
            let grandparent = self
                .node(parent)
                .parent
                .get()
                .expect("a red parent has a parent");
            if self.node(grandparent).left == parent {
                let uncle = self.node(grandparent).right;
                if self.color_of(uncle) == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.node_mut(grandparent).color = Color::Red;
                    node = grandparent;
                } else {
                    if self.node(parent).right == node {
                        node = parent;
                        self.rotate_left(node);
                    }
                    let parent = self
                        .node(node)
                        .parent
                        .get()
                        .expect("a red node has a parent");
                    let grandparent = self
                        .node(parent)
                        .parent
                        .get()
                        .expect("a red parent has a parent");
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.node(grandparent).left;
                if self.color_of(uncle) == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.node_mut(grandparent).color = Color::Red;
                    node = grandparent;
                } else {
                    if self.node(parent).left == node {
                        node = parent;
                        self.rotate_right(node);
                    }
                    let parent = self
                        .node(node)
                        .parent
                        .get()
                        .expect("a red node has a parent");
                    let grandparent = self
                        .node(parent)
                        .parent
                        .get()
                        .expect("a red parent has a parent");
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Re-balances the tree after a delete operation. `node` is the
    /// replacement child, or the already detached node when the removed
    /// position had no child.
    fn fix_after_deletion(&mut self, mut node: NodeId) {
        while self.root != node && self.node(node).color == Color::Black {
            let parent = self
                .node(node)
                .parent
                .get()
                .expect("a non-root node has a parent");
            // The detached node is no longer its parent's child; it was
            // the left child exactly when the surviving right child slot
            // is occupied by its sibling.
            let node_is_left = self.node(parent).left == node
                || (self.node(parent).right.is_some() && self.node(parent).right != node);
            if node_is_left {
                let mut sibling = self
                    .node(parent)
                    .right
                    .get()
                    .expect("black-height invariant guarantees a sibling");
                if self.node(sibling).color == Color::Red {
                    self.node_mut(sibling).color = Color::Black;
                    self.node_mut(parent).color = Color::Red;
                    self.rotate_left(parent);
                    sibling = self
                        .node(parent)
                        .right
                        .get()
                        .expect("rotation preserves the sibling");
                }
                if self.color_of(self.node(sibling).left) == Color::Black
                    && self.color_of(self.node(sibling).right) == Color::Black
                {
                    self.node_mut(sibling).color = Color::Red;
                    node = parent;
                } else {
                    if self.color_of(self.node(sibling).right) == Color::Black {
                        let sibling_left = self.node(sibling).left;
                        self.set_color(sibling_left, Color::Black);
                        self.node_mut(sibling).color = Color::Red;
                        self.rotate_right(sibling);
                        sibling = self
                            .node(parent)
                            .right
                            .get()
                            .expect("rotation preserves the sibling");
                    }
                    self.node_mut(sibling).color = self.node(parent).color;
                    self.node_mut(parent).color = Color::Black;
                    let sibling_right = self.node(sibling).right;
                    self.set_color(sibling_right, Color::Black);
                    self.rotate_left(parent);
                    node = self.root.get().expect("tree is non-empty during fixup");
                }
            } else {
                let mut sibling = self
                    .node(parent)
                    .left
                    .get()
                    .expect("black-height invariant guarantees a sibling");
                if self.node(sibling).color == Color::Red {
                    self.node_mut(sibling).color = Color::Black;
                    self.node_mut(parent).color = Color::Red;
                    self.rotate_right(parent);
                    sibling = self
                        .node(parent)
                        .left
                        .get()
                        .expect("rotation preserves the sibling");
                }
                if self.color_of(self.node(sibling).right) == Color::Black
                    && self.color_of(self.node(sibling).left) == Color::Black
                {
                    self.node_mut(sibling).color = Color::Red;
                    node = parent;
                } else {
                    if self.color_of(self.node(sibling).left) == Color::Black {
                        let sibling_right = self.node(sibling).right;
                        self.set_color(sibling_right, Color::Black);
                        self.node_mut(sibling).color = Color::Red;
                        self.rotate_left(sibling);
                        sibling = self
                            .node(parent)
                            .left
                            .get()
                            .expect("rotation preserves the sibling");
                    }
                    self.node_mut(sibling).color = self.node(parent).color;
                    self.node_mut(parent).color = Color::Black;
                    let sibling_left = self.node(sibling).left;
                    self.set_color(sibling_left, Color::Black);
                    self.rotate_right(parent);
                    node = self.root.get().expect("tree is non-empty during fixup");
                }
            }
        }
        self.node_mut(node).color = Color::Black;
    }
}

impl<T, O, A> std::fmt::Display for RedBlackTree<T, O, A>
where
    T: std::fmt::Display,
    O: TreeOrder<T>,
    A: Augment<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (position, value) in self.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}

impl<T, O, A> std::fmt::Debug for RedBlackTree<T, O, A>
where
    T: std::fmt::Debug,
    O: TreeOrder<T>,
    A: Augment<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// An ascending iterator over the elements of a [`RedBlackTree`].
pub struct Iter<'a, T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    tree: &'a RedBlackTree<T, O, A>,
    next: MaybeNodeId,
    remaining: usize,
}

impl<'a, T, O, A> Iterator for Iter<'a, T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.get()?;
        self.next = MaybeNodeId::from_option(self.tree.successor(id));
        self.remaining -= 1;
        Some(&self.tree.node(id).value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, O, A> ExactSizeIterator for Iter<'a, T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
}

impl<'a, T, O, A> FusedIterator for Iter<'a, T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
}

impl<'a, T, O, A> IntoIterator for &'a RedBlackTree<T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, O, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An ascending cursor over a [`RedBlackTree`] supporting removal of the
/// most recently yielded element.
pub struct CursorMut<'a, T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    tree: &'a mut RedBlackTree<T, O, A>,
    next: MaybeNodeId,
    last: MaybeNodeId,
    started: bool,
}

impl<'a, T, O, A> CursorMut<'a, T, O, A>
where
    O: TreeOrder<T>,
    A: Augment<T>,
{
    /// Advances to and returns the next element in ascending order.
    pub fn next(&mut self) -> Option<&T> {
        let id = self.next.get()?;
        self.started = true;
        self.last = MaybeNodeId::some(id);
        self.next = MaybeNodeId::from_option(self.tree.successor(id));
        Some(&self.tree.node(id).value)
    }

    /// Removes the most recently yielded element.
    ///
    /// Fails with [`CursorError::NotStarted`] before the first
    /// [`CursorMut::next`] call and with [`CursorError::AlreadyRemoved`]
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
        let removal = self.tree.delete_id(last);
        // When the engine removed the successor slot in the two-child
        // case, the value to yield next now lives in the retained slot.
        if self.next == removal.freed {
            self.next = MaybeNodeId::some(removal.target);
        }
        Ok(removal.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    /// Recursively validates order, parent links, the red-red exclusion,
    /// and uniform black height; returns the subtree's black height.
    fn validate_subtree<T, O, A>(
        tree: &RedBlackTree<T, O, A>,
        id: NodeId,
        lower: Option<&T>,
        upper: Option<&T>,
    ) -> usize
    where
        O: TreeOrder<T>,
        A: Augment<T>,
    {
        let node = tree.node(id);
        if let Some(lower) = lower {
            assert_eq!(tree.order.cmp(&node.value, lower), Ordering::Greater);
        }
        if let Some(upper) = upper {
            assert_eq!(tree.order.cmp(&node.value, upper), Ordering::Less);
        }
        if node.color == Color::Red {
            assert_eq!(tree.color_of(node.left), Color::Black, "red-red edge");
            assert_eq!(tree.color_of(node.right), Color::Black, "red-red edge");
        }
        let left_height = match node.left.get() {
            Some(left) => {
                assert_eq!(tree.node(left).parent, id, "broken parent link");
                validate_subtree(tree, left, lower, Some(&node.value))
            }
            None => 1,
        };
        let right_height = match node.right.get() {
            Some(right) => {
                assert_eq!(tree.node(right).parent, id, "broken parent link");
                validate_subtree(tree, right, Some(&node.value), upper)
            }
            None => 1,
        };
        assert_eq!(left_height, right_height, "unequal black heights");
        left_height + usize::from(node.color == Color::Black)
    }

    fn assert_valid<T, O, A>(tree: &RedBlackTree<T, O, A>)
    where
        O: TreeOrder<T>,
        A: Augment<T>,
    {
        if let Some(root) = tree.root() {
            assert_eq!(tree.node(root).color, Color::Black, "red root");
            assert!(tree.node(root).parent.is_none());
            validate_subtree(tree, root, None, None);
        } else {
            assert_eq!(tree.len(), 0);
        }
    }

    fn tree_of(values: impl IntoIterator<Item = i32>) -> RedBlackTree<i32> {
        let mut tree = RedBlackTree::new();
        for value in values {
            tree.insert(value);
        }
        tree
    }

    #[test]
    fn test_insert_ascending() {
        let tree = tree_of(0..64);
        assert_eq!(tree.len(), 64);
        assert_valid(&tree);
        assert_eq!(tree.iter().copied().collect::<Vec<_>>(), (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn test_insert_descending() {
        let tree = tree_of((0..64).rev());
        assert_eq!(tree.len(), 64);
        assert_valid(&tree);
        assert_eq!(tree.iter().copied().collect::<Vec<_>>(), (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn test_insert_duplicate() {
        let mut tree = tree_of([5, 3, 8]);
        assert!(tree.insert(3).is_none());
        assert_eq!(tree.len(), 3);
        assert_valid(&tree);
    }

    #[test]
    fn test_contains_and_find() {
        let tree = tree_of([2, 4, 6]);
        assert!(tree.contains(&4));
        assert!(!tree.contains(&5));
        assert_eq!(tree.find(&6), Some(&6));
        assert_eq!(tree.find(&7), None);
        assert!(tree.node_of(&2).is_some());
    }

    #[test]
    fn test_delete_leaf_and_internal() {
        let mut tree = tree_of([10, 5, 15, 3, 7, 12, 18]);
        assert_eq!(tree.delete(&3), Some(3)); // leaf
        assert_valid(&tree);
        assert_eq!(tree.delete(&5), Some(5)); // one child
        assert_valid(&tree);
        assert_eq!(tree.delete(&10), Some(10)); // two children (root)
        assert_valid(&tree);
        assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![7, 12, 15, 18]);
    }

    #[test]
    fn test_delete_absent_is_idempotent() {
        let mut tree = tree_of([1, 2, 3]);
        assert_eq!(tree.delete(&2), Some(2));
        assert_eq!(tree.delete(&2), None);
        assert_eq!(tree.len(), 2);
        assert_valid(&tree);
    }

    #[test]
    fn test_delete_all() {
        let mut tree = tree_of(0..32);
        for value in 0..32 {
            assert_eq!(tree.delete(&value), Some(value));
            assert_valid(&tree);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.first_node(), None);
    }

    #[test]
    fn test_slot_reuse() {
        let mut tree = tree_of(0..8);
        let slots = tree.slot_count();
        for value in 0..4 {
            tree.delete(&value);
        }
        for value in 100..104 {
            tree.insert(value);
        }
        assert_eq!(tree.slot_count(), slots, "freed slots must be reused");
        assert_valid(&tree);
    }

    #[test]
    fn test_first_node_predecessor_successor() {
        let tree = tree_of([4, 2, 6, 1, 3, 5, 7]);
        let first = tree.first_node().unwrap();
        assert_eq!(tree.get(first), Some(&1));
        assert_eq!(tree.predecessor(first), None);

        let mut current = first;
        let mut collected = vec![*tree.get(current).unwrap()];
        while let Some(next) = tree.successor(current) {
            collected.push(*tree.get(next).unwrap());
            current = next;
        }
        assert_eq!(collected, vec![1, 2, 3, 4, 5, 6, 7]);

        let mut reversed = vec![*tree.get(current).unwrap()];
        while let Some(previous) = tree.predecessor(current) {
            reversed.push(*tree.get(previous).unwrap());
            current = previous;
        }
        reversed.reverse();
        assert_eq!(reversed, collected);
    }

    #[test]
    fn test_clear() {
        let mut tree = tree_of(0..16);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        tree.insert(1);
        assert_eq!(tree.len(), 1);
        assert_valid(&tree);
    }

    #[test]
    fn test_iter_exact_size() {
        let tree = tree_of(0..10);
        let mut iter = tree.iter();
        assert_eq!(iter.len(), 10);
        iter.next();
        assert_eq!(iter.len(), 9);
    }

    #[test]
    fn test_display() {
        let tree = tree_of([2, 1, 3]);
        assert_eq!(format!("{}", tree), "{1, 2, 3}");
        assert_eq!(format!("{}", RedBlackTree::<i32>::new()), "{}");
    }

    #[test]
    fn test_cursor_remove_before_next() {
        let mut tree = tree_of([1, 2]);
        let mut cursor = tree.cursor();
        assert_eq!(cursor.remove_current(), Err(CursorError::NotStarted));
    }

    #[test]
    fn test_cursor_remove_twice() {
        let mut tree = tree_of([1, 2]);
        let mut cursor = tree.cursor();
        cursor.next();
        assert_eq!(cursor.remove_current(), Ok(1));
        assert_eq!(cursor.remove_current(), Err(CursorError::AlreadyRemoved));
        assert_eq!(cursor.next(), Some(&2));
    }

    #[test]
    fn test_cursor_remove_two_child_node() {
        // Walk to an internal node with two children and remove it; the
        // cursor must stay positioned despite the value exchange.
        let mut tree = tree_of([4, 2, 6, 1, 3, 5, 7]);
        let mut cursor = tree.cursor();
        let mut seen = Vec::new();
        while let Some(&value) = cursor.next() {
            if value == 4 {
                assert_eq!(cursor.remove_current(), Ok(4));
            } else {
                seen.push(value);
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 5, 6, 7]);
        assert_valid(&tree);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_cursor_drain_everything() {
        let mut tree = tree_of(0..20);
        let mut cursor = tree.cursor();
        let mut drained = Vec::new();
        while cursor.next().is_some() {
            drained.push(cursor.remove_current().unwrap());
        }
        assert_eq!(drained, (0..20).collect::<Vec<_>>());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_randomized_against_oracle() {
        let mut rng = StdRng::seed_from_u64(0x7E11_15);
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        let mut oracle = BTreeSet::new();
        for round in 0..2_000 {
            let value = rng.gen_range(0..256);
            if rng.gen_bool(0.6) {
                assert_eq!(tree.insert(value).is_some(), oracle.insert(value));
            } else {
                assert_eq!(tree.delete(&value), oracle.take(&value));
            }
            assert_eq!(tree.len(), oracle.len());
            if round % 64 == 0 {
                assert_valid(&tree);
                assert!(tree.iter().copied().eq(oracle.iter().copied()));
            }
        }
        assert_valid(&tree);
        assert!(tree.iter().copied().eq(oracle.iter().copied()));
    }
}
