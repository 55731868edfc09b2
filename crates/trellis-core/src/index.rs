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

//! # Strongly Typed Arena Indices (Zero-Cost)
//!
//! Phantom-typed wrappers around `usize` used as node handles inside
//! slab-allocated trees. `ArenaIndex<T>` carries a tag type
//! `T: ArenaIndexTag` that encodes which arena the index belongs to, while
//! compiling down to a transparent `usize` (no runtime overhead).
//!
//! `MaybeIndex<T>` is the companion optional index. Instead of
//! `Option<ArenaIndex<T>>`, it reserves `usize::MAX` as a none sentinel so
//! that a nullable link stays a single machine word. Tree nodes hold many
//! links (parent, children, list neighbors), and in dense node arrays the
//! missing discriminant improves cache locality and keeps link fields
//! trivially copyable.
//!
//! Links expressed as indices are non-owning by construction: the arena
//! owns its nodes, and the cyclic parent/child/predecessor/successor
//! reference graph never participates in ownership.
//!
//! ## Usage
//!
//! ```rust
//! use trellis_core::index::{ArenaIndex, ArenaIndexTag, MaybeIndex};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//! struct NodeTag;
//! impl ArenaIndexTag for NodeTag { const NAME: &'static str = "Node"; }
//!
//! type NodeId = ArenaIndex<NodeTag>;
//!
//! let id = NodeId::new(3);
//! assert_eq!(id.get(), 3);
//! assert_eq!(format!("{}", id), "Node(3)");
//!
//! let mut link: MaybeIndex<NodeTag> = MaybeIndex::NONE;
//! assert!(link.is_none());
//! link = MaybeIndex::some(id);
//! assert_eq!(link.get(), Some(id));
//! ```

use std::marker::PhantomData;

/// A trait to tag arena indices with a name for debugging and display
/// purposes.
///
/// # Examples
///
/// ```rust
/// # use trellis_core::index::ArenaIndexTag;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// struct MyTag;
///
/// impl ArenaIndexTag for MyTag {
///     const NAME: &'static str = "MyIndex";
/// }
/// ```
pub trait ArenaIndexTag: Clone {
    const NAME: &'static str;
}

/// A strongly typed arena index associated with a specific tag type `T`.
///
/// This struct wraps a `usize` slot position and uses a phantom type
/// parameter `T` to prevent mixing indices of different arenas.
///
/// The value `usize::MAX` is reserved for the [`MaybeIndex`] none sentinel
/// and is never a valid index.
///
/// # Examples
///
/// ```rust
/// # use trellis_core::index::{ArenaIndex, ArenaIndexTag};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// struct MyTag;
///
/// impl ArenaIndexTag for MyTag {
///     const NAME: &'static str = "MyIndex";
/// }
///
/// type MyIndex = ArenaIndex<MyTag>;
///
/// let index = MyIndex::new(5);
/// assert_eq!(index.get(), 5);
/// ```
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaIndex<T> {
    index: usize,
    _marker: PhantomData<T>,
}

impl<T> ArenaIndex<T> {
    /// Creates a new `ArenaIndex` with the given slot position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trellis_core::index::{ArenaIndex, ArenaIndexTag};
    /// # #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// # struct MyTag;
    /// # impl ArenaIndexTag for MyTag { const NAME: &'static str = "MyIndex"; }
    /// let index: ArenaIndex<MyTag> = ArenaIndex::new(7);
    /// assert_eq!(index.get(), 7);
    /// ```
    #[inline]
    pub const fn new(index: usize) -> Self {
        debug_assert!(index != usize::MAX, "usize::MAX is reserved as the none sentinel");
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the wrapped slot position.
    #[inline]
    pub const fn get(&self) -> usize {
        self.index
    }
}

impl<T> std::fmt::Display for ArenaIndex<T>
where
    T: ArenaIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> std::fmt::Debug for ArenaIndex<T>
where
    T: ArenaIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> From<usize> for ArenaIndex<T> {
    #[inline]
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl<T> From<ArenaIndex<T>> for usize {
    #[inline]
    fn from(index: ArenaIndex<T>) -> Self {
        index.get()
    }
}

/// An arena index that may be absent.
///
/// Instead of using `Option<ArenaIndex<T>>`, this type uses a sentinel
/// encoding to avoid the additional discriminant that `Option` introduces.
/// Nullable links dominate the layout of tree nodes, so keeping each link
/// to a single machine word reduces memory traffic in link-chasing loops.
///
/// Encoding:
/// - Values below `usize::MAX` represent a concrete index.
/// - `usize::MAX` is reserved to indicate absence.
///
/// # Examples
///
/// ```rust
/// # use trellis_core::index::{ArenaIndex, ArenaIndexTag, MaybeIndex};
/// # #[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// # struct MyTag;
/// # impl ArenaIndexTag for MyTag { const NAME: &'static str = "MyIndex"; }
/// let link: MaybeIndex<MyTag> = MaybeIndex::some(ArenaIndex::new(2));
/// assert!(link.is_some());
/// assert_eq!(link.get(), Some(ArenaIndex::new(2)));
/// assert_eq!(MaybeIndex::<MyTag>::NONE.get(), None);
/// ```
#[repr(transparent)]
#[derive(PartialEq, Eq, Hash)]
pub struct MaybeIndex<T> {
    index: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for MaybeIndex<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MaybeIndex<T> {}

impl<T> MaybeIndex<T> {
    const NONE_SENTINEL: usize = usize::MAX;

    /// The absent index.
    pub const NONE: Self = Self {
        index: Self::NONE_SENTINEL,
        _marker: PhantomData,
    };

    /// Creates a present `MaybeIndex` from the given index.
    #[inline]
    pub const fn some(index: ArenaIndex<T>) -> Self {
        Self {
            index: index.get(),
            _marker: PhantomData,
        }
    }

    /// Creates a `MaybeIndex` from an `Option<ArenaIndex<T>>`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trellis_core::index::{ArenaIndex, ArenaIndexTag, MaybeIndex};
    /// # #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// # struct MyTag;
    /// # impl ArenaIndexTag for MyTag { const NAME: &'static str = "MyIndex"; }
    /// let present = MaybeIndex::from_option(Some(ArenaIndex::<MyTag>::new(1)));
    /// assert!(present.is_some());
    /// let absent = MaybeIndex::<MyTag>::from_option(None);
    /// assert!(absent.is_none());
    /// ```
    #[inline]
    pub fn from_option(value: Option<ArenaIndex<T>>) -> Self {
        match value {
            Some(index) => Self::some(index),
            None => Self::NONE,
        }
    }

    /// Returns the index as an `Option`.
    #[inline]
    pub fn get(self) -> Option<ArenaIndex<T>> {
        if self.index == Self::NONE_SENTINEL {
            None
        } else {
            Some(ArenaIndex::new(self.index))
        }
    }

    /// Returns `true` if an index is present.
    #[inline]
    pub const fn is_some(self) -> bool {
        self.index != Self::NONE_SENTINEL
    }

    /// Returns `true` if no index is present.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.index == Self::NONE_SENTINEL
    }

    /// Takes the index out, leaving [`MaybeIndex::NONE`] in its place.
    #[inline]
    pub fn take(&mut self) -> Option<ArenaIndex<T>> {
        std::mem::replace(self, Self::NONE).get()
    }
}

impl<T> Default for MaybeIndex<T> {
    #[inline]
    fn default() -> Self {
        Self::NONE
    }
}

impl<T> From<ArenaIndex<T>> for MaybeIndex<T> {
    #[inline]
    fn from(index: ArenaIndex<T>) -> Self {
        Self::some(index)
    }
}

impl<T> From<Option<ArenaIndex<T>>> for MaybeIndex<T> {
    #[inline]
    fn from(value: Option<ArenaIndex<T>>) -> Self {
        Self::from_option(value)
    }
}

impl<T> PartialEq<ArenaIndex<T>> for MaybeIndex<T> {
    #[inline]
    fn eq(&self, other: &ArenaIndex<T>) -> bool {
        self.index == other.get()
    }
}

impl<T> std::fmt::Display for MaybeIndex<T>
where
    T: ArenaIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(index) => write!(f, "{}", index),
            None => write!(f, "{}(-)", T::NAME),
        }
    }
}

impl<T> std::fmt::Debug for MaybeIndex<T>
where
    T: ArenaIndexTag,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
