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

//! # Trellis Core
//!
//! Foundational primitives shared by the trellis tree crates. This crate
//! consolidates the small, reusable building blocks that the search-tree
//! and interval-index structures are assembled from.
//!
//! ## Modules
//!
//! - `index`: phantom-tagged arena indices (`ArenaIndex<T>`) and a
//!   sentinel-encoded optional index (`MaybeIndex<T>`) used as non-owning
//!   parent/child/list links inside slab-allocated trees, keeping cyclic
//!   link graphs free of ownership cycles at zero runtime cost.
//! - `interval`: the `Interval<T>` value type over any totally ordered
//!   endpoint type, with independently open or closed endpoints, a total
//!   order suitable for tree storage, and exact containment and overlap
//!   predicates.
//!
//! Refer to each module for detailed APIs and examples.

pub mod index;
pub mod interval;
