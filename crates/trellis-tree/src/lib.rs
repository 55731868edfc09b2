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

//! # Trellis Tree
//!
//! Self-balancing search trees and the interval-index structures layered
//! on top of them. The crate is organized bottom-up:
//!
//! ## Modules
//!
//! - `rbtree`: the red-black tree engine over a slab arena, parameterized
//!   by an ordering strategy (`TreeOrder`) and an augmentation strategy
//!   (`Augment`) that keeps per-node subtree summaries exact across every
//!   rotation and fixup.
//! - `order_linked`: the engine decorated with predecessor/successor
//!   links and a cached minimum for O(1) neighbor access and iteration.
//! - `dynamic`: a fully dynamic interval tree; nodes carry the
//!   closure-aware min-low/max-high span of their subtree, and point and
//!   overlap queries prune on it for O(log(n) + k) enumeration.
//! - `static_tree`: a semi-static interval tree built once from a known
//!   interval set by median partitioning; each skeleton node buckets its
//!   intervals into order-linked trees so query scans terminate early.
//!
//! All structures are single-threaded; callers serialize access
//! externally.

pub mod dynamic;
pub mod order_linked;
pub mod rbtree;
pub mod static_tree;
