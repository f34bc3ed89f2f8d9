// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlap testing against composited content painted earlier.
//!
//! The index keeps a stack of containers, one per composited layer currently
//! being visited (plus a bottom container for the document). A rect inserted
//! while visiting a composited layer's subtree goes into the container
//! *below* the top, so siblings sharing a backing never test against each
//! other; the rects become visible to overlap tests once that composited
//! layer's container is popped and merged downwards.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::geometry::{at_least_unit, intersects, union_non_empty};

#[derive(Clone, Debug, Default)]
struct RectList {
    rects: Vec<Rect>,
    bounds: Rect,
}

impl RectList {
    fn push(&mut self, r: Rect) {
        self.bounds = union_non_empty(self.bounds, r);
        self.rects.push(r);
    }

    fn append(&mut self, other: Self) {
        self.bounds = union_non_empty(self.bounds, other.bounds);
        self.rects.extend(other.rects);
    }

    fn intersects(&self, r: Rect) -> bool {
        if !intersects(self.bounds, r) {
            return false;
        }
        self.rects.iter().any(|&x| intersects(x, r))
    }
}

/// Stack of rect containers used by the requirements pass.
#[derive(Clone, Debug)]
pub struct OverlapIndex {
    stack: Vec<RectList>,
    layers: BTreeSet<u32>,
}

impl Default for OverlapIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlapIndex {
    /// Creates an index holding one empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: alloc::vec![RectList::default()],
            layers: BTreeSet::new(),
        }
    }

    /// Records `bounds` (document coordinates) for layer slot `layer`.
    ///
    /// Zero-area bounds are grown to 1×1. The rect lands in the container
    /// below the top one.
    pub fn insert(&mut self, layer: u32, bounds: Rect) {
        let n = self.stack.len();
        let target = n.saturating_sub(2);
        self.stack[target].push(at_least_unit(bounds));
        self.layers.insert(layer);
    }

    /// Returns `true` if `bounds` overlaps anything in the top container.
    #[must_use]
    pub fn overlaps(&self, bounds: Rect) -> bool {
        self.stack
            .last()
            .is_some_and(|top| top.intersects(at_least_unit(bounds)))
    }

    /// Starts a container for a newly composited layer.
    pub fn push_container(&mut self) {
        self.stack.push(RectList::default());
    }

    /// Merges the top container into the one below it.
    ///
    /// # Panics
    ///
    /// Panics if only the bottom container remains.
    pub fn pop_container(&mut self) {
        assert!(self.stack.len() >= 2, "pop_container on the bottom container");
        if let Some(top) = self.stack.pop() {
            if let Some(below) = self.stack.last_mut() {
                below.append(top);
            }
        }
    }

    /// Returns `true` if no layer has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns `true` if `layer` has been inserted.
    #[must_use]
    pub fn contains(&self, layer: u32) -> bool {
        self.layers.contains(&layer)
    }

    /// Number of inserted layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Current container depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_rects_are_hidden_until_pop() {
        let mut index = OverlapIndex::new();
        index.push_container();
        index.push_container();
        index.insert(1, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!index.overlaps(Rect::new(5.0, 5.0, 6.0, 6.0)));

        index.pop_container();
        assert!(index.overlaps(Rect::new(5.0, 5.0, 6.0, 6.0)));
        assert!(!index.overlaps(Rect::new(20.0, 20.0, 30.0, 30.0)));
        assert!(index.contains(1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let mut index = OverlapIndex::new();
        index.push_container();
        index.insert(1, Rect::new(0.0, 0.0, 10.0, 10.0));
        index.pop_container();
        assert!(!index.overlaps(Rect::new(10.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn empty_bounds_grow_to_unit() {
        let mut index = OverlapIndex::new();
        index.push_container();
        index.insert(1, Rect::new(5.0, 5.0, 5.0, 5.0));
        index.pop_container();
        assert!(index.overlaps(Rect::new(5.0, 5.0, 5.0, 5.0)));
    }

    #[test]
    fn starts_empty_with_one_container() {
        let index = OverlapIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.depth(), 1);
    }

    #[test]
    #[should_panic(expected = "bottom container")]
    fn popping_bottom_panics() {
        let mut index = OverlapIndex::new();
        index.pop_container();
    }
}
