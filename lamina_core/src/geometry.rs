// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-update geometry queries over a [`LayerTree`].
//!
//! [`GeometryCache`] answers the coordinate questions both compositing passes
//! ask: where a layer sits in document space, which ancestor clips apply to
//! it, and how large its composited bounds are. Absolute transforms and
//! absolute clips are memoized per layer slot; the cache is
//! [reset](GeometryCache::reset) at the start of every update, so it never
//! outlives the layout it was computed from.
//!
//! Perspective on ancestors is ignored when mapping to document space.

use alloc::vec::Vec;

use kurbo::{Rect, Size, Vec2};

use crate::layer::{INVALID, LayerTree};
use crate::transform::Transform3d;

/// Memoized layer geometry for one compositing update.
#[derive(Clone, Debug, Default)]
pub struct GeometryCache {
    absolute_transform: Vec<Option<Transform3d>>,
    absolute_clip: Vec<Option<Option<Rect>>>,
}

impl GeometryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every memoized value and sizes the cache for `slots` layers.
    pub fn reset(&mut self, slots: u32) {
        self.absolute_transform.clear();
        self.absolute_transform.resize(slots as usize, None);
        self.absolute_clip.clear();
        self.absolute_clip.resize(slots as usize, None);
    }

    fn ensure(&mut self, idx: u32) {
        let needed = idx as usize + 1;
        if self.absolute_transform.len() < needed {
            self.absolute_transform.resize(needed, None);
            self.absolute_clip.resize(needed, None);
        }
    }

    /// Maps the layer's local coordinates to document coordinates.
    pub fn absolute_transform(&mut self, layers: &LayerTree, idx: u32) -> Transform3d {
        self.ensure(idx);
        if let Some(t) = self.absolute_transform[idx as usize] {
            return t;
        }
        let parent = layers.coord_parent_at(idx);
        let parent_transform = if parent == INVALID {
            Transform3d::IDENTITY
        } else {
            self.absolute_transform(layers, parent)
        };
        let t = parent_transform * layers.local_to_parent_at(idx);
        self.absolute_transform[idx as usize] = Some(t);
        t
    }

    /// Maps a rect in the layer's local coordinates to the bounding box of its
    /// image in document coordinates.
    pub fn absolute_rect(&mut self, layers: &LayerTree, idx: u32, local: Rect) -> Rect {
        self.absolute_transform(layers, idx).map_rect(local)
    }

    /// Intersection, in document coordinates, of the clip boxes of every
    /// ancestor of the layer. `None` if no ancestor clips.
    pub fn absolute_clip(&mut self, layers: &LayerTree, idx: u32) -> Option<Rect> {
        self.ensure(idx);
        if let Some(clip) = self.absolute_clip[idx as usize] {
            return clip;
        }
        let parent = layers.coord_parent_at(idx);
        let clip = if parent == INVALID {
            None
        } else {
            let inherited = self.absolute_clip(layers, parent);
            let own = layers
                .clip_box_at(parent)
                .map(|r| self.absolute_rect(layers, parent, r));
            match (inherited, own) {
                (Some(a), Some(b)) => Some(a.intersect(b)),
                (a, b) => a.or(b),
            }
        };
        self.absolute_clip[idx as usize] = Some(clip);
        clip
    }

    /// Intersection of the clip boxes of the layers strictly between
    /// `ancestor` and `idx`, in `ancestor` coordinates. `None` if none of
    /// them clips.
    #[must_use]
    pub fn clip_between(layers: &LayerTree, idx: u32, ancestor: u32) -> Option<Rect> {
        let mut clip: Option<Rect> = None;
        let mut n = layers.coord_parent_at(idx);
        while n != INVALID && n != ancestor {
            if let Some(r) = layers.clip_box_at(n) {
                let r = r + layers.offset_from_ancestor_at(n, Some(ancestor));
                clip = Some(clip.map_or(r, |c| c.intersect(r)));
            }
            n = layers.coord_parent_at(n);
        }
        clip
    }

    /// Translation-only offset of the layer from `ancestor`, or from the
    /// document origin when `ancestor` is `None`.
    #[must_use]
    pub fn offset_from_ancestor(layers: &LayerTree, idx: u32, ancestor: Option<u32>) -> Vec2 {
        layers.offset_from_ancestor_at(idx, ancestor)
    }

    /// Maps the layer's local coordinates into `ancestor`'s (document
    /// coordinates when `ancestor` is `None`), transforms included.
    #[must_use]
    pub fn transform_to_ancestor(layers: &LayerTree, idx: u32, ancestor: Option<u32>) -> Transform3d {
        let mut t = Transform3d::IDENTITY;
        let mut n = idx;
        while n != INVALID && Some(n) != ancestor {
            t = layers.local_to_parent_at(n) * t;
            n = layers.coord_parent_at(n);
        }
        t
    }

    /// Bounds of the layer and its non-composited descendants, in the
    /// layer's local coordinates (its own transform excluded).
    ///
    /// The root covers the document rect. A layer that clips returns its clip
    /// box without looking at descendants. Descendants for which
    /// `is_composited` returns `true` paint into their own surfaces and are
    /// skipped, together with their subtrees.
    ///
    /// The z-order lists must be fresh.
    pub fn layer_bounds(
        layers: &LayerTree,
        idx: u32,
        is_composited: &dyn Fn(u32) -> bool,
    ) -> Rect {
        if idx == layers.root {
            return layers.size[idx as usize].to_rect();
        }
        if let Some(clip) = layers.clip_box_at(idx) {
            return clip;
        }
        let mut bounds = layers.local_bounding_box_at(idx);
        let reflection = layers.reflection[idx as usize];
        if reflection != INVALID && !is_composited(reflection) {
            let r = descendant_bounds(layers, reflection, idx, is_composited);
            bounds = union_non_empty(bounds, r);
        }
        for list in [
            layers.neg_z_order_list(idx),
            layers.normal_flow_list(idx),
            layers.pos_z_order_list(idx),
        ] {
            for &child in list {
                if is_composited(child) {
                    continue;
                }
                let r = descendant_bounds(layers, child, idx, is_composited);
                bounds = union_non_empty(bounds, r);
            }
        }
        bounds
    }
}

/// Bounds of `child`'s subtree in `ancestor` coordinates, including the
/// child's own transform.
fn descendant_bounds(
    layers: &LayerTree,
    child: u32,
    ancestor: u32,
    is_composited: &dyn Fn(u32) -> bool,
) -> Rect {
    if !layers.style[child as usize].visible && layers.first_child[child as usize] == INVALID {
        return Rect::ZERO;
    }
    let local = GeometryCache::layer_bounds(layers, child, is_composited);
    let transformed = layers.transform_about_origin_at(child).map_rect(local);
    transformed + layers.offset_from_ancestor_at(child, Some(ancestor))
}

/// Unions two rects, ignoring either one if it has no area.
pub(crate) fn union_non_empty(a: Rect, b: Rect) -> Rect {
    if b.is_zero_area() {
        a
    } else if a.is_zero_area() {
        b
    } else {
        a.union(b)
    }
}

/// Returns `r` grown to at least 1×1 so that empty layers still take part in
/// intersection tests.
pub(crate) fn at_least_unit(r: Rect) -> Rect {
    let r = r.abs();
    if r.is_zero_area() {
        Rect::from_origin_size(r.origin(), Size::new(r.width().max(1.0), r.height().max(1.0)))
    } else {
        r
    }
}

/// Returns `true` if `a` and `b` share a region of positive area.
pub(crate) fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Returns `true` if `outer` contains `inner`.
pub(crate) fn contains_rect(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;
    use crate::layer::{LayerId, ZIndex};

    fn child(tree: &mut LayerTree, parent: LayerId, x: f64, y: f64, w: f64, h: f64) -> LayerId {
        let id = tree.create_layer();
        tree.add_child(parent, id);
        tree.set_offset(id, Vec2::new(x, y));
        tree.set_size(id, Size::new(w, h));
        id
    }

    fn document() -> (LayerTree, LayerId) {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        tree.set_size(root, Size::new(800.0, 600.0));
        (tree, root)
    }

    #[test]
    fn absolute_transform_accumulates_offsets_and_scroll() {
        let (mut tree, root) = document();
        let scroller = child(&mut tree, root, 10.0, 20.0, 100.0, 100.0);
        tree.set_scroll_state(
            scroller,
            Some(crate::layer::ScrollState {
                offset: Vec2::new(0.0, 15.0),
                contents_size: Size::new(100.0, 400.0),
                composited: false,
            }),
        );
        let inner = child(&mut tree, scroller, 5.0, 50.0, 10.0, 10.0);

        let mut cache = GeometryCache::new();
        cache.reset(tree.slot_count());
        let r = cache.absolute_rect(&tree, inner.index(), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(15.0, 55.0, 25.0, 65.0));
    }

    #[test]
    fn transform_applies_about_centre() {
        let (mut tree, root) = document();
        let a = child(&mut tree, root, 100.0, 100.0, 20.0, 20.0);
        tree.update_style(a, |s| s.transform = Some(Transform3d::from_scale(2.0, 2.0, 1.0)));

        let mut cache = GeometryCache::new();
        cache.reset(tree.slot_count());
        let r = cache.absolute_rect(&tree, a.index(), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(r, Rect::new(90.0, 90.0, 130.0, 130.0));
    }

    #[test]
    fn absolute_clip_intersects_ancestors_only() {
        let (mut tree, root) = document();
        let outer = child(&mut tree, root, 10.0, 10.0, 100.0, 100.0);
        tree.update_style(outer, |s| s.overflow_clip = true);
        let inner = child(&mut tree, outer, 50.0, 50.0, 100.0, 100.0);
        tree.update_style(inner, |s| s.overflow_clip = true);
        let leaf = child(&mut tree, inner, 0.0, 0.0, 10.0, 10.0);

        let mut cache = GeometryCache::new();
        cache.reset(tree.slot_count());
        assert_eq!(cache.absolute_clip(&tree, outer.index()), None);
        assert_eq!(
            cache.absolute_clip(&tree, inner.index()),
            Some(Rect::new(10.0, 10.0, 110.0, 110.0))
        );
        assert_eq!(
            cache.absolute_clip(&tree, leaf.index()),
            Some(Rect::new(60.0, 60.0, 110.0, 110.0))
        );
    }

    #[test]
    fn clip_between_is_relative_to_ancestor() {
        let (mut tree, root) = document();
        let ancestor = child(&mut tree, root, 100.0, 100.0, 300.0, 300.0);
        let clipper = child(&mut tree, ancestor, 10.0, 10.0, 50.0, 50.0);
        tree.update_style(clipper, |s| s.overflow_clip = true);
        let leaf = child(&mut tree, clipper, 0.0, 0.0, 200.0, 200.0);

        assert_eq!(
            GeometryCache::clip_between(&tree, leaf.index(), ancestor.index()),
            Some(Rect::new(10.0, 10.0, 60.0, 60.0))
        );
        assert_eq!(
            GeometryCache::clip_between(&tree, clipper.index(), ancestor.index()),
            None
        );
    }

    #[test]
    fn layer_bounds_cover_non_composited_descendants() {
        let (mut tree, root) = document();
        let a = child(&mut tree, root, 0.0, 0.0, 50.0, 50.0);
        tree.update_style(a, |s| s.opacity = 0.5);
        let _b = child(&mut tree, a, 40.0, 40.0, 50.0, 50.0);
        let c = child(&mut tree, a, -20.0, 0.0, 10.0, 10.0);
        tree.update_style(c, |s| {
            s.positioned = true;
            s.z_index = ZIndex::Value(1);
        });
        tree.update_layer_lists_if_needed();

        let bounds = GeometryCache::layer_bounds(&tree, a.index(), &|_| false);
        assert_eq!(bounds, Rect::new(-20.0, 0.0, 90.0, 90.0));

        let c_idx = c.index();
        let bounds = GeometryCache::layer_bounds(&tree, a.index(), &|i| i == c_idx);
        assert_eq!(bounds, Rect::new(0.0, 0.0, 90.0, 90.0), "composited child excluded");
    }

    #[test]
    fn clipping_layer_uses_clip_box() {
        let (mut tree, root) = document();
        let a = child(&mut tree, root, 0.0, 0.0, 50.0, 50.0);
        tree.update_style(a, |s| s.overflow_clip = true);
        let _ = child(&mut tree, a, 40.0, 40.0, 500.0, 500.0);
        tree.update_layer_lists_if_needed();
        assert_eq!(
            GeometryCache::layer_bounds(&tree, a.index(), &|_| false),
            Rect::new(0.0, 0.0, 50.0, 50.0)
        );
    }

    #[test]
    fn unit_growth_and_intersection() {
        assert_eq!(
            at_least_unit(Rect::new(5.0, 5.0, 5.0, 5.0)),
            Rect::new(5.0, 5.0, 6.0, 6.0)
        );
        assert!(!intersects(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(10.0, 0.0, 20.0, 10.0)
        ));
        assert!(intersects(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(9.0, 9.0, 20.0, 20.0)
        ));
    }
}
