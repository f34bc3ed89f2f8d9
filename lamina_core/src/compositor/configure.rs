// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-backing configuration and geometry.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use crate::geometry::{GeometryCache, contains_rect};
use crate::layer::{INVALID, LayerContent, LayerTree};
use crate::surface::{SurfaceContent, SurfaceId, SurfaceTree};
use crate::transform::Transform3d;

use super::backing::Toggle;
use super::{
    BackingStoreQuery, CompositingPolicy, LayerBacking, LayerFacts, LayerTreeCompositor, Pass,
    RepaintRequest,
};

impl LayerTreeCompositor {
    /// Recomputes the backing's composited bounds from the layer and its
    /// non-composited descendants.
    pub(super) fn update_composited_bounds(&mut self, pass: &Pass<'_, '_>, idx: u32) {
        let layers = pass.layers;
        let mut bounds = GeometryCache::layer_bounds(layers, idx, &|c| self.is_composited_at(c));
        let Some(backing) = self.backing_at(idx) else {
            return;
        };
        let has_scrollbars =
            backing.horizontal_scrollbar.is_some() || backing.vertical_scrollbar.is_some();

        // Without a transform or composited scroll in the chain, the visible
        // part of the layer is known and the surface can be trimmed to it.
        let constrained = !has_scrollbars && !transformed_or_scrolled(layers, idx);
        if constrained {
            let root = layers.root;
            let mut visible = layers.size[root as usize].to_rect();
            if idx != root {
                if let Some(clip) = GeometryCache::clip_between(layers, idx, root) {
                    visible = visible.intersect(clip);
                }
            }
            visible = visible - layers.offset_from_ancestor_at(idx, Some(root));
            bounds = bounds.intersect(visible);
        }

        // An empty layer with a custom transform origin still needs a
        // surface big enough to carry the anchor point.
        let inflated =
            bounds.is_zero_area() && layers.style_at(idx).has_non_default_transform_origin();
        if inflated {
            bounds = Rect::from_origin_size(bounds.origin(), Size::new(1.0, 1.0));
        }

        if let Some(backing) = self.backings[idx as usize].as_mut() {
            backing.composited_bounds = bounds;
            backing.bounds_constrained_by_clipping = constrained;
            backing.artificially_inflated_bounds = inflated;
        }
    }

    /// Creates or destroys the backing's auxiliary surfaces and sets its
    /// content source.
    ///
    /// Returns `true` if the set of surfaces changed in a way the surface
    /// hierarchy must reflect.
    pub(super) fn update_backing_configuration(&mut self, pass: &mut Pass<'_, '_>, idx: u32) -> bool {
        let layers = pass.layers;
        let slot = idx as usize;
        let Some(mut backing) = self.backings[slot].take() else {
            return false;
        };
        let style = layers.style_at(idx);
        let is_root = idx == layers.root;

        let mut toggles: Vec<Toggle> = Vec::new();
        toggles.push(
            backing.update_foreground(pass.surfaces, !layers.neg_z_order_list(idx).is_empty()),
        );
        toggles.extend(backing.update_background(
            pass.surfaces,
            is_root && self.config.fixed_root_background && style.fixed_background,
        ));
        let clips_descendants =
            self.state[slot].has_compositing_descendant && style.has_clip_or_overflow_clip();
        toggles.extend(backing.update_clipping(
            pass.surfaces,
            self.clipped_by_ancestor(layers, idx),
            clips_descendants,
        ));

        let scroll_composited = layers.scroll[slot].is_some_and(|s| s.composited);
        let (h, v, c) = match layers.overflow_controls[slot] {
            Some(oc) if oc.overlay || scroll_composited => (
                oc.horizontal.is_some(),
                oc.vertical.is_some(),
                oc.corner.is_some_and(|r| !r.is_zero_area()),
            ),
            _ => (false, false, false),
        };
        toggles.extend(backing.update_overflow_controls(pass.surfaces, h, v, c));
        toggles.extend(backing.update_scrolling(pass.surfaces, scroll_composited));

        let mut changed = toggles.iter().any(|t| t.changed());
        if changed {
            backing.update_internal_hierarchy(pass.surfaces);
        }
        toggles.push(backing.update_mask(pass.surfaces, style.has_mask));
        for t in toggles {
            if let Toggle::Refused(role) = t {
                self.allocation_failed(pass, idx, role);
            }
        }

        let reflection = layers.reflection[slot];
        let replica = (reflection != INVALID)
            .then(|| self.backing_at(reflection).map(LayerBacking::primary))
            .flatten();
        pass.surfaces.set_replica(backing.primary, replica);

        let content = match layers.content_at(idx) {
            LayerContent::Image {
                directly_composited: true,
            } => SurfaceContent::Image,
            LayerContent::Video {
                displays: true,
                accelerated: true,
            }
            | LayerContent::Plugin {
                allows_accelerated: true,
                ..
            } => SurfaceContent::Media,
            LayerContent::Canvas {
                accelerated: true, ..
            } => SurfaceContent::Canvas,
            _ => match style.background_color {
                Some(color) if self.is_simple_container(layers, idx) => {
                    SurfaceContent::SolidColor(color)
                }
                _ => SurfaceContent::None,
            },
        };
        pass.surfaces.set_content(backing.primary, content);

        // A hosted document that entered or left compositing changes what
        // must be grafted under this layer.
        if let Some(frame_root) = self.grafted_frame_root(pass, idx) {
            let parent = backing.parent_for_sublayers();
            if pass.surfaces.children(parent).next() != Some(frame_root) {
                changed = true;
            }
        }

        self.backings[slot] = Some(backing);
        changed
    }

    /// Positions and sizes the backing's surfaces and refreshes their visual
    /// properties.
    pub(super) fn update_backing_geometry(&mut self, pass: &mut Pass<'_, '_>, idx: u32) {
        let layers = pass.layers;
        let slot = idx as usize;
        let Some(mut backing) = self.backings[slot].take() else {
            return;
        };
        let style = layers.style_at(idx);
        let primary = backing.primary;

        let transform = match style.transform {
            Some(t) if self.can_render_3d() => t,
            Some(t) => t.flatten(),
            None => Transform3d::IDENTITY,
        };
        let opacity = self.compositing_opacity(layers, idx);
        let contents_visible =
            style.visible || self.has_visible_non_composited_descendant(layers, idx);
        let surfaces = &mut *pass.surfaces;
        surfaces.set_transform(primary, transform);
        surfaces.set_opacity(primary, opacity);
        surfaces.set_contents_visible(primary, contents_visible);
        let preserves_3d = style.preserve_3d && layers.reflection[slot] == INVALID;
        surfaces.set_preserves_3d(primary, preserves_3d);
        surfaces.set_backface_visible(primary, !style.backface_hidden);

        let ancestor = self.compositing_ancestor(layers, idx);
        let ancestor_backing = ancestor.and_then(|a| self.backing_at(a));
        let local_bounds = backing.composited_bounds;
        let delta = layers.offset_from_ancestor_at(idx, ancestor);
        let relative = local_bounds + delta;

        // Origin of the surface this backing's outer surface is parented to,
        // in ancestor coordinates.
        let mut parent_origin = match (ancestor, ancestor_backing) {
            (Some(a), Some(ab)) => match layers.scroll[a as usize] {
                Some(s) if ab.has_scrolling_layer() => -s.offset,
                _ if ab.has_clipping_layer() => layers
                    .clip_box_at(a)
                    .map_or(Vec2::ZERO, |r| r.origin().to_vec2()),
                _ => ab.composited_bounds().origin().to_vec2(),
            },
            _ => Vec2::ZERO,
        };

        if let (Some(a), Some(clip_surface)) = (ancestor, backing.ancestor_clip) {
            if let Some(clip) = GeometryCache::clip_between(layers, idx, a) {
                surfaces.set_position(clip_surface, clip.origin() - parent_origin);
                surfaces.set_size(clip_surface, clip.size());
                surfaces.set_offset_from_layer(clip_surface, clip.origin().to_vec2() - delta);
                parent_origin = clip.origin().to_vec2();
            }
        }

        let contents_size = relative.size();
        if let Some(cc) = backing.contents_containment {
            surfaces.set_preserves_3d(cc, preserves_3d);
            surfaces.set_position(cc, relative.origin() - parent_origin);
            surfaces.set_size(cc, contents_size);
            parent_origin = relative.origin().to_vec2();
            surfaces.set_position(primary, Point::ZERO);
        } else {
            surfaces.set_position(primary, relative.origin() - parent_origin);
        }
        surfaces.set_offset_from_layer(primary, local_bounds.origin().to_vec2());
        if surfaces.properties(primary).size != contents_size {
            surfaces.set_size(primary, contents_size);
            if backing.bounds_constrained_by_clipping {
                surfaces.set_needs_display(primary);
            }
        }

        let mut clipping_box = Rect::ZERO;
        if let Some(clip) = backing.child_containment {
            clipping_box = layers
                .clip_box_at(idx)
                .unwrap_or_else(|| layers.size[slot].to_rect());
            surfaces.set_position(clip, clipping_box.origin() - local_bounds.origin().to_vec2());
            surfaces.set_size(clip, clipping_box.size());
            surfaces.set_offset_from_layer(clip, clipping_box.origin().to_vec2());
        }

        if let Some(mask) = backing.mask {
            if surfaces.properties(mask).size != contents_size {
                surfaces.set_size(mask, contents_size);
                surfaces.set_needs_display(mask);
            }
            surfaces.set_position(mask, Point::ZERO);
            surfaces.set_offset_from_layer(mask, local_bounds.origin().to_vec2());
        }

        let anchor_target = backing.contents_containment.unwrap_or(primary);
        if style.transform.is_some() || style.perspective.is_some() || style.preserve_3d {
            let origin = layers.transform_origin_at(idx);
            let layer_origin = delta.to_point();
            let anchor = Point::new(
                anchor_fraction(layer_origin.x - relative.x0 + origin.x, relative.width()),
                anchor_fraction(layer_origin.y - relative.y0 + origin.y, relative.height()),
            );
            surfaces.set_anchor_point(anchor_target, anchor, 0.0);
            let children = style
                .perspective
                .map_or(Transform3d::IDENTITY, |d| perspective_transform(layers, idx, d));
            match backing.child_containment {
                Some(clip) => {
                    surfaces.set_children_transform(clip, children);
                    surfaces.set_children_transform(primary, Transform3d::IDENTITY);
                }
                None => surfaces.set_children_transform(primary, children),
            }
        } else {
            surfaces.set_anchor_point(anchor_target, Point::new(0.5, 0.5), 0.0);
        }

        if let Some(fg) = backing.foreground {
            let (position, size, offset) = if backing.child_containment.is_some() {
                (
                    Point::ZERO + (local_bounds.origin() - clipping_box.origin()),
                    clipping_box.size(),
                    clipping_box.origin().to_vec2(),
                )
            } else {
                (Point::ZERO, contents_size, local_bounds.origin().to_vec2())
            };
            if surfaces.properties(fg).size != size {
                surfaces.set_size(fg, size);
                surfaces.set_needs_display(fg);
            }
            surfaces.set_position(fg, position);
            surfaces.set_offset_from_layer(fg, offset);
        }

        if let Some(bg) = backing.background {
            if surfaces.properties(bg).size != contents_size {
                surfaces.set_size(bg, contents_size);
                surfaces.set_needs_display(bg);
            }
            surfaces.set_position(bg, Point::ZERO);
            surfaces.set_offset_from_layer(bg, local_bounds.origin().to_vec2());
        }

        if let (Some(scrolling), Some(contents)) = (backing.scrolling, backing.scrolling_contents) {
            let padding_box = layers.size[slot].to_rect();
            let scroll = layers.scroll[slot].unwrap_or_default();
            surfaces.set_position(
                scrolling,
                Point::ZERO + (padding_box.origin() - local_bounds.origin()),
            );
            surfaces.set_size(scrolling, padding_box.size());
            let old_offset = surfaces.properties(scrolling).offset_from_layer;
            let new_offset = padding_box.origin().to_vec2() - local_bounds.origin().to_vec2();
            surfaces.set_offset_from_layer(scrolling, new_offset);
            surfaces.set_position(contents, Point::ZERO - scroll.offset);
            if surfaces.properties(contents).size != scroll.contents_size || old_offset != new_offset
            {
                surfaces.set_size(contents, scroll.contents_size);
                surfaces.set_needs_display(contents);
            }
            surfaces.set_offset_from_layer(contents, padding_box.origin().to_vec2() - scroll.offset);
        }

        if let Some(controls) = layers.overflow_controls[slot] {
            let offset = surfaces.properties(primary).offset_from_layer;
            for (surface, rect) in [
                (backing.horizontal_scrollbar, controls.horizontal),
                (backing.vertical_scrollbar, controls.vertical),
                (backing.scroll_corner, controls.corner),
            ] {
                if let (Some(s), Some(r)) = (surface, rect) {
                    surfaces.set_position(s, r.origin() - offset);
                    surfaces.set_size(s, r.size());
                    surfaces.set_draws_content(s, true);
                }
            }
        }

        // Backing store decision.
        let policy = CompositingPolicy {
            config: &self.config,
            in_compositing_mode: self.in_compositing_mode,
            frames: pass.frames,
        };
        let facts = LayerFacts {
            is_composited: true,
            has_compositing_descendant: self.state[slot].has_compositing_descendant,
        };
        let query = BackingStoreQuery {
            ancestor_has_backing_store: ancestor_backing.is_some_and(|ab| {
                ab.paints_into_composited_ancestor()
                    || pass.surfaces.properties(ab.primary).draws_content
            }),
            indirect: self.state[slot].indirect,
            bounds_in_ancestor: relative,
            ancestor_bounds: ancestor_backing.map(LayerBacking::composited_bounds),
        };
        let requires = policy.requires_own_backing_store(layers, idx, facts, &query);
        if requires != backing.requires_own_backing_store {
            backing.requires_own_backing_store = requires;
            if let Some(a) = ancestor {
                self.repaints.push(RepaintRequest {
                    container: layers.id_at(a),
                    rect: relative,
                });
            }
        }

        self.update_draws_content(pass, idx, &backing);
        self.backings[slot] = Some(backing);

        let reflection = layers.reflection[slot];
        if reflection != INVALID && self.is_composited_at(reflection) {
            self.update_backing_geometry(pass, reflection);
            let owner_bounds = self.backing_at(idx).map(LayerBacking::composited_bounds);
            let reflection_backing = self.backing_at(reflection);
            if let (Some(owner_bounds), Some(rb)) = (owner_bounds, reflection_backing) {
                pass.surfaces.set_replicated_position(
                    rb.primary,
                    Some(Point::ZERO + (owner_bounds.origin() - rb.composited_bounds.origin())),
                );
            }
        }
    }

    /// Decides which of the backing's surfaces hold painted content.
    fn update_draws_content(&self, pass: &mut Pass<'_, '_>, idx: u32, backing: &LayerBacking) {
        let layers = pass.layers;
        let style = layers.style_at(idx);
        let surfaces = &mut *pass.surfaces;
        let primary = backing.primary;

        let painted = if let Some(contents) = backing.scrolling_contents {
            let decorated =
                style.visible && (style.has_box_decorations || style.background_color.is_some());
            let scrolled = (style.visible && style.background_color.is_some())
                || self.paints_children(layers, idx);
            set_draws_content(surfaces, contents, scrolled);
            decorated
        } else {
            self.contains_painted_content(layers, idx, backing)
        };
        set_draws_content(surfaces, primary, painted);
        for aux in [backing.foreground, backing.background].into_iter().flatten() {
            set_draws_content(surfaces, aux, painted);
        }

        let opaque = style.background_color.is_some_and(|c| c.is_opaque())
            && !style.creates_group()
            && contains_rect(layers.size[idx as usize].to_rect(), backing.composited_bounds);
        surfaces.set_contents_opaque(primary, opaque);
        surfaces.set_painting_phase(primary, backing.primary_painting_phase());
    }

    fn contains_painted_content(&self, layers: &LayerTree, idx: u32, backing: &LayerBacking) -> bool {
        if self.is_simple_container(layers, idx)
            || backing.paints_into_composited_ancestor()
            || backing.artificially_inflated_bounds
            || layers.reflection_owner[idx as usize] != INVALID
        {
            return false;
        }
        let style = layers.style_at(idx);
        match layers.content_at(idx) {
            LayerContent::Image {
                directly_composited: true,
            } => false,
            LayerContent::Video { displays: true, .. }
            | LayerContent::Canvas {
                accelerated: true, ..
            } => style.has_box_decorations || style.background_color.is_some(),
            _ => true,
        }
    }

    /// A layer that paints nothing but (at most) a background color.
    fn is_simple_container(&self, layers: &LayerTree, idx: u32) -> bool {
        let style = layers.style_at(idx);
        !(style.has_mask
            || layers.content_at(idx).is_replaced()
            || (style.visible && style.has_box_decorations)
            || self.paints_children(layers, idx))
    }

    fn paints_children(&self, layers: &LayerTree, idx: u32) -> bool {
        let style = layers.style_at(idx);
        (style.visible && style.paints_content)
            || self.has_visible_non_composited_descendant(layers, idx)
    }

    fn has_visible_non_composited_descendant(&self, layers: &LayerTree, idx: u32) -> bool {
        [
            layers.neg_z_order_list(idx),
            layers.normal_flow_list(idx),
            layers.pos_z_order_list(idx),
        ]
        .into_iter()
        .flatten()
        .any(|&child| {
            !self.is_composited_at(child)
                && (layers.style_at(child).visible
                    || self.has_visible_non_composited_descendant(layers, child))
        })
    }

    /// Opacity the surface applies: the layer's own times that of
    /// non-composited stacking-context ancestors, which have no surface to
    /// apply it.
    fn compositing_opacity(&self, layers: &LayerTree, idx: u32) -> f32 {
        let mut opacity = layers.style_at(idx).opacity;
        let mut p = layers.parent[idx as usize];
        while p != INVALID {
            if layers.is_stacking_context_at(p) {
                if self.is_composited_at(p) {
                    break;
                }
                opacity *= layers.style_at(p).opacity;
            }
            p = layers.parent[p as usize];
        }
        opacity
    }

    /// The layer is clipped by a layer between it and its compositing
    /// ancestor.
    fn clipped_by_ancestor(&self, layers: &LayerTree, idx: u32) -> bool {
        if idx == layers.root {
            return false;
        }
        self.compositing_ancestor(layers, idx)
            .is_some_and(|a| GeometryCache::clip_between(layers, idx, a).is_some())
    }

    fn can_render_3d(&self) -> bool {
        self.config.accelerated_compositing && self.config.three_d_transform_trigger
    }
}

/// Transform of the layer or an ancestor (or composited scrolling) prevents
/// trimming bounds to the visible region.
fn transformed_or_scrolled(layers: &LayerTree, idx: u32) -> bool {
    let mut n = idx;
    while n != INVALID {
        let slot = n as usize;
        if layers.style[slot].transform.is_some()
            || layers.scroll[slot].is_some_and(|s| s.composited)
        {
            return true;
        }
        n = layers.coord_parent_at(n);
    }
    false
}

fn anchor_fraction(offset: f64, extent: f64) -> f64 {
    if extent == 0.0 { 0.5 } else { offset / extent }
}

/// Perspective matrix applied to children, about the perspective origin
/// relative to the layer's centre.
fn perspective_transform(layers: &LayerTree, idx: u32, distance: f64) -> Transform3d {
    let size = layers.size[idx as usize];
    let centre = Point::new(size.width / 2.0, size.height / 2.0);
    let origin = layers.style_at(idx).perspective_origin.unwrap_or(centre);
    let ox = origin.x - centre.x;
    let oy = origin.y - centre.y;
    Transform3d::from_translation(ox, oy, 0.0)
        * Transform3d::from_perspective(distance)
        * Transform3d::from_translation(-ox, -oy, 0.0)
}

fn set_draws_content(surfaces: &mut SurfaceTree, id: SurfaceId, draws: bool) {
    let was = surfaces.properties(id).draws_content;
    surfaces.set_draws_content(id, draws);
    if draws && !was {
        surfaces.set_needs_display(id);
    }
}
