// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass 1: deciding which layers are composited.

use crate::geometry::GeometryCache;
use crate::layer::{AnimatedProperties, INVALID};

use super::{
    CompositingPolicy, CompositingReasons, IndirectReason, LayerFacts, LayerTreeCompositor,
    OverlapIndex, Pass,
};

/// Traversal context handed from a layer to its children.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CompositingState {
    /// Nearest composited ancestor (as decided so far in this pass).
    pub(crate) ancestor: Option<u32>,
    /// Something already visited under the current stacking context is
    /// composited.
    pub(crate) subtree_is_compositing: bool,
    /// Later layers still test against the overlap index.
    pub(crate) testing_overlap: bool,
}

impl CompositingState {
    pub(crate) fn for_root() -> Self {
        Self {
            ancestor: None,
            subtree_is_compositing: false,
            testing_overlap: true,
        }
    }

    fn for_children(&self) -> Self {
        Self {
            subtree_is_compositing: false,
            ..*self
        }
    }
}

impl LayerTreeCompositor {
    /// Visits `idx` and its descendants in paint order, creating and
    /// destroying backings.
    ///
    /// `state` is the parent's traversal context; `descendant_has_3d` is set
    /// if this layer or a descendant has a 3-D transform.
    pub(super) fn compute_compositing_requirements(
        &mut self,
        pass: &mut Pass<'_, '_>,
        idx: u32,
        overlap: &mut OverlapIndex,
        state: &mut CompositingState,
        layers_changed: &mut bool,
        descendant_has_3d: &mut bool,
    ) {
        let layers = pass.layers;
        assert!(!layers.z_order_lists_dirty(), "stale z-order lists");
        self.visited += 1;
        let slot = idx as usize;
        let is_root = idx == layers.root;
        self.state[slot].has_compositing_descendant = false;

        let mut indirect = if state.subtree_is_compositing {
            IndirectReason::Stacking
        } else {
            IndirectReason::None
        };
        if !overlap.is_empty() && state.testing_overlap {
            let local = layers.local_bounding_box_at(idx);
            let bounds = self.geometry.absolute_rect(layers, idx, local);
            indirect = if overlap.overlaps(bounds) {
                IndirectReason::Overlap
            } else {
                IndirectReason::None
            };
        }
        // Media controls render above the video surface.
        if state
            .ancestor
            .is_some_and(|a| layers.content_at(a).is_video())
        {
            indirect = IndirectReason::Overlap;
        }
        self.state[slot].indirect = indirect;

        let policy = CompositingPolicy {
            config: &self.config,
            in_compositing_mode: self.in_compositing_mode,
            frames: pass.frames,
        };
        let can_composite = policy.can_be_composited();
        let facts = LayerFacts {
            is_composited: self.is_composited_at(idx),
            has_compositing_descendant: false,
        };
        let direct = policy.direct_reasons(layers, idx, facts);
        self.state[slot].reasons = direct;

        let mut will_be_composited = can_composite
            && (!direct.is_empty()
                || indirect != IndirectReason::None
                || (is_root && self.in_compositing_mode));

        let mut child_state = state.for_children();
        if will_be_composited {
            state.subtree_is_compositing = true;
            child_state.ancestor = Some(idx);
            overlap.push_container();
            child_state.testing_overlap = true;
        }

        let mut any_3d = false;
        let stacking = layers.is_stacking_context_at(idx);
        if stacking {
            for &child in layers.neg_z_order_list(idx) {
                self.compute_compositing_requirements(
                    pass,
                    child,
                    overlap,
                    &mut child_state,
                    layers_changed,
                    &mut any_3d,
                );
                // A composited negative-z child must render beneath this
                // layer's content, which therefore needs a surface too.
                if !will_be_composited && child_state.subtree_is_compositing {
                    self.state[slot].indirect = IndirectReason::BackgroundLayer;
                    child_state.ancestor = Some(idx);
                    overlap.push_container();
                    // Later children paint above this layer's own surface,
                    // so whatever runs behind it no longer matters to them.
                    child_state.testing_overlap = true;
                    will_be_composited = true;
                }
            }
        }
        for &child in layers.normal_flow_list(idx) {
            self.compute_compositing_requirements(
                pass,
                child,
                overlap,
                &mut child_state,
                layers_changed,
                &mut any_3d,
            );
        }
        if stacking {
            for &child in layers.pos_z_order_list(idx) {
                self.compute_compositing_requirements(
                    pass,
                    child,
                    overlap,
                    &mut child_state,
                    layers_changed,
                    &mut any_3d,
                );
            }
        }

        if is_root && self.in_compositing_mode && can_composite {
            will_be_composited = true;
        }

        // Non-composited layers paint into their compositing ancestor and
        // still count for overlap once that ancestor's container is popped.
        if child_state.ancestor.is_some_and(|a| a != layers.root) {
            self.add_to_overlap_map(pass, overlap, idx);
        }

        if !will_be_composited && can_composite {
            let policy = CompositingPolicy {
                config: &self.config,
                in_compositing_mode: self.in_compositing_mode,
                frames: pass.frames,
            };
            let reason =
                policy.indirect_reason(layers, idx, child_state.subtree_is_compositing, any_3d);
            if reason != IndirectReason::None {
                self.state[slot].indirect = reason;
                child_state.ancestor = Some(idx);
                overlap.push_container();
                self.add_to_overlap_map_recursive(pass, overlap, idx);
                will_be_composited = true;
            }
        }

        if child_state.subtree_is_compositing {
            state.subtree_is_compositing = true;
        }
        self.state[slot].has_compositing_descendant = child_state.subtree_is_compositing;

        let style = layers.style_at(idx);
        let clips_compositing_descendants = can_composite
            && child_state.subtree_is_compositing
            && style.has_clip_or_overflow_clip();
        if clips_compositing_descendants {
            self.state[slot].reasons |= CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS;
        }
        // A clipping layer already bounds whatever its descendants do, so
        // only unclipped subtrees (or a transform animation here) stop
        // overlap testing for later siblings.
        if (!child_state.testing_overlap && !clips_compositing_descendants)
            || style.animations.contains(AnimatedProperties::TRANSFORM)
        {
            state.testing_overlap = false;
        }
        if clips_compositing_descendants && !will_be_composited {
            child_state.ancestor = Some(idx);
            overlap.push_container();
            self.add_to_overlap_map_recursive(pass, overlap, idx);
            will_be_composited = true;
        }

        if child_state.ancestor == Some(idx) && !is_root {
            overlap.pop_container();
        }

        if is_root
            && !child_state.subtree_is_compositing
            && direct.is_empty()
            && !self.config.force_compositing_mode
            && !self.has_any_additional_composited_layers(idx)
        {
            if self.in_compositing_mode {
                if self.is_composited_at(idx) {
                    *layers_changed = true;
                }
                self.leave_compositing_mode(pass);
            }
            will_be_composited = false;
        }

        if self.update_backing(pass, idx, will_be_composited) {
            *layers_changed = true;
        }
        let reflection = layers.reflection[slot];
        if reflection != INVALID {
            self.state[reflection as usize].indirect = if will_be_composited {
                IndirectReason::Stacking
            } else {
                IndirectReason::None
            };
            let composite_reflection = will_be_composited && self.is_composited_at(idx);
            if self.update_backing(pass, reflection, composite_reflection) {
                *layers_changed = true;
            }
        }

        *descendant_has_3d |= any_3d || style.has_3d_transform();
    }

    /// Inserts the layer's bounds (with its non-composited descendants,
    /// clipped by ancestor clips) into the overlap index.
    fn add_to_overlap_map(&mut self, pass: &Pass<'_, '_>, overlap: &mut OverlapIndex, idx: u32) {
        let layers = pass.layers;
        if idx == layers.root || overlap.contains(idx) {
            return;
        }
        let local = GeometryCache::layer_bounds(layers, idx, &|c| self.is_composited_at(c));
        let mut bounds = self.geometry.absolute_rect(layers, idx, local);
        if let Some(clip) = self.geometry.absolute_clip(layers, idx) {
            bounds = bounds.intersect(clip);
        }
        overlap.insert(idx, bounds);
    }

    /// Inserts the layer and every descendant reachable through its lists.
    fn add_to_overlap_map_recursive(
        &mut self,
        pass: &Pass<'_, '_>,
        overlap: &mut OverlapIndex,
        idx: u32,
    ) {
        if overlap.contains(idx) {
            return;
        }
        self.add_to_overlap_map(pass, overlap, idx);
        let layers = pass.layers;
        for list in [
            layers.neg_z_order_list(idx),
            layers.normal_flow_list(idx),
            layers.pos_z_order_list(idx),
        ] {
            for &child in list {
                self.add_to_overlap_map_recursive(pass, overlap, child);
            }
        }
    }
}
