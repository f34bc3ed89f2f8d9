// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deciding which layers need their own surface.
//!
//! [`CompositingPolicy`] is a pure function of a layer's style and content,
//! the [`CompositingConfig`] triggers, and a handful of facts the compositor
//! tracks between passes ([`LayerFacts`]). It never touches surfaces.

use kurbo::Rect;

use super::frames::FrameContents;
use crate::config::CompositingConfig;
use crate::layer::{AnimatedProperties, LayerContent, LayerTree};

bitflags::bitflags! {
    /// Direct reasons for a layer to get its own surface.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CompositingReasons: u32 {
        /// The transform has a 3-D component.
        const THREE_D_TRANSFORM = 1 << 0;
        /// Accelerated video.
        const VIDEO = 1 << 1;
        /// Accelerated canvas.
        const CANVAS = 1 << 2;
        /// Accelerated plug-in.
        const PLUGIN = 1 << 3;
        /// Composited sub-document.
        const IFRAME = 1 << 4;
        /// `backface-visibility: hidden`.
        const BACKFACE_VISIBILITY_HIDDEN = 1 << 5;
        /// Clips descendants that have their own surfaces.
        const CLIPS_COMPOSITING_DESCENDANTS = 1 << 6;
        /// Running accelerated animation.
        const ANIMATION = 1 << 7;
        /// Filter.
        const FILTER = 1 << 8;
        /// Non-normal blend mode.
        const BLEND_MODE = 1 << 9;
        /// Scrolls by moving a surface.
        const COMPOSITED_SCROLLING = 1 << 10;
        /// Animating into or out of full-screen.
        const FULL_SCREEN = 1 << 11;
    }
}

/// Why a layer without a direct reason is composited anyway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndirectReason {
    /// Not composited for an indirect reason.
    #[default]
    None,
    /// Paints after a composited sibling in the same stacking context.
    Stacking,
    /// Overlaps a composited layer painted beneath it.
    Overlap,
    /// Has a composited negative-z child, which must render beneath the
    /// layer's own content.
    BackgroundLayer,
    /// Applies a group effect (transform, opacity, mask, filter, blending,
    /// reflection) to composited descendants.
    GraphicalEffect,
    /// Applies perspective to a 3-D-transformed composited descendant.
    Perspective,
    /// Establishes a 3-D rendering context for a 3-D-transformed composited
    /// descendant.
    Preserve3D,
}

/// Per-layer facts carried over from the compositor's bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerFacts {
    /// The layer currently has a backing.
    pub is_composited: bool,
    /// Some descendant currently has a backing.
    pub has_compositing_descendant: bool,
}

/// Inputs to [`CompositingPolicy::requires_own_backing_store`].
#[derive(Clone, Copy, Debug)]
pub struct BackingStoreQuery {
    /// The compositing ancestor paints into a backing store of its own.
    pub ancestor_has_backing_store: bool,
    /// The layer's indirect reason.
    pub indirect: IndirectReason,
    /// The layer's composited bounds in the ancestor's coordinates.
    pub bounds_in_ancestor: Rect,
    /// The ancestor's composited bounds, or `None` without an ancestor.
    pub ancestor_bounds: Option<Rect>,
}

/// Compositing decisions for one document.
#[derive(Clone, Copy)]
pub struct CompositingPolicy<'a> {
    /// Active triggers.
    pub config: &'a CompositingConfig,
    /// Whether the document is currently in compositing mode.
    pub in_compositing_mode: bool,
    /// Sub-document compositing state.
    pub frames: &'a dyn FrameContents,
}

impl core::fmt::Debug for CompositingPolicy<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompositingPolicy")
            .field("config", self.config)
            .field("in_compositing_mode", &self.in_compositing_mode)
            .finish_non_exhaustive()
    }
}

impl CompositingPolicy<'_> {
    /// Returns whether any layer may be composited at all.
    #[must_use]
    pub fn can_be_composited(&self) -> bool {
        self.config.accelerated_compositing
    }

    /// Returns `true` if the layer needs its own surface for a reason of its
    /// own (as opposed to an [`IndirectReason`]).
    #[must_use]
    pub fn requires_own_surface(&self, layers: &LayerTree, idx: u32, facts: LayerFacts) -> bool {
        !self.direct_reasons(layers, idx, facts).is_empty()
    }

    /// Returns every direct reason that holds for the layer.
    #[must_use]
    pub fn direct_reasons(&self, layers: &LayerTree, idx: u32, facts: LayerFacts) -> CompositingReasons {
        let cfg = self.config;
        let style = layers.style_at(idx);
        let needs_layout = layers.needs_layout[idx as usize];
        let mut reasons = CompositingReasons::empty();

        if cfg.three_d_transform_trigger && style.has_3d_transform() {
            reasons |= CompositingReasons::THREE_D_TRANSFORM;
        }
        if cfg.three_d_transform_trigger && style.backface_hidden {
            reasons |= CompositingReasons::BACKFACE_VISIBILITY_HIDDEN;
        }

        match layers.content_at(idx) {
            LayerContent::Video {
                displays,
                accelerated,
            } => {
                if cfg.video_trigger && displays && accelerated {
                    reasons |= CompositingReasons::VIDEO;
                }
            }
            LayerContent::Canvas {
                accelerated,
                is_3d,
                size,
            } => {
                if cfg.canvas_trigger
                    && accelerated
                    && (is_3d || size.area() >= cfg.canvas_area_threshold)
                {
                    reasons |= CompositingReasons::CANVAS;
                }
            }
            LayerContent::Plugin {
                allows_accelerated,
                content_box,
            } => {
                if cfg.plugin_trigger && allows_accelerated {
                    // Layout has not settled the content box yet; keep whatever
                    // was decided last time.
                    let wants = if needs_layout {
                        facts.is_composited
                    } else {
                        content_box.area() > 1.0
                    };
                    if wants {
                        reasons |= CompositingReasons::PLUGIN;
                    }
                }
            }
            LayerContent::Frame {
                document,
                requires_accelerated,
                content_box,
            } => {
                if requires_accelerated && self.frames.propagates_compositing(document) {
                    let wants = if needs_layout || idx == layers.root {
                        facts.is_composited
                    } else {
                        !content_box.is_zero_area()
                    };
                    if wants {
                        reasons |= CompositingReasons::IFRAME;
                    }
                }
            }
            LayerContent::Box | LayerContent::Image { .. } => {}
        }

        if facts.has_compositing_descendant && style.has_clip_or_overflow_clip() {
            reasons |= CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS;
        }

        if cfg.animation_trigger {
            let anim = style.animations;
            let opacity = anim.contains(AnimatedProperties::OPACITY)
                && (self.in_compositing_mode || cfg.animated_opacity_trigger);
            if opacity
                || anim.intersects(AnimatedProperties::TRANSFORM | AnimatedProperties::FILTER)
            {
                reasons |= CompositingReasons::ANIMATION;
            }
        }

        if cfg.filter_trigger && style.has_filter {
            reasons |= CompositingReasons::FILTER;
        }
        if style.has_blend_mode {
            reasons |= CompositingReasons::BLEND_MODE;
        }
        if layers.scroll[idx as usize].is_some_and(|s| s.composited) {
            reasons |= CompositingReasons::COMPOSITED_SCROLLING;
        }
        if style.full_screen_animating {
            reasons |= CompositingReasons::FULL_SCREEN;
        }
        reasons
    }

    /// Returns the reason a layer must be composited because of what its
    /// composited descendants need, or [`IndirectReason::None`].
    ///
    /// `has_compositing_descendant` and `has_3d_descendant` describe the
    /// subtree as computed by the current pass.
    #[must_use]
    pub fn indirect_reason(
        &self,
        layers: &LayerTree,
        idx: u32,
        has_compositing_descendant: bool,
        has_3d_descendant: bool,
    ) -> IndirectReason {
        if !has_compositing_descendant {
            return IndirectReason::None;
        }
        let style = layers.style_at(idx);
        let has_reflection = layers.reflection[idx as usize] != crate::layer::INVALID;
        if style.transform.is_some() || style.creates_group() || has_reflection {
            return IndirectReason::GraphicalEffect;
        }
        if has_3d_descendant {
            if style.preserve_3d {
                return IndirectReason::Preserve3D;
            }
            if style.perspective.is_some() {
                return IndirectReason::Perspective;
            }
        }
        IndirectReason::None
    }

    /// Returns `true` if a composited layer needs a backing store of its own
    /// rather than painting into its compositing ancestor's.
    #[must_use]
    pub fn requires_own_backing_store(
        &self,
        layers: &LayerTree,
        idx: u32,
        facts: LayerFacts,
        query: &BackingStoreQuery,
    ) -> bool {
        if query.ancestor_bounds.is_some() && !query.ancestor_has_backing_store {
            return true;
        }
        let style = layers.style_at(idx);
        let direct = self.direct_reasons(layers, idx, facts)
            - CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS;
        if idx == layers.root
            || style.transform.is_some()
            || !direct.is_empty()
            || style.opacity < 1.0
            || style.has_mask
            || style.has_filter
            || layers.reflection[idx as usize] != crate::layer::INVALID
        {
            return true;
        }
        if matches!(
            query.indirect,
            IndirectReason::Overlap
                | IndirectReason::Stacking
                | IndirectReason::BackgroundLayer
                | IndirectReason::GraphicalEffect
                | IndirectReason::Preserve3D
        ) {
            return true;
        }
        match query.ancestor_bounds {
            Some(ancestor) => !crate::geometry::contains_rect(ancestor, query.bounds_in_ancestor),
            None => true,
        }
    }
}
