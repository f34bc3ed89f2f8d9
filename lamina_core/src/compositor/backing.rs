// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The set of surfaces owned by one composited layer.
//!
//! Every backing has a primary surface. The others exist only while the
//! layer's configuration calls for them:
//!
//! ```text
//! ancestor clip
//! └─ contents containment
//!    ├─ background
//!    └─ primary
//!       ├─ child containment
//!       │  └─ scrolling
//!       │     └─ scrolling contents   <- parent_for_sublayers
//!       ├─ horizontal scrollbar
//!       ├─ vertical scrollbar
//!       └─ scroll corner
//! ```
//!
//! The foreground surface is parented among the layer's composited children
//! by the rebuild pass, and the mask hangs off the primary surface's mask
//! property rather than its children.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::layer::LayerId;
use crate::surface::{PaintingPhase, SurfaceId, SurfaceRole, SurfaceTree};

/// Surfaces and cached state of a composited layer.
#[derive(Clone, Debug)]
pub struct LayerBacking {
    owner: LayerId,
    pub(crate) primary: SurfaceId,
    pub(crate) ancestor_clip: Option<SurfaceId>,
    pub(crate) contents_containment: Option<SurfaceId>,
    pub(crate) background: Option<SurfaceId>,
    pub(crate) child_containment: Option<SurfaceId>,
    pub(crate) foreground: Option<SurfaceId>,
    pub(crate) mask: Option<SurfaceId>,
    pub(crate) horizontal_scrollbar: Option<SurfaceId>,
    pub(crate) vertical_scrollbar: Option<SurfaceId>,
    pub(crate) scroll_corner: Option<SurfaceId>,
    pub(crate) scrolling: Option<SurfaceId>,
    pub(crate) scrolling_contents: Option<SurfaceId>,
    pub(crate) composited_bounds: Rect,
    pub(crate) bounds_constrained_by_clipping: bool,
    pub(crate) artificially_inflated_bounds: bool,
    pub(crate) requires_own_backing_store: bool,
}

/// Outcome of toggling an auxiliary surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Toggle {
    Unchanged,
    Changed,
    /// The surface was wanted but could not be allocated.
    Refused(SurfaceRole),
}

impl Toggle {
    pub(crate) fn changed(self) -> bool {
        self == Self::Changed
    }
}

impl LayerBacking {
    /// Allocates the primary surface for `owner`. `None` if refused.
    pub(crate) fn new(owner: LayerId, surfaces: &mut SurfaceTree) -> Option<Self> {
        let primary = surfaces.create_surface(SurfaceRole::Primary, Some(owner))?;
        Some(Self {
            owner,
            primary,
            ancestor_clip: None,
            contents_containment: None,
            background: None,
            child_containment: None,
            foreground: None,
            mask: None,
            horizontal_scrollbar: None,
            vertical_scrollbar: None,
            scroll_corner: None,
            scrolling: None,
            scrolling_contents: None,
            composited_bounds: Rect::ZERO,
            bounds_constrained_by_clipping: false,
            artificially_inflated_bounds: false,
            requires_own_backing_store: true,
        })
    }

    /// The layer this backing belongs to.
    #[must_use]
    pub fn owner(&self) -> LayerId {
        self.owner
    }

    /// The primary surface.
    #[must_use]
    pub fn primary(&self) -> SurfaceId {
        self.primary
    }

    /// Clip applied by non-composited ancestors between the layer and its
    /// compositing ancestor.
    #[must_use]
    pub fn ancestor_clip(&self) -> Option<SurfaceId> {
        self.ancestor_clip
    }

    /// Wrapper holding the background and primary surfaces.
    #[must_use]
    pub fn contents_containment(&self) -> Option<SurfaceId> {
        self.contents_containment
    }

    /// Fixed root background.
    #[must_use]
    pub fn background(&self) -> Option<SurfaceId> {
        self.background
    }

    /// Clip for composited descendants.
    #[must_use]
    pub fn child_containment(&self) -> Option<SurfaceId> {
        self.child_containment
    }

    /// Foreground, painted above negative-z children.
    #[must_use]
    pub fn foreground(&self) -> Option<SurfaceId> {
        self.foreground
    }

    /// Mask.
    #[must_use]
    pub fn mask(&self) -> Option<SurfaceId> {
        self.mask
    }

    /// Horizontal scrollbar.
    #[must_use]
    pub fn horizontal_scrollbar(&self) -> Option<SurfaceId> {
        self.horizontal_scrollbar
    }

    /// Vertical scrollbar.
    #[must_use]
    pub fn vertical_scrollbar(&self) -> Option<SurfaceId> {
        self.vertical_scrollbar
    }

    /// Scroll corner.
    #[must_use]
    pub fn scroll_corner(&self) -> Option<SurfaceId> {
        self.scroll_corner
    }

    /// Scrolling clip.
    #[must_use]
    pub fn scrolling(&self) -> Option<SurfaceId> {
        self.scrolling
    }

    /// Scrolled contents.
    #[must_use]
    pub fn scrolling_contents(&self) -> Option<SurfaceId> {
        self.scrolling_contents
    }

    /// Bounds of the layer and its non-composited descendants, in layer
    /// coordinates.
    #[must_use]
    pub fn composited_bounds(&self) -> Rect {
        self.composited_bounds
    }

    /// The bounds were cut down to the document or an ancestor clip.
    #[must_use]
    pub fn bounds_constrained_by_clipping(&self) -> bool {
        self.bounds_constrained_by_clipping
    }

    /// The bounds were empty and grown to 1×1 to carry a transform origin.
    #[must_use]
    pub fn artificially_inflated_bounds(&self) -> bool {
        self.artificially_inflated_bounds
    }

    /// Returns `true` if the layer paints into its own backing store.
    #[must_use]
    pub fn requires_own_backing_store(&self) -> bool {
        self.requires_own_backing_store
    }

    /// Returns `true` if the layer's content is painted into the compositing
    /// ancestor's backing store instead of its own.
    #[must_use]
    pub fn paints_into_composited_ancestor(&self) -> bool {
        !self.requires_own_backing_store
    }

    /// Returns `true` if descendants are clipped by a child containment
    /// surface.
    #[must_use]
    pub fn has_clipping_layer(&self) -> bool {
        self.child_containment.is_some()
    }

    /// Returns `true` if the layer scrolls by moving a surface.
    #[must_use]
    pub fn has_scrolling_layer(&self) -> bool {
        self.scrolling.is_some()
    }

    /// The surface composited descendants are attached to.
    #[must_use]
    pub fn parent_for_sublayers(&self) -> SurfaceId {
        self.scrolling_contents
            .or(self.child_containment)
            .unwrap_or(self.primary)
    }

    /// The outermost surface, attached to the enclosing surface list.
    #[must_use]
    pub fn child_for_superlayers(&self) -> SurfaceId {
        self.ancestor_clip
            .or(self.contents_containment)
            .unwrap_or(self.primary)
    }

    /// The surface clipping descendants, if any.
    #[must_use]
    pub fn clipping_layer(&self) -> Option<SurfaceId> {
        self.child_containment
    }

    /// Every surface of the backing, primary first.
    #[must_use]
    pub fn surfaces(&self) -> Vec<SurfaceId> {
        let mut out = alloc::vec![self.primary];
        out.extend(
            [
                self.ancestor_clip,
                self.contents_containment,
                self.background,
                self.child_containment,
                self.foreground,
                self.mask,
                self.horizontal_scrollbar,
                self.vertical_scrollbar,
                self.scroll_corner,
                self.scrolling,
                self.scrolling_contents,
            ]
            .into_iter()
            .flatten(),
        );
        out
    }

    /// Detaches and destroys every surface.
    pub(crate) fn destroy(self, surfaces: &mut SurfaceTree) {
        for id in self.surfaces() {
            if surfaces.is_alive(id) {
                surfaces.destroy_surface(id);
            }
        }
    }

    // -- Configuration --

    fn toggle(
        surfaces: &mut SurfaceTree,
        slot: &mut Option<SurfaceId>,
        want: bool,
        role: SurfaceRole,
        owner: LayerId,
    ) -> Toggle {
        match (*slot, want) {
            (None, true) => match surfaces.create_surface(role, Some(owner)) {
                Some(id) => {
                    *slot = Some(id);
                    Toggle::Changed
                }
                None => Toggle::Refused(role),
            },
            (Some(id), false) => {
                surfaces.destroy_surface(id);
                *slot = None;
                Toggle::Changed
            }
            _ => Toggle::Unchanged,
        }
    }

    /// Creates or destroys the foreground surface.
    pub(crate) fn update_foreground(&mut self, surfaces: &mut SurfaceTree, want: bool) -> Toggle {
        let t = Self::toggle(
            surfaces,
            &mut self.foreground,
            want,
            SurfaceRole::Foreground,
            self.owner,
        );
        if t.changed() {
            if let Some(fg) = self.foreground {
                surfaces.set_painting_phase(fg, PaintingPhase::FOREGROUND);
            }
        }
        t
    }

    /// Creates or destroys the background surface and its containment
    /// wrapper.
    pub(crate) fn update_background(&mut self, surfaces: &mut SurfaceTree, want: bool) -> Vec<Toggle> {
        let owner = self.owner;
        let bg = Self::toggle(surfaces, &mut self.background, want, SurfaceRole::Background, owner);
        if bg.changed() {
            if let Some(id) = self.background {
                surfaces.set_painting_phase(id, PaintingPhase::BACKGROUND);
            }
        }
        let want_containment = self.background.is_some();
        let cc = Self::toggle(
            surfaces,
            &mut self.contents_containment,
            want_containment,
            SurfaceRole::ContentsContainment,
            owner,
        );
        alloc::vec![bg, cc]
    }

    /// Creates or destroys the two clipping surfaces.
    pub(crate) fn update_clipping(
        &mut self,
        surfaces: &mut SurfaceTree,
        ancestor_clip: bool,
        child_clip: bool,
    ) -> Vec<Toggle> {
        let owner = self.owner;
        let a = Self::toggle(
            surfaces,
            &mut self.ancestor_clip,
            ancestor_clip,
            SurfaceRole::AncestorClip,
            owner,
        );
        if a.changed() {
            if let Some(id) = self.ancestor_clip {
                surfaces.set_masks_to_bounds(id, true);
            }
        }
        let c = Self::toggle(
            surfaces,
            &mut self.child_containment,
            child_clip,
            SurfaceRole::ChildContainment,
            owner,
        );
        if c.changed() {
            if let Some(id) = self.child_containment {
                surfaces.set_masks_to_bounds(id, true);
            }
        }
        alloc::vec![a, c]
    }

    /// Creates or destroys the scrollbar and scroll-corner surfaces.
    pub(crate) fn update_overflow_controls(
        &mut self,
        surfaces: &mut SurfaceTree,
        horizontal: bool,
        vertical: bool,
        corner: bool,
    ) -> Vec<Toggle> {
        let owner = self.owner;
        alloc::vec![
            Self::toggle(
                surfaces,
                &mut self.horizontal_scrollbar,
                horizontal,
                SurfaceRole::HorizontalScrollbar,
                owner,
            ),
            Self::toggle(
                surfaces,
                &mut self.vertical_scrollbar,
                vertical,
                SurfaceRole::VerticalScrollbar,
                owner,
            ),
            Self::toggle(
                surfaces,
                &mut self.scroll_corner,
                corner,
                SurfaceRole::ScrollCorner,
                owner,
            ),
        ]
    }

    /// Creates or destroys the scrolling pair.
    pub(crate) fn update_scrolling(&mut self, surfaces: &mut SurfaceTree, want: bool) -> Vec<Toggle> {
        let owner = self.owner;
        let s = Self::toggle(surfaces, &mut self.scrolling, want, SurfaceRole::Scrolling, owner);
        if s.changed() {
            if let Some(id) = self.scrolling {
                surfaces.set_masks_to_bounds(id, true);
            }
        }
        let want_contents = self.scrolling.is_some();
        let c = Self::toggle(
            surfaces,
            &mut self.scrolling_contents,
            want_contents,
            SurfaceRole::ScrollingContents,
            owner,
        );
        if let (Some(outer), Some(inner)) = (self.scrolling, self.scrolling_contents) {
            surfaces.set_children(outer, &[inner]);
            surfaces.set_painting_phase(
                inner,
                PaintingPhase::FOREGROUND
                    | PaintingPhase::OVERFLOW_CONTENTS
                    | PaintingPhase::COMPOSITED_SCROLL,
            );
        }
        alloc::vec![s, c]
    }

    /// Creates or destroys the mask surface and points the primary surface
    /// at it.
    pub(crate) fn update_mask(&mut self, surfaces: &mut SurfaceTree, want: bool) -> Toggle {
        let t = Self::toggle(surfaces, &mut self.mask, want, SurfaceRole::Mask, self.owner);
        if let Some(mask) = self.mask {
            surfaces.set_painting_phase(mask, PaintingPhase::MASK);
            surfaces.set_draws_content(mask, true);
        }
        surfaces.set_mask(self.primary, self.mask);
        t
    }

    /// Painting phases of the primary surface given the auxiliary surfaces
    /// that take over parts of its painting.
    #[must_use]
    pub(crate) fn primary_painting_phase(&self) -> PaintingPhase {
        let mut phase = PaintingPhase::BACKGROUND;
        if self.foreground.is_none() {
            phase |= PaintingPhase::FOREGROUND;
        }
        if self.mask.is_none() {
            phase |= PaintingPhase::MASK;
        }
        if self.scrolling_contents.is_some() {
            phase -= PaintingPhase::FOREGROUND;
        }
        if self.background.is_some() {
            phase -= PaintingPhase::BACKGROUND;
        }
        phase
    }

    /// Re-links the backing's own surfaces.
    ///
    /// The foreground surface is left alone; it is ordered among child
    /// surfaces by the rebuild pass.
    pub(crate) fn update_internal_hierarchy(&self, surfaces: &mut SurfaceTree) {
        if let Some(clip) = self.ancestor_clip {
            surfaces.set_children(clip, &[]);
        }
        if let Some(cc) = self.contents_containment {
            surfaces.set_children(cc, &[]);
            if let Some(clip) = self.ancestor_clip {
                surfaces.add_child(clip, cc);
            }
            if let Some(bg) = self.background {
                surfaces.add_child(cc, bg);
            }
        }

        surfaces.remove_from_parent(self.primary);
        if let Some(cc) = self.contents_containment {
            surfaces.add_child(cc, self.primary);
        } else if let Some(clip) = self.ancestor_clip {
            surfaces.add_child(clip, self.primary);
        }

        if let Some(child_clip) = self.child_containment {
            surfaces.remove_from_parent(child_clip);
            surfaces.add_child(self.primary, child_clip);
        }
        if let Some(scrolling) = self.scrolling {
            let superlayer = self.child_containment.unwrap_or(self.primary);
            surfaces.remove_from_parent(scrolling);
            surfaces.add_child(superlayer, scrolling);
        }

        // Scrollbars sit outside the descendant clip.
        for control in [
            self.horizontal_scrollbar,
            self.vertical_scrollbar,
            self.scroll_corner,
        ]
        .into_iter()
        .flatten()
        {
            surfaces.remove_from_parent(control);
            surfaces.add_child(self.primary, control);
        }
    }

    /// Scrollbar and scroll-corner surfaces, in paint order.
    pub(crate) fn overflow_control_surfaces(&self) -> impl Iterator<Item = SurfaceId> {
        [
            self.horizontal_scrollbar,
            self.vertical_scrollbar,
            self.scroll_corner,
        ]
        .into_iter()
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerTree;

    fn backing(surfaces: &mut SurfaceTree) -> LayerBacking {
        let mut layers = LayerTree::new();
        let root = layers.create_root_layer();
        LayerBacking::new(root, surfaces).unwrap()
    }

    #[test]
    fn plain_backing_uses_primary_everywhere() {
        let mut surfaces = SurfaceTree::new();
        let b = backing(&mut surfaces);
        assert_eq!(b.parent_for_sublayers(), b.primary());
        assert_eq!(b.child_for_superlayers(), b.primary());
        assert_eq!(b.surfaces().len(), 1);
    }

    #[test]
    fn clipping_surfaces_wrap_primary() {
        let mut surfaces = SurfaceTree::new();
        let mut b = backing(&mut surfaces);
        let toggles = b.update_clipping(&mut surfaces, true, true);
        assert!(toggles.iter().all(|t| t.changed()));
        b.update_internal_hierarchy(&mut surfaces);

        let outer = b.ancestor_clip().unwrap();
        let inner = b.child_containment().unwrap();
        assert_eq!(b.child_for_superlayers(), outer);
        assert_eq!(b.parent_for_sublayers(), inner);
        assert_eq!(surfaces.parent(b.primary()), Some(outer));
        assert_eq!(surfaces.parent(inner), Some(b.primary()));
        assert!(surfaces.properties(outer).masks_to_bounds);
    }

    #[test]
    fn scrollbars_stay_outside_child_clip() {
        let mut surfaces = SurfaceTree::new();
        let mut b = backing(&mut surfaces);
        b.update_clipping(&mut surfaces, false, true);
        b.update_overflow_controls(&mut surfaces, true, true, false);
        b.update_internal_hierarchy(&mut surfaces);
        let children: Vec<_> = surfaces.children(b.primary()).collect();
        assert_eq!(
            children,
            [
                b.child_containment().unwrap(),
                b.horizontal_scrollbar().unwrap(),
                b.vertical_scrollbar().unwrap(),
            ]
        );
    }

    #[test]
    fn scrolling_contents_receive_sublayers() {
        let mut surfaces = SurfaceTree::new();
        let mut b = backing(&mut surfaces);
        b.update_scrolling(&mut surfaces, true);
        b.update_internal_hierarchy(&mut surfaces);
        let contents = b.scrolling_contents().unwrap();
        assert_eq!(b.parent_for_sublayers(), contents);
        assert_eq!(surfaces.parent(contents), b.scrolling());
        assert!(!b.primary_painting_phase().contains(PaintingPhase::FOREGROUND));
    }

    #[test]
    fn removing_auxiliary_surfaces_destroys_them() {
        let mut surfaces = SurfaceTree::new();
        let mut b = backing(&mut surfaces);
        b.update_mask(&mut surfaces, true);
        let mask = b.mask().unwrap();
        assert_eq!(surfaces.properties(b.primary()).mask, Some(mask));
        assert!(b.update_mask(&mut surfaces, false).changed());
        assert!(!surfaces.is_alive(mask));
        assert_eq!(surfaces.properties(b.primary()).mask, None);
    }

    #[test]
    fn refused_surface_is_reported() {
        let mut surfaces = SurfaceTree::with_limit(1);
        let mut b = backing(&mut surfaces);
        assert_eq!(
            b.update_foreground(&mut surfaces, true),
            Toggle::Refused(SurfaceRole::Foreground)
        );
        assert!(b.foreground().is_none());
    }

    #[test]
    fn destroy_releases_every_surface() {
        let mut surfaces = SurfaceTree::new();
        let mut b = backing(&mut surfaces);
        b.update_clipping(&mut surfaces, true, false);
        b.update_foreground(&mut surfaces, true);
        b.destroy(&mut surfaces);
        assert_eq!(surfaces.live_count(), 0);
    }
}
