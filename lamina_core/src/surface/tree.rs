// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface arena: handles, attributes, ordered children, and change draining.

use alloc::vec::Vec;

use kurbo::{Point, Size, Vec2};
use understory_dirty::{Channel, CycleHandling, DirtyTracker};

use super::id::SurfaceId;
use crate::dirty;
use crate::layer::{Color, INVALID, LayerId};
use crate::transform::Transform3d;

/// What a surface stands for within its owner's backing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    /// The per-document surface hosting the root layer's surface.
    RootContent,
    /// The main surface of a backing.
    Primary,
    /// Clips the backing to its ancestors' clip between it and its
    /// compositing ancestor.
    AncestorClip,
    /// Wraps the primary surface so a background surface can sit beneath it.
    ContentsContainment,
    /// Clips composited descendants to the layer's clip box.
    ChildContainment,
    /// Paints the layer's foreground above negative-z children.
    Foreground,
    /// Paints a fixed root background.
    Background,
    /// Mask image.
    Mask,
    /// Horizontal scrollbar.
    HorizontalScrollbar,
    /// Vertical scrollbar.
    VerticalScrollbar,
    /// Scroll corner.
    ScrollCorner,
    /// Clips composited scrolling contents to the padding box.
    Scrolling,
    /// Moves with the scroll offset inside [`Scrolling`](Self::Scrolling).
    ScrollingContents,
}

/// Content source of a surface other than painted layer content.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SurfaceContent {
    /// Painted content only (or nothing).
    #[default]
    None,
    /// A solid color fill.
    SolidColor(Color),
    /// A directly composited image.
    Image,
    /// A media player or plug-in layer.
    Media,
    /// An accelerated canvas.
    Canvas,
}

bitflags::bitflags! {
    /// Which parts of the owning layer a surface paints.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PaintingPhase: u8 {
        /// Backgrounds and borders.
        const BACKGROUND = 1 << 0;
        /// Normal-flow foreground content.
        const FOREGROUND = 1 << 1;
        /// The mask image.
        const MASK = 1 << 2;
        /// Content that scrolls inside an overflow container.
        const OVERFLOW_CONTENTS = 1 << 3;
        /// Everything painted inside a composited scrolling layer.
        const COMPOSITED_SCROLL = 1 << 4;
    }
}

impl Default for PaintingPhase {
    fn default() -> Self {
        Self::BACKGROUND | Self::FOREGROUND | Self::MASK
    }
}

/// Attributes of one surface.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceProperties {
    /// Position of the anchor-adjusted origin in the parent surface.
    pub position: Point,
    /// Size of the surface.
    pub size: Size,
    /// Anchor point as a fraction of the size.
    pub anchor_point: Point,
    /// Z component of the anchor point.
    pub anchor_point_z: f64,
    /// Offset of the surface from the owning layer's origin.
    pub offset_from_layer: Vec2,
    /// Transform about the anchor point.
    pub transform: Transform3d,
    /// Transform applied to the children (perspective).
    pub children_transform: Transform3d,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Clips children to the bounds.
    pub masks_to_bounds: bool,
    /// Children share this surface's 3-D space.
    pub preserves_3d: bool,
    /// The back face is drawn.
    pub backface_visible: bool,
    /// The surface's own contents are shown.
    pub contents_visible: bool,
    /// The contents are known to be opaque.
    pub contents_opaque: bool,
    /// Content source.
    pub content: SurfaceContent,
    /// The surface has a backing store that the owner paints into.
    pub draws_content: bool,
    /// Which phases the owner paints into the backing store.
    pub painting_phase: PaintingPhase,
    /// Mask surface.
    pub mask: Option<SurfaceId>,
    /// Surface drawn again as this surface's reflection.
    pub replica: Option<SurfaceId>,
    /// Position of the replica, relative to the replicated surface.
    pub replicated_position: Option<Point>,
    /// The backing store must be repainted.
    pub needs_display: bool,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            size: Size::ZERO,
            anchor_point: Point::new(0.5, 0.5),
            anchor_point_z: 0.0,
            offset_from_layer: Vec2::ZERO,
            transform: Transform3d::IDENTITY,
            children_transform: Transform3d::IDENTITY,
            opacity: 1.0,
            masks_to_bounds: false,
            preserves_3d: false,
            backface_visible: true,
            contents_visible: true,
            contents_opaque: false,
            content: SurfaceContent::None,
            draws_content: false,
            painting_phase: PaintingPhase::default(),
            mask: None,
            replica: None,
            replicated_position: None,
            needs_display: false,
        }
    }
}

/// Changes drained by [`SurfaceTree::evaluate`], as raw slot indices.
#[derive(Clone, Debug, Default)]
pub struct SurfaceChanges {
    /// Surfaces whose geometry attributes changed.
    pub geometry: Vec<u32>,
    /// Surfaces whose appearance attributes changed.
    pub appearance: Vec<u32>,
    /// Surfaces whose content source or painting configuration changed.
    pub content: Vec<u32>,
    /// Surfaces whose child list or parent changed.
    pub topology: Vec<u32>,
    /// Surfaces whose backing store must be repainted.
    pub display: Vec<u32>,
    /// Surfaces created since the last drain.
    pub added: Vec<u32>,
    /// Surfaces destroyed since the last drain.
    pub removed: Vec<u32>,
}

impl SurfaceChanges {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
            && self.appearance.is_empty()
            && self.content.is_empty()
            && self.topology.is_empty()
            && self.display.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

/// Arena of presentation surfaces.
///
/// The compositor creates one or more surfaces per composited layer and
/// arranges them into a tree that mirrors paint order. Attribute setters
/// record a change only when the stored value differs.
#[derive(Debug)]
pub struct SurfaceTree {
    role: Vec<SurfaceRole>,
    owner: Vec<Option<LayerId>>,
    parent: Vec<u32>,
    children: Vec<Vec<u32>>,
    props: Vec<SurfaceProperties>,

    generation: Vec<u32>,
    alive: Vec<bool>,
    free_list: Vec<u32>,
    len: u32,
    live: u32,
    limit: Option<u32>,

    dirty: DirtyTracker<u32>,
    pending_display: Vec<u32>,
    pending_added: Vec<u32>,
    pending_removed: Vec<u32>,
}

impl Default for SurfaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceTree {
    /// Creates an empty surface tree without an allocation limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            role: Vec::new(),
            owner: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
            props: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            live: 0,
            limit: None,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_display: Vec::new(),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    /// Creates an empty surface tree that refuses to hold more than `limit`
    /// live surfaces.
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        let mut tree = Self::new();
        tree.limit = Some(limit);
        tree
    }

    /// Changes the live-surface limit. Existing surfaces are kept.
    pub fn set_limit(&mut self, limit: Option<u32>) {
        self.limit = limit;
    }

    /// Returns the number of live surfaces.
    #[must_use]
    pub fn live_count(&self) -> u32 {
        self.live
    }

    /// Returns the number of slots (live and free).
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.len
    }

    // -- Allocation --

    /// Creates a detached surface, or returns `None` if the limit is reached.
    pub fn create_surface(&mut self, role: SurfaceRole, owner: Option<LayerId>) -> Option<SurfaceId> {
        if self.limit.is_some_and(|limit| self.live >= limit) {
            return None;
        }
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.role[i] = role;
            self.owner[i] = owner;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.props[i] = SurfaceProperties::default();
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.role.push(role);
            self.owner.push(owner);
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.props.push(SurfaceProperties::default());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.live += 1;
        self.pending_added.push(idx);
        Some(self.id_at(idx))
    }

    /// Destroys a surface.
    ///
    /// The surface is removed from its parent, its children are detached
    /// (not destroyed), and mask or replica references to it are cleared.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_surface(&mut self, id: SurfaceId) {
        self.validate(id);
        let idx = id.idx;
        if self.parent[idx as usize] != INVALID {
            self.unlink(idx);
        }
        for child in core::mem::take(&mut self.children[idx as usize]) {
            self.parent[child as usize] = INVALID;
            self.dirty.mark(child, dirty::SURFACE_TOPOLOGY);
        }
        for other in 0..self.len as usize {
            if !self.alive[other] {
                continue;
            }
            let p = &mut self.props[other];
            let mut changed = false;
            if p.mask == Some(id) {
                p.mask = None;
                changed = true;
            }
            if p.replica == Some(id) {
                p.replica = None;
                changed = true;
            }
            if changed {
                self.dirty.mark(other as u32, dirty::SURFACE_APPEARANCE);
            }
        }

        self.dirty.remove_key(idx);
        self.generation[idx as usize] += 1;
        self.alive[idx as usize] = false;
        self.owner[idx as usize] = None;
        self.free_list.push(idx);
        self.live -= 1;
        self.pending_removed.push(idx);
    }

    /// Returns whether the handle refers to a live surface.
    #[must_use]
    pub fn is_alive(&self, id: SurfaceId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    // -- Topology --

    /// Replaces the children of `parent`, in order.
    ///
    /// Children that currently have a different parent are moved. Nothing is
    /// marked if the list is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if any handle is stale or a child is `parent` itself.
    pub fn set_children(&mut self, parent: SurfaceId, children: &[SurfaceId]) {
        self.validate(parent);
        let p = parent.idx;
        let mut new: Vec<u32> = Vec::with_capacity(children.len());
        for &c in children {
            self.validate(c);
            assert!(c.idx != p, "surface cannot be its own child");
            new.push(c.idx);
        }
        if self.children[p as usize] == new {
            return;
        }
        for old in core::mem::take(&mut self.children[p as usize]) {
            if !new.contains(&old) {
                self.parent[old as usize] = INVALID;
                self.dirty.mark(old, dirty::SURFACE_TOPOLOGY);
            }
        }
        for &c in &new {
            let old_parent = self.parent[c as usize];
            if old_parent != INVALID && old_parent != p {
                self.children[old_parent as usize].retain(|&x| x != c);
                self.dirty.mark(old_parent, dirty::SURFACE_TOPOLOGY);
            }
            if old_parent != p {
                self.dirty.mark(c, dirty::SURFACE_TOPOLOGY);
            }
            self.parent[c as usize] = p;
        }
        self.children[p as usize] = new;
        self.dirty.mark(p, dirty::SURFACE_TOPOLOGY);
    }

    /// Appends `child` to the children of `parent`, moving it if attached
    /// elsewhere.
    pub fn add_child(&mut self, parent: SurfaceId, child: SurfaceId) {
        self.validate(parent);
        self.validate(child);
        assert!(child.idx != parent.idx, "surface cannot be its own child");
        if self.parent[child.idx as usize] == parent.idx {
            return;
        }
        if self.parent[child.idx as usize] != INVALID {
            self.unlink(child.idx);
        }
        self.parent[child.idx as usize] = parent.idx;
        self.children[parent.idx as usize].push(child.idx);
        self.dirty.mark(parent.idx, dirty::SURFACE_TOPOLOGY);
        self.dirty.mark(child.idx, dirty::SURFACE_TOPOLOGY);
    }

    /// Detaches a surface from its parent. Does nothing if it has none.
    pub fn remove_from_parent(&mut self, id: SurfaceId) {
        self.validate(id);
        if self.parent[id.idx as usize] != INVALID {
            self.unlink(id.idx);
        }
    }

    /// Returns the parent of a surface.
    #[must_use]
    pub fn parent(&self, id: SurfaceId) -> Option<SurfaceId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns the children of a surface, in order.
    pub fn children(&self, id: SurfaceId) -> impl Iterator<Item = SurfaceId> + '_ {
        self.validate(id);
        self.children[id.idx as usize]
            .iter()
            .map(|&c| self.id_at(c))
    }

    /// Returns the children of the surface at raw slot `idx`.
    #[must_use]
    pub fn children_at(&self, idx: u32) -> &[u32] {
        &self.children[idx as usize]
    }

    // -- Getters --

    /// Returns the role of a surface.
    #[must_use]
    pub fn role(&self, id: SurfaceId) -> SurfaceRole {
        self.validate(id);
        self.role[id.idx as usize]
    }

    /// Returns the layer that owns a surface (`None` for the root content
    /// surface).
    #[must_use]
    pub fn owner(&self, id: SurfaceId) -> Option<LayerId> {
        self.validate(id);
        self.owner[id.idx as usize]
    }

    /// Returns the attributes of a surface.
    #[must_use]
    pub fn properties(&self, id: SurfaceId) -> &SurfaceProperties {
        self.validate(id);
        &self.props[id.idx as usize]
    }

    /// Returns the current handle for raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.slot_count()`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> SurfaceId {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        SurfaceId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the role at raw slot `idx`.
    #[must_use]
    pub fn role_at(&self, idx: u32) -> SurfaceRole {
        self.role[idx as usize]
    }

    /// Returns the attributes at raw slot `idx`.
    #[must_use]
    pub fn properties_at(&self, idx: u32) -> &SurfaceProperties {
        &self.props[idx as usize]
    }

    /// Returns whether raw slot `idx` holds a live surface.
    #[must_use]
    pub fn is_alive_at(&self, idx: u32) -> bool {
        idx < self.len && self.alive[idx as usize]
    }

    // -- Setters (mark only on change) --

    /// Sets the position in the parent surface.
    pub fn set_position(&mut self, id: SurfaceId, position: Point) {
        self.update(id, dirty::SURFACE_GEOMETRY, position, |p| &mut p.position);
    }

    /// Sets the size.
    pub fn set_size(&mut self, id: SurfaceId, size: Size) {
        self.update(id, dirty::SURFACE_GEOMETRY, size, |p| &mut p.size);
    }

    /// Sets the anchor point (fractions of the size) and its z component.
    pub fn set_anchor_point(&mut self, id: SurfaceId, anchor: Point, z: f64) {
        self.update(id, dirty::SURFACE_GEOMETRY, anchor, |p| &mut p.anchor_point);
        self.update(id, dirty::SURFACE_GEOMETRY, z, |p| &mut p.anchor_point_z);
    }

    /// Sets the offset of the surface from the owning layer's origin.
    pub fn set_offset_from_layer(&mut self, id: SurfaceId, offset: Vec2) {
        self.update(id, dirty::SURFACE_GEOMETRY, offset, |p| {
            &mut p.offset_from_layer
        });
    }

    /// Sets the transform.
    pub fn set_transform(&mut self, id: SurfaceId, transform: Transform3d) {
        self.update(id, dirty::SURFACE_GEOMETRY, transform, |p| &mut p.transform);
    }

    /// Sets the children transform.
    pub fn set_children_transform(&mut self, id: SurfaceId, transform: Transform3d) {
        self.update(id, dirty::SURFACE_GEOMETRY, transform, |p| {
            &mut p.children_transform
        });
    }

    /// Sets the position of the replica relative to the replicated surface.
    pub fn set_replicated_position(&mut self, id: SurfaceId, position: Option<Point>) {
        self.update(id, dirty::SURFACE_GEOMETRY, position, |p| {
            &mut p.replicated_position
        });
    }

    /// Sets the opacity.
    pub fn set_opacity(&mut self, id: SurfaceId, opacity: f32) {
        self.update(id, dirty::SURFACE_APPEARANCE, opacity, |p| &mut p.opacity);
    }

    /// Sets whether children are clipped to the bounds.
    pub fn set_masks_to_bounds(&mut self, id: SurfaceId, masks: bool) {
        self.update(id, dirty::SURFACE_APPEARANCE, masks, |p| {
            &mut p.masks_to_bounds
        });
    }

    /// Sets whether children share this surface's 3-D space.
    pub fn set_preserves_3d(&mut self, id: SurfaceId, preserves: bool) {
        self.update(id, dirty::SURFACE_APPEARANCE, preserves, |p| {
            &mut p.preserves_3d
        });
    }

    /// Sets whether the back face is drawn.
    pub fn set_backface_visible(&mut self, id: SurfaceId, visible: bool) {
        self.update(id, dirty::SURFACE_APPEARANCE, visible, |p| {
            &mut p.backface_visible
        });
    }

    /// Sets whether the surface's own contents are shown.
    pub fn set_contents_visible(&mut self, id: SurfaceId, visible: bool) {
        self.update(id, dirty::SURFACE_APPEARANCE, visible, |p| {
            &mut p.contents_visible
        });
    }

    /// Sets whether the contents are known to be opaque.
    pub fn set_contents_opaque(&mut self, id: SurfaceId, opaque: bool) {
        self.update(id, dirty::SURFACE_APPEARANCE, opaque, |p| {
            &mut p.contents_opaque
        });
    }

    /// Sets the mask surface.
    pub fn set_mask(&mut self, id: SurfaceId, mask: Option<SurfaceId>) {
        self.update(id, dirty::SURFACE_APPEARANCE, mask, |p| &mut p.mask);
    }

    /// Sets the replica surface.
    pub fn set_replica(&mut self, id: SurfaceId, replica: Option<SurfaceId>) {
        self.update(id, dirty::SURFACE_APPEARANCE, replica, |p| &mut p.replica);
    }

    /// Sets the content source.
    pub fn set_content(&mut self, id: SurfaceId, content: SurfaceContent) {
        self.update(id, dirty::SURFACE_CONTENT, content, |p| &mut p.content);
    }

    /// Sets whether the owner paints into a backing store.
    pub fn set_draws_content(&mut self, id: SurfaceId, draws: bool) {
        self.update(id, dirty::SURFACE_CONTENT, draws, |p| &mut p.draws_content);
    }

    /// Sets which phases the owner paints.
    pub fn set_painting_phase(&mut self, id: SurfaceId, phase: PaintingPhase) {
        self.update(id, dirty::SURFACE_CONTENT, phase, |p| {
            &mut p.painting_phase
        });
    }

    /// Requests a repaint of the surface's backing store.
    pub fn set_needs_display(&mut self, id: SurfaceId) {
        self.validate(id);
        let p = &mut self.props[id.idx as usize];
        if !p.needs_display {
            p.needs_display = true;
            self.pending_display.push(id.idx);
        }
    }

    // -- Evaluation --

    /// Drains all change channels.
    ///
    /// Needs-display flags are cleared; the affected surfaces are reported in
    /// [`SurfaceChanges::display`].
    pub fn evaluate(&mut self) -> SurfaceChanges {
        let mut changes = SurfaceChanges::default();
        let alive = &self.alive;
        for (channel, out) in [
            (dirty::SURFACE_GEOMETRY, &mut changes.geometry),
            (dirty::SURFACE_APPEARANCE, &mut changes.appearance),
            (dirty::SURFACE_CONTENT, &mut changes.content),
            (dirty::SURFACE_TOPOLOGY, &mut changes.topology),
        ] {
            *out = self
                .dirty
                .drain(channel)
                .deterministic()
                .run()
                .filter(|&idx| alive.get(idx as usize).copied().unwrap_or(false))
                .collect();
        }

        for idx in core::mem::take(&mut self.pending_display) {
            if self.alive[idx as usize] {
                self.props[idx as usize].needs_display = false;
                changes.display.push(idx);
            }
        }
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
        changes
    }

    // -- Internal helpers --

    fn update<T: PartialEq>(
        &mut self,
        id: SurfaceId,
        channel: Channel,
        value: T,
        field: impl FnOnce(&mut SurfaceProperties) -> &mut T,
    ) {
        self.validate(id);
        let slot = field(&mut self.props[id.idx as usize]);
        if *slot != value {
            *slot = value;
            self.dirty.mark(id.idx, channel);
        }
    }

    fn unlink(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        self.children[p as usize].retain(|&c| c != idx);
        self.parent[idx as usize] = INVALID;
        self.dirty.mark(p, dirty::SURFACE_TOPOLOGY);
        self.dirty.mark(idx, dirty::SURFACE_TOPOLOGY);
    }

    fn validate(&self, id: SurfaceId) {
        assert!(
            self.is_alive(id),
            "stale SurfaceId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn surface(tree: &mut SurfaceTree) -> SurfaceId {
        tree.create_surface(SurfaceRole::Primary, None)
            .expect("no limit set")
    }

    #[test]
    fn limit_refuses_allocation() {
        let mut tree = SurfaceTree::with_limit(1);
        let a = tree.create_surface(SurfaceRole::Primary, None);
        assert!(a.is_some());
        assert!(tree.create_surface(SurfaceRole::Primary, None).is_none());
        tree.destroy_surface(a.expect("first allocation succeeds"));
        assert!(tree.create_surface(SurfaceRole::Primary, None).is_some());
    }

    #[test]
    fn set_children_moves_and_detaches() {
        let mut tree = SurfaceTree::new();
        let p1 = surface(&mut tree);
        let p2 = surface(&mut tree);
        let a = surface(&mut tree);
        let b = surface(&mut tree);

        tree.set_children(p1, &[a, b]);
        assert_eq!(tree.children(p1).collect::<Vec<_>>(), vec![a, b]);

        tree.set_children(p2, &[b]);
        assert_eq!(tree.children(p1).collect::<Vec<_>>(), vec![a]);
        assert_eq!(tree.parent(b), Some(p2));

        tree.set_children(p1, &[]);
        assert_eq!(tree.parent(a), None);
    }

    #[test]
    fn unchanged_setters_do_not_mark() {
        let mut tree = SurfaceTree::new();
        let s = surface(&mut tree);
        tree.set_opacity(s, 0.5);
        let changes = tree.evaluate();
        assert_eq!(changes.appearance, vec![s.idx]);
        assert_eq!(changes.added, vec![s.idx]);

        tree.set_opacity(s, 0.5);
        tree.set_position(s, Point::ZERO);
        assert!(tree.evaluate().is_empty());
    }

    #[test]
    fn destroy_clears_references_and_children() {
        let mut tree = SurfaceTree::new();
        let owner = surface(&mut tree);
        let mask = surface(&mut tree);
        let child = surface(&mut tree);
        tree.set_mask(owner, Some(mask));
        tree.add_child(mask, child);

        tree.destroy_surface(mask);
        assert_eq!(tree.properties(owner).mask, None);
        assert_eq!(tree.parent(child), None);
        assert_eq!(tree.live_count(), 2);
    }

    #[test]
    fn needs_display_is_reported_once() {
        let mut tree = SurfaceTree::new();
        let s = surface(&mut tree);
        let _ = tree.evaluate();
        tree.set_needs_display(s);
        tree.set_needs_display(s);
        let changes = tree.evaluate();
        assert_eq!(changes.display, vec![s.idx]);
        assert!(!tree.properties(s).needs_display);
    }

    #[test]
    #[should_panic(expected = "stale SurfaceId")]
    fn destroyed_handle_panics() {
        let mut tree = SurfaceTree::new();
        let s = surface(&mut tree);
        tree.destroy_surface(s);
        tree.set_opacity(s, 0.0);
    }
}
