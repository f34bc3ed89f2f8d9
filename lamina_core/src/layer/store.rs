// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property management.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, LayerId};
use super::style::{LayerContent, LayerStyle, OverflowControls, ScrollState};
use super::traverse::Children;
use crate::dirty;
use crate::transform::Transform3d;

/// Struct-of-arrays storage for the layers of one document.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Destroyed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Exactly one layer may be designated the root (see
/// [`create_root_layer`](Self::create_root_layer)); the compositor walks the
/// stacking-context tree from there.
#[derive(Debug)]
pub struct LayerTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) reflection: Vec<u32>,
    pub(crate) reflection_owner: Vec<u32>,
    pub(crate) root: u32,

    // -- Geometry (set by layout) --
    pub(crate) offset: Vec<Vec2>,
    pub(crate) size: Vec<Size>,
    pub(crate) visual_overflow: Vec<Option<Rect>>,

    // -- Style and content (set by layout) --
    pub(crate) style: Vec<LayerStyle>,
    pub(crate) content: Vec<LayerContent>,
    pub(crate) overflow_controls: Vec<Option<OverflowControls>>,
    pub(crate) scroll: Vec<Option<ScrollState>>,
    pub(crate) needs_layout: Vec<bool>,
    pub(crate) document_needs_layout: bool,

    // -- Stacking order (derived) --
    pub(crate) neg_z_list: Vec<Vec<u32>>,
    pub(crate) pos_z_list: Vec<Vec<u32>>,
    pub(crate) normal_flow_list: Vec<Vec<u32>>,
    pub(crate) z_order_dirty: bool,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    /// Creates an empty layer tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            reflection: Vec::new(),
            reflection_owner: Vec::new(),
            root: INVALID,
            offset: Vec::new(),
            size: Vec::new(),
            visual_overflow: Vec::new(),
            style: Vec::new(),
            content: Vec::new(),
            overflow_controls: Vec::new(),
            scroll: Vec::new(),
            needs_layout: Vec::new(),
            document_needs_layout: false,
            neg_z_list: Vec::new(),
            pos_z_list: Vec::new(),
            normal_flow_list: Vec::new(),
            z_order_dirty: true,
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new detached layer and returns its handle.
    ///
    /// The layer starts with zero size, default style, box content, and no
    /// parent.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.reflection[i] = INVALID;
            self.reflection_owner[i] = INVALID;
            self.offset[i] = Vec2::ZERO;
            self.size[i] = Size::ZERO;
            self.visual_overflow[i] = None;
            self.style[i] = LayerStyle::default();
            self.content[i] = LayerContent::Box;
            self.overflow_controls[i] = None;
            self.scroll[i] = None;
            self.needs_layout[i] = false;
            self.neg_z_list[i].clear();
            self.pos_z_list[i].clear();
            self.normal_flow_list[i].clear();
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.reflection.push(INVALID);
            self.reflection_owner.push(INVALID);
            self.offset.push(Vec2::ZERO);
            self.size.push(Size::ZERO);
            self.visual_overflow.push(None);
            self.style.push(LayerStyle::default());
            self.content.push(LayerContent::Box);
            self.overflow_controls.push(None);
            self.scroll.push(None);
            self.needs_layout.push(false);
            self.neg_z_list.push(Vec::new());
            self.pos_z_list.push(Vec::new());
            self.normal_flow_list.push(Vec::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        self.z_order_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        self.id_at(idx)
    }

    /// Creates the root layer of the document.
    ///
    /// # Panics
    ///
    /// Panics if a root layer already exists.
    pub fn create_root_layer(&mut self) -> LayerId {
        assert!(self.root == INVALID, "root layer already exists");
        let id = self.create_layer();
        self.root = id.idx;
        id
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// Any reflection relationship the layer takes part in is dissolved.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }
        let refl = self.reflection[idx as usize];
        if refl != INVALID {
            self.reflection_owner[refl as usize] = INVALID;
            self.reflection[idx as usize] = INVALID;
        }
        let owner = self.reflection_owner[idx as usize];
        if owner != INVALID {
            self.reflection[owner as usize] = INVALID;
            self.reflection_owner[idx as usize] = INVALID;
        }
        if self.root == idx {
            self.root = INVALID;
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.alive[idx as usize] = false;

        self.free_list.push(idx);
        self.z_order_dirty = true;
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Returns the root layer, if one has been created.
    #[must_use]
    pub fn root(&self) -> Option<LayerId> {
        (self.root != INVALID).then(|| self.id_at(self.root))
    }

    /// Returns whether `id` is the root layer.
    #[must_use]
    pub fn is_root(&self, id: LayerId) -> bool {
        self.validate(id);
        self.root == id.idx
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `child` is the root or a reflection.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(c != self.root, "root layer cannot be a child");
        assert!(
            self.reflection_owner[c as usize] == INVALID,
            "reflection layer cannot be a child"
        );

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Child geometry is relative to the parent.
        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);

        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.z_order_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);

        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.z_order_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::GEOMETRY);

        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.z_order_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Attaches (or with `None`, detaches) a reflection layer.
    ///
    /// The reflection is not part of the child list or the z-order lists; its
    /// offset is relative to `owner`, and it is composited exactly when
    /// `owner` is.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, if `reflection` has a parent, or if it
    /// already reflects another layer.
    pub fn set_reflection(&mut self, owner: LayerId, reflection: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let old = self.reflection[o as usize];
        if old != INVALID {
            self.reflection_owner[old as usize] = INVALID;
            self.dirty.remove_dependency(old, o, dirty::GEOMETRY);
        }
        self.reflection[o as usize] = INVALID;
        if let Some(r) = reflection {
            self.validate(r);
            assert!(
                self.parent[r.idx as usize] == INVALID,
                "reflection layer already has a parent"
            );
            assert!(
                self.reflection_owner[r.idx as usize] == INVALID,
                "layer already reflects another layer"
            );
            self.reflection[o as usize] = r.idx;
            self.reflection_owner[r.idx as usize] = o;
            let _ = self.dirty.add_dependency(r.idx, o, dirty::GEOMETRY);
        }
        self.z_order_dirty = true;
        self.dirty.mark(o, dirty::TOPOLOGY);
        self.dirty.mark(o, dirty::STYLE);
    }

    /// Returns the reflection attached to `owner`, if any.
    #[must_use]
    pub fn reflection(&self, owner: LayerId) -> Option<LayerId> {
        self.validate(owner);
        let r = self.reflection[owner.idx as usize];
        (r != INVALID).then(|| self.id_at(r))
    }

    // -- Property getters --

    /// Returns the offset of a layer from its parent's origin.
    #[must_use]
    pub fn offset(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.offset[id.idx as usize]
    }

    /// Returns the border-box size of a layer.
    #[must_use]
    pub fn size(&self, id: LayerId) -> Size {
        self.validate(id);
        self.size[id.idx as usize]
    }

    /// Returns the visual overflow rect of a layer, if set.
    #[must_use]
    pub fn visual_overflow(&self, id: LayerId) -> Option<Rect> {
        self.validate(id);
        self.visual_overflow[id.idx as usize]
    }

    /// Returns the style of a layer.
    #[must_use]
    pub fn style(&self, id: LayerId) -> &LayerStyle {
        self.validate(id);
        &self.style[id.idx as usize]
    }

    /// Returns the content type of a layer.
    #[must_use]
    pub fn content(&self, id: LayerId) -> LayerContent {
        self.validate(id);
        self.content[id.idx as usize]
    }

    /// Returns the overflow controls of a layer.
    #[must_use]
    pub fn overflow_controls(&self, id: LayerId) -> Option<OverflowControls> {
        self.validate(id);
        self.overflow_controls[id.idx as usize]
    }

    /// Returns the scroll state of a layer.
    #[must_use]
    pub fn scroll_state(&self, id: LayerId) -> Option<ScrollState> {
        self.validate(id);
        self.scroll[id.idx as usize]
    }

    /// Returns whether a layer is waiting for layout.
    #[must_use]
    pub fn needs_layout(&self, id: LayerId) -> bool {
        self.validate(id);
        self.needs_layout[id.idx as usize]
    }

    /// Returns whether the document as a whole is waiting for layout.
    #[must_use]
    pub fn document_needs_layout(&self) -> bool {
        self.document_needs_layout
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the offset of a layer from its parent's origin.
    ///
    /// Marks the GEOMETRY channel with eager propagation to descendants.
    pub fn set_offset(&mut self, id: LayerId, offset: Vec2) {
        self.validate(id);
        self.offset[id.idx as usize] = offset;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the border-box size of a layer.
    pub fn set_size(&mut self, id: LayerId, size: Size) {
        self.validate(id);
        self.size[id.idx as usize] = size;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the visual overflow rect (ink bounds in local coordinates).
    pub fn set_visual_overflow(&mut self, id: LayerId, overflow: Option<Rect>) {
        self.validate(id);
        self.visual_overflow[id.idx as usize] = overflow;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Replaces the style of a layer.
    ///
    /// Marks the STYLE channel. If the change affects stacking (stacking
    /// context, normal-flow membership, or z-index), the z-order lists are
    /// invalidated and TOPOLOGY is marked as well.
    pub fn set_style(&mut self, id: LayerId, style: LayerStyle) {
        self.validate(id);
        let idx = id.idx;
        let before = self.stacking_key(idx);
        self.style[idx as usize] = style;
        if self.stacking_key(idx) != before {
            self.z_order_dirty = true;
            self.dirty.mark(idx, dirty::TOPOLOGY);
        }
        self.dirty.mark(idx, dirty::STYLE);
        // Transforms move descendants.
        self.dirty.mark_with(idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Edits the style of a layer in place.
    ///
    /// Equivalent to reading the style, applying `f`, and calling
    /// [`set_style`](Self::set_style).
    pub fn update_style(&mut self, id: LayerId, f: impl FnOnce(&mut LayerStyle)) {
        self.validate(id);
        let mut style = self.style[id.idx as usize].clone();
        f(&mut style);
        self.set_style(id, style);
    }

    /// Sets the content type of a layer.
    pub fn set_content(&mut self, id: LayerId, content: LayerContent) {
        self.validate(id);
        self.content[id.idx as usize] = content;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the overflow controls of a layer.
    pub fn set_overflow_controls(&mut self, id: LayerId, controls: Option<OverflowControls>) {
        self.validate(id);
        self.overflow_controls[id.idx as usize] = controls;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the scroll state of a layer.
    ///
    /// Scrolling moves every descendant, so GEOMETRY is marked as well.
    pub fn set_scroll_state(&mut self, id: LayerId, scroll: Option<ScrollState>) {
        self.validate(id);
        let was_composited = self.scroll[id.idx as usize].is_some_and(|s| s.composited);
        self.scroll[id.idx as usize] = scroll;
        if scroll.is_some_and(|s| s.composited) != was_composited {
            self.dirty.mark(id.idx, dirty::CONTENT);
        }
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets whether a layer is waiting for layout.
    pub fn set_needs_layout(&mut self, id: LayerId, needs_layout: bool) {
        self.validate(id);
        self.needs_layout[id.idx as usize] = needs_layout;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets whether the document as a whole is waiting for layout.
    ///
    /// Compositing updates are skipped while this is set.
    pub fn set_document_needs_layout(&mut self, needs_layout: bool) {
        self.document_needs_layout = needs_layout;
    }

    // -- Stacking queries --

    /// Returns whether a layer establishes a stacking context.
    #[must_use]
    pub fn is_stacking_context(&self, id: LayerId) -> bool {
        self.validate(id);
        self.is_stacking_context_at(id.idx)
    }

    /// Returns whether a layer paints in its parent's normal flow.
    #[must_use]
    pub fn is_normal_flow_only(&self, id: LayerId) -> bool {
        self.validate(id);
        self.is_normal_flow_only_at(id.idx)
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `LayerChanges` and the
    // z-order lists) rather than `LayerId` handles, skipping generation
    // validation.

    /// Returns the current handle for raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> LayerId {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the style at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn style_at(&self, idx: u32) -> &LayerStyle {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.style[idx as usize]
    }

    /// Returns the content type at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn content_at(&self, idx: u32) -> LayerContent {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.content[idx as usize]
    }

    /// Returns whether raw slot `idx` holds a live layer.
    #[must_use]
    pub fn is_alive_at(&self, idx: u32) -> bool {
        idx < self.len && self.alive[idx as usize]
    }

    /// Returns the number of slots (live and free).
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.len
    }

    // -- Internal helpers --

    pub(crate) fn is_stacking_context_at(&self, idx: u32) -> bool {
        let s = &self.style[idx as usize];
        idx == self.root
            || (s.positioned && matches!(s.z_index, super::ZIndex::Value(_)))
            || s.opacity < 1.0
            || s.transform.is_some()
            || s.has_mask
            || s.has_filter
            || s.has_blend_mode
            || s.preserve_3d
            || self.reflection[idx as usize] != INVALID
    }

    pub(crate) fn is_normal_flow_only_at(&self, idx: u32) -> bool {
        !self.style[idx as usize].positioned && !self.is_stacking_context_at(idx)
    }

    /// Parent for coordinate purposes: the tree parent, or the owner of a
    /// reflection.
    pub(crate) fn coord_parent_at(&self, idx: u32) -> u32 {
        let p = self.parent[idx as usize];
        if p != INVALID {
            p
        } else {
            self.reflection_owner[idx as usize]
        }
    }

    /// Local bounding box: visual overflow if set, else the border box.
    pub(crate) fn local_bounding_box_at(&self, idx: u32) -> Rect {
        self.visual_overflow[idx as usize]
            .unwrap_or_else(|| self.size[idx as usize].to_rect())
    }

    /// Clip box in local coordinates: overflow clip intersected with the
    /// explicit clip, `None` if the layer does not clip.
    pub(crate) fn clip_box_at(&self, idx: u32) -> Option<Rect> {
        let s = &self.style[idx as usize];
        let overflow = s.overflow_clip.then(|| self.size[idx as usize].to_rect());
        match (overflow, s.clip) {
            (Some(a), Some(b)) => Some(a.intersect(b)),
            (a, b) => a.or(b),
        }
    }

    /// Position of the layer's origin in its coordinate parent, after the
    /// parent's scroll offset.
    pub(crate) fn position_in_parent_at(&self, idx: u32) -> Vec2 {
        let offset = self.offset[idx as usize];
        let p = self.parent[idx as usize];
        if p == INVALID {
            return offset;
        }
        match self.scroll[p as usize] {
            Some(scroll) => offset - scroll.offset,
            None => offset,
        }
    }

    /// Transform origin in local coordinates (the border-box centre unless
    /// set).
    pub(crate) fn transform_origin_at(&self, idx: u32) -> Point {
        self.style[idx as usize]
            .transform_origin
            .unwrap_or_else(|| self.size[idx as usize].to_rect().center())
    }

    /// The layer's transform applied about its transform origin, identity if
    /// it has none.
    pub(crate) fn transform_about_origin_at(&self, idx: u32) -> Transform3d {
        match self.style[idx as usize].transform {
            Some(t) => {
                let o = self.transform_origin_at(idx);
                Transform3d::from_translation(o.x, o.y, 0.0)
                    * t
                    * Transform3d::from_translation(-o.x, -o.y, 0.0)
            }
            None => Transform3d::IDENTITY,
        }
    }

    /// Maps local coordinates into the coordinate parent's space.
    pub(crate) fn local_to_parent_at(&self, idx: u32) -> Transform3d {
        let pos = self.position_in_parent_at(idx);
        let translate = Transform3d::from_translation(pos.x, pos.y, 0.0);
        match self.style[idx as usize].transform {
            Some(_) => translate * self.transform_about_origin_at(idx),
            None => translate,
        }
    }

    /// Translation-only offset of `idx` from `ancestor` (`None` for document
    /// coordinates), ignoring transforms.
    pub(crate) fn offset_from_ancestor_at(&self, idx: u32, ancestor: Option<u32>) -> Vec2 {
        let mut total = Vec2::ZERO;
        let mut n = idx;
        while n != INVALID && Some(n) != ancestor {
            total += self.position_in_parent_at(n);
            n = self.coord_parent_at(n);
        }
        total
    }

    fn stacking_key(&self, idx: u32) -> (bool, bool, i32) {
        (
            self.is_stacking_context_at(idx),
            self.is_normal_flow_only_at(idx),
            self.style[idx as usize].z_index.level(),
        )
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::layer::ZIndex;

    #[test]
    fn create_and_destroy() {
        let mut tree = LayerTree::new();
        let id = tree.create_layer();
        assert!(tree.is_alive(id));
        tree.destroy_layer(id);
        assert!(!tree.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut tree = LayerTree::new();
        let id1 = tree.create_layer();
        tree.destroy_layer(id1);
        let id2 = tree.create_layer();
        assert!(!tree.is_alive(id1));
        assert!(tree.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn root_is_unique() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        assert_eq!(tree.root(), Some(root));
        assert!(tree.is_root(root));
        assert!(tree.is_stacking_context(root));
    }

    #[test]
    #[should_panic(expected = "root layer already exists")]
    fn second_root_panics() {
        let mut tree = LayerTree::new();
        let _ = tree.create_root_layer();
        let _ = tree.create_root_layer();
    }

    #[test]
    fn add_child_and_query() {
        let mut tree = LayerTree::new();
        let parent = tree.create_root_layer();
        let child1 = tree.create_layer();
        let child2 = tree.create_layer();

        tree.add_child(parent, child1);
        tree.add_child(parent, child2);

        assert_eq!(tree.parent(child1), Some(parent));
        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![child1, child2]);
    }

    #[test]
    fn insert_before_works() {
        let mut tree = LayerTree::new();
        let parent = tree.create_root_layer();
        let a = tree.create_layer();
        let b = tree.create_layer();
        let c = tree.create_layer();

        tree.add_child(parent, a);
        tree.add_child(parent, c);
        tree.insert_before(b, c);

        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![a, b, c]);
    }

    #[test]
    fn remove_from_parent_works() {
        let mut tree = LayerTree::new();
        let parent = tree.create_root_layer();
        let child = tree.create_layer();
        tree.add_child(parent, child);
        tree.remove_from_parent(child);
        assert_eq!(tree.parent(child), None);
        assert!(tree.children(parent).next().is_none());
    }

    #[test]
    #[should_panic(expected = "cannot destroy layer with children")]
    fn destroy_with_children_panics() {
        let mut tree = LayerTree::new();
        let parent = tree.create_layer();
        let child = tree.create_layer();
        tree.add_child(parent, child);
        tree.destroy_layer(parent);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_style() {
        let mut tree = LayerTree::new();
        let id = tree.create_layer();
        tree.destroy_layer(id);
        let _ = tree.style(id);
    }

    #[test]
    fn stacking_context_rules() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let plain = tree.create_layer();
        let positioned_auto = tree.create_layer();
        let positioned_z = tree.create_layer();
        let translucent = tree.create_layer();
        for id in [plain, positioned_auto, positioned_z, translucent] {
            tree.add_child(root, id);
        }
        tree.update_style(positioned_auto, |s| s.positioned = true);
        tree.update_style(positioned_z, |s| {
            s.positioned = true;
            s.z_index = ZIndex::Value(2);
        });
        tree.update_style(translucent, |s| s.opacity = 0.5);

        assert!(tree.is_normal_flow_only(plain));
        assert!(!tree.is_stacking_context(positioned_auto));
        assert!(!tree.is_normal_flow_only(positioned_auto));
        assert!(tree.is_stacking_context(positioned_z));
        assert!(tree.is_stacking_context(translucent));
    }

    #[test]
    fn reflection_attaches_and_detaches() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let owner = tree.create_layer();
        let refl = tree.create_layer();
        tree.add_child(root, owner);
        tree.set_reflection(owner, Some(refl));
        assert_eq!(tree.reflection(owner), Some(refl));
        assert!(tree.is_stacking_context(owner));
        assert_eq!(tree.coord_parent_at(refl.idx), owner.idx);

        tree.destroy_layer(refl);
        assert_eq!(tree.reflection(owner), None);
    }

    #[test]
    #[should_panic(expected = "reflection layer cannot be a child")]
    fn reflection_cannot_be_child() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let owner = tree.create_layer();
        let refl = tree.create_layer();
        tree.add_child(root, owner);
        tree.set_reflection(owner, Some(refl));
        tree.add_child(root, refl);
    }

    #[test]
    fn clip_box_combines_overflow_and_explicit_clip() {
        let mut tree = LayerTree::new();
        let id = tree.create_layer();
        tree.set_size(id, Size::new(100.0, 50.0));
        assert_eq!(tree.clip_box_at(id.idx), None);
        tree.update_style(id, |s| s.overflow_clip = true);
        assert_eq!(tree.clip_box_at(id.idx), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
        tree.update_style(id, |s| s.clip = Some(Rect::new(10.0, 10.0, 200.0, 20.0)));
        assert_eq!(tree.clip_box_at(id.idx), Some(Rect::new(10.0, 10.0, 100.0, 20.0)));
    }
}
