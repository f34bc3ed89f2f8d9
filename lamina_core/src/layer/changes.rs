// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stacking-order lists and change draining.
//!
//! The compositor reads a layer tree in paint order. For each stacking
//! context, [`update_layer_lists_if_needed`](LayerTree::update_layer_lists_if_needed)
//! collects every descendant that is not normal-flow-only (recursing through
//! descendants that are not themselves stacking contexts) and splits them by
//! stack level into a negative and a positive list, each sorted stably by
//! z-index. Every layer also keeps a normal-flow list of its direct
//! normal-flow-only children.
//!
//! [`take_changes`](LayerTree::take_changes) drains the dirty channels into
//! [`LayerChanges`], which the compositor uses to decide between a full
//! hierarchy re-evaluation and a geometry-only update. Indices are raw slot
//! indices so the compositor can index its own per-layer arrays directly.

use alloc::vec::Vec;

use super::id::INVALID;
use super::store::LayerTree;
use crate::dirty;

/// The set of changes drained by a single [`LayerTree::take_changes`] call.
#[derive(Clone, Debug, Default)]
pub struct LayerChanges {
    /// Layers whose offset, size, overflow, or ancestor geometry changed.
    pub geometry: Vec<u32>,
    /// Layers whose style changed.
    pub style: Vec<u32>,
    /// Layers whose content, scrolling, or layout state changed.
    pub content: Vec<u32>,
    /// Layers added since the last drain.
    pub added: Vec<u32>,
    /// Layers removed since the last drain.
    pub removed: Vec<u32>,
    /// Whether the tree topology or stacking order changed.
    pub topology_changed: bool,
}

impl LayerChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.geometry.clear();
        self.style.clear();
        self.content.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
            && self.style.is_empty()
            && self.content.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }

    /// Returns `true` if the changes may alter which layers need their own
    /// surface.
    #[must_use]
    pub fn requires_reevaluation(&self) -> bool {
        !self.style.is_empty()
            || !self.content.is_empty()
            || !self.added.is_empty()
            || !self.removed.is_empty()
            || self.topology_changed
    }

    /// Returns `true` if the surface hierarchy must be rebuilt regardless of
    /// what re-evaluation decides.
    #[must_use]
    pub fn requires_rebuild(&self) -> bool {
        self.topology_changed || !self.removed.is_empty()
    }
}

impl LayerTree {
    /// Drains all dirty channels and returns the accumulated changes.
    pub fn take_changes(&mut self) -> LayerChanges {
        let mut changes = LayerChanges::default();
        self.take_changes_into(&mut changes);
        changes
    }

    /// Like [`take_changes`](Self::take_changes), but reuses a caller-provided
    /// buffer.
    pub fn take_changes_into(&mut self, changes: &mut LayerChanges) {
        changes.clear();

        let alive = &self.alive;
        changes.geometry = self
            .dirty
            .drain(dirty::GEOMETRY)
            .affected()
            .deterministic()
            .run()
            .filter(|&idx| alive.get(idx as usize).copied().unwrap_or(false))
            .collect();

        changes.style = self
            .dirty
            .drain(dirty::STYLE)
            .deterministic()
            .run()
            .filter(|&idx| alive.get(idx as usize).copied().unwrap_or(false))
            .collect();

        changes.content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .filter(|&idx| alive.get(idx as usize).copied().unwrap_or(false))
            .collect();

        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        changes.topology_changed = !topology.is_empty();

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    // -- Stacking order --

    /// Returns `true` if the z-order lists must be rebuilt before reading.
    #[must_use]
    pub fn z_order_lists_dirty(&self) -> bool {
        self.z_order_dirty
    }

    /// Rebuilds the z-order and normal-flow lists if any topology or
    /// stacking-affecting change happened since the last rebuild.
    pub fn update_layer_lists_if_needed(&mut self) {
        if !self.z_order_dirty {
            return;
        }
        for idx in 0..self.len as usize {
            self.neg_z_list[idx].clear();
            self.pos_z_list[idx].clear();
            self.normal_flow_list[idx].clear();
        }

        let mut collected = Vec::new();
        for idx in 0..self.len {
            if !self.alive[idx as usize] {
                continue;
            }
            // Direct normal-flow-only children, in document order.
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                if self.is_normal_flow_only_at(child) {
                    self.normal_flow_list[idx as usize].push(child);
                }
                child = self.next_sibling[child as usize];
            }

            if !self.is_stacking_context_at(idx) {
                continue;
            }
            collected.clear();
            self.collect_z_order(idx, &mut collected);
            // Stable sort keeps document order within a stack level.
            collected.sort_by_key(|&c| self.style[c as usize].z_index.level());
            for &c in &collected {
                if self.style[c as usize].z_index.level() < 0 {
                    self.neg_z_list[idx as usize].push(c);
                } else {
                    self.pos_z_list[idx as usize].push(c);
                }
            }
        }
        self.z_order_dirty = false;
    }

    fn collect_z_order(&self, idx: u32, out: &mut Vec<u32>) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            if !self.is_normal_flow_only_at(child) {
                out.push(child);
            }
            if !self.is_stacking_context_at(child) {
                self.collect_z_order(child, out);
            }
            child = self.next_sibling[child as usize];
        }
    }

    /// Returns the negative z-order list of the layer at `idx` (empty for
    /// layers that are not stacking contexts).
    ///
    /// # Panics
    ///
    /// Panics if the lists are stale.
    #[must_use]
    pub fn neg_z_order_list(&self, idx: u32) -> &[u32] {
        assert!(!self.z_order_dirty, "stale z-order lists");
        &self.neg_z_list[idx as usize]
    }

    /// Returns the positive (and zero) z-order list of the layer at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the lists are stale.
    #[must_use]
    pub fn pos_z_order_list(&self, idx: u32) -> &[u32] {
        assert!(!self.z_order_dirty, "stale z-order lists");
        &self.pos_z_list[idx as usize]
    }

    /// Returns the normal-flow children of the layer at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the lists are stale.
    #[must_use]
    pub fn normal_flow_list(&self, idx: u32) -> &[u32] {
        assert!(!self.z_order_dirty, "stale z-order lists");
        &self.normal_flow_list[idx as usize]
    }

    /// Returns the layer whose lists contain `idx`: the parent for
    /// normal-flow-only layers, otherwise the nearest stacking-context
    /// ancestor. `None` for the root and detached layers.
    #[must_use]
    pub fn compositing_container_at(&self, idx: u32) -> Option<u32> {
        let parent = self.parent[idx as usize];
        if parent == INVALID {
            return None;
        }
        if self.is_normal_flow_only_at(idx) {
            return Some(parent);
        }
        let mut p = parent;
        while p != INVALID {
            if self.is_stacking_context_at(p) {
                return Some(p);
            }
            p = self.parent[p as usize];
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerId, ZIndex};

    fn positioned(tree: &mut LayerTree, parent: LayerId, z: ZIndex) -> LayerId {
        let id = tree.create_layer();
        tree.add_child(parent, id);
        tree.update_style(id, |s| {
            s.positioned = true;
            s.z_index = z;
        });
        id
    }

    #[test]
    fn lists_split_and_sort_by_z() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let a = positioned(&mut tree, root, ZIndex::Value(3));
        let b = positioned(&mut tree, root, ZIndex::Value(-1));
        let c = positioned(&mut tree, root, ZIndex::Auto);
        let d = positioned(&mut tree, root, ZIndex::Value(-5));
        let flow = tree.create_layer();
        tree.add_child(root, flow);

        tree.update_layer_lists_if_needed();
        let r = root.idx;
        assert_eq!(tree.neg_z_order_list(r), &[d.idx, b.idx]);
        assert_eq!(tree.pos_z_order_list(r), &[c.idx, a.idx]);
        assert_eq!(tree.normal_flow_list(r), &[flow.idx]);
    }

    #[test]
    fn positioned_descendants_escape_non_stacking_parents() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let flow = tree.create_layer();
        tree.add_child(root, flow);
        let deep = positioned(&mut tree, flow, ZIndex::Value(1));
        let ctx = positioned(&mut tree, root, ZIndex::Value(0));
        let inner = positioned(&mut tree, ctx, ZIndex::Value(7));

        tree.update_layer_lists_if_needed();
        assert_eq!(tree.pos_z_order_list(root.idx), &[ctx.idx, deep.idx]);
        assert_eq!(tree.pos_z_order_list(ctx.idx), &[inner.idx]);
        assert_eq!(tree.compositing_container_at(deep.idx), Some(root.idx));
        assert_eq!(tree.compositing_container_at(flow.idx), Some(root.idx));
        assert_eq!(tree.compositing_container_at(inner.idx), Some(ctx.idx));
        assert_eq!(tree.compositing_container_at(root.idx), None);
    }

    #[test]
    #[should_panic(expected = "stale z-order lists")]
    fn reading_stale_lists_panics() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        tree.update_layer_lists_if_needed();
        let child = tree.create_layer();
        tree.add_child(root, child);
        let _ = tree.pos_z_order_list(root.idx);
    }

    #[test]
    fn z_index_change_invalidates_lists() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let a = positioned(&mut tree, root, ZIndex::Value(1));
        tree.update_layer_lists_if_needed();
        assert!(!tree.z_order_lists_dirty());

        tree.update_style(a, |s| s.opacity = 1.0);
        assert!(!tree.z_order_lists_dirty(), "non-stacking edit keeps lists");

        tree.update_style(a, |s| s.z_index = ZIndex::Value(-2));
        assert!(tree.z_order_lists_dirty());
        tree.update_layer_lists_if_needed();
        assert_eq!(tree.neg_z_order_list(root.idx), &[a.idx]);
    }

    #[test]
    fn take_changes_separates_geometry_from_style() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let child = tree.create_layer();
        tree.add_child(root, child);
        let _ = tree.take_changes();

        tree.set_offset(root, kurbo::Vec2::new(5.0, 0.0));
        let changes = tree.take_changes();
        assert!(changes.geometry.contains(&root.idx));
        assert!(changes.geometry.contains(&child.idx), "geometry propagates");
        assert!(!changes.requires_reevaluation());

        tree.update_style(child, |s| s.has_filter = true);
        let changes = tree.take_changes();
        assert!(changes.style.contains(&child.idx));
        assert!(changes.requires_reevaluation());
        assert!(changes.topology_changed, "filter makes a stacking context");
    }
}
