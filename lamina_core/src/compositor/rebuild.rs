// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass 2: assembling the surface hierarchy, and the geometry-only walk.

use alloc::vec::Vec;

use crate::layer::{INVALID, LayerContent};
use crate::surface::SurfaceId;

use super::{LayerTreeCompositor, Pass};

impl LayerTreeCompositor {
    /// Refreshes the backings under `idx` and collects their outer surfaces
    /// into `enclosing` in paint order.
    pub(super) fn rebuild_compositing_layer_tree(
        &mut self,
        pass: &mut Pass<'_, '_>,
        idx: u32,
        enclosing: &mut Vec<SurfaceId>,
    ) {
        let layers = pass.layers;
        self.visited += 1;
        let backed = self.is_composited_at(idx);
        if backed {
            self.refresh_backing(pass, idx);
        }

        let mut own = Vec::new();
        {
            let list: &mut Vec<SurfaceId> = if backed { &mut own } else { &mut *enclosing };
            let stacking = layers.is_stacking_context_at(idx);
            if stacking {
                for &child in layers.neg_z_order_list(idx) {
                    self.rebuild_compositing_layer_tree(pass, child, list);
                }
                if let Some(fg) = self.backing_at(idx).and_then(|b| b.foreground()) {
                    list.push(fg);
                }
            }
            for &child in layers.normal_flow_list(idx) {
                self.rebuild_compositing_layer_tree(pass, child, list);
            }
            if stacking {
                for &child in layers.pos_z_order_list(idx) {
                    self.rebuild_compositing_layer_tree(pass, child, list);
                }
            }
        }

        let Some(backing) = self.backing_at(idx) else {
            return;
        };
        let parent = backing.parent_for_sublayers();
        let outer = backing.child_for_superlayers();
        let controls: Vec<SurfaceId> =
            if !backing.has_clipping_layer() && !backing.has_scrolling_layer() {
                backing.overflow_control_surfaces().collect()
            } else {
                Vec::new()
            };
        let children = match self.grafted_frame_root(pass, idx) {
            Some(frame_root) => {
                let mut c = alloc::vec![frame_root];
                c.extend(controls);
                c
            }
            None => {
                own.extend(controls);
                own
            }
        };
        pass.surfaces.set_children(parent, &children);
        enclosing.push(outer);
    }

    /// Refreshes bounds, configuration, and geometry of the backings under
    /// `idx` without reassembling the hierarchy.
    ///
    /// Returns `true` if some backing's configuration changed, in which case
    /// the hierarchy must be rebuilt.
    pub(super) fn update_layer_tree_geometry(&mut self, pass: &mut Pass<'_, '_>, idx: u32) -> bool {
        let layers = pass.layers;
        self.visited += 1;
        let mut config_changed = false;
        if self.is_composited_at(idx) {
            config_changed |= self.refresh_backing(pass, idx);
        }
        let stacking = layers.is_stacking_context_at(idx);
        if stacking {
            for &child in layers.neg_z_order_list(idx) {
                config_changed |= self.update_layer_tree_geometry(pass, child);
            }
        }
        for &child in layers.normal_flow_list(idx) {
            config_changed |= self.update_layer_tree_geometry(pass, child);
        }
        if stacking {
            for &child in layers.pos_z_order_list(idx) {
                config_changed |= self.update_layer_tree_geometry(pass, child);
            }
        }
        config_changed
    }

    /// Bounds, configuration, and geometry of one backed layer. Returns
    /// `true` if the configuration changed.
    fn refresh_backing(&mut self, pass: &mut Pass<'_, '_>, idx: u32) -> bool {
        let layers = pass.layers;
        self.update_composited_bounds(pass, idx);
        let reflection = layers.reflection[idx as usize];
        if reflection != INVALID && self.is_composited_at(reflection) {
            self.update_composited_bounds(pass, reflection);
        }
        let changed = self.update_backing_configuration(pass, idx);
        self.update_backing_geometry(pass, idx);
        if idx == layers.root {
            self.update_root_content_geometry(pass);
        }
        changed
    }

    /// Root surface of the document hosted by the iframe layer at `idx`, if
    /// it should be grafted.
    pub(super) fn grafted_frame_root(&self, pass: &Pass<'_, '_>, idx: u32) -> Option<SurfaceId> {
        let LayerContent::Frame { document, .. } = pass.layers.content_at(idx) else {
            return None;
        };
        pass.frames
            .root_surface(document)
            .filter(|&root| pass.surfaces.is_alive(root))
    }
}
