// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deciding which layers get surfaces and assembling the surface tree.
//!
//! [`LayerTreeCompositor`] owns the per-document compositing state: which
//! layers are composited (their [`LayerBacking`]s), whether the document is
//! in compositing mode, and the root content surface. Each update runs up to
//! two walks over the layer tree in paint order:
//!
//! 1. **Requirements.** Decide for every layer whether it needs a backing,
//!    from its own [`CompositingReasons`] and from [`IndirectReason`]s such
//!    as overlapping earlier composited content (tracked by an
//!    [`OverlapIndex`]). Backings are created and destroyed here, with
//!    repaint requests for the vacated or newly covered regions.
//! 2. **Rebuild.** Refresh each backing's configuration and geometry and
//!    reassemble the surface hierarchy.
//!
//! When pass 1 changes nothing structural, pass 2 is replaced by a
//! geometry-only walk over the existing backings.
//!
//! ```text
//! layers.set_*()                 // layout / style
//! compositor.update_compositing_layers(kind, &mut env)
//! surfaces.evaluate()            // SurfaceChanges
//! presenter.apply(&surfaces, &changes)
//! ```

mod backing;
mod configure;
mod frames;
mod overlap;
mod policy;
mod rebuild;
mod requirements;
mod schedule;
#[cfg(test)]
mod tests;

pub use backing::LayerBacking;
pub use frames::{FrameContents, FrameRegistry, NoFrames};
pub use overlap::OverlapIndex;
pub use policy::{
    BackingStoreQuery, CompositingPolicy, CompositingReasons, IndirectReason, LayerFacts,
};
pub use schedule::{CompositingUpdateType, UpdateScheduler};

use alloc::vec::Vec;

use kurbo::Rect;
use log::{debug, trace, warn};

use crate::config::CompositingConfig;
use crate::geometry::GeometryCache;
use crate::layer::{INVALID, LayerChanges, LayerId, LayerTree};
use crate::surface::{SurfaceId, SurfaceRole, SurfaceTree};
#[cfg(feature = "trace-rich")]
use crate::trace::{LayerCompositingChange, RepaintRect};
use crate::trace::{
    CompositingModeEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    SurfaceAllocationFailedEvent, Tracer, UpdateBeginEvent, UpdateEndEvent,
};

/// Everything an update reads or writes besides the compositor itself.
pub struct CompositorEnv<'a> {
    /// The document's layers. Only the z-order lists are refreshed during an
    /// update.
    pub layers: &'a mut LayerTree,
    /// The surface tree shared by this document and any hosted documents.
    pub surfaces: &'a mut SurfaceTree,
    /// Compositing state of hosted documents.
    pub frames: &'a dyn FrameContents,
    /// Trace event sink.
    pub tracer: Tracer<'a>,
}

impl core::fmt::Debug for CompositorEnv<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompositorEnv")
            .field("layers", &self.layers.slot_count())
            .field("surfaces", &self.surfaces.live_count())
            .finish_non_exhaustive()
    }
}

impl<'a> CompositorEnv<'a> {
    /// Creates an environment with no hosted documents and no tracing.
    #[must_use]
    pub fn new(layers: &'a mut LayerTree, surfaces: &'a mut SurfaceTree) -> Self {
        Self {
            layers,
            surfaces,
            frames: &NoFrames,
            tracer: Tracer::none(),
        }
    }

    /// Uses `frames` to look up hosted documents.
    #[must_use]
    pub fn with_frames(mut self, frames: &'a dyn FrameContents) -> Self {
        self.frames = frames;
        self
    }

    /// Sends trace events to `tracer`.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer<'a>) -> Self {
        self.tracer = tracer;
        self
    }
}

/// A region of a layer that must be repainted by the layout collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepaintRequest {
    /// Nearest composited ancestor, or the root layer when there is none.
    pub container: LayerId,
    /// Region in the container's coordinates.
    pub rect: Rect,
}

/// How the root content surface is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RootAttachment {
    /// Not in compositing mode.
    #[default]
    Unattached,
    /// The host view presents the root content surface.
    ViaHost,
    /// The enclosing frame grafts the root content surface.
    ViaEnclosingFrame,
}

/// What an update did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOutcome {
    /// `false` when the update was skipped (layout pending, or nothing to
    /// evaluate outside compositing mode).
    pub performed: bool,
    /// The surface hierarchy was rebuilt.
    pub hierarchy_updated: bool,
    /// Some layer gained or lost its backing.
    pub layers_changed: bool,
    /// Regions the layout collaborator must repaint.
    pub repaints: Vec<RepaintRequest>,
    /// Compositing mode after the update.
    pub compositing_mode: bool,
    /// The surface an enclosing frame grafts changed; the enclosing document
    /// should schedule its own update.
    pub notify_enclosing_frame: bool,
}

/// Per-slot bookkeeping, valid for the layer generation it records.
#[derive(Clone, Copy, Debug, Default)]
struct LayerState {
    generation: u32,
    reasons: CompositingReasons,
    indirect: IndirectReason,
    has_compositing_descendant: bool,
}

/// Borrowed environment for one walk.
pub(crate) struct Pass<'p, 't> {
    pub(crate) layers: &'p LayerTree,
    pub(crate) surfaces: &'p mut SurfaceTree,
    pub(crate) frames: &'p dyn FrameContents,
    pub(crate) tracer: &'p mut Tracer<'t>,
}

/// Compositing state of one document.
#[derive(Debug)]
pub struct LayerTreeCompositor {
    config: CompositingConfig,
    in_compositing_mode: bool,
    propagates_to_enclosing_frame: bool,
    root_content: Option<SurfaceId>,
    root_attachment: RootAttachment,
    notify_enclosing_frame: bool,

    state: Vec<LayerState>,
    backings: Vec<Option<LayerBacking>>,
    composited_count: u32,

    needs_reevaluation: bool,
    needs_rebuild: bool,
    needs_geometry: bool,
    scheduler: UpdateScheduler,

    geometry: GeometryCache,
    update_index: u64,
    visited: u32,
    repaints: Vec<RepaintRequest>,
    #[cfg(feature = "trace-rich")]
    transitions: Vec<LayerCompositingChange>,
}

impl Default for LayerTreeCompositor {
    fn default() -> Self {
        Self::new(CompositingConfig::new())
    }
}

impl LayerTreeCompositor {
    /// Creates a compositor for a document that is not yet in compositing
    /// mode.
    #[must_use]
    pub fn new(config: CompositingConfig) -> Self {
        Self {
            config,
            in_compositing_mode: false,
            propagates_to_enclosing_frame: false,
            root_content: None,
            root_attachment: RootAttachment::Unattached,
            notify_enclosing_frame: false,
            state: Vec::new(),
            backings: Vec::new(),
            composited_count: 0,
            needs_reevaluation: true,
            needs_rebuild: false,
            needs_geometry: false,
            scheduler: UpdateScheduler::new(),
            geometry: GeometryCache::new(),
            update_index: 0,
            visited: 0,
            repaints: Vec::new(),
            #[cfg(feature = "trace-rich")]
            transitions: Vec::new(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CompositingConfig {
        &self.config
    }

    /// Replaces the configuration. Every layer is re-evaluated on the next
    /// update.
    pub fn set_config(&mut self, config: CompositingConfig) {
        if config != self.config {
            self.config = config;
            self.needs_reevaluation = true;
            self.needs_rebuild = true;
        }
    }

    /// Whether this document's root content surface should be grafted into
    /// the enclosing frame rather than presented by the host.
    pub fn set_propagates_to_enclosing_frame(&mut self, propagates: bool) {
        if self.propagates_to_enclosing_frame == propagates {
            return;
        }
        self.propagates_to_enclosing_frame = propagates;
        if self.in_compositing_mode {
            self.root_attachment = if propagates {
                RootAttachment::ViaEnclosingFrame
            } else {
                RootAttachment::ViaHost
            };
            if let Some(root) = self.root_content {
                debug!("root content surface {root:?} now attached {:?}", self.root_attachment);
            }
        }
        self.notify_enclosing_frame = true;
        self.needs_reevaluation = true;
    }

    /// See [`set_propagates_to_enclosing_frame`](Self::set_propagates_to_enclosing_frame).
    #[must_use]
    pub fn propagates_to_enclosing_frame(&self) -> bool {
        self.propagates_to_enclosing_frame
    }

    // -- Queries --

    /// Returns `true` if the layer has a backing.
    #[must_use]
    pub fn is_composited(&self, layer: LayerId) -> bool {
        self.backing(layer).is_some()
    }

    /// The layer's backing, if composited.
    #[must_use]
    pub fn backing(&self, layer: LayerId) -> Option<&LayerBacking> {
        self.backings
            .get(layer.index() as usize)?
            .as_ref()
            .filter(|b| b.owner() == layer)
    }

    /// Direct reasons found for the layer by the last requirements pass.
    #[must_use]
    pub fn compositing_reasons(&self, layer: LayerId) -> CompositingReasons {
        self.state_of(layer).map_or(CompositingReasons::empty(), |s| s.reasons)
    }

    /// Indirect reason found for the layer by the last requirements pass.
    #[must_use]
    pub fn indirect_reason(&self, layer: LayerId) -> IndirectReason {
        self.state_of(layer).map_or(IndirectReason::None, |s| s.indirect)
    }

    /// Returns `true` if a descendant of the layer was composited by the last
    /// requirements pass.
    #[must_use]
    pub fn has_compositing_descendant(&self, layer: LayerId) -> bool {
        self.state_of(layer)
            .is_some_and(|s| s.has_compositing_descendant)
    }

    /// Returns `true` if the document is in compositing mode.
    #[must_use]
    pub fn in_compositing_mode(&self) -> bool {
        self.in_compositing_mode
    }

    /// Number of layers with a backing.
    #[must_use]
    pub fn composited_layer_count(&self) -> u32 {
        self.composited_count
    }

    /// The per-document surface hosting the root layer's surface.
    #[must_use]
    pub fn root_content_surface(&self) -> Option<SurfaceId> {
        self.root_content
    }

    /// How the root content surface is presented.
    #[must_use]
    pub fn root_attachment(&self) -> RootAttachment {
        self.root_attachment
    }

    /// The surface an enclosing frame should graft: the root content surface
    /// when attached via the enclosing frame.
    #[must_use]
    pub fn root_surface(&self) -> Option<SurfaceId> {
        match self.root_attachment {
            RootAttachment::ViaEnclosingFrame => self.root_content,
            _ => None,
        }
    }

    /// Number of updates run so far.
    #[must_use]
    pub fn update_index(&self) -> u64 {
        self.update_index
    }

    fn state_of(&self, layer: LayerId) -> Option<&LayerState> {
        self.state
            .get(layer.index() as usize)
            .filter(|s| s.generation == layer.generation())
    }

    pub(crate) fn is_composited_at(&self, idx: u32) -> bool {
        self.backings
            .get(idx as usize)
            .is_some_and(Option::is_some)
    }

    pub(crate) fn backing_at(&self, idx: u32) -> Option<&LayerBacking> {
        self.backings.get(idx as usize).and_then(Option::as_ref)
    }

    // -- Deferred updates --

    /// Requests an update to run later via
    /// [`run_pending_update`](Self::run_pending_update). Requests made before
    /// then are coalesced into one update.
    pub fn schedule_update(&mut self, kind: CompositingUpdateType) {
        self.scheduler.schedule(kind);
        trace!(
            "compositing update scheduled ({kind:?}, {} pending)",
            self.scheduler.coalesced_requests()
        );
    }

    /// Returns `true` if a scheduled update has not run yet.
    #[must_use]
    pub fn has_pending_update(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Runs the scheduled update, if any.
    pub fn run_pending_update(&mut self, env: &mut CompositorEnv<'_>) -> Option<UpdateOutcome> {
        let kind = self.scheduler.take()?;
        Some(self.update_compositing_layers(kind, env))
    }

    // -- Update --

    /// Brings backings and the surface tree up to date with the layer tree.
    ///
    /// Cancels any scheduled update.
    pub fn update_compositing_layers(
        &mut self,
        kind: CompositingUpdateType,
        env: &mut CompositorEnv<'_>,
    ) -> UpdateOutcome {
        self.scheduler.cancel();
        self.update_index += 1;
        let update_index = self.update_index;
        env.tracer.update_begin(&UpdateBeginEvent {
            update_index,
            kind,
            layer_count: env.layers.slot_count(),
        });
        let grafted_before = self.root_surface();

        let changes = env.layers.take_changes();
        self.absorb(&changes);
        self.sync_slots(env.layers, env.surfaces);
        env.layers.update_layer_lists_if_needed();

        let mut outcome = UpdateOutcome::default();
        let root = env.layers.root;
        if root == INVALID {
            if self.in_compositing_mode {
                let mut pass = Pass {
                    layers: &*env.layers,
                    surfaces: &mut *env.surfaces,
                    frames: env.frames,
                    tracer: &mut env.tracer,
                };
                self.leave_compositing_mode(&mut pass);
                outcome.performed = true;
            }
            return self.finish(env, outcome, grafted_before);
        }
        if env.layers.document_needs_layout() || env.layers.needs_layout[root as usize] {
            debug!("compositing update {update_index} deferred until layout");
            return self.finish(env, outcome, grafted_before);
        }

        self.geometry.reset(env.layers.slot_count());
        let mut pass = Pass {
            layers: &*env.layers,
            surfaces: &mut *env.surfaces,
            frames: env.frames,
            tracer: &mut env.tracer,
        };

        if self.config.force_compositing_mode
            && self.config.accelerated_compositing
            && !self.in_compositing_mode
        {
            self.enter_compositing_mode(&mut pass);
        }
        if !self.needs_reevaluation && !self.in_compositing_mode {
            return self.finish(env, outcome, grafted_before);
        }
        outcome.performed = true;

        let mut need_hierarchy = self.needs_rebuild;
        if kind.checks_hierarchy() {
            // Refused allocations during the walk ask for another one.
            self.needs_reevaluation = false;
            let layers_changed = self.run_requirements(&mut pass, root);
            need_hierarchy |= layers_changed;
            outcome.layers_changed = layers_changed;
            if self.in_compositing_mode
                && self.composited_count == 0
                && !self.config.force_compositing_mode
            {
                self.leave_compositing_mode(&mut pass);
            }
        }

        let need_geometry = kind.forces_geometry() || self.needs_geometry;
        if need_hierarchy {
            self.run_rebuild(&mut pass, root);
            outcome.hierarchy_updated = true;
        } else if need_geometry && self.in_compositing_mode {
            if self.run_geometry(&mut pass, root) {
                self.run_rebuild(&mut pass, root);
                outcome.hierarchy_updated = true;
            }
        }
        self.needs_rebuild = false;
        self.needs_geometry = false;

        if !self.config.accelerated_compositing && self.in_compositing_mode {
            self.leave_compositing_mode(&mut pass);
        }
        self.finish(env, outcome, grafted_before)
    }

    fn absorb(&mut self, changes: &LayerChanges) {
        if changes.requires_reevaluation() {
            self.needs_reevaluation = true;
        }
        if changes.requires_rebuild() {
            self.needs_rebuild = true;
        }
        if !changes.geometry.is_empty() || !changes.style.is_empty() || !changes.content.is_empty()
        {
            self.needs_geometry = true;
        }
    }

    /// Sizes per-slot storage and reclaims backings of destroyed layers.
    fn sync_slots(&mut self, layers: &LayerTree, surfaces: &mut SurfaceTree) {
        let slots = layers.slot_count() as usize;
        if self.state.len() < slots {
            self.state.resize(slots, LayerState::default());
            self.backings.resize_with(slots, || None);
        }
        for idx in 0..self.backings.len() {
            let stale = self.backings[idx]
                .as_ref()
                .is_some_and(|b| !layers.is_alive(b.owner()));
            if stale {
                if let Some(backing) = self.backings[idx].take() {
                    trace!("reclaiming backing of destroyed layer {:?}", backing.owner());
                    backing.destroy(surfaces);
                    self.composited_count -= 1;
                    self.needs_rebuild = true;
                }
            }
        }
        for (idx, state) in self.state.iter_mut().enumerate() {
            let generation = if idx < slots {
                layers.generation[idx]
            } else {
                u32::MAX
            };
            if state.generation != generation {
                *state = LayerState {
                    generation,
                    ..LayerState::default()
                };
            }
        }
    }

    fn run_requirements(&mut self, pass: &mut Pass<'_, '_>, root: u32) -> bool {
        let update_index = self.update_index;
        pass.tracer.phase_begin(&PhaseBeginEvent {
            update_index,
            phase: PhaseKind::Requirements,
        });
        self.visited = 0;
        let mut overlap = OverlapIndex::new();
        let mut state = requirements::CompositingState::for_root();
        let mut layers_changed = false;
        let mut saw_3d = false;
        self.compute_compositing_requirements(
            pass,
            root,
            &mut overlap,
            &mut state,
            &mut layers_changed,
            &mut saw_3d,
        );
        pass.tracer.phase_end(&PhaseEndEvent {
            update_index,
            phase: PhaseKind::Requirements,
            layers_visited: self.visited,
        });
        trace!(
            "requirements: {} layers visited, {} composited, changed={layers_changed}",
            self.visited, self.composited_count
        );
        layers_changed
    }

    fn run_rebuild(&mut self, pass: &mut Pass<'_, '_>, root: u32) {
        let update_index = self.update_index;
        pass.tracer.phase_begin(&PhaseBeginEvent {
            update_index,
            phase: PhaseKind::Rebuild,
        });
        self.visited = 0;
        let mut children = Vec::new();
        self.rebuild_compositing_layer_tree(pass, root, &mut children);
        if let Some(root_content) = self.root_content {
            if children.is_empty() && !self.has_any_additional_composited_layers(root) {
                debug!("no composited content left; dropping root content surface");
                self.leave_compositing_mode(pass);
            } else {
                pass.surfaces.set_children(root_content, &children);
            }
        }
        pass.tracer.phase_end(&PhaseEndEvent {
            update_index,
            phase: PhaseKind::Rebuild,
            layers_visited: self.visited,
        });
    }

    /// Returns `true` if some backing's configuration changed and the
    /// hierarchy must be rebuilt.
    fn run_geometry(&mut self, pass: &mut Pass<'_, '_>, root: u32) -> bool {
        let update_index = self.update_index;
        pass.tracer.phase_begin(&PhaseBeginEvent {
            update_index,
            phase: PhaseKind::Geometry,
        });
        self.visited = 0;
        let config_changed = self.update_layer_tree_geometry(pass, root);
        pass.tracer.phase_end(&PhaseEndEvent {
            update_index,
            phase: PhaseKind::Geometry,
            layers_visited: self.visited,
        });
        config_changed
    }

    fn finish(
        &mut self,
        env: &mut CompositorEnv<'_>,
        mut outcome: UpdateOutcome,
        grafted_before: Option<SurfaceId>,
    ) -> UpdateOutcome {
        if self.root_surface() != grafted_before {
            self.notify_enclosing_frame = true;
        }
        outcome.compositing_mode = self.in_compositing_mode;
        outcome.notify_enclosing_frame = core::mem::take(&mut self.notify_enclosing_frame);
        outcome.repaints = core::mem::take(&mut self.repaints);

        #[cfg(feature = "trace-rich")]
        {
            if !self.transitions.is_empty() {
                env.tracer.layer_changes(self.update_index, &self.transitions);
                self.transitions.clear();
            }
            if !outcome.repaints.is_empty() {
                let rects: Vec<RepaintRect> = outcome
                    .repaints
                    .iter()
                    .map(|r| RepaintRect {
                        container_index: r.container.index(),
                        x: r.rect.x0,
                        y: r.rect.y0,
                        width: r.rect.width(),
                        height: r.rect.height(),
                    })
                    .collect();
                env.tracer.repaint_rects(self.update_index, &rects);
            }
        }

        env.tracer.update_end(&UpdateEndEvent {
            update_index: self.update_index,
            performed: outcome.performed,
            hierarchy_updated: outcome.hierarchy_updated,
            composited_layers: self.composited_count,
            repaints: u32::try_from(outcome.repaints.len()).unwrap_or(u32::MAX),
        });
        debug!(
            "compositing update {} done: performed={} rebuilt={} composited={} repaints={}",
            self.update_index,
            outcome.performed,
            outcome.hierarchy_updated,
            self.composited_count,
            outcome.repaints.len()
        );
        outcome
    }

    // -- Compositing mode --

    /// Enters compositing mode. Returns `false` if the root content surface
    /// could not be allocated; the document then stays out of the mode.
    fn enter_compositing_mode(&mut self, pass: &mut Pass<'_, '_>) -> bool {
        if self.in_compositing_mode && self.root_content.is_some() {
            return true;
        }
        if !self.ensure_root_content(pass) {
            return false;
        }
        if !self.in_compositing_mode {
            self.in_compositing_mode = true;
            pass.tracer.compositing_mode(&CompositingModeEvent {
                update_index: self.update_index,
                enabled: true,
            });
            debug!("entering compositing mode");
        }
        true
    }

    fn ensure_root_content(&mut self, pass: &mut Pass<'_, '_>) -> bool {
        if self.root_content.is_none() {
            let Some(id) = pass.surfaces.create_surface(SurfaceRole::RootContent, None) else {
                let root = pass.layers.root;
                self.allocation_failed(pass, root, SurfaceRole::RootContent);
                return false;
            };
            pass.surfaces.set_masks_to_bounds(id, true);
            self.root_content = Some(id);
        }
        self.root_attachment = if self.propagates_to_enclosing_frame {
            RootAttachment::ViaEnclosingFrame
        } else {
            RootAttachment::ViaHost
        };
        self.update_root_content_geometry(pass);
        true
    }

    fn update_root_content_geometry(&self, pass: &mut Pass<'_, '_>) {
        let root = pass.layers.root;
        if let (Some(id), true) = (self.root_content, root != INVALID) {
            pass.surfaces.set_size(id, pass.layers.size[root as usize]);
        }
    }

    /// Destroys every backing and the root content surface.
    fn leave_compositing_mode(&mut self, pass: &mut Pass<'_, '_>) {
        for idx in 0..self.backings.len() {
            let idx = idx as u32;
            if self.is_composited_at(idx) && pass.layers.is_alive_at(idx) {
                self.clear_backing(pass, idx);
                self.repaint_on_compositing_change(pass, idx);
            } else if let Some(backing) = self.backings[idx as usize].take() {
                backing.destroy(pass.surfaces);
                self.composited_count -= 1;
            }
        }
        if let Some(id) = self.root_content.take() {
            pass.surfaces.destroy_surface(id);
        }
        self.root_attachment = RootAttachment::Unattached;
        self.in_compositing_mode = false;
        pass.tracer.compositing_mode(&CompositingModeEvent {
            update_index: self.update_index,
            enabled: false,
        });
        debug!("leaving compositing mode");
    }

    fn has_any_additional_composited_layers(&self, root: u32) -> bool {
        let own = u32::from(self.is_composited_at(root));
        self.composited_count > own
    }

    // -- Backing transitions --

    /// Creates or destroys the layer's backing to match `composite`.
    /// Returns `true` if the backing changed.
    fn update_backing(&mut self, pass: &mut Pass<'_, '_>, idx: u32, composite: bool) -> bool {
        let composited = self.is_composited_at(idx);
        if composite && !composited {
            if !self.enter_compositing_mode(pass) {
                return false;
            }
            let Some(backing) = LayerBacking::new(pass.layers.id_at(idx), pass.surfaces) else {
                self.allocation_failed(pass, idx, SurfaceRole::Primary);
                return false;
            };
            self.repaint_on_compositing_change(pass, idx);
            self.backings[idx as usize] = Some(backing);
            self.composited_count += 1;
            self.record_transition(idx, true);
            trace!("layer {idx} composited");
            true
        } else if !composite && composited {
            self.clear_backing(pass, idx);
            self.repaint_on_compositing_change(pass, idx);
            trace!("layer {idx} no longer composited");
            true
        } else {
            false
        }
    }

    fn clear_backing(&mut self, pass: &mut Pass<'_, '_>, idx: u32) {
        if let Some(backing) = self.backings[idx as usize].take() {
            backing.destroy(pass.surfaces);
            self.composited_count -= 1;
            self.record_transition(idx, false);
        }
    }

    fn record_transition(&mut self, idx: u32, composited: bool) {
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = (idx, composited);
        }
        #[cfg(feature = "trace-rich")]
        {
            let state = self.state[idx as usize];
            self.transitions.push(LayerCompositingChange {
                layer_index: idx,
                composited,
                reasons: state.reasons,
                indirect: state.indirect,
            });
        }
    }

    fn allocation_failed(&mut self, pass: &mut Pass<'_, '_>, idx: u32, role: SurfaceRole) {
        warn!("surface allocation refused for layer {idx} ({role:?})");
        self.needs_reevaluation = true;
        pass.tracer.surface_allocation_failed(&SurfaceAllocationFailedEvent {
            update_index: self.update_index,
            layer_index: idx,
            role,
        });
    }

    /// Layer whose lists hold `idx`; a reflection belongs to its owner.
    fn container_of(layers: &LayerTree, idx: u32) -> Option<u32> {
        layers.compositing_container_at(idx).or_else(|| {
            let owner = layers.reflection_owner[idx as usize];
            (owner != INVALID).then_some(owner)
        })
    }

    /// Nearest composited ancestor along the compositing-container chain.
    pub(crate) fn compositing_ancestor(&self, layers: &LayerTree, idx: u32) -> Option<u32> {
        let mut c = Self::container_of(layers, idx);
        while let Some(p) = c {
            if self.is_composited_at(p) {
                return Some(p);
            }
            c = Self::container_of(layers, p);
        }
        None
    }

    /// Queues a repaint of the layer and its non-composited descendants in
    /// its repaint container.
    fn repaint_on_compositing_change(&mut self, pass: &Pass<'_, '_>, idx: u32) {
        let layers = pass.layers;
        let container = self.compositing_ancestor(layers, idx).unwrap_or(layers.root);
        let local = GeometryCache::layer_bounds(layers, idx, &|c| self.is_composited_at(c));
        if local.is_zero_area() {
            return;
        }
        let ancestor = (container != idx).then_some(container);
        let rect = GeometryCache::transform_to_ancestor(layers, idx, ancestor).map_rect(local);
        self.repaints.push(RepaintRequest {
            container: layers.id_at(container),
            rect,
        });
    }

    // -- Removal --

    /// Prepares for the layer's removal from the tree.
    ///
    /// If the layer is composited, its outer surface is detached at once and
    /// the region it covered is returned as a repaint request; the hierarchy
    /// is rebuilt on the next update.
    pub fn layer_will_be_removed(
        &mut self,
        layer: LayerId,
        env: &mut CompositorEnv<'_>,
    ) -> Option<RepaintRequest> {
        let idx = layer.index();
        let (outer, bounds) = {
            let backing = self.backing(layer)?;
            (backing.child_for_superlayers(), backing.composited_bounds())
        };
        env.surfaces.remove_from_parent(outer);
        self.needs_rebuild = true;

        let layers = &*env.layers;
        let container = self.compositing_ancestor(layers, idx).unwrap_or(layers.root);
        if container == idx {
            return None;
        }
        let rect = bounds + layers.offset_from_ancestor_at(idx, Some(container));
        Some(RepaintRequest {
            container: layers.id_at(container),
            rect,
        })
    }

    /// Destroys a childless layer together with its backing.
    ///
    /// Returns the single repaint request for the region the layer's surface
    /// covered, if it was composited.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has children.
    pub fn destroy_layer(
        &mut self,
        layer: LayerId,
        env: &mut CompositorEnv<'_>,
    ) -> Option<RepaintRequest> {
        let repaint = self.layer_will_be_removed(layer, env);
        let reflection = env.layers.reflection(layer);
        for idx in core::iter::once(layer.index()).chain(reflection.map(|r| r.index())) {
            if let Some(backing) = self.backings.get_mut(idx as usize).and_then(Option::take) {
                backing.destroy(env.surfaces);
                self.composited_count -= 1;
            }
        }
        env.layers.destroy_layer(layer);
        repaint
    }
}
