// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for compositing updates.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [compositor](crate::compositor) calls at each stage of an update. All method
//! bodies default to no-ops, so implementing only the events you care about is
//! fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Events carry no timestamps; `lamina_core` has no clock. Sinks that want
//! timing (such as the recorder in `lamina_debug`) stamp events on arrival.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`LayerCompositingChange`] and
//!   [`RepaintRect`] events plus the corresponding `TraceSink` methods.

use crate::compositor::CompositingUpdateType;
#[cfg(feature = "trace-rich")]
use crate::compositor::{CompositingReasons, IndirectReason};
use crate::surface::SurfaceRole;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a compositing update is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Pass 1: deciding which layers need their own surface.
    Requirements,
    /// Pass 2: rebuilding the surface hierarchy.
    Rebuild,
    /// Geometry-only walk over existing surfaces.
    Geometry,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a compositing update starts.
#[derive(Clone, Copy, Debug)]
pub struct UpdateBeginEvent {
    /// Monotonic update counter of the compositor.
    pub update_index: u64,
    /// Why the update runs.
    pub kind: CompositingUpdateType,
    /// Number of layer slots in the tree.
    pub layer_count: u32,
}

/// Emitted when a compositing update finishes.
#[derive(Clone, Copy, Debug)]
pub struct UpdateEndEvent {
    /// Update counter.
    pub update_index: u64,
    /// Whether any work was done (false when skipped for pending layout).
    pub performed: bool,
    /// Whether the surface hierarchy was rebuilt.
    pub hierarchy_updated: bool,
    /// Number of composited layers after the update.
    pub composited_layers: u32,
    /// Number of repaint requests produced.
    pub repaints: u32,
}

/// Marks the beginning of an update phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Update counter.
    pub update_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of an update phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Update counter.
    pub update_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Layers visited by the phase.
    pub layers_visited: u32,
}

/// Emitted when the document enters or leaves compositing mode.
#[derive(Clone, Copy, Debug)]
pub struct CompositingModeEvent {
    /// Update counter.
    pub update_index: u64,
    /// The new mode.
    pub enabled: bool,
}

/// Emitted when the presentation collaborator refuses a surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceAllocationFailedEvent {
    /// Update counter.
    pub update_index: u64,
    /// Slot index of the layer the surface was for.
    pub layer_index: u32,
    /// The role of the refused surface.
    pub role: SurfaceRole,
}

/// A layer that gained or lost its backing during an update.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct LayerCompositingChange {
    /// Slot index of the layer.
    pub layer_index: u32,
    /// Whether the layer is now composited.
    pub composited: bool,
    /// Direct reasons that held at the decision.
    pub reasons: CompositingReasons,
    /// Indirect reason that held at the decision.
    pub indirect: IndirectReason,
}

/// A repaint request, in the coordinates of its container layer.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct RepaintRect {
    /// Slot index of the container layer.
    pub container_index: u32,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the compositor.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update starts.
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        _ = e;
    }

    /// Called when an update finishes.
    fn on_update_end(&mut self, e: &UpdateEndEvent) {
        _ = e;
    }

    /// Called at the beginning of an update phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of an update phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when compositing mode is entered or left.
    fn on_compositing_mode(&mut self, e: &CompositingModeEvent) {
        _ = e;
    }

    /// Called when a surface allocation is refused.
    fn on_surface_allocation_failed(&mut self, e: &SurfaceAllocationFailedEvent) {
        _ = e;
    }

    /// Called with the per-update backing changes (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_layer_changes(&mut self, update_index: u64, changes: &[LayerCompositingChange]) {
        _ = (update_index, changes);
    }

    /// Called with the per-update repaint requests (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_repaint_rects(&mut self, update_index: u64, rects: &[RepaintRect]) {
        _ = (update_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`UpdateBeginEvent`].
    #[inline]
    pub fn update_begin(&mut self, e: &UpdateBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`UpdateEndEvent`].
    #[inline]
    pub fn update_end(&mut self, e: &UpdateEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CompositingModeEvent`].
    #[inline]
    pub fn compositing_mode(&mut self, e: &CompositingModeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_compositing_mode(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceAllocationFailedEvent`].
    #[inline]
    pub fn surface_allocation_failed(&mut self, e: &SurfaceAllocationFailedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_allocation_failed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits backing changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn layer_changes(&mut self, update_index: u64, changes: &[LayerCompositingChange]) {
        if let Some(s) = &mut self.sink {
            s.on_layer_changes(update_index, changes);
        }
    }

    /// Emits repaint rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn repaint_rects(&mut self, update_index: u64, rects: &[RepaintRect]) {
        if let Some(s) = &mut self.sink {
            s.on_repaint_rects(update_index, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> UpdateBeginEvent {
        UpdateBeginEvent {
            update_index: 3,
            kind: CompositingUpdateType::AfterLayout,
            layer_count: 12,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_update_begin(&sample_begin());
        sink.on_phase_end(&PhaseEndEvent {
            update_index: 3,
            phase: PhaseKind::Rebuild,
            layers_visited: 4,
        });
        sink.on_surface_allocation_failed(&SurfaceAllocationFailedEvent {
            update_index: 3,
            layer_index: 1,
            role: SurfaceRole::Primary,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.update_begin(&sample_begin());
        tracer.compositing_mode(&CompositingModeEvent {
            update_index: 3,
            enabled: true,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            updates: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
                self.updates.push(e.update_index);
            }
        }

        let mut sink = RecordingSink {
            updates: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.update_begin(&sample_begin());
        drop(tracer);
        assert_eq!(sink.updates, &[3]);
    }
}
