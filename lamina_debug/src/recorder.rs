// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each stamped with the
//! nanoseconds elapsed since the recorder was created. [`decode`] reads them
//! back as an iterator of [`Record`].
//!
//! Rich events ([`on_layer_changes`](TraceSink::on_layer_changes),
//! [`on_repaint_rects`](TraceSink::on_repaint_rects)) store only the count.

use std::time::Instant;

use lamina_core::compositor::CompositingUpdateType;
use lamina_core::surface::SurfaceRole;
use lamina_core::trace::{
    CompositingModeEvent, LayerCompositingChange, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    RepaintRect, SurfaceAllocationFailedEvent, TraceSink, UpdateBeginEvent, UpdateEndEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_UPDATE_BEGIN: u8 = 1;
const TAG_UPDATE_END: u8 = 2;
const TAG_PHASE_BEGIN: u8 = 3;
const TAG_PHASE_END: u8 = 4;
const TAG_COMPOSITING_MODE: u8 = 5;
const TAG_ALLOCATION_FAILED: u8 = 6;
const TAG_LAYER_CHANGES_COUNT: u8 = 7;
const TAG_REPAINT_RECTS_COUNT: u8 = 8;

const ROLES: [SurfaceRole; 13] = [
    SurfaceRole::RootContent,
    SurfaceRole::Primary,
    SurfaceRole::AncestorClip,
    SurfaceRole::ContentsContainment,
    SurfaceRole::ChildContainment,
    SurfaceRole::Foreground,
    SurfaceRole::Background,
    SurfaceRole::Mask,
    SurfaceRole::HorizontalScrollbar,
    SurfaceRole::VerticalScrollbar,
    SurfaceRole::ScrollCorner,
    SurfaceRole::Scrolling,
    SurfaceRole::ScrollingContents,
];

const UPDATE_TYPES: [CompositingUpdateType; 5] = [
    CompositingUpdateType::AfterStyleChange,
    CompositingUpdateType::AfterLayout,
    CompositingUpdateType::OnHitTest,
    CompositingUpdateType::OnScroll,
    CompositingUpdateType::OnCompositedScroll,
];

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    start: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder; timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin_record(&mut self, tag: u8) {
        let at = u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.write_u8(tag);
        self.write_u64(at);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, len: usize) {
        self.write_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Requirements => 0,
            PhaseKind::Rebuild => 1,
            PhaseKind::Geometry => 2,
        });
    }

    fn write_update_type(&mut self, kind: CompositingUpdateType) {
        let tag = UPDATE_TYPES.iter().position(|&k| k == kind).unwrap_or(0);
        self.write_u8(u8::try_from(tag).unwrap_or(0));
    }

    fn write_role(&mut self, role: SurfaceRole) {
        let tag = ROLES.iter().position(|&r| r == role).unwrap_or(0);
        self.write_u8(u8::try_from(tag).unwrap_or(0));
    }
}

impl TraceSink for RecorderSink {
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        self.begin_record(TAG_UPDATE_BEGIN);
        self.write_u64(e.update_index);
        self.write_update_type(e.kind);
        self.write_u32(e.layer_count);
    }

    fn on_update_end(&mut self, e: &UpdateEndEvent) {
        self.begin_record(TAG_UPDATE_END);
        self.write_u64(e.update_index);
        self.write_bool(e.performed);
        self.write_bool(e.hierarchy_updated);
        self.write_u32(e.composited_layers);
        self.write_u32(e.repaints);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin_record(TAG_PHASE_BEGIN);
        self.write_u64(e.update_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin_record(TAG_PHASE_END);
        self.write_u64(e.update_index);
        self.write_phase(e.phase);
        self.write_u32(e.layers_visited);
    }

    fn on_compositing_mode(&mut self, e: &CompositingModeEvent) {
        self.begin_record(TAG_COMPOSITING_MODE);
        self.write_u64(e.update_index);
        self.write_bool(e.enabled);
    }

    fn on_surface_allocation_failed(&mut self, e: &SurfaceAllocationFailedEvent) {
        self.begin_record(TAG_ALLOCATION_FAILED);
        self.write_u64(e.update_index);
        self.write_u32(e.layer_index);
        self.write_role(e.role);
    }

    fn on_layer_changes(&mut self, update_index: u64, changes: &[LayerCompositingChange]) {
        self.begin_record(TAG_LAYER_CHANGES_COUNT);
        self.write_u64(update_index);
        self.write_count(changes.len());
    }

    fn on_repaint_rects(&mut self, update_index: u64, rects: &[RepaintRect]) {
        self.begin_record(TAG_REPAINT_RECTS_COUNT);
        self.write_u64(update_index);
        self.write_count(rects.len());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`UpdateBeginEvent`].
    UpdateBegin(UpdateBeginEvent),
    /// An [`UpdateEndEvent`].
    UpdateEnd(UpdateEndEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CompositingModeEvent`].
    CompositingMode(CompositingModeEvent),
    /// A [`SurfaceAllocationFailedEvent`].
    SurfaceAllocationFailed(SurfaceAllocationFailedEvent),
    /// Backing-change count for an update.
    LayerChangesCount {
        /// Update counter.
        update_index: u64,
        /// Number of layers that gained or lost a backing.
        count: u32,
    },
    /// Repaint-request count for an update.
    RepaintRectsCount {
        /// Update counter.
        update_index: u64,
        /// Number of repaint requests.
        count: u32,
    },
}

/// A decoded event with its arrival time.
#[derive(Clone, Debug)]
pub struct Record {
    /// Nanoseconds since the recorder was created.
    pub at_nanos: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Requirements,
            1 => PhaseKind::Rebuild,
            _ => PhaseKind::Geometry,
        })
    }

    fn read_update_type(&mut self) -> Option<CompositingUpdateType> {
        UPDATE_TYPES.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_role(&mut self) -> Option<SurfaceRole> {
        ROLES.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_event(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_UPDATE_BEGIN => RecordedEvent::UpdateBegin(UpdateBeginEvent {
                update_index: self.read_u64()?,
                kind: self.read_update_type()?,
                layer_count: self.read_u32()?,
            }),
            TAG_UPDATE_END => RecordedEvent::UpdateEnd(UpdateEndEvent {
                update_index: self.read_u64()?,
                performed: self.read_bool()?,
                hierarchy_updated: self.read_bool()?,
                composited_layers: self.read_u32()?,
                repaints: self.read_u32()?,
            }),
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin(PhaseBeginEvent {
                update_index: self.read_u64()?,
                phase: self.read_phase()?,
            }),
            TAG_PHASE_END => RecordedEvent::PhaseEnd(PhaseEndEvent {
                update_index: self.read_u64()?,
                phase: self.read_phase()?,
                layers_visited: self.read_u32()?,
            }),
            TAG_COMPOSITING_MODE => RecordedEvent::CompositingMode(CompositingModeEvent {
                update_index: self.read_u64()?,
                enabled: self.read_bool()?,
            }),
            TAG_ALLOCATION_FAILED => {
                RecordedEvent::SurfaceAllocationFailed(SurfaceAllocationFailedEvent {
                    update_index: self.read_u64()?,
                    layer_index: self.read_u32()?,
                    role: self.read_role()?,
                })
            }
            TAG_LAYER_CHANGES_COUNT => RecordedEvent::LayerChangesCount {
                update_index: self.read_u64()?,
                count: self.read_u32()?,
            },
            TAG_REPAINT_RECTS_COUNT => RecordedEvent::RepaintRectsCount {
                update_index: self.read_u64()?,
                count: self.read_u32()?,
            },
            _ => return None, // unknown tag → stop iteration
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_nanos = self.read_u64()?;
        let event = self.decode_event(tag)?;
        Some(Record { at_nanos, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
