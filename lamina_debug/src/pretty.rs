// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::trace::{
    CompositingModeEvent, LayerCompositingChange, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    RepaintRect, SurfaceAllocationFailedEvent, TraceSink, UpdateBeginEvent, UpdateEndEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Requirements => "requirements",
        PhaseKind::Rebuild => "rebuild",
        PhaseKind::Geometry => "geometry",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[update:begin] update={} kind={:?} layers={}",
            e.update_index, e.kind, e.layer_count,
        );
    }

    fn on_update_end(&mut self, e: &UpdateEndEvent) {
        let outcome = if !e.performed {
            "deferred"
        } else if e.hierarchy_updated {
            "rebuilt"
        } else {
            "geometry"
        };
        let _ = writeln!(
            self.writer,
            "[update:end] update={} {outcome} composited={} repaints={}",
            e.update_index, e.composited_layers, e.repaints,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] update={} {}",
            e.update_index,
            phase_name(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] update={} {} visited={}",
            e.update_index,
            phase_name(e.phase),
            e.layers_visited,
        );
    }

    fn on_compositing_mode(&mut self, e: &CompositingModeEvent) {
        let mode = if e.enabled { "enter" } else { "leave" };
        let _ = writeln!(self.writer, "[mode] update={} {mode}", e.update_index);
    }

    fn on_surface_allocation_failed(&mut self, e: &SurfaceAllocationFailedEvent) {
        let _ = writeln!(
            self.writer,
            "[refused] update={} layer={} role={:?}",
            e.update_index, e.layer_index, e.role,
        );
    }

    fn on_layer_changes(&mut self, update_index: u64, changes: &[LayerCompositingChange]) {
        let gained = changes.iter().filter(|c| c.composited).count();
        let _ = writeln!(
            self.writer,
            "[layers] update={update_index} gained={gained} lost={}",
            changes.len() - gained,
        );
    }

    fn on_repaint_rects(&mut self, update_index: u64, rects: &[RepaintRect]) {
        let _ = writeln!(
            self.writer,
            "[repaint] update={update_index} rects={}",
            rects.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::compositor::CompositingUpdateType;
    use lamina_core::surface::SurfaceRole;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_update_bracket() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_update_begin(&UpdateBeginEvent {
            update_index: 3,
            kind: CompositingUpdateType::AfterLayout,
            layer_count: 12,
        });
        sink.on_update_end(&UpdateEndEvent {
            update_index: 3,
            performed: true,
            hierarchy_updated: true,
            composited_layers: 2,
            repaints: 0,
        });
        let output = output(sink);
        assert!(output.contains("[update:begin] update=3"), "got: {output}");
        assert!(output.contains("kind=AfterLayout"), "got: {output}");
        assert!(output.contains("rebuilt composited=2"), "got: {output}");
    }

    #[test]
    fn pretty_print_refused_allocation() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_surface_allocation_failed(&SurfaceAllocationFailedEvent {
            update_index: 1,
            layer_index: 4,
            role: SurfaceRole::Mask,
        });
        let output = output(sink);
        assert_eq!(output, "[refused] update=1 layer=4 role=Mask\n");
    }
}
