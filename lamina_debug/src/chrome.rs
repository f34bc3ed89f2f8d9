// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Updates and their phases become nested duration slices; mode transitions,
/// refused allocations, and rich-event counts become instant events.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = nanos_to_us(record.at_nanos);
        let event = match record.event {
            RecordedEvent::UpdateBegin(e) => json!({
                "ph": "B",
                "name": "Update",
                "cat": "Compositor",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "update_index": e.update_index,
                    "kind": format!("{:?}", e.kind),
                    "layer_count": e.layer_count,
                }
            }),
            RecordedEvent::UpdateEnd(e) => json!({
                "ph": "E",
                "name": "Update",
                "cat": "Compositor",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "update_index": e.update_index,
                    "performed": e.performed,
                    "hierarchy_updated": e.hierarchy_updated,
                    "composited_layers": e.composited_layers,
                    "repaints": e.repaints,
                }
            }),
            RecordedEvent::PhaseBegin(e) => json!({
                "ph": "B",
                "name": format!("{:?}", e.phase),
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "update_index": e.update_index,
                }
            }),
            RecordedEvent::PhaseEnd(e) => json!({
                "ph": "E",
                "name": format!("{:?}", e.phase),
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "update_index": e.update_index,
                    "layers_visited": e.layers_visited,
                }
            }),
            RecordedEvent::CompositingMode(e) => {
                let name = if e.enabled {
                    "EnterCompositing"
                } else {
                    "LeaveCompositing"
                };
                json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Compositor",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "update_index": e.update_index,
                    }
                })
            }
            RecordedEvent::SurfaceAllocationFailed(e) => json!({
                "ph": "i",
                "name": "AllocationRefused",
                "cat": "Compositor",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "update_index": e.update_index,
                    "layer_index": e.layer_index,
                    "role": format!("{:?}", e.role),
                }
            }),
            RecordedEvent::LayerChangesCount {
                update_index,
                count,
            } => json!({
                "ph": "i",
                "name": "LayerChanges",
                "cat": "Rich",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "update_index": update_index,
                    "count": count,
                }
            }),
            RecordedEvent::RepaintRectsCount {
                update_index,
                count,
            } => json!({
                "ph": "i",
                "name": "RepaintRects",
                "cat": "Rich",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "update_index": update_index,
                    "count": count,
                }
            }),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events).map_err(io::Error::other)
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}
