// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, Chrome trace export, and surface-tree
//! snapshots for lamina diagnostics.
//!
//! This crate provides [`TraceSink`](lamina_core::trace::TraceSink)
//! implementations and surface-tree inspection for development and
//! post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`tree_text::format_surface_tree`]: indented text dump of a surface
//!   subtree.
//! - [`snapshot`]: JSON capture of surface geometry and structural
//!   comparison of two captures.

pub mod chrome;
pub mod pretty;
pub mod recorder;
pub mod snapshot;
pub mod tree_text;
