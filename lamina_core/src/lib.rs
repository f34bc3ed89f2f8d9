// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing layer-tree management.
//!
//! `lamina_core` decides which layers of a document's paint tree get their
//! own hardware surface and keeps a parallel tree of those surfaces in sync
//! with the layer tree. It is `no_std` compatible (with `alloc`) and uses
//! array-based struct-of-arrays storage with generational index handles.
//!
//! # Architecture
//!
//! Layout and style write into the [`LayerTree`](layer::LayerTree); an
//! update of the [`LayerTreeCompositor`](compositor::LayerTreeCompositor)
//! then brings the [`SurfaceTree`](surface::SurfaceTree) up to date, and a
//! platform presenter consumes the resulting surface changes:
//!
//! ```text
//!   layout / style
//!       │
//!       ▼
//!   LayerTree ──► take_changes() ──► LayerTreeCompositor::update_compositing_layers()
//!                                         │  requirements ─► rebuild | geometry
//!                                         ▼
//!   SurfaceTree ──► evaluate() ──► SurfaceChanges ──► SurfacePresenter::apply()
//!                                         │
//!   RepaintRequest ◄──────────────────────┘  (back to the layout collaborator)
//! ```
//!
//! **[`layer`]**: Struct-of-arrays layer tree with generational handles,
//! stacking contexts, and z-order lists.
//!
//! **[`surface`]**: Surface handles, their properties and hierarchy, and the
//! [`SurfacePresenter`](surface::SurfacePresenter) trait.
//!
//! **[`compositor`]**: The compositing policy, overlap testing, per-layer
//! backings, and the update passes.
//!
//! **[`geometry`]**: Per-update cache of absolute transforms and clips.
//!
//! **[`config`]**: Which kinds of content may be composited.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//!
//! **[`transform`]**: 4×4 transform type for layer and surface transforms.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! update instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   compositing changes and repaint-rect events.
//!
//! Diagnostics go through the [`log`] facade; install any logger to see
//! compositing-mode transitions and refused surface allocations.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod compositor;
pub mod config;
pub mod dirty;
pub mod geometry;
pub mod layer;
pub mod surface;
pub mod trace;
pub mod transform;
