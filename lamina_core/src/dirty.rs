// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Lamina uses multi-channel dirty tracking (via [`understory_dirty`]) in both
//! of its trees. Each channel represents an independent category of change.
//!
//! # Layer tree channels
//!
//! - **Propagating**: [`GEOMETRY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with dependency edges from
//!   child to parent, so moving or resizing a layer marks every descendant.
//!   Geometry changes alone only require repositioning existing surfaces.
//! - **Local-only**: [`STYLE`] and [`CONTENT`]. Either may change whether a
//!   layer needs its own surface, so they request a hierarchy re-evaluation.
//! - **Structural**: [`TOPOLOGY`] marks add/remove/destroy and z-order
//!   affecting edits; it invalidates the z-order lists and forces the surface
//!   hierarchy to be rebuilt.
//!
//! [`LayerTree::take_changes`](crate::layer::LayerTree::take_changes) drains
//! them into [`LayerChanges`](crate::layer::LayerChanges).
//!
//! # Surface tree channels
//!
//! All surface channels are local: surfaces carry no inherited state.
//! [`SurfaceTree::evaluate`](crate::surface::SurfaceTree::evaluate) drains
//! them into [`SurfaceChanges`](crate::surface::SurfaceChanges), which
//! presenters [consume](crate::surface::SurfacePresenter::apply).

use understory_dirty::Channel;

/// Layer offset, size, or overflow changed; propagates to descendants.
pub const GEOMETRY: Channel = Channel::new(0);

/// Layer style changed.
pub const STYLE: Channel = Channel::new(1);

/// Layer content type or scrolling state changed.
pub const CONTENT: Channel = Channel::new(2);

/// Tree topology or stacking order changed.
pub const TOPOLOGY: Channel = Channel::new(3);

/// Surface position, size, anchor, or transforms changed.
pub const SURFACE_GEOMETRY: Channel = Channel::new(4);

/// Surface opacity, clipping, visibility, mask, or replica changed.
pub const SURFACE_APPEARANCE: Channel = Channel::new(5);

/// Surface content source changed or needs redisplay.
pub const SURFACE_CONTENT: Channel = Channel::new(6);

/// Surface children changed.
pub const SURFACE_TOPOLOGY: Channel = Channel::new(7);
