// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation surfaces.
//!
//! A *surface* is an opaque handle to a hardware-backed layer owned by the
//! presentation collaborator. [`SurfaceTree`] keeps their attributes and
//! hierarchy; [`SurfacePresenter`] is how a platform consumes changes.

mod id;
mod present;
mod tree;

pub use id::SurfaceId;
pub use present::SurfacePresenter;
pub use tree::{
    PaintingPhase, SurfaceChanges, SurfaceContent, SurfaceProperties, SurfaceRole, SurfaceTree,
};
