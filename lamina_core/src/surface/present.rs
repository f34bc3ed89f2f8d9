// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation contract for platform integrations.
//!
//! Lamina never touches native surfaces itself. The compositor edits a
//! [`SurfaceTree`]; once an update finishes, the embedder drains the tree
//! with [`SurfaceTree::evaluate`] and hands the result to a
//! [`SurfacePresenter`], which mirrors the changes onto platform objects
//! (`CALayer`s, DOM elements, a GPU scene graph, ...).
//!
//! ```rust,ignore
//! let outcome = compositor.update_compositing_layers(kind, &mut env);
//! for repaint in &outcome.repaints {
//!     layout.invalidate(repaint.container, repaint.rect);
//! }
//! let changes = env.surfaces.evaluate();
//! presenter.apply(&env.surfaces, &changes);
//! ```

use super::{SurfaceChanges, SurfaceTree};

/// Applies drained surface changes to a platform-native presentation tree.
pub trait SurfacePresenter {
    /// Applies the given [`SurfaceChanges`], reading current attribute values
    /// from `tree` as needed.
    fn apply(&mut self, tree: &SurfaceTree, changes: &SurfaceChanges);
}
