// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-document grafting.
//!
//! A document hosted in an iframe may composite into its own root content
//! surface. When it propagates compositing to the enclosing frame, the
//! enclosing document's compositor grafts that surface under the iframe
//! layer's backing. [`FrameContents`] is how the enclosing compositor finds
//! it; both documents share one [`SurfaceTree`](crate::surface::SurfaceTree).

use alloc::collections::BTreeMap;

use super::LayerTreeCompositor;
use crate::layer::DocumentId;
use crate::surface::SurfaceId;

/// Lookup from hosted documents to their compositing state.
pub trait FrameContents {
    /// Root content surface of `document`, if it is composited and attached
    /// via its enclosing frame.
    fn root_surface(&self, document: DocumentId) -> Option<SurfaceId>;

    /// Whether `document` wants its compositing to propagate into the
    /// enclosing frame.
    fn propagates_compositing(&self, document: DocumentId) -> bool;
}

/// A [`FrameContents`] with no hosted documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFrames;

impl FrameContents for NoFrames {
    fn root_surface(&self, _document: DocumentId) -> Option<SurfaceId> {
        None
    }

    fn propagates_compositing(&self, _document: DocumentId) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FrameEntry {
    root_surface: Option<SurfaceId>,
    propagates: bool,
}

/// A [`FrameContents`] built from hosted documents' compositors.
///
/// Refresh an entry with [`update_from`](Self::update_from) after the hosted
/// document's compositing update and before the enclosing one.
#[derive(Clone, Debug, Default)]
pub struct FrameRegistry {
    documents: BTreeMap<DocumentId, FrameEntry>,
}

impl FrameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current state of `document`'s compositor.
    ///
    /// Returns `true` if the recorded state changed, in which case the
    /// enclosing document should schedule a compositing update.
    pub fn update_from(&mut self, document: DocumentId, compositor: &LayerTreeCompositor) -> bool {
        let entry = FrameEntry {
            root_surface: compositor.root_surface(),
            propagates: compositor.propagates_to_enclosing_frame(),
        };
        self.documents.insert(document, entry) != Some(entry)
    }

    /// Forgets `document`.
    pub fn remove(&mut self, document: DocumentId) {
        self.documents.remove(&document);
    }

    /// Number of registered documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no document is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl FrameContents for FrameRegistry {
    fn root_surface(&self, document: DocumentId) -> Option<SurfaceId> {
        self.documents.get(&document).and_then(|e| e.root_surface)
    }

    fn propagates_compositing(&self, document: DocumentId) -> bool {
        self.documents.get(&document).is_some_and(|e| e.propagates)
    }
}
