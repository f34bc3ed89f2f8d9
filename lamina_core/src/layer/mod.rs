// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model.
//!
//! A *layer* is a node of the document's paint tree that may need its own
//! surface. Each layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: parent, first-child, and sibling links in document order, plus
//!   an optional [reflection](LayerTree::set_reflection).
//! - Geometry set by layout: [`offset`](LayerTree::set_offset),
//!   [`size`](LayerTree::set_size), and
//!   [`visual_overflow`](LayerTree::set_visual_overflow).
//! - [`LayerStyle`] and [`LayerContent`], the inputs to the compositing
//!   policy.
//! - Derived stacking information: stacking contexts, normal-flow-only
//!   layers, and the z-order lists the compositor walks.
//!
//! # Dirty tracking
//!
//! Mutations mark the corresponding channel (see [`dirty`](crate::dirty)):
//!
//! - **GEOMETRY** propagates to all descendants.
//! - **STYLE** / **CONTENT** are local-only.
//! - **TOPOLOGY** marks structural and stacking-order changes and invalidates
//!   the z-order lists.

mod changes;
mod id;
mod store;
mod style;
mod traverse;

pub use changes::LayerChanges;
pub use id::{DocumentId, INVALID, LayerId};
pub use store::LayerTree;
pub use style::{
    AnimatedProperties, Color, LayerContent, LayerStyle, OverflowControls, ScrollState, ZIndex,
};
pub use traverse::Children;
