// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style, content, and scrolling properties consumed by the compositor.

use kurbo::{Point, Rect, Size, Vec2};

use super::id::DocumentId;
use crate::transform::Transform3d;

/// An 8-bit-per-channel RGBA color (not premultiplied).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Creates a color from its components.
    #[inline]
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns `true` if the color is fully opaque.
    #[inline]
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == u8::MAX
    }
}

/// Stack level of a layer within its stacking context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ZIndex {
    /// `z-index: auto`: stack level 0, no stacking context of its own.
    #[default]
    Auto,
    /// An explicit stack level; a positioned layer with one establishes a
    /// stacking context.
    Value(i32),
}

impl ZIndex {
    /// Returns the stack level used for sorting (`Auto` counts as 0).
    #[inline]
    #[must_use]
    pub const fn level(self) -> i32 {
        match self {
            Self::Auto => 0,
            Self::Value(z) => z,
        }
    }
}

bitflags::bitflags! {
    /// Properties with a running accelerated animation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AnimatedProperties: u8 {
        /// `opacity` is animating.
        const OPACITY = 1 << 0;
        /// `transform` is animating.
        const TRANSFORM = 1 << 1;
        /// `filter` is animating.
        const FILTER = 1 << 2;
    }
}

/// Style properties of a layer.
///
/// These are the inputs the compositing policy reads; everything else about
/// a layer's appearance is painted by the layout collaborator and never seen
/// by lamina.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStyle {
    /// Transform applied about [`transform_origin`](Self::transform_origin).
    pub transform: Option<Transform3d>,
    /// Transform origin in local coordinates; `None` means the centre of the
    /// border box.
    pub transform_origin: Option<Point>,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Stack level.
    pub z_index: ZIndex,
    /// Whether the layer is positioned (relative, absolute, fixed, sticky).
    pub positioned: bool,
    /// Whether the layer clips its content to its border box.
    pub overflow_clip: bool,
    /// Explicit clip rectangle in local coordinates.
    pub clip: Option<Rect>,
    /// `transform-style: preserve-3d`.
    pub preserve_3d: bool,
    /// Perspective distance applied to children.
    pub perspective: Option<f64>,
    /// Perspective origin in local coordinates; `None` means the centre.
    pub perspective_origin: Option<Point>,
    /// `backface-visibility: hidden`.
    pub backface_hidden: bool,
    /// The layer has a mask image.
    pub has_mask: bool,
    /// The layer has a filter.
    pub has_filter: bool,
    /// The layer has a non-normal blend mode.
    pub has_blend_mode: bool,
    /// `visibility: visible` for the layer's own content.
    pub visible: bool,
    /// The layer paints a border, shadow, outline, or background image.
    pub has_box_decorations: bool,
    /// The layer paints non-layer content (text, replaced children, ...).
    pub paints_content: bool,
    /// Background color, if any.
    pub background_color: Option<Color>,
    /// The background is fixed to the viewport (only meaningful on the root).
    pub fixed_background: bool,
    /// Properties with a running accelerated animation.
    pub animations: AnimatedProperties,
    /// The element is animating into or out of full-screen.
    pub full_screen_animating: bool,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            transform: None,
            transform_origin: None,
            opacity: 1.0,
            z_index: ZIndex::Auto,
            positioned: false,
            overflow_clip: false,
            clip: None,
            preserve_3d: false,
            perspective: None,
            perspective_origin: None,
            backface_hidden: false,
            has_mask: false,
            has_filter: false,
            has_blend_mode: false,
            visible: true,
            has_box_decorations: false,
            paints_content: false,
            background_color: None,
            fixed_background: false,
            animations: AnimatedProperties::empty(),
            full_screen_animating: false,
        }
    }
}

impl LayerStyle {
    /// Returns `true` if the layer groups its content before applying an
    /// effect (opacity, mask, filter, blending).
    #[inline]
    #[must_use]
    pub fn creates_group(&self) -> bool {
        self.opacity < 1.0 || self.has_mask || self.has_filter || self.has_blend_mode
    }

    /// Returns `true` if the layer clips its descendants.
    #[inline]
    #[must_use]
    pub fn has_clip_or_overflow_clip(&self) -> bool {
        self.overflow_clip || self.clip.is_some()
    }

    /// Returns `true` if the transform has 3-D components.
    #[inline]
    #[must_use]
    pub fn has_3d_transform(&self) -> bool {
        self.transform.is_some_and(|t| t.has_3d())
    }

    /// Returns `true` if the transform origin differs from the default centre.
    #[inline]
    #[must_use]
    pub fn has_non_default_transform_origin(&self) -> bool {
        self.transform_origin.is_some()
    }
}

/// What a layer's renderer is.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LayerContent {
    /// An ordinary box.
    #[default]
    Box,
    /// An image element.
    Image {
        /// The image can be handed to the surface directly instead of being
        /// painted (no decorations, no clipping of the image itself).
        directly_composited: bool,
    },
    /// A video element.
    Video {
        /// The element currently shows video frames (not a poster).
        displays: bool,
        /// The media player renders into a hardware layer.
        accelerated: bool,
    },
    /// A canvas element.
    Canvas {
        /// The rendering context is accelerated.
        accelerated: bool,
        /// The rendering context is a 3-D context.
        is_3d: bool,
        /// Canvas backing size in pixels.
        size: Size,
    },
    /// An embedded plug-in.
    Plugin {
        /// The plug-in renders into a hardware layer.
        allows_accelerated: bool,
        /// Content box in local coordinates.
        content_box: Rect,
    },
    /// An iframe hosting another document.
    Frame {
        /// The hosted document.
        document: DocumentId,
        /// The hosted document composites and wants to be grafted.
        requires_accelerated: bool,
        /// Content box in local coordinates.
        content_box: Rect,
    },
}

impl LayerContent {
    /// Returns `true` for video.
    #[inline]
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }

    /// Returns `true` for replaced content (everything except a plain box).
    #[inline]
    #[must_use]
    pub const fn is_replaced(&self) -> bool {
        !matches!(self, Self::Box)
    }
}

/// Scrollbar and scroll-corner rectangles of a scrollable layer, in local
/// coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverflowControls {
    /// Horizontal scrollbar.
    pub horizontal: Option<Rect>,
    /// Vertical scrollbar.
    pub vertical: Option<Rect>,
    /// Scroll corner.
    pub corner: Option<Rect>,
    /// Overlay scrollbars (drawn above content, not taking layout space).
    pub overlay: bool,
}

/// Scroll position of a scrollable layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollState {
    /// Current scroll offset.
    pub offset: Vec2,
    /// Size of the scrollable contents.
    pub contents_size: Size,
    /// Scrolling is performed by moving a surface rather than repainting.
    pub composited: bool,
}
