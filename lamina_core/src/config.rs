// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing triggers.

/// Which kinds of content are allowed to get their own surface.
///
/// Passed to [`LayerTreeCompositor::new`](crate::compositor::LayerTreeCompositor::new)
/// and replaceable at runtime with
/// [`set_config`](crate::compositor::LayerTreeCompositor::set_config).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositingConfig {
    /// Master switch. When off, no layer can be composited.
    pub accelerated_compositing: bool,
    /// Composite layers with 3-D transforms or a hidden back face, and allow
    /// 3-D rendering of surfaces.
    pub three_d_transform_trigger: bool,
    /// Composite accelerated video.
    pub video_trigger: bool,
    /// Composite accelerated canvases.
    pub canvas_trigger: bool,
    /// Composite accelerated plug-ins.
    pub plugin_trigger: bool,
    /// Composite layers running accelerated animations.
    pub animation_trigger: bool,
    /// Opacity animations composite even outside compositing mode.
    pub animated_opacity_trigger: bool,
    /// Composite filtered layers.
    pub filter_trigger: bool,
    /// Keep compositing mode on even when nothing needs compositing.
    pub force_compositing_mode: bool,
    /// Give the root layer a background surface when its background is fixed.
    pub fixed_root_background: bool,
    /// Minimum area, in square pixels, of a 2-D canvas worth compositing.
    pub canvas_area_threshold: f64,
}

impl CompositingConfig {
    /// The default triggers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accelerated_compositing: true,
            three_d_transform_trigger: true,
            video_trigger: true,
            canvas_trigger: true,
            plugin_trigger: true,
            animation_trigger: true,
            animated_opacity_trigger: false,
            filter_trigger: false,
            force_compositing_mode: false,
            fixed_root_background: false,
            canvas_area_threshold: 5000.0,
        }
    }

    /// Every trigger on.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            animated_opacity_trigger: true,
            filter_trigger: true,
            fixed_root_background: true,
            ..Self::new()
        }
    }

    /// Compositing disabled entirely.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            accelerated_compositing: false,
            three_d_transform_trigger: false,
            video_trigger: false,
            canvas_trigger: false,
            plugin_trigger: false,
            animation_trigger: false,
            ..Self::new()
        }
    }
}

impl Default for CompositingConfig {
    fn default() -> Self {
        Self::new()
    }
}
