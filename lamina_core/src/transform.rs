// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D transforms that `lamina_core` actually
//! needs (identity, multiply, perspective, point and rect mapping, and
//! flattening for environments without 3-D rendering) without pulling in a
//! full linear-algebra crate.

use core::ops::Mul;

use kurbo::{Point, Rect};

/// A column-major 4×4 affine transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs and Core Animation's `CATransform3D`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns the columns as a 2-D array.
    #[inline]
    #[must_use]
    pub const fn to_cols_array_2d(self) -> [[f64; 4]; 4] {
        self.cols
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a perspective projection with the given viewer distance.
    ///
    /// A non-positive distance yields the identity, matching CSS
    /// `perspective: none` for degenerate values.
    #[inline]
    #[must_use]
    pub fn from_perspective(distance: f64) -> Self {
        if distance <= 0.0 {
            return Self::IDENTITY;
        }
        let mut t = Self::IDENTITY;
        t.cols[2][3] = -1.0 / distance;
        t
    }

    /// Returns `true` if this is exactly the identity matrix.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns `true` if the matrix uses the z axis or a projective row.
    ///
    /// A transform that can be expressed as a 2-D affine transform returns
    /// `false`.
    #[must_use]
    pub fn has_3d(&self) -> bool {
        let c = &self.cols;
        c[0][2] != 0.0
            || c[0][3] != 0.0
            || c[1][2] != 0.0
            || c[1][3] != 0.0
            || c[2] != [0.0, 0.0, 1.0, 0.0]
            || c[3][2] != 0.0
            || c[3][3] != 1.0
    }

    /// Drops the z components, keeping the 2-D affine part.
    #[must_use]
    pub fn flatten(&self) -> Self {
        let c = &self.cols;
        Self::from_cols(
            [c[0][0], c[0][1], 0.0, 0.0],
            [c[1][0], c[1][1], 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [c[3][0], c[3][1], 0.0, 1.0],
        )
    }

    /// Maps a point on the z = 0 plane, applying the perspective divide.
    #[must_use]
    pub fn map_point(&self, p: Point) -> Point {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w == 1.0 || w == 0.0 {
            Point::new(x, y)
        } else {
            Point::new(x / w, y / w)
        }
    }

    /// Returns the bounding box of the four mapped corners of `rect`.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        if self.is_identity() {
            return rect;
        }
        let corners = [
            self.map_point(Point::new(rect.x0, rect.y0)),
            self.map_point(Point::new(rect.x1, rect.y0)),
            self.map_point(Point::new(rect.x0, rect.y1)),
            self.map_point(Point::new(rect.x1, rect.y1)),
        ];
        let mut out = Rect::from_points(corners[0], corners[1]);
        out = out.union_pt(corners[2]);
        out.union_pt(corners[3])
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// +90 degrees around z.
    const QUARTER_TURN: Transform3d = Transform3d::from_cols(
        [0.0, 1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    );

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Transform3d::from_translation(1.0, 2.0, 3.0);
        assert_eq!(Transform3d::IDENTITY * t, t);
        assert_eq!(t * Transform3d::IDENTITY, t);
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        let c = a * b;
        // Combined translation should be (1, 2, 0).
        let col3 = c.col(3);
        assert_eq!(col3, [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn scale() {
        let s = Transform3d::from_scale(2.0, 3.0, 4.0);
        assert_eq!(s.col(0)[0], 2.0);
        assert_eq!(s.col(1)[1], 3.0);
        assert_eq!(s.col(2)[2], 4.0);
        assert_eq!(s.col(3), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn scale_then_translate() {
        let s = Transform3d::from_scale(2.0, 2.0, 2.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        // Scale first, then translate: T * S
        let combined = t * s;
        // Column 0 should be scaled.
        assert_eq!(combined.col(0), [2.0, 0.0, 0.0, 0.0]);
        // Translation column should be unchanged (translation applied after).
        assert_eq!(combined.col(3), [3.0, 4.0, 0.0, 1.0]);
    }

    #[test]
    fn translation_is_not_3d() {
        assert!(!Transform3d::from_translation(4.0, 5.0, 0.0).has_3d());
        assert!(!QUARTER_TURN.has_3d());
    }

    #[test]
    fn z_translation_and_perspective_are_3d() {
        assert!(Transform3d::from_translation(0.0, 0.0, 1.0).has_3d());
        assert!(Transform3d::from_perspective(500.0).has_3d());
        assert!(Transform3d::from_scale(1.0, 1.0, 2.0).has_3d());
    }

    #[test]
    fn flatten_keeps_affine_part() {
        let t = Transform3d::from_translation(3.0, 4.0, 9.0) * Transform3d::from_scale(2.0, 2.0, 2.0);
        let f = t.flatten();
        assert!(!f.has_3d());
        assert_eq!(f.col(3), [3.0, 4.0, 0.0, 1.0]);
        assert_eq!(f.col(0), [2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn map_rect_translates_and_scales() {
        let t = Transform3d::from_translation(10.0, 20.0, 0.0) * Transform3d::from_scale(2.0, 3.0, 1.0);
        let r = t.map_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 20.0, 35.0));
    }

    #[test]
    fn map_rect_rotation_gives_bounding_box() {
        let r = QUARTER_TURN.map_rect(Rect::new(0.0, 0.0, 10.0, 4.0));
        assert_eq!(r, Rect::new(-4.0, 0.0, 0.0, 10.0));
    }

    #[test]
    fn non_positive_perspective_is_identity() {
        assert!(Transform3d::from_perspective(0.0).is_identity());
        assert!(Transform3d::from_perspective(-3.0).is_identity());
    }
}
