// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

/// A handle to a surface in a [`SurfaceTree`](super::SurfaceTree).
///
/// Like [`LayerId`](crate::layer::LayerId), a surface handle carries a
/// generation so that handles to destroyed surfaces are detected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl SurfaceId {
    /// Returns the raw slot index (for diagnostics and presenter tables).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({}@gen{})", self.idx, self.generation)
    }
}
