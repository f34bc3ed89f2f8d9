// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update kinds and deferred-update coalescing.

/// What prompted a compositing update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositingUpdateType {
    /// Style was recalculated.
    AfterStyleChange,
    /// Layout finished.
    AfterLayout,
    /// A hit test needs up-to-date compositing state.
    OnHitTest,
    /// The document scrolled; overlap may have changed.
    OnScroll,
    /// A composited scroller moved; only geometry needs refreshing.
    OnCompositedScroll,
}

impl CompositingUpdateType {
    /// Returns `true` if this kind re-evaluates which layers are composited.
    #[must_use]
    pub const fn checks_hierarchy(self) -> bool {
        !matches!(self, Self::OnCompositedScroll)
    }

    /// Returns `true` if this kind refreshes geometry even when nothing in
    /// the layer tree reported a change.
    #[must_use]
    pub const fn forces_geometry(self) -> bool {
        matches!(self, Self::OnScroll | Self::OnCompositedScroll)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::OnCompositedScroll => 0,
            Self::OnHitTest => 1,
            Self::AfterStyleChange => 2,
            Self::AfterLayout => 3,
            Self::OnScroll => 4,
        }
    }

    /// Combines two requests into one that does the work of both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let hierarchy = self.checks_hierarchy() || other.checks_hierarchy();
        let geometry = self.forces_geometry() || other.forces_geometry();
        match (hierarchy, geometry) {
            (true, true) => Self::OnScroll,
            (false, _) => Self::OnCompositedScroll,
            (true, false) => {
                if self.rank() >= other.rank() {
                    self
                } else {
                    other
                }
            }
        }
    }
}

/// Coalesces update requests until the embedder runs them.
///
/// Any number of [`schedule`](Self::schedule) calls before the next
/// [`take`](Self::take) produce a single update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateScheduler {
    pending: Option<CompositingUpdateType>,
    requests: u32,
}

impl UpdateScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: None,
            requests: 0,
        }
    }

    /// Requests an update of `kind`, merging with any pending request.
    pub fn schedule(&mut self, kind: CompositingUpdateType) {
        self.pending = Some(match self.pending {
            Some(prev) => prev.merge(kind),
            None => kind,
        });
        self.requests += 1;
    }

    /// Returns `true` if an update is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending kind, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<CompositingUpdateType> {
        self.pending
    }

    /// Number of requests folded into the pending update.
    #[must_use]
    pub const fn coalesced_requests(&self) -> u32 {
        self.requests
    }

    /// Takes the pending request, leaving nothing pending.
    pub fn take(&mut self) -> Option<CompositingUpdateType> {
        self.requests = 0;
        self.pending.take()
    }

    /// Drops any pending request.
    pub fn cancel(&mut self) {
        self.requests = 0;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::CompositingUpdateType::*;
    use super::*;

    #[test]
    fn many_requests_coalesce_into_one() {
        let mut s = UpdateScheduler::new();
        s.schedule(AfterStyleChange);
        s.schedule(AfterStyleChange);
        s.schedule(AfterLayout);
        assert_eq!(s.coalesced_requests(), 3);
        assert_eq!(s.take(), Some(AfterLayout));
        assert_eq!(s.take(), None);
        assert!(!s.is_pending());
    }

    #[test]
    fn merge_keeps_both_kinds_of_work() {
        assert_eq!(OnCompositedScroll.merge(AfterStyleChange), OnScroll);
        assert_eq!(OnCompositedScroll.merge(OnCompositedScroll), OnCompositedScroll);
        assert_eq!(OnHitTest.merge(AfterStyleChange), AfterStyleChange);
        assert_eq!(OnScroll.merge(AfterLayout), OnScroll);
    }

    #[test]
    fn cancel_clears_pending() {
        let mut s = UpdateScheduler::new();
        s.schedule(OnScroll);
        s.cancel();
        assert_eq!(s.pending(), None);
        assert_eq!(s.coalesced_requests(), 0);
    }
}
