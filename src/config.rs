//! Render manager configuration.

use crate::tree::ViewId;

/// What to do when a view is removed from a parent and added back to that
/// same parent before the pending work is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReattachPolicy {
    /// Collapse the round trip into nothing, except when the parent is the
    /// display: then the view is torn down and mounted again.
    #[default]
    AsObserved,
    /// Always collapse: the mounted view keeps its surface.
    AlwaysCollapse,
    /// Never collapse: the view is always torn down and mounted again.
    NeverCollapse,
}

impl ReattachPolicy {
    /// Whether a pending unmount from `parent` cancels against a re-add.
    pub fn collapses(self, parent: ViewId, display: ViewId) -> bool {
        match self {
            ReattachPolicy::AsObserved => parent != display,
            ReattachPolicy::AlwaysCollapse => true,
            ReattachPolicy::NeverCollapse => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub reattach: ReattachPolicy,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reattach(mut self, policy: ReattachPolicy) -> Self {
        self.reattach = policy;
        self
    }
}
