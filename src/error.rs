use thiserror::Error;

use crate::device::DeviceError;
use crate::tree::ViewId;

/// Rejected structural edits of the scene.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("view {0:?} does not belong to this scene")]
    UnknownView(ViewId),

    #[error("the display cannot be added as a child")]
    DisplayAsChild,

    #[error("adding {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: ViewId, child: ViewId },

    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: ViewId, child: ViewId },

    #[error("index {index} is out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A listener of the old parent attached `child` elsewhere while it was
    /// being moved.
    #[error("{child:?} was re-parented under {parent:?} during the move")]
    Reparented { parent: ViewId, child: ViewId },

    #[error("{0:?} is still attached to a parent")]
    Attached(ViewId),

    /// The view, or one of its descendants, still has change listeners.
    /// Mounted views stay observed until the next flush unmounts them.
    #[error("{0:?} is still observed")]
    Observed(ViewId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The device refused a surface. The view's subtree stays unmounted
    /// until it is added again.
    #[error("failed to lease a surface for {view:?}")]
    SurfaceLease {
        view: ViewId,
        #[source]
        source: DeviceError,
    },
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to create frame wakeup: {0}")]
    Wakeup(#[from] std::io::Error),

    #[error("failed to register frame source: {0}")]
    EventLoop(#[from] calloop::Error),
}
