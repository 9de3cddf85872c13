//! A retained-mode render manager.
//!
//! A [`Scene`](scene::Scene) holds a tree of views rooted at a display. The
//! [`RenderManager`](render_manager::RenderManager) watches that tree and
//! keeps one backend surface per displayed view, batching all resulting
//! work into a single flush per frame.
//!
//! ```ignore
//! let scene = Scene::new(Size::new(800.0, 600.0));
//! let scheduler = Rc::new(ManualScheduler::new());
//! let manager = RenderManager::new(scene.clone(), HeadlessDevice::new(), scheduler.clone());
//!
//! let view = ViewBuilder::new().size(Size::new(100.0, 40.0)).build(&scene);
//! scene.add_child(scene.display(), view)?;
//!
//! scheduler.run_frame();
//! assert!(manager.is_mounted(view));
//! ```

pub mod accessibility;
pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod observe;
pub mod platform;
pub mod render_manager;
pub mod render_stats;
pub mod scene;
pub mod scheduler;
pub mod theme;
pub mod transform;
pub mod tree;
pub mod view;

mod jobs;
mod surface_manager;

pub mod prelude {
    pub use crate::accessibility::AccessibilityManager;
    pub use crate::config::{ReattachPolicy, RenderConfig};
    pub use crate::device::{Canvas, DeviceError, GraphicsDevice, Surface};
    pub use crate::error::{RenderError, SceneError, SchedulerError};
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::layout::{Column, Fill, Layout};
    pub use crate::observe::{ChangeEvent, ChildrenDiff, Streams, Subscription};
    pub use crate::platform::{EventLoopScheduler, HeadlessDevice, HeadlessSurface};
    pub use crate::render_manager::{DisplayContext, FlushStats, RenderHandle, RenderManager};
    pub use crate::scene::Scene;
    pub use crate::scheduler::{AnimationScheduler, ManualScheduler, Task};
    pub use crate::theme::ThemeManager;
    pub use crate::transform::Transform;
    pub use crate::tree::ViewId;
    pub use crate::view::{Behavior, ViewBuilder};
}
