pub mod event_loop;
pub mod headless;

pub use event_loop::EventLoopScheduler;
pub use headless::{HeadlessCanvas, HeadlessDevice, HeadlessSurface, SurfaceWrite};
