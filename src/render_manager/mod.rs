//! Keeps leased surfaces in sync with the scene.
//!
//! The render manager observes the display and every mounted view. Handlers
//! only record work; the work runs in one batch per frame, in a fixed order:
//!
//! 1. **Unmount** removed subtrees, children before parents.
//! 2. **Mount** added subtrees, parents before children.
//! 3. **Render** every queued view that is mounted, visible and non-empty.
//! 4. **Layout** every queued container that is still mounted.
//!
//! Every mounted view owns exactly one surface, and `added_to_display` /
//! `removed_from_display` alternate strictly for each view.

mod flush;
mod listeners;
mod reconcile;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::accessibility::AccessibilityManager;
use crate::config::RenderConfig;
use crate::device::{GraphicsDevice, Surface};
use crate::error::RenderError;
use crate::jobs::PendingJobs;
use crate::observe::Subscription;
use crate::scene::Scene;
use crate::scheduler::{AnimationScheduler, Task};
use crate::surface_manager::SurfaceManager;
use crate::theme::ThemeManager;
use crate::tree::ViewId;

pub use flush::FlushStats;

pub struct RenderManager<D: GraphicsDevice + 'static> {
    inner: Rc<Inner<D>>,
}

pub(crate) struct Inner<D: GraphicsDevice> {
    this: Weak<Inner<D>>,
    scene: Scene,
    device: D,
    scheduler: Rc<dyn AnimationScheduler>,
    theme: Option<Rc<dyn ThemeManager>>,
    accessibility: Option<Rc<dyn AccessibilityManager>>,
    config: RenderConfig,
    state: RefCell<State<D::Surface>>,
}

pub(crate) struct State<S> {
    surfaces: SurfaceManager<S>,
    pending: PendingJobs,
    /// The outstanding frame request, if any
    frame: Option<Task>,
    flushing: bool,
    shut_down: bool,
    display_subscriptions: Vec<Subscription>,
}

impl<S> State<S> {
    fn new() -> Self {
        Self {
            surfaces: SurfaceManager::new(),
            pending: PendingJobs::default(),
            frame: None,
            flushing: false,
            shut_down: false,
            display_subscriptions: Vec::new(),
        }
    }
}

pub struct RenderManagerBuilder<D> {
    scene: Scene,
    device: D,
    scheduler: Rc<dyn AnimationScheduler>,
    theme: Option<Rc<dyn ThemeManager>>,
    accessibility: Option<Rc<dyn AccessibilityManager>>,
    config: RenderConfig,
}

impl<D: GraphicsDevice + 'static> RenderManagerBuilder<D> {
    pub fn theme(mut self, theme: Rc<dyn ThemeManager>) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn accessibility(mut self, accessibility: Rc<dyn AccessibilityManager>) -> Self {
        self.accessibility = Some(accessibility);
        self
    }

    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Start observing the scene. The display's current children are
    /// queued for mounting and a frame is requested.
    pub fn build(self) -> RenderManager<D> {
        let inner = Rc::new_cyclic(|this| Inner {
            this: this.clone(),
            scene: self.scene,
            device: self.device,
            scheduler: self.scheduler,
            theme: self.theme,
            accessibility: self.accessibility,
            config: self.config,
            state: RefCell::new(State::new()),
        });

        let display = inner.scene.display();
        let subscriptions = inner.watch_display();
        let queued = {
            let mut state = inner.state.borrow_mut();
            state.display_subscriptions = subscriptions;
            let mut queued = false;
            for child in inner.scene.children(display) {
                queued |= state.pending.mount(child, display, false);
            }
            queued
        };
        if queued {
            inner.request_frame();
        }

        log::debug!("render manager attached to display {display:?}");
        RenderManager { inner }
    }
}

impl<D: GraphicsDevice + 'static> RenderManager<D> {
    pub fn new(scene: Scene, device: D, scheduler: Rc<dyn AnimationScheduler>) -> Self {
        Self::builder(scene, device, scheduler).build()
    }

    pub fn builder(
        scene: Scene,
        device: D,
        scheduler: Rc<dyn AnimationScheduler>,
    ) -> RenderManagerBuilder<D> {
        RenderManagerBuilder {
            scene,
            device,
            scheduler,
            theme: None,
            accessibility: None,
            config: RenderConfig::default(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.inner.scene
    }

    pub fn device(&self) -> &D {
        &self.inner.device
    }

    pub fn config(&self) -> &RenderConfig {
        &self.inner.config
    }

    /// Queue a repaint of a mounted view for the next frame. Ignored for
    /// views that are not mounted.
    pub fn render(&self, view: ViewId) {
        self.inner.render(view);
    }

    /// Repaint a mounted, visible, non-empty view right away. Returns
    /// whether a drawing pass happened.
    pub fn render_now(&self, view: ViewId) -> bool {
        self.inner.render_now(view)
    }

    /// Run all pending work now instead of waiting for the frame.
    ///
    /// The whole batch always runs. If the device refused any surfaces, the
    /// first such error is returned afterwards.
    pub fn flush(&self) -> Result<FlushStats, RenderError> {
        self.inner.flush()
    }

    pub fn is_mounted(&self, view: ViewId) -> bool {
        self.inner.is_mounted(view)
    }

    /// The surface leased for a mounted view.
    pub fn surface(&self, view: ViewId) -> Option<Rc<D::Surface>> {
        self.inner.state.borrow().surfaces.surface(view)
    }

    pub fn mounted_count(&self) -> usize {
        self.inner.state.borrow().surfaces.len()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.inner.state.borrow().pending.is_empty()
    }

    /// Whether a frame has been requested and has not run yet.
    pub fn frame_requested(&self) -> bool {
        self.inner
            .state
            .borrow()
            .frame
            .as_ref()
            .is_some_and(|task| !task.is_completed())
    }

    /// A weak handle for views to request repaints with.
    pub fn handle(&self) -> RenderHandle {
        self.inner.handle()
    }

    /// Stop observing the scene and return every surface to the device.
    ///
    /// Lifecycle hooks are not called. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl<D: GraphicsDevice + 'static> Drop for RenderManager<D> {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl<D: GraphicsDevice + 'static> Inner<D> {
    fn is_registered(&self, view: ViewId) -> bool {
        self.state.borrow().surfaces.contains(view)
    }

    fn is_mounted(&self, view: ViewId) -> bool {
        self.is_registered(view)
    }

    fn render(&self, view: ViewId) {
        let queued = {
            let mut state = self.state.borrow_mut();
            !state.shut_down && state.surfaces.contains(view) && state.pending.render(view)
        };
        if queued {
            self.request_frame();
        }
    }

    fn render_now(&self, view: ViewId) -> bool {
        let surface = self.state.borrow().surfaces.surface(view);
        let Some(surface) = surface else {
            return false;
        };
        let paintable = self.scene.is_visible(view)
            && self.scene.bounds(view).is_some_and(|bounds| !bounds.is_empty());
        if !paintable {
            return false;
        }

        let scene = &self.scene;
        surface.render(&mut |canvas| {
            scene.render(view, canvas);
        });
        true
    }

    /// Ask the scheduler for a frame unless one is already outstanding.
    fn request_frame(&self) {
        {
            let state = self.state.borrow();
            if state.shut_down {
                return;
            }
            if state.frame.as_ref().is_some_and(|task| !task.is_completed()) {
                return;
            }
        }

        let this = self.this.clone();
        let task = self.scheduler.on_next_frame(Box::new(move |_| {
            let Some(inner) = this.upgrade() else {
                return;
            };
            if let Err(err) = inner.flush() {
                log::error!("frame flush failed: {err}");
            }
        }));
        self.state.borrow_mut().frame = Some(task);
    }

    fn handle(&self) -> RenderHandle {
        let inner: Weak<dyn RenderRequests> = self.this.clone();
        RenderHandle { inner }
    }

    fn display_context(&self) -> DisplayContext {
        DisplayContext {
            display: self.scene.display(),
            render_manager: self.handle(),
            accessibility: self.accessibility.clone(),
        }
    }

    fn shutdown(&self) {
        let (frame, subscriptions, registrations) = {
            let mut state = self.state.borrow_mut();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.pending = PendingJobs::default();
            (
                state.frame.take(),
                std::mem::take(&mut state.display_subscriptions),
                state.surfaces.take_all(),
            )
        };

        if let Some(frame) = frame {
            frame.cancel();
        }
        drop(subscriptions);
        let released = registrations.len();
        for (view, managed) in registrations {
            crate::surface_manager::release(&self.device, view, managed);
        }
        log::debug!("render manager shut down, released {released} surfaces");
    }
}

/// Object-safe view of a render manager, used by [`RenderHandle`].
trait RenderRequests {
    fn render(&self, view: ViewId);
    fn render_now(&self, view: ViewId) -> bool;
    fn is_mounted(&self, view: ViewId) -> bool;
}

impl<D: GraphicsDevice + 'static> RenderRequests for Inner<D> {
    fn render(&self, view: ViewId) {
        Inner::render(self, view)
    }

    fn render_now(&self, view: ViewId) -> bool {
        Inner::render_now(self, view)
    }

    fn is_mounted(&self, view: ViewId) -> bool {
        Inner::is_mounted(self, view)
    }
}

/// Weak handle to a render manager. All calls are no-ops once the manager
/// is gone.
#[derive(Clone)]
pub struct RenderHandle {
    inner: Weak<dyn RenderRequests>,
}

impl RenderHandle {
    pub fn render(&self, view: ViewId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.render(view);
        }
    }

    pub fn render_now(&self, view: ViewId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.render_now(view))
    }

    pub fn is_mounted(&self, view: ViewId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.is_mounted(view))
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Passed to a view's `added_to_display` hook.
pub struct DisplayContext {
    display: ViewId,
    render_manager: RenderHandle,
    accessibility: Option<Rc<dyn AccessibilityManager>>,
}

impl DisplayContext {
    pub fn display(&self) -> ViewId {
        self.display
    }

    /// Handle for requesting repaints of this or any other mounted view.
    pub fn render_manager(&self) -> &RenderHandle {
        &self.render_manager
    }

    pub fn accessibility(&self) -> Option<&dyn AccessibilityManager> {
        self.accessibility.as_deref()
    }
}
