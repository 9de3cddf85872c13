//! An in-memory graphics device.
//!
//! Surfaces record every write they receive and count drawing passes, which
//! makes the device suitable for tests and for running the render manager
//! without a compositor.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::device::{Canvas, DeviceError, GraphicsDevice, Surface};
use crate::geometry::Rect;
use crate::transform::Transform;
use crate::tree::ViewId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceWrite {
    Bounds(Rect),
    Transform(Transform),
    ZOrder(i32),
    Visible(bool),
    Index(usize),
}

#[derive(Debug)]
pub struct HeadlessSurface {
    view: ViewId,
    parent: Option<ViewId>,
    bounds: Cell<Rect>,
    transform: Cell<Transform>,
    z_order: Cell<i32>,
    visible: Cell<bool>,
    index: Cell<usize>,
    renders: Cell<usize>,
    writes: RefCell<Vec<SurfaceWrite>>,
}

impl HeadlessSurface {
    fn new(view: ViewId, parent: Option<ViewId>) -> Self {
        Self {
            view,
            parent,
            bounds: Cell::new(Rect::EMPTY),
            transform: Cell::new(Transform::IDENTITY),
            z_order: Cell::new(0),
            visible: Cell::new(true),
            index: Cell::new(0),
            renders: Cell::new(0),
            writes: RefCell::new(Vec::new()),
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    /// View owning the surface this one was nested under.
    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn bounds(&self) -> Rect {
        self.bounds.get()
    }

    pub fn transform(&self) -> Transform {
        self.transform.get()
    }

    pub fn z_order(&self) -> i32 {
        self.z_order.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn index(&self) -> usize {
        self.index.get()
    }

    pub fn render_count(&self) -> usize {
        self.renders.get()
    }

    pub fn writes(&self) -> Vec<SurfaceWrite> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    fn record(&self, write: SurfaceWrite) {
        self.writes.borrow_mut().push(write);
    }
}

impl Surface for HeadlessSurface {
    fn set_bounds(&self, bounds: Rect) {
        self.bounds.set(bounds);
        self.record(SurfaceWrite::Bounds(bounds));
    }

    fn set_transform(&self, transform: Transform) {
        self.transform.set(transform);
        self.record(SurfaceWrite::Transform(transform));
    }

    fn set_z_order(&self, z_order: i32) {
        self.z_order.set(z_order);
        self.record(SurfaceWrite::ZOrder(z_order));
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
        self.record(SurfaceWrite::Visible(visible));
    }

    fn set_index(&self, index: usize) {
        self.index.set(index);
        self.record(SurfaceWrite::Index(index));
    }

    fn render(&self, draw: &mut dyn FnMut(&mut dyn Canvas)) {
        self.renders.set(self.renders.get() + 1);
        let mut canvas = HeadlessCanvas {
            view: self.view,
            bounds: self.bounds.get(),
        };
        draw(&mut canvas);
    }
}

/// Canvas handed to behaviors by [`HeadlessSurface::render`].
#[derive(Debug, Clone, Copy)]
pub struct HeadlessCanvas {
    pub view: ViewId,
    pub bounds: Rect,
}

impl Canvas for HeadlessCanvas {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    live: RefCell<HashMap<ViewId, Rc<HeadlessSurface>>>,
    refused: RefCell<HashSet<ViewId>>,
    leased: Cell<usize>,
    released: Cell<usize>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future lease for `view` fail.
    pub fn refuse(&self, view: ViewId) {
        self.refused.borrow_mut().insert(view);
    }

    pub fn allow(&self, view: ViewId) {
        self.refused.borrow_mut().remove(&view);
    }

    /// The surface currently leased for `view`.
    pub fn surface(&self, view: ViewId) -> Option<Rc<HeadlessSurface>> {
        self.live.borrow().get(&view).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn leased_count(&self) -> usize {
        self.leased.get()
    }

    pub fn released_count(&self) -> usize {
        self.released.get()
    }
}

impl GraphicsDevice for HeadlessDevice {
    type Surface = HeadlessSurface;

    fn get(
        &self,
        view: ViewId,
        parent: Option<&HeadlessSurface>,
    ) -> Result<Rc<HeadlessSurface>, DeviceError> {
        if self.refused.borrow().contains(&view) {
            return Err(DeviceError::Unavailable(view));
        }
        let surface = Rc::new(HeadlessSurface::new(view, parent.map(HeadlessSurface::view)));
        self.live.borrow_mut().insert(view, Rc::clone(&surface));
        self.leased.set(self.leased.get() + 1);
        Ok(surface)
    }

    fn release(&self, view: ViewId, surface: Rc<HeadlessSurface>) {
        let mut live = self.live.borrow_mut();
        if live.get(&view).is_some_and(|current| Rc::ptr_eq(current, &surface)) {
            live.remove(&view);
        }
        self.released.set(self.released.get() + 1);
    }
}
