//! View behaviors and a builder for configuring new views.

use crate::device::Canvas;
use crate::geometry::{Point, Rect, Size};
use crate::layout::Layout;
use crate::render_manager::DisplayContext;
use crate::scene::Scene;
use crate::transform::Transform;
use crate::tree::{Node, Slot, ViewId};

/// Per-view hooks invoked by the render manager.
///
/// All methods have no-op defaults, so a view only implements what it
/// needs. While a hook runs the behavior is lent out of the scene: the hook
/// may freely mutate the scene, including its own view's properties.
pub trait Behavior {
    /// Draw the view's content. Called only for mounted, visible views with
    /// non-empty bounds.
    fn render(&mut self, scene: &Scene, view: ViewId, canvas: &mut dyn Canvas) {
        let _ = (scene, view, canvas);
    }

    /// The view became part of the display. Called exactly once per mount.
    fn added_to_display(&mut self, scene: &Scene, view: ViewId, context: &DisplayContext) {
        let _ = (scene, view, context);
    }

    /// The view left the display. Called exactly once per unmount.
    fn removed_from_display(&mut self, scene: &Scene, view: ViewId) {
        let _ = (scene, view);
    }
}

/// A view with no content of its own (plain containers).
impl Behavior for () {}

/// Builder for a view's initial state.
///
/// ```ignore
/// let card = ViewBuilder::new()
///     .bounds(Rect::new(0.0, 0.0, 200.0, 100.0))
///     .z_order(2)
///     .behavior(Card::default())
///     .build(&scene);
/// ```
pub struct ViewBuilder {
    bounds: Rect,
    visible: bool,
    transform: Transform,
    z_order: i32,
    behavior: Box<dyn Behavior>,
    layout: Option<Box<dyn Layout>>,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self {
            bounds: Rect::EMPTY,
            visible: true,
            transform: Transform::IDENTITY,
            z_order: 0,
            behavior: Box::new(()),
            layout: None,
        }
    }

    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn position(mut self, position: Point) -> Self {
        self.bounds = self.bounds.with_position(position);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.bounds = self.bounds.with_size(size);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    pub fn layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Some(Box::new(layout));
        self
    }

    /// Insert the view into `scene`, detached.
    pub fn build(self, scene: &Scene) -> ViewId {
        let mut node = Node::new(self.behavior);
        node.bounds = self.bounds;
        node.visible = self.visible;
        node.transform = self.transform;
        node.z_order = self.z_order;
        if let Some(layout) = self.layout {
            node.layout = Slot::Filled(layout);
        }
        scene.insert_node(node)
    }
}

impl Default for ViewBuilder {
    fn default() -> Self {
        Self::new()
    }
}
