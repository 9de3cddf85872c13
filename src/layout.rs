//! Layout strategies for containers.
//!
//! A layout positions and sizes a container's children by writing their
//! bounds through the [`Scene`]. The render manager decides *when* a
//! container is laid out; the strategy only decides *where* children go.

use crate::geometry::{Point, Rect, Size};
use crate::scene::Scene;
use crate::tree::ViewId;

pub trait Layout {
    fn layout(&mut self, scene: &Scene, container: ViewId, children: &[ViewId]);
}

impl<F> Layout for F
where
    F: FnMut(&Scene, ViewId, &[ViewId]),
{
    fn layout(&mut self, scene: &Scene, container: ViewId, children: &[ViewId]) {
        self(scene, container, children)
    }
}

/// Stacks children top to bottom, each as wide as the container.
#[derive(Debug, Clone, Copy, Default)]
pub struct Column {
    pub spacing: f32,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }
}

impl Layout for Column {
    fn layout(&mut self, scene: &Scene, container: ViewId, children: &[ViewId]) {
        let width = scene.size(container).unwrap_or_default().width;
        let mut y = 0.0;
        for &child in children {
            if !scene.is_visible(child) {
                continue;
            }
            let height = scene.size(child).unwrap_or_default().height;
            scene.set_bounds(
                child,
                Rect::from_parts(Point::new(0.0, y), Size::new(width, height)),
            );
            y += height + self.spacing;
        }
    }
}

/// Gives every child the container's full area.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fill;

impl Layout for Fill {
    fn layout(&mut self, scene: &Scene, container: ViewId, children: &[ViewId]) {
        let size = scene.size(container).unwrap_or_default();
        for &child in children {
            scene.set_bounds(child, Rect::from_size(size));
        }
    }
}
