//! Graphics backend abstraction.
//!
//! The render manager never draws. It leases one [`Surface`] per mounted
//! view from a [`GraphicsDevice`], keeps the surface's geometry in sync with
//! the view, and asks the surface for a drawing pass when the view's content
//! must be repainted.

use std::any::Any;
use std::rc::Rc;

use thiserror::Error;

use crate::geometry::Rect;
use crate::transform::Transform;
use crate::tree::ViewId;

/// Drawing target handed to a view's render hook for one pass.
///
/// Backends expose their concrete canvas through [`Canvas::as_any_mut`] so
/// behaviors written for that backend can downcast to it.
pub trait Canvas: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Backend-side counterpart of one mounted view.
///
/// Setters take `&self`: surfaces are shared through `Rc` and use interior
/// mutability for their state.
pub trait Surface {
    fn set_bounds(&self, bounds: Rect);
    fn set_transform(&self, transform: Transform);
    fn set_z_order(&self, z_order: i32);
    /// Surfaces are visible when leased.
    fn set_visible(&self, visible: bool);
    /// Position among the parent surface's children.
    fn set_index(&self, index: usize);
    /// Open a drawing pass and run `draw` against it.
    fn render(&self, draw: &mut dyn FnMut(&mut dyn Canvas));
}

pub trait GraphicsDevice {
    type Surface: Surface + 'static;

    /// Lease a surface for `view`, nested under `parent` (`None` for direct
    /// children of the display).
    fn get(
        &self,
        view: ViewId,
        parent: Option<&Self::Surface>,
    ) -> Result<Rc<Self::Surface>, DeviceError>;

    /// Return a surface obtained from [`get`](Self::get).
    fn release(&self, view: ViewId, surface: Rc<Self::Surface>);
}

impl<T: GraphicsDevice + ?Sized> GraphicsDevice for Rc<T> {
    type Surface = T::Surface;

    fn get(
        &self,
        view: ViewId,
        parent: Option<&Self::Surface>,
    ) -> Result<Rc<Self::Surface>, DeviceError> {
        (**self).get(view, parent)
    }

    fn release(&self, view: ViewId, surface: Rc<Self::Surface>) {
        (**self).release(view, surface)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("no surface available for view {0:?}")]
    Unavailable(ViewId),
    #[error("surface backend error: {0}")]
    Backend(String),
}
