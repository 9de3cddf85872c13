//! Surface lifecycle management for mounted views.
//!
//! This module provides the registration record kept for every mounted view
//! and the helpers that lease a surface from the device, mirror the view's
//! state onto it, and hand it back on unmount.

use std::collections::HashMap;
use std::rc::Rc;

use crate::device::{DeviceError, GraphicsDevice, Surface};
use crate::observe::Subscription;
use crate::scene::Scene;
use crate::tree::ViewId;

/// A mounted view: its leased surface plus the subscriptions that keep the
/// surface in sync.
///
/// Dropping the registration unsubscribes; the surface itself must be
/// returned with [`release`].
pub struct ManagedSurface<S> {
    /// The surface leased for this view
    pub surface: Rc<S>,
    /// Property and children listeners for this view
    subscriptions: Vec<Subscription>,
}

impl<S> ManagedSurface<S> {
    pub fn new(surface: Rc<S>, subscriptions: Vec<Subscription>) -> Self {
        Self {
            surface,
            subscriptions,
        }
    }
}

/// Registry of mounted views.
pub struct SurfaceManager<S> {
    surfaces: HashMap<ViewId, ManagedSurface<S>>,
}

impl<S> SurfaceManager<S> {
    /// Create a new empty surface manager.
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
        }
    }

    /// Register a mounted view.
    pub fn add(&mut self, view: ViewId, surface: ManagedSurface<S>) {
        self.surfaces.insert(view, surface);
    }

    /// Unregister a view.
    pub fn remove(&mut self, view: ViewId) -> Option<ManagedSurface<S>> {
        self.surfaces.remove(&view)
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.surfaces.contains_key(&view)
    }

    /// Shared handle to a mounted view's surface.
    pub fn surface(&self, view: ViewId) -> Option<Rc<S>> {
        self.surfaces.get(&view).map(|managed| Rc::clone(&managed.surface))
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Unregister everything, returning the registrations.
    pub fn take_all(&mut self) -> Vec<(ViewId, ManagedSurface<S>)> {
        self.surfaces.drain().collect()
    }
}

impl<S> Default for SurfaceManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lease a surface for `view` and initialise it from the view's current
/// state: bounds, transform, z-order, visibility and index in its parent.
///
/// Fresh surfaces start visible, so visibility is only written for hidden
/// views.
pub fn lease<D: GraphicsDevice>(
    device: &D,
    scene: &Scene,
    view: ViewId,
    parent: Option<&D::Surface>,
) -> Result<Rc<D::Surface>, DeviceError> {
    let surface = device.get(view, parent)?;

    if let Some(bounds) = scene.bounds(view) {
        surface.set_bounds(bounds);
    }
    if let Some(transform) = scene.transform(view) {
        surface.set_transform(transform);
    }
    if let Some(z_order) = scene.z_order(view) {
        surface.set_z_order(z_order);
    }
    if !scene.is_visible(view) {
        surface.set_visible(false);
    }
    if let Some(index) = scene.index_in_parent(view) {
        surface.set_index(index);
    }

    Ok(surface)
}

/// Unsubscribe and hand the surface back to the device.
pub fn release<D: GraphicsDevice>(device: &D, view: ViewId, managed: ManagedSurface<D::Surface>) {
    let ManagedSurface {
        surface,
        subscriptions,
    } = managed;
    drop(subscriptions);
    device.release(view, surface);
}
