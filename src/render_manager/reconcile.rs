use crate::device::{GraphicsDevice, Surface};
use crate::observe::ChangeEvent;
use crate::tree::ViewId;

use super::{Inner, State};

impl<D: GraphicsDevice + 'static> Inner<D> {
    /// Translate a scene change into surface updates and pending work.
    ///
    /// Surface property writes happen immediately. Everything that calls
    /// back into views (mount, render, layout) is only queued.
    pub(super) fn handle_event(&self, event: &ChangeEvent) {
        let queued = {
            let mut state = self.state.borrow_mut();
            if state.shut_down {
                return;
            }
            self.reconcile(&mut state, event)
        };
        if queued {
            self.request_frame();
        }
    }

    fn reconcile(&self, state: &mut State<D::Surface>, event: &ChangeEvent) -> bool {
        let display = self.scene.display();

        match event {
            ChangeEvent::Visibility { view, new, .. } => {
                let view = *view;
                if let Some(surface) = state.surfaces.surface(view) {
                    surface.set_visible(*new);
                }
                let mut queued = if *new {
                    state.pending.render(view)
                } else {
                    state.pending.cancel_render(view);
                    false
                };
                queued |= state.pending.layout(self.parent_or_display(view));
                queued
            }
            ChangeEvent::Bounds { view, old, new } => {
                let view = *view;
                if let Some(surface) = state.surfaces.surface(view) {
                    surface.set_bounds(*new);
                }
                let mut queued = false;
                if old.size() != new.size() && !new.is_empty() {
                    queued |= state.pending.render(view);
                }
                queued |= state.pending.layout(self.parent_or_display(view));
                queued
            }
            ChangeEvent::Transform { view, new, .. } => {
                if let Some(surface) = state.surfaces.surface(*view) {
                    surface.set_transform(*new);
                }
                false
            }
            ChangeEvent::ZOrder { view, new, .. } => {
                if let Some(surface) = state.surfaces.surface(*view) {
                    surface.set_z_order(*new);
                }
                false
            }
            ChangeEvent::Children { parent, diff } => {
                let parent = *parent;
                let collapse = self.config.reattach.collapses(parent, display);
                let mut queued = false;

                for &(_, child) in &diff.removed {
                    log::trace!("{child:?} removed from {parent:?}");
                    queued |= state.pending.unmount(child, parent);
                }
                for &(_, child) in &diff.added {
                    log::trace!("{child:?} added to {parent:?}");
                    queued |= state.pending.mount(child, parent, collapse);
                }
                if !diff.is_empty() {
                    self.reindex_siblings(state, parent);
                }

                queued |= state.pending.layout(parent);
                queued
            }
            ChangeEvent::DisplaySize { .. } => state.pending.layout(display),
        }
    }

    fn parent_or_display(&self, view: ViewId) -> ViewId {
        self.scene
            .parent(view)
            .unwrap_or_else(|| self.scene.display())
    }

    /// Push current indices to every mounted child of `parent`. Any
    /// insertion, removal or move shifts the siblings around it too, and a
    /// collapsed remove/re-add leaves the child at a new index without a
    /// remount.
    fn reindex_siblings(&self, state: &State<D::Surface>, parent: ViewId) {
        for (index, sibling) in self.scene.children(parent).into_iter().enumerate() {
            if let Some(surface) = state.surfaces.surface(sibling) {
                surface.set_index(index);
            }
        }
    }
}
