use std::cell::RefCell;

use crate::device::GraphicsDevice;
use crate::error::RenderError;
use crate::jobs::PendingJobs;
use crate::render_stats;
use crate::surface_manager::{self, ManagedSurface};
use crate::tree::ViewId;

use super::{Inner, State};

/// What one flush did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub unmounted: usize,
    pub mounted: usize,
    pub rendered: usize,
    /// Queued renders dropped because the view was unmounted, hidden or empty
    pub skipped_renders: usize,
    pub laid_out: usize,
}

impl FlushStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Clears the `flushing` flag however the flush ends.
struct FlushGuard<'a, S> {
    state: &'a RefCell<State<S>>,
}

impl<S> Drop for FlushGuard<'_, S> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.flushing = false;
        }
    }
}

impl<D: GraphicsDevice + 'static> Inner<D> {
    pub(super) fn flush(&self) -> Result<FlushStats, RenderError> {
        let mut batch = {
            let mut state = self.state.borrow_mut();
            if state.shut_down {
                return Ok(FlushStats::default());
            }
            if state.flushing {
                log::warn!("flush requested while flushing, deferring to the next frame");
                return Ok(FlushStats::default());
            }
            state.flushing = true;
            if let Some(frame) = state.frame.take() {
                frame.cancel();
            }
            std::mem::take(&mut state.pending)
        };
        let _guard = FlushGuard { state: &self.state };

        let mut stats = FlushStats::default();
        let mut errors = Vec::new();

        for (view, _origin) in batch.unmounts.drain() {
            self.unmount_subtree(view, &mut stats);
        }

        for (view, _target) in batch.mounts.drain() {
            self.mount_subtree(view, &mut batch, &mut stats, &mut errors);
        }

        for (view, ()) in batch.renders.drain() {
            if self.render_now(view) {
                stats.rendered += 1;
            } else {
                stats.skipped_renders += 1;
            }
        }

        let display = self.scene.display();
        for (container, ()) in batch.layouts.drain() {
            let live = container == display || self.is_registered(container);
            if live && self.scene.do_layout(container) {
                stats.laid_out += 1;
            }
        }

        log::debug!(
            "flush: unmounted={} mounted={} rendered={} skipped={} laid_out={}",
            stats.unmounted,
            stats.mounted,
            stats.rendered,
            stats.skipped_renders,
            stats.laid_out
        );
        render_stats::end_flush(&stats);

        let mut errors = errors.into_iter();
        match errors.next() {
            Some(first) => {
                for err in errors {
                    log::error!("{err}");
                }
                Err(first)
            }
            None => Ok(stats),
        }
    }

    /// Tear down `view` and its current descendants, children first.
    fn unmount_subtree(&self, view: ViewId, stats: &mut FlushStats) {
        if !self.is_registered(view) {
            return;
        }
        for node in self.scene.subtree(view).into_iter().rev() {
            self.unmount_one(node, stats);
        }
    }

    fn unmount_one(&self, view: ViewId, stats: &mut FlushStats) {
        let managed = self.state.borrow_mut().surfaces.remove(view);
        let Some(managed) = managed else {
            return;
        };

        surface_manager::release(&self.device, view, managed);
        if let Some(accessibility) = &self.accessibility {
            accessibility.view_unmounted(view);
        }
        self.scene.removed_from_display(view);

        stats.unmounted += 1;
        log::trace!("unmounted {view:?}");
    }

    /// Mount `view` and its current descendants, parents first.
    ///
    /// If an ancestor below the display is not mounted either, the walk
    /// starts from the topmost such ancestor so that every surface is
    /// leased under its parent's surface.
    fn mount_subtree(
        &self,
        view: ViewId,
        batch: &mut PendingJobs,
        stats: &mut FlushStats,
        errors: &mut Vec<RenderError>,
    ) {
        let display = self.scene.display();
        if view == display || !self.scene.is_attached(view) || self.is_registered(view) {
            return;
        }

        let mut root = view;
        while let Some(parent) = self.scene.parent(root) {
            if parent == display || self.is_registered(parent) {
                break;
            }
            root = parent;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.is_registered(node) || !self.is_mountable(node) {
                continue;
            }
            match self.mount_one(node, batch) {
                Ok(children) => {
                    stats.mounted += 1;
                    stack.extend(children.into_iter().rev());
                }
                Err(err) => {
                    log::warn!("{err}, skipping its subtree");
                    render_stats::record_lease_failure();
                    errors.push(err);
                }
            }
        }
    }

    /// Whether `view` is still reachable from the display with a parent that
    /// is the display or already mounted. A hook run earlier in the walk may
    /// have detached it.
    fn is_mountable(&self, view: ViewId) -> bool {
        let display = self.scene.display();
        match self.scene.parent(view) {
            Some(parent) => {
                (parent == display || self.is_registered(parent)) && self.scene.is_attached(view)
            }
            None => false,
        }
    }

    /// Mount a single view. Returns its children as they were before any
    /// hook ran; children added by hooks are mounted by the next flush.
    fn mount_one(
        &self,
        view: ViewId,
        batch: &mut PendingJobs,
    ) -> Result<Vec<ViewId>, RenderError> {
        let display = self.scene.display();
        let parent_surface = self
            .scene
            .parent(view)
            .filter(|&parent| parent != display)
            .and_then(|parent| self.state.borrow().surfaces.surface(parent));

        let surface = surface_manager::lease(
            &self.device,
            &self.scene,
            view,
            parent_surface.as_deref(),
        )
        .map_err(|source| RenderError::SurfaceLease { view, source })?;

        // Registered before any hook runs, so hooks see the view as mounted
        // and changes they make are reconciled.
        let subscriptions = self.watch_view(view);
        self.state
            .borrow_mut()
            .surfaces
            .add(view, ManagedSurface::new(surface, subscriptions));
        let children = self.scene.children(view);

        if let Some(theme) = &self.theme {
            theme.update(&self.scene, view);
        }
        if let Some(accessibility) = &self.accessibility {
            accessibility.view_mounted(view);
        }
        let context = self.display_context();
        self.scene.added_to_display(view, &context);

        batch.render(view);
        if !children.is_empty() {
            batch.layout(view);
        }

        log::trace!("mounted {view:?}");
        Ok(children)
    }
}
