//! Subscriptions that feed scene changes into the reconciler.

use crate::device::GraphicsDevice;
use crate::observe::{Streams, Subscription};
use crate::tree::ViewId;

use super::Inner;

impl<D: GraphicsDevice + 'static> Inner<D> {
    /// Top-level children and display size.
    pub(super) fn watch_display(&self) -> Vec<Subscription> {
        let display = self.scene.display();
        vec![self.forward(display, Streams::CHILDREN | Streams::SIZE)]
    }

    /// Geometry and visibility of a mounted view, plus its children.
    pub(super) fn watch_view(&self, view: ViewId) -> Vec<Subscription> {
        vec![
            self.forward(view, Streams::PROPERTIES),
            self.forward(view, Streams::CHILDREN),
        ]
    }

    fn forward(&self, view: ViewId, streams: Streams) -> Subscription {
        let this = self.this.clone();
        self.scene.subscribe(view, streams, move |_, event| {
            if let Some(inner) = this.upgrade() {
                inner.handle_event(event);
            }
        })
    }
}
