//! Change streams for views and the display.
//!
//! Listeners register against a single view and a set of [`Streams`]. The
//! returned [`Subscription`] is the only handle to the registration: dropping
//! it unregisters the listener.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::geometry::{Rect, Size};
use crate::scene::Scene;
use crate::transform::Transform;
use crate::tree::ViewId;

bitflags! {
    /// The observable attributes of a view.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Streams: u8 {
        const BOUNDS     = 0b0000_0001;
        const VISIBILITY = 0b0000_0010;
        const TRANSFORM  = 0b0000_0100;
        const Z_ORDER    = 0b0000_1000;
        /// Insertions, removals and reorders of the view's children
        const CHILDREN   = 0b0001_0000;
        /// Display size (only emitted for the display)
        const SIZE       = 0b0010_0000;

        const PROPERTIES = Self::BOUNDS.bits()
            | Self::VISIBILITY.bits()
            | Self::TRANSFORM.bits()
            | Self::Z_ORDER.bits();
    }
}

/// A child that changed position inside the same parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub view: ViewId,
    pub from: usize,
    pub to: usize,
}

/// Structural change to one parent's children list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChildrenDiff {
    /// `(index before removal, child)`
    pub removed: Vec<(usize, ViewId)>,
    /// `(index after insertion, child)`
    pub added: Vec<(usize, ViewId)>,
    pub moved: Vec<Move>,
}

impl ChildrenDiff {
    pub fn removed(index: usize, view: ViewId) -> Self {
        Self {
            removed: vec![(index, view)],
            ..Self::default()
        }
    }

    pub fn added(index: usize, view: ViewId) -> Self {
        Self {
            added: vec![(index, view)],
            ..Self::default()
        }
    }

    pub fn moved(view: ViewId, from: usize, to: usize) -> Self {
        Self {
            moved: vec![Move { view, from, to }],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.moved.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Bounds {
        view: ViewId,
        old: Rect,
        new: Rect,
    },
    Visibility {
        view: ViewId,
        old: bool,
        new: bool,
    },
    Transform {
        view: ViewId,
        old: Transform,
        new: Transform,
    },
    ZOrder {
        view: ViewId,
        old: i32,
        new: i32,
    },
    Children {
        parent: ViewId,
        diff: ChildrenDiff,
    },
    DisplaySize {
        display: ViewId,
        old: Size,
        new: Size,
    },
}

impl ChangeEvent {
    /// The view whose stream carries this event.
    pub fn source(&self) -> ViewId {
        match self {
            ChangeEvent::Bounds { view, .. }
            | ChangeEvent::Visibility { view, .. }
            | ChangeEvent::Transform { view, .. }
            | ChangeEvent::ZOrder { view, .. } => *view,
            ChangeEvent::Children { parent, .. } => *parent,
            ChangeEvent::DisplaySize { display, .. } => *display,
        }
    }

    pub fn stream(&self) -> Streams {
        match self {
            ChangeEvent::Bounds { .. } => Streams::BOUNDS,
            ChangeEvent::Visibility { .. } => Streams::VISIBILITY,
            ChangeEvent::Transform { .. } => Streams::TRANSFORM,
            ChangeEvent::ZOrder { .. } => Streams::Z_ORDER,
            ChangeEvent::Children { .. } => Streams::CHILDREN,
            ChangeEvent::DisplaySize { .. } => Streams::SIZE,
        }
    }
}

pub type Listener = Rc<dyn Fn(&Scene, &ChangeEvent)>;

struct Entry {
    id: u64,
    streams: Streams,
    listener: Listener,
}

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: HashMap<ViewId, Vec<Entry>>,
}

impl Observers {
    fn add(&mut self, view: ViewId, streams: Streams, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.entry(view).or_default().push(Entry {
            id,
            streams,
            listener,
        });
        id
    }

    fn remove(&mut self, view: ViewId, id: u64) {
        if let Some(entries) = self.entries.get_mut(&view) {
            entries.retain(|entry| entry.id != id);
            if entries.is_empty() {
                self.entries.remove(&view);
            }
        }
    }

    /// Snapshot of the listeners interested in `event`. Callers invoke them
    /// after releasing the borrow so listeners may (un)subscribe freely.
    pub(crate) fn matching(&self, event: &ChangeEvent) -> Vec<Listener> {
        let stream = event.stream();
        self.entries
            .get(&event.source())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.streams.intersects(stream))
                    .map(|entry| Rc::clone(&entry.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, view: ViewId) -> usize {
        self.entries.get(&view).map_or(0, Vec::len)
    }
}

/// Registers `listener` and returns the owning token.
pub(crate) fn subscribe(
    observers: &Rc<RefCell<Observers>>,
    view: ViewId,
    streams: Streams,
    listener: Listener,
) -> Subscription {
    let id = observers.borrow_mut().add(view, streams, listener);
    Subscription {
        observers: Rc::downgrade(observers),
        view,
        id,
    }
}

/// Token for a registered listener. The listener stays registered for as
/// long as the token is alive.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    observers: Weak<RefCell<Observers>>,
    view: ViewId,
    id: u64,
}

impl Subscription {
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Unregister now. Equivalent to dropping the token.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.borrow_mut().remove(self.view, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("view", &self.view)
            .field("id", &self.id)
            .finish()
    }
}
