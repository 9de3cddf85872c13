//! Arena storage for the view tree.
//!
//! Views are addressed by generational [`ViewId`]s. A slot freed by
//! [`Tree::remove_subtree`] is reused with a bumped generation, so stale ids
//! never resolve to the view that took their place. Every tree also carries
//! a tag of its own, so an id from one scene never resolves in another.
//!
//! Parent/child links are ids, so the tree never holds references into
//! itself and a child's `parent` always names the single node whose
//! `children` list contains it.
//!
//! Behaviors and layouts are stored in [`Slot`]s so that the scene can lend
//! them out while a callback runs. The callback is then free to mutate the
//! tree (including its own node) without aliasing the boxed object that is
//! executing.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::geometry::Rect;
use crate::layout::Layout;
use crate::transform::Transform;
use crate::view::Behavior;

static NEXT_TREE_TAG: AtomicU32 = AtomicU32::new(0);

/// Identity of a view within a [`Scene`](crate::scene::Scene).
///
/// - `index`: position in the arena, reused after the view is destroyed
/// - `generation`: bumped every time the slot is reused
/// - `tree`: tag of the owning tree
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ViewId {
    tree: u32,
    index: u32,
    generation: u32,
}

impl ViewId {
    /// Stable numeric form, e.g. for backend element ids. Combines the
    /// generation (high bits) with the index (low bits).
    pub fn as_u64(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }
}

/// Storage for an object that can be lent out while it runs.
pub(crate) enum Slot<T> {
    Vacant,
    Filled(T),
    Lent,
}

impl<T> Slot<T> {
    /// Take the value out, leaving the slot marked as lent.
    /// Returns `None` when the slot is empty or already lent.
    pub(crate) fn lend(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Lent) {
            Slot::Filled(value) => Some(value),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Return a lent value. If the slot was overwritten while the value was
    /// out, the newer content wins and `value` is dropped.
    pub(crate) fn give_back(&mut self, value: T) {
        if matches!(self, Slot::Lent) {
            *self = Slot::Filled(value);
        }
    }

    pub(crate) fn replace(&mut self, value: Option<T>) {
        *self = match value {
            Some(value) => Slot::Filled(value),
            None => Slot::Vacant,
        };
    }

    pub(crate) fn is_vacant(&self) -> bool {
        matches!(self, Slot::Vacant)
    }
}

pub(crate) struct Node {
    pub(crate) bounds: Rect,
    pub(crate) visible: bool,
    pub(crate) transform: Transform,
    pub(crate) z_order: i32,
    pub(crate) parent: Option<ViewId>,
    pub(crate) children: Vec<ViewId>,
    pub(crate) behavior: Slot<Box<dyn Behavior>>,
    pub(crate) layout: Slot<Box<dyn Layout>>,
}

impl Node {
    pub(crate) fn new(behavior: Box<dyn Behavior>) -> Self {
        Self {
            bounds: Rect::EMPTY,
            visible: true,
            transform: Transform::IDENTITY,
            z_order: 0,
            parent: None,
            children: Vec::new(),
            behavior: Slot::Filled(behavior),
            layout: Slot::Vacant,
        }
    }
}

struct Entry {
    generation: u32,
    node: Option<Node>,
}

pub(crate) struct Tree {
    tag: u32,
    entries: Vec<Entry>,
    /// Indices of vacant entries, reused before the arena grows
    free_indices: Vec<u32>,
    len: usize,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self {
            tag: NEXT_TREE_TAG.fetch_add(1, Ordering::Relaxed),
            entries: Vec::new(),
            free_indices: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, node: Node) -> ViewId {
        self.len += 1;
        if let Some(index) = self.free_indices.pop() {
            let entry = &mut self.entries[index as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.node = Some(node);
            return ViewId {
                tree: self.tag,
                index,
                generation: entry.generation,
            };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            node: Some(node),
        });
        ViewId {
            tree: self.tag,
            index,
            generation: 0,
        }
    }

    /// Remove `id` and all of its descendants, returning the nodes so the
    /// caller can drop them once the tree is no longer borrowed. `id` is
    /// detached from its parent first.
    pub(crate) fn remove_subtree(&mut self, id: ViewId) -> Vec<Node> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);

        let mut removed = Vec::new();
        for view in self.subtree(id) {
            let entry = &mut self.entries[view.index as usize];
            if let Some(node) = entry.node.take() {
                removed.push(node);
                self.free_indices.push(view.index);
                self.len -= 1;
            }
        }
        removed
    }

    pub(crate) fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: ViewId) -> Option<&Node> {
        if id.tree != self.tag {
            return None;
        }
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ViewId) -> Option<&mut Node> {
        if id.tree != self.tag {
            return None;
        }
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.node.as_mut())
    }

    pub(crate) fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub(crate) fn children(&self, id: ViewId) -> &[ViewId] {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn index_in_parent(&self, id: ViewId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Whether `ancestor` is `id` itself or lies on its parent chain.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: ViewId, id: ViewId) -> bool {
        let mut current = Some(id);
        while let Some(view) = current {
            if view == ancestor {
                return true;
            }
            current = self.parent(view);
        }
        false
    }

    /// Link `child` under `parent` at `index`. The child must be detached.
    pub(crate) fn attach(&mut self, parent: ViewId, child: ViewId, index: usize) {
        debug_assert!(self.parent(child).is_none());
        if let Some(node) = self.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Unlink `child` from its parent, returning the old parent and index.
    pub(crate) fn detach(&mut self, child: ViewId) -> Option<(ViewId, usize)> {
        let parent = self.get_mut(child)?.parent.take()?;
        let node = self.get_mut(parent)?;
        let index = node.children.iter().position(|&c| c == child)?;
        node.children.remove(index);
        Some((parent, index))
    }

    /// Move `child` to position `to` among its siblings. Returns the old index.
    pub(crate) fn reorder(&mut self, parent: ViewId, child: ViewId, to: usize) -> Option<usize> {
        let node = self.get_mut(parent)?;
        let from = node.children.iter().position(|&c| c == child)?;
        node.children.remove(from);
        let to = to.min(node.children.len());
        node.children.insert(to, child);
        Some(from)
    }

    /// `id` followed by all of its descendants, pre-order.
    pub(crate) fn subtree(&self, id: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(view) = stack.pop() {
            out.push(view);
            stack.extend(self.children(view).iter().rev().copied());
        }
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
