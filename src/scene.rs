//! The shared, observable view tree.
//!
//! A [`Scene`] is a cheap clonable handle. All mutation goes through it so
//! that every structural or property change is reported to subscribers
//! after the tree borrow has been released. Listeners are therefore free to
//! read or mutate the scene from inside a notification.

use std::cell::RefCell;
use std::rc::Rc;

use crate::device::Canvas;
use crate::error::SceneError;
use crate::geometry::{Point, Rect, Size};
use crate::layout::Layout;
use crate::observe::{self, ChangeEvent, ChildrenDiff, Observers, Streams, Subscription};
use crate::render_manager::DisplayContext;
use crate::transform::Transform;
use crate::tree::{Node, Tree, ViewId};
use crate::view::Behavior;

struct SceneInner {
    tree: RefCell<Tree>,
    observers: Rc<RefCell<Observers>>,
    display: ViewId,
}

#[derive(Clone)]
pub struct Scene {
    inner: Rc<SceneInner>,
}

impl Scene {
    /// Create a scene whose display has the given size.
    pub fn new(display_size: Size) -> Self {
        let mut tree = Tree::new();
        let mut root = Node::new(Box::new(()));
        root.bounds = Rect::from_size(display_size);
        let display = tree.insert(root);

        Self {
            inner: Rc::new(SceneInner {
                tree: RefCell::new(tree),
                observers: Rc::new(RefCell::new(Observers::default())),
                display,
            }),
        }
    }

    /// The root of the visible tree.
    pub fn display(&self) -> ViewId {
        self.inner.display
    }

    /// Create a detached view with empty bounds.
    pub fn create_view(&self, behavior: impl Behavior + 'static) -> ViewId {
        self.insert_node(Node::new(Box::new(behavior)))
    }

    pub(crate) fn insert_node(&self, node: Node) -> ViewId {
        self.inner.tree.borrow_mut().insert(node)
    }

    pub fn ptr_eq(&self, other: &Scene) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn contains(&self, view: ViewId) -> bool {
        self.inner.tree.borrow().contains(view)
    }

    pub fn bounds(&self, view: ViewId) -> Option<Rect> {
        self.inner.tree.borrow().get(view).map(|node| node.bounds)
    }

    pub fn size(&self, view: ViewId) -> Option<Size> {
        self.bounds(view).map(|bounds| bounds.size())
    }

    /// Unknown views report invisible.
    pub fn is_visible(&self, view: ViewId) -> bool {
        self.inner
            .tree
            .borrow()
            .get(view)
            .is_some_and(|node| node.visible)
    }

    pub fn transform(&self, view: ViewId) -> Option<Transform> {
        self.inner.tree.borrow().get(view).map(|node| node.transform)
    }

    pub fn z_order(&self, view: ViewId) -> Option<i32> {
        self.inner.tree.borrow().get(view).map(|node| node.z_order)
    }

    pub fn parent(&self, view: ViewId) -> Option<ViewId> {
        self.inner.tree.borrow().parent(view)
    }

    pub fn children(&self, view: ViewId) -> Vec<ViewId> {
        self.inner.tree.borrow().children(view).to_vec()
    }

    pub fn index_in_parent(&self, view: ViewId) -> Option<usize> {
        self.inner.tree.borrow().index_in_parent(view)
    }

    /// `view` and all its descendants, pre-order.
    pub fn subtree(&self, view: ViewId) -> Vec<ViewId> {
        self.inner.tree.borrow().subtree(view)
    }

    /// Whether the display is reachable from `view` through parent links.
    pub fn is_attached(&self, view: ViewId) -> bool {
        self.inner
            .tree
            .borrow()
            .is_ancestor_or_self(self.inner.display, view)
    }

    pub fn has_layout(&self, view: ViewId) -> bool {
        self.inner
            .tree
            .borrow()
            .get(view)
            .is_some_and(|node| !node.layout.is_vacant())
    }

    pub fn display_size(&self) -> Size {
        self.size(self.inner.display).unwrap_or_default()
    }

    pub fn view_count(&self) -> usize {
        self.inner.tree.borrow().len()
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Append `child` to `parent`. A child that already has a parent is
    /// removed from it first; re-adding to the same parent moves it to the end.
    pub fn add_child(&self, parent: ViewId, child: ViewId) -> Result<(), SceneError> {
        let end = self.inner.tree.borrow().children(parent).len();
        self.insert_child(parent, end, child)
    }

    pub fn insert_child(
        &self,
        parent: ViewId,
        index: usize,
        child: ViewId,
    ) -> Result<(), SceneError> {
        let previous = {
            let tree = self.inner.tree.borrow();
            self.check_known(&tree, parent)?;
            self.check_known(&tree, child)?;
            if child == self.inner.display {
                return Err(SceneError::DisplayAsChild);
            }
            if tree.is_ancestor_or_self(child, parent) {
                return Err(SceneError::Cycle { parent, child });
            }
            tree.parent(child)
        };

        if previous == Some(parent) {
            let len = self.inner.tree.borrow().children(parent).len();
            return self.move_child(parent, child, index.min(len.saturating_sub(1)));
        }

        let len = self.inner.tree.borrow().children(parent).len();
        if index > len {
            return Err(SceneError::IndexOutOfBounds { index, len });
        }

        if previous.is_some() {
            let detached = self.inner.tree.borrow_mut().detach(child);
            if let Some((old_parent, old_index)) = detached {
                self.emit(ChangeEvent::Children {
                    parent: old_parent,
                    diff: ChildrenDiff::removed(old_index, child),
                });
            }
        }

        // A listener of the old parent may have rearranged the tree.
        let index = {
            let mut tree = self.inner.tree.borrow_mut();
            if let Some(current) = tree.parent(child) {
                return Err(SceneError::Reparented {
                    parent: current,
                    child,
                });
            }
            for view in [parent, child] {
                self.check_known(&tree, view)?;
            }
            if tree.is_ancestor_or_self(child, parent) {
                return Err(SceneError::Cycle { parent, child });
            }
            let index = index.min(tree.children(parent).len());
            tree.attach(parent, child, index);
            index
        };

        self.emit(ChangeEvent::Children {
            parent,
            diff: ChildrenDiff::added(index, child),
        });
        Ok(())
    }

    pub fn remove_child(&self, parent: ViewId, child: ViewId) -> Result<(), SceneError> {
        let detached = {
            let mut tree = self.inner.tree.borrow_mut();
            self.check_known(&tree, parent)?;
            self.check_known(&tree, child)?;
            if tree.parent(child) != Some(parent) {
                return Err(SceneError::NotAChild { parent, child });
            }
            tree.detach(child)
        };

        if let Some((parent, index)) = detached {
            self.emit(ChangeEvent::Children {
                parent,
                diff: ChildrenDiff::removed(index, child),
            });
        }
        Ok(())
    }

    /// Destroy a detached view together with its descendants.
    ///
    /// The ids become stale and are never handed out again. Views that are
    /// still attached, or still observed (a mounted view stays observed
    /// until the render manager has flushed its removal), are rejected.
    pub fn destroy_view(&self, view: ViewId) -> Result<(), SceneError> {
        let removed = {
            let mut tree = self.inner.tree.borrow_mut();
            self.check_known(&tree, view)?;
            if view == self.inner.display || tree.parent(view).is_some() {
                return Err(SceneError::Attached(view));
            }
            let observers = self.inner.observers.borrow();
            if let Some(observed) = tree
                .subtree(view)
                .into_iter()
                .find(|&node| observers.count(node) > 0)
            {
                return Err(SceneError::Observed(observed));
            }
            drop(observers);
            tree.remove_subtree(view)
        };

        log::trace!("destroyed {view:?} and {} descendants", removed.len().saturating_sub(1));
        drop(removed);
        Ok(())
    }

    /// Remove every child of `parent`, last first.
    pub fn clear_children(&self, parent: ViewId) -> Result<(), SceneError> {
        for child in self.children(parent).into_iter().rev() {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    /// Reorder `child` within `parent` without detaching it.
    pub fn move_child(&self, parent: ViewId, child: ViewId, index: usize) -> Result<(), SceneError> {
        let from = {
            let mut tree = self.inner.tree.borrow_mut();
            self.check_known(&tree, parent)?;
            self.check_known(&tree, child)?;
            if tree.parent(child) != Some(parent) {
                return Err(SceneError::NotAChild { parent, child });
            }
            let len = tree.children(parent).len();
            if index >= len {
                return Err(SceneError::IndexOutOfBounds { index, len });
            }
            tree.reorder(parent, child, index)
        };

        if let Some(from) = from {
            if from != index {
                self.emit(ChangeEvent::Children {
                    parent,
                    diff: ChildrenDiff::moved(child, from, index),
                });
            }
        }
        Ok(())
    }

    fn check_known(&self, tree: &Tree, view: ViewId) -> Result<(), SceneError> {
        if tree.contains(view) {
            Ok(())
        } else {
            Err(SceneError::UnknownView(view))
        }
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    /// Setting the display's bounds changes the display size.
    pub fn set_bounds(&self, view: ViewId, bounds: Rect) {
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let Some(node) = tree.get_mut(view) else {
                return;
            };
            if node.bounds == bounds {
                return;
            }
            std::mem::replace(&mut node.bounds, bounds)
        };

        if view == self.inner.display {
            if old.size() != bounds.size() {
                self.emit(ChangeEvent::DisplaySize {
                    display: view,
                    old: old.size(),
                    new: bounds.size(),
                });
            }
        } else {
            self.emit(ChangeEvent::Bounds {
                view,
                old,
                new: bounds,
            });
        }
    }

    pub fn set_position(&self, view: ViewId, position: Point) {
        if let Some(bounds) = self.bounds(view) {
            self.set_bounds(view, bounds.with_position(position));
        }
    }

    pub fn set_size(&self, view: ViewId, size: Size) {
        if let Some(bounds) = self.bounds(view) {
            self.set_bounds(view, bounds.with_size(size));
        }
    }

    pub fn set_display_size(&self, size: Size) {
        self.set_size(self.inner.display, size);
    }

    pub fn set_visible(&self, view: ViewId, visible: bool) {
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let Some(node) = tree.get_mut(view) else {
                return;
            };
            if node.visible == visible {
                return;
            }
            std::mem::replace(&mut node.visible, visible)
        };
        self.emit(ChangeEvent::Visibility {
            view,
            old,
            new: visible,
        });
    }

    pub fn set_transform(&self, view: ViewId, transform: Transform) {
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let Some(node) = tree.get_mut(view) else {
                return;
            };
            if node.transform == transform {
                return;
            }
            std::mem::replace(&mut node.transform, transform)
        };
        self.emit(ChangeEvent::Transform {
            view,
            old,
            new: transform,
        });
    }

    pub fn set_z_order(&self, view: ViewId, z_order: i32) {
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let Some(node) = tree.get_mut(view) else {
                return;
            };
            if node.z_order == z_order {
                return;
            }
            std::mem::replace(&mut node.z_order, z_order)
        };
        self.emit(ChangeEvent::ZOrder {
            view,
            old,
            new: z_order,
        });
    }

    /// Install or clear the layout strategy of a container.
    pub fn set_layout(&self, view: ViewId, layout: Option<Box<dyn Layout>>) {
        if let Some(node) = self.inner.tree.borrow_mut().get_mut(view) {
            node.layout.replace(layout);
        }
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    pub fn subscribe(
        &self,
        view: ViewId,
        streams: Streams,
        listener: impl Fn(&Scene, &ChangeEvent) + 'static,
    ) -> Subscription {
        observe::subscribe(&self.inner.observers, view, streams, Rc::new(listener))
    }

    pub fn listener_count(&self, view: ViewId) -> usize {
        self.inner.observers.borrow().count(view)
    }

    fn emit(&self, event: ChangeEvent) {
        let listeners = self.inner.observers.borrow().matching(&event);
        for listener in listeners {
            listener(self, &event);
        }
    }

    // ---------------------------------------------------------------------
    // Capabilities
    // ---------------------------------------------------------------------

    /// Draw `view` onto `canvas`. Returns `false` if the view is unknown or
    /// its behavior is already running further up the stack.
    pub fn render(&self, view: ViewId, canvas: &mut dyn Canvas) -> bool {
        self.with_behavior(view, |behavior, scene| behavior.render(scene, view, canvas))
    }

    pub fn added_to_display(&self, view: ViewId, context: &DisplayContext) -> bool {
        self.with_behavior(view, |behavior, scene| {
            behavior.added_to_display(scene, view, context)
        })
    }

    pub fn removed_from_display(&self, view: ViewId) -> bool {
        self.with_behavior(view, |behavior, scene| {
            behavior.removed_from_display(scene, view)
        })
    }

    /// Run the container's layout over its current children. Returns
    /// `false` when no layout is installed.
    pub fn do_layout(&self, container: ViewId) -> bool {
        let lent = self
            .inner
            .tree
            .borrow_mut()
            .get_mut(container)
            .and_then(|node| node.layout.lend());
        let Some(mut layout) = lent else {
            return false;
        };

        let children = self.children(container);
        layout.layout(self, container, &children);

        if let Some(node) = self.inner.tree.borrow_mut().get_mut(container) {
            node.layout.give_back(layout);
        }
        true
    }

    fn with_behavior(&self, view: ViewId, f: impl FnOnce(&mut dyn Behavior, &Scene)) -> bool {
        let lent = self
            .inner
            .tree
            .borrow_mut()
            .get_mut(view)
            .and_then(|node| node.behavior.lend());
        let Some(mut behavior) = lent else {
            return false;
        };

        f(behavior.as_mut(), self);

        if let Some(node) = self.inner.tree.borrow_mut().get_mut(view) {
            node.behavior.give_back(behavior);
        }
        true
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("display", &self.inner.display)
            .field("views", &self.view_count())
            .finish()
    }
}
