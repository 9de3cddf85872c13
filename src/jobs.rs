// ============================================================================
// Pending work between frames
// ============================================================================
//
// Mutations observed between two flushes are recorded here and executed in
// one batch. Each kind of job is an insertion-ordered set keyed by view, so
// repeated requests for the same view coalesce into one.

use std::collections::HashMap;

use crate::tree::ViewId;

/// Insertion-ordered map keyed by view.
pub(crate) struct JobQueue<V> {
    entries: Vec<Option<(ViewId, V)>>,
    index: HashMap<ViewId, usize>,
}

impl<V> JobQueue<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn contains(&self, view: ViewId) -> bool {
        self.index.contains_key(&view)
    }

    pub(crate) fn get(&self, view: ViewId) -> Option<&V> {
        let slot = *self.index.get(&view)?;
        self.entries[slot].as_ref().map(|(_, value)| value)
    }

    /// Insert unless present. Returns whether the queue changed.
    pub(crate) fn insert(&mut self, view: ViewId, value: V) -> bool {
        if self.contains(view) {
            return false;
        }
        self.index.insert(view, self.entries.len());
        self.entries.push(Some((view, value)));
        true
    }

    /// Insert, or overwrite the value in place keeping the original order.
    pub(crate) fn upsert(&mut self, view: ViewId, value: V) {
        match self.index.get(&view) {
            Some(&slot) => self.entries[slot] = Some((view, value)),
            None => {
                self.insert(view, value);
            }
        }
    }

    pub(crate) fn remove(&mut self, view: ViewId) -> Option<V> {
        let slot = self.index.remove(&view)?;
        self.entries[slot].take().map(|(_, value)| value)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Take every entry, oldest first, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<(ViewId, V)> {
        self.index.clear();
        std::mem::take(&mut self.entries)
            .into_iter()
            .flatten()
            .collect()
    }
}

impl<V> Default for JobQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The four job sets of one batch.
#[derive(Default)]
pub(crate) struct PendingJobs {
    /// view -> parent it was added to
    pub(crate) mounts: JobQueue<ViewId>,
    /// view -> parent it was first removed from
    pub(crate) unmounts: JobQueue<ViewId>,
    pub(crate) renders: JobQueue<()>,
    pub(crate) layouts: JobQueue<()>,
}

impl PendingJobs {
    /// Record that `view` was added to `target`.
    ///
    /// With `collapse` set, a pending unmount from that same parent cancels
    /// out and neither job runs. Returns whether anything changed.
    pub(crate) fn mount(&mut self, view: ViewId, target: ViewId, collapse: bool) -> bool {
        if collapse && self.unmounts.get(view) == Some(&target) {
            self.unmounts.remove(view);
            self.mounts.remove(view);
            return true;
        }
        self.mounts.upsert(view, target);
        true
    }

    /// Record that `view` was removed from `origin`. A later removal keeps
    /// the first origin.
    ///
    /// A pending mount is dropped. If that mount was not preceded by an
    /// unmount, the view was never mounted and nothing is left to tear down.
    pub(crate) fn unmount(&mut self, view: ViewId, origin: ViewId) -> bool {
        if self.mounts.remove(view).is_some() && !self.unmounts.contains(view) {
            return true;
        }
        self.unmounts.insert(view, origin)
    }

    pub(crate) fn render(&mut self, view: ViewId) -> bool {
        self.renders.insert(view, ())
    }

    pub(crate) fn cancel_render(&mut self, view: ViewId) -> bool {
        self.renders.remove(view).is_some()
    }

    pub(crate) fn layout(&mut self, container: ViewId) -> bool {
        self.layouts.insert(container, ())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.mounts.is_empty()
            && self.unmounts.is_empty()
            && self.renders.is_empty()
            && self.layouts.is_empty()
    }
}
