use crate::tree::ViewId;

/// Receives mount and unmount notifications so assistive technology can
/// mirror the live view tree.
pub trait AccessibilityManager {
    fn view_mounted(&self, view: ViewId) {
        let _ = view;
    }

    fn view_unmounted(&self, view: ViewId) {
        let _ = view;
    }
}
