use crate::scene::Scene;
use crate::tree::ViewId;

/// Applies styling to views as they are mounted.
///
/// `update` runs once per mount, before the view's `added_to_display` hook.
/// It may write view properties through the scene.
pub trait ThemeManager {
    fn update(&self, scene: &Scene, view: ViewId);
}
