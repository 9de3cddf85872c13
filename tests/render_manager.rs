use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis::platform::headless::SurfaceWrite;
use trellis::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Counts {
    added: usize,
    removed: usize,
    renders: usize,
}

/// Behavior that counts its hook invocations.
struct Probe {
    counts: Rc<RefCell<Counts>>,
}

impl Behavior for Probe {
    fn render(&mut self, _scene: &Scene, _view: ViewId, _canvas: &mut dyn Canvas) {
        self.counts.borrow_mut().renders += 1;
    }

    fn added_to_display(&mut self, _scene: &Scene, _view: ViewId, _context: &DisplayContext) {
        self.counts.borrow_mut().added += 1;
    }

    fn removed_from_display(&mut self, _scene: &Scene, _view: ViewId) {
        self.counts.borrow_mut().removed += 1;
    }
}

struct CountingLayout {
    calls: Rc<Cell<usize>>,
}

impl Layout for CountingLayout {
    fn layout(&mut self, _scene: &Scene, _container: ViewId, _children: &[ViewId]) {
        self.calls.set(self.calls.get() + 1);
    }
}

struct Harness {
    scene: Scene,
    device: Rc<HeadlessDevice>,
    scheduler: Rc<ManualScheduler>,
    manager: RenderManager<Rc<HeadlessDevice>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    fn with_config(config: RenderConfig) -> Self {
        init_logging();
        let scene = Scene::new(Size::new(800.0, 600.0));
        let device = Rc::new(HeadlessDevice::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let manager = RenderManager::builder(scene.clone(), Rc::clone(&device), scheduler.clone())
            .config(config)
            .build();
        Self {
            scene,
            device,
            scheduler,
            manager,
        }
    }

    fn display(&self) -> ViewId {
        self.scene.display()
    }

    fn probe(&self, bounds: Rect) -> (ViewId, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let view = ViewBuilder::new()
            .bounds(bounds)
            .behavior(Probe {
                counts: Rc::clone(&counts),
            })
            .build(&self.scene);
        (view, counts)
    }

    fn container(&self, bounds: Rect) -> (ViewId, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let view = ViewBuilder::new()
            .bounds(bounds)
            .layout(CountingLayout {
                calls: Rc::clone(&calls),
            })
            .build(&self.scene);
        (view, calls)
    }

    fn frame(&self) {
        self.scheduler.run_frame();
    }
}

fn square(side: f32) -> Rect {
    Rect::new(0.0, 0.0, side, side)
}

#[test]
fn test_view_added_to_display_is_mounted_and_rendered_once() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));

    h.scene.add_child(h.display(), view).unwrap();
    assert!(!h.manager.is_mounted(view));
    h.frame();

    assert!(h.manager.is_mounted(view));
    assert_eq!(counts.borrow().added, 1);
    assert_eq!(counts.borrow().renders, 1);

    h.scene.set_size(view, Size::new(20.0, 20.0));
    h.frame();

    assert_eq!(counts.borrow().renders, 2);
    assert_eq!(counts.borrow().added, 1);
}

#[test]
fn test_position_change_relays_out_parent_without_render() {
    let h = Harness::new();
    let (container, layouts) = h.container(square(10.0));
    let (child, counts) = h.probe(square(5.0));
    h.scene.add_child(container, child).unwrap();
    h.scene.add_child(h.display(), container).unwrap();
    h.frame();

    assert_eq!(layouts.get(), 1);
    assert_eq!(counts.borrow().renders, 1);

    let position = h.scene.bounds(child).unwrap().position();
    h.scene.set_position(child, Point::new(position.x + 2.0, position.y));
    h.frame();

    assert_eq!(layouts.get(), 2);
    assert_eq!(counts.borrow().renders, 1);
    assert_eq!(
        h.manager.surface(child).unwrap().bounds(),
        Rect::new(2.0, 0.0, 5.0, 5.0)
    );
}

#[test]
fn test_reattach_under_same_container_is_noop() {
    let h = Harness::new();
    let (container, _) = h.container(square(10.0));
    let (child, counts) = h.probe(square(5.0));
    h.scene.add_child(container, child).unwrap();
    h.scene.add_child(h.display(), container).unwrap();
    h.frame();
    let surface = h.manager.surface(child).unwrap();
    let leased = h.device.leased_count();

    h.scene.remove_child(container, child).unwrap();
    h.scene.add_child(container, child).unwrap();
    h.frame();

    assert_eq!(*counts.borrow(), Counts { added: 1, removed: 0, renders: 1 });
    assert!(Rc::ptr_eq(&surface, &h.manager.surface(child).unwrap()));
    assert_eq!(h.device.leased_count(), leased);
}

#[test]
fn test_reattach_under_display_remounts() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();
    let surface = h.manager.surface(view).unwrap();

    h.scene.remove_child(h.display(), view).unwrap();
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    assert_eq!(counts.borrow().added, 2);
    assert_eq!(counts.borrow().removed, 1);
    assert!(h.manager.is_mounted(view));
    assert!(!Rc::ptr_eq(&surface, &h.manager.surface(view).unwrap()));
}

#[test]
fn test_always_collapse_keeps_display_children_mounted() {
    let h = Harness::with_config(RenderConfig::new().reattach(ReattachPolicy::AlwaysCollapse));
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.scene.remove_child(h.display(), view).unwrap();
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    assert_eq!(counts.borrow().added, 1);
    assert_eq!(counts.borrow().removed, 0);
}

#[test]
fn test_never_collapse_remounts_under_container() {
    let h = Harness::with_config(RenderConfig::new().reattach(ReattachPolicy::NeverCollapse));
    let (container, _) = h.container(square(10.0));
    let (child, counts) = h.probe(square(5.0));
    h.scene.add_child(container, child).unwrap();
    h.scene.add_child(h.display(), container).unwrap();
    h.frame();

    h.scene.remove_child(container, child).unwrap();
    h.scene.add_child(container, child).unwrap();
    h.frame();

    assert_eq!(counts.borrow().added, 2);
    assert_eq!(counts.borrow().removed, 1);
}

#[test]
fn test_render_only_visible_non_empty_views() {
    let h = Harness::new();
    let (container, _) = h.container(square(100.0));
    h.scene.add_child(h.display(), container).unwrap();
    h.frame();

    let (shown, shown_counts) = h.probe(square(10.0));
    let (hidden, hidden_counts) = h.probe(square(10.0));
    h.scene.set_visible(hidden, false);
    let (empty, empty_counts) = h.probe(Rect::EMPTY);
    for view in [shown, hidden, empty] {
        h.scene.add_child(container, view).unwrap();
    }
    h.frame();

    for counts in [&shown_counts, &hidden_counts, &empty_counts] {
        assert_eq!(counts.borrow().added, 1);
    }
    assert_eq!(shown_counts.borrow().renders, 1);
    assert_eq!(hidden_counts.borrow().renders, 0);
    assert_eq!(empty_counts.borrow().renders, 0);
}

#[test]
fn test_removing_subtree_notifies_every_node() {
    let h = Harness::new();
    let (outer, outer_counts) = h.probe(square(30.0));
    let (middle, middle_counts) = h.probe(square(20.0));
    let (inner, inner_counts) = h.probe(square(10.0));
    h.scene.add_child(middle, inner).unwrap();
    h.scene.add_child(outer, middle).unwrap();
    h.scene.add_child(h.display(), outer).unwrap();
    h.frame();
    assert_eq!(h.device.live_count(), 3);

    h.scene.remove_child(h.display(), outer).unwrap();
    h.frame();

    for counts in [&outer_counts, &middle_counts, &inner_counts] {
        assert_eq!(counts.borrow().added, 1);
        assert_eq!(counts.borrow().removed, 1);
    }
    assert_eq!(h.device.live_count(), 0);
    assert_eq!(h.manager.mounted_count(), 0);
    assert_eq!(h.scene.listener_count(middle), 0);
}

#[test]
fn test_nested_surfaces_lease_under_parent_surface() {
    let h = Harness::new();
    let (outer, _) = h.probe(square(30.0));
    let (inner, _) = h.probe(square(10.0));
    h.scene.add_child(outer, inner).unwrap();
    h.scene.add_child(h.display(), outer).unwrap();
    h.frame();

    assert_eq!(h.manager.surface(outer).unwrap().parent(), None);
    assert_eq!(h.manager.surface(inner).unwrap().parent(), Some(outer));
}

#[test]
fn test_resize_to_empty_does_not_render() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.scene.set_size(view, Size::EMPTY);
    let stats = h.manager.flush().unwrap();

    assert_eq!(counts.borrow().renders, 1);
    assert_eq!(stats.rendered, 0);
    assert_eq!(h.manager.surface(view).unwrap().bounds(), Rect::EMPTY);
}

#[test]
fn test_mutations_coalesce_into_one_frame_request() {
    let h = Harness::new();
    let (view, _) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    assert_eq!(h.scheduler.requests(), 1);
    h.frame();

    h.scene.set_size(view, Size::new(20.0, 20.0));
    h.scene.set_position(view, Point::new(5.0, 5.0));
    h.scene.set_visible(view, false);

    assert_eq!(h.scheduler.requests(), 2);
    assert_eq!(h.scheduler.pending_frames(), 1);
    assert!(h.manager.frame_requested());
}

#[test]
fn test_render_now_ignores_unmounted_views() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));

    assert!(!h.manager.render_now(view));

    h.scene.add_child(h.display(), view).unwrap();
    h.frame();
    h.scene.remove_child(h.display(), view).unwrap();
    h.frame();

    assert!(!h.manager.render_now(view));
    assert_eq!(counts.borrow().renders, 1);
}

#[test]
fn test_render_now_renders_inline() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    assert!(h.manager.render_now(view));
    assert_eq!(counts.borrow().renders, 2);
    assert!(!h.manager.has_pending_work());

    h.scene.set_visible(view, false);
    assert!(!h.manager.render_now(view));
    assert_eq!(counts.borrow().renders, 2);
}

#[test]
fn test_render_request_for_unmounted_view_is_ignored() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));

    h.manager.render(view);

    assert!(!h.manager.has_pending_work());
    assert_eq!(h.scheduler.requests(), 0);
    assert_eq!(counts.borrow().renders, 0);
}

#[test]
fn test_render_request_runs_next_frame() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.manager.render(view);
    h.manager.render(view);
    h.frame();

    assert_eq!(counts.borrow().renders, 2);
}

#[test]
fn test_surface_mirrors_view_properties_immediately() {
    let h = Harness::new();
    let (view, _) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();
    let surface = h.manager.surface(view).unwrap();
    surface.clear_writes();

    h.scene.set_visible(view, false);
    h.scene.set_transform(view, Transform::rotate_degrees(45.0));
    h.scene.set_z_order(view, 3);

    assert!(!surface.is_visible());
    assert_eq!(surface.transform(), Transform::rotate_degrees(45.0));
    assert_eq!(surface.z_order(), 3);

    h.scene.set_visible(view, true);
    assert!(surface.is_visible());
    assert_eq!(
        surface.writes(),
        vec![
            SurfaceWrite::Visible(false),
            SurfaceWrite::Transform(Transform::rotate_degrees(45.0)),
            SurfaceWrite::ZOrder(3),
            SurfaceWrite::Visible(true),
        ]
    );
}

#[test]
fn test_transform_and_z_order_queue_no_work() {
    let h = Harness::new();
    let (view, _) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.scene.set_transform(view, Transform::scale(2.0));
    h.scene.set_z_order(view, 9);

    assert!(!h.manager.has_pending_work());
    assert_eq!(h.scheduler.requests(), 1);
}

#[test]
fn test_hidden_view_renders_when_shown() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.set_visible(view, false);
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();
    assert_eq!(counts.borrow().renders, 0);

    h.scene.set_visible(view, true);
    h.frame();

    assert_eq!(counts.borrow().renders, 1);
}

#[test]
fn test_hiding_cancels_pending_render() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.scene.set_size(view, Size::new(40.0, 40.0));
    h.scene.set_visible(view, false);
    let stats = h.manager.flush().unwrap();

    assert_eq!(counts.borrow().renders, 1);
    assert_eq!(stats.rendered, 0);
    assert_eq!(stats.skipped_renders, 0);
}

#[test]
fn test_move_updates_index_without_remount() {
    let h = Harness::new();
    let (a, a_counts) = h.probe(square(10.0));
    let (b, _) = h.probe(square(10.0));
    let (c, _) = h.probe(square(10.0));
    for view in [a, b, c] {
        h.scene.add_child(h.display(), view).unwrap();
    }
    h.frame();
    assert_eq!(h.manager.surface(c).unwrap().index(), 2);

    h.scene.move_child(h.display(), a, 2).unwrap();
    let stats = h.manager.flush().unwrap();

    assert_eq!(stats.mounted, 0);
    assert_eq!(stats.unmounted, 0);
    assert_eq!(a_counts.borrow().added, 1);
    assert_eq!(h.manager.surface(a).unwrap().index(), 2);
    assert_eq!(h.manager.surface(b).unwrap().index(), 0);
    assert_eq!(h.manager.surface(c).unwrap().index(), 1);
}

#[test]
fn test_existing_children_mount_on_construction() {
    init_logging();
    let scene = Scene::new(Size::new(800.0, 600.0));
    let counts = Rc::new(RefCell::new(Counts::default()));
    let view = ViewBuilder::new()
        .bounds(square(10.0))
        .behavior(Probe {
            counts: Rc::clone(&counts),
        })
        .build(&scene);
    let child = scene.create_view(());
    scene.add_child(view, child).unwrap();
    scene.add_child(scene.display(), view).unwrap();

    let display_layouts = Rc::new(Cell::new(0));
    scene.set_layout(
        scene.display(),
        Some(Box::new(CountingLayout {
            calls: Rc::clone(&display_layouts),
        })),
    );

    let device = Rc::new(HeadlessDevice::new());
    let scheduler = Rc::new(ManualScheduler::new());
    let manager = RenderManager::new(scene.clone(), Rc::clone(&device), scheduler.clone());
    assert_eq!(scheduler.requests(), 1);

    scheduler.run_frame();

    assert!(manager.is_mounted(view));
    assert!(manager.is_mounted(child));
    assert_eq!(counts.borrow().added, 1);
    assert_eq!(display_layouts.get(), 0);
}

#[test]
fn test_display_resize_lays_out_display() {
    let h = Harness::new();
    let calls = Rc::new(Cell::new(0));
    h.scene.set_layout(
        h.display(),
        Some(Box::new(CountingLayout {
            calls: Rc::clone(&calls),
        })),
    );

    h.scene.set_display_size(Size::new(1024.0, 768.0));
    h.frame();

    assert_eq!(calls.get(), 1);
}

#[test]
fn test_layout_runs_once_per_container_per_flush() {
    let h = Harness::new();
    let (container, layouts) = h.container(square(100.0));
    let (a, _) = h.probe(square(10.0));
    let (b, _) = h.probe(square(10.0));
    h.scene.add_child(container, a).unwrap();
    h.scene.add_child(container, b).unwrap();
    h.scene.add_child(h.display(), container).unwrap();
    h.frame();

    h.scene.set_position(a, Point::new(1.0, 1.0));
    h.scene.set_position(b, Point::new(2.0, 2.0));
    h.scene.set_visible(a, false);
    h.frame();

    assert_eq!(layouts.get(), 2);
}

#[test]
fn test_layout_of_unmounted_container_is_skipped() {
    let h = Harness::new();
    let (container, layouts) = h.container(square(100.0));
    let (child, _) = h.probe(square(10.0));
    h.scene.add_child(container, child).unwrap();
    h.scene.add_child(h.display(), container).unwrap();
    h.frame();

    h.scene.set_position(child, Point::new(3.0, 3.0));
    h.scene.remove_child(h.display(), container).unwrap();
    h.frame();

    assert_eq!(layouts.get(), 1);
}

#[test]
fn test_theme_and_accessibility_notified_once_per_mount() {
    #[derive(Default)]
    struct Recorder {
        themed: RefCell<Vec<ViewId>>,
        mounted: RefCell<Vec<ViewId>>,
        unmounted: RefCell<Vec<ViewId>>,
    }

    impl ThemeManager for Recorder {
        fn update(&self, _scene: &Scene, view: ViewId) {
            self.themed.borrow_mut().push(view);
        }
    }

    impl AccessibilityManager for Recorder {
        fn view_mounted(&self, view: ViewId) {
            self.mounted.borrow_mut().push(view);
        }

        fn view_unmounted(&self, view: ViewId) {
            self.unmounted.borrow_mut().push(view);
        }
    }

    init_logging();
    let scene = Scene::new(Size::new(800.0, 600.0));
    let recorder = Rc::new(Recorder::default());
    let scheduler = Rc::new(ManualScheduler::new());
    let manager = RenderManager::builder(scene.clone(), HeadlessDevice::new(), scheduler.clone())
        .theme(recorder.clone())
        .accessibility(recorder.clone())
        .build();

    let parent = scene.create_view(());
    let child = scene.create_view(());
    scene.add_child(parent, child).unwrap();
    scene.add_child(scene.display(), parent).unwrap();
    scheduler.run_frame();

    assert_eq!(*recorder.themed.borrow(), vec![parent, child]);
    assert_eq!(*recorder.mounted.borrow(), vec![parent, child]);

    scene.set_size(child, Size::new(5.0, 5.0));
    scheduler.run_frame();
    assert_eq!(recorder.themed.borrow().len(), 2);

    scene.remove_child(scene.display(), parent).unwrap();
    scheduler.run_frame();

    assert_eq!(*recorder.unmounted.borrow(), vec![child, parent]);
    assert!(!manager.is_mounted(parent));
}

#[test]
fn test_mutation_from_hook_waits_for_next_flush() {
    struct Spawner {
        spawned: Rc<Cell<Option<ViewId>>>,
    }

    impl Behavior for Spawner {
        fn added_to_display(&mut self, scene: &Scene, view: ViewId, _context: &DisplayContext) {
            let child = ViewBuilder::new()
                .size(Size::new(4.0, 4.0))
                .build(scene);
            scene.add_child(view, child).unwrap();
            self.spawned.set(Some(child));
        }
    }

    let h = Harness::new();
    let spawned = Rc::new(Cell::new(None));
    let view = ViewBuilder::new()
        .bounds(square(10.0))
        .behavior(Spawner {
            spawned: Rc::clone(&spawned),
        })
        .build(&h.scene);
    h.scene.add_child(h.display(), view).unwrap();

    let first = h.manager.flush().unwrap();
    let child = spawned.get().unwrap();

    assert_eq!(first.mounted, 1);
    assert!(!h.manager.is_mounted(child));
    assert!(h.manager.has_pending_work());
    assert!(h.manager.frame_requested());

    h.frame();
    assert!(h.manager.is_mounted(child));
}

#[test]
fn test_hook_can_request_render_through_context() {
    struct SelfRendering {
        handle: Rc<RefCell<Option<RenderHandle>>>,
        renders: Rc<Cell<usize>>,
    }

    impl Behavior for SelfRendering {
        fn render(&mut self, _scene: &Scene, _view: ViewId, _canvas: &mut dyn Canvas) {
            self.renders.set(self.renders.get() + 1);
        }

        fn added_to_display(&mut self, _scene: &Scene, view: ViewId, context: &DisplayContext) {
            assert!(context.render_manager().is_mounted(view));
            *self.handle.borrow_mut() = Some(context.render_manager().clone());
        }
    }

    let h = Harness::new();
    let handle = Rc::new(RefCell::new(None));
    let renders = Rc::new(Cell::new(0));
    let view = ViewBuilder::new()
        .bounds(square(10.0))
        .behavior(SelfRendering {
            handle: Rc::clone(&handle),
            renders: Rc::clone(&renders),
        })
        .build(&h.scene);
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();
    assert_eq!(renders.get(), 1);

    let handle = handle.borrow().clone().unwrap();
    handle.render(view);
    h.frame();
    assert_eq!(renders.get(), 2);

    drop(h);
    assert!(!handle.is_alive());
    assert!(!handle.render_now(view));
}

#[test]
fn test_lease_failure_skips_subtree_and_reports() {
    let h = Harness::new();
    let (broken, broken_counts) = h.probe(square(10.0));
    let (under_broken, under_counts) = h.probe(square(5.0));
    let (healthy, healthy_counts) = h.probe(square(10.0));
    h.scene.add_child(broken, under_broken).unwrap();
    h.device.refuse(broken);
    h.scene.add_child(h.display(), broken).unwrap();
    h.scene.add_child(h.display(), healthy).unwrap();

    let result = h.manager.flush();

    assert_eq!(
        result,
        Err(RenderError::SurfaceLease {
            view: broken,
            source: DeviceError::Unavailable(broken),
        })
    );
    assert!(!h.manager.is_mounted(broken));
    assert!(!h.manager.is_mounted(under_broken));
    assert!(h.manager.is_mounted(healthy));
    assert_eq!(broken_counts.borrow().added, 0);
    assert_eq!(under_counts.borrow().added, 0);
    assert_eq!(healthy_counts.borrow().renders, 1);

    h.device.allow(broken);
    h.scene.remove_child(h.display(), broken).unwrap();
    h.scene.add_child(h.display(), broken).unwrap();
    h.frame();

    assert!(h.manager.is_mounted(under_broken));
    assert_eq!(broken_counts.borrow().removed, 0);
    assert_eq!(broken_counts.borrow().added, 1);
}

#[test]
fn test_explicit_flush_cancels_frame() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    assert_eq!(h.scheduler.pending_frames(), 1);

    let stats = h.manager.flush().unwrap();

    assert_eq!(stats.mounted, 1);
    assert_eq!(stats.rendered, 1);
    assert_eq!(h.scheduler.pending_frames(), 0);
    assert_eq!(h.scheduler.run_frame(), 0);
    assert_eq!(counts.borrow().renders, 1);
}

#[test]
fn test_shutdown_releases_without_lifecycle() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.scene.set_size(view, Size::new(50.0, 50.0));
    h.manager.shutdown();
    h.manager.shutdown();

    assert_eq!(h.device.live_count(), 0);
    assert_eq!(counts.borrow().removed, 0);
    assert_eq!(h.scene.listener_count(view), 0);
    assert_eq!(h.scene.listener_count(h.display()), 0);
    assert_eq!(h.scheduler.pending_frames(), 0);

    h.scene.set_size(view, Size::new(60.0, 60.0));
    assert!(!h.manager.has_pending_work());
    assert_eq!(h.manager.flush(), Ok(FlushStats::default()));
}

#[test]
fn test_dropping_manager_releases_surfaces() {
    let h = Harness::new();
    let (view, _) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    let Harness {
        scene,
        device,
        scheduler,
        manager,
    } = h;
    drop(manager);

    assert_eq!(device.live_count(), 0);
    assert_eq!(scene.listener_count(view), 0);

    scene.set_size(view, Size::new(1.0, 1.0));
    assert_eq!(scheduler.run_frame(), 0);
}

#[test]
fn test_remount_after_unmount_leases_fresh_surface() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();
    let first = h.manager.surface(view).unwrap();

    h.scene.remove_child(h.display(), view).unwrap();
    h.frame();
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    assert!(!Rc::ptr_eq(&first, &h.manager.surface(view).unwrap()));
    assert_eq!(h.device.leased_count(), 2);
    assert_eq!(h.device.released_count(), 1);
    assert_eq!(*counts.borrow(), Counts { added: 2, removed: 1, renders: 2 });
}

#[test]
fn test_reparent_between_mounted_containers() {
    let h = Harness::new();
    let (left, _) = h.container(square(50.0));
    let (right, _) = h.container(square(50.0));
    let (child, counts) = h.probe(square(10.0));
    h.scene.add_child(left, child).unwrap();
    h.scene.add_child(h.display(), left).unwrap();
    h.scene.add_child(h.display(), right).unwrap();
    h.frame();

    h.scene.add_child(right, child).unwrap();
    h.frame();

    assert_eq!(counts.borrow().added, 2);
    assert_eq!(counts.borrow().removed, 1);
    assert_eq!(h.manager.surface(child).unwrap().parent(), Some(right));
}

#[test]
fn test_add_then_remove_before_flush_does_nothing() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));

    h.scene.add_child(h.display(), view).unwrap();
    h.scene.remove_child(h.display(), view).unwrap();
    h.frame();

    assert_eq!(*counts.borrow(), Counts::default());
    assert_eq!(h.device.leased_count(), 0);
}

#[test]
fn test_subtree_attached_later_mounts_every_descendant() {
    let h = Harness::new();
    let (root, _) = h.probe(square(30.0));
    let (a, a_counts) = h.probe(square(10.0));
    let (b, b_counts) = h.probe(square(10.0));
    h.scene.add_child(root, a).unwrap();
    h.scene.add_child(a, b).unwrap();

    h.scene.add_child(h.display(), root).unwrap();
    let stats = h.manager.flush().unwrap();

    assert_eq!(stats.mounted, 3);
    assert_eq!(a_counts.borrow().added, 1);
    assert_eq!(b_counts.borrow().added, 1);
    assert_eq!(h.scene.listener_count(b), 2);
}

#[test]
fn test_reattach_under_same_container_reindexes_surfaces() {
    let h = Harness::new();
    let (container, _) = h.container(square(50.0));
    let (a, a_counts) = h.probe(square(10.0));
    let (b, _) = h.probe(square(10.0));
    h.scene.add_child(h.display(), container).unwrap();
    h.scene.add_child(container, a).unwrap();
    h.scene.add_child(container, b).unwrap();
    h.frame();
    let a_surface = h.manager.surface(a).unwrap();
    let b_surface = h.manager.surface(b).unwrap();
    assert_eq!((a_surface.index(), b_surface.index()), (0, 1));

    h.scene.remove_child(container, a).unwrap();
    h.scene.add_child(container, a).unwrap();
    let stats = h.manager.flush().unwrap();

    assert_eq!(h.scene.children(container), vec![b, a]);
    assert_eq!((stats.mounted, stats.unmounted), (0, 0));
    assert_eq!(a_counts.borrow().added, 1);
    assert!(Rc::ptr_eq(&h.manager.surface(a).unwrap(), &a_surface));
    assert_eq!(a_surface.index(), 1);
    assert_eq!(b_surface.index(), 0);
}

#[test]
fn test_child_detached_by_parent_hook_is_not_mounted() {
    struct Evictor {
        evict: Rc<Cell<Option<ViewId>>>,
    }

    impl Behavior for Evictor {
        fn added_to_display(&mut self, scene: &Scene, view: ViewId, _context: &DisplayContext) {
            if let Some(child) = self.evict.take() {
                scene.remove_child(view, child).unwrap();
            }
        }
    }

    let h = Harness::new();
    let evict = Rc::new(Cell::new(None));
    let parent = ViewBuilder::new()
        .bounds(square(20.0))
        .behavior(Evictor {
            evict: Rc::clone(&evict),
        })
        .build(&h.scene);
    let (child, child_counts) = h.probe(square(5.0));
    h.scene.add_child(parent, child).unwrap();
    evict.set(Some(child));
    h.scene.add_child(h.display(), parent).unwrap();

    let stats = h.manager.flush().unwrap();

    assert!(h.manager.is_mounted(parent));
    assert!(!h.scene.is_attached(child));
    assert!(!h.manager.is_mounted(child));
    assert_eq!(stats.mounted, 1);
    assert_eq!(*child_counts.borrow(), Counts::default());
    assert_eq!(h.device.live_count(), 1);

    h.frame();
    assert_eq!(*child_counts.borrow(), Counts::default());
    assert_eq!(h.device.released_count(), 0);
}

#[test]
fn test_destroy_waits_for_unmount_flush() {
    let h = Harness::new();
    let (view, counts) = h.probe(square(10.0));
    h.scene.add_child(h.display(), view).unwrap();
    h.frame();

    h.scene.remove_child(h.display(), view).unwrap();
    assert_eq!(h.scene.destroy_view(view), Err(SceneError::Observed(view)));

    h.frame();
    assert_eq!(counts.borrow().removed, 1);
    assert_eq!(h.scene.destroy_view(view), Ok(()));
    assert!(!h.scene.contains(view));
    assert_eq!(h.device.live_count(), 0);
}
