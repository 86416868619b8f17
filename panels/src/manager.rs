//! Owns the panels and their containers, and routes inbound messages
//! and input events to whichever container currently holds the affected
//! panel.
//!
//! Drag positions arrive much faster than we want to recompute layouts,
//! so they pass through a coalescer and are processed on a ~50 ms tick.
//! When a container declines a drag position the panel is detached and
//! offered to every container in turn; a panel that nobody claims just
//! follows the pointer and falls back into the bar when dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use shell::geometry::{Point, Size};
use shell::window::{StackingLayer, Timestamp, WindowId, WindowInfo};
use shell::ShellContext;
use tracing::{debug, warn};

use crate::bar::PanelBar;
use crate::coalescer::MotionEventCoalescer;
use crate::config::PanelSettings;
use crate::container::{ContainerKind, PanelContainer, PanelSource};
use crate::dock::{DockSide, PanelDock};
use crate::panel::{Panel, PanelHandle, PanelId};

/// Called with the widths consumed by the left and right docks whenever
/// either dock appears or disappears. Listeners must not call back into
/// the manager.
pub type AreaChangeListener = Box<dyn Fn(i32, i32)>;

pub struct PanelManager {
    ctx: Rc<ShellContext>,
    settings: PanelSettings,

    bar: Rc<RefCell<PanelBar>>,
    left_dock: Rc<RefCell<PanelDock>>,
    right_dock: Rc<RefCell<PanelDock>>,

    panels: HashMap<PanelId, PanelHandle>,
    /// Content and titlebar windows back to their panel.
    window_to_panel: HashMap<WindowId, PanelId>,
    /// Resize-handle windows back to their panel.
    panel_input_windows: HashMap<WindowId, PanelId>,
    /// Container input windows (the bar's strip and anchor, the docks'
    /// backgrounds).
    container_input_windows: HashMap<WindowId, ContainerKind>,
    /// Which container each panel currently lives in.
    assignments: HashMap<PanelId, ContainerKind>,

    dragged: Option<PanelId>,
    fullscreen: Option<PanelId>,
    drag_coalescer: MotionEventCoalescer,

    area_change_listeners: Vec<AreaChangeListener>,
}

impl PanelManager {
    pub fn new(ctx: Rc<ShellContext>, settings: PanelSettings) -> Rc<RefCell<PanelManager>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<PanelManager>>| {
            let bar = PanelBar::new(ctx.clone(), settings.bar.clone());
            let left_dock = PanelDock::new(ctx.clone(), DockSide::Left, settings.dock.clone());
            let right_dock = PanelDock::new(ctx.clone(), DockSide::Right, settings.dock.clone());

            let mut container_input_windows = HashMap::new();
            for window in bar.borrow().input_windows() {
                container_input_windows.insert(window, ContainerKind::Bar);
            }
            for window in left_dock.borrow().input_windows() {
                container_input_windows.insert(window, ContainerKind::LeftDock);
            }
            for window in right_dock.borrow().input_windows() {
                container_input_windows.insert(window, ContainerKind::RightDock);
            }

            let tick_target = weak.clone();
            let drag_coalescer = MotionEventCoalescer::new(
                ctx.events.clone(),
                Box::new(move || {
                    if let Some(manager) = tick_target.upgrade() {
                        manager.borrow_mut().handle_periodic_panel_drag_motion();
                    }
                }),
                settings.drag.update_interval_ms,
            );

            RefCell::new(PanelManager {
                ctx,
                settings,
                bar,
                left_dock,
                right_dock,
                panels: HashMap::new(),
                window_to_panel: HashMap::new(),
                panel_input_windows: HashMap::new(),
                container_input_windows,
                assignments: HashMap::new(),
                dragged: None,
                fullscreen: None,
                drag_coalescer,
                area_change_listeners: Vec::new(),
            })
        })
    }

    pub fn num_panels(&self) -> usize {
        self.panels.len()
    }

    /// Widths consumed by the left and right docks.
    pub fn dock_area(&self) -> (i32, i32) {
        let left = self.left_dock.borrow();
        let right = self.right_dock.borrow();
        (
            if left.is_visible() { left.width() } else { 0 },
            if right.is_visible() { right.width() } else { 0 },
        )
    }

    pub fn register_area_change_listener(&mut self, listener: AreaChangeListener) {
        self.area_change_listeners.push(listener);
    }

    fn notify_area_change(&self) {
        let (left, right) = self.dock_area();
        for listener in &self.area_change_listeners {
            listener(left, right);
        }
    }

    fn container(&self, kind: ContainerKind) -> Rc<RefCell<dyn PanelContainer>> {
        match kind {
            ContainerKind::Bar => self.bar.clone(),
            ContainerKind::LeftDock => self.left_dock.clone(),
            ContainerKind::RightDock => self.right_dock.clone(),
        }
    }

    fn panel_by_window(&self, window: WindowId) -> Option<PanelHandle> {
        self.window_to_panel
            .get(&window)
            .and_then(|id| self.panels.get(id))
            .cloned()
    }

    fn add_panel_to_container(
        &mut self,
        panel: &PanelHandle,
        kind: ContainerKind,
        source: PanelSource,
    ) {
        let id = panel.borrow().id();
        let area_before = self.dock_area();
        self.assignments.insert(id, kind);
        self.container(kind).borrow_mut().add_panel(panel, source);
        if self.dock_area() != area_before {
            self.notify_area_change();
        }
    }

    fn remove_panel_from_container(&mut self, panel: &PanelHandle, kind: ContainerKind) {
        let id = panel.borrow().id();
        let area_before = self.dock_area();
        self.container(kind).borrow_mut().remove_panel(panel);
        self.assignments.remove(&id);
        if self.dock_area() != area_before {
            self.notify_area_change();
        }
    }

    // -- panel lifecycle ----------------------------------------------------

    /// Both windows of a new panel have been mapped; build the panel
    /// and drop it into the bar.
    pub fn add_panel(
        &mut self,
        content: WindowInfo,
        titlebar: WindowInfo,
        expanded: bool,
    ) -> PanelHandle {
        let panel = Panel::new(
            self.ctx.clone(),
            content,
            titlebar,
            expanded,
            self.settings.resize.clone(),
        );
        let id = panel.borrow().id();
        debug!("Adding {id}");
        self.panels.insert(id, panel.clone());
        self.window_to_panel.insert(panel.borrow().content_id(), id);
        self.window_to_panel.insert(panel.borrow().titlebar_id(), id);
        for window in panel.borrow().input_windows() {
            self.panel_input_windows.insert(window, id);
        }
        self.add_panel_to_container(&panel, ContainerKind::Bar, PanelSource::New);
        panel
    }

    /// Either of a panel's windows was destroyed; the panel goes with
    /// it.
    pub fn handle_window_unmap(&mut self, window: WindowId) {
        let Some(id) = self.window_to_panel.get(&window).copied() else {
            return;
        };
        let Some(panel) = self.panels.get(&id).cloned() else {
            return;
        };
        debug!("Removing {id}");
        if let Some(kind) = self.assignments.get(&id).copied() {
            self.remove_panel_from_container(&panel, kind);
        }
        if self.dragged == Some(id) {
            if self.drag_coalescer.is_running() {
                self.drag_coalescer.stop();
            }
            self.dragged = None;
        }
        if self.fullscreen == Some(id) {
            self.fullscreen = None;
        }
        self.window_to_panel.remove(&panel.borrow().content_id());
        self.window_to_panel.remove(&panel.borrow().titlebar_id());
        for input in panel.borrow().input_windows() {
            self.panel_input_windows.remove(&input);
        }
        self.panels.remove(&id);
    }

    pub fn handle_transient_window_map(&mut self, owner: WindowId, transient: WindowId) {
        if let Some(panel) = self.panel_by_window(owner) {
            panel.borrow_mut().add_transient(transient);
        }
    }

    pub fn handle_transient_window_unmap(&mut self, owner: WindowId, transient: WindowId) {
        if let Some(panel) = self.panel_by_window(owner) {
            panel.borrow_mut().remove_transient(transient);
        }
    }

    // -- inbound messages ---------------------------------------------------

    /// The owning process reports that the user is dragging the panel.
    /// The first notification of a drag decides its mode; positions are
    /// coalesced and handled on a periodic tick.
    pub fn handle_notify_panel_dragged(&mut self, window: WindowId, drag_pos: Point) {
        let Some(panel) = self.panel_by_window(window) else {
            warn!(
                "Ignoring drag message for non-panel window {:?}",
                window
            );
            return;
        };
        let id = panel.borrow().id();
        if self.dragged.is_some() && self.dragged != Some(id) {
            let previous = self.dragged.and_then(|prev| self.panels.get(&prev).cloned());
            if let Some(previous) = previous {
                self.finish_drag(&previous, false);
            }
        }
        if self.dragged != Some(id) {
            self.dragged = Some(id);
            panel.borrow_mut().handle_drag_start();
        }
        if !self.drag_coalescer.is_running() {
            self.drag_coalescer.start();
        }
        self.drag_coalescer.store_position(drag_pos);
    }

    pub fn handle_notify_panel_drag_complete(&mut self, window: WindowId) {
        let Some(panel) = self.panel_by_window(window) else {
            warn!(
                "Ignoring drag-complete message for non-panel window {:?}",
                window
            );
            return;
        };
        self.finish_drag(&panel, false);
    }

    pub fn handle_set_panel_state(&mut self, window: WindowId, expand: bool) {
        let Some(panel) = self.panel_by_window(window) else {
            warn!(
                "Ignoring set-state message for non-panel window {:?}",
                window
            );
            return;
        };
        let id = panel.borrow().id();
        if let Some(kind) = self.assignments.get(&id).copied() {
            self.container(kind)
                .borrow_mut()
                .handle_set_panel_state_message(&panel, expand);
        }
    }

    pub fn handle_focus_panel(&mut self, window: WindowId, timestamp: Timestamp) {
        let Some(panel) = self.panel_by_window(window) else {
            return;
        };
        let id = panel.borrow().id();
        if let Some(kind) = self.assignments.get(&id).copied() {
            self.container(kind)
                .borrow_mut()
                .handle_focus_panel_message(&panel, timestamp);
        }
    }

    /// A configure request asked for the panel's content window to be
    /// resized.
    pub fn handle_panel_resize_request(&mut self, window: WindowId, requested: Size) {
        let Some(panel) = self.panel_by_window(window) else {
            return;
        };
        let id = panel.borrow().id();
        if let Some(kind) = self.assignments.get(&id).copied() {
            self.container(kind)
                .borrow_mut()
                .handle_panel_resize_request(&panel, requested);
        }
    }

    pub fn handle_panel_urgency_change(&mut self, window: WindowId, urgent: bool) {
        let Some(panel) = self.panel_by_window(window) else {
            return;
        };
        if panel.borrow().is_urgent() == urgent {
            return;
        }
        panel.borrow_mut().set_is_urgent(urgent);
        let id = panel.borrow().id();
        if let Some(kind) = self.assignments.get(&id).copied() {
            self.container(kind)
                .borrow_mut()
                .handle_panel_urgency_change(&panel);
        }
    }

    pub fn handle_screen_resize(&mut self, size: Size) {
        self.ctx.set_screen_size(size);
        for panel in self.panels.values() {
            panel.borrow_mut().handle_screen_resize();
        }
        for kind in [
            ContainerKind::Bar,
            ContainerKind::LeftDock,
            ContainerKind::RightDock,
        ] {
            self.container(kind).borrow_mut().handle_screen_resize();
        }
    }

    // -- fullscreen ---------------------------------------------------------

    pub fn make_panel_fullscreen(&mut self, window: WindowId) {
        let Some(panel) = self.panel_by_window(window) else {
            return;
        };
        let id = panel.borrow().id();
        if let Some(previous) = self.fullscreen {
            if previous != id {
                if let Some(previous) = self.panels.get(&previous).cloned() {
                    previous.borrow_mut().set_fullscreen_state(false);
                }
            }
        }
        panel.borrow_mut().set_fullscreen_state(true);
        self.fullscreen = Some(id);
    }

    pub fn restore_fullscreen_panel(&mut self, window: WindowId) {
        let Some(panel) = self.panel_by_window(window) else {
            return;
        };
        panel.borrow_mut().set_fullscreen_state(false);
        if self.fullscreen == Some(panel.borrow().id()) {
            self.fullscreen = None;
        }
    }

    /// A fullscreen panel that loses the focus drops out of fullscreen.
    pub fn handle_focus_change(&mut self) {
        let Some(id) = self.fullscreen else {
            return;
        };
        let Some(panel) = self.panels.get(&id).cloned() else {
            return;
        };
        if !panel.borrow().is_focused() {
            panel.borrow_mut().set_fullscreen_state(false);
            self.fullscreen = None;
        }
    }

    pub fn take_focus(&mut self, timestamp: Timestamp) -> bool {
        self.bar.borrow_mut().take_focus(timestamp)
            || self.left_dock.borrow_mut().take_focus(timestamp)
            || self.right_dock.borrow_mut().take_focus(timestamp)
    }

    // -- input event routing ------------------------------------------------

    pub fn handle_button_press(
        &mut self,
        window: WindowId,
        position: Point,
        button: u8,
        timestamp: Timestamp,
    ) {
        if let Some(kind) = self.container_input_windows.get(&window).copied() {
            self.container(kind).borrow_mut().handle_input_window_button_press(
                window, position, button, timestamp,
            );
            return;
        }
        if let Some(id) = self.panel_input_windows.get(&window).copied() {
            if let Some(panel) = self.panels.get(&id).cloned() {
                panel
                    .borrow_mut()
                    .handle_input_window_button_press(window, position, button, timestamp);
            }
            return;
        }
        if let Some(panel) = self.panel_by_window(window) {
            let id = panel.borrow().id();
            if let Some(kind) = self.assignments.get(&id).copied() {
                self.container(kind)
                    .borrow_mut()
                    .handle_panel_button_press(&panel, button, timestamp);
            }
        }
    }

    pub fn handle_button_release(
        &mut self,
        window: WindowId,
        position: Point,
        button: u8,
        timestamp: Timestamp,
    ) {
        if let Some(id) = self.panel_input_windows.get(&window).copied() {
            let Some(panel) = self.panels.get(&id).cloned() else {
                return;
            };
            let resize_finished = panel.borrow_mut().handle_input_window_button_release(
                window, position, button, timestamp,
            );
            // The panel can't reach its container itself; report the
            // finished resize on its behalf.
            if resize_finished {
                if let Some(kind) = self.assignments.get(&id).copied() {
                    self.container(kind)
                        .borrow_mut()
                        .handle_panel_resize_by_user(&panel);
                }
            }
        }
    }

    pub fn handle_pointer_motion(&mut self, window: WindowId, position: Point) {
        if let Some(id) = self.panel_input_windows.get(&window).copied() {
            if let Some(panel) = self.panels.get(&id).cloned() {
                panel
                    .borrow_mut()
                    .handle_input_window_pointer_motion(window, position);
            }
        }
    }

    pub fn handle_pointer_enter(
        &mut self,
        window: WindowId,
        position: Point,
        timestamp: Timestamp,
    ) {
        if let Some(kind) = self.container_input_windows.get(&window).copied() {
            self.container(kind).borrow_mut().handle_input_window_pointer_enter(
                window, position, timestamp,
            );
            return;
        }
        if let Some(panel) = self.panel_by_window(window) {
            if window == panel.borrow().titlebar_id() {
                let id = panel.borrow().id();
                if let Some(kind) = self.assignments.get(&id).copied() {
                    self.container(kind)
                        .borrow_mut()
                        .handle_panel_titlebar_pointer_enter(&panel, timestamp);
                }
            }
        }
    }

    pub fn handle_pointer_leave(
        &mut self,
        window: WindowId,
        position: Point,
        timestamp: Timestamp,
    ) {
        if let Some(kind) = self.container_input_windows.get(&window).copied() {
            self.container(kind).borrow_mut().handle_input_window_pointer_leave(
                window, position, timestamp,
            );
        }
    }

    // -- drag processing ----------------------------------------------------

    /// Periodic tick from the drag coalescer: route the latest position
    /// to the panel's container, detaching and re-offering the panel
    /// when the container declines it.
    fn handle_periodic_panel_drag_motion(&mut self) {
        let Some(id) = self.dragged else {
            return;
        };
        let Some(panel) = self.panels.get(&id).cloned() else {
            return;
        };
        let position = self.drag_coalescer.position();

        let mut container_handled_drag = false;
        let mut panel_was_detached = false;
        if let Some(kind) = self.assignments.get(&id).copied() {
            if self
                .container(kind)
                .borrow_mut()
                .handle_notify_panel_dragged(&panel, position)
            {
                container_handled_drag = true;
            } else {
                debug!(
                    "Container {:?} told us to detach {id} at ({}, {})",
                    kind, position.x, position.y
                );
                self.remove_panel_from_container(&panel, kind);
                panel_was_detached = true;
            }
        }

        if !container_handled_drag {
            if panel_was_detached {
                let width = panel.borrow().content_width();
                panel.borrow_mut().set_titlebar_width(width);
                panel
                    .borrow_mut()
                    .stack_at_top_of_layer(StackingLayer::DraggedPanel);
            }

            // Offer the panel to every container; if nobody wants it,
            // it just follows the pointer.
            let mut panel_was_reattached = false;
            for kind in [
                ContainerKind::Bar,
                ContainerKind::LeftDock,
                ContainerKind::RightDock,
            ] {
                let container = self.container(kind);
                let should_add = container
                    .borrow()
                    .should_add_dragged_panel(&panel, position);
                if should_add {
                    debug!(
                        "Container {:?} claimed {id} at ({}, {})",
                        kind, position.x, position.y
                    );
                    self.add_panel_to_container(&panel, kind, PanelSource::Dragged);
                    let accepted = container
                        .borrow_mut()
                        .handle_notify_panel_dragged(&panel, position);
                    debug_assert!(accepted, "container claimed a panel but refused its drag");
                    panel_was_reattached = true;
                    break;
                }
            }
            if !panel_was_reattached {
                let anim_ms = if panel_was_detached {
                    self.settings.drag.detach_anim_ms
                } else {
                    0
                };
                panel.borrow_mut().move_to(position.x, position.y, anim_ms);
            }
        }
    }

    fn finish_drag(&mut self, panel: &PanelHandle, removed: bool) {
        let id = panel.borrow().id();
        if self.dragged != Some(id) {
            warn!("Ignoring drag completion for {id}, which isn't being dragged");
            return;
        }

        panel.borrow_mut().handle_drag_end();

        // Process any position that arrived after the last tick while
        // the panel still counts as dragged.
        if self.drag_coalescer.is_running() && self.drag_coalescer.stop() {
            self.handle_periodic_panel_drag_motion();
        }
        self.dragged = None;

        if !removed {
            match self.assignments.get(&id).copied() {
                Some(kind) => self
                    .container(kind)
                    .borrow_mut()
                    .handle_notify_panel_drag_complete(panel),
                None => {
                    debug!("Attaching dropped {id} to panel bar");
                    self.add_panel_to_container(panel, ContainerKind::Bar, PanelSource::Dropped);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shell::events::EventLoop;
    use shell::testing::MockWindowSystem;
    use shell::window::{PanelParams, SizeHints};
    use std::cell::Cell;

    const SCREEN_WIDTH: i32 = 1024;
    const SCREEN_HEIGHT: i32 = 768;
    const DOCK_WIDTH: i32 = 256;

    struct Fixture {
        ctx: Rc<ShellContext>,
        mock: Rc<MockWindowSystem>,
        manager: Rc<RefCell<PanelManager>>,
    }

    impl Fixture {
        fn new() -> Self {
            let events = EventLoop::new();
            let mock = MockWindowSystem::new();
            let ctx = ShellContext::new(
                Size::new(SCREEN_WIDTH, SCREEN_HEIGHT),
                events,
                mock.clone(),
            );
            let manager = PanelManager::new(ctx.clone(), PanelSettings::default());
            Self { ctx, mock, manager }
        }

        fn create_panel(&self, width: i32, titlebar_height: i32, height: i32) -> PanelHandle {
            let content = WindowInfo {
                id: self.mock.alloc_client_window(),
                client_size: Size::new(width, height),
                size_hints: SizeHints::default(),
                params: PanelParams::new(),
            };
            let titlebar = WindowInfo {
                id: self.mock.alloc_client_window(),
                client_size: Size::new(width, titlebar_height),
                size_hints: SizeHints::default(),
                params: PanelParams::default(),
            };
            self.manager
                .borrow_mut()
                .add_panel(content, titlebar, true)
        }

        /// Deliver a drag message and run the coalescer tick.
        fn send_drag(&self, panel: &PanelHandle, x: i32, y: i32) {
            let window = panel.borrow().content_id();
            self.manager
                .borrow_mut()
                .handle_notify_panel_dragged(window, Point::new(x, y));
            self.ctx.events.advance(50);
        }

        fn send_drag_complete(&self, panel: &PanelHandle) {
            let window = panel.borrow().content_id();
            self.manager
                .borrow_mut()
                .handle_notify_panel_drag_complete(window);
        }
    }

    #[test]
    fn test_new_panel_lands_in_bar() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        assert_eq!(panel.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 420);
        assert_eq!(fixture.manager.borrow().num_panels(), 1);
    }

    #[test]
    fn test_drag_between_bar_and_docks() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);

        // Drag up and away from the bar: detached, follows the pointer.
        fixture.send_drag(&panel, 500, 100);
        assert_eq!(panel.borrow().right(), 500);
        assert_eq!(panel.borrow().titlebar_y(), 100);

        // Within the attach threshold of the left dock: snaps to its
        // edge but keeps its own width while the drag is live.
        let drag_right = 200 + 20 - 10;
        fixture.send_drag(&panel, drag_right, 100);
        assert_eq!(panel.borrow().right(), 200);
        assert_eq!(panel.borrow().titlebar_y(), 100);
        assert_eq!(panel.borrow().width(), 200);

        // Completion adopts the dock width and packs to the top.
        fixture.send_drag_complete(&panel);
        assert_eq!(panel.borrow().right(), DOCK_WIDTH);
        assert_eq!(panel.borrow().titlebar_y(), 0);
        assert_eq!(panel.borrow().width(), DOCK_WIDTH);

        // Over to the right dock.
        fixture.send_drag(&panel, SCREEN_WIDTH - 20 + 10, 200);
        assert_eq!(panel.borrow().right(), SCREEN_WIDTH);
        assert_eq!(panel.borrow().titlebar_y(), 200);
        assert_eq!(panel.borrow().width(), DOCK_WIDTH);

        fixture.send_drag_complete(&panel);
        assert_eq!(panel.borrow().right(), SCREEN_WIDTH);
        assert_eq!(panel.borrow().titlebar_y(), 0);

        // Back down into the bar, close enough to the packed region to
        // stay packed.
        fixture.send_drag(&panel, SCREEN_WIDTH - 24, SCREEN_HEIGHT - 430);
        fixture.send_drag_complete(&panel);
        assert_eq!(panel.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - panel.borrow().total_height());
    }

    #[test]
    fn test_unclaimed_drop_falls_back_to_bar() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);

        fixture.send_drag(&panel, 500, 300);
        assert_eq!(panel.borrow().right(), 500);

        fixture.send_drag_complete(&panel);
        assert_eq!(
            panel.borrow().right(),
            SCREEN_WIDTH - 24,
            "unclaimed panel drops back into the bar"
        );
    }

    #[test]
    fn test_dock_visibility_notifies_area_listeners() {
        let fixture = Fixture::new();
        let area = Rc::new(Cell::new((0, 0)));
        {
            let area = area.clone();
            fixture
                .manager
                .borrow_mut()
                .register_area_change_listener(Box::new(move |left, right| {
                    area.set((left, right));
                }));
        }

        let panel = fixture.create_panel(200, 20, 400);
        fixture.send_drag(&panel, 500, 100);
        fixture.send_drag(&panel, 210, 100);
        assert_eq!(area.get(), (DOCK_WIDTH, 0), "left dock became visible");

        fixture.send_drag(&panel, 600, 100);
        assert_eq!(area.get(), (0, 0), "left dock emptied again");
    }

    #[test]
    fn test_resize_handle_release_repacks_bar() {
        let fixture = Fixture::new();
        let panel1 = fixture.create_panel(200, 20, 400);
        let panel2 = fixture.create_panel(200, 20, 400);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 230);

        // Drag panel1's left handle outward to widen it; the release
        // must repack panel2 out of the way.
        let left_handle = panel1.borrow().input_windows()[3];
        let mut manager = fixture.manager.borrow_mut();
        manager.handle_button_press(left_handle, Point::new(0, 0), 1, 100);
        manager.handle_pointer_motion(left_handle, Point::new(-100, 0));
        drop(manager);
        fixture.ctx.events.advance(25);
        fixture
            .manager
            .borrow_mut()
            .handle_button_release(left_handle, Point::new(-100, 0), 1, 200);

        assert_eq!(panel1.borrow().width(), 300);
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 330);
    }

    #[test]
    fn test_fullscreen_drops_on_focus_loss() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        let content = panel.borrow().content_id();

        fixture.manager.borrow_mut().make_panel_fullscreen(content);
        assert!(panel.borrow().is_fullscreen());

        // Some other window takes the focus.
        fixture.mock.set_focused(Some(WindowId(9999)));
        fixture.manager.borrow_mut().handle_focus_change();
        assert!(!panel.borrow().is_fullscreen());
    }

    #[test]
    fn test_window_unmap_removes_panel_and_repacks() {
        let fixture = Fixture::new();
        let panel1 = fixture.create_panel(200, 20, 400);
        let panel2 = fixture.create_panel(200, 20, 400);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 230);

        let content1 = panel1.borrow().content_id();
        fixture.manager.borrow_mut().handle_window_unmap(content1);
        assert_eq!(fixture.manager.borrow().num_panels(), 1);
        assert_eq!(
            panel2.borrow().right(),
            SCREEN_WIDTH - 24,
            "survivor repacked against the right edge"
        );
    }

    #[test]
    fn test_screen_resize_reaches_all_containers() {
        let fixture = Fixture::new();
        let bar_panel = fixture.create_panel(200, 20, 400);
        let docked = fixture.create_panel(200, 20, 400);
        fixture.send_drag(&docked, SCREEN_WIDTH, 100);
        fixture.send_drag_complete(&docked);
        assert_eq!(docked.borrow().right(), SCREEN_WIDTH);

        fixture
            .manager
            .borrow_mut()
            .handle_screen_resize(Size::new(800, 600));
        assert_eq!(bar_panel.borrow().right(), 800 - 24);
        assert_eq!(bar_panel.borrow().titlebar_y(), 600 - 420);
        assert_eq!(docked.borrow().right(), 800, "right dock tracks the edge");
    }

    #[test]
    fn test_stale_drag_complete_is_ignored() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        // No drag in progress; a stray completion must be a no-op.
        fixture.send_drag_complete(&panel);
        assert_eq!(panel.borrow().right(), SCREEN_WIDTH - 24);
    }
}
