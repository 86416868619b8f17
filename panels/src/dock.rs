//! Left- and right-edge docks: fixed-width containers that pack panels
//! top-to-bottom.
//!
//! Docks have no packed/floating distinction (every panel is packed)
//! and reordering uses the same midpoint hysteresis as the bar, applied
//! to Y. The detach threshold is larger than the attach threshold so a
//! panel hovering at the boundary doesn't flutter in and out of the
//! dock. A panel keeps its own width while it is being dragged within
//! the dock; it is only resized to the dock width once the drag
//! completes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use shell::geometry::{Gravity, Point, Rect, Size};
use shell::window::{ActorId, StackingLayer, Timestamp, WindowId};
use shell::ShellContext;
use tracing::warn;

use crate::config::DockSettings;
use crate::container::{ContainerKind, PanelContainer, PanelSource};
use crate::panel::{PanelHandle, PanelId};

/// Which screen edge the dock is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockSide {
    Left,
    Right,
}

/// Dock-specific bookkeeping for one panel.
struct PanelInfo {
    /// Cumulative Y offset the panel snaps to when it isn't being
    /// dragged.
    snapped_y: i32,
}

pub struct PanelDock {
    ctx: Rc<ShellContext>,
    settings: DockSettings,
    side: DockSide,

    x: i32,
    y: i32,
    width: i32,
    height: i32,
    total_panel_height: i32,

    /// Top-to-bottom order.
    panels: Vec<PanelId>,
    handles: HashMap<PanelId, PanelHandle>,
    infos: HashMap<PanelId, PanelInfo>,
    dragged: Option<PanelId>,

    background: ActorId,
    background_shadow: ActorId,
    background_input: WindowId,
}

impl PanelDock {
    pub fn new(
        ctx: Rc<ShellContext>,
        side: DockSide,
        settings: DockSettings,
    ) -> Rc<RefCell<PanelDock>> {
        let ws = ctx.windows.clone();
        let width = settings.width;
        let x = match side {
            DockSide::Left => 0,
            DockSide::Right => ctx.screen_width() - width,
        };
        let height = ctx.screen_height();

        let background_input = ws.create_input_window(Rect::new(-1, -1, 1, 1));
        ws.stack_window_at_top_of_layer(background_input, StackingLayer::PanelDock);

        // Both decorations start slid offscreen past the dock's edge;
        // they slide in when the first panel attaches.
        let hidden_x = match side {
            DockSide::Left => x - width,
            DockSide::Right => x + width,
        };
        let background_shadow = ws.create_actor("panel dock background shadow");
        ws.resize_actor(background_shadow, Size::new(width, height));
        ws.move_actor(background_shadow, Point::new(hidden_x, 0), 0);
        ws.set_actor_opacity(background_shadow, 0.0, 0);
        ws.show_actor(background_shadow);
        ws.stack_actor_at_top_of_layer(background_shadow, StackingLayer::PanelDock);

        let background = ws.create_actor("panel dock background");
        ws.resize_actor(background, Size::new(width, height));
        ws.move_actor(background, Point::new(hidden_x, 0), 0);
        ws.show_actor(background);
        ws.stack_actor_at_top_of_layer(background, StackingLayer::PanelDock);

        Rc::new(RefCell::new(PanelDock {
            ctx,
            settings,
            side,
            x,
            y: 0,
            width,
            height,
            total_panel_height: 0,
            panels: Vec::new(),
            handles: HashMap::new(),
            infos: HashMap::new(),
            dragged: None,
            background,
            background_shadow,
            background_input,
        }))
    }

    pub fn side(&self) -> DockSide {
        self.side
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn is_visible(&self) -> bool {
        !self.panels.is_empty()
    }

    fn expect_handle(&self, id: PanelId) -> PanelHandle {
        self.handles
            .get(&id)
            .cloned()
            .expect("panel missing from dock store")
    }

    fn expect_info(&self, id: PanelId) -> &PanelInfo {
        self.infos.get(&id).expect("panel info missing")
    }

    /// The panel's right edge while docked: flush against the screen
    /// edge for a right dock, flush against the dock's right boundary
    /// for a left dock.
    fn docked_right(&self, panel_width: i32) -> i32 {
        match self.side {
            DockSide::Right => self.x + self.width,
            DockSide::Left => self.x + panel_width,
        }
    }

    fn show_background(&self, visible: bool) {
        let ws = &self.ctx.windows;
        let background_x = if visible {
            self.x
        } else {
            match self.side {
                DockSide::Left => self.x - self.width,
                DockSide::Right => self.x + self.width,
            }
        };
        let anim_ms = self.settings.background_anim_ms;
        if visible {
            ws.configure_window(
                self.background_input,
                Rect::new(self.x, self.y, self.width, self.height),
            );
        } else {
            ws.configure_window_offscreen(self.background_input);
        }
        ws.move_actor(self.background, Point::new(background_x, self.y), anim_ms);
        ws.move_actor(
            self.background_shadow,
            Point::new(background_x, self.y),
            anim_ms,
        );
        ws.set_actor_opacity(
            self.background_shadow,
            if visible { 1.0 } else { 0.0 },
            anim_ms,
        );
    }

    /// Same midpoint-hysteresis rule as the bar's, applied to Y: scan
    /// away from the snapped position and displace only neighbors whose
    /// midpoint the dragged panel's edge has crossed.
    fn reorder_panel(&mut self, id: PanelId) {
        let Some(source) = self.panels.iter().position(|pid| *pid == id) else {
            debug_assert!(false, "{id} not in dock");
            return;
        };
        let handle = self.expect_handle(id);
        let (titlebar_y, total_height) = {
            let panel = handle.borrow();
            (panel.titlebar_y(), panel.total_height())
        };

        let mut destination = source;
        if titlebar_y < self.expect_info(id).snapped_y {
            // Above the snapped slot: walk up past every panel whose
            // midpoint our top edge has crossed.
            for index in (0..source).rev() {
                let neighbor = self.expect_handle(self.panels[index]);
                let neighbor = neighbor.borrow();
                if titlebar_y <= neighbor.titlebar_y() + neighbor.total_height() / 2 {
                    destination = index;
                } else {
                    break;
                }
            }
        } else {
            // Below: same check with our bottom edge.
            for index in source + 1..self.panels.len() {
                let neighbor = self.expect_handle(self.panels[index]);
                let neighbor = neighbor.borrow();
                if titlebar_y + total_height > neighbor.titlebar_y() + neighbor.total_height() / 2 {
                    destination = index;
                } else {
                    break;
                }
            }
        }

        if destination != source {
            let moved = self.panels.remove(source);
            self.panels.insert(destination, moved);
            self.pack_panels(Some(id));
        }
    }

    /// Recompute cumulative snapped offsets and animate every panel
    /// that is out of place, skipping the one being dragged.
    fn pack_panels(&mut self, fixed_panel: Option<PanelId>) {
        let order = self.panels.clone();
        let mut total_height = 0;
        for id in order {
            let handle = self.expect_handle(id);
            self.infos
                .get_mut(&id)
                .expect("panel info missing")
                .snapped_y = total_height;
            let (titlebar_y, panel_total) = {
                let panel = handle.borrow();
                (panel.titlebar_y(), panel.total_height())
            };
            if fixed_panel != Some(id) && titlebar_y != total_height {
                handle
                    .borrow_mut()
                    .move_y(total_height, self.settings.pack_anim_ms);
            }
            total_height += panel_total;
        }
        self.total_panel_height = total_height;
    }

    fn focus_panel(&self, panel: &PanelHandle, timestamp: Timestamp) {
        panel.borrow_mut().take_focus(timestamp);
    }
}

impl PanelContainer for PanelDock {
    fn kind(&self) -> ContainerKind {
        match self.side {
            DockSide::Left => ContainerKind::LeftDock,
            DockSide::Right => ContainerKind::RightDock,
        }
    }

    fn input_windows(&self) -> Vec<WindowId> {
        vec![self.background_input]
    }

    fn add_panel(&mut self, panel: &PanelHandle, source: PanelSource) {
        let id = panel.borrow().id();
        debug_assert!(!self.panels.contains(&id));

        self.infos.insert(
            id,
            PanelInfo {
                snapped_y: self.total_panel_height,
            },
        );
        self.handles.insert(id, panel.clone());
        self.panels.push(id);
        self.total_panel_height += panel.borrow().total_height();
        if source == PanelSource::Dragged {
            self.dragged = Some(id);
            self.reorder_panel(id);
        }

        if self.panels.len() == 1 {
            self.show_background(true);
        }

        panel.borrow_mut().stack_at_top_of_layer(if source == PanelSource::Dragged {
            StackingLayer::DraggedPanel
        } else {
            StackingLayer::PackedPanelInDock
        });

        // Fit the panel vertically within the dock. Its width is left
        // alone for now: resizing mid-drag would make the remaining
        // drag notifications refer to stale dimensions, so that waits
        // for the drag to complete.
        let (mut panel_y, total_height, panel_width) = {
            let panel = panel.borrow();
            (panel.titlebar_y(), panel.total_height(), panel.width())
        };
        if panel_y + total_height > self.y + self.height {
            panel_y = self.y + self.height - total_height;
        }
        if panel_y < self.y {
            panel_y = self.y;
        }
        let right = self.docked_right(panel_width);
        panel.borrow_mut().move_to(right, panel_y, 0);
    }

    fn remove_panel(&mut self, panel: &PanelHandle) {
        let id = panel.borrow().id();
        if self.dragged == Some(id) {
            self.dragged = None;
        }
        let Some(index) = self.panels.iter().position(|pid| *pid == id) else {
            warn!("Got request to remove {id} but didn't find it");
            return;
        };
        self.panels.remove(index);
        self.handles.remove(&id);
        self.infos.remove(&id);

        if self.panels.is_empty() {
            self.show_background(false);
        } else {
            self.pack_panels(self.dragged);
        }
    }

    /// Claim a panel once it comes within the attach threshold of the
    /// dock's screen edge.
    fn should_add_dragged_panel(&self, panel: &PanelHandle, drag_pos: Point) -> bool {
        match self.side {
            DockSide::Right => drag_pos.x >= self.x + self.width - self.settings.attach_threshold,
            DockSide::Left => {
                drag_pos.x - panel.borrow().content_width()
                    <= self.x + self.settings.attach_threshold
            }
        }
    }

    fn handle_input_window_button_press(
        &mut self,
        _window: WindowId,
        _absolute_pos: Point,
        _button: u8,
        _timestamp: Timestamp,
    ) {
    }

    fn handle_input_window_pointer_enter(
        &mut self,
        _window: WindowId,
        _absolute_pos: Point,
        _timestamp: Timestamp,
    ) {
    }

    fn handle_input_window_pointer_leave(
        &mut self,
        _window: WindowId,
        _absolute_pos: Point,
        _timestamp: Timestamp,
    ) {
    }

    fn handle_panel_button_press(&mut self, panel: &PanelHandle, _button: u8, timestamp: Timestamp) {
        self.focus_panel(panel, timestamp);
    }

    fn handle_panel_titlebar_pointer_enter(&mut self, _panel: &PanelHandle, _timestamp: Timestamp) {}

    fn handle_set_panel_state_message(&mut self, panel: &PanelHandle, expand: bool) {
        warn!(
            "Ignoring request to {} docked {}",
            if expand { "expand" } else { "collapse" },
            panel.borrow().id()
        );
    }

    fn handle_notify_panel_dragged(&mut self, panel: &PanelHandle, drag_pos: Point) -> bool {
        let id = panel.borrow().id();
        // Dragged far enough inward? Let the manager detach us.
        match self.side {
            DockSide::Right => {
                if drag_pos.x <= self.x + self.width - self.settings.detach_threshold {
                    return false;
                }
            }
            DockSide::Left => {
                if drag_pos.x - panel.borrow().content_width()
                    >= self.x + self.settings.detach_threshold
                {
                    return false;
                }
            }
        }

        if self.dragged != Some(id) {
            self.dragged = Some(id);
            panel
                .borrow_mut()
                .stack_at_top_of_layer(StackingLayer::DraggedPanel);
            panel
                .borrow_mut()
                .set_shadow_opacity(1.0, self.settings.shadow_anim_ms);
        }

        // Cap the drag within the dock's vertical bounds.
        let total_height = panel.borrow().total_height();
        let mut drag_y = drag_pos.y;
        if drag_y + total_height > self.y + self.height {
            drag_y = self.y + self.height - total_height;
        }
        if drag_y < self.y {
            drag_y = self.y;
        }

        panel.borrow_mut().move_y(drag_y, 0);
        self.reorder_panel(id);
        true
    }

    fn handle_notify_panel_drag_complete(&mut self, panel: &PanelHandle) {
        let id = panel.borrow().id();
        if self.dragged != Some(id) {
            return;
        }
        // Settle the client windows, then adopt the dock's width.
        let (right, titlebar_y, panel_width, content_height) = {
            let panel = panel.borrow();
            (
                panel.right(),
                panel.titlebar_y(),
                panel.width(),
                panel.content_height(),
            )
        };
        panel.borrow_mut().move_to(right, titlebar_y, 0);
        if panel_width != self.width {
            let gravity = match self.side {
                DockSide::Right => Gravity::NorthEast,
                DockSide::Left => Gravity::NorthWest,
            };
            panel
                .borrow_mut()
                .resize_content(Size::new(self.width, content_height), gravity, true);
        }
        panel
            .borrow_mut()
            .set_shadow_opacity(0.0, self.settings.shadow_anim_ms);
        panel
            .borrow_mut()
            .stack_at_top_of_layer(StackingLayer::PackedPanelInDock);
        self.dragged = None;
        self.pack_panels(None);
    }

    fn handle_focus_panel_message(&mut self, panel: &PanelHandle, timestamp: Timestamp) {
        self.focus_panel(panel, timestamp);
    }

    /// Width changes are rejected, since docked panels are pinned to
    /// the dock width; height changes apply and trigger a repack.
    fn handle_panel_resize_request(&mut self, panel: &PanelHandle, requested: Size) {
        let mut requested = requested;
        let current_width = panel.borrow().content_width();
        if requested.width != current_width {
            warn!(
                "Ignoring width resize request for docked {} ({}x{} requested, width stays {})",
                panel.borrow().id(),
                requested.width,
                requested.height,
                current_width
            );
            requested.width = current_width;
        }
        panel
            .borrow_mut()
            .resize_content(requested, Gravity::NorthWest, true);
        self.pack_panels(self.dragged);
    }

    fn handle_panel_resize_by_user(&mut self, _panel: &PanelHandle) {
        self.pack_panels(self.dragged);
    }

    fn handle_screen_resize(&mut self) {
        self.height = self.ctx.screen_height();
        if self.side == DockSide::Right {
            self.x = self.ctx.screen_width() - self.width;
        }

        let visible = self.is_visible();
        let background_x = if visible {
            self.x
        } else {
            match self.side {
                DockSide::Left => self.x - self.width,
                DockSide::Right => self.x + self.width,
            }
        };
        let ws = &self.ctx.windows;
        ws.resize_actor(self.background, Size::new(self.width, self.height));
        ws.move_actor(self.background, Point::new(background_x, self.y), 0);
        ws.resize_actor(self.background_shadow, Size::new(self.width, self.height));
        ws.move_actor(self.background_shadow, Point::new(background_x, self.y), 0);
        if visible {
            ws.configure_window(
                self.background_input,
                Rect::new(self.x, self.y, self.width, self.height),
            );
        }

        // A right dock has to carry its panels along with the edge.
        if self.side == DockSide::Right {
            let order = self.panels.clone();
            for id in order {
                let handle = self.expect_handle(id);
                handle.borrow_mut().move_x(self.x + self.width, 0);
            }
        }
    }

    fn handle_panel_urgency_change(&mut self, _panel: &PanelHandle) {}

    fn take_focus(&mut self, timestamp: Timestamp) -> bool {
        let Some(first) = self.panels.first().copied() else {
            return false;
        };
        let handle = self.expect_handle(first);
        self.focus_panel(&handle, timestamp);
        true
    }
}

impl Drop for PanelDock {
    fn drop(&mut self) {
        self.ctx.windows.destroy_window(self.background_input);
        self.ctx.windows.destroy_actor(self.background);
        self.ctx.windows.destroy_actor(self.background_shadow);
    }
}
