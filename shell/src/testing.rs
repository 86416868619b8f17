//! Recording window-system double for tests.
//!
//! Every request is appended to an operations log that tests inspect;
//! the pointer position, focus, and notification failures are scripted
//! by the test. Input-window geometry is tracked so tests can assert
//! that helper windows end up onscreen, offscreen, or covering a
//! particular strip.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::geometry::{Gravity, Point, Rect, Size};
use crate::window::{
    ActorId, NotifyError, StackingLayer, Timestamp, WindowId, WindowSystem,
};

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOp {
    CreateInputWindow(WindowId, Rect),
    DestroyWindow(WindowId),
    CloseWindow(WindowId),
    ConfigureWindow(WindowId, Rect),
    ConfigureWindowOffscreen(WindowId),
    MoveWindow {
        id: WindowId,
        position: Point,
        anim_ms: u32,
    },
    MoveWindowX {
        id: WindowId,
        x: i32,
        anim_ms: u32,
    },
    MoveWindowY {
        id: WindowId,
        y: i32,
        anim_ms: u32,
    },
    ResizeWindow {
        id: WindowId,
        size: Size,
        gravity: Gravity,
    },
    SetWindowVisibility(WindowId, bool),
    SetShadowOpacity {
        id: WindowId,
        opacity: f64,
        anim_ms: u32,
    },
    StackWindowAtTopOfLayer(WindowId, StackingLayer),
    StackWindowBelow(WindowId, WindowId),
    CreateActor(ActorId, String),
    DestroyActor(ActorId),
    MoveActor {
        id: ActorId,
        position: Point,
        anim_ms: u32,
    },
    ResizeActor(ActorId, Size),
    SetActorOpacity {
        id: ActorId,
        opacity: f64,
        anim_ms: u32,
    },
    ShowActor(ActorId),
    RaiseActorAboveWindow(ActorId, WindowId),
    StackActorAtTopOfLayer(ActorId, StackingLayer),
    AddButtonGrab(WindowId, u8),
    RemoveButtonGrab(WindowId, u8),
    ReleasePointerGrab(Timestamp),
    FocusWindow(WindowId, Timestamp),
    NotifyPanelState(WindowId, bool),
    SetCollapsedMarker(WindowId, bool),
}

#[derive(Default)]
pub struct MockWindowSystem {
    next_window: Cell<u64>,
    next_actor: Cell<u64>,
    ops: RefCell<Vec<WindowOp>>,
    pointer: Cell<Point>,
    focused: Cell<Option<WindowId>>,
    fail_notifications: Cell<bool>,
    /// Current bounds of every input window; `None` means parked
    /// offscreen.
    input_bounds: RefCell<HashMap<WindowId, Option<Rect>>>,
}

impl MockWindowSystem {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Allocate an id for a client (content or titlebar) window the test
    /// pretends was mapped by a peer process.
    pub fn alloc_client_window(&self) -> WindowId {
        self.alloc_window_id()
    }

    fn alloc_window_id(&self) -> WindowId {
        let id = self.next_window.get();
        self.next_window.set(id + 1);
        WindowId(id)
    }

    fn record(&self, op: WindowOp) {
        self.ops.borrow_mut().push(op);
    }

    pub fn ops(&self) -> Vec<WindowOp> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    pub fn set_pointer(&self, position: Point) {
        self.pointer.set(position);
    }

    pub fn set_focused(&self, window: Option<WindowId>) {
        self.focused.set(window);
    }

    /// Make subsequent peer notifications fail.
    pub fn set_fail_notifications(&self, fail: bool) {
        self.fail_notifications.set(fail);
    }

    /// Current bounds of an input window, or `None` if it is parked
    /// offscreen or was never configured.
    pub fn input_window_bounds(&self, id: WindowId) -> Option<Rect> {
        self.input_bounds.borrow().get(&id).copied().flatten()
    }
}

impl WindowSystem for MockWindowSystem {
    fn create_input_window(&self, bounds: Rect) -> WindowId {
        let id = self.alloc_window_id();
        self.input_bounds.borrow_mut().insert(id, Some(bounds));
        self.record(WindowOp::CreateInputWindow(id, bounds));
        id
    }

    fn destroy_window(&self, id: WindowId) {
        self.input_bounds.borrow_mut().remove(&id);
        self.record(WindowOp::DestroyWindow(id));
    }

    fn close_window(&self, id: WindowId) {
        self.record(WindowOp::CloseWindow(id));
    }

    fn configure_window(&self, id: WindowId, bounds: Rect) {
        self.input_bounds.borrow_mut().insert(id, Some(bounds));
        self.record(WindowOp::ConfigureWindow(id, bounds));
    }

    fn configure_window_offscreen(&self, id: WindowId) {
        self.input_bounds.borrow_mut().insert(id, None);
        self.record(WindowOp::ConfigureWindowOffscreen(id));
    }

    fn move_window(&self, id: WindowId, position: Point, anim_ms: u32) {
        self.record(WindowOp::MoveWindow {
            id,
            position,
            anim_ms,
        });
    }

    fn move_window_x(&self, id: WindowId, x: i32, anim_ms: u32) {
        self.record(WindowOp::MoveWindowX { id, x, anim_ms });
    }

    fn move_window_y(&self, id: WindowId, y: i32, anim_ms: u32) {
        self.record(WindowOp::MoveWindowY { id, y, anim_ms });
    }

    fn resize_window(&self, id: WindowId, size: Size, gravity: Gravity) {
        self.record(WindowOp::ResizeWindow { id, size, gravity });
    }

    fn set_window_visibility(&self, id: WindowId, visible: bool) {
        self.record(WindowOp::SetWindowVisibility(id, visible));
    }

    fn set_shadow_opacity(&self, id: WindowId, opacity: f64, anim_ms: u32) {
        self.record(WindowOp::SetShadowOpacity {
            id,
            opacity,
            anim_ms,
        });
    }

    fn stack_window_at_top_of_layer(&self, id: WindowId, layer: StackingLayer) {
        self.record(WindowOp::StackWindowAtTopOfLayer(id, layer));
    }

    fn stack_window_below(&self, id: WindowId, sibling: WindowId) {
        self.record(WindowOp::StackWindowBelow(id, sibling));
    }

    fn create_actor(&self, name: &str) -> ActorId {
        let id = ActorId(self.next_actor.get());
        self.next_actor.set(id.0 + 1);
        self.record(WindowOp::CreateActor(id, name.to_string()));
        id
    }

    fn destroy_actor(&self, id: ActorId) {
        self.record(WindowOp::DestroyActor(id));
    }

    fn move_actor(&self, id: ActorId, position: Point, anim_ms: u32) {
        self.record(WindowOp::MoveActor {
            id,
            position,
            anim_ms,
        });
    }

    fn resize_actor(&self, id: ActorId, size: Size) {
        self.record(WindowOp::ResizeActor(id, size));
    }

    fn set_actor_opacity(&self, id: ActorId, opacity: f64, anim_ms: u32) {
        self.record(WindowOp::SetActorOpacity {
            id,
            opacity,
            anim_ms,
        });
    }

    fn show_actor(&self, id: ActorId) {
        self.record(WindowOp::ShowActor(id));
    }

    fn raise_actor_above_window(&self, id: ActorId, window: WindowId) {
        self.record(WindowOp::RaiseActorAboveWindow(id, window));
    }

    fn stack_actor_at_top_of_layer(&self, id: ActorId, layer: StackingLayer) {
        self.record(WindowOp::StackActorAtTopOfLayer(id, layer));
    }

    fn add_button_grab(&self, id: WindowId, button: u8) {
        self.record(WindowOp::AddButtonGrab(id, button));
    }

    fn remove_button_grab(&self, id: WindowId, button: u8) {
        self.record(WindowOp::RemoveButtonGrab(id, button));
    }

    fn release_pointer_grab(&self, timestamp: Timestamp) {
        self.record(WindowOp::ReleasePointerGrab(timestamp));
    }

    fn query_pointer(&self) -> Point {
        self.pointer.get()
    }

    fn focus_window(&self, id: WindowId, timestamp: Timestamp) {
        self.focused.set(Some(id));
        self.record(WindowOp::FocusWindow(id, timestamp));
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    fn notify_panel_state(&self, id: WindowId, expanded: bool) -> Result<(), NotifyError> {
        self.record(WindowOp::NotifyPanelState(id, expanded));
        if self.fail_notifications.get() {
            return Err(NotifyError {
                window: id,
                reason: "peer unreachable".to_string(),
            });
        }
        Ok(())
    }

    fn set_collapsed_marker(&self, id: WindowId, collapsed: bool) -> Result<(), NotifyError> {
        self.record(WindowOp::SetCollapsedMarker(id, collapsed));
        if self.fail_notifications.get() {
            return Err(NotifyError {
                window: id,
                reason: "peer unreachable".to_string(),
            });
        }
        Ok(())
    }
}
