//! Interface shared by the containers that can hold panels.

use shell::geometry::{Point, Size};
use shell::window::{Timestamp, WindowId};

use crate::panel::PanelHandle;

/// Where a panel being added to a container came from. Determines the
/// entrance animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSource {
    /// Newly opened panel.
    New,
    /// Attached by being dragged into the container, drag still active.
    Dragged,
    /// Attached after being dropped.
    Dropped,
}

/// Which container a panel lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Bar,
    LeftDock,
    RightDock,
}

/// A container owns the ordering and placement of the panels inside it;
/// the panels themselves are shared handles owned by the manager.
///
/// `handle_notify_panel_dragged` returning false means the panel has
/// been dragged out of the container's reach and should be removed from
/// it; the manager then offers it to the other containers.
pub trait PanelContainer {
    fn kind(&self) -> ContainerKind;

    /// All input windows belonging to the container itself (not to its
    /// panels). Only called once, right after construction: containers
    /// create every input window they will ever need up front.
    fn input_windows(&self) -> Vec<WindowId>;

    fn add_panel(&mut self, panel: &PanelHandle, source: PanelSource);
    fn remove_panel(&mut self, panel: &PanelHandle);

    /// Is a panel (currently in no container) being dragged somewhere
    /// this container should claim it?
    fn should_add_dragged_panel(&self, panel: &PanelHandle, drag_pos: Point) -> bool;

    fn handle_input_window_button_press(
        &mut self,
        window: WindowId,
        absolute_pos: Point,
        button: u8,
        timestamp: Timestamp,
    );
    fn handle_input_window_pointer_enter(
        &mut self,
        window: WindowId,
        absolute_pos: Point,
        timestamp: Timestamp,
    );
    fn handle_input_window_pointer_leave(
        &mut self,
        window: WindowId,
        absolute_pos: Point,
        timestamp: Timestamp,
    );

    fn handle_panel_button_press(&mut self, panel: &PanelHandle, button: u8, timestamp: Timestamp);
    fn handle_panel_titlebar_pointer_enter(&mut self, panel: &PanelHandle, timestamp: Timestamp);

    /// Expand or collapse one of the container's panels.
    fn handle_set_panel_state_message(&mut self, panel: &PanelHandle, expand: bool);

    /// The panel has been dragged to `drag_pos` (right edge, titlebar
    /// top). Returns false to ask the manager to detach the panel.
    fn handle_notify_panel_dragged(&mut self, panel: &PanelHandle, drag_pos: Point) -> bool;
    fn handle_notify_panel_drag_complete(&mut self, panel: &PanelHandle);

    fn handle_focus_panel_message(&mut self, panel: &PanelHandle, timestamp: Timestamp);

    /// A configure request asked for the panel's content window to be
    /// resized.
    fn handle_panel_resize_request(&mut self, panel: &PanelHandle, requested: Size);

    /// The user finished resizing the panel with one of its handles.
    fn handle_panel_resize_by_user(&mut self, panel: &PanelHandle);

    fn handle_screen_resize(&mut self);
    fn handle_panel_urgency_change(&mut self, panel: &PanelHandle);

    /// Take the input focus if the container has something sensible to
    /// focus. Returns false otherwise.
    fn take_focus(&mut self, timestamp: Timestamp) -> bool;
}
