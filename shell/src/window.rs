//! The window-server and compositor abstraction consumed by the panel
//! subsystem.
//!
//! Everything the engine does to a window (moving, resizing, stacking,
//! grabs, the two fallible peer notifications) goes through the
//! [`WindowSystem`] trait. Move/scale/opacity requests carry an animation
//! duration and are fire-and-forget: the engine never waits for an
//! animation to complete.
//!
//! Client windows (panel content and titlebars) are described by the
//! embedder with a [`WindowInfo`]; invisible helper rectangles (resize
//! handles, the show-collapsed strip, the anchor) are *input windows*
//! created and destroyed through the trait. Purely visual decorations
//! (separator shadows, the resize preview box, dock backgrounds) are
//! compositor *actors* with their own id space.

use crate::geometry::{Gravity, Point, Rect, Size};

/// Server-assigned identifier for a client or input window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Identifier for a compositor decoration actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub u64);

/// Server timestamp attached to input events and focus changes.
pub type Timestamp = u64;

/// Stacking layers, bottom-relevant subset used by panels. Stacking a
/// window "at the top of" a layer places it above everything else in
/// that layer but below all higher layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackingLayer {
    PackedPanelInBar,
    FloatingPanelInBar,
    PackedPanelInDock,
    PanelDock,
    PanelBarInputWindow,
    DraggedPanel,
    FullscreenPanel,
}

/// Min/max size constraints published by a client window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub min_size: Option<Size>,
    pub max_size: Option<Size>,
}

/// How much user-initiated resizing the panel's owner permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserResizeType {
    #[default]
    Both,
    Horizontal,
    Vertical,
    Disabled,
}

/// Typed rendering of the parameter vector the owning process attaches
/// to a panel's content window.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelParams {
    /// Urgency hint at map time.
    pub urgent: bool,
    /// Resize directions the owner allows the user to drag.
    pub user_resize: UserResizeType,
    /// Content window of the panel this one should open to the left of.
    pub creator: Option<WindowId>,
    /// Whether the panel asked for the focus when it was opened.
    pub focus_requested: bool,
}

impl PanelParams {
    pub fn new() -> Self {
        Self {
            focus_requested: true,
            ..Self::default()
        }
    }
}

/// Embedder-supplied description of a mapped client window.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub id: WindowId,
    pub client_size: Size,
    pub size_hints: SizeHints,
    pub params: PanelParams,
}

/// Failure reported by a peer-process notification or a persisted state
/// marker update.
#[derive(Debug, Clone, thiserror::Error)]
#[error("peer notification failed for window {window:?}: {reason}")]
pub struct NotifyError {
    pub window: WindowId,
    pub reason: String,
}

/// Mutators and queries against the window server and compositor.
///
/// All methods are infallible requests except the two notifications;
/// geometry errors are the server's problem, not ours.
pub trait WindowSystem {
    // -- window lifecycle ---------------------------------------------------

    /// Create an invisible input-only window.
    fn create_input_window(&self, bounds: Rect) -> WindowId;
    fn destroy_window(&self, id: WindowId);
    /// Ask the owning client to close the window (used for transients).
    fn close_window(&self, id: WindowId);

    // -- geometry -----------------------------------------------------------

    fn configure_window(&self, id: WindowId, bounds: Rect);
    /// Park a window offscreen without destroying it.
    fn configure_window_offscreen(&self, id: WindowId);
    fn move_window(&self, id: WindowId, position: Point, anim_ms: u32);
    fn move_window_x(&self, id: WindowId, x: i32, anim_ms: u32);
    fn move_window_y(&self, id: WindowId, y: i32, anim_ms: u32);
    fn resize_window(&self, id: WindowId, size: Size, gravity: Gravity);

    // -- presentation -------------------------------------------------------

    fn set_window_visibility(&self, id: WindowId, visible: bool);
    fn set_shadow_opacity(&self, id: WindowId, opacity: f64, anim_ms: u32);
    fn stack_window_at_top_of_layer(&self, id: WindowId, layer: StackingLayer);
    fn stack_window_below(&self, id: WindowId, sibling: WindowId);

    // -- decoration actors --------------------------------------------------

    fn create_actor(&self, name: &str) -> ActorId;
    fn destroy_actor(&self, id: ActorId);
    fn move_actor(&self, id: ActorId, position: Point, anim_ms: u32);
    fn resize_actor(&self, id: ActorId, size: Size);
    fn set_actor_opacity(&self, id: ActorId, opacity: f64, anim_ms: u32);
    fn show_actor(&self, id: ActorId);
    fn raise_actor_above_window(&self, id: ActorId, window: WindowId);
    fn stack_actor_at_top_of_layer(&self, id: ActorId, layer: StackingLayer);

    // -- input --------------------------------------------------------------

    /// Install a passive grab so the press/motion/release sequence for
    /// `button` is delivered without an active capture race.
    fn add_button_grab(&self, id: WindowId, button: u8);
    fn remove_button_grab(&self, id: WindowId, button: u8);
    /// Explicitly end the active pointer capture. A passive-grab capture
    /// otherwise persists until every button is released.
    fn release_pointer_grab(&self, timestamp: Timestamp);
    fn query_pointer(&self) -> Point;

    // -- focus --------------------------------------------------------------

    fn focus_window(&self, id: WindowId, timestamp: Timestamp);
    fn focused_window(&self) -> Option<WindowId>;

    // -- peer notifications -------------------------------------------------

    /// Tell the panel's owning process about its expanded/collapsed state.
    fn notify_panel_state(&self, id: WindowId, expanded: bool) -> Result<(), NotifyError>;
    /// Update the persisted collapsed-state marker on the window.
    fn set_collapsed_marker(&self, id: WindowId, collapsed: bool) -> Result<(), NotifyError>;
}
