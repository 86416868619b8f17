//! A panel: a pop-up composed of a content window and a titlebar window.
//!
//! The titlebar sits above the content and the two windows share a right
//! edge; `right()` is the single horizontal anchor for both. A panel
//! knows nothing about its siblings; ordering and placement belong to
//! the container holding it.
//!
//! Interactive resizing happens through five invisible handle windows
//! (top, top-left, top-right, left, right) carrying passive button
//! grabs. Motion events during a resize are only recorded; a ~25 ms
//! periodic callback converts the latest pointer offset into a clamped
//! size change, either resizing live (opaque mode) or dragging a
//! translucent preview box that is applied on release.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use shell::geometry::{Gravity, Point, Rect, Size};
use shell::window::{
    NotifyError, SizeHints, StackingLayer, Timestamp, UserResizeType, WindowId, WindowInfo,
};
use shell::ShellContext;
use tracing::{debug, warn};

use crate::coalescer::MotionEventCoalescer;
use crate::config::ResizeSettings;
use crate::resize_box::ResizeBox;

/// Stable identity of a panel, derived from its content window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub WindowId);

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "panel {}", self.0 .0)
    }
}

pub type PanelHandle = Rc<RefCell<Panel>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleKind {
    Top,
    TopLeft,
    TopRight,
    Left,
    Right,
}

struct ResizeHandles {
    top: WindowId,
    top_left: WindowId,
    top_right: WindowId,
    left: WindowId,
    right: WindowId,
}

impl ResizeHandles {
    fn all(&self) -> [WindowId; 5] {
        [
            self.top,
            self.top_left,
            self.top_right,
            self.left,
            self.right,
        ]
    }

    fn kind_of(&self, id: WindowId) -> Option<HandleKind> {
        if id == self.top {
            Some(HandleKind::Top)
        } else if id == self.top_left {
            Some(HandleKind::TopLeft)
        } else if id == self.top_right {
            Some(HandleKind::TopRight)
        } else if id == self.left {
            Some(HandleKind::Left)
        } else if id == self.right {
            Some(HandleKind::Right)
        } else {
            None
        }
    }
}

/// State of an in-progress handle drag.
#[derive(Debug, Clone, Copy)]
struct ResizeDrag {
    handle: HandleKind,
    start: Point,
    orig: Size,
    last: Size,
    gravity: Gravity,
}

pub struct Panel {
    ctx: Rc<ShellContext>,
    settings: ResizeSettings,
    content: WindowInfo,
    titlebar: WindowInfo,

    is_expanded: bool,
    is_fullscreen: bool,
    is_urgent: bool,

    /// Saved bounds. While fullscreen these may differ from the actual
    /// window configuration; they are replayed when fullscreen ends.
    content_bounds: Rect,
    titlebar_bounds: Rect,
    /// Layer to restore when fullscreen ends.
    stacking_layer: StackingLayer,

    resize_box: Option<ResizeBox>,
    resize_coalescer: MotionEventCoalescer,
    resize_drag: Option<ResizeDrag>,

    min_content: Size,
    max_content: Size,

    handles: ResizeHandles,
    resizable: bool,
    horizontal_resize_allowed: bool,
    vertical_resize_allowed: bool,

    /// Windows are shown lazily by the first `move_to()`.
    composited_windows_set_up: bool,
    /// During a positional drag, input-window reconfiguration is
    /// deferred until the drag ends.
    being_dragged: bool,

    /// Dialog windows owned by this panel; force-closed on destruction
    /// and whenever the panel moves, resizes, or collapses.
    transients: Vec<WindowId>,

    /// Shadow drawn between the titlebar and the content window.
    separator: shell::window::ActorId,
}

impl Panel {
    /// The windows remain untouched until `move_to()` is invoked; the
    /// embedder keeps freshly mapped panel windows offscreen until their
    /// container places them.
    pub fn new(
        ctx: Rc<ShellContext>,
        content: WindowInfo,
        titlebar: WindowInfo,
        is_expanded: bool,
        settings: ResizeSettings,
    ) -> PanelHandle {
        Rc::new_cyclic(|weak: &Weak<RefCell<Panel>>| {
            let ws = ctx.windows.clone();
            let handles = ResizeHandles {
                top: ws.create_input_window(Rect::new(-1, -1, 1, 1)),
                top_left: ws.create_input_window(Rect::new(-1, -1, 1, 1)),
                top_right: ws.create_input_window(Rect::new(-1, -1, 1, 1)),
                left: ws.create_input_window(Rect::new(-1, -1, 1, 1)),
                right: ws.create_input_window(Rect::new(-1, -1, 1, 1)),
            };
            // Passive grabs so we get the whole press/motion/release
            // sequence without racing an active capture request.
            for id in handles.all() {
                ws.add_button_grab(id, 1);
            }

            ws.set_window_visibility(content.id, false);
            ws.set_window_visibility(titlebar.id, false);

            let (min_content, max_content) =
                content_size_limits(&content.size_hints, &settings);
            let capped = Size::new(
                content
                    .client_size
                    .width
                    .max(min_content.width)
                    .min(max_content.width),
                content
                    .client_size
                    .height
                    .max(min_content.height)
                    .min(max_content.height),
            );
            if capped != content.client_size {
                warn!(
                    "Capped initial size of {} to {}x{} (window was {}x{})",
                    PanelId(content.id),
                    capped.width,
                    capped.height,
                    content.client_size.width,
                    content.client_size.height
                );
                ws.resize_window(content.id, capped, Gravity::NorthWest);
            }

            let (horizontal_resize_allowed, vertical_resize_allowed) =
                match content.params.user_resize {
                    UserResizeType::Both => (true, true),
                    UserResizeType::Horizontal => (true, false),
                    UserResizeType::Vertical => (false, true),
                    UserResizeType::Disabled => (false, false),
                };

            let separator = ws.create_actor("panel separator shadow");
            ws.resize_actor(separator, Size::new(capped.width, 0));
            ws.raise_actor_above_window(separator, content.id);

            // Tell the peer process what state the panel is in; if we
            // crashed and restarted it must agree with us.
            if let Err(error) = ws.notify_panel_state(content.id, is_expanded) {
                warn!("{}", error);
            }
            if let Err(error) = ws.set_collapsed_marker(content.id, !is_expanded) {
                warn!("{}", error);
            }

            let tick_target = weak.clone();
            let resize_coalescer = MotionEventCoalescer::new(
                ctx.events.clone(),
                Box::new(move || {
                    if let Some(panel) = tick_target.upgrade() {
                        panel.borrow_mut().apply_resize();
                    }
                }),
                settings.update_interval_ms,
            );

            let is_urgent = content.params.urgent;
            let content_bounds = Rect::from_parts(Point::new(0, 0), capped);
            let titlebar_bounds = Rect::from_parts(Point::new(0, 0), titlebar.client_size);

            RefCell::new(Panel {
                ctx,
                settings,
                content,
                titlebar,
                is_expanded,
                is_fullscreen: false,
                is_urgent,
                content_bounds,
                titlebar_bounds,
                stacking_layer: StackingLayer::PackedPanelInBar,
                resize_box: None,
                resize_coalescer,
                resize_drag: None,
                min_content,
                max_content,
                handles,
                resizable: false,
                horizontal_resize_allowed,
                vertical_resize_allowed,
                composited_windows_set_up: false,
                being_dragged: false,
                transients: Vec::new(),
                separator,
            })
        })
    }

    // -- identity and geometry accessors ------------------------------------

    pub fn id(&self) -> PanelId {
        PanelId(self.content.id)
    }

    pub fn content_id(&self) -> WindowId {
        self.content.id
    }

    pub fn titlebar_id(&self) -> WindowId {
        self.titlebar.id
    }

    /// One pixel beyond the shared right edge of both windows.
    pub fn right(&self) -> i32 {
        self.content_bounds.right()
    }

    pub fn content_x(&self) -> i32 {
        self.content_bounds.x
    }

    pub fn titlebar_x(&self) -> i32 {
        self.titlebar_bounds.x
    }

    pub fn content_center(&self) -> i32 {
        self.content_x() + self.width() / 2
    }

    pub fn content_y(&self) -> i32 {
        self.content_bounds.y
    }

    pub fn titlebar_y(&self) -> i32 {
        self.titlebar_bounds.y
    }

    pub fn width(&self) -> i32 {
        self.content_bounds.width
    }

    pub fn content_width(&self) -> i32 {
        self.content_bounds.width
    }

    pub fn titlebar_width(&self) -> i32 {
        self.titlebar_bounds.width
    }

    pub fn content_height(&self) -> i32 {
        self.content_bounds.height
    }

    pub fn titlebar_height(&self) -> i32 {
        self.titlebar_bounds.height
    }

    pub fn total_height(&self) -> i32 {
        self.content_height() + self.titlebar_height()
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    pub fn is_urgent(&self) -> bool {
        self.is_urgent
    }

    /// Called by the manager when the content window's urgency hint
    /// changes.
    pub fn set_is_urgent(&mut self, urgent: bool) {
        self.is_urgent = urgent;
    }

    pub fn is_focused(&self) -> bool {
        self.ctx.windows.focused_window() == Some(self.content.id)
    }

    /// Is the user currently dragging one of the resize handles?
    pub fn is_being_resized_by_user(&self) -> bool {
        self.resize_drag.is_some()
    }

    pub fn creator(&self) -> Option<WindowId> {
        self.content.params.creator
    }

    pub fn focus_requested(&self) -> bool {
        self.content.params.focus_requested
    }

    pub fn input_windows(&self) -> Vec<WindowId> {
        self.handles.all().to_vec()
    }

    pub fn owns_input_window(&self, id: WindowId) -> bool {
        self.handles.kind_of(id).is_some()
    }

    // -- movement -----------------------------------------------------------

    /// Move the panel. `right` is one pixel beyond the shared right edge
    /// and `y` is the top of the titlebar. The first call also makes the
    /// windows visible.
    pub fn move_to(&mut self, right: i32, y: i32, anim_ms: u32) {
        self.titlebar_bounds.x = right - self.titlebar_bounds.width;
        self.titlebar_bounds.y = y;
        self.content_bounds.x = right - self.content_bounds.width;
        self.content_bounds.y = y + self.titlebar_bounds.height;

        self.close_transients();

        if self.can_configure_windows() {
            let ws = &self.ctx.windows;
            ws.move_window(self.titlebar.id, self.titlebar_bounds.position(), anim_ms);
            ws.move_window(self.content.id, self.content_bounds.position(), anim_ms);
            ws.move_actor(self.separator, self.content_bounds.position(), anim_ms);
            if !self.composited_windows_set_up {
                ws.set_window_visibility(self.titlebar.id, true);
                ws.set_window_visibility(self.content.id, true);
                ws.show_actor(self.separator);
                self.composited_windows_set_up = true;
            }
            if !self.being_dragged {
                self.configure_input_windows();
            }
        }
    }

    pub fn move_x(&mut self, right: i32, anim_ms: u32) {
        debug_assert!(
            self.composited_windows_set_up,
            "move_to() must be called initially to configure the windows"
        );
        self.titlebar_bounds.x = right - self.titlebar_bounds.width;
        self.content_bounds.x = right - self.content_bounds.width;

        self.close_transients();

        if self.can_configure_windows() {
            let ws = &self.ctx.windows;
            ws.move_window_x(self.titlebar.id, self.titlebar_bounds.x, anim_ms);
            ws.move_window_x(self.content.id, self.content_bounds.x, anim_ms);
            ws.move_actor(self.separator, self.content_bounds.position(), anim_ms);
            if !self.being_dragged {
                self.configure_input_windows();
            }
        }
    }

    pub fn move_y(&mut self, y: i32, anim_ms: u32) {
        debug_assert!(
            self.composited_windows_set_up,
            "move_to() must be called initially to configure the windows"
        );
        self.titlebar_bounds.y = y;
        self.content_bounds.y = y + self.titlebar_bounds.height;

        self.close_transients();

        if self.can_configure_windows() {
            let ws = &self.ctx.windows;
            ws.move_window_y(self.titlebar.id, self.titlebar_bounds.y, anim_ms);
            ws.move_window_y(self.content.id, self.content_bounds.y, anim_ms);
            ws.move_actor(self.separator, self.content_bounds.position(), anim_ms);
            if !self.being_dragged {
                self.configure_input_windows();
            }
        }
    }

    /// Set the titlebar's width, keeping it right-aligned with the
    /// content window.
    pub fn set_titlebar_width(&mut self, width: i32) {
        debug_assert!(width > 0);
        self.titlebar_bounds
            .resize(Size::new(width, self.titlebar_bounds.height), Gravity::NorthEast);
        if self.can_configure_windows() {
            self.ctx.windows.resize_window(
                self.titlebar.id,
                self.titlebar_bounds.size(),
                Gravity::NorthEast,
            );
        }
    }

    pub fn set_shadow_opacity(&mut self, opacity: f64, anim_ms: u32) {
        self.ctx
            .windows
            .set_shadow_opacity(self.titlebar.id, opacity, anim_ms);
        self.ctx
            .windows
            .set_shadow_opacity(self.content.id, opacity, anim_ms);
    }

    /// Enable or disable the resize handles. Disabled handles are parked
    /// offscreen rather than destroyed so re-enabling is cheap.
    pub fn set_resizable(&mut self, resizable: bool) {
        if resizable != self.resizable {
            self.resizable = resizable;
            self.configure_input_windows();
        }
    }

    pub fn stack_at_top_of_layer(&mut self, layer: StackingLayer) {
        self.stacking_layer = layer;
        if self.can_configure_windows() {
            let ws = &self.ctx.windows;
            // Titlebar above content within the layer; the input windows
            // go directly below the content so the corner handles never
            // occlude the titlebar.
            ws.stack_window_at_top_of_layer(self.content.id, layer);
            ws.stack_window_at_top_of_layer(self.titlebar.id, layer);
            ws.raise_actor_above_window(self.separator, self.content.id);
            self.stack_input_windows();
        }
    }

    /// Update the expanded flag, notify the peer process, and update the
    /// persisted collapsed marker. The local flag is never rolled back
    /// on notification failure.
    pub fn set_expanded_state(&mut self, expanded: bool) -> Result<(), NotifyError> {
        if expanded == self.is_expanded {
            return Ok(());
        }
        self.is_expanded = expanded;
        if !expanded {
            self.close_transients();
        }
        let notified = self.ctx.windows.notify_panel_state(self.content.id, expanded);
        let marked = self
            .ctx
            .windows
            .set_collapsed_marker(self.content.id, !expanded);
        notified.and(marked)
    }

    pub fn take_focus(&mut self, timestamp: Timestamp) {
        self.ctx.windows.focus_window(self.content.id, timestamp);
    }

    // -- resizing -----------------------------------------------------------

    /// Resize the content window, clamping to the allowed size range.
    /// The titlebar is re-aligned above the content and resized to
    /// match its width; the handle windows are optionally reconfigured.
    pub fn resize_content(&mut self, size: Size, gravity: Gravity, configure_handles: bool) {
        debug_assert!(size.width > 0 && size.height > 0);
        let capped = Size::new(
            size.width.max(self.min_content.width).min(self.max_content.width),
            size.height
                .max(self.min_content.height)
                .min(self.max_content.height),
        );
        if capped != size {
            warn!(
                "Capped resize of {} to {}x{} (request was for {}x{})",
                self.id(),
                capped.width,
                capped.height,
                size.width,
                size.height
            );
        }
        if capped == self.content_bounds.size() {
            return;
        }

        let changing_height = capped.height != self.content_bounds.height;

        self.content_bounds.resize(capped, gravity);
        self.titlebar_bounds
            .resize(Size::new(capped.width, self.titlebar_bounds.height), gravity);
        if changing_height {
            self.titlebar_bounds.y = self.content_bounds.y - self.titlebar_bounds.height;
        }

        self.close_transients();

        if self.can_configure_windows() {
            let ws = &self.ctx.windows;
            ws.resize_window(self.content.id, capped, gravity);
            ws.resize_window(
                self.titlebar.id,
                Size::new(capped.width, self.titlebar_bounds.height),
                gravity,
            );
            ws.move_actor(self.separator, self.content_bounds.position(), 0);
            ws.resize_actor(self.separator, Size::new(capped.width, 0));
            if changing_height {
                ws.move_window(self.titlebar.id, self.titlebar_bounds.position(), 0);
            }
        }

        if configure_handles {
            self.configure_input_windows();
        }
    }

    /// Enter or leave fullscreen. While fullscreen, position/size/
    /// stacking changes are only recorded into the saved bounds and
    /// layer; leaving fullscreen replays them in one batch. Idempotent
    /// if the state is unchanged.
    pub fn set_fullscreen_state(&mut self, fullscreen: bool) {
        if fullscreen == self.is_fullscreen {
            return;
        }
        debug!("Setting fullscreen state for {} to {}", self.id(), fullscreen);
        self.is_fullscreen = fullscreen;

        self.close_transients();

        let ws = self.ctx.windows.clone();
        if fullscreen {
            ws.stack_window_at_top_of_layer(self.content.id, StackingLayer::FullscreenPanel);
            ws.move_window(self.content.id, Point::new(0, 0), 0);
            ws.resize_window(self.content.id, self.ctx.screen_size(), Gravity::NorthWest);
            if !self.is_focused() {
                warn!(
                    "Fullscreening unfocused {}, so automatically giving it the focus",
                    self.id()
                );
                let timestamp = self.ctx.events.now_ms();
                ws.focus_window(self.content.id, timestamp);
            }
        } else {
            ws.resize_window(
                self.content.id,
                self.content_bounds.size(),
                Gravity::NorthWest,
            );
            ws.move_window(self.content.id, self.content_bounds.position(), 0);
            ws.resize_window(
                self.titlebar.id,
                self.titlebar_bounds.size(),
                Gravity::NorthWest,
            );
            ws.move_window(self.titlebar.id, self.titlebar_bounds.position(), 0);
            ws.move_actor(self.separator, self.content_bounds.position(), 0);
            ws.resize_actor(self.separator, Size::new(self.content_bounds.width, 0));
            self.stack_at_top_of_layer(self.stacking_layer);
        }
    }

    /// Containers reposition panels on screen resize; this only gives a
    /// fullscreen panel the chance to track the new screen size.
    pub fn handle_screen_resize(&mut self) {
        if self.is_fullscreen {
            debug!(
                "Resizing fullscreen {} to {}x{} in response to screen resize",
                self.id(),
                self.ctx.screen_width(),
                self.ctx.screen_height()
            );
            self.ctx.windows.resize_window(
                self.content.id,
                self.ctx.screen_size(),
                Gravity::NorthWest,
            );
        }
    }

    /// The content window published new size hints; recompute the
    /// allowed range (without resizing anything now).
    pub fn handle_content_size_hints_change(&mut self, hints: SizeHints) {
        self.content.size_hints = hints;
        let (min, max) = content_size_limits(&self.content.size_hints, &self.settings);
        self.min_content = min;
        self.max_content = max;
    }

    // -- positional drags ---------------------------------------------------

    /// The panel is being dragged to a new position; defer handle-window
    /// updates until the drag ends to cut down on server traffic.
    pub fn handle_drag_start(&mut self) {
        if self.being_dragged {
            return;
        }
        self.being_dragged = true;
    }

    pub fn handle_drag_end(&mut self) {
        if !self.being_dragged {
            return;
        }
        self.being_dragged = false;
        self.configure_input_windows();
    }

    // -- transient (dialog) children ----------------------------------------

    pub fn add_transient(&mut self, window: WindowId) {
        if !self.transients.contains(&window) {
            self.transients.push(window);
        }
    }

    pub fn remove_transient(&mut self, window: WindowId) {
        self.transients.retain(|id| *id != window);
    }

    pub fn close_transients(&mut self) {
        for window in self.transients.drain(..) {
            self.ctx.windows.close_window(window);
        }
    }

    // -- interactive resize -------------------------------------------------

    /// Button press in one of the handle windows: begin a resize
    /// session.
    pub fn handle_input_window_button_press(
        &mut self,
        window: WindowId,
        position: Point,
        button: u8,
        _timestamp: Timestamp,
    ) {
        if button != 1 {
            return;
        }
        let Some(handle) = self.handles.kind_of(window) else {
            warn!("Ignoring button press in unknown input window {:?}", window);
            return;
        };
        if self.resize_drag.is_some() {
            debug_assert!(false, "button press during an active resize drag");
            warn!(
                "Ignoring button press in {:?} for {}: resize drag already active",
                window,
                self.id()
            );
            return;
        }

        let size = self.content_bounds.size();
        self.resize_drag = Some(ResizeDrag {
            handle,
            start: position,
            orig: size,
            last: size,
            gravity: Gravity::NorthWest,
        });
        self.resize_coalescer.start();

        if !self.settings.opaque {
            let bounds = Rect::new(
                self.titlebar_x(),
                self.titlebar_y(),
                self.content_width(),
                self.total_height(),
            );
            self.resize_box = Some(ResizeBox::new(
                self.ctx.clone(),
                bounds,
                self.settings.box_opacity,
            ));
        }
    }

    /// Motion during a resize session: record the position, nothing
    /// more. The periodic callback does the work.
    pub fn handle_input_window_pointer_motion(&mut self, window: WindowId, position: Point) {
        match self.resize_drag {
            Some(drag) if self.handles.kind_of(window) == Some(drag.handle) => {
                self.resize_coalescer.store_position(position);
            }
            _ => warn!(
                "Ignoring motion event for unexpected input window {:?} on {}",
                window,
                self.id()
            ),
        }
    }

    /// Button release. Returns true when this ended the resize session
    /// (the caller should report a user resize to the panel's
    /// container).
    pub fn handle_input_window_button_release(
        &mut self,
        window: WindowId,
        position: Point,
        button: u8,
        timestamp: Timestamp,
    ) -> bool {
        if button != 1 {
            return false;
        }
        let Some(active) = self.resize_drag.map(|drag| drag.handle) else {
            warn!(
                "Ignoring button release in {:?} on {}: no resize drag in progress",
                window,
                self.id()
            );
            return false;
        };
        if self.handles.kind_of(window) != Some(active) {
            warn!(
                "Ignoring button release for unexpected input window {:?} on {}",
                window,
                self.id()
            );
            return false;
        }

        // A passive-grab capture only ends once *all* buttons are up;
        // release it explicitly on the first release so the grab can't
        // be transferred from one button to another.
        self.ctx.windows.release_pointer_grab(timestamp);
        self.resize_coalescer.store_position(position);
        if self.resize_coalescer.stop() {
            self.apply_resize();
        }
        let Some(drag) = self.resize_drag.take() else {
            return false;
        };

        if self.settings.opaque {
            self.configure_input_windows();
        } else {
            self.resize_box = None;
            self.resize_content(drag.last, drag.gravity, true);
        }
        true
    }

    /// Periodic resize callback: turn the latest pointer offset into a
    /// clamped size according to the active handle's gravity.
    fn apply_resize(&mut self) {
        let Some(drag) = self.resize_drag else {
            return;
        };
        let position = self.resize_coalescer.position();
        let raw_dx = position.x - drag.start.x;
        let raw_dy = position.y - drag.start.y;

        // The dragged handle determines which corner stays fixed and
        // which directions grow the panel.
        let (gravity, dx, dy) = match drag.handle {
            HandleKind::Top => (Gravity::SouthWest, 0, -raw_dy),
            HandleKind::TopLeft => (Gravity::SouthEast, -raw_dx, -raw_dy),
            HandleKind::TopRight => (Gravity::SouthWest, raw_dx, -raw_dy),
            HandleKind::Left => (Gravity::NorthEast, -raw_dx, 0),
            HandleKind::Right => (Gravity::NorthWest, raw_dx, 0),
        };

        let last = Size::new(
            (drag.orig.width + dx)
                .max(self.min_content.width)
                .min(self.max_content.width),
            (drag.orig.height + dy)
                .max(self.min_content.height)
                .min(self.max_content.height),
        );
        if let Some(active) = self.resize_drag.as_mut() {
            active.last = last;
            active.gravity = gravity;
        }

        if self.settings.opaque {
            // Leave the handle windows alone until the drag ends; moving
            // them now would shift the coordinates of subsequent motion
            // events.
            self.resize_content(last, gravity, false);
        } else if let Some(resize_box) = &self.resize_box {
            let mut x = self.titlebar_x();
            if matches!(gravity, Gravity::SouthEast | Gravity::NorthEast) {
                x -= last.width - drag.orig.width;
            }
            let mut y = self.titlebar_y();
            if matches!(gravity, Gravity::SouthWest | Gravity::SouthEast) {
                y -= last.height - drag.orig.height;
            }
            let bounds = Rect::new(x, y, last.width, last.height + self.titlebar_height());
            resize_box.set_bounds(bounds, 0);
        }
    }

    // -- internals ----------------------------------------------------------

    /// While fullscreen the underlying windows are left covering the
    /// screen; changes are recorded and replayed on exit.
    fn can_configure_windows(&self) -> bool {
        !self.is_fullscreen
    }

    /// Move the handle windows into position around the panel, or park
    /// offscreen the ones whose direction is disallowed.
    fn configure_input_windows(&self) {
        let ws = &self.ctx.windows;
        if !self.resizable || (!self.horizontal_resize_allowed && !self.vertical_resize_allowed) {
            for id in self.handles.all() {
                ws.configure_window_offscreen(id);
            }
            return;
        }

        let border = self.settings.border_width;
        let corner = self.settings.corner_size;

        let top_edge_width = self.content_width()
            + if self.horizontal_resize_allowed {
                2 * (border - corner)
            } else {
                0
            };
        if !self.vertical_resize_allowed || top_edge_width <= 0 {
            ws.configure_window_offscreen(self.handles.top);
        } else {
            ws.configure_window(
                self.handles.top,
                Rect::new(
                    self.content_x() - (top_edge_width - self.content_width()) / 2,
                    self.titlebar_y() - border,
                    top_edge_width,
                    border,
                ),
            );
        }

        if !(self.vertical_resize_allowed && self.horizontal_resize_allowed) {
            ws.configure_window_offscreen(self.handles.top_left);
            ws.configure_window_offscreen(self.handles.top_right);
        } else {
            ws.configure_window(
                self.handles.top_left,
                Rect::new(
                    self.content_x() - border,
                    self.titlebar_y() - border,
                    corner,
                    corner,
                ),
            );
            ws.configure_window(
                self.handles.top_right,
                Rect::new(
                    self.right() + border - corner,
                    self.titlebar_y() - border,
                    corner,
                    corner,
                ),
            );
        }

        let side_edge_height = self.total_height()
            + if self.vertical_resize_allowed {
                border - corner
            } else {
                0
            };
        if !self.horizontal_resize_allowed || side_edge_height <= 0 {
            ws.configure_window_offscreen(self.handles.left);
            ws.configure_window_offscreen(self.handles.right);
        } else {
            ws.configure_window(
                self.handles.left,
                Rect::new(
                    self.content_x() - border,
                    self.titlebar_y() + self.total_height() - side_edge_height,
                    border,
                    side_edge_height,
                ),
            );
            ws.configure_window(
                self.handles.right,
                Rect::new(
                    self.right(),
                    self.titlebar_y() + self.total_height() - side_edge_height,
                    border,
                    side_edge_height,
                ),
            );
        }
    }

    fn stack_input_windows(&self) {
        for id in self.handles.all() {
            self.ctx.windows.stack_window_below(id, self.content.id);
        }
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        if self.resize_drag.take().is_some() {
            self.ctx.windows.release_pointer_grab(0);
        }
        self.close_transients();
        for id in self.handles.all() {
            self.ctx.windows.destroy_window(id);
        }
        self.ctx.windows.set_window_visibility(self.content.id, false);
        self.ctx.windows.set_window_visibility(self.titlebar.id, false);
        self.ctx.windows.destroy_actor(self.separator);
    }
}

/// Minimum and maximum content sizes, derived from the window's size
/// hints and from the handle-corner geometry (a panel must stay wide
/// enough that the two top corner handles don't overlap).
fn content_size_limits(hints: &SizeHints, settings: &ResizeSettings) -> (Size, Size) {
    let corner = settings.corner_size;
    let border = settings.border_width;
    let hinted_min = hints.min_size.unwrap_or_default();
    let min = Size::new(
        hinted_min.width.max(2 * (corner - border) + 1),
        hinted_min.height.max(corner - border + 1),
    );
    let hinted_max = hints.max_size.unwrap_or(Size::new(i32::MAX, i32::MAX));
    let max = Size::new(
        if hinted_max.width > 0 {
            hinted_max.width
        } else {
            i32::MAX
        },
        if hinted_max.height > 0 {
            hinted_max.height
        } else {
            i32::MAX
        },
    );
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelSettings;
    use shell::events::EventLoop;
    use shell::testing::{MockWindowSystem, WindowOp};
    use shell::window::PanelParams;

    struct Fixture {
        ctx: Rc<ShellContext>,
        mock: Rc<MockWindowSystem>,
    }

    impl Fixture {
        fn new() -> Self {
            let events = EventLoop::new();
            let mock = MockWindowSystem::new();
            let ctx = ShellContext::new(Size::new(1024, 768), events, mock.clone());
            Self { ctx, mock }
        }

        fn create_panel(&self, width: i32, titlebar_height: i32, height: i32) -> PanelHandle {
            self.create_panel_with(width, titlebar_height, height, PanelParams::new())
        }

        fn create_panel_with(
            &self,
            width: i32,
            titlebar_height: i32,
            height: i32,
            params: PanelParams,
        ) -> PanelHandle {
            let content = WindowInfo {
                id: self.mock.alloc_client_window(),
                client_size: Size::new(width, height),
                size_hints: SizeHints::default(),
                params,
            };
            let titlebar = WindowInfo {
                id: self.mock.alloc_client_window(),
                client_size: Size::new(width, titlebar_height),
                size_hints: SizeHints::default(),
                params: PanelParams::default(),
            };
            Panel::new(
                self.ctx.clone(),
                content,
                titlebar,
                true,
                PanelSettings::default().resize,
            )
        }
    }

    #[test]
    fn test_move_aligns_right_edges_and_shows_windows() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        fixture.mock.clear_ops();

        panel.borrow_mut().move_to(600, 100, 0);
        let panel = panel.borrow();
        assert_eq!(panel.right(), 600);
        assert_eq!(panel.content_x(), 400);
        assert_eq!(panel.titlebar_x(), 400);
        assert_eq!(panel.titlebar_y(), 100);
        assert_eq!(panel.content_y(), 120);
        assert_eq!(panel.total_height(), 420);

        let shown: Vec<_> = fixture
            .mock
            .ops()
            .into_iter()
            .filter(|op| matches!(op, WindowOp::SetWindowVisibility(_, true)))
            .collect();
        assert_eq!(shown.len(), 2, "first move shows both windows");
    }

    #[test]
    fn test_first_move_only_shows_once() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        fixture.mock.clear_ops();
        panel.borrow_mut().move_to(500, 200, 0);
        assert!(!fixture
            .mock
            .ops()
            .iter()
            .any(|op| matches!(op, WindowOp::SetWindowVisibility(_, _))));
    }

    #[test]
    fn test_resize_content_southeast_keeps_right_edge() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);

        panel
            .borrow_mut()
            .resize_content(Size::new(300, 500), Gravity::SouthEast, true);
        let panel = panel.borrow();
        assert_eq!(panel.right(), 600);
        assert_eq!(panel.width(), 300);
        assert_eq!(panel.content_height(), 500);
        // Titlebar rides on top of the content.
        assert_eq!(panel.titlebar_y(), panel.content_y() - panel.titlebar_height());
        assert_eq!(panel.titlebar_width(), 300);
    }

    #[test]
    fn test_resize_content_clamps_to_size_limits() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);

        panel
            .borrow_mut()
            .resize_content(Size::new(1, 1), Gravity::NorthWest, true);
        let panel = panel.borrow();
        // border=3, corner=20: min width 2*(20-3)+1, min height 20-3+1.
        assert_eq!(panel.width(), 35);
        assert_eq!(panel.content_height(), 18);
    }

    #[test]
    fn test_size_hints_tighten_limits() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        panel.borrow_mut().handle_content_size_hints_change(SizeHints {
            min_size: Some(Size::new(150, 100)),
            max_size: Some(Size::new(250, 450)),
        });

        panel
            .borrow_mut()
            .resize_content(Size::new(1000, 1000), Gravity::NorthWest, true);
        assert_eq!(panel.borrow().width(), 250);
        assert_eq!(panel.borrow().content_height(), 450);

        panel
            .borrow_mut()
            .resize_content(Size::new(1, 1), Gravity::NorthWest, true);
        assert_eq!(panel.borrow().width(), 150);
        assert_eq!(panel.borrow().content_height(), 100);
    }

    #[test]
    fn test_fullscreen_round_trip_replays_recorded_position() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        panel.borrow_mut().set_fullscreen_state(true);
        fixture.mock.clear_ops();

        // Moves and restacks while fullscreen are recorded but not
        // applied.
        panel.borrow_mut().move_to(300, 50, 0);
        panel
            .borrow_mut()
            .stack_at_top_of_layer(StackingLayer::FloatingPanelInBar);
        assert!(
            !fixture
                .mock
                .ops()
                .iter()
                .any(|op| matches!(op, WindowOp::MoveWindow { .. })),
            "no window requests while fullscreen"
        );

        panel.borrow_mut().set_fullscreen_state(false);
        let content_id = panel.borrow().content_id();
        assert_eq!(panel.borrow().right(), 300);
        assert_eq!(panel.borrow().titlebar_y(), 50);
        let ops = fixture.mock.ops();
        let moved_to = ops.iter().find_map(|op| match op {
            WindowOp::MoveWindow { id, position, .. } if *id == content_id => Some(*position),
            _ => None,
        });
        assert_eq!(moved_to, Some(Point::new(100, 70)));
        assert!(
            ops.contains(&WindowOp::StackWindowAtTopOfLayer(
                content_id,
                StackingLayer::FloatingPanelInBar
            )),
            "recorded stacking layer replayed on exit"
        );
    }

    #[test]
    fn test_fullscreen_is_idempotent() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        panel.borrow_mut().set_fullscreen_state(true);
        fixture.mock.clear_ops();
        panel.borrow_mut().set_fullscreen_state(true);
        assert!(fixture.mock.ops().is_empty());
    }

    #[test]
    fn test_handles_parked_offscreen_when_not_resizable() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        panel.borrow_mut().set_resizable(true);
        for id in panel.borrow().input_windows() {
            assert!(
                fixture.mock.input_window_bounds(id).is_some(),
                "handle {id:?} onscreen while resizable"
            );
        }

        panel.borrow_mut().set_resizable(false);
        for id in panel.borrow().input_windows() {
            assert!(
                fixture.mock.input_window_bounds(id).is_none(),
                "handle {id:?} parked offscreen while not resizable"
            );
        }
    }

    #[test]
    fn test_vertical_only_resize_parks_side_handles() {
        let fixture = Fixture::new();
        let params = PanelParams {
            user_resize: UserResizeType::Vertical,
            ..PanelParams::new()
        };
        let panel = fixture.create_panel_with(200, 20, 400, params);
        panel.borrow_mut().move_to(600, 100, 0);
        panel.borrow_mut().set_resizable(true);

        let panel = panel.borrow();
        let all = panel.input_windows();
        // Only the top edge handle stays onscreen.
        assert!(fixture.mock.input_window_bounds(all[0]).is_some());
        for id in &all[1..] {
            assert!(fixture.mock.input_window_bounds(*id).is_none());
        }
    }

    #[test]
    fn test_interactive_resize_coalesces_motion() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 500, 0);
        panel.borrow_mut().set_resizable(true);
        let right_handle = panel.borrow().input_windows()[4];

        panel
            .borrow_mut()
            .handle_input_window_button_press(right_handle, Point::new(0, 0), 1, 100);
        assert!(panel.borrow().is_being_resized_by_user());

        // Many motions, one tick: only the latest offset matters.
        for dx in 1..=30 {
            panel
                .borrow_mut()
                .handle_input_window_pointer_motion(right_handle, Point::new(dx, 0));
        }
        fixture.ctx.events.advance(25);
        // Non-opaque mode: no window resize yet, only the preview box.
        assert_eq!(panel.borrow().width(), 200);

        let finished = panel.borrow_mut().handle_input_window_button_release(
            right_handle,
            Point::new(30, 0),
            1,
            200,
        );
        assert!(finished);
        assert_eq!(panel.borrow().width(), 230, "release applies the final size");
        assert_eq!(panel.borrow().content_height(), 400);
        assert!(!panel.borrow().is_being_resized_by_user());
        assert!(
            fixture
                .mock
                .ops()
                .iter()
                .any(|op| matches!(op, WindowOp::ReleasePointerGrab(200))),
            "pointer grab released on first button release"
        );
    }

    #[test]
    fn test_top_handle_grows_upward() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 500, 0);
        panel.borrow_mut().set_resizable(true);
        let top_handle = panel.borrow().input_windows()[0];

        panel
            .borrow_mut()
            .handle_input_window_button_press(top_handle, Point::new(0, 0), 1, 100);
        panel
            .borrow_mut()
            .handle_input_window_pointer_motion(top_handle, Point::new(50, -60));
        fixture.ctx.events.advance(25);
        panel.borrow_mut().handle_input_window_button_release(
            top_handle,
            Point::new(50, -60),
            1,
            200,
        );

        let panel = panel.borrow();
        // Dragging the top edge up grows the height; the horizontal
        // motion is ignored and the bottom edge stays put.
        assert_eq!(panel.width(), 200);
        assert_eq!(panel.content_height(), 460);
        assert_eq!(panel.content_y() + panel.content_height(), 920);
    }

    #[test]
    fn test_opaque_resize_applies_on_each_tick() {
        let fixture = Fixture::new();
        let mut settings = PanelSettings::default().resize;
        settings.opaque = true;
        let content = WindowInfo {
            id: fixture.mock.alloc_client_window(),
            client_size: Size::new(200, 400),
            size_hints: SizeHints::default(),
            params: PanelParams::new(),
        };
        let titlebar = WindowInfo {
            id: fixture.mock.alloc_client_window(),
            client_size: Size::new(200, 20),
            size_hints: SizeHints::default(),
            params: PanelParams::default(),
        };
        let panel = Panel::new(fixture.ctx.clone(), content, titlebar, true, settings);
        panel.borrow_mut().move_to(600, 500, 0);
        panel.borrow_mut().set_resizable(true);
        let right_handle = panel.borrow().input_windows()[4];

        panel
            .borrow_mut()
            .handle_input_window_button_press(right_handle, Point::new(0, 0), 1, 100);
        panel
            .borrow_mut()
            .handle_input_window_pointer_motion(right_handle, Point::new(25, 0));
        fixture.ctx.events.advance(25);
        assert_eq!(panel.borrow().width(), 225, "opaque mode resizes live");
    }

    #[test]
    fn test_release_of_other_button_is_ignored() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 500, 0);
        panel.borrow_mut().set_resizable(true);
        let right_handle = panel.borrow().input_windows()[4];

        panel
            .borrow_mut()
            .handle_input_window_button_press(right_handle, Point::new(0, 0), 1, 100);
        let finished = panel.borrow_mut().handle_input_window_button_release(
            right_handle,
            Point::new(0, 0),
            3,
            150,
        );
        assert!(!finished);
        assert!(panel.borrow().is_being_resized_by_user());
    }

    #[test]
    fn test_set_expanded_state_keeps_local_flag_on_notify_failure() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        fixture.mock.set_fail_notifications(true);

        let result = panel.borrow_mut().set_expanded_state(false);
        assert!(result.is_err());
        assert!(!panel.borrow().is_expanded(), "local state is kept");
    }

    #[test]
    fn test_drop_closes_transients_and_destroys_handles() {
        let fixture = Fixture::new();
        let panel = fixture.create_panel(200, 20, 400);
        panel.borrow_mut().move_to(600, 100, 0);
        let transient = fixture.mock.alloc_client_window();
        panel.borrow_mut().add_transient(transient);
        let handles = panel.borrow().input_windows();
        fixture.mock.clear_ops();

        drop(panel);
        let ops = fixture.mock.ops();
        assert!(ops.contains(&WindowOp::CloseWindow(transient)));
        for id in handles {
            assert!(ops.contains(&WindowOp::DestroyWindow(id)));
        }
    }
}
