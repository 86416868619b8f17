//! The panel bar: the container pinned to the bottom edge of the
//! screen.
//!
//! The bar holds two ordered collections. *Packed* panels sit
//! contiguously against the right screen edge, separated by a fixed
//! gap; *floating* panels keep whatever position the user dropped them
//! at, to the left of the packed group. Every panel the bar tracks is
//! in exactly one of the two lists, and the per-panel record is the
//! only place the floating flag lives.
//!
//! Reordering during a drag uses a midpoint hysteresis rule: a panel
//! must cross halfway past a neighbor before displacing it, and does
//! not un-displace until it recrosses the same line. This is what keeps
//! panels from oscillating under small pointer movements.
//!
//! Collapsed panels normally show only the top few pixels of their
//! titlebars. A thin input strip along the bottom of the screen,
//! a delay timer, and a pointer-position watcher drive the four-state
//! show/hide machine (`Hidden`, `WaitingToShow`, `Shown`,
//! `WaitingToHide`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use shell::events::TimerId;
use shell::geometry::{Point, Rect, Size};
use shell::window::{ActorId, StackingLayer, Timestamp, WindowId};
use shell::ShellContext;
use tracing::{debug, warn};

use crate::config::BarSettings;
use crate::container::{ContainerKind, PanelContainer, PanelSource};
use crate::panel::{Panel, PanelHandle, PanelId};
use crate::pointer_watcher::PointerPositionWatcher;

/// Visibility of collapsed panels' titlebars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsedPanelState {
    /// Full titlebars visible at the bottom of the screen.
    Shown,
    /// Only the top few pixels of each titlebar visible.
    Hidden,
    /// Hidden, but the show-delay timer is running.
    WaitingToShow,
    /// Shown, but the pointer moved away while a collapsed panel was
    /// mid-drag; hide as soon as the drag completes.
    WaitingToHide,
}

/// Bar-specific bookkeeping for one panel.
struct PanelInfo {
    /// Where the panel's right edge wants to be. For packed panels this
    /// is the snapped position (the actual position may lag during a
    /// drag); for floating panels it is where the user last dropped the
    /// panel.
    desired_right: i32,
    /// Is the panel in the floating list (as opposed to packed)?
    is_floating: bool,
}

struct AnchorState {
    /// Panel the anchor will re-collapse; validated against the store
    /// before use since the panel may be destroyed while the anchor is
    /// up.
    panel: PanelId,
    _watcher: PointerPositionWatcher,
}

pub struct PanelBar {
    ctx: Rc<ShellContext>,
    settings: BarSettings,

    /// Every panel the bar tracks.
    panels: HashMap<PanelId, PanelHandle>,
    infos: HashMap<PanelId, PanelInfo>,
    /// Left-to-right order; the last entry touches the right padding.
    packed: Vec<PanelId>,
    /// Left-to-right order.
    floating: Vec<PanelId>,
    /// Total width of the packed group including padding.
    packed_width: i32,

    dragged: Option<PanelId>,
    /// Decided once per drag from the initial displacement.
    dragging_horizontally: bool,

    anchor_input: WindowId,
    anchor_actor: ActorId,
    anchor: Option<AnchorState>,

    /// Panel to focus when the bar is asked to take the focus.
    desired_focus: Option<PanelId>,

    collapsed_state: CollapsedPanelState,
    show_collapsed_input: WindowId,
    show_collapsed_timer: Option<TimerId>,
    hide_watcher: Option<PointerPositionWatcher>,

    weak_self: Weak<RefCell<PanelBar>>,
}

impl PanelBar {
    pub fn new(ctx: Rc<ShellContext>, settings: BarSettings) -> Rc<RefCell<PanelBar>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<PanelBar>>| {
            let ws = ctx.windows.clone();
            let anchor_input = ws.create_input_window(Rect::new(-1, -1, 1, 1));
            let show_collapsed_input = ws.create_input_window(Rect::new(-1, -1, 1, 1));

            let anchor_actor = ws.create_actor("panel anchor");
            ws.set_actor_opacity(anchor_actor, 0.0, 0);
            ws.stack_actor_at_top_of_layer(anchor_actor, StackingLayer::PanelBarInputWindow);

            // The anchor input window sits above the show-collapsed one
            // so the latter doesn't see spurious leave events.
            ws.stack_window_at_top_of_layer(
                show_collapsed_input,
                StackingLayer::PanelBarInputWindow,
            );
            ws.stack_window_at_top_of_layer(anchor_input, StackingLayer::PanelBarInputWindow);

            RefCell::new(PanelBar {
                ctx,
                settings,
                panels: HashMap::new(),
                infos: HashMap::new(),
                packed: Vec::new(),
                floating: Vec::new(),
                packed_width: 0,
                dragged: None,
                dragging_horizontally: false,
                anchor_input,
                anchor_actor,
                anchor: None,
                desired_focus: None,
                collapsed_state: CollapsedPanelState::Hidden,
                show_collapsed_input,
                show_collapsed_timer: None,
                hide_watcher: None,
                weak_self: weak.clone(),
            })
        })
    }

    pub fn collapsed_panel_state(&self) -> CollapsedPanelState {
        self.collapsed_state
    }

    // -- store helpers ------------------------------------------------------

    fn handle(&self, id: PanelId) -> Option<PanelHandle> {
        self.panels.get(&id).cloned()
    }

    fn expect_handle(&self, id: PanelId) -> PanelHandle {
        self.panels
            .get(&id)
            .cloned()
            .expect("panel missing from bar store")
    }

    fn expect_info(&self, id: PanelId) -> &PanelInfo {
        self.infos.get(&id).expect("panel info missing")
    }

    fn expect_info_mut(&mut self, id: PanelId) -> &mut PanelInfo {
        self.infos.get_mut(&id).expect("panel info missing")
    }

    fn all_panels(&self) -> Vec<PanelHandle> {
        self.panels.values().cloned().collect()
    }

    /// Every tracked panel appears in exactly one ordered list, with a
    /// matching floating flag.
    fn debug_check_invariants(&self) {
        if cfg!(debug_assertions) {
            assert_eq!(
                self.packed.len() + self.floating.len(),
                self.panels.len(),
                "packed + floating must partition the panel store"
            );
            for id in &self.packed {
                assert!(self.panels.contains_key(id));
                assert!(!self.expect_info(*id).is_floating);
                assert!(!self.floating.contains(id));
            }
            for id in &self.floating {
                assert!(self.panels.contains_key(id));
                assert!(self.expect_info(*id).is_floating);
            }
        }
    }

    fn num_collapsed(&self) -> usize {
        self.panels
            .values()
            .filter(|panel| !panel.borrow().is_expanded())
            .count()
    }

    fn collapsed_panels_are_hidden(&self) -> bool {
        matches!(
            self.collapsed_state,
            CollapsedPanelState::Hidden | CollapsedPanelState::WaitingToShow
        )
    }

    /// Y position for the top of the panel's titlebar given its
    /// expanded/urgent state and the collapsed-visibility state.
    fn compute_panel_y(&self, panel: &Panel) -> i32 {
        let screen_height = self.ctx.screen_height();
        if panel.is_expanded() {
            screen_height - panel.total_height()
        } else if self.collapsed_panels_are_hidden() && !panel.is_urgent() {
            screen_height - self.settings.hidden_collapsed_peek
        } else {
            screen_height - panel.titlebar_height()
        }
    }

    // -- adding and removing ------------------------------------------------

    fn add_panel_internal(&mut self, panel: &PanelHandle, source: PanelSource) {
        let id = panel.borrow().id();
        if self.panels.insert(id, panel.clone()).is_some() {
            debug_assert!(false, "tried to add already-present {id}");
            warn!("Tried to add already-present {id}");
            return;
        }

        let mut padding = if self.packed.is_empty() {
            self.settings.right_padding
        } else {
            self.settings.panel_gap
        };
        let mut desired_right = self.ctx.screen_width() - self.packed_width - padding;
        let mut insert_index = 0;

        // A new panel naming a creator opens immediately to the
        // creator's left instead of at the tail of the packed group.
        if source == PanelSource::New {
            if let Some(creator) = panel.borrow().creator() {
                match self
                    .packed
                    .iter()
                    .position(|pid| self.expect_handle(*pid).borrow().content_id() == creator)
                {
                    Some(index) => {
                        let creator_id = self.packed[index];
                        padding = self.settings.panel_gap;
                        desired_right = self.expect_info(creator_id).desired_right
                            - self.expect_handle(creator_id).borrow().width()
                            - padding;
                        insert_index = index;
                    }
                    None => warn!(
                        "Unable to find creator panel {:?} for new {id}",
                        creator
                    ),
                }
            }
        }

        self.infos.insert(
            id,
            PanelInfo {
                desired_right,
                is_floating: false,
            },
        );
        self.packed.insert(insert_index, id);
        self.packed_width += panel.borrow().width() + padding;

        // A panel dragged in from elsewhere goes straight to whatever
        // slot its current position earns it.
        if source == PanelSource::Dragged {
            debug_assert!(self.dragged.is_none());
            self.dragged = Some(id);
            self.dragging_horizontally = true;
            self.reorder_panel_in_vector(id, false);
        }
        self.debug_check_invariants();

        panel.borrow_mut().stack_at_top_of_layer(if source == PanelSource::Dragged {
            StackingLayer::DraggedPanel
        } else {
            StackingLayer::PackedPanelInBar
        });

        let desired_right = self.expect_info(id).desired_right;
        let final_y = self.compute_panel_y(&panel.borrow());
        match source {
            PanelSource::New => {
                // New panels slide in from the bottom of the screen.
                let screen_height = self.ctx.screen_height();
                panel.borrow_mut().move_to(desired_right, screen_height, 0);
                panel.borrow_mut().move_y(final_y, self.settings.state_anim_ms);
            }
            PanelSource::Dragged => {
                panel.borrow_mut().move_y(final_y, 0);
            }
            PanelSource::Dropped => {
                panel
                    .borrow_mut()
                    .move_to(desired_right, final_y, self.settings.dropped_anim_ms);
            }
        }

        self.arrange_panels(true, None);
        let expanded = panel.borrow().is_expanded();
        panel.borrow_mut().set_resizable(expanded);

        // Focus the panel if it asked for the focus, already held it
        // (e.g. it was focused when it got detached and is now being
        // reattached), or nothing else is focused.
        let focus_requested = source == PanelSource::New && panel.borrow().focus_requested();
        if expanded
            && (focus_requested
                || panel.borrow().is_focused()
                || self.ctx.windows.focused_window().is_none())
        {
            let timestamp = self.ctx.events.now_ms();
            self.focus_panel(panel, timestamp);
        }

        // The strip only needs to watch the bottom of the screen while
        // there's a collapsed panel to reveal.
        if !expanded && self.num_collapsed() == 1 {
            self.configure_show_collapsed_input(true);
        }
    }

    fn remove_panel_internal(&mut self, panel: &PanelHandle) {
        let id = panel.borrow().id();
        if self.panels.remove(&id).is_none() {
            warn!("Tried to remove nonexistent {id}");
            return;
        }

        if self.anchor.as_ref().map(|anchor| anchor.panel) == Some(id) {
            self.destroy_anchor();
        }
        if self.dragged == Some(id) {
            self.dragged = None;
        }
        // If this panel was our focus choice, fall back to the nearest
        // still-expanded panel.
        if self.desired_focus == Some(id) {
            self.desired_focus = self.nearest_expanded_panel(&panel.borrow());
        }

        let was_collapsed = !panel.borrow().is_expanded();
        self.infos.remove(&id);
        if let Some(index) = self.packed.iter().position(|pid| *pid == id) {
            self.packed.remove(index);
        } else if let Some(index) = self.floating.iter().position(|pid| *pid == id) {
            self.floating.remove(index);
        } else {
            warn!("Got request to remove {id} but didn't find it");
            return;
        }
        self.debug_check_invariants();

        // This also recomputes the packed width.
        self.arrange_panels(true, None);

        if let Some(dragged) = self.dragged {
            if !self.expect_info(dragged).is_floating
                && self.reorder_panel_in_vector(dragged, false)
            {
                self.arrange_panels(false, None);
            }
        }

        if was_collapsed && self.num_collapsed() == 0 {
            self.configure_show_collapsed_input(false);
        }
    }

    // -- dragging -----------------------------------------------------------

    fn handle_notify_panel_dragged_internal(&mut self, panel: &PanelHandle, drag: Point) -> bool {
        let id = panel.borrow().id();
        debug!("Notified about drag of {id} to ({}, {})", drag.x, drag.y);

        if self.settings.allow_detach {
            let y_threshold = self.ctx.screen_height()
                - panel.borrow().total_height()
                - self.settings.detach_threshold;
            if drag.y <= y_threshold {
                return false;
            }
        }

        if self.dragged != Some(id) {
            if let Some(previous) = self.dragged {
                warn!("Abandoning dragged {previous} in favor of {id}");
                if let Some(previous_handle) = self.handle(previous) {
                    self.handle_panel_drag_complete(&previous_handle);
                }
            }
            debug!("Starting drag of {id}");
            self.dragged = Some(id);
            self.dragging_horizontally = {
                let panel = panel.borrow();
                (drag.x - panel.right()).abs() > (drag.y - panel.titlebar_y()).abs()
            };
            panel
                .borrow_mut()
                .stack_at_top_of_layer(StackingLayer::DraggedPanel);
        }

        if self.dragging_horizontally {
            panel.borrow_mut().move_x(drag.x, 0);

            // Total packed width plus the padding that would sit to the
            // dragged panel's right, adjusted for which group the panel
            // is currently in.
            let is_floating = self.expect_info(id).is_floating;
            let mut packed_width_with_padding = self.packed_width;
            if !is_floating {
                packed_width_with_padding -= panel.borrow().width();
            } else {
                packed_width_with_padding += if self.packed.is_empty() {
                    self.settings.right_padding
                } else {
                    self.settings.panel_gap
                };
            }
            let floating_threshold = self.ctx.screen_width()
                - packed_width_with_padding
                - self.settings.floating_threshold;

            let moved_to_other_vector = if drag.x < floating_threshold {
                let moved = self.move_panel_to_floating_vector(id);
                self.expect_info_mut(id).desired_right = drag.x;
                self.arrange_panels(false, None);
                moved
            } else {
                let moved = self.move_panel_to_packed_vector(id);
                self.arrange_panels(false, None);
                moved
            };

            if !moved_to_other_vector {
                // Same group; just keep the panel at the right spot
                // within it.
                let is_floating = self.expect_info(id).is_floating;
                if self.reorder_panel_in_vector(id, is_floating) && !is_floating {
                    self.arrange_panels(false, None);
                }
            }
        } else {
            // Vertical mode: clamp between the collapsed and expanded
            // positions and ignore horizontal movement for the rest of
            // the drag.
            let (titlebar_height, total_height) = {
                let panel = panel.borrow();
                (panel.titlebar_height(), panel.total_height())
            };
            let capped_y = drag
                .y
                .min(self.ctx.screen_height() - titlebar_height)
                .max(self.ctx.screen_height() - total_height);
            panel.borrow_mut().move_y(capped_y, 0);
        }
        true
    }

    fn handle_panel_drag_complete(&mut self, panel: &PanelHandle) {
        let id = panel.borrow().id();
        debug!("Got notification that panel drag is complete for {id}");
        if self.dragged != Some(id) {
            return;
        }

        let is_floating = self.expect_info(id).is_floating;
        self.dragged = None;

        if self.dragging_horizontally {
            self.arrange_panels(true, is_floating.then_some(id));
        } else {
            // Snap to expanded or collapsed depending on whether the
            // panel ended up mostly visible; the animation is halved
            // since we're at least halfway there.
            let (titlebar_y, total_height, expanded) = {
                let panel = panel.borrow();
                (panel.titlebar_y(), panel.total_height(), panel.is_expanded())
            };
            let mostly_visible = titlebar_y < self.ctx.screen_height() - total_height / 2;
            let anim_ms = self.settings.state_anim_ms / 2;
            if mostly_visible && !expanded {
                self.expand_panel(panel, false, anim_ms);
                let timestamp = self.ctx.events.now_ms();
                self.focus_panel(panel, timestamp);
            } else if !mostly_visible && expanded {
                self.collapse_panel(panel, anim_ms);
            } else {
                let y = self.compute_panel_y(&panel.borrow());
                panel.borrow_mut().move_y(y, anim_ms);
            }
        }

        panel.borrow_mut().stack_at_top_of_layer(if is_floating {
            StackingLayer::FloatingPanelInBar
        } else {
            StackingLayer::PackedPanelInBar
        });

        if self.collapsed_state == CollapsedPanelState::WaitingToHide {
            // The pointer moved up from the bottom of the screen while
            // the drag was in progress; hide now unless it came back.
            let pointer = self.ctx.windows.query_pointer();
            if pointer.y < self.ctx.screen_height() - self.settings.hide_collapsed_distance {
                self.hide_collapsed_panels();
            } else {
                self.collapsed_state = CollapsedPanelState::Shown;
                self.start_hide_collapsed_watcher();
            }
        }
    }

    /// Move the panel into the packed list if it's floating. Returns
    /// true if it moved.
    fn move_panel_to_packed_vector(&mut self, id: PanelId) -> bool {
        if !self.expect_info(id).is_floating {
            return false;
        }
        debug!("Moving {id} to packed vector");
        let Some(index) = self.floating.iter().position(|pid| *pid == id) else {
            debug_assert!(false, "{id} floating but not in floating list");
            return false;
        };
        self.floating.remove(index);
        // Coming in from the floating group on the left, the panel is
        // most likely headed for the left end of the packed group.
        self.packed.insert(0, id);
        self.expect_info_mut(id).is_floating = false;
        self.reorder_panel_in_vector(id, false);
        self.debug_check_invariants();
        true
    }

    /// Move the panel into the floating list if it's packed. Returns
    /// true if it moved.
    fn move_panel_to_floating_vector(&mut self, id: PanelId) -> bool {
        if self.expect_info(id).is_floating {
            return false;
        }
        debug!("Moving {id} to floating vector");
        let Some(index) = self.packed.iter().position(|pid| *pid == id) else {
            debug_assert!(false, "{id} packed but not in packed list");
            return false;
        };
        self.packed.remove(index);
        self.floating.push(id);
        self.expect_info_mut(id).is_floating = true;
        self.reorder_panel_in_vector(id, true);
        self.debug_check_invariants();
        true
    }

    /// Stability rule, not a sort: find the widest index range of
    /// neighbors whose midpoint the panel's left edge is left of (or
    /// right edge is right of) and move the panel to the rightmost
    /// qualifying index. The midpoint test is the hysteresis that
    /// prevents oscillation. Returns true if the panel moved.
    fn reorder_panel_in_vector(&mut self, id: PanelId, floating: bool) -> bool {
        let list = if floating { &self.floating } else { &self.packed };
        let Some(source) = list.iter().position(|pid| *pid == id) else {
            debug_assert!(false, "{id} not in expected list");
            return false;
        };
        let (left, right_edge) = {
            let panel = self.expect_handle(id);
            let panel = panel.borrow();
            (panel.content_x(), panel.right())
        };

        let mut min_index = list.len() - 1;
        let mut max_index = 0;
        for (index, pid) in list.iter().enumerate() {
            if *pid == id {
                continue;
            }
            let center = self.expect_handle(*pid).borrow().content_center();
            if left <= center {
                min_index = min_index.min(index);
            }
            if right_edge > center {
                max_index = max_index.max(index);
            }
        }

        if max_index >= min_index && max_index != source {
            let list = if floating {
                &mut self.floating
            } else {
                &mut self.packed
            };
            let moved = list.remove(source);
            list.insert(max_index, moved);
            true
        } else {
            false
        }
    }

    // -- arranging ----------------------------------------------------------

    /// First pass packs the packed panels right-to-left; second pass
    /// positions the floating panels leftward from the packed group's
    /// boundary, optionally pinning `fixed_floating_panel` (the panel
    /// being interactively resized or just dropped).
    fn arrange_panels(&mut self, arrange_floating: bool, fixed_floating_panel: Option<PanelId>) {
        let packed = self.packed.clone();
        let count = packed.len();
        let mut packed_width = 0;
        for (index, id) in packed.iter().enumerate().rev() {
            let padding = if index == count - 1 {
                self.settings.right_padding
            } else {
                self.settings.panel_gap
            };
            let handle = self.expect_handle(*id);
            let desired_right = self.ctx.screen_width() - packed_width - padding;
            self.expect_info_mut(*id).desired_right = desired_right;
            let (current_right, width) = {
                let panel = handle.borrow();
                (panel.right(), panel.width())
            };
            if self.dragged != Some(*id) && current_right != desired_right {
                handle
                    .borrow_mut()
                    .move_x(desired_right, self.settings.arrange_anim_ms);
            }
            packed_width += width + padding;
        }
        self.packed_width = packed_width;

        if arrange_floating {
            let mut right_boundary = self.ctx.screen_width()
                - packed_width
                - if packed_width == 0 {
                    self.settings.right_padding
                } else {
                    self.settings.panel_gap
                };

            if let Some(fixed) = fixed_floating_panel {
                self.shift_floating_panels_around_fixed_panel(fixed, right_boundary);
            }

            let floating = self.floating.clone();
            for id in floating.iter().rev() {
                let handle = self.expect_handle(*id);
                if self.dragged != Some(*id) {
                    let panel_right = self.expect_info(*id).desired_right.min(right_boundary);
                    if handle.borrow().right() != panel_right {
                        handle
                            .borrow_mut()
                            .move_x(panel_right, self.settings.arrange_anim_ms);
                    }
                }
                right_boundary = handle.borrow().content_x() - self.settings.panel_gap;
            }
        }
    }

    /// Shift the minimum number of floating panels out of the fixed
    /// panel's way so that it and its neighbors all fit to the left of
    /// `right_boundary`, preferring to disturb panels on the side with
    /// less room.
    fn shift_floating_panels_around_fixed_panel(&mut self, fixed: PanelId, right_boundary: i32) {
        let handle = self.expect_handle(fixed);
        if handle.borrow().right() > right_boundary {
            handle
                .borrow_mut()
                .move_x(right_boundary, self.settings.arrange_anim_ms);
        }

        let Some(fixed_index) = self.floating.iter().position(|pid| *pid == fixed) else {
            debug_assert!(false, "fixed {fixed} not floating");
            return;
        };

        let gap = self.settings.panel_gap;
        let widths: Vec<i32> = self
            .floating
            .iter()
            .map(|pid| self.expect_handle(*pid).borrow().width())
            .collect();

        // Space between the fixed panel's right edge and the boundary,
        // and the room needed by the panels currently in that span.
        let space_to_right = right_boundary - handle.borrow().right();
        let mut width_to_right: i32 = widths[fixed_index + 1..].iter().map(|w| w + gap).sum();

        // Count how many right-side panels have to hop to the fixed
        // panel's left before the rest fit.
        let mut new_fixed_index = fixed_index;
        for index in fixed_index + 1..self.floating.len() {
            if width_to_right <= space_to_right {
                break;
            }
            new_fixed_index = index;
            width_to_right -= widths[index] + gap;
        }

        // If nothing had to move and panels on our left would rather be
        // on the right, bring them over while there's room.
        if new_fixed_index == fixed_index && fixed_index > 0 {
            let fixed_left = handle.borrow().content_x();
            for index in (0..fixed_index).rev() {
                let id = self.floating[index];
                if self.expect_info(id).desired_right - widths[index] / 2 < fixed_left {
                    break;
                }
                let new_width_to_right = width_to_right + widths[index] + gap;
                if new_width_to_right > space_to_right {
                    break;
                }
                new_fixed_index = index;
                width_to_right = new_width_to_right;
            }
        }
        debug_assert!(width_to_right <= space_to_right);

        if new_fixed_index != fixed_index {
            let moved = self.floating.remove(fixed_index);
            self.floating.insert(new_fixed_index, moved);
        }

        // Push the desired positions of the panels now to our right far
        // enough that nothing overlaps. They may stick out past the
        // boundary; the final arrange pass pulls them back in.
        let mut left_edge = handle.borrow().right() + gap;
        let start = self
            .floating
            .iter()
            .position(|pid| *pid == fixed)
            .expect("fixed panel vanished from floating list");
        for index in start + 1..self.floating.len() {
            let id = self.floating[index];
            let width = self.expect_handle(id).borrow().width();
            let info = self.expect_info_mut(id);
            if info.desired_right - width < left_edge {
                info.desired_right = left_edge + width;
            }
            left_edge = self.expect_info(id).desired_right + gap;
        }
    }

    // -- expand/collapse and focus ------------------------------------------

    fn expand_panel(&mut self, panel: &PanelHandle, create_anchor: bool, anim_ms: u32) {
        if panel.borrow().is_expanded() {
            warn!(
                "Ignoring request to expand already-expanded {}",
                panel.borrow().id()
            );
            return;
        }
        if let Err(error) = panel.borrow_mut().set_expanded_state(true) {
            warn!("{error}");
        }
        let y = self.compute_panel_y(&panel.borrow());
        panel.borrow_mut().move_y(y, anim_ms);
        panel.borrow_mut().set_resizable(true);
        if create_anchor {
            self.create_anchor(panel);
        }

        if self.num_collapsed() == 0 {
            self.configure_show_collapsed_input(false);
        }
    }

    fn collapse_panel(&mut self, panel: &PanelHandle, anim_ms: u32) {
        if !panel.borrow().is_expanded() {
            warn!(
                "Ignoring request to collapse already-collapsed {}",
                panel.borrow().id()
            );
            return;
        }

        // Pick a replacement focus target before this panel stops
        // qualifying.
        let panel_to_focus = self.nearest_expanded_panel(&panel.borrow());

        if self.anchor.as_ref().map(|anchor| anchor.panel) == Some(panel.borrow().id()) {
            self.destroy_anchor();
        }

        if let Err(error) = panel.borrow_mut().set_expanded_state(false) {
            warn!("{error}");
        }
        let y = self.compute_panel_y(&panel.borrow());
        panel.borrow_mut().move_y(y, anim_ms);
        panel.borrow_mut().set_resizable(false);

        if panel.borrow().is_focused() {
            self.desired_focus = panel_to_focus;
            let timestamp = self.ctx.events.now_ms();
            if !self.take_focus_internal(timestamp) {
                debug!("No expanded panel left to take the focus");
            }
        }

        if self.num_collapsed() == 1 {
            self.configure_show_collapsed_input(true);
        }
    }

    fn focus_panel(&mut self, panel: &PanelHandle, timestamp: Timestamp) {
        panel.borrow_mut().take_focus(timestamp);
        self.desired_focus = Some(panel.borrow().id());
    }

    fn take_focus_internal(&mut self, timestamp: Timestamp) -> bool {
        // Use the panel we already decided on, if it's still around.
        if let Some(id) = self.desired_focus {
            if let Some(panel) = self.handle(id) {
                self.focus_panel(&panel, timestamp);
                return true;
            }
            self.desired_focus = None;
        }

        // Otherwise the first onscreen, expanded panel.
        let candidates: Vec<PanelId> = self
            .floating
            .iter()
            .chain(self.packed.iter())
            .copied()
            .collect();
        for id in candidates {
            let handle = self.expect_handle(id);
            let eligible = {
                let panel = handle.borrow();
                panel.is_expanded() && panel.right() > 0
            };
            if eligible {
                self.focus_panel(&handle, timestamp);
                return true;
            }
        }
        false
    }

    /// The expanded panel nearest to `panel` (minimum horizontal gap,
    /// falling back to center distance when they overlap), or None.
    fn nearest_expanded_panel(&self, panel: &Panel) -> Option<PanelId> {
        if !panel.is_expanded() {
            return None;
        }
        let mut nearest = None;
        let mut best_distance = i32::MAX;
        for (id, candidate) in &self.panels {
            if *id == panel.id() {
                continue;
            }
            let candidate = candidate.borrow();
            if !candidate.is_expanded() {
                continue;
            }
            let distance = if candidate.right() <= panel.content_x() {
                panel.content_x() - candidate.right()
            } else if candidate.content_x() >= panel.right() {
                candidate.content_x() - panel.right()
            } else {
                (candidate.content_center() - panel.content_center()).abs()
            };
            if distance < best_distance {
                best_distance = distance;
                nearest = Some(*id);
            }
        }
        nearest
    }

    // -- anchor -------------------------------------------------------------

    /// Place the re-collapse click target near the pointer.
    fn create_anchor(&mut self, panel: &PanelHandle) {
        let pointer = self.ctx.windows.query_pointer();
        let Size { width, height } = self.settings.anchor_size;
        let x = (pointer.x - width / 2)
            .max(0)
            .min(self.ctx.screen_width() - width);
        let y = self.ctx.screen_height() - height;
        let bounds = Rect::new(x, y, width, height);

        self.ctx.windows.configure_window(self.anchor_input, bounds);
        self.ctx.windows.move_actor(self.anchor_actor, Point::new(x, y), 0);
        self.ctx
            .windows
            .set_actor_opacity(self.anchor_actor, 1.0, self.settings.anchor_fade_ms);

        // We might never get a leave event (the pointer may already be
        // gone by the time the input window exists), so poll the
        // pointer position as well.
        let weak = self.weak_self.clone();
        let watcher = PointerPositionWatcher::new(
            &self.ctx,
            Box::new(move || {
                if let Some(bar) = weak.upgrade() {
                    bar.borrow_mut().destroy_anchor();
                }
            }),
            false,
            bounds,
        );
        self.anchor = Some(AnchorState {
            panel: panel.borrow().id(),
            _watcher: watcher,
        });
    }

    fn destroy_anchor(&mut self) {
        self.ctx.windows.configure_window_offscreen(self.anchor_input);
        self.ctx
            .windows
            .set_actor_opacity(self.anchor_actor, 0.0, self.settings.anchor_fade_ms);
        self.anchor = None;
    }

    // -- collapsed-panel visibility machine ---------------------------------

    fn configure_show_collapsed_input(&self, onscreen: bool) {
        debug!(
            "{} input window for showing collapsed panels",
            if onscreen { "Showing" } else { "Hiding" }
        );
        if onscreen {
            let strip_height = self.settings.show_collapsed_strip_height;
            self.ctx.windows.configure_window(
                self.show_collapsed_input,
                Rect::new(
                    0,
                    self.ctx.screen_height() - strip_height,
                    self.ctx.screen_width(),
                    strip_height,
                ),
            );
        } else {
            self.ctx
                .windows
                .configure_window_offscreen(self.show_collapsed_input);
        }
    }

    fn start_hide_collapsed_watcher(&mut self) {
        let distance = self.settings.hide_collapsed_distance;
        let target = Rect::new(
            0,
            self.ctx.screen_height() - distance,
            self.ctx.screen_width(),
            distance,
        );
        let weak = self.weak_self.clone();
        self.hide_watcher = Some(PointerPositionWatcher::new(
            &self.ctx,
            Box::new(move || {
                if let Some(bar) = weak.upgrade() {
                    bar.borrow_mut().hide_collapsed_panels();
                }
            }),
            false,
            target,
        ));
    }

    fn show_collapsed_panels(&mut self) {
        debug!("Showing collapsed panels");
        self.disable_show_collapsed_timeout();
        self.collapsed_state = CollapsedPanelState::Shown;

        for handle in self.all_panels() {
            if handle.borrow().is_expanded() {
                continue;
            }
            let y = self.compute_panel_y(&handle.borrow());
            if handle.borrow().titlebar_y() != y {
                handle.borrow_mut().move_y(y, self.settings.hide_anim_ms);
            }
        }

        self.configure_show_collapsed_input(false);
        self.start_hide_collapsed_watcher();
    }

    fn hide_collapsed_panels(&mut self) {
        debug!("Hiding collapsed panels");
        self.disable_show_collapsed_timeout();

        if let Some(dragged) = self.dragged {
            if let Some(handle) = self.handle(dragged) {
                if !handle.borrow().is_expanded() {
                    // Mid-drag; hide once the drag completes instead.
                    debug!("Deferring hiding collapsed panels since {dragged} is being dragged");
                    self.collapsed_state = CollapsedPanelState::WaitingToHide;
                    return;
                }
            }
        }

        self.collapsed_state = CollapsedPanelState::Hidden;
        for handle in self.all_panels() {
            if handle.borrow().is_expanded() {
                continue;
            }
            let y = self.compute_panel_y(&handle.borrow());
            if handle.borrow().titlebar_y() != y {
                handle.borrow_mut().move_y(y, self.settings.hide_anim_ms);
            }
        }

        if self.num_collapsed() > 0 {
            self.configure_show_collapsed_input(true);
        }
        self.hide_watcher = None;
    }

    fn disable_show_collapsed_timeout(&mut self) {
        if let Some(timer) = self.show_collapsed_timer.take() {
            self.ctx.events.remove_timeout(timer);
        }
    }

    fn handle_show_collapsed_panels_timeout(&mut self) {
        debug_assert_eq!(self.collapsed_state, CollapsedPanelState::WaitingToShow);
        self.show_collapsed_timer = None;
        self.show_collapsed_panels();
    }
}

impl PanelContainer for PanelBar {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Bar
    }

    fn input_windows(&self) -> Vec<WindowId> {
        vec![self.anchor_input, self.show_collapsed_input]
    }

    fn add_panel(&mut self, panel: &PanelHandle, source: PanelSource) {
        self.add_panel_internal(panel, source);
    }

    fn remove_panel(&mut self, panel: &PanelHandle) {
        self.remove_panel_internal(panel);
    }

    /// Claim a panel once its bottom edge crosses within the attach
    /// threshold of the screen bottom.
    fn should_add_dragged_panel(&self, panel: &PanelHandle, drag_pos: Point) -> bool {
        drag_pos.y + panel.borrow().total_height()
            > self.ctx.screen_height() - self.settings.attach_threshold
    }

    fn handle_input_window_button_press(
        &mut self,
        window: WindowId,
        _absolute_pos: Point,
        button: u8,
        _timestamp: Timestamp,
    ) {
        if window != self.anchor_input || button != 1 {
            return;
        }
        // Collapse the panel the anchor was created for, if it still
        // exists.
        debug!("Got button press in anchor window");
        let anchor_panel = self.anchor.as_ref().map(|anchor| anchor.panel);
        self.destroy_anchor();
        match anchor_panel.and_then(|id| self.handle(id)) {
            Some(panel) => self.collapse_panel(&panel, self.settings.state_anim_ms),
            None => warn!("Anchor panel no longer exists"),
        }
    }

    fn handle_input_window_pointer_enter(
        &mut self,
        window: WindowId,
        absolute_pos: Point,
        _timestamp: Timestamp,
    ) {
        if window != self.show_collapsed_input {
            return;
        }
        debug!("Got mouse enter in show-collapsed-panels window");
        if absolute_pos.x >= self.ctx.screen_width() - self.packed_width {
            // A quick downward flick can land the pointer under a
            // collapsed panel without us ever seeing an enter event in
            // the panel's titlebar; show immediately in that case.
            self.show_collapsed_panels();
        } else if self.collapsed_state != CollapsedPanelState::Shown
            && self.collapsed_state != CollapsedPanelState::WaitingToShow
        {
            self.collapsed_state = CollapsedPanelState::WaitingToShow;
            debug_assert!(self.show_collapsed_timer.is_none());
            let weak = self.weak_self.clone();
            self.show_collapsed_timer = Some(self.ctx.events.add_timeout(
                Box::new(move || {
                    if let Some(bar) = weak.upgrade() {
                        bar.borrow_mut().handle_show_collapsed_panels_timeout();
                    }
                }),
                self.settings.show_delay_ms,
                0,
            ));
        }
    }

    fn handle_input_window_pointer_leave(
        &mut self,
        window: WindowId,
        _absolute_pos: Point,
        _timestamp: Timestamp,
    ) {
        if window != self.show_collapsed_input {
            return;
        }
        debug!("Got mouse leave in show-collapsed-panels window");
        if self.collapsed_state == CollapsedPanelState::WaitingToShow {
            self.collapsed_state = CollapsedPanelState::Hidden;
            self.disable_show_collapsed_timeout();
        }
    }

    fn handle_panel_button_press(&mut self, panel: &PanelHandle, _button: u8, timestamp: Timestamp) {
        debug!(
            "Got button press in {}; giving it the focus",
            panel.borrow().id()
        );
        self.focus_panel(panel, timestamp);
    }

    fn handle_panel_titlebar_pointer_enter(&mut self, panel: &PanelHandle, _timestamp: Timestamp) {
        debug!(
            "Got pointer enter in {}'s titlebar",
            panel.borrow().id()
        );
        // The server may deliver the titlebar enter before (or instead
        // of) the strip enter.
        if self.collapsed_state != CollapsedPanelState::Shown && !panel.borrow().is_expanded() {
            self.show_collapsed_panels();
        }
    }

    fn handle_set_panel_state_message(&mut self, panel: &PanelHandle, expand: bool) {
        if expand {
            self.expand_panel(panel, true, self.settings.state_anim_ms);
        } else {
            self.collapse_panel(panel, self.settings.state_anim_ms);
        }
    }

    fn handle_notify_panel_dragged(&mut self, panel: &PanelHandle, drag_pos: Point) -> bool {
        self.handle_notify_panel_dragged_internal(panel, drag_pos)
    }

    fn handle_notify_panel_drag_complete(&mut self, panel: &PanelHandle) {
        self.handle_panel_drag_complete(panel);
    }

    fn handle_focus_panel_message(&mut self, panel: &PanelHandle, timestamp: Timestamp) {
        if !panel.borrow().is_expanded() {
            self.expand_panel(panel, false, self.settings.state_anim_ms);
        }
        self.focus_panel(panel, timestamp);
    }

    fn handle_panel_resize_request(&mut self, panel: &PanelHandle, requested: Size) {
        panel
            .borrow_mut()
            .resize_content(requested, shell::geometry::Gravity::SouthEast, true);
        self.arrange_panels(true, None);
    }

    fn handle_panel_resize_by_user(&mut self, panel: &PanelHandle) {
        let id = panel.borrow().id();
        let mut fixed_floating_panel = None;
        if self.expect_info(id).is_floating {
            self.expect_info_mut(id).desired_right = panel.borrow().right();
            fixed_floating_panel = Some(id);
        }
        self.arrange_panels(true, fixed_floating_panel);
    }

    fn handle_screen_resize(&mut self) {
        // Jump every panel to its new Y first, then repack so the X
        // moves animate.
        for handle in self.all_panels() {
            let y = self.compute_panel_y(&handle.borrow());
            handle.borrow_mut().move_y(y, 0);
        }
        if let Some(dragged) = self.dragged {
            if !self.expect_info(dragged).is_floating {
                self.reorder_panel_in_vector(dragged, false);
            }
        }
        self.arrange_panels(true, None);
    }

    fn handle_panel_urgency_change(&mut self, panel: &PanelHandle) {
        if !panel.borrow().is_expanded() {
            let y = self.compute_panel_y(&panel.borrow());
            if panel.borrow().titlebar_y() != y {
                panel.borrow_mut().move_y(y, self.settings.hide_anim_ms);
            }
        }
    }

    fn take_focus(&mut self, timestamp: Timestamp) -> bool {
        self.take_focus_internal(timestamp)
    }
}

impl Drop for PanelBar {
    fn drop(&mut self) {
        self.disable_show_collapsed_timeout();
        self.ctx.windows.destroy_window(self.anchor_input);
        self.ctx.windows.destroy_window(self.show_collapsed_input);
        self.ctx.windows.destroy_actor(self.anchor_actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelSettings;
    use shell::events::EventLoop;
    use shell::geometry::Gravity;
    use shell::testing::MockWindowSystem;
    use shell::window::{PanelParams, SizeHints, WindowInfo, WindowSystem};

    const SCREEN_WIDTH: i32 = 1024;
    const SCREEN_HEIGHT: i32 = 768;

    struct Fixture {
        ctx: Rc<ShellContext>,
        mock: Rc<MockWindowSystem>,
        bar: Rc<RefCell<PanelBar>>,
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
            let bar = PanelBar::new(ctx.clone(), PanelSettings::default().bar);
            Self { ctx, mock, bar }
        }

        fn make_panel(&self, expanded: bool, params: PanelParams) -> PanelHandle {
            let content = WindowInfo {
                id: self.mock.alloc_client_window(),
                client_size: Size::new(200, 400),
                size_hints: SizeHints::default(),
                params,
            };
            let titlebar = WindowInfo {
                id: self.mock.alloc_client_window(),
                client_size: Size::new(200, 20),
                size_hints: SizeHints::default(),
                params: PanelParams::default(),
            };
            Panel::new(
                self.ctx.clone(),
                content,
                titlebar,
                expanded,
                PanelSettings::default().resize,
            )
        }

        fn add_panel(&self, expanded: bool) -> PanelHandle {
            let panel = self.make_panel(expanded, PanelParams::new());
            self.bar
                .borrow_mut()
                .add_panel(&panel, PanelSource::New);
            panel
        }

        fn drag(&self, panel: &PanelHandle, x: i32, y: i32) -> bool {
            self.bar
                .borrow_mut()
                .handle_notify_panel_dragged(panel, Point::new(x, y))
        }

        fn drag_complete(&self, panel: &PanelHandle) {
            self.bar.borrow_mut().handle_notify_panel_drag_complete(panel);
        }

        fn state(&self) -> CollapsedPanelState {
            self.bar.borrow().collapsed_state
        }

        fn strip(&self) -> WindowId {
            self.bar.borrow().show_collapsed_input
        }

        fn anchor_input(&self) -> WindowId {
            self.bar.borrow().anchor_input
        }

        fn enter_strip(&self, x: i32) {
            let strip = self.strip();
            self.bar.borrow_mut().handle_input_window_pointer_enter(
                strip,
                Point::new(x, SCREEN_HEIGHT - 1),
                0,
            );
        }
    }

    #[test]
    fn test_packed_panel_positions() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);
        let panel3 = fixture.add_panel(true);

        // right_padding=24, gap=6, width=200.
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 230);
        assert_eq!(panel3.borrow().right(), SCREEN_WIDTH - 436);
        // All sit at the expanded Y.
        assert_eq!(panel1.borrow().titlebar_y(), SCREEN_HEIGHT - 420);
    }

    #[test]
    fn test_new_panel_focus_honors_request() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        assert_eq!(
            fixture.mock.focused_window(),
            Some(panel1.borrow().content_id())
        );

        let quiet = fixture.make_panel(
            true,
            PanelParams {
                focus_requested: false,
                ..PanelParams::default()
            },
        );
        fixture.bar.borrow_mut().add_panel(&quiet, PanelSource::New);
        assert_eq!(
            fixture.mock.focused_window(),
            Some(panel1.borrow().content_id()),
            "panel that declined focus must not steal it"
        );
    }

    #[test]
    fn test_add_panel_next_to_creator() {
        let fixture = Fixture::new();
        let creator = fixture.add_panel(true);
        let other = fixture.add_panel(true);

        let child = fixture.make_panel(
            true,
            PanelParams {
                creator: Some(creator.borrow().content_id()),
                ..PanelParams::new()
            },
        );
        fixture.bar.borrow_mut().add_panel(&child, PanelSource::New);

        // The child lands immediately left of its creator; the older
        // second panel is pushed further left.
        assert_eq!(creator.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(child.borrow().right(), SCREEN_WIDTH - 230);
        assert_eq!(other.borrow().right(), SCREEN_WIDTH - 436);
    }

    #[test]
    fn test_drag_without_net_movement_keeps_order() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);
        let y = panel1.borrow().titlebar_y();

        assert!(fixture.drag(&panel1, SCREEN_WIDTH - 22, y));
        assert!(fixture.drag(&panel1, SCREEN_WIDTH - 24, y));
        fixture.drag_complete(&panel1);

        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 230);
    }

    #[test]
    fn test_reorder_requires_crossing_midpoint() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);
        let y = panel2.borrow().titlebar_y();

        // panel1 occupies 800..1000, so its midpoint is at 900.
        // Dragging panel2's right edge to 900 exactly does not swap.
        assert!(fixture.drag(&panel2, 900, y));
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);

        // One pixel past the midpoint swaps.
        assert!(fixture.drag(&panel2, 901, y));
        assert_eq!(
            panel1.borrow().right(),
            SCREEN_WIDTH - 230,
            "panel1 displaced to the left slot"
        );

        // panel1 now occupies 594..794 with midpoint 694. Dragging
        // panel2 back left of 901 but not across 694 does not un-swap.
        assert!(fixture.drag(&panel2, 899, y));
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 230);

        // Crossing back over panel1's midpoint with the left edge
        // un-swaps.
        assert!(fixture.drag(&panel2, 893, y));
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);

        fixture.drag_complete(&panel2);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 230);
    }

    #[test]
    fn test_panel_floats_past_threshold_and_repacks() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);
        let y = panel2.borrow().titlebar_y();

        // With panel2 packed, the floating threshold sits at
        // screen - (packed width - panel2) - 30 = 764.
        assert!(fixture.drag(&panel2, 700, y));
        fixture.drag_complete(&panel2);
        assert_eq!(panel2.borrow().right(), 700, "floats at the drop position");
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);

        // Dragging back toward the packed group repacks it.
        assert!(fixture.drag(&panel2, 900, y));
        fixture.drag_complete(&panel2);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 230);
    }

    #[test]
    fn test_floating_panel_pushed_left_by_growing_packed_group() {
        let fixture = Fixture::new();
        let _panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);
        let y = panel2.borrow().titlebar_y();

        assert!(fixture.drag(&panel2, 700, y));
        fixture.drag_complete(&panel2);
        assert_eq!(panel2.borrow().right(), 700);

        // A new packed panel narrows the space left of the packed
        // group; the floating panel may not overlap it.
        let _panel3 = fixture.add_panel(true);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 430 - 6);
    }

    #[test]
    fn test_should_add_dragged_panel_near_bottom() {
        let fixture = Fixture::new();
        let outside = fixture.make_panel(true, PanelParams::new());
        // total height 420, attach threshold 20: the bar claims the
        // panel once its bottom edge crosses screen-20.
        let bar = fixture.bar.borrow();
        assert!(!bar.should_add_dragged_panel(&outside, Point::new(500, SCREEN_HEIGHT - 441)));
        assert!(bar.should_add_dragged_panel(&outside, Point::new(500, SCREEN_HEIGHT - 439)));
    }

    #[test]
    fn test_collapsed_panel_show_after_delay() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        assert_eq!(fixture.state(), CollapsedPanelState::Hidden);
        // Hidden collapsed panels peek 3 pixels above the bottom.
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);
        assert_eq!(
            fixture.mock.input_window_bounds(fixture.strip()),
            Some(Rect::new(0, SCREEN_HEIGHT - 1, SCREEN_WIDTH, 1))
        );

        // Enter the strip left of the packed region: delayed show.
        fixture.mock.set_pointer(Point::new(10, SCREEN_HEIGHT - 1));
        fixture.enter_strip(10);
        assert_eq!(fixture.state(), CollapsedPanelState::WaitingToShow);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);

        fixture.ctx.events.advance(200);
        assert_eq!(fixture.state(), CollapsedPanelState::Shown);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 20);
        assert_eq!(
            fixture.mock.input_window_bounds(fixture.strip()),
            None,
            "strip retracts while panels are shown"
        );
    }

    #[test]
    fn test_strip_enter_over_packed_region_shows_immediately() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        // packed width is 224, so x >= 800 is over the packed region.
        fixture.enter_strip(900);
        assert_eq!(fixture.state(), CollapsedPanelState::Shown);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 20);
    }

    #[test]
    fn test_pointer_leave_cancels_pending_show() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        fixture.enter_strip(10);
        assert_eq!(fixture.state(), CollapsedPanelState::WaitingToShow);

        let strip = fixture.strip();
        fixture.bar.borrow_mut().handle_input_window_pointer_leave(
            strip,
            Point::new(10, SCREEN_HEIGHT - 100),
            0,
        );
        assert_eq!(fixture.state(), CollapsedPanelState::Hidden);

        fixture.ctx.events.advance(500);
        assert_eq!(fixture.state(), CollapsedPanelState::Hidden);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);
    }

    #[test]
    fn test_titlebar_enter_shows_directly() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        // The server can deliver the titlebar enter without a strip
        // enter if the pointer moves fast enough.
        fixture
            .bar
            .borrow_mut()
            .handle_panel_titlebar_pointer_enter(&panel, 0);
        assert_eq!(fixture.state(), CollapsedPanelState::Shown);
    }

    #[test]
    fn test_pointer_moving_away_hides_shown_panels() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 1));
        fixture.enter_strip(900);
        assert_eq!(fixture.state(), CollapsedPanelState::Shown);

        // Move the pointer above the hide distance; the watcher poll
        // notices and hides the panels again.
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 100));
        fixture.ctx.events.advance(200);
        assert_eq!(fixture.state(), CollapsedPanelState::Hidden);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);
        assert_eq!(
            fixture.mock.input_window_bounds(fixture.strip()),
            Some(Rect::new(0, SCREEN_HEIGHT - 1, SCREEN_WIDTH, 1)),
            "strip restored once panels are hidden"
        );
    }

    #[test]
    fn test_hide_deferred_while_collapsed_panel_dragged() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 1));
        fixture.enter_strip(900);
        assert_eq!(fixture.state(), CollapsedPanelState::Shown);

        // Start dragging the collapsed panel horizontally.
        let y = panel.borrow().titlebar_y();
        assert!(fixture.drag(&panel, SCREEN_WIDTH - 14, y));

        // Pointer leaves the bottom region mid-drag: hiding is
        // deferred, not performed.
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 100));
        fixture.ctx.events.advance(200);
        assert_eq!(fixture.state(), CollapsedPanelState::WaitingToHide);
        assert_eq!(panel.borrow().titlebar_y(), y, "panel not hidden mid-drag");

        // Pointer still away when the drag completes: hide now.
        fixture.drag_complete(&panel);
        assert_eq!(fixture.state(), CollapsedPanelState::Hidden);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);
    }

    #[test]
    fn test_deferred_hide_resumes_shown_if_pointer_returns() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 1));
        fixture.enter_strip(900);

        let y = panel.borrow().titlebar_y();
        assert!(fixture.drag(&panel, SCREEN_WIDTH - 14, y));
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 100));
        fixture.ctx.events.advance(200);
        assert_eq!(fixture.state(), CollapsedPanelState::WaitingToHide);

        // Pointer comes back down before the drag ends.
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 5));
        fixture.drag_complete(&panel);
        assert_eq!(fixture.state(), CollapsedPanelState::Shown);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 20);
    }

    #[test]
    fn test_vertical_drag_clamps_y() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(true);

        // First call decides the drag is vertical; horizontal changes
        // are ignored for the rest of the drag.
        assert!(fixture.drag(&panel, SCREEN_WIDTH - 24, 500));
        assert_eq!(panel.borrow().titlebar_y(), 500);
        assert_eq!(panel.borrow().right(), SCREEN_WIDTH - 24);

        assert!(fixture.drag(&panel, 100, SCREEN_HEIGHT + 50));
        assert_eq!(
            panel.borrow().titlebar_y(),
            SCREEN_HEIGHT - 20,
            "clamped at the collapsed position"
        );
        assert_eq!(
            panel.borrow().right(),
            SCREEN_WIDTH - 24,
            "horizontal movement ignored in vertical mode"
        );

        assert!(fixture.drag(&panel, SCREEN_WIDTH - 24, 0));
        assert_eq!(
            panel.borrow().titlebar_y(),
            SCREEN_HEIGHT - 420,
            "clamped at the expanded position"
        );
    }

    #[test]
    fn test_vertical_drag_complete_snaps_by_visibility() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(true);

        // Mostly hidden at release: collapses.
        assert!(fixture.drag(&panel, SCREEN_WIDTH - 24, 700));
        fixture.drag_complete(&panel);
        assert!(!panel.borrow().is_expanded());
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);

        // Drag it mostly back up: expands and takes the focus.
        assert!(fixture.drag(&panel, SCREEN_WIDTH - 24, 740));
        assert!(fixture.drag(&panel, SCREEN_WIDTH - 24, 400));
        fixture.drag_complete(&panel);
        assert!(panel.borrow().is_expanded());
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 420);
        assert_eq!(
            fixture.mock.focused_window(),
            Some(panel.borrow().content_id())
        );
    }

    #[test]
    fn test_remove_panel_refocuses_nearest_expanded() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);
        let _panel3 = fixture.add_panel(true);

        // Focus the rightmost panel, then remove it. panel2 (6 px away)
        // beats panel3 (212 px away) as the fallback.
        fixture.bar.borrow_mut().handle_panel_button_press(&panel1, 1, 0);
        fixture.bar.borrow_mut().remove_panel(&panel1);

        assert!(fixture.bar.borrow_mut().take_focus(0));
        assert_eq!(
            fixture.mock.focused_window(),
            Some(panel2.borrow().content_id())
        );
    }

    #[test]
    fn test_anchor_click_collapses_expanded_panel() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 2));

        fixture
            .bar
            .borrow_mut()
            .handle_set_panel_state_message(&panel, true);
        assert!(panel.borrow().is_expanded());
        let anchor_bounds = fixture
            .mock
            .input_window_bounds(fixture.anchor_input())
            .expect("anchor input window placed onscreen");
        assert_eq!(anchor_bounds, Rect::new(484, SCREEN_HEIGHT - 32, 32, 32));

        let anchor = fixture.anchor_input();
        fixture.bar.borrow_mut().handle_input_window_button_press(
            anchor,
            Point::new(500, SCREEN_HEIGHT - 2),
            1,
            0,
        );
        assert!(!panel.borrow().is_expanded(), "anchor click re-collapses");
        assert_eq!(
            fixture.mock.input_window_bounds(fixture.anchor_input()),
            None,
            "anchor dismissed"
        );
    }

    #[test]
    fn test_anchor_auto_dismissed_when_pointer_leaves() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        fixture.mock.set_pointer(Point::new(500, SCREEN_HEIGHT - 2));
        fixture
            .bar
            .borrow_mut()
            .handle_set_panel_state_message(&panel, true);

        fixture.mock.set_pointer(Point::new(10, 10));
        fixture.ctx.events.advance(200);
        assert_eq!(
            fixture.mock.input_window_bounds(fixture.anchor_input()),
            None
        );
        assert!(
            panel.borrow().is_expanded(),
            "auto-dismiss does not collapse the panel"
        );
    }

    #[test]
    fn test_resize_request_repacks_neighbors() {
        let fixture = Fixture::new();
        let panel1 = fixture.add_panel(true);
        let panel2 = fixture.add_panel(true);

        fixture
            .bar
            .borrow_mut()
            .handle_panel_resize_request(&panel1, Size::new(300, 400));
        assert_eq!(panel1.borrow().width(), 300);
        assert_eq!(panel1.borrow().right(), SCREEN_WIDTH - 24);
        assert_eq!(panel2.borrow().right(), SCREEN_WIDTH - 330);
    }

    #[test]
    fn test_resize_by_user_pins_floating_panel_and_shifts_neighbor() {
        let fixture = Fixture::new();
        let _packed = fixture.add_panel(true);
        let left = fixture.add_panel(true);
        let right = fixture.add_panel(true);
        let y = left.borrow().titlebar_y();

        // Float both: `right` ends up at 400, `left`... is dragged to
        // 700, so in screen order `right` sits left of `left`.
        assert!(fixture.drag(&right, 400, y));
        fixture.drag_complete(&right);
        assert!(fixture.drag(&left, 700, y));
        fixture.drag_complete(&left);
        assert_eq!(right.borrow().right(), 400);
        assert_eq!(left.borrow().right(), 700);

        // Grow the left-hand floating panel rightward into its
        // neighbor, then report the user resize.
        right
            .borrow_mut()
            .resize_content(Size::new(350, 400), Gravity::NorthWest, true);
        fixture.bar.borrow_mut().handle_panel_resize_by_user(&right);

        // The resized panel keeps its position; the overlapped
        // neighbor shifts right just far enough to clear it.
        assert_eq!(right.borrow().right(), 550);
        assert_eq!(left.borrow().right(), 756);
    }

    #[test]
    fn test_screen_resize_repacks_at_new_width() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(true);
        fixture.ctx.set_screen_size(Size::new(800, 600));
        fixture.bar.borrow_mut().handle_screen_resize();
        assert_eq!(panel.borrow().right(), 800 - 24);
        assert_eq!(panel.borrow().titlebar_y(), 600 - 420);
    }

    #[test]
    fn test_urgent_collapsed_panel_stays_at_shown_height() {
        let fixture = Fixture::new();
        let panel = fixture.add_panel(false);
        assert_eq!(panel.borrow().titlebar_y(), SCREEN_HEIGHT - 3);

        panel.borrow_mut().set_is_urgent(true);
        fixture.bar.borrow_mut().handle_panel_urgency_change(&panel);
        assert_eq!(
            panel.borrow().titlebar_y(),
            SCREEN_HEIGHT - 20,
            "urgent collapsed panel keeps its titlebar visible"
        );
    }
}
