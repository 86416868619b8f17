//! Pointer-position polling against a target rectangle.
//!
//! Periodically queries the pointer and invokes a callback once the
//! pointer has moved into (or out of) a target rect. This avoids two
//! races that input windows can't: a window opened under the pointer may
//! never see a leave event if the pointer was already gone when the
//! window appeared, and watching a region with an input window would
//! steal events from whatever is underneath it.
//!
//! Polling wakes the process, so watchers should only exist while the
//! user is likely to cross the boundary soon. The watcher cancels its
//! own timer before running the callback; dropping it cancels the poll.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use shell::events::{EventLoop, TimerId};
use shell::geometry::Rect;
use shell::ShellContext;

/// How frequently the pointer position is queried, in milliseconds.
const POLL_INTERVAL_MS: u64 = 200;

pub struct PointerPositionWatcher {
    events: Weak<EventLoop>,
    timer: Rc<Cell<Option<TimerId>>>,
}

impl PointerPositionWatcher {
    /// Start watching. If `watch_for_enter` is true the callback runs
    /// once the pointer is inside `target`; otherwise once it is
    /// outside.
    pub fn new(
        ctx: &Rc<ShellContext>,
        callback: Box<dyn FnMut()>,
        watch_for_enter: bool,
        target: Rect,
    ) -> Self {
        let timer = Rc::new(Cell::new(None));
        let callback = Rc::new(RefCell::new(callback));
        let windows = ctx.windows.clone();
        let events = Rc::downgrade(&ctx.events);
        let poll = {
            let timer = timer.clone();
            let events = events.clone();
            move || {
                let position = windows.query_pointer();
                if target.contains_point(position) != watch_for_enter {
                    return;
                }
                // Cancel before running the callback: the callback may
                // drop this watcher.
                if let (Some(id), Some(events)) = (timer.take(), events.upgrade()) {
                    events.remove_timeout(id);
                }
                (*callback.borrow_mut())();
            }
        };
        let id = ctx
            .events
            .add_timeout(Box::new(poll), 0, POLL_INTERVAL_MS);
        timer.set(Some(id));
        Self { events, timer }
    }

    /// Is the poll still active (callback not yet run)?
    pub fn is_active(&self) -> bool {
        self.timer.get().is_some()
    }
}

impl Drop for PointerPositionWatcher {
    fn drop(&mut self) {
        if let (Some(id), Some(events)) = (self.timer.take(), self.events.upgrade()) {
            events.remove_timeout(id);
        }
    }
}
