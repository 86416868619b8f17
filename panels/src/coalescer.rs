//! Rate-limiting for streams of motion events.
//!
//! Motion events arrive much faster than we want to act on them. The
//! coalescer stores the most recent position as events come in and
//! invokes its callback from a periodic timer, but only when a new
//! position has actually been received since the last run. Stopping the
//! coalescer reports whether a position is still pending so the owner
//! can apply it one last time; the callback is never invoked from
//! inside [`MotionEventCoalescer::stop`], which keeps the owner free to
//! call `stop` while it is itself borrowed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use shell::events::{EventLoop, TimerId};
use shell::geometry::Point;
use tracing::warn;

#[derive(Default)]
struct SharedState {
    pending: Cell<bool>,
    position: Cell<Point>,
}

pub struct MotionEventCoalescer {
    events: Rc<EventLoop>,
    period_ms: u64,
    timer: Option<TimerId>,
    shared: Rc<SharedState>,
    callback: Rc<RefCell<Box<dyn FnMut()>>>,
    /// Invoke the callback directly from `store_position` instead of
    /// from a timer. Useful for tests.
    synchronous: bool,
}

impl MotionEventCoalescer {
    pub fn new(events: Rc<EventLoop>, callback: Box<dyn FnMut()>, period_ms: u64) -> Self {
        debug_assert!(period_ms > 0);
        Self {
            events,
            period_ms,
            timer: None,
            shared: Rc::new(SharedState::default()),
            callback: Rc::new(RefCell::new(callback)),
            synchronous: false,
        }
    }

    pub fn set_synchronous(&mut self, synchronous: bool) {
        self.synchronous = synchronous;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn position(&self) -> Point {
        self.shared.position.get()
    }

    pub fn x(&self) -> i32 {
        self.shared.position.get().x
    }

    pub fn y(&self) -> i32 {
        self.shared.position.get().y
    }

    /// Start the periodic timer.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            warn!("Ignoring request to start coalescer while timer is already running");
            return;
        }
        self.shared.pending.set(false);
        self.shared.position.set(Point::new(-1, -1));
        if self.synchronous {
            return;
        }
        let shared = self.shared.clone();
        let callback = self.callback.clone();
        self.timer = Some(self.events.add_timeout(
            Box::new(move || {
                if shared.pending.replace(false) {
                    (*callback.borrow_mut())();
                }
            }),
            0,
            self.period_ms,
        ));
    }

    /// Cancel the timer. Returns true if a position was received since
    /// the callback last ran; the owner should process it.
    pub fn stop(&mut self) -> bool {
        if self.synchronous {
            return self.shared.pending.replace(false);
        }
        let Some(timer) = self.timer.take() else {
            warn!("Ignoring request to stop coalescer while timer isn't running");
            return false;
        };
        self.events.remove_timeout(timer);
        self.shared.pending.replace(false)
    }

    /// Record a position. Called for every motion event; identical
    /// consecutive positions are dropped.
    pub fn store_position(&self, position: Point) {
        if position == self.shared.position.get() {
            return;
        }
        self.shared.position.set(position);
        self.shared.pending.set(true);
        if self.synchronous {
            self.shared.pending.set(false);
            (*self.callback.borrow_mut())();
        }
    }
}

impl Drop for MotionEventCoalescer {
    fn drop(&mut self) {
        // No final callback here: parts of the owner may already be gone.
        if let Some(timer) = self.timer.take() {
            self.events.remove_timeout(timer);
        }
    }
}
