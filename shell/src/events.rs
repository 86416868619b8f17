//! Single-threaded cooperative timer dispatch.
//!
//! Every callback in the panel subsystem (resize coalescing, the
//! show-collapsed-panels delay, pointer polling) is an ordinary timeout
//! registered here and fired from the top level of the dispatch loop.
//! Nothing fires while another callback is on the stack, so callbacks may
//! freely borrow the components that own their timers.
//!
//! Time is virtual: the embedder (or a test) calls [`EventLoop::advance`]
//! to move the clock forward, and due timers fire in the order of their
//! deadlines. A callback may register new timeouts or cancel existing
//! ones, including its own or one belonging to a peer that is also due
//! in the same pass; a cancelled timer never fires.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle identifying a registered timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

type Callback = Rc<RefCell<Box<dyn FnMut()>>>;

struct TimerEntry {
    id: TimerId,
    fire_at: u64,
    /// Recurrence period in ms; `None` for one-shot timeouts.
    period: Option<u64>,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    now: u64,
    next_id: u64,
    timers: Vec<TimerEntry>,
}

/// The dispatch loop's timer table.
#[derive(Default)]
pub struct EventLoop {
    inner: RefCell<Inner>,
}

impl EventLoop {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now
    }

    /// Register a timeout that fires after `initial_delay_ms` and then,
    /// if `period_ms` is nonzero, every `period_ms` thereafter.
    pub fn add_timeout(
        &self,
        callback: Box<dyn FnMut()>,
        initial_delay_ms: u64,
        period_ms: u64,
    ) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = TimerId(inner.next_id);
        inner.next_id += 1;
        let fire_at = inner.now + initial_delay_ms;
        inner.timers.push(TimerEntry {
            id,
            fire_at,
            period: (period_ms > 0).then_some(period_ms),
            callback: Rc::new(RefCell::new(callback)),
        });
        id
    }

    /// Unregister a timeout. Returns false if the handle is unknown
    /// (already fired one-shot, or already removed). Legal to call from
    /// inside any callback, including the timer's own.
    pub fn remove_timeout(&self, id: TimerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.timers.len();
        inner.timers.retain(|entry| entry.id != id);
        inner.timers.len() != before
    }

    /// Is the handle still registered?
    pub fn is_registered(&self, id: TimerId) -> bool {
        self.inner.borrow().timers.iter().any(|e| e.id == id)
    }

    /// Advance virtual time by `ms`, firing every timer that comes due,
    /// in deadline order (registration order breaks ties).
    pub fn advance(&self, ms: u64) {
        let target = self.inner.borrow().now + ms;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.fire_at <= target)
                    .min_by_key(|(_, e)| e.fire_at)
                    .map(|(i, e)| (i, e.fire_at));
                match due {
                    None => {
                        inner.now = target;
                        break;
                    }
                    Some((index, fire_at)) => {
                        inner.now = fire_at;
                        let callback = inner.timers[index].callback.clone();
                        match inner.timers[index].period {
                            Some(period) => inner.timers[index].fire_at = fire_at + period,
                            None => {
                                inner.timers.remove(index);
                            }
                        }
                        callback
                    }
                }
            };
            // The table borrow is released before the callback runs so it
            // can add or cancel timers.
            let mut callback = next.borrow_mut();
            (*callback)();
        }
    }

    /// Fire anything already due without moving the clock.
    pub fn run_pending(&self) {
        self.advance(0);
    }
}
