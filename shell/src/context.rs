//! Shared handles injected into every panel component.

use std::cell::Cell;
use std::rc::Rc;

use crate::events::EventLoop;
use crate::geometry::Size;
use crate::window::WindowSystem;

/// Screen bounds, the timer dispatch loop, and the window system,
/// bundled so components take a single constructor argument.
pub struct ShellContext {
    screen: Cell<Size>,
    pub events: Rc<EventLoop>,
    pub windows: Rc<dyn WindowSystem>,
}

impl ShellContext {
    pub fn new(screen: Size, events: Rc<EventLoop>, windows: Rc<dyn WindowSystem>) -> Rc<Self> {
        Rc::new(Self {
            screen: Cell::new(screen),
            events,
            windows,
        })
    }

    pub fn screen_size(&self) -> Size {
        self.screen.get()
    }

    pub fn screen_width(&self) -> i32 {
        self.screen.get().width
    }

    pub fn screen_height(&self) -> i32 {
        self.screen.get().height
    }

    /// Record new screen bounds. Containers are told separately via
    /// their screen-resize handlers.
    pub fn set_screen_size(&self, size: Size) {
        self.screen.set(size);
    }
}
