//! Translucent preview rectangle shown during non-opaque resizes.

use std::rc::Rc;

use shell::geometry::Rect;
use shell::window::{ActorId, StackingLayer};
use shell::ShellContext;

pub struct ResizeBox {
    ctx: Rc<ShellContext>,
    actor: ActorId,
}

impl ResizeBox {
    pub fn new(ctx: Rc<ShellContext>, bounds: Rect, opacity: f64) -> Self {
        let actor = ctx.windows.create_actor("resize box");
        ctx.windows.move_actor(actor, bounds.position(), 0);
        ctx.windows.resize_actor(actor, bounds.size());
        ctx.windows.set_actor_opacity(actor, opacity, 0);
        ctx.windows
            .stack_actor_at_top_of_layer(actor, StackingLayer::DraggedPanel);
        ctx.windows.show_actor(actor);
        Self { ctx, actor }
    }

    pub fn set_bounds(&self, bounds: Rect, anim_ms: u32) {
        self.ctx.windows.move_actor(self.actor, bounds.position(), anim_ms);
        self.ctx.windows.resize_actor(self.actor, bounds.size());
    }
}

impl Drop for ResizeBox {
    fn drop(&mut self) {
        self.ctx.windows.destroy_actor(self.actor);
    }
}
