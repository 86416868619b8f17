//! Support crate for the panel subsystem: pixel geometry, the
//! cooperative timer dispatch loop, and the window-system abstraction
//! the containers talk to.

pub mod context;
pub mod events;
pub mod geometry;
pub mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use context::ShellContext;

/// Initialize logging for the shell
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
