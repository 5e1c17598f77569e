//! Tracing bootstrap for binaries and tests embedding the scheduler.
//!
//! The scheduler itself never installs a subscriber; every manager logs under
//! its own span and the host decides where events go.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "pin_scheduler=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (falling back to
/// [`DEFAULT_FILTER`]). Does nothing if a global subscriber already exists.
///
/// Worker and coordinator threads are named, so thread names are included in
/// every line.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .try_init();
}
