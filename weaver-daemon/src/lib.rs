//! Sync generator scheduling for the build daemon: debounce timer, backoff,
//! run dedup, and the on-demand fetch entry point.

mod backoff;
mod error;
pub mod options;
pub mod runtime;
mod scheduler;
mod timer;

pub use backoff::Backoff;
pub use error::DaemonError;
pub use options::{SchedulerOptions, DEFAULT_INITIAL_WAIT, DEFAULT_MAX_WAIT};
pub use runtime::graph_events_task;
pub use scheduler::{SchedulerStatus, SyncGeneratorScheduler};

/// Install the global fmt subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Same as [`init_tracing`], emitting one JSON object per event.
pub fn init_json_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().json().with_env_filter(filter).try_init();
}
