use std::sync::Arc;

use thiserror::Error;

use weaver_sync::SyncError;

/// Error surface for the sync generator scheduler.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] weaver_core::ConfigError),

    #[error("failed to collect sync generators: {0}")]
    Collect(#[from] SyncError),

    #[error("sync generator run failed: {0}")]
    Run(Arc<SyncError>),

    #[error("no project graph has been collected yet")]
    NoProjectGraph,
}
