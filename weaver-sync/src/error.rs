//! Error types for weaver-sync.

use std::path::PathBuf;

use thiserror::Error;

use weaver_core::GeneratorId;

/// All errors that can arise while running sync generators.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The generator engine reported a failure.
    #[error("sync generator {generator} failed: {message}")]
    Generator {
        generator: GeneratorId,
        message: String,
    },

    /// The workspace snapshot could not be acquired.
    #[error("cannot snapshot workspace at {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project graph could not be serialized for hashing.
    #[error("cannot hash project graph: {0}")]
    GraphHash(#[source] serde_json::Error),

    /// The task driving a run panicked or was aborted.
    #[error("sync generator task failed: {0}")]
    Join(String),
}

impl SyncError {
    /// Convenience constructor for [`SyncError::Generator`].
    pub fn generator(generator: &GeneratorId, message: impl Into<String>) -> Self {
        SyncError::Generator {
            generator: generator.clone(),
            message: message.into(),
        }
    }
}
