//! Error types for weaver-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while reading workspace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the file that could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load. Includes the file path and serde_json's
    /// line/column context. Malformed generator lists (non-string entries)
    /// land here.
    #[error("failed to parse workspace config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
