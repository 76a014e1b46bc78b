//! Workspace configuration (`weaver.json`).
//!
//! Only the `sync` section matters to the scheduler; unknown top-level keys
//! are ignored so the file can be shared with other tooling.
//!
//! ```json
//! {
//!   "sync": {
//!     "globalGenerators": ["@acme/tools:readme"],
//!     "disabledTaskSyncGenerators": ["@acme/tools:legacy"]
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::GeneratorId;

/// File name of the workspace configuration, relative to the workspace root.
pub const CONFIG_FILE_NAME: &str = "weaver.json";

/// `sync` section of the workspace configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Generators that run regardless of which targets declare them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_generators: Option<Vec<GeneratorId>>,
    /// Task-declared generators the workspace has opted out of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_task_sync_generators: Option<Vec<GeneratorId>>,
}

/// Root of `weaver.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncConfig>,
}

impl WorkspaceConfig {
    /// Global generators, sorted and deduplicated.
    pub fn global_generators(&self) -> Vec<GeneratorId> {
        sorted(self.sync.as_ref().and_then(|s| s.global_generators.as_deref()))
    }

    /// Disabled task generators, sorted and deduplicated.
    pub fn disabled_task_sync_generators(&self) -> Vec<GeneratorId> {
        sorted(
            self.sync
                .as_ref()
                .and_then(|s| s.disabled_task_sync_generators.as_deref()),
        )
    }
}

fn sorted(ids: Option<&[GeneratorId]>) -> Vec<GeneratorId> {
    let mut ids = ids.map(<[GeneratorId]>::to_vec).unwrap_or_default();
    ids.sort();
    ids.dedup();
    ids
}

/// Where the scheduler reads workspace configuration from on each collection.
pub trait WorkspaceConfigSource: Send + Sync {
    fn load(&self) -> Result<WorkspaceConfig, ConfigError>;
}

/// A fixed configuration; used when the host already holds a parsed config.
impl WorkspaceConfigSource for WorkspaceConfig {
    fn load(&self) -> Result<WorkspaceConfig, ConfigError> {
        Ok(self.clone())
    }
}

/// Reads `<root>/weaver.json` from disk on every load.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    root: PathBuf,
}

impl FileConfigSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl WorkspaceConfigSource for FileConfigSource {
    fn load(&self) -> Result<WorkspaceConfig, ConfigError> {
        load_at(&self.root)
    }
}

/// `<root>/weaver.json`. Pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Load the workspace configuration under `root`.
///
/// A missing file yields the default (empty) configuration; a malformed one
/// returns [`ConfigError::Parse`] with the path.
pub fn load_at(root: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let path = config_path_at(root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(WorkspaceConfig::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_generators_are_sorted_and_deduplicated() {
        let config = WorkspaceConfig {
            sync: Some(SyncConfig {
                global_generators: Some(vec!["b".into(), "a".into(), "b".into()]),
                disabled_task_sync_generators: None,
            }),
        };
        assert_eq!(
            config.global_generators(),
            vec![GeneratorId::from("a"), GeneratorId::from("b")]
        );
        assert!(config.disabled_task_sync_generators().is_empty());
    }

    #[test]
    fn missing_sync_section_means_no_generators() {
        assert!(WorkspaceConfig::default().global_generators().is_empty());
    }

    #[test]
    fn static_source_returns_clone() {
        let config = WorkspaceConfig {
            sync: Some(SyncConfig {
                global_generators: Some(vec!["gen-readme".into()]),
                ..Default::default()
            }),
        };
        assert_eq!(config.load().expect("load"), config);
    }
}
