//! Weaver core library: graph and workspace types, configuration loading, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and the consumed project graph shape
//! - [`config`]: `weaver.json` loading via [`WorkspaceConfigSource`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{FileConfigSource, SyncConfig, WorkspaceConfig, WorkspaceConfigSource};
pub use error::ConfigError;
pub use types::{
    ChangeType, DependencyType, ExternalNode, FileChange, GeneratorId, ProjectConfiguration,
    ProjectGraph, ProjectGraphDependency, ProjectGraphNode, ProjectsConfigurations,
    TargetConfiguration,
};
