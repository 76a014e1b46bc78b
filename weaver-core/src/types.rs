//! Domain types for the Weaver scheduling core.
//!
//! The project graph is produced by the build daemon's graph construction and
//! consumed here as plain data. All types deserialize from the camelCase JSON
//! the daemon serializes graphs to.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a sync generator, e.g. `@acme/tools:routes`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratorId(pub String);

impl GeneratorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GeneratorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GeneratorId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Project configuration
// ---------------------------------------------------------------------------

/// Configuration of a single target (task) of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<serde_json::Value>,
    /// Generators that must run before this target executes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_generators: Option<Vec<GeneratorId>>,
}

/// Resolved configuration of a project, as stored on a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub targets: HashMap<String, TargetConfiguration>,
}

/// Project name → resolved configuration. Handed to every generator run.
pub type ProjectsConfigurations = HashMap<String, ProjectConfiguration>;

// ---------------------------------------------------------------------------
// Project graph
// ---------------------------------------------------------------------------

/// A workspace project in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraphNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub data: ProjectConfiguration,
}

/// A third-party package node (npm, cargo, …) in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// How one project depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    #[default]
    Static,
    Dynamic,
    Implicit,
}

/// A dependency edge `source → target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGraphDependency {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub dependency_type: DependencyType,
}

/// The project graph snapshot handed to the scheduler on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraph {
    #[serde(default)]
    pub nodes: HashMap<String, ProjectGraphNode>,
    #[serde(default)]
    pub dependencies: HashMap<String, Vec<ProjectGraphDependency>>,
    #[serde(default)]
    pub external_nodes: HashMap<String, ExternalNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ProjectGraph {
    /// Every generator named by any target of any project, duplicates included.
    pub fn task_sync_generators(&self) -> impl Iterator<Item = &GeneratorId> {
        self.nodes
            .values()
            .flat_map(|node| node.data.targets.values())
            .filter_map(|target| target.sync_generators.as_ref())
            .flatten()
    }

    /// Project name → configuration map derived from the graph nodes.
    pub fn projects_configuration(&self) -> ProjectsConfigurations {
        self.nodes
            .iter()
            .map(|(name, node)| {
                let mut config = node.data.clone();
                config.name.get_or_insert_with(|| name.clone());
                (name.clone(), config)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Generator output
// ---------------------------------------------------------------------------

/// Kind of edit a generator wants applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// One file edit produced by a generator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

impl FileChange {
    pub fn create(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            change_type: ChangeType::Create,
            content: Some(content.into()),
        }
    }

    pub fn update(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            change_type: ChangeType::Update,
            content: Some(content.into()),
        }
    }

    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            change_type: ChangeType::Delete,
            content: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
