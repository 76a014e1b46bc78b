//! Generator registry: the set of sync generators currently in play.
//!
//! Two sources feed the active set:
//! 1. task generators, declared in `syncGenerators` on any target of any
//!    project node in the graph;
//! 2. global generators, listed under `sync.globalGenerators` in the
//!    workspace config.
//!
//! Each source is rebuilt only when the digest of its inputs changes. Graphs
//! can be large, so walking every target on every notification is avoided.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use weaver_core::{GeneratorId, ProjectGraph, WorkspaceConfig};

use crate::error::SyncError;
use crate::hasher;

/// Outcome of [`GeneratorRegistry::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// Whether the graph or the config changed since the last reconcile.
    pub changed: bool,
    /// Generators that left the active set and must be forgotten.
    pub removed: Vec<GeneratorId>,
}

/// Tracks the active generator set and the input digests it was derived from.
#[derive(Debug, Default)]
pub struct GeneratorRegistry {
    task_inputs_hash: Option<String>,
    config_hash: Option<String>,
    task_generators: BTreeSet<GeneratorId>,
    global_generators: BTreeSet<GeneratorId>,
    active: BTreeSet<GeneratorId>,
}

/// Digests of the two generator sources, computed without touching a
/// registry so callers can hash a large graph before taking any lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDigests {
    task_inputs: String,
    config: String,
}

impl InputDigests {
    pub fn compute(graph: &ProjectGraph, config: &WorkspaceConfig) -> Result<Self, SyncError> {
        let graph_hash = hasher::hash_project_graph(graph).map_err(SyncError::GraphHash)?;
        // The disabled list filters the task source, so it is part of its inputs.
        let disabled: Vec<Value> = config
            .disabled_task_sync_generators()
            .into_iter()
            .map(|id| Value::String(id.0))
            .collect();
        let mut inputs = Map::new();
        inputs.insert("graph".into(), Value::String(graph_hash));
        inputs.insert("disabled".into(), Value::Array(disabled));
        let task_inputs = hasher::hash_value(&Value::Object(inputs));
        let config = hasher::hash_strings(config.global_generators().iter().map(GeneratorId::as_str));
        Ok(Self {
            task_inputs,
            config,
        })
    }
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the active set from `graph` and `config`.
    ///
    /// Returns `changed: false` and leaves everything untouched when neither
    /// input digest moved.
    pub fn reconcile(
        &mut self,
        graph: &ProjectGraph,
        config: &WorkspaceConfig,
    ) -> Result<Reconciliation, SyncError> {
        let digests = InputDigests::compute(graph, config)?;
        Ok(self.apply(graph, config, digests))
    }

    /// Like [`GeneratorRegistry::reconcile`], with digests computed up front
    /// by [`InputDigests::compute`] over the same `graph` and `config`.
    pub fn apply(
        &mut self,
        graph: &ProjectGraph,
        config: &WorkspaceConfig,
        digests: InputDigests,
    ) -> Reconciliation {
        let tasks_changed = self.collect_task_generators(graph, config, digests.task_inputs);
        let globals_changed = self.collect_global_generators(config, digests.config);
        if !tasks_changed && !globals_changed {
            tracing::debug!("graph and workspace config unchanged; keeping active generators");
            return Reconciliation::default();
        }

        let next: BTreeSet<GeneratorId> = self
            .task_generators
            .union(&self.global_generators)
            .cloned()
            .collect();
        let removed: Vec<GeneratorId> = self.active.difference(&next).cloned().collect();
        for id in &removed {
            tracing::info!("sync generator {id} is no longer registered");
        }
        self.active = next;

        Reconciliation {
            changed: true,
            removed,
        }
    }

    /// Currently active generators, in sorted order.
    pub fn active(&self) -> &BTreeSet<GeneratorId> {
        &self.active
    }

    pub fn is_active(&self, id: &GeneratorId) -> bool {
        self.active.contains(id)
    }

    fn collect_task_generators(
        &mut self,
        graph: &ProjectGraph,
        config: &WorkspaceConfig,
        digest: String,
    ) -> bool {
        if self.task_inputs_hash.as_deref() == Some(digest.as_str()) {
            return false;
        }
        self.task_inputs_hash = Some(digest);

        let disabled = config.disabled_task_sync_generators();
        self.task_generators = graph
            .task_sync_generators()
            .filter(|id| !disabled.contains(id))
            .cloned()
            .collect();
        tracing::debug!(
            "collected {} task sync generator(s)",
            self.task_generators.len()
        );
        true
    }

    fn collect_global_generators(&mut self, config: &WorkspaceConfig, digest: String) -> bool {
        if self.config_hash.as_deref() == Some(digest.as_str()) {
            return false;
        }
        self.config_hash = Some(digest);

        self.global_generators = config.global_generators().into_iter().collect();
        tracing::debug!(
            "collected {} global sync generator(s)",
            self.global_generators.len()
        );
        true
    }
}
