//! The sync generator scheduler.
//!
//! Graph changes come in through [`SyncGeneratorScheduler::collect_and_schedule`]:
//! the registry recomputes the active generators, every active generator is
//! scheduled, and a debounce timer is armed. When the timer fires, every
//! scheduled generator is dispatched and its run cached.
//!
//! Callers that need results right now go through
//! [`SyncGeneratorScheduler::get_cached_changes`], which cancels the pending
//! timer, forces runs for generators with pending changes, and reuses cached
//! runs for the rest.
//!
//! All state sits behind one async mutex. The lock is never held while
//! awaiting a generator run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tokio::sync::Mutex;

use weaver_core::{
    FileChange, FileConfigSource, GeneratorId, ProjectGraph, ProjectsConfigurations,
    WorkspaceConfigSource,
};
use weaver_sync::{GeneratorEngine, GeneratorRegistry, InputDigests, RunCache, RunFuture, Runner};

use crate::backoff::Backoff;
use crate::error::DaemonError;
use crate::options::SchedulerOptions;
use crate::timer::DebounceTimer;

/// Point-in-time view of the scheduler, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub active: Vec<GeneratorId>,
    pub scheduled: Vec<GeneratorId>,
    pub cached: Vec<GeneratorId>,
    pub timer_armed: bool,
    pub wait_ms: u64,
}

/// Owns the registry, the scheduled set, the run cache and the timer.
///
/// Cloning is cheap and every clone drives the same state.
#[derive(Clone)]
pub struct SyncGeneratorScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    runner: Runner,
    config: Arc<dyn WorkspaceConfigSource>,
    state: Mutex<SchedulerState>,
}

struct SchedulerState {
    registry: GeneratorRegistry,
    scheduled: BTreeSet<GeneratorId>,
    cache: RunCache,
    backoff: Backoff,
    timer: DebounceTimer,
    graph: Option<Arc<ProjectGraph>>,
}

impl SchedulerState {
    /// Start a fresh run of `id`, taking it off the scheduled set.
    fn dispatch(
        &mut self,
        runner: &Runner,
        id: &GeneratorId,
        projects: &Arc<ProjectsConfigurations>,
    ) -> RunFuture {
        tracing::debug!(generator = %id, "dispatching sync generator");
        self.scheduled.remove(id);
        self.cache.rerun(id, || runner.run(id, projects.clone()))
    }

    /// Project configuration of the latest graph, resolved at most once per pass.
    fn projects(
        &self,
        resolved: &mut Option<Arc<ProjectsConfigurations>>,
    ) -> Result<Arc<ProjectsConfigurations>, DaemonError> {
        if let Some(projects) = resolved {
            return Ok(projects.clone());
        }
        let graph = self.graph.as_ref().ok_or(DaemonError::NoProjectGraph)?;
        let projects = Arc::new(graph.projects_configuration());
        *resolved = Some(projects.clone());
        Ok(projects)
    }
}

impl SyncGeneratorScheduler {
    pub fn new(
        options: SchedulerOptions,
        engine: Arc<dyn GeneratorEngine>,
        config: Arc<dyn WorkspaceConfigSource>,
    ) -> Self {
        let state = SchedulerState {
            registry: GeneratorRegistry::new(),
            scheduled: BTreeSet::new(),
            cache: RunCache::new(),
            backoff: Backoff::new(options.initial_wait, options.max_wait),
            timer: DebounceTimer::new(),
            graph: None,
        };
        Self {
            inner: Arc::new(Inner {
                runner: Runner::new(options.workspace_root, engine),
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// Scheduler for a workspace whose config lives in `<root>/weaver.json`.
    pub fn for_workspace(options: SchedulerOptions, engine: Arc<dyn GeneratorEngine>) -> Self {
        let config = Arc::new(FileConfigSource::new(options.workspace_root.clone()));
        Self::new(options, engine, config)
    }

    /// Take in a new graph snapshot.
    ///
    /// Reconciles the active generator set against the graph and the
    /// workspace config. If either changed, every active generator is
    /// scheduled and the debounce timer is armed unless it already is.
    /// An unchanged graph and config leave all state as it was, and so does
    /// a config or graph that cannot be read.
    pub async fn collect_and_schedule(
        &self,
        graph: impl Into<Arc<ProjectGraph>>,
    ) -> Result<(), DaemonError> {
        let graph = graph.into();
        let config = self.inner.config.load()?;
        // Hashing walks the whole graph; keep it outside the lock.
        let digests = InputDigests::compute(&graph, &config)?;

        let mut state = self.inner.state.lock().await;
        tracing::debug!("collect registered sync generators");
        let outcome = state.registry.apply(&graph, &config, digests);
        state.graph = Some(graph);

        for id in &outcome.removed {
            state.scheduled.remove(id);
            if state.cache.remove(id).is_some() {
                tracing::debug!(generator = %id, "dropped cached run of removed generator");
            }
        }

        if !outcome.changed {
            return Ok(());
        }

        // A change anywhere can affect any generator's output.
        let active = state.registry.active().clone();
        state.scheduled.extend(active);
        tracing::info!(scheduled = ?state.scheduled, "scheduled sync generators");

        let wait = state.backoff.current();
        let inner = self.inner.clone();
        if state
            .timer
            .arm(wait, move |generation| async move { inner.fire(generation).await })
        {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "armed sync generator timer");
        }
        Ok(())
    }

    /// Up-to-date changes for `generators`, concatenated in request order.
    ///
    /// Any failure clears every cached run and yields no changes; the next
    /// call recomputes from scratch.
    pub async fn get_cached_changes(&self, generators: &[GeneratorId]) -> Vec<FileChange> {
        match self.try_get_changes(generators).await {
            Ok(changes) => changes,
            Err(err) => {
                tracing::error!(error = %err, "failed to get sync generator changes");
                self.inner.state.lock().await.cache.clear();
                Vec::new()
            }
        }
    }

    async fn try_get_changes(
        &self,
        generators: &[GeneratorId],
    ) -> Result<Vec<FileChange>, DaemonError> {
        let runner = &self.inner.runner;
        let futures = {
            let mut state = self.inner.state.lock().await;
            // Invoked imperatively, so the debounced pass is no longer needed.
            if state.timer.cancel() {
                tracing::debug!("cleared scheduled sync generator run");
            }
            state.backoff.reset();

            let mut projects = None;
            let mut futures = Vec::with_capacity(generators.len());
            for id in generators {
                tracing::debug!(generator = %id, "on demand generator");
                let future = if state.scheduled.contains(id) {
                    tracing::debug!(generator = %id, "generator has pending changes, running now");
                    let projects = state.projects(&mut projects)?;
                    state.dispatch(runner, id, &projects)
                } else if let Some(cached) = state.cache.get(id) {
                    cached
                } else {
                    if !state.registry.is_active(id) {
                        tracing::debug!(generator = %id, "generator is not registered, running anyway");
                    }
                    tracing::debug!(generator = %id, "not scheduled and no cached result");
                    let projects = state.projects(&mut projects)?;
                    state.cache.get_or_run(id, || runner.run(id, projects))
                };
                futures.push(future);
            }
            futures
        };

        let outputs = try_join_all(futures).await.map_err(DaemonError::Run)?;
        Ok(outputs
            .iter()
            .flat_map(|changes| changes.iter().cloned())
            .collect())
    }

    /// Cancel the timer and forget scheduled and cached runs.
    ///
    /// In-flight runs still finish; their results are dropped.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        state.timer.cancel();
        state.scheduled.clear();
        state.cache.clear();
    }

    pub async fn active(&self) -> Vec<GeneratorId> {
        let state = self.inner.state.lock().await;
        state.registry.active().iter().cloned().collect()
    }

    pub async fn scheduled(&self) -> Vec<GeneratorId> {
        let state = self.inner.state.lock().await;
        state.scheduled.iter().cloned().collect()
    }

    pub async fn cached(&self) -> Vec<GeneratorId> {
        self.inner.state.lock().await.cache.ids()
    }

    pub async fn is_armed(&self) -> bool {
        self.inner.state.lock().await.timer.is_armed()
    }

    /// Wait the next timer arm will use.
    pub async fn current_wait(&self) -> Duration {
        self.inner.state.lock().await.backoff.current()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock().await;
        SchedulerStatus {
            active: state.registry.active().iter().cloned().collect(),
            scheduled: state.scheduled.iter().cloned().collect(),
            cached: state.cache.ids(),
            timer_armed: state.timer.is_armed(),
            wait_ms: state.backoff.current().as_millis() as u64,
        }
    }
}

impl Inner {
    /// Debounce timer callback: run everything still scheduled.
    async fn fire(&self, generation: u64) {
        let futures = {
            let mut state = self.state.lock().await;
            if !state.timer.take_if_current(generation) {
                return;
            }
            let next = state.backoff.advance();
            tracing::debug!(next_wait_ms = next.as_millis() as u64, "sync generator timer fired");

            if state.scheduled.is_empty() {
                return;
            }

            let mut projects = None;
            let projects = match state.projects(&mut projects) {
                Ok(projects) => projects,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping scheduled sync generators");
                    return;
                }
            };
            let ids: Vec<GeneratorId> = state.scheduled.iter().cloned().collect();
            let mut futures = Vec::with_capacity(ids.len());
            for id in &ids {
                tracing::info!(generator = %id, "running scheduled generator");
                futures.push(state.dispatch(&self.runner, id, &projects));
            }
            futures
        };

        for result in join_all(futures).await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "scheduled sync generator failed");
            }
        }
    }
}
