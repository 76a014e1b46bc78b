//! Runner: adapts a generator engine to a fresh workspace snapshot.
//!
//! How a generator mutates the workspace and turns edits into
//! [`FileChange`]s is the engine's business. The runner only takes the
//! snapshot, names it after the generator, and hands everything over.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use weaver_core::{FileChange, GeneratorId, ProjectsConfigurations};

use crate::error::SyncError;
use crate::run_cache::PendingRun;

/// Point-in-time view of the workspace file tree handed to one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    root: PathBuf,
    description: String,
}

impl WorkspaceSnapshot {
    /// Take a snapshot rooted at `root`. Fails if the root is not a directory.
    pub fn acquire(root: &Path, description: impl Into<String>) -> Result<Self, SyncError> {
        let meta = std::fs::metadata(root).map_err(|source| SyncError::Snapshot {
            path: root.to_path_buf(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(SyncError::Snapshot {
                path: root.to_path_buf(),
                source: std::io::Error::other("workspace root is not a directory"),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            description: description.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Executes one sync generator against a snapshot.
pub trait GeneratorEngine: Send + Sync {
    fn run(
        &self,
        snapshot: WorkspaceSnapshot,
        generator: &GeneratorId,
        projects: Arc<ProjectsConfigurations>,
    ) -> BoxFuture<'static, Result<Vec<FileChange>, SyncError>>;
}

impl<F> GeneratorEngine for F
where
    F: Fn(
            WorkspaceSnapshot,
            &GeneratorId,
            Arc<ProjectsConfigurations>,
        ) -> BoxFuture<'static, Result<Vec<FileChange>, SyncError>>
        + Send
        + Sync,
{
    fn run(
        &self,
        snapshot: WorkspaceSnapshot,
        generator: &GeneratorId,
        projects: Arc<ProjectsConfigurations>,
    ) -> BoxFuture<'static, Result<Vec<FileChange>, SyncError>> {
        self(snapshot, generator, projects)
    }
}

/// Stateless adapter between the scheduler and the engine.
#[derive(Clone)]
pub struct Runner {
    root: PathBuf,
    engine: Arc<dyn GeneratorEngine>,
}

impl Runner {
    pub fn new(root: impl Into<PathBuf>, engine: Arc<dyn GeneratorEngine>) -> Self {
        Self {
            root: root.into(),
            engine,
        }
    }

    /// Build the run for `generator`. Nothing happens until it is polled; the
    /// snapshot is taken when the run starts, not when it is queued.
    pub fn run(&self, generator: &GeneratorId, projects: Arc<ProjectsConfigurations>) -> PendingRun {
        let root = self.root.clone();
        let engine = self.engine.clone();
        let generator = generator.clone();
        async move {
            let snapshot =
                WorkspaceSnapshot::acquire(&root, format!("running sync generator {generator}"))?;
            tracing::info!("running sync generator {generator}");
            let changes = engine.run(snapshot, &generator, projects).await?;
            tracing::debug!(
                "sync generator {generator} produced {} change(s)",
                changes.len()
            );
            Ok(changes)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingEngine {
        seen: Mutex<Vec<(String, String, usize)>>,
    }

    impl GeneratorEngine for RecordingEngine {
        fn run(
            &self,
            snapshot: WorkspaceSnapshot,
            generator: &GeneratorId,
            projects: Arc<ProjectsConfigurations>,
        ) -> BoxFuture<'static, Result<Vec<FileChange>, SyncError>> {
            self.seen.lock().unwrap().push((
                generator.to_string(),
                snapshot.description().to_string(),
                projects.len(),
            ));
            let path = snapshot.root().join("generated.ts");
            async move { Ok(vec![FileChange::create(path, "export {};")]) }.boxed()
        }
    }

    #[tokio::test]
    async fn run_delegates_with_named_snapshot() {
        let root = TempDir::new().expect("root");
        let engine = Arc::new(RecordingEngine::default());
        let runner = Runner::new(root.path(), engine.clone());

        let mut projects = ProjectsConfigurations::new();
        projects.insert("api".into(), Default::default());
        let changes = runner
            .run(&GeneratorId::from("gen-routes"), Arc::new(projects))
            .await
            .expect("run");

        assert_eq!(changes, vec![FileChange::create(root.path().join("generated.ts"), "export {};")]);
        let seen = engine.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(
                "gen-routes".to_string(),
                "running sync generator gen-routes".to_string(),
                1
            )]
        );
    }

    #[tokio::test]
    async fn run_is_lazy_until_polled() {
        let root = TempDir::new().expect("root");
        let engine = Arc::new(RecordingEngine::default());
        let runner = Runner::new(root.path(), engine.clone());

        let pending = runner.run(&GeneratorId::from("gen-routes"), Arc::default());
        assert!(engine.seen.lock().unwrap().is_empty());
        pending.await.expect("run");
        assert_eq!(engine.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_root_fails_before_engine_runs() {
        let root = TempDir::new().expect("root");
        let missing = root.path().join("gone");
        let engine = Arc::new(RecordingEngine::default());
        let runner = Runner::new(&missing, engine.clone());

        let err = runner
            .run(&GeneratorId::from("gen-routes"), Arc::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Snapshot { .. }), "got: {err}");
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closures_act_as_engines() {
        let root = TempDir::new().expect("root");
        let engine = |_snapshot: WorkspaceSnapshot,
                      generator: &GeneratorId,
                      _projects: Arc<ProjectsConfigurations>|
         -> BoxFuture<'static, Result<Vec<FileChange>, SyncError>> {
            let err = SyncError::generator(generator, "not implemented");
            async move { Err(err) }.boxed()
        };
        let runner = Runner::new(root.path(), Arc::new(engine));

        let err = runner
            .run(&GeneratorId::from("gen-todo"), Arc::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sync generator gen-todo failed: not implemented");
    }
}
