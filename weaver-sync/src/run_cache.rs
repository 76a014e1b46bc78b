//! Run cache: one memoized run per generator.
//!
//! Every entry is a [`RunFuture`]: a cloneable handle on a run spawned onto
//! the tokio runtime. Callers asking for the same generator share the entry,
//! so a generator executes once no matter how many callers race for it.
//!
//! Runs are spawned eagerly. Dropping an entry (or never awaiting it) only
//! forgets the result; the run itself always finishes.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

use weaver_core::{FileChange, GeneratorId};

use crate::error::SyncError;

/// Resolved value of a run. Both arms are shared between every waiter.
pub type RunOutput = Result<Arc<Vec<FileChange>>, Arc<SyncError>>;

/// Handle on a pending or finished generator run.
pub type RunFuture = Shared<BoxFuture<'static, RunOutput>>;

/// A not-yet-started generator run, as produced by the runner.
pub type PendingRun = BoxFuture<'static, Result<Vec<FileChange>, SyncError>>;

#[derive(Default)]
pub struct RunCache {
    entries: HashMap<GeneratorId, RunFuture>,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `id`, starting `run()` only if there is none.
    ///
    /// The new entry is stored before the run resolves, so a caller arriving
    /// while it is in flight gets the same handle.
    pub fn get_or_run<F>(&mut self, id: &GeneratorId, run: F) -> RunFuture
    where
        F: FnOnce() -> PendingRun,
    {
        if let Some(existing) = self.entries.get(id) {
            tracing::debug!("reusing cached run for sync generator {id}");
            return existing.clone();
        }
        let future = spawn_run(id, run());
        self.entries.insert(id.clone(), future.clone());
        future
    }

    /// Replace the entry for `id` with a fresh run of `run()`.
    ///
    /// If the previous run of `id` is still in flight the new one waits for it
    /// to finish first, so two runs of one generator never overlap.
    pub fn rerun<F>(&mut self, id: &GeneratorId, run: F) -> RunFuture
    where
        F: FnOnce() -> PendingRun,
    {
        let run = run();
        let run = match self.entries.remove(id) {
            Some(previous) if previous.peek().is_none() => {
                tracing::debug!("sync generator {id} still running; queueing rerun behind it");
                async move {
                    let _ = previous.await;
                    run.await
                }
                .boxed()
            }
            _ => run,
        };
        let future = spawn_run(id, run);
        self.entries.insert(id.clone(), future.clone());
        future
    }

    pub fn get(&self, id: &GeneratorId) -> Option<RunFuture> {
        self.entries.get(id).cloned()
    }

    /// Forget the entry for `id`, pending or not.
    pub fn remove(&mut self, id: &GeneratorId) -> Option<RunFuture> {
        self.entries.remove(id)
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached generator ids, sorted.
    pub fn ids(&self) -> Vec<GeneratorId> {
        let mut ids: Vec<GeneratorId> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn spawn_run(id: &GeneratorId, run: PendingRun) -> RunFuture {
    let handle = tokio::spawn(run);
    let id = id.clone();
    async move {
        match handle.await {
            Ok(Ok(changes)) => Ok(Arc::new(changes)),
            Ok(Err(err)) => Err(Arc::new(err)),
            Err(join) => Err(Arc::new(SyncError::Join(format!("{id}: {join}")))),
        }
    }
    .boxed()
    .shared()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    fn counting_run(counter: &Arc<AtomicUsize>, path: &str) -> PendingRun {
        let counter = counter.clone();
        let path = path.to_string();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![FileChange::update(path, "generated")])
        }
        .boxed()
    }

    #[tokio::test]
    async fn get_or_run_shares_one_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut cache = RunCache::new();
        let id = GeneratorId::from("gen-routes");

        let first = cache.get_or_run(&id, || counting_run(&runs, "routes.ts"));
        let second = cache.get_or_run(&id, || counting_run(&runs, "other.ts"));

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.expect("first"), b.expect("second"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn entry_is_visible_before_run_resolves() {
        let (release, gate) = oneshot::channel::<()>();
        let mut cache = RunCache::new();
        let id = GeneratorId::from("gen-slow");

        let pending = cache.get_or_run(&id, || {
            async move {
                let _ = gate.await;
                Ok(vec![])
            }
            .boxed()
        });
        assert!(cache.get(&id).expect("entry").peek().is_none());

        release.send(()).expect("release");
        pending.await.expect("run");
        assert!(cache.get(&id).expect("entry").peek().is_some());
    }

    #[tokio::test]
    async fn rerun_waits_for_in_flight_run() {
        let (release, gate) = oneshot::channel::<()>();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut cache = RunCache::new();
        let id = GeneratorId::from("gen-routes");

        let log = order.clone();
        let first = cache.get_or_run(&id, || {
            async move {
                let _ = gate.await;
                log.lock().unwrap().push("first");
                Ok(vec![FileChange::update("a", "1")])
            }
            .boxed()
        });

        let log = order.clone();
        let second = cache.rerun(&id, || {
            async move {
                log.lock().unwrap().push("second");
                Ok(vec![FileChange::update("a", "2")])
            }
            .boxed()
        });

        tokio::task::yield_now().await;
        assert!(order.lock().unwrap().is_empty(), "rerun must not overlap the first run");

        release.send(()).expect("release");
        let changes = second.await.expect("second");
        assert_eq!(changes[0].content.as_deref(), Some(&b"2"[..]));
        first.await.expect("first");
        assert_eq!(*order.lock().unwrap(), ["first", "second"]);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn rerun_after_resolution_starts_immediately() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut cache = RunCache::new();
        let id = GeneratorId::from("gen-routes");

        cache.get_or_run(&id, || counting_run(&runs, "a")).await.expect("first");
        cache.rerun(&id, || counting_run(&runs, "a")).await.expect("second");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_shared_and_removal_keeps_run_alive() {
        let mut cache = RunCache::new();
        let id = GeneratorId::from("gen-broken");
        let failing = cache.get_or_run(&id, || {
            let id = GeneratorId::from("gen-broken");
            async move { Err(SyncError::generator(&id, "boom")) }.boxed()
        });

        assert!(cache.remove(&id).is_some());
        assert!(cache.is_empty());
        let err = failing.await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn panicking_run_resolves_to_join_error() {
        let mut cache = RunCache::new();
        let id = GeneratorId::from("gen-panics");
        let future = cache.get_or_run(&id, || {
            async {
                let broken = true;
                if broken {
                    panic!("generator bug");
                }
                Ok(vec![])
            }
            .boxed()
        });
        let err = future.await.unwrap_err();
        assert!(matches!(*err, SyncError::Join(_)), "got: {err}");
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut cache = RunCache::new();
        for name in ["b", "a"] {
            cache.get_or_run(&GeneratorId::from(name), || counting_run(&runs, name));
        }
        assert_eq!(cache.ids(), vec![GeneratorId::from("a"), GeneratorId::from("b")]);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&GeneratorId::from("a")).is_none());
    }
}
