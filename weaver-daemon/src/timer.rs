use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A one-shot debounce timer that can be armed at most once at a time.
///
/// Arming spawns a task that sleeps and then runs the callback. Every arm gets
/// a fresh generation number; the callback must call
/// [`DebounceTimer::take_if_current`] with it before doing any work, so a
/// timer that lost a race with [`DebounceTimer::cancel`] does nothing.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    generation: u64,
    armed: Option<Armed>,
}

#[derive(Debug)]
struct Armed {
    generation: u64,
    wait: Duration,
    handle: JoinHandle<()>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Wait of the currently armed timer, if any.
    #[cfg(test)]
    pub fn armed_wait(&self) -> Option<Duration> {
        self.armed.as_ref().map(|armed| armed.wait)
    }

    /// Arm the timer to run `on_fire(generation)` after `wait`.
    ///
    /// Returns `false` and leaves the pending timer alone if one is armed.
    pub fn arm<F, Fut>(&mut self, wait: Duration, on_fire: F) -> bool
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.armed.is_some() {
            return false;
        }
        self.generation += 1;
        let generation = self.generation;
        let fire = on_fire(generation);
        let deadline = tokio::time::Instant::now() + wait;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire.await;
        });
        self.armed = Some(Armed {
            generation,
            wait,
            handle,
        });
        true
    }

    /// Disarm the timer if `generation` is the one currently armed.
    ///
    /// Called by the firing task itself, so the handle is not aborted.
    pub fn take_if_current(&mut self, generation: u64) -> bool {
        match &self.armed {
            Some(armed) if armed.generation == generation => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending timer. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::time::advance;

    fn counting(fired: &Arc<AtomicUsize>) -> impl FnOnce(u64) -> std::future::Ready<()> {
        let fired = fired.clone();
        move |_generation| {
            fired.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn second_arm_while_pending_is_ignored() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();

        assert!(timer.arm(Duration::from_millis(100), counting(&fired)));
        assert!(!timer.arm(Duration::from_millis(5), counting(&fired)));
        assert_eq!(timer.armed_wait(), Some(Duration::from_millis(100)));
        assert_eq!(fired.load(Ordering::SeqCst), 1, "callback built once per arm");
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn callback_runs_after_wait() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();
        let counter = ran.clone();
        timer.arm(Duration::from_millis(100), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        advance(Duration::from_millis(99)).await;
        settle().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn cancel_prevents_firing() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new();
        let counter = ran.clone();
        timer.arm(Duration::from_millis(100), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(timer.cancel());
        assert!(!timer.is_armed());
        assert!(!timer.cancel());

        advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn stale_generation_is_not_taken() {
        let mut timer = DebounceTimer::new();
        timer.arm(Duration::from_millis(100), |_| async {});
        timer.cancel();
        timer.arm(Duration::from_millis(100), |_| async {});

        assert!(!timer.take_if_current(1));
        assert!(timer.is_armed());
        assert!(timer.take_if_current(2));
        assert!(!timer.is_armed());
    }
}
