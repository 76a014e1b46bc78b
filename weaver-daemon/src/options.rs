use std::path::PathBuf;
use std::time::Duration;

/// First debounce wait after a quiet scheduler, and the value a fetch resets to.
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_millis(100);
/// Ceiling for the doubling debounce wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(4000);

/// Construction-time settings for [`crate::SyncGeneratorScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub workspace_root: PathBuf,
    pub initial_wait: Duration,
    pub max_wait: Duration,
}

impl SchedulerOptions {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            initial_wait: DEFAULT_INITIAL_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait = wait;
        self
    }

    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    #[test]
    fn defaults_match_daemon_timings() {
        let options = SchedulerOptions::new("/repo");
        assert_eq!(options.initial_wait, Duration::from_millis(100));
        assert_eq!(options.max_wait, Duration::from_millis(4000));
        assert_eq!(options.workspace_root, Path::new("/repo"));
    }

    #[test]
    fn builder_overrides_waits() {
        let options = SchedulerOptions::new("/repo")
            .with_initial_wait(Duration::from_millis(5))
            .with_max_wait(Duration::from_millis(40));
        assert_eq!(options.initial_wait, Duration::from_millis(5));
        assert_eq!(options.max_wait, Duration::from_millis(40));
    }
}
