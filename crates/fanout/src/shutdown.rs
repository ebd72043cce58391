//! Bounded wait for worker termination.

use core::time::Duration;
use tokio_util::task::TaskTracker;

/// Result of waiting for workers to terminate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every tracked worker exited before the deadline.
    Completed,
    /// The deadline elapsed first. `stragglers` workers were still running
    /// (typically stuck inside a job) and are left behind.
    TimedOut { stragglers: usize },
}

impl ShutdownOutcome {
    /// Whether the wait gave up before every worker exited.
    pub const fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Closes `tracker` and waits for its tasks to finish, giving up after
/// `timeout`.
///
/// Tasks still running when the timeout fires are not aborted.
pub async fn wait_bounded(tracker: &TaskTracker, timeout: Duration) -> ShutdownOutcome {
    tracker.close();
    match tokio::time::timeout(timeout, tracker.wait()).await {
        Ok(()) => ShutdownOutcome::Completed,
        Err(_) => ShutdownOutcome::TimedOut {
            stragglers: tracker.len(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completes_when_tasks_finish_in_time() {
        let tracker = TaskTracker::new();
        tracker.spawn(tokio::time::sleep(Duration::from_millis(10)));
        tracker.spawn(async {});

        let outcome = wait_bounded(&tracker, Duration::from_secs(1)).await;
        assert_eq!(outcome, ShutdownOutcome::Completed);
        assert!(!outcome.timed_out());
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_on_a_task_that_never_finishes() {
        let tracker = TaskTracker::new();
        tracker.spawn(std::future::pending::<()>());
        tracker.spawn(async {});

        let start = tokio::time::Instant::now();
        let outcome = wait_bounded(&tracker, Duration::from_millis(100)).await;

        assert_eq!(outcome, ShutdownOutcome::TimedOut { stragglers: 1 });
        assert!(outcome.timed_out());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn empty_tracker_completes_immediately() {
        let tracker = TaskTracker::new();
        let outcome = wait_bounded(&tracker, Duration::from_millis(1)).await;
        assert_eq!(outcome, ShutdownOutcome::Completed);
        assert!(tracker.is_closed());
    }
}
