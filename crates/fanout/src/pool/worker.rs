use super::{ReadySender, ReadyToken};
use crate::Job;
use core::panic::AssertUnwindSafe;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where a worker is in its lifecycle.
///
/// `Advertising -> Waiting -> Executing -> Advertising`, with `Stopped`
/// reachable only from `Waiting`.
#[derive(Debug)]
enum WorkerState<J> {
    /// Publishing a ready token into the pool.
    Advertising,
    /// Racing job delivery against cancellation.
    Waiting,
    /// Running a job to completion. Cancellation is not observed here.
    Executing(J),
    Stopped,
}

/// Worker task that executes jobs handed to it through the ready-pool.
///
/// The worker owns a single-slot delivery channel for its whole lifetime. On
/// every pass through `Advertising` it pushes a [`ReadyToken`] wrapping that
/// slot into the shared pool, then waits for either a job or cancellation of
/// `shutdown_token`. A delivered job always wins over a concurrent
/// cancellation, so a job that was handed off is never dropped.
///
/// Job failures are reported by the job itself. A job that panics is
/// contained here and produces no result. Either way the worker re-advertises
/// after every execution and only stops on cancellation.
///
/// This function is designed to be spawned on the dispatcher's
/// `TaskTracker`; returning releases the worker's slot in the tracker.
///
/// # Arguments
///
/// - `worker_id`: Spawn-order index, used for logs/tracing.
/// - `ready_tx`: Shared ready-pool the worker advertises into.
/// - `shutdown_token`: Cancellation signal shared by every worker.
pub(crate) async fn worker_loop<J: Job>(
    worker_id: usize,
    ready_tx: ReadySender<J>,
    shutdown_token: CancellationToken,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    let (slot_tx, mut slot_rx) = mpsc::channel::<J>(1);
    let mut state = WorkerState::Advertising;

    loop {
        state = match state {
            WorkerState::Advertising => {
                let token = ReadyToken::new(worker_id, slot_tx.clone());
                if ready_tx.send(token).await.is_err() {
                    // Intake is gone, so no job can reach us any more.
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {worker_id} found the ready-pool closed");
                }
                WorkerState::Waiting
            }
            WorkerState::Waiting => {
                tokio::select! {
                    biased;
                    Some(job) = slot_rx.recv() => WorkerState::Executing(job),
                    () = shutdown_token.cancelled() => WorkerState::Stopped,
                }
            }
            WorkerState::Executing(job) => {
                if AssertUnwindSafe(job.execute()).catch_unwind().await.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Job panicked on worker {worker_id}");
                }
                WorkerState::Advertising
            }
            WorkerState::Stopped => break,
        };
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Worker {worker_id} stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ready_pool;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct Signal(oneshot::Sender<usize>, usize);

    impl Job for Signal {
        async fn execute(self) {
            let _ = self.0.send(self.1);
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl Job for Count {
        async fn execute(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn idle_worker_stops_on_cancellation() {
        let (ready_tx, mut ready_rx) = ready_pool::<Signal>(1);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker_loop(0, ready_tx, shutdown.clone()));

        // The worker advertises before waiting.
        let token = ready_rx.recv().await.unwrap();
        assert_eq!(token.worker_id(), 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn delivered_job_runs_even_if_cancelled_right_after() {
        let (ready_tx, mut ready_rx) = ready_pool::<Signal>(1);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker_loop(0, ready_tx, shutdown.clone()));

        let (done_tx, done_rx) = oneshot::channel();
        let token = ready_rx.recv().await.unwrap();
        assert!(token.deliver(Signal(done_tx, 42)).is_ok());
        shutdown.cancel();

        assert_eq!(done_rx.await.unwrap(), 42);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_readvertises_after_each_job() {
        let (ready_tx, mut ready_rx) = ready_pool::<Count>(1);
        let shutdown = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(worker_loop(7, ready_tx, shutdown.clone()));

        for _ in 0..5 {
            let token = ready_rx.recv().await.unwrap();
            assert_eq!(token.worker_id(), 7);
            assert!(token.deliver(Count(counter.clone())).is_ok());
        }

        // The sixth advertisement only happens once the fifth job finished.
        let _ = ready_rx.recv().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 5);

        shutdown.cancel();
        handle.await.unwrap();
    }

    enum Step {
        Panic,
        Signal(oneshot::Sender<usize>, usize),
    }

    impl Job for Step {
        async fn execute(self) {
            match self {
                Self::Panic => panic!("step failed"),
                Self::Signal(done, n) => {
                    let _ = done.send(n);
                }
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_survives_a_panicking_job() {
        let (ready_tx, mut ready_rx) = ready_pool::<Step>(1);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker_loop(0, ready_tx, shutdown.clone()));

        let token = ready_rx.recv().await.unwrap();
        assert!(token.deliver(Step::Panic).is_ok());

        // Same worker comes back and still runs jobs.
        let token = tokio::time::timeout(Duration::from_secs(1), ready_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.worker_id(), 0);
        let (done_tx, done_rx) = oneshot::channel();
        assert!(token.deliver(Step::Signal(done_tx, 9)).is_ok());
        assert_eq!(done_rx.await.unwrap(), 9);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_waits_for_cancellation_when_pool_is_closed() {
        let (ready_tx, ready_rx) = ready_pool::<Count>(1);
        drop(ready_rx);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker_loop(0, ready_tx, shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
