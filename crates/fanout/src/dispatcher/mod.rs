//! Job dispatcher with a lazily grown, bounded worker pool.
//!
//! This module defines [`Dispatcher`], which pulls jobs from an
//! [`IntakeQueue`] and hands each one to an idle worker through the
//! ready-pool rendezvous. Workers are spawned on demand, one at a time, up to
//! a fixed maximum, and are stopped with a shared [`CancellationToken`].
//!
//! ## Growth policy
//!
//! For every dequeued job, a new worker is spawned if fewer than
//! `max_workers` exist *and* the ready-pool is momentarily empty. The intake
//! loop then takes whichever ready token arrives first, which may belong to
//! the new worker or to one that just finished a job. The emptiness check
//! races with concurrent advertisements, so the pool can grow one worker
//! earlier or later than strictly necessary; it can never exceed
//! `max_workers`.
//!
//! ## Shutdown
//!
//! [`Dispatcher::stop`] runs in two phases under one deadline. It first
//! closes intake and lets the intake loop hand every job that was already
//! accepted to a worker. It then cancels the workers and waits for them to
//! exit. Workers only observe cancellation while idle, so a job that never
//! resolves keeps its worker alive past the deadline; the returned
//! [`ShutdownOutcome`] reports how many were left behind.

use crate::{
    Error, Job, Result,
    pool::{ReadyReceiver, ReadySender, ready_pool, worker::worker_loop},
    queue::IntakeQueue,
    shutdown::{ShutdownOutcome, wait_bounded},
};
use core::time::Duration;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::{sync::CancellationToken, task::TaskTracker};


/// How long [`Dispatcher::stop`] waits for workers by default.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Fans jobs out to a bounded, lazily grown set of worker tasks.
///
/// Construct with [`Dispatcher::new`], start the intake loop with
/// [`Dispatcher::run`] and tear it down with [`Dispatcher::stop`]. Dropping a
/// dispatcher without stopping it cancels idle workers without waiting.
pub struct Dispatcher<J: Job> {
    intake: Option<IntakeQueue<J>>,
    intake_handle: Option<JoinHandle<()>>,
    max_workers: usize,
    current_workers: Arc<AtomicUsize>,
    close_token: CancellationToken,
    shutdown_token: CancellationToken,
    tracker: TaskTracker,
    shutdown_timeout: Duration,
}

impl<J: Job> Dispatcher<J> {
    /// Creates a dispatcher over `intake` that will run at most
    /// `max_workers` jobs at a time.
    ///
    /// No worker is spawned until the first job arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaxWorkers`] if `max_workers` is zero.
    pub fn new(intake: IntakeQueue<J>, max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(Error::InvalidMaxWorkers(max_workers));
        }

        Ok(Self {
            intake: Some(intake),
            intake_handle: None,
            max_workers,
            current_workers: Arc::new(AtomicUsize::new(0)),
            close_token: CancellationToken::new(),
            shutdown_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// Overrides how long [`stop`](Self::stop) waits for workers to exit.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Upper bound on concurrently running workers.
    pub const fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers spawned so far. Never decreases during a run.
    pub fn current_workers(&self) -> usize {
        self.current_workers.load(Ordering::Acquire)
    }

    /// Starts the intake loop on the current Tokio runtime and returns
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the intake loop was already
    /// started.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn run(&mut self) -> Result<()> {
        let intake = self.intake.take().ok_or(Error::AlreadyRunning)?;
        let (ready_tx, ready_rx) = ready_pool(self.max_workers);

        let growth = Growth {
            max_workers: self.max_workers,
            current_workers: self.current_workers.clone(),
            tracker: self.tracker.clone(),
            shutdown_token: self.shutdown_token.clone(),
            ready_tx,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Starting dispatcher with up to {} workers",
            self.max_workers
        );

        self.intake_handle = Some(tokio::spawn(intake_loop(
            intake,
            ready_rx,
            growth,
            self.close_token.clone(),
            self.shutdown_token.clone(),
        )));
        Ok(())
    }

    /// Closes intake, drains it, then cancels all workers and waits for
    /// them to exit. Both phases share one `shutdown_timeout` deadline.
    ///
    /// Every job accepted by [`JobQueue::submit`](crate::JobQueue::submit)
    /// before this call is still handed to a worker and produces its result.
    /// Jobs are only dropped if the deadline passes while they are still
    /// waiting for a free worker. A worker blocked inside a job is not
    /// interrupted: it is counted in [`ShutdownOutcome::TimedOut`] and keeps
    /// running detached.
    pub async fn stop(mut self) -> ShutdownOutcome {
        let deadline = Instant::now() + self.shutdown_timeout;

        // Never started: dropping the queue closes it.
        drop(self.intake.take());

        if let Some(mut handle) = self.intake_handle.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Closing intake and draining accepted jobs");
            self.close_token.cancel();

            let drained = tokio::time::timeout_at(deadline, &mut handle).await;
            let joined = match drained {
                Ok(joined) => joined,
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Intake not drained within {:?}", self.shutdown_timeout);
                    // The intake loop observes cancellation at every
                    // suspension point, so this join is prompt.
                    self.shutdown_token.cancel();
                    handle.await
                }
            };
            if let Err(_e) = joined {
                #[cfg(feature = "tracing")]
                tracing::error!("Intake loop terminated abnormally: {_e}");
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling {} workers", self.current_workers());
        self.shutdown_token.cancel();

        let remaining = deadline.saturating_duration_since(Instant::now());
        let outcome = wait_bounded(&self.tracker, remaining).await;
        match outcome {
            ShutdownOutcome::Completed => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All workers stopped");
            }
            ShutdownOutcome::TimedOut { stragglers: _stragglers } => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Shutdown timed out after {:?} ({} workers still busy)",
                    self.shutdown_timeout,
                    _stragglers
                );
            }
        }
        outcome
    }
}

impl<J: Job> Drop for Dispatcher<J> {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

/// Everything the intake loop needs to spawn a worker.
struct Growth<J: Job> {
    max_workers: usize,
    current_workers: Arc<AtomicUsize>,
    tracker: TaskTracker,
    shutdown_token: CancellationToken,
    ready_tx: ReadySender<J>,
}

impl<J: Job> Growth<J> {
    /// Spawns a worker if below the limit and no worker is advertising.
    ///
    /// Only the intake loop writes `current_workers`, so the check and the
    /// increment cannot race each other.
    fn maybe_spawn(&self, ready_rx: &ReadyReceiver<J>) {
        let current = self.current_workers.load(Ordering::Acquire);
        if current >= self.max_workers || !ready_rx.is_empty() {
            return;
        }

        self.current_workers.store(current + 1, Ordering::Release);
        self.tracker.spawn(worker_loop(
            current,
            self.ready_tx.clone(),
            self.shutdown_token.clone(),
        ));

        #[cfg(feature = "tracing")]
        tracing::debug!("Spawned worker {} of {}", current + 1, self.max_workers);
    }
}

/// Pulls jobs from intake and hands each one to a ready worker.
///
/// Once `close_token` fires, intake stops accepting new jobs but every job
/// already buffered is still dispatched; the loop then exits on the drained
/// queue. `shutdown_token` aborts immediately, dropping whatever is left.
/// Workers are left running on exit; they stop on cancellation.
async fn intake_loop<J: Job>(
    mut intake: IntakeQueue<J>,
    mut ready_rx: ReadyReceiver<J>,
    growth: Growth<J>,
    close_token: CancellationToken,
    shutdown_token: CancellationToken,
) {
    let mut closing = false;

    'intake: loop {
        let mut job = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break 'intake,
            () = close_token.cancelled(), if !closing => {
                let _buffered = intake.close();
                #[cfg(feature = "tracing")]
                tracing::debug!("Intake closed, draining {_buffered} buffered jobs");
                closing = true;
                continue 'intake;
            }
            job = intake.recv() => match job {
                Some(job) => job,
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Intake queue drained and closed");
                    break 'intake;
                }
            },
        };

        growth.maybe_spawn(&ready_rx);

        loop {
            let token = tokio::select! {
                biased;
                () = shutdown_token.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Dropping job awaiting a worker at shutdown");
                    break 'intake;
                }
                token = ready_rx.recv() => token,
            };
            // `growth` keeps a sender alive, so the pool never closes here.
            let Some(token) = token else {
                break 'intake;
            };

            let _worker_id = token.worker_id();
            match token.deliver(job) {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Handed job to worker {_worker_id}");
                    break;
                }
                Err(returned) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {_worker_id} is gone, trying the next one");
                    job = returned;
                }
            }
        }
    }

    let _abandoned = intake.close();
    #[cfg(feature = "tracing")]
    {
        if _abandoned > 0 {
            tracing::warn!("Intake closed with {_abandoned} jobs never dispatched");
        }
    }
}
