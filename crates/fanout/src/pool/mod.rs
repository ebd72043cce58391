//! Ready-pool rendezvous between idle workers and the intake loop.
//!
//! An idle worker advertises itself by pushing a [`ReadyToken`] into a bounded
//! channel whose capacity equals the maximum number of workers. The intake
//! loop pulls one token per job and delivers the job through it. A token is
//! consumed by delivery, so it can hand off at most one job.
//!
//! Each worker owns a single-slot delivery channel for its whole lifetime and
//! mints a fresh token (a clone of the slot's sender) every time it returns to
//! the pool. Because a worker only advertises while its slot is empty, it
//! never occupies more than one place in the pool.

pub(crate) mod worker;

use tokio::sync::mpsc;

/// Producer side of the ready-pool, held by workers.
pub(crate) type ReadySender<J> = mpsc::Sender<ReadyToken<J>>;

/// Consumer side of the ready-pool, held by the intake loop.
pub(crate) type ReadyReceiver<J> = mpsc::Receiver<ReadyToken<J>>;

/// Creates a ready-pool sized for `max_workers` advertisements.
pub(crate) fn ready_pool<J>(max_workers: usize) -> (ReadySender<J>, ReadyReceiver<J>) {
    mpsc::channel(max_workers)
}

/// One-shot handle for delivering a job to an idle worker.
#[derive(Debug)]
pub(crate) struct ReadyToken<J> {
    worker_id: usize,
    slot: mpsc::Sender<J>,
}

impl<J> ReadyToken<J> {
    pub(crate) const fn new(worker_id: usize, slot: mpsc::Sender<J>) -> Self {
        Self { worker_id, slot }
    }

    pub(crate) const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Hands `job` to the advertising worker.
    ///
    /// The slot is always empty while its token sits in the pool, so this
    /// only fails when the worker has already stopped. The job is then given
    /// back so the caller can try another token.
    pub(crate) fn deliver(self, job: J) -> Result<(), J> {
        self.slot.try_send(job).map_err(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_fills_the_slot() {
        let (slot_tx, mut slot_rx) = mpsc::channel(1);
        let token = ReadyToken::new(3, slot_tx);
        assert_eq!(token.worker_id(), 3);
        assert!(token.deliver("job").is_ok());
        assert_eq!(slot_rx.try_recv().ok(), Some("job"));
    }

    #[test]
    fn delivery_to_a_stopped_worker_returns_the_job() {
        let (slot_tx, slot_rx) = mpsc::channel(1);
        drop(slot_rx);
        let token = ReadyToken::new(0, slot_tx);
        assert_eq!(token.deliver("job"), Err("job"));
    }

    #[tokio::test]
    async fn pool_holds_one_token_per_worker() {
        let (ready_tx, mut ready_rx) = ready_pool::<u8>(2);
        for worker_id in 0..2 {
            let (slot_tx, _slot_rx) = mpsc::channel(1);
            ready_tx
                .try_send(ReadyToken::new(worker_id, slot_tx))
                .unwrap();
        }
        let (slot_tx, _slot_rx) = mpsc::channel(1);
        assert!(ready_tx.try_send(ReadyToken::new(2, slot_tx)).is_err());

        let first = ready_rx.recv().await.unwrap();
        assert_eq!(first.worker_id(), 0);
    }
}
