//! Bounded intake and result channels.
//!
//! Both directions are fixed-capacity `tokio::sync::mpsc` channels. A full
//! intake queue suspends producers, which is the only back-pressure the
//! dispatcher offers.

use crate::{Error, Result};
use tokio::sync::mpsc;

/// Reference capacity of the intake and result channels.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Producer half of the intake queue.
///
/// Cloneable; the queue closes once every `JobQueue` is dropped or the
/// owning [`Dispatcher`](crate::Dispatcher) is stopped.
#[derive(Debug)]
pub struct JobQueue<J> {
    tx: mpsc::Sender<J>,
}

impl<J> Clone for JobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<J> JobQueue<J> {
    /// Enqueues a job, waiting for a free slot if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntakeClosed`] if the dispatcher has stopped. The job
    /// is dropped; submitting after shutdown is a caller bug, not something
    /// to retry.
    pub async fn submit(&self, job: J) -> Result<()> {
        self.tx.send(job).await.map_err(|_| Error::IntakeClosed)
    }

    /// Whether the consuming side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the intake queue, handed to a
/// [`Dispatcher`](crate::Dispatcher).
#[derive(Debug)]
pub struct IntakeQueue<J> {
    rx: mpsc::Receiver<J>,
}

impl<J> IntakeQueue<J> {
    pub(crate) async fn recv(&mut self) -> Option<J> {
        self.rx.recv().await
    }

    /// Stops accepting jobs and returns how many were still buffered.
    pub(crate) fn close(&mut self) -> usize {
        self.rx.close();
        self.rx.len()
    }
}

/// Creates a bounded intake queue.
///
/// # Errors
///
/// Returns [`Error::InvalidQueueCapacity`] if `capacity` is zero.
pub fn intake_queue<J>(capacity: usize) -> Result<(JobQueue<J>, IntakeQueue<J>)> {
    if capacity == 0 {
        return Err(Error::InvalidQueueCapacity(capacity));
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((JobQueue { tx }, IntakeQueue { rx }))
}

/// Sending half of the result channel. Jobs carry a clone of it.
#[derive(Debug)]
pub struct ResultSink<R> {
    tx: mpsc::Sender<R>,
}

impl<R> Clone for ResultSink<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R> ResultSink<R> {
    /// Publishes a job result, waiting if the consumer is behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultsClosed`] if the [`ResultStream`] was dropped.
    pub async fn publish(&self, result: R) -> Result<()> {
        self.tx.send(result).await.map_err(|_| Error::ResultsClosed)
    }
}

/// Receiving half of the result channel.
///
/// Yields `None` once every [`ResultSink`] clone (including the ones held by
/// pending jobs) has been dropped.
#[derive(Debug)]
pub struct ResultStream<R> {
    rx: mpsc::Receiver<R>,
}

impl<R> ResultStream<R> {
    /// Receives the next result.
    pub async fn recv(&mut self) -> Option<R> {
        self.rx.recv().await
    }
}

/// Creates a bounded result channel.
///
/// # Errors
///
/// Returns [`Error::InvalidQueueCapacity`] if `capacity` is zero.
pub fn result_channel<R>(capacity: usize) -> Result<(ResultSink<R>, ResultStream<R>)> {
    if capacity == 0 {
        return Err(Error::InvalidQueueCapacity(capacity));
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((ResultSink { tx }, ResultStream { rx }))
}

/// Endpoints of one intake queue and one result channel.
pub type Channels<J, R> = (JobQueue<J>, IntakeQueue<J>, ResultSink<R>, ResultStream<R>);

/// Creates an intake queue and a result channel of the same `capacity`.
///
/// # Errors
///
/// Returns [`Error::InvalidQueueCapacity`] if `capacity` is zero.
pub fn channel<J, R>(capacity: usize) -> Result<Channels<J, R>> {
    let (jobs, intake) = intake_queue(capacity)?;
    let (sink, results) = result_channel(capacity)?;
    Ok((jobs, intake, sink, results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            intake_queue::<u8>(0).err(),
            Some(Error::InvalidQueueCapacity(0))
        );
        assert_eq!(
            result_channel::<u8>(0).err(),
            Some(Error::InvalidQueueCapacity(0))
        );
        assert!(matches!(
            channel::<u8, u8>(0),
            Err(Error::InvalidQueueCapacity(0))
        ));
    }

    #[tokio::test]
    async fn channel_pair_shares_capacity() {
        let (jobs, mut intake, sink, mut results) = channel::<u8, u8>(2).unwrap();
        jobs.submit(1).await.unwrap();
        jobs.submit(2).await.unwrap();
        assert_eq!(intake.close(), 2);

        sink.publish(3).await.unwrap();
        sink.publish(4).await.unwrap();
        drop(sink);
        assert_eq!(results.recv().await, Some(3));
        assert_eq!(results.recv().await, Some(4));
        assert_eq!(results.recv().await, None);
    }

    #[tokio::test]
    async fn submit_after_close_is_an_error() {
        let (jobs, mut intake) = intake_queue::<u8>(4).unwrap();
        jobs.submit(1).await.unwrap();
        assert_eq!(intake.close(), 1);
        assert!(jobs.is_closed());
        assert_eq!(jobs.submit(2).await, Err(Error::IntakeClosed));
    }

    #[tokio::test]
    async fn result_stream_ends_when_all_sinks_drop() {
        let (sink, mut stream) = result_channel::<u8>(4).unwrap();
        let other = sink.clone();
        sink.publish(1).await.unwrap();
        other.publish(2).await.unwrap();
        drop(sink);
        drop(other);

        assert_eq!(stream.recv().await, Some(1));
        assert_eq!(stream.recv().await, Some(2));
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn publish_without_consumer_is_an_error() {
        let (sink, stream) = result_channel::<u8>(1).unwrap();
        drop(stream);
        assert_eq!(sink.publish(1).await, Err(Error::ResultsClosed));
    }
}
