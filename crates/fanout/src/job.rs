//! Capability contracts for units of work and their results.
//!
//! A [`Job`] is a one-shot unit of work. It is consumed when executed and has
//! no return value: whatever it produces is published through the
//! [`ResultSink`](crate::ResultSink) it was built with. Every execution path,
//! including failures, must publish exactly one result before `execute`
//! resolves.
//!
//! A [`JobResult`] exposes either a payload or an error, never both. Any
//! `Result<T, E>` already satisfies this contract.

/// A self-contained unit of work executed by a pool worker.
///
/// Workers run a job to completion once it has been handed off; cancellation
/// is never observed mid-execution. Implementations that touch external
/// resources are responsible for bounding their own I/O with timeouts, since
/// a job that never resolves pins its worker past shutdown.
pub trait Job: Send + 'static {
    /// Runs the job, publishing exactly one result to its sink.
    fn execute(self) -> impl Future<Output = ()> + Send;
}

/// The outcome of a single [`Job`].
///
/// Exactly one of [`payload`](Self::payload) and [`error`](Self::error)
/// returns `Some`.
pub trait JobResult: Send + 'static {
    /// Value produced by a successful job.
    type Payload;
    /// Failure reported by an unsuccessful job.
    type Error: core::error::Error;

    /// Returns the payload, or `None` if the job failed.
    fn payload(&self) -> Option<&Self::Payload>;

    /// Returns the error, or `None` if the job succeeded.
    fn error(&self) -> Option<&Self::Error>;

    /// Whether the job succeeded.
    fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

impl<T, E> JobResult for Result<T, E>
where
    T: Send + 'static,
    E: core::error::Error + Send + 'static,
{
    type Payload = T;
    type Error = E;

    fn payload(&self) -> Option<&T> {
        self.as_ref().ok()
    }

    fn error(&self) -> Option<&E> {
        self.as_ref().err()
    }
}
