//! Error types for the dispatcher core.
//!
//! Only configuration and lifecycle misuse surface as [`Error`]. Failures that
//! happen inside a job never reach this type: they travel inside the job's
//! own result through the result channel.
//!
//! ## Error Cases
//! - `InvalidMaxWorkers`: the pool was sized to zero workers.
//! - `InvalidQueueCapacity`: a bounded channel was requested with no slots.
//! - `AlreadyRunning`: [`crate::Dispatcher::run`] was called a second time.
//! - `IntakeClosed`: a job was submitted after the intake queue was closed.
//! - `ResultsClosed`: a result was published after the consumer went away.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the dispatcher core.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The dispatcher was configured with no workers.
    #[error("max workers must be greater than 0 (got {0})")]
    InvalidMaxWorkers(usize),

    /// A queue was configured with no capacity.
    #[error("queue capacity must be greater than 0 (got {0})")]
    InvalidQueueCapacity(usize),

    /// `run()` was called on a dispatcher whose intake loop already started.
    #[error("dispatcher is already running")]
    AlreadyRunning,

    /// The intake queue no longer accepts jobs.
    #[error("intake queue is closed")]
    IntakeClosed,

    /// Every consumer of the result channel has been dropped.
    #[error("result channel is closed")]
    ResultsClosed,
}
