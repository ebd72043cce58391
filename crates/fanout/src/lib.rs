//! # `fanout`: bounded, lazily grown worker pool
//!
//! `fanout` dispatches a stream of independent [`Job`]s to a set of Tokio
//! worker tasks that grows on demand up to a fixed maximum, and shuts down
//! within a bounded time budget.
//!
//! ## Highlights
//!
//! - **Pull-based rendezvous**: idle workers advertise a one-shot
//!   delivery token in a bounded ready-pool; the dispatcher hands each job to
//!   whichever token it receives first.
//! - **Lazy growth**: a worker is spawned only when a job arrives, the pool
//!   is below `max_workers`, and nobody is advertising.
//! - **Cooperative cancellation**: workers observe a shared
//!   `CancellationToken` only while idle. A job that was handed off always
//!   runs to completion.
//! - **Bounded shutdown**: [`Dispatcher::stop`] drains jobs already accepted,
//!   then waits at most a fixed timeout for workers to exit and reports
//!   stragglers instead of hanging.
//! - **Back-pressure**: intake and result channels are bounded.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fanout::{Dispatcher, Job, ResultSink, intake_queue, result_channel};
//!
//! struct Square {
//!     n: u64,
//!     sink: ResultSink<Result<u64, std::io::Error>>,
//! }
//!
//! impl Job for Square {
//!     async fn execute(self) {
//!         let _ = self.sink.publish(Ok(self.n * self.n)).await;
//!     }
//! }
//!
//! # async fn demo() -> fanout::Result<()> {
//! let (jobs, intake) = intake_queue(1000)?;
//! let (sink, mut results) = result_channel(1000)?;
//!
//! let mut dispatcher = Dispatcher::new(intake, 4)?;
//! dispatcher.run()?;
//!
//! for n in 0..10 {
//!     jobs.submit(Square { n, sink: sink.clone() }).await?;
//! }
//! drop(sink);
//! drop(jobs);
//!
//! while let Some(result) = results.recv().await {
//!     println!("{result:?}");
//! }
//! dispatcher.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit lifecycle events (worker spawn/stop, handoff, shutdown)
//!   through the [`tracing`](https://docs.rs/tracing) crate.

mod dispatcher;
mod error;
mod job;
mod pool;
mod queue;
mod shutdown;

pub use crate::dispatcher::*;
pub use crate::error::*;
pub use crate::job::*;
pub use crate::queue::*;
pub use crate::shutdown::*;
