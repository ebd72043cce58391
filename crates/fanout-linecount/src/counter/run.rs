//! Wires the source list, the dispatcher and the report together.
//!
//! The producer (reading sources and submitting jobs) and the aggregator
//! (draining results) run concurrently on the calling task. Both channels
//! are bounded, so running them one after the other could stall once
//! either fills up.

use super::{
    config::Config,
    job::{JobFactory, MatchCountJob},
    report::{Summary, aggregate},
    source::Fetcher,
    telemetry::increment_jobs_submitted,
};
use anyhow::Context;
use fanout::{Dispatcher, JobQueue, ShutdownOutcome};
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tokio_stream::wrappers::LinesStream;

/// Counts matches for every source listed in `input` and writes the report
/// to `output`.
///
/// A failure to read `input` stops enumeration; the sources already
/// submitted are still processed and reported before the error is
/// returned.
pub async fn run<I, W>(config: &Config, input: I, output: &mut W) -> anyhow::Result<Summary>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let fetcher = Fetcher::new(config.source_kind, config.fetch_timeout)
        .context("failed to build HTTP client")?;
    let (jobs, intake, sink, results) = fanout::channel(config.queue_capacity)?;

    let mut dispatcher = Dispatcher::new(intake, config.max_workers)?
        .with_shutdown_timeout(config.shutdown_timeout);
    dispatcher.run()?;

    let factory = JobFactory::new(fetcher, &config.pattern, config.fetch_timeout, sink);

    // `submit_sources` owns the last producer handles, so the result stream
    // ends once it returns and every submitted job has reported.
    let (submitted, summary) =
        tokio::join!(submit_sources(input, jobs, factory), aggregate(results, output));

    if let ShutdownOutcome::TimedOut { stragglers } = dispatcher.stop().await {
        tracing::warn!("{stragglers} workers did not stop in time");
    }

    let summary = summary.context("failed to write report")?;
    let submitted = submitted?;
    tracing::debug!("Processed {submitted} sources ({} failed)", summary.failed);
    Ok(summary)
}

/// Submits one job per non-blank line of `input`.
async fn submit_sources<I>(
    input: I,
    jobs: JobQueue<MatchCountJob>,
    factory: JobFactory,
) -> anyhow::Result<usize>
where
    I: AsyncBufRead + Unpin,
{
    let mut lines = LinesStream::new(input.lines());
    let mut submitted = 0;

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read source list")?;
        let source = line.trim();
        if source.is_empty() {
            continue;
        }

        jobs.submit(factory.job(source.to_owned())).await?;
        increment_jobs_submitted();
        submitted += 1;
    }

    tracing::debug!("Submitted {submitted} sources");
    Ok(submitted)
}
