use super::{
    source::{Fetcher, SourceError},
    telemetry::{increment_lines_matched, record_job_duration},
};
use core::time::Duration;
use fanout::{Job, JobResult, ResultSink};
use std::{io, sync::Arc, time::Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Result of scanning one source.
#[derive(Debug)]
pub struct MatchCount {
    pub source: String,
    pub outcome: Result<usize, SourceError>,
}

impl JobResult for MatchCount {
    type Payload = usize;
    type Error = SourceError;

    fn payload(&self) -> Option<&usize> {
        self.outcome.as_ref().ok()
    }

    fn error(&self) -> Option<&SourceError> {
        self.outcome.as_ref().err()
    }
}

/// Stamps out one [`MatchCountJob`] per source with shared settings.
#[derive(Clone)]
pub struct JobFactory {
    fetcher: Fetcher,
    pattern: Arc<str>,
    timeout: Duration,
    sink: ResultSink<MatchCount>,
}

impl JobFactory {
    pub fn new(
        fetcher: Fetcher,
        pattern: &str,
        timeout: Duration,
        sink: ResultSink<MatchCount>,
    ) -> Self {
        Self {
            fetcher,
            pattern: pattern.into(),
            timeout,
            sink,
        }
    }

    pub fn job(&self, source: String) -> MatchCountJob {
        MatchCountJob {
            source,
            fetcher: self.fetcher.clone(),
            pattern: self.pattern.clone(),
            timeout: self.timeout,
            sink: self.sink.clone(),
        }
    }
}

/// Counts the lines of one source that contain a pattern and publishes
/// exactly one [`MatchCount`].
pub struct MatchCountJob {
    source: String,
    fetcher: Fetcher,
    pattern: Arc<str>,
    timeout: Duration,
    sink: ResultSink<MatchCount>,
}

impl MatchCountJob {
    async fn count(&self) -> Result<usize, SourceError> {
        let reader = self.fetcher.open(&self.source).await?;
        Ok(count_matches(reader, self.pattern.as_bytes()).await?)
    }
}

impl Job for MatchCountJob {
    #[tracing::instrument(name = "match_count", skip_all, fields(source = %self.source))]
    async fn execute(self) {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.count()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        };
        record_job_duration(started.elapsed().as_secs_f64() * 1000.0);

        match &outcome {
            Ok(n) => {
                increment_lines_matched(*n as u64);
                tracing::debug!("Counted {n} matching lines");
            }
            Err(e) => tracing::debug!("Failed to read source: {e}"),
        }

        let result = MatchCount {
            source: self.source,
            outcome,
        };
        if self.sink.publish(result).await.is_err() {
            tracing::warn!("Result dropped: nobody is collecting results");
        }
    }
}

/// Counts lines of `reader` containing `pattern`.
///
/// Lines are split on `\n` and compared as raw bytes, so non-UTF-8 input is
/// fine. A final line without a trailing newline is still counted.
pub async fn count_matches<R>(mut reader: R, pattern: &[u8]) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut count = 0;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(count);
        }
        if contains(&line, pattern) {
            count += 1;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
