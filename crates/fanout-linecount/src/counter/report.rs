use super::{job::MatchCount, telemetry::increment_job_errors};
use fanout::ResultStream;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Totals over every source of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Matching lines across all readable sources.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub const fn sources(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Writes one report line per result as it arrives, then the grand total.
///
/// Returns once every result sink is gone. Results appear in completion
/// order, not submission order.
pub async fn aggregate<W>(mut results: ResultStream<MatchCount>, out: &mut W) -> io::Result<Summary>
where
    W: AsyncWrite + Unpin,
{
    let mut summary = Summary::default();
    while let Some(MatchCount { source, outcome }) = results.recv().await {
        let line = match outcome {
            Ok(n) => {
                summary.total += n;
                summary.succeeded += 1;
                format!("Count for {source} : {n}\n")
            }
            Err(e) => {
                summary.failed += 1;
                increment_job_errors();
                format!("Error for {source} : {e}\n")
            }
        };
        out.write_all(line.as_bytes()).await?;
    }

    out.write_all(format!("Total : {}\n", summary.total).as_bytes())
        .await?;
    out.flush().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::source::SourceError;
    use fanout::result_channel;

    #[tokio::test]
    async fn reports_counts_errors_and_total() {
        let (sink, results) = result_channel(8).unwrap();
        for (source, outcome) in [
            ("a.txt", Ok(3)),
            ("b.txt", Err(SourceError::Io(io::Error::other("denied")))),
            ("c.txt", Ok(4)),
        ] {
            sink.publish(MatchCount {
                source: source.into(),
                outcome,
            })
            .await
            .unwrap();
        }
        drop(sink);

        let mut out = Vec::new();
        let summary = aggregate(results, &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Count for a.txt : 3\nError for b.txt : denied\nCount for c.txt : 4\nTotal : 7\n"
        );
        assert_eq!(
            summary,
            Summary {
                total: 7,
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(summary.sources(), 3);
    }

    #[tokio::test]
    async fn empty_run_prints_zero_total() {
        let (sink, results) = result_channel::<MatchCount>(1).unwrap();
        drop(sink);

        let mut out = Vec::new();
        let summary = aggregate(results, &mut out).await.unwrap();
        assert_eq!(out, b"Total : 0\n");
        assert_eq!(summary, Summary::default());
    }
}
