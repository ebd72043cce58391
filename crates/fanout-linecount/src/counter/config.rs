use super::source::SourceKind;
use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `linecount` binary.
///
/// Sources are read from stdin, one per line. Every value can also be set
/// through the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "linecount",
    version,
    about = "Counts lines containing a pattern across many files or URLs"
)]
pub struct CliArgs {
    /// How each source line on stdin is interpreted: `file` or `url`.
    ///
    /// Environment variable: `SOURCE_TYPE`
    #[arg(long = "type", env = "SOURCE_TYPE")]
    pub source_type: String,

    /// Upper bound on sources processed concurrently.
    ///
    /// Workers are started lazily, so a short input never spins up the full
    /// pool.
    ///
    /// Environment variable: `MAX_WORKERS`
    #[arg(long, alias = "maxWorkers", env = "MAX_WORKERS", default_value_t = 5)]
    pub max_workers: usize,

    /// Substring a line must contain to be counted. Matching is byte-wise and
    /// case-sensitive.
    ///
    /// Environment variable: `PATTERN`
    #[arg(long, env = "PATTERN", default_value_t = String::from("Go"))]
    pub pattern: String,

    /// Capacity of both the job intake queue and the result channel.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = fanout::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Seconds to wait for workers to exit once all results are in.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Seconds allowed for reading a single source, including the HTTP
    /// request for URLs.
    ///
    /// Environment variable: `FETCH_TIMEOUT_SECS`
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_kind: SourceKind,
    pub max_workers: usize,
    pub pattern: String,
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let source_kind: SourceKind = args.source_type.parse()?;

        if args.max_workers == 0 {
            bail!("MAX_WORKERS must be greater than 0");
        }

        if args.pattern.is_empty() {
            bail!("PATTERN must not be empty");
        }

        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }

        if args.fetch_timeout_secs == 0 {
            bail!("FETCH_TIMEOUT_SECS must be greater than 0");
        }

        Ok(Self {
            source_kind,
            max_workers: args.max_workers,
            pattern: args.pattern,
            queue_capacity: args.queue_capacity,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
        })
    }
}
