//! Opening sources for reading.
//!
//! A source is a single line of input naming either a local file or an HTTP
//! URL. [`Fetcher`] turns it into a buffered byte reader; the bodies of HTTP
//! responses are streamed, never buffered whole.

use core::{fmt, pin::Pin, str::FromStr, time::Duration};
use futures::TryStreamExt;
use std::io;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::io::StreamReader;

/// Buffered reader over the contents of one source.
pub type SourceReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// How a source line is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Url,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Url => f.write_str("url"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid source type `{0}`, expected `file` or `url`")]
pub struct InvalidSourceType(pub String);

impl FromStr for SourceKind {
    type Err = InvalidSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "url" => Ok(Self::Url),
            other => Err(InvalidSourceType(other.to_owned())),
        }
    }
}

/// Why a single source could not be counted.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Opens sources of one [`SourceKind`].
///
/// Cheap to clone: the URL variant shares one connection pool.
#[derive(Clone, Debug)]
pub enum Fetcher {
    File,
    Url(reqwest::Client),
}

impl Fetcher {
    /// Builds a fetcher for `kind`. `timeout` bounds each HTTP request.
    pub fn new(kind: SourceKind, timeout: Duration) -> Result<Self, reqwest::Error> {
        match kind {
            SourceKind::File => Ok(Self::File),
            SourceKind::Url => {
                let client = reqwest::Client::builder().timeout(timeout).build()?;
                Ok(Self::Url(client))
            }
        }
    }

    /// Opens `source` and returns a reader over its contents.
    pub async fn open(&self, source: &str) -> Result<SourceReader, SourceError> {
        match self {
            Self::File => {
                let file = tokio::fs::File::open(source).await?;
                Ok(Box::pin(BufReader::new(file)))
            }
            Self::Url(client) => {
                let response = client.get(source).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(SourceError::Status(status));
                }
                let body = response.bytes_stream().map_err(io::Error::other);
                Ok(Box::pin(StreamReader::new(body)))
            }
        }
    }
}
