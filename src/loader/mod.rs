//! Concurrent, best-effort loading of metadata sources.
//!
//! Every locator is fetched and normalized independently. A source that
//! cannot be read or parsed is logged and dropped; it never fails the batch.

mod remote;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use url::Url;

use crate::collection::{Collection, DocumentError};
use crate::text::decode_bytes;

pub(crate) use remote::redact_credentials;
use remote::{MAX_DOCUMENT_BYTES, download};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

/// Where a source document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Remote(Url),
    Local(PathBuf),
}

impl SourceLocator {
    /// Anything that is not an absolute `http`/`https` URL is a local path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(raw)),
        }
    }
}

impl From<&str> for SourceLocator {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(&redact_credentials(url.as_str())),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_DOCUMENT_BYTES)]
    TooLarge,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Malformed(#[from] DocumentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    SourceUnreachable,
    MalformedDocument,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Malformed(_) => LoadErrorKind::MalformedDocument,
            _ => LoadErrorKind::SourceUnreachable,
        }
    }
}

/// Reads the raw body behind a locator.
/// Implemented by `HttpSourceReader` for production; mock implementations used in tests.
pub trait SourceReader {
    async fn read(&self, locator: &SourceLocator) -> Result<String, LoadError>;
}

/// Reads remote sources over HTTP(S) and local sources from the filesystem.
#[derive(Clone)]
pub struct HttpSourceReader {
    http: Client,
}

impl HttpSourceReader {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

impl SourceReader for HttpSourceReader {
    async fn read(&self, locator: &SourceLocator) -> Result<String, LoadError> {
        match locator {
            SourceLocator::Remote(url) => download(&self.http, url).await,
            SourceLocator::Local(path) => {
                if tokio::fs::metadata(path).await?.len() > MAX_DOCUMENT_BYTES as u64 {
                    return Err(LoadError::TooLarge);
                }
                // The file may grow between the size check and the read.
                let mut bytes = Vec::new();
                tokio::fs::File::open(path)
                    .await?
                    .take(MAX_DOCUMENT_BYTES as u64 + 1)
                    .read_to_end(&mut bytes)
                    .await?;
                if bytes.len() > MAX_DOCUMENT_BYTES {
                    return Err(LoadError::TooLarge);
                }
                Ok(decode_bytes(&bytes))
            }
        }
    }
}

#[derive(Debug)]
pub struct FailedSource {
    pub locator: String,
    pub kind: LoadErrorKind,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded collections, in the order their locators were given.
    pub collections: Vec<Collection>,
    pub failed: Vec<FailedSource>,
}

/// Load every locator concurrently and keep the collections that succeeded.
pub async fn load(reader: &impl SourceReader, locators: &[SourceLocator]) -> Vec<Collection> {
    load_all(reader, locators).await.collections
}

/// Like [`load`], but also reports which sources were dropped and why.
pub async fn load_all(reader: &impl SourceReader, locators: &[SourceLocator]) -> LoadReport {
    let outcomes = join_all(locators.iter().map(|locator| load_one(reader, locator))).await;

    let mut report = LoadReport::default();
    for (locator, outcome) in locators.iter().zip(outcomes) {
        match outcome {
            Ok(collection) => report.collections.push(collection),
            Err(e) => {
                warn!(locator = %locator, error = %e, "dropping source");
                report.failed.push(FailedSource {
                    locator: locator.to_string(),
                    kind: e.kind(),
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        loaded = report.collections.len(),
        failed = report.failed.len(),
        "sources loaded"
    );
    report
}

async fn load_one(
    reader: &impl SourceReader,
    locator: &SourceLocator,
) -> Result<Collection, LoadError> {
    let body = reader.read(locator).await?;
    Ok(Collection::parse(&body)?)
}
