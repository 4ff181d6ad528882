//! Error types for the arXiv crawler.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from the arXiv API client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the arXiv API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// The response body was not well-formed XML
    #[error("Malformed Atom feed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The feed was well-formed but a field could not be interpreted
    #[error("Invalid feed content: {0}")]
    Feed(String),

    /// The API answered with an error entry instead of results
    #[error("arXiv API error: {0}")]
    Api(String),

    /// A page came back empty before the advertised total was reached
    #[error("Empty page at offset {offset} after {attempts} attempts")]
    EmptyPage {
        /// Result offset of the page
        offset: u32,
        /// Number of attempts made
        attempts: u32,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create a feed content error.
    #[must_use]
    pub fn feed(message: impl Into<String>) -> Self {
        Self::Feed(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. } | Self::EmptyPage { .. })
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors from reading and writing crawl state and archive files.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Filesystem error on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Attach a path to an I/O error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Errors that abort a whole crawl run.
///
/// Per-category API failures are recorded in the report instead.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    /// State or archive persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for crawl operations.
pub type CrawlResult<T> = Result<T, CrawlError>;
