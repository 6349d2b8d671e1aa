//! Error types for the page fetcher.

/// Errors that can occur when fetching a page.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be completed (network error, timeout, or unreadable body).
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// The server returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Whether another attempt at the same URL could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::HttpStatus { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::InvalidUrl(_) => false,
        }
    }
}
