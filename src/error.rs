use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("text extraction failed for {url}: {reason}")]
    Extract { url: String, reason: String },
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Transport failures and non-success statuses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Request { .. } | FetchError::Status { .. })
    }
}
