use thiserror::Error;

/// Errors returned by the Gateway API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response not read.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status and no structured rejection.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The service made a final decision against the request.
    ///
    /// Never retried, a new burn intent with a fresh salt is needed.
    #[error("{0}")]
    Rejected(String),
}
