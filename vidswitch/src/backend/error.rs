use thiserror::Error;

/// Reasons a manifest request can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the transport failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API {status} - {body}")]
    Backend { status: u16, body: String },

    /// The backend answered successfully but without a usable manifest URL.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
