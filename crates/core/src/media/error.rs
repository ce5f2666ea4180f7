//! Media store error types.

use thiserror::Error;

/// Media store operation errors.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Store provider configuration error.
    #[error("media store configuration error: {0}")]
    Configuration(String),

    /// The local file to upload could not be read.
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    /// The request never got a response.
    #[error("media store request failed: {0}")]
    Request(String),

    /// The store answered with an error.
    #[error("media store rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the store.
        status: u16,
        /// Error message returned by the store.
        message: String,
    },

    /// The store answered with something we could not interpret.
    #[error("unexpected media store response: {0}")]
    InvalidResponse(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl MediaError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<opendal::Error> for MediaError {
    fn from(err: opendal::Error) -> Self {
        Self::Operation(err.to_string())
    }
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
