use thiserror::Error;

/// Errors produced by the relay core.
///
/// Each variant maps onto one HTTP outcome in the server: `InvalidInput` is
/// a client error, `NotFound` a missing image, `BackendFailure` an upstream
/// model runtime problem. `ResolutionFailure` only escapes the normalizer
/// when the strict image policy is configured.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The caller supplied a missing or malformed value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested image id is unknown or has expired.
    #[error("image not found: {0}")]
    NotFound(String),

    /// The model runtime was unreachable or answered with an error.
    #[error("backend failure: {message}")]
    BackendFailure { message: String },

    /// An image reference could not be fetched or decoded.
    #[error("image resolution failed for '{url}': {reason}")]
    ResolutionFailure { url: String, reason: String },
}

impl RelayError {
    pub fn backend(message: impl Into<String>) -> Self {
        RelayError::BackendFailure { message: message.into() }
    }

    pub fn resolution(url: impl Into<String>, reason: impl Into<String>) -> Self {
        RelayError::ResolutionFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
