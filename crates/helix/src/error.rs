//! Helix client error types.

use thiserror::Error;

/// Result type for Helix client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Helix API.
///
/// A missing user or an offline stream is not an error; those are
/// expected steady-state results and are modeled as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential grant rejected, or a request still rejected after one
    /// token re-acquisition.
    #[error("authorization rejected: {0}")]
    Auth(String),

    /// Network-level failure (connect, timeout, body read/decode).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-auth HTTP failure reported by the API.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Check whether this error came from the auth path.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
