//! Typed failures of backend calls.

use thiserror::Error;

/// Everything a backend call can fail with. A 401 is kept apart from other
/// statuses because it ends the session.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (DNS, refused connection, timeout, TLS...).
    #[error("connection error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP 401: the session cookie is missing or expired.
    #[error("session expired or not valid")]
    Unauthorized,

    /// Non-success status with the backend's own message when it sent one.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The backend answered but the body was not what we expected.
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
