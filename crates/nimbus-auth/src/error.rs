//! Error types for the login flow and credential store.

use std::fmt;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a login attempt stopped before the callback completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The process received SIGINT/SIGTERM (or Ctrl+C).
    Signal(String),
    /// [`CancelHandle::cancel`](crate::listener::CancelHandle::cancel) was called.
    User,
    /// The HTTP server stopped on its own.
    Server(String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Signal(sig) => write!(f, "canceled by signal: {}", sig),
            CancelReason::User => f.write_str("canceled by user"),
            CancelReason::Server(msg) => write!(f, "server error: {}", msg),
        }
    }
}

/// Errors that can occur while logging in or managing stored credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Provider configuration is unusable (e.g. malformed authorize URL).
    #[error("Config error: {0}")]
    Config(String),

    /// The callback listener could not bind its address.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: String,
        source: std::io::Error,
    },

    /// The redirect did not carry an authorization code.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The token endpoint rejected the request or answered with garbage.
    #[error("Exchange error: {0}")]
    Exchange(String),

    /// Transport-level failure talking to the token endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The login attempt was torn down before a callback arrived.
    #[error("{0}")]
    Canceled(CancelReason),

    /// The stored access token is undecodable or expired.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Refreshing the access token failed.
    #[error("Refresh error: {0}")]
    Refresh(String),

    /// Reading or writing the credential file failed.
    #[error("failed to access credential file '{path}': {source}")]
    Storage {
        path: String,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Login variant that has no implementation.
    #[error("{0} is not supported yet")]
    NotSupported(&'static str),
}

impl AuthError {
    /// Whether this error ended a login attempt through cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, AuthError::Canceled(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}
