//! Error types for IAM token operations

/// Errors from token exchange and token storage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure talking to IAM.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// IAM rejected the API key (any non-200 status).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// IAM answered 200 but without a usable `access_token`.
    #[error("upstream contract violation: {0}")]
    UpstreamContractViolation(String),

    #[error("refusing to store an empty token")]
    EmptyToken,

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
