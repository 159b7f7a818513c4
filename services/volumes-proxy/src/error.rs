//! HTTP-facing error type
//!
//! Every raised failure leaves a handler as `ApiError` and is rendered as
//! `{"detail": "<message>"}`. A non-200 answer from the storage broker is
//! not an `ApiError`: it is reported in-band by `VolumesOutcome`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::volumes::ProxyError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Body that could not be read as JSON or lacks required fields
    #[error("{detail}")]
    RequestBody { status: StatusCode, detail: String },

    #[error("api_key must not be empty")]
    EmptyApiKey,

    #[error("Invalid API key")]
    InvalidCredentials,

    #[error("Token not found in response")]
    MissingToken,

    #[error("Backend error: {0}")]
    AuthBackend(String),

    #[error("Failed to save token: {0}")]
    TokenStorage(String),

    #[error("You must authenticate first")]
    Unauthenticated,

    #[error("Error calling backend: {0}")]
    VolumesBackend(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RequestBody { status, .. } => *status,
            ApiError::EmptyApiKey => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::MissingToken
            | ApiError::AuthBackend(_)
            | ApiError::TokenStorage(_)
            | ApiError::VolumesBackend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::RequestBody { .. } => "invalid_body",
            ApiError::EmptyApiKey => "empty_api_key",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::MissingToken => "contract_violation",
            ApiError::AuthBackend(_) | ApiError::VolumesBackend(_) => "network",
            ApiError::TokenStorage(_) => "storage",
            ApiError::Unauthenticated => "unauthenticated",
        }
    }
}

impl From<ibm_auth::Error> for ApiError {
    fn from(err: ibm_auth::Error) -> Self {
        match err {
            ibm_auth::Error::InvalidCredentials(_) => ApiError::InvalidCredentials,
            ibm_auth::Error::UpstreamContractViolation(_) | ibm_auth::Error::EmptyToken => {
                ApiError::MissingToken
            }
            ibm_auth::Error::Http(msg) => ApiError::AuthBackend(msg),
            ibm_auth::Error::CredentialParse(msg) | ibm_auth::Error::Io(msg) => {
                ApiError::TokenStorage(msg)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::RequestBody {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Unauthenticated => ApiError::Unauthenticated,
            ProxyError::Network(_) | ProxyError::UpstreamBody(_) => {
                ApiError::VolumesBackend(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
