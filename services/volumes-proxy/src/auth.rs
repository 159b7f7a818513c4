//! Token endpoints: API key exchange and authentication check

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use common::Secret;
use ibm_auth::TokenManager;
use serde::Deserialize;
use tracing::{Instrument, info_span, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics;

/// Request body for POST /auth/token.
#[derive(Deserialize)]
pub struct ApiKeyInput {
    api_key: String,
}

/// POST /auth/token: exchange the key at IAM and save the token.
///
/// Malformed bodies are answered with `{"detail": ...}` like any other error.
pub async fn token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());

    let result = match parse_api_key_input(&headers, &body) {
        Ok(input) => {
            let api_key = Secret::new(input.api_key);
            exchange(&state.tokens, &api_key)
                .instrument(info_span!("exchange_api_key", %request_id))
                .await
        }
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(token) => {
            metrics::record_token_exchange("success");
            Json(serde_json::json!({ "message": "Token saved", "token": token })).into_response()
        }
        Err(e) => {
            metrics::record_token_exchange(e.kind());
            if matches!(e, ApiError::AuthBackend(_)) {
                metrics::record_upstream_error("iam", "network");
            }
            warn!(%request_id, error = %e, "token exchange failed");
            e.into_response()
        }
    };

    metrics::record_request(
        "/auth/token",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// A missing Content-Type is read as JSON; any other non-JSON type is refused.
fn parse_api_key_input(headers: &HeaderMap, body: &[u8]) -> Result<ApiKeyInput, ApiError> {
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        if !is_json_content_type(content_type) {
            return Err(ApiError::RequestBody {
                status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                detail: "Expected request with `Content-Type: application/json`".to_string(),
            });
        }
    }
    let Json(input) = Json::<ApiKeyInput>::from_bytes(body)?;
    Ok(input)
}

fn is_json_content_type(value: &HeaderValue) -> bool {
    let Ok(value) = value.to_str() else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

async fn exchange(tokens: &TokenManager, api_key: &Secret<String>) -> Result<String, ApiError> {
    if api_key.expose().is_empty() {
        return Err(ApiError::EmptyApiKey);
    }
    Ok(tokens.exchange_api_key(api_key.expose()).await?)
}

/// GET /auth/check
pub async fn check_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let authenticated = state.tokens.is_authenticated().await;
    let response = Json(serde_json::json!({ "authenticated": authenticated })).into_response();
    metrics::record_request(
        "/auth/check",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
