//! Volume listing proxy
//!
//! Reads the stored IAM token, makes one GET to the storage broker scoped to
//! the configured instance CRN, and passes the JSON body back wrapped as
//! `{"volumes": ...}`. No retries, no pagination.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use ibm_auth::TokenManager;
use reqwest::StatusCode;
use tracing::{Instrument, info, info_span, warn};
use transport::Transport;

use crate::AppState;
use crate::config::VolumesConfig;
use crate::error::ApiError;
use crate::metrics;

/// Query parameter naming the storage instance.
pub const INSTANCE_QUERY_PARAM: &str = "instance_crn";

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No token stored; raised before any network call.
    #[error("no IAM token stored")]
    Unauthenticated,

    #[error("{0}")]
    Network(String),

    #[error("upstream returned invalid JSON: {0}")]
    UpstreamBody(String),
}

/// Result of a listing call that reached the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumesOutcome {
    /// 200 with the body passed through untouched
    Listed(serde_json::Value),
    /// Any other status
    UpstreamStatus(u16),
}

impl VolumesOutcome {
    /// Response body for callers. Broker failures are reported in-band
    /// under `error`, keeping the HTTP status at 200.
    pub fn into_body(self) -> serde_json::Value {
        match self {
            VolumesOutcome::Listed(volumes) => serde_json::json!({ "volumes": volumes }),
            VolumesOutcome::UpstreamStatus(status) => serde_json::json!({
                "error": format!("Failed to fetch volumes: {status}")
            }),
        }
    }
}

#[derive(Clone)]
pub struct VolumesProxy {
    client: reqwest::Client,
    tokens: Arc<TokenManager>,
    transport: Arc<dyn Transport>,
    url: String,
    instance_id: String,
    timeout: Option<Duration>,
}

impl VolumesProxy {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<TokenManager>,
        transport: Arc<dyn Transport>,
        config: &VolumesConfig,
    ) -> Self {
        Self {
            client,
            tokens,
            transport,
            url: config.url.clone(),
            instance_id: config.instance_id.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn transport_id(&self) -> &str {
        self.transport.id()
    }

    pub async fn list_volumes(&self) -> Result<VolumesOutcome, ProxyError> {
        let token = self
            .tokens
            .load_token()
            .await
            .ok_or(ProxyError::Unauthenticated)?;

        let mut request = self
            .client
            .get(&self.url)
            .query(&[(INSTANCE_QUERY_PARAM, self.instance_id.as_str())]);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let request = self.transport.authorize(request, &token);

        // Strip URLs from transport errors: the query transport puts the token there
        let response = request.send().await.map_err(|e| {
            metrics::record_upstream_error("volumes", metrics::transport_error_type(&e));
            let e = e.without_url();
            warn!(error = %e, "volume listing request failed");
            ProxyError::Network(e.to_string())
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            metrics::record_upstream_error("volumes", "status");
            warn!(%status, "storage broker returned non-200");
            return Ok(VolumesOutcome::UpstreamStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            metrics::record_upstream_error("volumes", "body");
            ProxyError::Network(e.without_url().to_string())
        })?;

        let volumes = serde_json::from_slice(&body).map_err(|e| {
            metrics::record_upstream_error("volumes", "body");
            ProxyError::UpstreamBody(e.to_string())
        })?;
        info!(bytes = body.len(), "volumes listed");
        Ok(VolumesOutcome::Listed(volumes))
    }
}

/// POST /call/volumes
pub async fn volumes_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());

    let span = info_span!(
        "list_volumes",
        %request_id,
        transport = state.volumes.transport_id()
    );

    let response = match state.volumes.list_volumes().instrument(span).await {
        Ok(outcome) => Json(outcome.into_body()).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    };

    metrics::record_request(
        "/call/volumes",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
