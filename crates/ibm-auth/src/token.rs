//! API key to IAM token exchange
//!
//! A single form-encoded POST to the IAM token endpoint with the apikey
//! grant. Any non-200 answer is treated as a rejected key; a 200 answer
//! must carry a non-empty `access_token`.

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::APIKEY_GRANT_TYPE;
use crate::error::{Error, Result};

/// Response body from the IAM token endpoint.
///
/// Only `access_token` is required by this crate. The other fields are kept
/// for logging; expiry is not tracked.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Take the access token, failing if IAM left it out or sent it empty.
    pub fn into_access_token(self) -> Result<String> {
        match self.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(Error::UpstreamContractViolation(
                "access_token missing from IAM response".into(),
            )),
        }
    }
}

/// Exchange an API key for an IAM token response.
pub async fn request_token(
    client: &reqwest::Client,
    iam_url: &str,
    api_key: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(iam_url)
        .header(ACCEPT, "application/json")
        .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", api_key)])
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        warn!(%status, "IAM rejected API key");
        debug!(body, "IAM error body");
        return Err(Error::InvalidCredentials(format!(
            "IAM token endpoint returned {status}"
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("reading IAM response: {e}")))?;

    let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
        Error::UpstreamContractViolation(format!("IAM response is not valid JSON: {e}"))
    })?;
    debug!(
        token_type = parsed.token_type.as_deref().unwrap_or("unknown"),
        expires_in = parsed.expires_in,
        "IAM token issued"
    );
    Ok(parsed)
}
