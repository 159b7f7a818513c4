//! Token manager: IAM exchange plus the single credential record

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::Result;
use crate::store::TokenStore;
use crate::token::request_token;

/// Owns the credential record. Readers go through `load_token`; only a
/// successful exchange writes.
pub struct TokenManager {
    client: reqwest::Client,
    iam_url: String,
    store: Arc<dyn TokenStore>,
}

impl TokenManager {
    pub fn new(
        client: reqwest::Client,
        iam_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            client,
            iam_url: iam_url.into(),
            store,
        }
    }

    /// Exchange `api_key` at IAM and persist the resulting token.
    ///
    /// The record is only written once IAM has returned a usable token, so
    /// every error path leaves the previous token in place.
    #[instrument(skip_all, fields(iam_url = %self.iam_url))]
    pub async fn exchange_api_key(&self, api_key: &str) -> Result<String> {
        let token = request_token(&self.client, &self.iam_url, api_key)
            .await?
            .into_access_token()?;
        self.store.set(token.clone()).await?;
        info!("IAM token saved");
        Ok(token)
    }

    /// Current token, `None` when unauthenticated.
    pub async fn load_token(&self) -> Option<String> {
        self.store.get().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.load_token().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::APIKEY_GRANT_TYPE;
    use crate::error::Error;
    use crate::store::{FileTokenStore, MemoryTokenStore};
    use axum::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// Stub IAM endpoint keyed on the submitted apikey:
    /// - "good-key"      → 200 with access_token
    /// - "no-token-key"  → 200 without access_token
    /// - "not-json-key"  → 200 with a non-JSON body
    /// - anything else   → 400 like IAM's BXNIM0415E
    async fn start_iam_stub() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let app = axum::Router::new().route(
                "/identity/token",
                post(
                    |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| async move {
                        let content_type = headers
                            .get("content-type")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default();
                        if !content_type.starts_with("application/x-www-form-urlencoded")
                            || form.get("grant_type").map(String::as_str) != Some(APIKEY_GRANT_TYPE)
                        {
                            return (StatusCode::BAD_REQUEST, "bad grant").into_response();
                        }
                        match form.get("apikey").map(String::as_str) {
                            Some("good-key") => axum::Json(serde_json::json!({
                                "access_token": "tok-abc",
                                "token_type": "Bearer",
                                "expires_in": 3600
                            }))
                            .into_response(),
                            Some("no-token-key") => {
                                axum::Json(serde_json::json!({"token_type": "Bearer"})).into_response()
                            }
                            Some("not-json-key") => (StatusCode::OK, "<html>oops</html>").into_response(),
                            _ => (
                                StatusCode::BAD_REQUEST,
                                axum::Json(serde_json::json!({"errorCode": "BXNIM0415E"})),
                            )
                                .into_response(),
                        }
                    },
                ),
            );
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/identity/token")
    }

    #[tokio::test]
    async fn valid_key_returns_and_persists_token() {
        let iam_url = start_iam_stub().await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileTokenStore::new(dir.path().join("token.json")));
        let manager = TokenManager::new(reqwest::Client::new(), iam_url, store);

        assert!(!manager.is_authenticated().await);
        let token = manager.exchange_api_key("good-key").await.unwrap();
        assert_eq!(token, "tok-abc");
        assert_eq!(manager.load_token().await.as_deref(), Some("tok-abc"));
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn rejected_key_leaves_record_unchanged() {
        let iam_url = start_iam_stub().await;
        let store = Arc::new(MemoryTokenStore::with_token("previous"));
        let manager = TokenManager::new(reqwest::Client::new(), iam_url, store);

        let err = manager.exchange_api_key("wrong-key").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
        assert_eq!(manager.load_token().await.as_deref(), Some("previous"));
    }

    #[tokio::test]
    async fn missing_access_token_is_contract_violation() {
        let iam_url = start_iam_stub().await;
        let store = Arc::new(MemoryTokenStore::new());
        let manager = TokenManager::new(reqwest::Client::new(), iam_url, store);

        let err = manager.exchange_api_key("no-token-key").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamContractViolation(_)), "got: {err:?}");
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn non_json_success_body_is_contract_violation() {
        let iam_url = start_iam_stub().await;
        let manager = TokenManager::new(
            reqwest::Client::new(),
            iam_url,
            Arc::new(MemoryTokenStore::new()),
        );

        let err = manager.exchange_api_key("not-json-key").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamContractViolation(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn unreachable_iam_is_network_failure() {
        let store = Arc::new(MemoryTokenStore::with_token("kept"));
        let manager = TokenManager::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/identity/token",
            store,
        );

        let err = manager.exchange_api_key("good-key").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
        assert_eq!(manager.load_token().await.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn second_exchange_overwrites_first() {
        let iam_url = start_iam_stub().await;
        let store = Arc::new(MemoryTokenStore::with_token("stale"));
        let manager = TokenManager::new(reqwest::Client::new(), iam_url, store);

        manager.exchange_api_key("good-key").await.unwrap();
        assert_eq!(manager.load_token().await.as_deref(), Some("tok-abc"));
    }
}
