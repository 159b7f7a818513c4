//! Stub upstreams for tests: real axum servers on 127.0.0.1:0

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Form;
use axum::extract::Query;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral port and return its base URL.
pub async fn spawn(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Stub IAM token endpoint, returns the full token URL.
///
/// - "good-key"     → 200 `{"access_token":"tok-abc",...}`
/// - "no-token-key" → 200 without `access_token`
/// - anything else  → 400
pub async fn start_iam_stub() -> String {
    let app = axum::Router::new().route(
        "/identity/token",
        post(|Form(form): Form<HashMap<String, String>>| async move {
            match form.get("apikey").map(String::as_str) {
                Some("good-key") => axum::Json(serde_json::json!({
                    "access_token": "tok-abc",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .into_response(),
                Some("no-token-key") => {
                    axum::Json(serde_json::json!({ "token_type": "Bearer" })).into_response()
                }
                _ => (
                    StatusCode::BAD_REQUEST,
                    axum::Json(serde_json::json!({ "errorCode": "BXNIM0415E" })),
                )
                    .into_response(),
            }
        }),
    );
    format!("{}/identity/token", spawn(app).await)
}

/// Stub storage broker that counts hits and records the last request.
pub struct VolumesStub {
    pub url: String,
    pub hits: Arc<AtomicU64>,
    last: Arc<Mutex<serde_json::Value>>,
}

impl VolumesStub {
    /// Last request seen as `{"method", "headers", "query"}`.
    pub fn last_request(&self) -> serde_json::Value {
        self.last.lock().unwrap().clone()
    }
}

pub async fn start_volumes_stub(status: StatusCode, body: &'static str) -> VolumesStub {
    let hits = Arc::new(AtomicU64::new(0));
    let last = Arc::new(Mutex::new(serde_json::Value::Null));

    let (hits_clone, last_clone) = (hits.clone(), last.clone());
    let app = axum::Router::new().fallback(
        move |method: Method, headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
            let hits = hits_clone.clone();
            let last = last_clone.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let headers: serde_json::Map<String, serde_json::Value> = headers
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.to_string(),
                            serde_json::Value::String(value.to_str().unwrap_or("").to_string()),
                        )
                    })
                    .collect();
                *last.lock().unwrap() = serde_json::json!({
                    "method": method.to_string(),
                    "headers": headers,
                    "query": query,
                });
                (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }
        },
    );

    let url = format!("{}/v1/volumes/", spawn(app).await);
    VolumesStub { url, hits, last }
}

/// Upstream that accepts connections and never answers.
pub async fn start_hanging_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            });
        }
    });
    format!("http://{addr}/v1/volumes/")
}
