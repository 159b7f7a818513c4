//! Upstream credential transport strategies
//!
//! The storage broker has been called two ways: with the IAM bearer token in
//! the `Authorization` header, and with the token carried in the query
//! string. `Transport` decouples the volumes proxy from that choice so the
//! strategy is picked in config rather than in code.

pub mod bearer;
pub mod headers;
pub mod query;

pub use bearer::BearerHeaderTransport;
pub use headers::HeaderInjection;
pub use query::QueryTokenTransport;

use serde::Deserialize;
use std::sync::Arc;

/// Default query parameter name used by `QueryTokenTransport`.
pub const DEFAULT_TOKEN_QUERY_PARAM: &str = "access_token";

/// Attaches the cached IAM token (and any fixed protocol headers) to an
/// outbound upstream request.
pub trait Transport: Send + Sync {
    /// Identifier for logging (e.g. "bearer", "query")
    fn id(&self) -> &str;

    /// Decorate `request` with `token` and the strategy's fixed headers.
    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> reqwest::RequestBuilder;
}

/// Strategy selector as written in config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Bearer,
    Query,
}

impl TransportKind {
    /// Build the strategy for this kind.
    ///
    /// `query_param` is only consulted for `TransportKind::Query`.
    pub fn build(self, headers: Vec<HeaderInjection>, query_param: &str) -> Arc<dyn Transport> {
        match self {
            TransportKind::Bearer => Arc::new(BearerHeaderTransport::new(headers)),
            TransportKind::Query => Arc::new(QueryTokenTransport::new(query_param, headers)),
        }
    }
}
