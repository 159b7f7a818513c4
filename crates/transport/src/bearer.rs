//! `Authorization: Bearer <token>` transport

use crate::Transport;
use crate::headers::{HeaderInjection, to_header_map};
use reqwest::header::{AUTHORIZATION, HeaderMap};

/// Sends the IAM token as a bearer credential alongside fixed headers
/// such as an API-version header.
pub struct BearerHeaderTransport {
    headers: HeaderMap,
}

impl BearerHeaderTransport {
    pub fn new(headers: Vec<HeaderInjection>) -> Self {
        Self {
            headers: to_header_map(&headers),
        }
    }
}

impl Transport for BearerHeaderTransport {
    fn id(&self) -> &str {
        "bearer"
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> reqwest::RequestBuilder {
        request
            .headers(self.headers.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
    }
}
