//! Query-string token transport

use crate::Transport;
use crate::headers::{HeaderInjection, to_header_map};
use reqwest::header::HeaderMap;

/// Carries the IAM token as a query parameter instead of a header.
///
/// Tokens in URLs end up in upstream access logs; prefer
/// `BearerHeaderTransport` unless the broker requires this form.
pub struct QueryTokenTransport {
    param: String,
    headers: HeaderMap,
}

impl QueryTokenTransport {
    pub fn new(param: impl Into<String>, headers: Vec<HeaderInjection>) -> Self {
        Self {
            param: param.into(),
            headers: to_header_map(&headers),
        }
    }
}

impl Transport for QueryTokenTransport {
    fn id(&self) -> &str {
        "query"
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> reqwest::RequestBuilder {
        request
            .headers(self.headers.clone())
            .query(&[(self.param.as_str(), token)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn appends_token_to_existing_query() {
        let transport = QueryTokenTransport::new("access_token", vec![]);
        let client = reqwest::Client::new();
        let request = transport
            .authorize(
                client
                    .get("http://upstream.test/v1/volumes/")
                    .query(&[("instance_crn", "crn:v1:x")]),
                "tok-2",
            )
            .build()
            .unwrap();

        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("instance_crn".to_string(), "crn:v1:x".to_string()),
                ("access_token".to_string(), "tok-2".to_string()),
            ]
        );
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn custom_param_name() {
        let transport = QueryTokenTransport::new("token", vec![]);
        let client = reqwest::Client::new();
        let request = transport
            .authorize(client.get("http://upstream.test/"), "abc")
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("token=abc"));
    }
}
