use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use serde_json::Value;

use crate::channel::ChannelId;

use super::error::FetchError;

/// Manifest URL handed out by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManifestUrl(String);

impl ManifestUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManifestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/**
    Anything that can turn a channel id into a manifest URL.

    Implementations perform exactly one attempt per call. Retrying is the
    caller's business.
*/
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_manifest(&self, channel: &ChannelId) -> Result<ManifestUrl, FetchError>;
}

#[derive(Serialize)]
struct ManifestRequest<'a> {
    channel_id: &'a str,
}

/**
    Backend client that asks for a channel's manifest URL.

    Sends `POST <url>` with a bearer token and `{"channel_id": ...}`, then
    looks for the URL at `mpd_url` or `data.mpd_url`.
*/
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    client: Client,
    url: String,
    token: String,
}

impl ManifestFetcher {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url, token)
    }

    pub fn with_client(client: Client, url: impl Into<String>, token: impl Into<String>) -> Self {
        let token = token.into();
        // Accept tokens pasted together with their scheme.
        let token = match token.strip_prefix("Bearer ") {
            Some(stripped) => stripped.trim().to_string(),
            None => token.trim().to_string(),
        };
        Self {
            client,
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl ManifestSource for ManifestFetcher {
    async fn fetch_manifest(&self, channel: &ChannelId) -> Result<ManifestUrl, FetchError> {
        tracing::debug!(target: "fetcher", channel = %channel, "Requesting manifest");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .json(&ManifestRequest {
                channel_id: channel.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                target: "fetcher",
                channel = %channel,
                status = status.as_u16(),
                "Backend rejected manifest request"
            );
            return Err(FetchError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::malformed(format!("response body is not JSON: {}", e)))?;

        let url = extract_manifest_url(&json)
            .ok_or_else(|| FetchError::malformed("API returned no mpd_url"))?;

        tracing::debug!(target: "fetcher", channel = %channel, "Manifest received");
        Ok(ManifestUrl::new(url))
    }
}

/// Find the manifest URL at `mpd_url`, falling back to `data.mpd_url`.
fn extract_manifest_url(json: &Value) -> Option<&str> {
    fn non_empty(v: Option<&Value>) -> Option<&str> {
        v.and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    non_empty(json.get("mpd_url"))
        .or_else(|| non_empty(json.get("data").and_then(|d| d.get("mpd_url"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn fetcher_for(server: &MockServer) -> ManifestFetcher {
        ManifestFetcher::new(format!("{}/api/mpd-url", server.uri()), "secret")
    }

    #[test]
    fn test_extract_top_level() {
        let json = json!({ "mpd_url": "https://x/a.mpd" });
        assert_eq!(extract_manifest_url(&json), Some("https://x/a.mpd"));
    }

    #[test]
    fn test_extract_nested_under_data() {
        let json = json!({ "mpd_url": "", "data": { "mpd_url": "https://x/b.mpd" } });
        assert_eq!(extract_manifest_url(&json), Some("https://x/b.mpd"));
    }

    #[test]
    fn test_extract_rejects_non_strings() {
        assert_eq!(extract_manifest_url(&json!({ "mpd_url": 42 })), None);
        assert_eq!(extract_manifest_url(&json!({ "data": null })), None);
        assert_eq!(extract_manifest_url(&json!(["mpd_url"])), None);
    }

    #[test]
    fn test_bearer_prefix_is_not_doubled() {
        let fetcher = ManifestFetcher::new("http://localhost/api", "Bearer abc");
        assert_eq!(fetcher.token, "abc");
    }

    #[tokio::test]
    async fn test_fetch_sends_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/mpd-url"))
            .and(header("authorization", "Bearer secret"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({ "channel_id": "CH-1" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "mpd_url": "https://x/a.mpd" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = fetcher_for(&server)
            .await
            .fetch_manifest(&ChannelId::new("CH-1"))
            .await
            .unwrap();
        assert_eq!(url.as_str(), "https://x/a.mpd");
    }

    #[tokio::test]
    async fn test_fetch_nested_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "mpd_url": "https://x/nested.mpd" } })),
            )
            .mount(&server)
            .await;

        let url = fetcher_for(&server)
            .await
            .fetch_manifest(&ChannelId::new("CH-2"))
            .await
            .unwrap();
        assert_eq!(url, ManifestUrl::new("https://x/nested.mpd"));
    }

    #[tokio::test]
    async fn test_fetch_backend_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .await
            .fetch_manifest(&ChannelId::new("CH-1"))
            .await
            .unwrap_err();
        match err {
            FetchError::Backend { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unexpected_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "unexpected": "field" })),
            )
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .await
            .fetch_manifest(&ChannelId::new("CH-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .await
            .fetch_manifest(&ChannelId::new("CH-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_backend_is_network_error() {
        let fetcher = ManifestFetcher::new("http://127.0.0.1:1/api/mpd-url", "secret");
        let err = fetcher
            .fetch_manifest(&ChannelId::new("CH-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
