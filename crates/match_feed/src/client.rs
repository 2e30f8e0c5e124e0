//! Feed HTTP client.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::discovery::TrackedMatch;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Bad feed template; fatal for the affected id only.
    #[error("config: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed body: {0}")]
    Body(String),
}

/// Source of raw per-match documents. `HttpFeed` in production, fakes in tests.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_match(&self, target: &TrackedMatch) -> Result<Value, FeedError>;
}

pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// GET a JSON document with no-cache hints. Non-2xx and unparseable bodies are errors.
pub async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<Value, FeedError> {
    let resp = client
        .get(url)
        .header("cache-control", "no-cache")
        .header("pragma", "no-cache")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedError::Status(status));
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(120).collect();
        FeedError::Body(format!("{e}: {preview}"))
    })
}

pub struct HttpFeed {
    client:   reqwest::Client,
    template: String,
}

impl HttpFeed {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            client:   build_client(),
            template: template.into(),
        }
    }

    /// Feed URL for one match: `{id}` (required) and `{scope}` substituted,
    /// plus a `cb=<millis>` cache buster.
    pub fn match_url(&self, target: &TrackedMatch, now_ms: i64) -> Result<String, FeedError> {
        if !self.template.contains("{id}") {
            return Err(FeedError::Config(format!(
                "FEED_TMPL must contain {{id}} (got {:?})",
                self.template
            )));
        }
        let base = self
            .template
            .replace("{id}", &target.id)
            .replace("{scope}", target.scope.as_deref().unwrap_or_default());
        let sep = if base.contains('?') { '&' } else { '?' };
        Ok(format!("{base}{sep}cb={now_ms}"))
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch_match(&self, target: &TrackedMatch) -> Result<Value, FeedError> {
        let url = self.match_url(target, Utc::now().timestamp_millis())?;
        debug!(match_id = %target.id, %url, "fetching feed");
        fetch_json(&self.client, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, scope: Option<&str>) -> TrackedMatch {
        TrackedMatch {
            id: id.to_string(),
            scope: scope.map(str::to_string),
        }
    }

    #[test]
    fn url_gets_id_and_cache_buster() {
        let feed = HttpFeed::new("https://feed.example/matches/{id}.json");
        let url = feed.match_url(&target("4410", None), 1700000000000).unwrap();
        assert_eq!(url, "https://feed.example/matches/4410.json?cb=1700000000000");
    }

    #[test]
    fn url_with_query_and_scope() {
        let feed = HttpFeed::new("https://feed.example/{scope}/match?id={id}");
        let url = feed.match_url(&target("9", Some("mexico")), 5).unwrap();
        assert_eq!(url, "https://feed.example/mexico/match?id=9&cb=5");
    }

    #[test]
    fn template_without_placeholder_is_config_error() {
        let feed = HttpFeed::new("https://feed.example/matches.json");
        let err = feed.match_url(&target("1", None), 0).unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let (base, _) = crate::test_http::serve(vec![(503, r#"{"error":"busy"}"#)]).await;
        let feed = HttpFeed::new(format!("{base}/matches/{{id}}.json"));
        let err = feed.fetch_match(&target("4410", None)).await.unwrap_err();
        assert!(matches!(err, FeedError::Status(s) if s.as_u16() == 503), "{err}");
    }

    #[tokio::test]
    async fn malformed_body_is_body_error() {
        let (base, _) = crate::test_http::serve(vec![(200, "not json")]).await;
        let feed = HttpFeed::new(format!("{base}/matches/{{id}}.json"));
        let err = feed.fetch_match(&target("4410", None)).await.unwrap_err();
        match err {
            FeedError::Body(msg) => assert!(msg.contains("not json")),
            other => panic!("expected body error, got {other}"),
        }
    }

    #[tokio::test]
    async fn document_is_returned_as_json() {
        let (base, _) = crate::test_http::serve(vec![(200, r#"{"matchId": 4410, "statusId": 1}"#)]).await;
        let feed = HttpFeed::new(format!("{base}/matches/{{id}}.json"));
        let doc = feed.fetch_match(&target("4410", None)).await.unwrap();
        assert_eq!(doc["statusId"], 1);
    }

    #[tokio::test]
    async fn unreachable_feed_is_http_error() {
        let feed = HttpFeed::new("http://127.0.0.1:1/{id}");
        let err = feed.fetch_match(&target("4410", None)).await.unwrap_err();
        assert!(matches!(err, FeedError::Http(_)));
    }
}
