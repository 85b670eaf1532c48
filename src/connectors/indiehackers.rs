//! IndieHackers adapter. IndieHackers publishes no public API, so this
//! client talks to a configured aggregation endpoint (an internally
//! operated scrape-and-relay service) rather than indiehackers.com
//! directly. Without that endpoint's access token configured, it degrades
//! to an `AuthFailed` partial fetch like any other unconfigured source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, require_credentials, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const DEFAULT_BASE_URL: &str = "https://indiehackers-relay.internal/v1";

#[derive(Debug, Deserialize)]
struct RelayResponse {
    posts: Vec<RelayPost>,
}

#[derive(Debug, Deserialize)]
struct RelayPost {
    id: String,
    title: String,
    #[serde(default)]
    body: String,
    author: String,
    created_at: DateTime<Utc>,
    upvotes: u64,
    comments: u64,
    url: String,
}

pub struct IndieHackersClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl IndieHackersClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline/0.1".to_owned()
        } else {
            config.user_agent
        };
        Self {
            client: http_client(&user_agent),
            token: config.credentials,
            base_url: config.base_url_override.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        }
    }

    fn to_signal(post: RelayPost) -> Option<Signal> {
        Signal::new(
            Uuid::new_v5(&Uuid::NAMESPACE_URL, post.id.as_bytes()),
            Platform::IndieHackers,
            post.author,
            post.created_at,
            Utc::now(),
            post.title,
            post.body,
            Engagement {
                upvotes: Some(post.upvotes),
                comments: Some(post.comments),
                views: None,
            },
            Some(post.url),
        )
        .ok()
    }
}

#[async_trait]
impl PlatformClient for IndieHackersClient {
    fn platform(&self) -> Platform {
        Platform::IndieHackers
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let token = match require_credentials(&self.token) {
            Ok(token) => token,
            Err(stream) => return stream,
        };

        let url = format!(
            "{}/posts?limit={}&since={}",
            self.base_url,
            query.limit.clamp(1, 100),
            since.to_rfc3339(),
        );
        let response: Result<RelayResponse, ClientError> =
            get_json(&self.client, "indie_hackers", self.client.get(url).bearer_auth(token)).await;
        let Ok(response) = response else {
            return partial_then(Vec::new(), PartialFetchKind::UpstreamUnavailable);
        };

        let terms: Vec<String> = query.terms.iter().map(|t| t.to_lowercase()).collect();
        let signals = response
            .posts
            .into_iter()
            .filter(|p| terms.is_empty() || terms.iter().any(|t| p.title.to_lowercase().contains(t) || p.body.to_lowercase().contains(t)))
            .filter_map(Self::to_signal)
            .collect();

        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let url = format!("{}/posts/{}", self.base_url, id);
        let post: Result<RelayPost, ClientError> = get_json(&self.client, "indie_hackers", self.client.get(url).bearer_auth(token)).await;
        Ok(post.ok().and_then(Self::to_signal))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_against(server: &MockServer, token: Option<&str>) -> IndieHackersClient {
        IndieHackersClient::new(AdapterConfig {
            credentials: token.map(str::to_owned),
            base_url_override: Some(server.uri()),
            user_agent: "luciq-test/0.1".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn fetch_recent_without_token_reports_auth_failed() {
        let server = MockServer::start().await;
        let client = client_against(&server, None);
        let since = Utc::now();
        let signals: Vec<FetchEvent> = client.fetch_recent(QuerySpec::new(10), since).await.collect().await;

        assert_eq!(signals.len(), 1);
        assert!(matches!(
            signals[0],
            FetchEvent::PartialFetch {
                kind: PartialFetchKind::AuthFailed,
                fetched: 0
            }
        ));
    }

    #[tokio::test]
    async fn fetch_recent_parses_relay_posts_and_filters_by_term() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "posts": [
                {
                    "id": "ih-1",
                    "title": "Our pricing page redesign cut churn",
                    "body": "switched to usage-based pricing after complaints",
                    "author": "founder_x",
                    "created_at": "2026-01-01T00:00:00Z",
                    "upvotes": 22,
                    "comments": 9,
                    "url": "https://indiehackers.com/post/ih-1"
                },
                {
                    "id": "ih-2",
                    "title": "Morning routines for solo founders",
                    "body": "unrelated productivity post",
                    "author": "founder_y",
                    "created_at": "2026-01-01T00:00:00Z",
                    "upvotes": 5,
                    "comments": 1,
                    "url": "https://indiehackers.com/post/ih-2"
                }
            ]
        });
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = client_against(&server, Some("relay-token"));
        let query = QuerySpec::new(10).with_terms(["pricing"]);
        let since = Utc::now();
        let signals: Vec<FetchEvent> = client.fetch_recent(query, since).await.collect().await;

        assert_eq!(signals.len(), 1);
        match &signals[0] {
            FetchEvent::Signal(signal) => {
                assert_eq!(signal.platform, Platform::IndieHackers);
                assert_eq!(signal.author_ref, "founder_x");
            }
            other => panic!("expected a signal, got {other:?}"),
        }
    }
}
