//! Product Hunt adapter: the GraphQL v2 API, which requires a developer
//! token for every request. Without one configured, `fetch_recent`
//! degrades to an `AuthFailed` partial fetch rather than guessing at an
//! unauthenticated shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, require_credentials, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://api.producthunt.com/v2/api/graphql";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<PostsData>,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: PostsConnection,
}

#[derive(Debug, Deserialize)]
struct PostsConnection {
    edges: Vec<PostEdge>,
}

#[derive(Debug, Deserialize)]
struct PostEdge {
    node: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    name: String,
    tagline: String,
    #[serde(rename = "votesCount")]
    votes_count: u64,
    #[serde(rename = "commentsCount")]
    comments_count: u64,
    url: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

pub struct ProductHuntClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl ProductHuntClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline/0.1".to_owned()
        } else {
            config.user_agent
        };
        Self {
            client: http_client(&user_agent),
            token: config.credentials,
            base_url: config.base_url_override.unwrap_or_else(|| BASE_URL.to_owned()),
        }
    }

    fn to_signal(post: Post) -> Option<Signal> {
        Signal::new(
            Uuid::new_v5(&Uuid::NAMESPACE_URL, post.id.as_bytes()),
            Platform::ProductHunt,
            post.id.clone(),
            post.created_at,
            Utc::now(),
            post.name,
            post.tagline,
            Engagement {
                upvotes: Some(post.votes_count),
                comments: Some(post.comments_count),
                views: None,
            },
            Some(post.url),
        )
        .ok()
    }
}

#[async_trait]
impl PlatformClient for ProductHuntClient {
    fn platform(&self) -> Platform {
        Platform::ProductHunt
    }

    async fn fetch_recent(&self, query: QuerySpec, _since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let token = match require_credentials(&self.token) {
            Ok(token) => token,
            Err(stream) => return stream,
        };

        let body = json!({
            "query": "query($first: Int!) { posts(order: NEWEST, first: $first) { edges { node { id name tagline votesCount commentsCount url createdAt } } } }",
            "variables": { "first": query.limit.clamp(1, 50) },
        });

        let response: Result<GraphQlResponse, ClientError> = get_json(
            &self.client,
            "product_hunt",
            self.client.post(&self.base_url).bearer_auth(token).json(&body),
        )
        .await;
        let Ok(response) = response else {
            return partial_then(Vec::new(), PartialFetchKind::UpstreamUnavailable);
        };

        let terms: Vec<String> = query.terms.iter().map(|t| t.to_lowercase()).collect();
        let signals = response
            .data
            .map(|d| d.posts.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.node)
            .filter(|p| terms.is_empty() || terms.iter().any(|t| p.name.to_lowercase().contains(t) || p.tagline.to_lowercase().contains(t)))
            .filter_map(Self::to_signal)
            .collect();

        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let body = json!({
            "query": "query($id: ID!) { post(id: $id) { id name tagline votesCount commentsCount url createdAt } }",
            "variables": { "id": id },
        });
        #[derive(Debug, Deserialize)]
        struct SingleResponse {
            data: Option<SinglePostData>,
        }
        #[derive(Debug, Deserialize)]
        struct SinglePostData {
            post: Option<Post>,
        }
        let response: SingleResponse = get_json(
            &self.client,
            "product_hunt",
            self.client.post(&self.base_url).bearer_auth(token).json(&body),
        )
        .await?;
        Ok(response.data.and_then(|d| d.post).and_then(Self::to_signal))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_against(server: &MockServer, token: Option<&str>) -> ProductHuntClient {
        ProductHuntClient::new(AdapterConfig {
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
    async fn fetch_recent_parses_graphql_posts_into_signals() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": {
                "posts": {
                    "edges": [{
                        "node": {
                            "id": "p1",
                            "name": "PricingLens",
                            "tagline": "cheaper analytics pricing for startups",
                            "votesCount": 120,
                            "commentsCount": 14,
                            "url": "https://producthunt.com/posts/pricinglens",
                            "createdAt": "2026-01-01T00:00:00Z"
                        }
                    }]
                }
            }
        });
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = client_against(&server, Some("dev-token"));
        let since = Utc::now();
        let signals: Vec<FetchEvent> = client.fetch_recent(QuerySpec::new(10), since).await.collect().await;

        assert_eq!(signals.len(), 1);
        match &signals[0] {
            FetchEvent::Signal(signal) => {
                assert_eq!(signal.platform, Platform::ProductHunt);
                assert_eq!(signal.engagement.upvotes, Some(120));
            }
            other => panic!("expected a signal, got {other:?}"),
        }
    }
}
