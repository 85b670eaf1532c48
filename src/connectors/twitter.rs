//! Twitter/X adapter: the v2 `tweets/search/recent` endpoint, which
//! requires an app-level bearer token for every call. Without one
//! configured this degrades to an `AuthFailed` partial fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, require_credentials, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://api.twitter.com/2";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize, Default)]
struct PublicMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    impression_count: u64,
}

pub struct TwitterClient {
    client: reqwest::Client,
    bearer_token: Option<String>,
    base_url: String,
}

impl TwitterClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline/0.1".to_owned()
        } else {
            config.user_agent
        };
        Self {
            client: http_client(&user_agent),
            bearer_token: config.credentials,
            base_url: config.base_url_override.unwrap_or_else(|| BASE_URL.to_owned()),
        }
    }

    fn to_signal(tweet: Tweet) -> Option<Signal> {
        Signal::new(
            Uuid::new_v5(&Uuid::NAMESPACE_URL, tweet.id.as_bytes()),
            Platform::Twitter,
            tweet.author_id.unwrap_or_else(|| "unknown".to_owned()),
            tweet.created_at.unwrap_or_else(Utc::now),
            Utc::now(),
            tweet.text.chars().take(80).collect(),
            tweet.text,
            Engagement {
                upvotes: Some(tweet.public_metrics.like_count),
                comments: Some(tweet.public_metrics.reply_count),
                views: Some(tweet.public_metrics.impression_count),
            },
            Some(format!("https://twitter.com/i/web/status/{}", tweet.id)),
        )
        .ok()
    }
}

#[async_trait]
impl PlatformClient for TwitterClient {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let token = match require_credentials(&self.bearer_token) {
            Ok(token) => token,
            Err(stream) => return stream,
        };

        let mut q = query.terms.iter().cloned().collect::<Vec<_>>().join(" OR ");
        if q.is_empty() {
            q = "lang:en".to_owned();
        }

        let url = format!(
            "{}/tweets/search/recent?query={}&max_results={}&start_time={}&tweet.fields=created_at,public_metrics,author_id",
            self.base_url,
            urlencode(&q),
            query.limit.clamp(10, 100),
            since.to_rfc3339(),
        );

        let response: Result<SearchResponse, ClientError> =
            get_json(&self.client, "twitter", self.client.get(url).bearer_auth(token)).await;
        let Ok(response) = response else {
            return partial_then(Vec::new(), PartialFetchKind::RateLimited);
        };

        let signals = response.data.into_iter().filter_map(Self::to_signal).collect();
        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let Some(token) = &self.bearer_token else {
            return Ok(None);
        };
        let url = format!(
            "{}/tweets/{}?tweet.fields=created_at,public_metrics,author_id",
            self.base_url, id
        );
        #[derive(Debug, Deserialize)]
        struct SingleResponse {
            data: Option<Tweet>,
        }
        let response: SingleResponse = get_json(&self.client, "twitter", self.client.get(url).bearer_auth(token)).await?;
        Ok(response.data.and_then(Self::to_signal))
    }
}

fn urlencode(input: &str) -> String {
    input.replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_against(server: &MockServer, token: Option<&str>) -> TwitterClient {
        TwitterClient::new(AdapterConfig {
            credentials: token.map(str::to_owned),
            base_url_override: Some(server.uri()),
            user_agent: "luciq-test/0.1".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn fetch_recent_without_bearer_token_reports_auth_failed() {
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
    async fn fetch_recent_parses_tweets_into_signals() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": [{
                "id": "1234567890",
                "text": "wish there was a cheaper analytics tool for indie founders",
                "author_id": "42",
                "created_at": "2026-01-01T00:00:00Z",
                "public_metrics": { "like_count": 50, "reply_count": 7, "impression_count": 3000 }
            }]
        });
        Mock::given(method("GET"))
            .and(path("/tweets/search/recent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = client_against(&server, Some("bearer-token"));
        let since = Utc::now();
        let signals: Vec<FetchEvent> = client.fetch_recent(QuerySpec::new(10), since).await.collect().await;

        assert_eq!(signals.len(), 1);
        match &signals[0] {
            FetchEvent::Signal(signal) => {
                assert_eq!(signal.platform, Platform::Twitter);
                assert_eq!(signal.author_ref, "42");
                assert_eq!(signal.engagement.views, Some(3000));
            }
            other => panic!("expected a signal, got {other:?}"),
        }
    }
}
