//! Hacker News adapter: the Firebase-backed public API, no authentication
//! required. `fetch_recent` walks the "new stories" list and keeps items
//! whose title or text matches the query terms.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    by: Option<String>,
    time: i64,
    #[serde(default)]
    descendants: Option<u64>,
    #[serde(default)]
    score: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    dead: bool,
    #[serde(default)]
    deleted: bool,
}

pub struct HackerNewsClient {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline/0.1".to_owned()
        } else {
            config.user_agent
        };
        Self {
            client: http_client(&user_agent),
            base_url: config.base_url_override.unwrap_or_else(|| BASE_URL.to_owned()),
        }
    }

    fn matches(item: &HnItem, query: &QuerySpec) -> bool {
        if item.dead || item.deleted {
            return false;
        }
        if item.kind.as_deref().is_some_and(|k| k != "story" && k != "comment") {
            return false;
        }
        if query.terms.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {}",
            item.title.as_deref().unwrap_or_default(),
            item.text.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        query.terms.iter().any(|term| haystack.contains(&term.to_lowercase()))
    }

    fn to_signal(item: HnItem) -> Option<Signal> {
        let created_at = Utc.timestamp_opt(item.time, 0).single()?;
        Signal::new(
            Uuid::new_v4(),
            Platform::HackerNews,
            item.by.unwrap_or_else(|| "unknown".to_owned()),
            created_at,
            Utc::now(),
            item.title.clone().unwrap_or_default(),
            item.text.unwrap_or_default(),
            Engagement {
                upvotes: item.score,
                comments: item.descendants,
                views: None,
            },
            item.url.or_else(|| Some(format!("https://news.ycombinator.com/item?id={}", item.id))),
        )
        .ok()
    }
}

#[async_trait]
impl PlatformClient for HackerNewsClient {
    fn platform(&self) -> Platform {
        Platform::HackerNews
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let ids: Vec<u64> = match get_json(
            &self.client,
            "hacker_news",
            self.client.get(format!("{}/newstories.json", self.base_url)),
        )
        .await
        {
            Ok(ids) => ids,
            Err(_) => return partial_then(Vec::new(), PartialFetchKind::UpstreamUnavailable),
        };

        let mut signals = Vec::new();
        for id in ids.into_iter().take(query.limit.max(1) * 3) {
            if signals.len() >= query.limit.max(1) {
                break;
            }
            let item: Result<HnItem, ClientError> = get_json(
                &self.client,
                "hacker_news",
                self.client.get(format!("{}/item/{}.json", self.base_url, id)),
            )
            .await;
            let Ok(item) = item else { continue };
            if !Self::matches(&item, &query) {
                continue;
            }
            if let Some(signal) = Self::to_signal(item) {
                if signal.created_at >= since {
                    signals.push(signal);
                }
            }
        }

        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let numeric_id: u64 = match id.parse() {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };
        let item: HnItem = get_json(
            &self.client,
            "hacker_news",
            self.client.get(format!("{}/item/{}.json", self.base_url, numeric_id)),
        )
        .await?;
        Ok(Self::to_signal(item))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_against(server: &MockServer) -> HackerNewsClient {
        HackerNewsClient::new(AdapterConfig {
            base_url_override: Some(server.uri()),
            user_agent: "luciq-test/0.1".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn fetch_recent_keeps_only_items_matching_query_terms() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/newstories.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1,
                "type": "story",
                "title": "Show HN: a local-first collaborative editor",
                "by": "builder",
                "time": 1_700_000_000,
                "score": 120,
                "descendants": 40
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 2,
                "type": "story",
                "title": "Unrelated cooking recipe thread",
                "by": "chef",
                "time": 1_700_000_000,
                "score": 5
            })))
            .mount(&server)
            .await;

        let client = client_against(&server);
        let query = QuerySpec::new(10).with_terms(["collaborative editor"]);
        let since = Utc.timestamp_opt(0, 0).unwrap();
        let signals: Vec<FetchEvent> = client.fetch_recent(query, since).await.collect().await;

        assert_eq!(signals.len(), 1);
        match &signals[0] {
            FetchEvent::Signal(signal) => assert!(signal.title.contains("collaborative editor")),
            other => panic!("expected a signal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_recent_reports_partial_fetch_when_newstories_list_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/newstories.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_against(&server);
        let since = Utc.timestamp_opt(0, 0).unwrap();
        let signals: Vec<FetchEvent> = client.fetch_recent(QuerySpec::new(10), since).await.collect().await;

        assert_eq!(signals.len(), 1);
        assert!(matches!(
            signals[0],
            FetchEvent::PartialFetch {
                kind: PartialFetchKind::UpstreamUnavailable,
                fetched: 0
            }
        ));
    }

    #[tokio::test]
    async fn fetch_by_id_rejects_non_numeric_ids() {
        let server = MockServer::start().await;
        let client = client_against(&server);
        assert_eq!(client.fetch_by_id("not-a-number").await.unwrap(), None);
    }
}
