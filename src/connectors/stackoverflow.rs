//! Stack Overflow adapter: the Stack Exchange API's `/questions` endpoint.
//! Works unauthenticated (shared anonymous quota); an API key, when
//! configured, raises the request quota but changes no response shape.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://api.stackexchange.com/2.3";

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    items: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    question_id: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    creation_date: i64,
    score: i64,
    answer_count: u64,
    view_count: u64,
    link: String,
    owner: Owner,
}

#[derive(Debug, Deserialize, Default)]
struct Owner {
    #[serde(default)]
    display_name: Option<String>,
}

pub struct StackOverflowClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl StackOverflowClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline/0.1".to_owned()
        } else {
            config.user_agent
        };
        Self {
            client: http_client(&user_agent),
            api_key: config.credentials,
            base_url: config.base_url_override.unwrap_or_else(|| BASE_URL.to_owned()),
        }
    }

    fn to_signal(question: Question) -> Option<Signal> {
        let created_at = Utc.timestamp_opt(question.creation_date, 0).single()?;
        Signal::new(
            Uuid::new_v4(),
            Platform::StackOverflow,
            question.owner.display_name.unwrap_or_else(|| "unknown".to_owned()),
            created_at,
            Utc::now(),
            question.title,
            question.body.unwrap_or_default(),
            Engagement {
                upvotes: u64::try_from(question.score.max(0)).ok(),
                comments: Some(question.answer_count),
                views: Some(question.view_count),
            },
            Some(question.link),
        )
        .ok()
    }
}

#[async_trait]
impl PlatformClient for StackOverflowClient {
    fn platform(&self) -> Platform {
        Platform::StackOverflow
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let tagged = if query.communities.is_empty() {
            String::new()
        } else {
            format!("&tagged={}", query.communities.join(";"))
        };
        let mut url = format!(
            "{}/questions?order=desc&sort=creation&site=stackoverflow&pagesize={}&filter=withbody{}",
            self.base_url,
            query.limit.clamp(1, 100),
            tagged,
        );
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&key={key}"));
        }

        let response: Result<QuestionsResponse, ClientError> = get_json(&self.client, "stack_overflow", self.client.get(url)).await;
        let Ok(response) = response else {
            return partial_then(Vec::new(), PartialFetchKind::UpstreamUnavailable);
        };

        let terms: Vec<String> = query.terms.iter().map(|t| t.to_lowercase()).collect();
        let signals = response
            .items
            .into_iter()
            .filter(|q| {
                terms.is_empty()
                    || terms.iter().any(|t| q.title.to_lowercase().contains(t))
                    || q.tags.iter().any(|tag| terms.contains(&tag.to_lowercase()))
            })
            .filter_map(Self::to_signal)
            .filter(|s| s.created_at >= since)
            .collect();

        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let url = format!(
            "{}/questions/{}?order=desc&sort=creation&site=stackoverflow&filter=withbody",
            self.base_url, id
        );
        let response: QuestionsResponse = get_json(&self.client, "stack_overflow", self.client.get(url)).await?;
        Ok(response.items.into_iter().next().and_then(Self::to_signal))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_against(server: &MockServer) -> StackOverflowClient {
        StackOverflowClient::new(AdapterConfig {
            base_url_override: Some(server.uri()),
            user_agent: "luciq-test/0.1".to_string(),
            ..Default::default()
        })
    }

    fn question_body() -> serde_json::Value {
        serde_json::json!({
            "items": [{
                "question_id": 555,
                "title": "How do I migrate our billing pipeline without downtime",
                "body": "Our subscription pricing vendor is sunsetting their API",
                "tags": ["billing", "saas"],
                "creation_date": 1_700_000_000,
                "score": 12,
                "answer_count": 3,
                "view_count": 900,
                "link": "https://stackoverflow.com/q/555",
                "owner": { "display_name": "dev_jane" }
            }]
        })
    }

    #[tokio::test]
    async fn fetch_recent_parses_questions_into_signals() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&question_body()))
            .mount(&server)
            .await;

        let client = client_against(&server);
        let since = Utc.timestamp_opt(0, 0).unwrap();
        let signals: Vec<FetchEvent> = client.fetch_recent(QuerySpec::new(10), since).await.collect().await;

        assert_eq!(signals.len(), 1);
        match &signals[0] {
            FetchEvent::Signal(signal) => {
                assert_eq!(signal.platform, Platform::StackOverflow);
                assert_eq!(signal.author_ref, "dev_jane");
                assert_eq!(signal.engagement.views, Some(900));
            }
            other => panic!("expected a signal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_recent_filters_out_questions_not_matching_any_term() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&question_body()))
            .mount(&server)
            .await;

        let client = client_against(&server);
        let query = QuerySpec::new(10).with_terms(["kubernetes"]);
        let since = Utc.timestamp_opt(0, 0).unwrap();
        let signals: Vec<FetchEvent> = client.fetch_recent(query, since).await.collect().await;

        assert!(signals.is_empty());
    }

    #[tokio::test]
    async fn fetch_recent_reports_partial_fetch_on_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(502))
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
}
