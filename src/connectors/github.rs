//! GitHub adapter: the issue/discussion search API. Works unauthenticated
//! at GitHub's low anonymous rate limit; a personal access token raises it
//! and is sent as a bearer credential when configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    id: u64,
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    user: IssueUser,
    created_at: DateTime<Utc>,
    comments: u64,
    html_url: String,
    repository_url: String,
}

#[derive(Debug, Deserialize)]
struct IssueUser {
    login: String,
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline".to_owned()
        } else {
            config.user_agent
        };
        Self {
            client: http_client(&user_agent),
            token: config.credentials,
            base_url: config.base_url_override.unwrap_or_else(|| BASE_URL.to_owned()),
        }
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn to_signal(issue: Issue) -> Option<Signal> {
        let parts: Vec<&str> = issue.repository_url.split('/').collect();
        let repo = if parts.len() >= 2 {
            format!("{}/{}", parts[parts.len() - 2], parts[parts.len() - 1])
        } else {
            issue.repository_url.clone()
        };
        Signal::new(
            Uuid::new_v4(),
            Platform::GitHub,
            issue.user.login,
            issue.created_at,
            Utc::now(),
            format!("{repo}#{}: {}", issue.number, issue.title),
            issue.body.unwrap_or_default(),
            Engagement {
                upvotes: None,
                comments: Some(issue.comments),
                views: None,
            },
            Some(issue.html_url),
        )
        .ok()
        .map(|mut s| {
            s.id = Uuid::new_v5(&Uuid::NAMESPACE_URL, issue.id.to_string().as_bytes());
            s
        })
    }
}

#[async_trait]
impl PlatformClient for GitHubClient {
    fn platform(&self) -> Platform {
        Platform::GitHub
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let mut q = query.terms.iter().cloned().collect::<Vec<_>>().join(" OR ");
        if q.is_empty() {
            q = "is:issue".to_owned();
        }
        q.push_str(&format!(" created:>={}", since.format("%Y-%m-%d")));

        let url = format!(
            "{}/search/issues?q={}&sort=created&order=desc&per_page={}",
            self.base_url,
            urlencoding_lite(&q),
            query.limit.clamp(1, 100),
        );

        let response: Result<SearchResponse, ClientError> = get_json(&self.client, "github", self.request(url)).await;
        let Ok(response) = response else {
            return partial_then(Vec::new(), PartialFetchKind::RateLimited);
        };

        let signals = response.items.into_iter().filter_map(Self::to_signal).collect();
        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let url = format!("{}/search/issues?q=id:{}", self.base_url, id);
        let response: SearchResponse = get_json(&self.client, "github", self.request(url)).await?;
        Ok(response.items.into_iter().next().and_then(Self::to_signal))
    }
}

/// Minimal query-string escaping sufficient for GitHub's search `q` terms
/// (space and quote are the only characters we ever emit).
fn urlencoding_lite(input: &str) -> String {
    input.replace(' ', "+").replace('"', "%22")
}
