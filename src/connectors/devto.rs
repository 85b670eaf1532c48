//! Dev.to adapter: the public `/api/articles` endpoint. No authentication
//! is required to read articles; an API key, when configured, is sent but
//! only changes rate limits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://dev.to/api";

#[derive(Debug, Deserialize)]
struct Article {
    id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tag_list: Vec<String>,
    user: ArticleUser,
    published_at: DateTime<Utc>,
    positive_reactions_count: u64,
    comments_count: u64,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ArticleUser {
    username: String,
}

pub struct DevToClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl DevToClient {
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

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    fn to_signal(article: Article) -> Option<Signal> {
        Signal::new(
            Uuid::new_v5(&Uuid::NAMESPACE_URL, article.id.to_string().as_bytes()),
            Platform::DevTo,
            article.user.username,
            article.published_at,
            Utc::now(),
            article.title,
            article.description.unwrap_or_default(),
            Engagement {
                upvotes: Some(article.positive_reactions_count),
                comments: Some(article.comments_count),
                views: None,
            },
            Some(article.url),
        )
        .ok()
    }
}

#[async_trait]
impl PlatformClient for DevToClient {
    fn platform(&self) -> Platform {
        Platform::DevTo
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let tag_query = query
            .communities
            .first()
            .or_else(|| query.terms.iter().next())
            .map(|t| format!("&tag={t}"))
            .unwrap_or_default();
        let url = format!(
            "{}/articles?per_page={}{}",
            self.base_url,
            query.limit.clamp(1, 100),
            tag_query,
        );

        let articles: Result<Vec<Article>, ClientError> = get_json(&self.client, "dev_to", self.request(url)).await;
        let Ok(articles) = articles else {
            return partial_then(Vec::new(), PartialFetchKind::UpstreamUnavailable);
        };

        let signals = articles
            .into_iter()
            .filter_map(Self::to_signal)
            .filter(|s| s.created_at >= since)
            .collect();
        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let url = format!("{}/articles/{}", self.base_url, id);
        let article: Article = get_json(&self.client, "dev_to", self.request(url)).await?;
        Ok(Self::to_signal(article))
    }
}
