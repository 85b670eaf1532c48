//! Reddit adapter: reads subreddit listings via the public `.json` endpoint,
//! attaching a bearer token when one is configured and otherwise falling
//! back to the unauthenticated listing (subject to Reddit's stricter
//! anonymous rate limit).

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::signal::{Engagement, Platform, Signal};

use super::common::{get_json, http_client, partial_then, signals_to_stream};
use super::trait_::{AdapterConfig, FetchEvent, PartialFetchKind, PlatformClient, QuerySpec};

const BASE_URL: &str = "https://oauth.reddit.com";
const PUBLIC_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    author: String,
    created_utc: f64,
    ups: Option<u64>,
    num_comments: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    permalink: String,
}

pub struct RedditClient {
    client: reqwest::Client,
    credentials: Option<String>,
    base_url: String,
}

impl RedditClient {
    pub fn new(config: AdapterConfig) -> Self {
        let user_agent = if config.user_agent.is_empty() {
            "luciq-intelligence-pipeline/0.1 (by /u/luciq-bot)".to_owned()
        } else {
            config.user_agent
        };
        let base_url = config.base_url_override.unwrap_or_else(|| {
            if config.credentials.is_some() {
                BASE_URL.to_owned()
            } else {
                PUBLIC_BASE_URL.to_owned()
            }
        });
        Self {
            client: http_client(&user_agent),
            credentials: config.credentials,
            base_url,
        }
    }

    fn to_signal(post: RedditPost) -> Option<Signal> {
        let created_at = Utc.timestamp_opt(post.created_utc as i64, 0).single()?;
        Signal::new(
            Uuid::new_v4(),
            Platform::Reddit,
            post.author,
            created_at,
            Utc::now(),
            post.title,
            post.selftext,
            Engagement {
                upvotes: post.ups,
                comments: post.num_comments,
                views: None,
            },
            post.url.or_else(|| Some(format!("https://reddit.com{}", post.permalink))),
        )
        .ok()
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(token) = &self.credentials {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl PlatformClient for RedditClient {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn fetch_recent(&self, query: QuerySpec, since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        let communities = if query.communities.is_empty() {
            vec!["all".to_owned()]
        } else {
            query.communities.clone()
        };

        let mut signals = Vec::new();
        for community in communities {
            let url = format!(
                "{}/r/{}/new.json?limit={}",
                self.base_url,
                community,
                query.limit.clamp(1, 100)
            );
            let listing: Result<Listing, ClientError> = get_json(&self.client, "reddit", self.request(url)).await;
            let Ok(listing) = listing else {
                return partial_then(signals, PartialFetchKind::RateLimited);
            };
            for child in listing.data.children {
                let post = child.data;
                if let Some(min) = query.min_engagement {
                    if post.ups.unwrap_or(0) < min {
                        continue;
                    }
                }
                if let Some(signal) = Self::to_signal(post) {
                    if signal.created_at >= since {
                        signals.push(signal);
                    }
                }
            }
        }

        signals.truncate(query.limit.max(1));
        signals_to_stream(signals)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        let url = format!("{}/by_id/t3_{}.json", self.base_url, id);
        let listing: Listing = get_json(&self.client, "reddit", self.request(url)).await?;
        Ok(listing.data.children.into_iter().next().and_then(|c| Self::to_signal(c.data)))
    }
}
