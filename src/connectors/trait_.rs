//! Platform Client capability trait (C1).
//!
//! A platform client is a capability, not an implementation: the core never
//! prescribes HTTP details, only the contract in spec §4.1. Each adapter
//! owns its own authentication, rate-limit backoff, and graceful fallback to
//! unauthenticated public endpoints when credentials are absent.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::{Cancelled, ClientError};
use crate::models::signal::{Platform, Signal};

/// What a fetch is looking for. `terms` are OR-matched; `communities` are
/// platform-specific channel/subreddit/tag identifiers.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub terms: HashSet<String>,
    pub communities: Vec<String>,
    pub min_engagement: Option<u64>,
    pub limit: usize,
}

impl QuerySpec {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn with_terms(mut self, terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_communities(mut self, communities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.communities = communities.into_iter().map(Into::into).collect();
        self
    }
}

/// The reason an in-flight fetch stopped short of `limit`, without being a
/// fault: rate limiting, an upstream outage, a failed auth refresh, or a
/// timeout. Never fatal to the pipeline by itself (§4.1, §7 `TransientFetch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialFetchKind {
    RateLimited,
    UpstreamUnavailable,
    AuthFailed,
    Timeout,
}

/// One item yielded by a [`PlatformClient::fetch_recent`] stream: either a
/// successfully fetched signal, or a terminal marker describing why the
/// stream ended early. Streams never end with an `Err` for transient causes
/// — `fetch_recent` "never raises for transient errors" (spec §4.1).
#[derive(Debug)]
pub enum FetchEvent {
    Signal(Signal),
    PartialFetch {
        kind: PartialFetchKind,
        fetched: usize,
    },
}

/// Per-platform adapter configuration (spec §6 "Platform Client adapter
/// contract").
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    pub credentials: Option<String>,
    pub base_url_override: Option<String>,
    pub user_agent: String,
    pub rate_limit_per_minute: u32,
}

/// Capability contract for one external source (C1). Implementations are
/// thin: auth, backoff, and response parsing live here; quality, semantic,
/// and pain-point analysis happen downstream.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Lazily fetches recent posts/comments matching `query`, starting no
    /// earlier than `since`. Cancellation-aware: callers may drop the
    /// stream at any time and the client must release resources.
    async fn fetch_recent(
        &self,
        query: QuerySpec,
        since: DateTime<Utc>,
    ) -> BoxStream<'_, FetchEvent>;

    /// Fetches a single signal by its platform-native id, if it still
    /// exists.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError>;

    /// Returns `true` once this client has hit a persistent
    /// misconfiguration (e.g. bad credentials after warmup) and should be
    /// quarantined by the registry until the next warm start.
    fn is_unusable(&self) -> bool {
        false
    }
}

/// Convenience helper shared by adapters: collapse a `Cancelled` observed
/// mid-fetch into a `PartialFetch` event rather than letting it escape the
/// stream, matching "never raises for transient errors".
pub fn cancelled_as_partial(fetched: usize) -> FetchEvent {
    let _ = Cancelled;
    FetchEvent::PartialFetch {
        kind: PartialFetchKind::Timeout,
        fetched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_spec_builders_populate_terms_and_communities() {
        let query = QuerySpec::new(50)
            .with_terms(["saas", "pricing"])
            .with_communities(["r/SaaS", "r/startups"]);

        assert_eq!(query.limit, 50);
        assert!(query.terms.contains("saas"));
        assert_eq!(query.communities.len(), 2);
    }
}
