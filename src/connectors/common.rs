//! Shared plumbing for the thin platform adapters: a single `reqwest`
//! client, JSON decoding with platform-tagged error mapping, and the
//! boxed-stream wrapping every adapter returns from `fetch_recent`.

use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::models::signal::Signal;

use super::trait_::FetchEvent;

pub fn http_client(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent.to_owned())
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Issues a GET request and decodes the JSON body, mapping transport and
/// decode failures onto [`ClientError::TransientFetch`] — a platform
/// returning malformed JSON is treated the same as a dropped connection,
/// since both are recoverable on the next poll.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    platform: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await.map_err(|err| ClientError::TransientFetch {
        platform: platform.to_owned(),
        attempts: 1,
        source: err.into(),
    })?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED
        || response.status() == reqwest::StatusCode::FORBIDDEN
    {
        return Err(ClientError::UnusableSource {
            platform: platform.to_owned(),
            reason: format!("authentication rejected with status {}", response.status()),
        });
    }

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::TransientFetch {
            platform: platform.to_owned(),
            attempts: 1,
            source: anyhow::anyhow!("unexpected status {status}"),
        });
    }

    response.json::<T>().await.map_err(|err| ClientError::TransientFetch {
        platform: platform.to_owned(),
        attempts: 1,
        source: err.into(),
    })
}

/// Wraps a batch of already-fetched signals into the boxed stream the
/// trait requires. Every adapter here resolves its fetch eagerly (one or a
/// handful of HTTP calls) rather than paginating lazily, since a single
/// poll cycle covers what the pipeline asks for.
pub fn signals_to_stream<'a>(signals: Vec<Signal>) -> BoxStream<'a, FetchEvent> {
    stream::iter(signals.into_iter().map(FetchEvent::Signal)).boxed()
}

/// Used when a call fails transiently: reports however many signals were
/// already collected before the failure, per the "never raises for
/// transient errors" contract.
pub fn partial_then<'a>(signals: Vec<Signal>, kind: super::trait_::PartialFetchKind) -> BoxStream<'a, FetchEvent> {
    let fetched = signals.len();
    stream::iter(signals.into_iter().map(FetchEvent::Signal))
        .chain(stream::once(async move { FetchEvent::PartialFetch { kind, fetched } }))
        .boxed()
}

/// `Some(client)` when credentials are configured, otherwise `None`: used
/// by adapters whose public endpoints are heavily rate-limited or absent
/// without auth, so they degrade to an `AuthFailed` partial fetch instead
/// of guessing at an unauthenticated request shape.
pub fn require_credentials<'a, 'b>(
    credentials: &'b Option<String>,
) -> Result<&'b str, BoxStream<'a, FetchEvent>> {
    match credentials.as_deref() {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(stream::once(async {
            FetchEvent::PartialFetch {
                kind: super::trait_::PartialFetchKind::AuthFailed,
                fetched: 0,
            }
        })
        .boxed()),
    }
}
