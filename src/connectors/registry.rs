//! Client registry: tracks one [`PlatformClient`] per platform and quarantines
//! a client that declares itself unusable until the next warm start (spec
//! §4.1/§7 "UnusableSource").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::signal::Platform;

use super::trait_::PlatformClient;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no client registered for platform {0:?}")]
    NotRegistered(Platform),
    #[error("client for platform {0:?} is quarantined as unusable")]
    Quarantined(Platform),
}

/// Holds the live set of platform clients the pipeline fans out to. Built
/// once at startup from whatever credentials are present in `AppConfig`; a
/// platform with no client registered is simply skipped rather than treated
/// as an error. Quarantine state lives behind a `Mutex` so `sweep_unusable`
/// can run from the pipeline's `&self` fetch stage, not just at registration
/// time (spec §4.1/§7 "UnusableSource ... quarantines that platform until
/// next warm start").
#[derive(Default, Clone)]
pub struct ClientRegistry {
    clients: HashMap<Platform, Arc<dyn PlatformClient>>,
    quarantined: Arc<Mutex<HashMap<Platform, bool>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: Arc<dyn PlatformClient>) {
        let platform = client.platform();
        self.quarantined.lock().unwrap().insert(platform, false);
        self.clients.insert(platform, client);
    }

    /// Returns the client for `platform`, unless it has been quarantined
    /// this run.
    pub fn get(&self, platform: Platform) -> Result<Arc<dyn PlatformClient>, RegistryError> {
        if self.is_quarantined(platform) {
            return Err(RegistryError::Quarantined(platform));
        }
        self.clients
            .get(&platform)
            .cloned()
            .ok_or(RegistryError::NotRegistered(platform))
    }

    /// Marks `platform`'s client as unusable for the remainder of this
    /// process. Cleared only by restarting the pipeline (a "warm start").
    pub fn quarantine(&self, platform: Platform) {
        self.quarantined.lock().unwrap().insert(platform, true);
    }

    pub fn is_quarantined(&self, platform: Platform) -> bool {
        self.quarantined.lock().unwrap().get(&platform).copied().unwrap_or(false)
    }

    /// Re-checks every registered client's `is_unusable` flag and
    /// quarantines any that have tripped it, e.g. after a fetch cycle.
    pub fn sweep_unusable(&self) {
        let newly_unusable: Vec<Platform> = self
            .clients
            .iter()
            .filter(|(platform, client)| !self.is_quarantined(**platform) && client.is_unusable())
            .map(|(platform, _)| *platform)
            .collect();
        for platform in newly_unusable {
            self.quarantine(platform);
        }
    }

    /// All platforms with a registered, non-quarantined client.
    pub fn active_platforms(&self) -> Vec<Platform> {
        self.clients
            .keys()
            .copied()
            .filter(|p| !self.is_quarantined(*p))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use futures::stream::{self, BoxStream};

    use crate::error::ClientError;
    use crate::models::signal::Signal;

    use super::super::trait_::{FetchEvent, QuerySpec};
    use super::*;

    struct StubClient {
        platform: Platform,
        unusable: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PlatformClient for StubClient {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch_recent(&self, _query: QuerySpec, _since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
            Box::pin(stream::empty())
        }

        async fn fetch_by_id(&self, _id: &str) -> Result<Option<Signal>, ClientError> {
            Ok(None)
        }

        fn is_unusable(&self) -> bool {
            self.unusable.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[test]
    fn unregistered_platform_errs() {
        let registry = ClientRegistry::new();
        assert!(matches!(
            registry.get(Platform::Reddit),
            Err(RegistryError::NotRegistered(Platform::Reddit))
        ));
    }

    #[test]
    fn quarantined_client_is_unreachable_until_restart() {
        let mut registry = ClientRegistry::new();
        registry.register(Arc::new(StubClient {
            platform: Platform::Reddit,
            unusable: std::sync::atomic::AtomicBool::new(false),
        }));
        assert!(registry.get(Platform::Reddit).is_ok());

        registry.quarantine(Platform::Reddit);
        assert!(matches!(
            registry.get(Platform::Reddit),
            Err(RegistryError::Quarantined(Platform::Reddit))
        ));
        assert!(!registry.active_platforms().contains(&Platform::Reddit));
    }

    #[test]
    fn sweep_quarantines_clients_that_report_unusable() {
        let mut registry = ClientRegistry::new();
        registry.register(Arc::new(StubClient {
            platform: Platform::GitHub,
            unusable: std::sync::atomic::AtomicBool::new(true),
        }));
        registry.sweep_unusable();
        assert!(registry.is_quarantined(Platform::GitHub));
    }

    /// `pipeline::fetch_all` only ever sees a shared `&ClientRegistry`;
    /// `sweep_unusable` must be reachable from that context, not just
    /// through the `&mut self` building phase in `main::build_registry`.
    #[test]
    fn sweep_is_reachable_through_a_shared_reference() {
        let mut registry = ClientRegistry::new();
        registry.register(Arc::new(StubClient {
            platform: Platform::StackOverflow,
            unusable: std::sync::atomic::AtomicBool::new(true),
        }));

        let shared: &ClientRegistry = &registry;
        assert!(shared.active_platforms().contains(&Platform::StackOverflow));
        shared.sweep_unusable();
        assert!(!shared.active_platforms().contains(&Platform::StackOverflow));
    }
}
