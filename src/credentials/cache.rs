//! Expiring credential/client cache.
//!
//! # Responsibilities
//! - Lazily issue a short-lived credential and build a client from it
//! - Share one credential/client pair across all concurrent callers
//! - Replace the pair shortly before the credential expires
//!
//! # Design Decisions
//! - One async mutex held for the whole acquire: at most one issuance in flight
//! - The pair lives behind a single `Arc`, so readers never see it half-updated
//! - A failed issuance leaves the previous pair in place
//! - Zone only selects the endpoint; it never forces a new credential

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::credentials::types::{
    ClientFactory, CredentialIssuer, CredentialResult, StaticCredential,
};
use crate::observability::metrics;

/// A client together with the credential it was built from.
#[derive(Debug)]
pub struct CachedClient<C> {
    client: C,
    credential: StaticCredential,
    zone: String,
    generation: u64,
}

impl<C> CachedClient<C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn credential(&self) -> &StaticCredential {
        &self.credential
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Increases by one every time the pair is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Slot<C> {
    current: Option<Arc<CachedClient<C>>>,
    generation: u64,
}

impl<C> Slot<C> {
    fn install(&mut self, client: C, credential: StaticCredential, zone: &str) -> Arc<CachedClient<C>> {
        self.generation += 1;
        let pair = Arc::new(CachedClient {
            client,
            credential,
            zone: zone.to_string(),
            generation: self.generation,
        });
        self.current = Some(pair.clone());
        pair
    }
}

/// Singleton cache for one credential-bound client.
///
/// Construct one per provider session and share it by reference or `Arc`.
pub struct ExpiringResourceCache<F: ClientFactory> {
    issuer: Arc<dyn CredentialIssuer>,
    factory: F,
    ttl: Duration,
    refresh_margin: Duration,
    slot: Mutex<Slot<F::Client>>,
}

impl<F: ClientFactory> ExpiringResourceCache<F> {
    /// Create an empty cache. Nothing is issued until the first `acquire`.
    pub fn new(
        issuer: Arc<dyn CredentialIssuer>,
        factory: F,
        ttl: Duration,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            issuer,
            factory,
            ttl,
            refresh_margin,
            slot: Mutex::new(Slot {
                current: None,
                generation: 0,
            }),
        }
    }

    /// Return a ready client for `zone`, issuing or refreshing as needed.
    pub async fn acquire(&self, zone: &str) -> CredentialResult<Arc<CachedClient<F::Client>>> {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.current.clone() {
            if !current.credential.needs_refresh(Utc::now(), self.refresh_margin) {
                if current.zone == zone {
                    return Ok(current);
                }
                tracing::debug!(from = %current.zone, to = %zone, "Rebinding client to new zone");
                let client = self.factory.build(&current.credential, zone)?;
                return Ok(slot.install(client, current.credential.clone(), zone));
            }
            tracing::info!(
                access_key = %current.credential.access_key,
                expires_at = %current.credential.expires_at,
                "Credential nearing expiry, refreshing"
            );
        }

        let credential = match self.issuer.issue(self.ttl).await {
            Ok(credential) => credential,
            Err(e) => {
                metrics::record_credential_refresh(false);
                tracing::warn!(error = %e, "Credential issuance failed, keeping previous pair");
                return Err(e);
            }
        };
        metrics::record_credential_refresh(true);

        let client = self.factory.build(&credential, zone)?;
        let pair = slot.install(client, credential, zone);
        tracing::info!(
            access_key = %pair.credential.access_key,
            expires_at = %pair.credential.expires_at,
            generation = pair.generation,
            zone = %zone,
            "Credential issued"
        );
        Ok(pair)
    }

    /// The pair currently cached, without issuing or refreshing.
    pub async fn current(&self) -> Option<Arc<CachedClient<F::Client>>> {
        self.slot.lock().await.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::types::CredentialError;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Issues credentials expiring at scripted offsets from now.
    struct FakeIssuer {
        calls: AtomicU32,
        lifetimes: std::sync::Mutex<VecDeque<Option<TimeDelta>>>,
        delay: Duration,
    }

    impl FakeIssuer {
        fn new(lifetimes: Vec<Option<TimeDelta>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                lifetimes: std::sync::Mutex::new(lifetimes.into()),
                delay: Duration::from_millis(20),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialIssuer for FakeIssuer {
        async fn issue(&self, _ttl: Duration) -> CredentialResult<StaticCredential> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            let lifetime = self
                .lifetimes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Some(TimeDelta::minutes(15)));
            match lifetime {
                Some(lifetime) => Ok(StaticCredential::new(
                    format!("key-{n}"),
                    format!("secret-{n}"),
                    Utc::now() + lifetime,
                )),
                None => Err(CredentialError::Issue("quota exceeded".into())),
            }
        }
    }

    /// A "client" that just records what it was bound to.
    #[derive(Debug)]
    struct Bound {
        access_key: String,
        zone: String,
    }

    struct Factory;

    impl ClientFactory for Factory {
        type Client = Bound;

        fn build(&self, credential: &StaticCredential, zone: &str) -> CredentialResult<Bound> {
            Ok(Bound {
                access_key: credential.access_key.clone(),
                zone: zone.to_string(),
            })
        }
    }

    fn cache(issuer: Arc<FakeIssuer>) -> Arc<ExpiringResourceCache<Factory>> {
        Arc::new(ExpiringResourceCache::new(
            issuer,
            Factory,
            Duration::from_secs(900),
            Duration::from_secs(180),
        ))
    }

    async fn acquire_concurrently(
        cache: &Arc<ExpiringResourceCache<Factory>>,
        n: usize,
    ) -> Vec<Arc<CachedClient<Bound>>> {
        let mut handles = Vec::new();
        for _ in 0..n {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.acquire("zone-a").await.unwrap() }));
        }
        let mut pairs = Vec::new();
        for handle in handles {
            pairs.push(handle.await.unwrap());
        }
        pairs
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_acquire_issues_once() {
        let issuer = FakeIssuer::new(vec![]);
        let cache = cache(issuer.clone());

        let pairs = acquire_concurrently(&cache, 32).await;

        assert_eq!(issuer.calls(), 1);
        for pair in &pairs {
            assert!(Arc::ptr_eq(pair, &pairs[0]));
        }
        assert_eq!(pairs[0].generation(), 1);
    }

    #[tokio::test]
    async fn test_fresh_credential_is_reused() {
        let issuer = FakeIssuer::new(vec![]);
        let cache = cache(issuer.clone());

        let first = cache.acquire("zone-a").await.unwrap();
        let second = cache.acquire("zone-a").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_expiring_credential_refreshed_once_under_concurrency() {
        // First credential is already inside the 3 minute margin.
        let issuer = FakeIssuer::new(vec![Some(TimeDelta::minutes(2)), Some(TimeDelta::minutes(15))]);
        let cache = cache(issuer.clone());

        let stale = cache.acquire("zone-a").await.unwrap();
        assert_eq!(stale.generation(), 1);

        let pairs = acquire_concurrently(&cache, 32).await;

        assert_eq!(issuer.calls(), 2);
        for pair in &pairs {
            assert!(Arc::ptr_eq(pair, &pairs[0]));
            assert_eq!(pair.generation(), 2);
            assert_eq!(pair.client().access_key, pair.credential().access_key);
        }
        assert_eq!(pairs[0].credential().access_key, "key-2");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_pair() {
        let issuer = FakeIssuer::new(vec![Some(TimeDelta::minutes(1)), None, Some(TimeDelta::minutes(15))]);
        let cache = cache(issuer.clone());

        let first = cache.acquire("zone-a").await.unwrap();
        let err = cache.acquire("zone-a").await.unwrap_err();
        assert!(matches!(err, CredentialError::Issue(_)));

        let still = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &still));

        let recovered = cache.acquire("zone-a").await.unwrap();
        assert_eq!(recovered.credential().access_key, "key-3");
        assert_eq!(issuer.calls(), 3);
    }

    #[tokio::test]
    async fn test_zone_change_reuses_credential() {
        let issuer = FakeIssuer::new(vec![]);
        let cache = cache(issuer.clone());

        let a = cache.acquire("zone-a").await.unwrap();
        let b = cache.acquire("zone-b").await.unwrap();

        assert_eq!(issuer.calls(), 1);
        assert_eq!(b.client().zone, "zone-b");
        assert_eq!(a.credential(), b.credential());
        assert_eq!(b.generation(), 2);
    }
}
