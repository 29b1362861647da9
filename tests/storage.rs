//! Credential-bound object storage clients against a mock backend.

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use provider_runtime::credentials::{CredentialError, ExpiringResourceCache, HttpCredentialIssuer};
use provider_runtime::storage::ObjectStorageClientFactory;

mod common;
use common::{api_client, fast_retries, start_programmable_backend, MockResponse};

#[tokio::test]
async fn test_issued_key_is_shared_and_sent_to_storage() {
    let issued = Arc::new(AtomicU32::new(0));
    let i = issued.clone();
    let addr = start_programmable_backend(move |req| {
        let response = match (req.method.as_str(), req.path.as_str()) {
            ("POST", "/v1/static-keys") => {
                assert!(req.body.contains("\"ttl_secs\":900"));
                let n = i.fetch_add(1, Ordering::SeqCst) + 1;
                MockResponse::json(
                    200,
                    json!({
                        "access_key": format!("ak-{n}"),
                        "secret": "sk",
                        "expires_at": "2099-01-01T00:00:00Z",
                    }),
                )
            }
            ("HEAD", "/zone-a/logs") if req.header("x-access-key") == Some("ak-1") => {
                MockResponse::status(200)
            }
            ("HEAD", _) => MockResponse::status(404),
            ("DELETE", "/zone-a/logs/2024%2F01.gz") => MockResponse::status(204),
            _ => MockResponse::status(400),
        };
        async move { response }
    })
    .await;

    let cancel = CancellationToken::new();
    let api = api_client(addr, fast_retries(3));
    let factory = ObjectStorageClientFactory::new(
        format!("http://{}/{{zone}}", addr),
        api.transport().clone(),
    );
    let cache = Arc::new(ExpiringResourceCache::new(
        Arc::new(HttpCredentialIssuer::new(api, cancel.clone())),
        factory,
        Duration::from_secs(900),
        Duration::from_secs(180),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.acquire("zone-a").await.unwrap() }));
    }
    for handle in handles {
        let pair = handle.await.unwrap();
        assert_eq!(pair.credential().access_key, "ak-1");
    }
    assert_eq!(issued.load(Ordering::SeqCst), 1);

    let pair = cache.acquire("zone-a").await.unwrap();
    assert!(pair.client().head_bucket("logs", &cancel).await.unwrap());
    assert!(!pair.client().head_bucket("missing", &cancel).await.unwrap());
    pair.client()
        .delete_object("logs", "2024/01.gz", &cancel)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_issuance_failure_surfaces_as_credential_error() {
    let addr = start_programmable_backend(|_| async {
        MockResponse::json(400, json!({"message": "quota exceeded"}))
    })
    .await;

    let cancel = CancellationToken::new();
    let api = api_client(addr, fast_retries(1));
    let factory = ObjectStorageClientFactory::new(
        format!("http://{}/{{zone}}", addr),
        api.transport().clone(),
    );
    let cache = ExpiringResourceCache::new(
        Arc::new(HttpCredentialIssuer::new(api, cancel)),
        factory,
        Duration::from_secs(900),
        Duration::from_secs(180),
    );

    let err = cache.acquire("zone-a").await.unwrap_err();
    match err {
        CredentialError::Issue(message) => assert!(message.contains("quota exceeded")),
        other => panic!("expected issue error, got {other:?}"),
    }
    assert!(cache.current().await.is_none());
}
