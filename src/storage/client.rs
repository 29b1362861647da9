//! Object storage client bound to one static credential and zone.
//!
//! # Responsibilities
//! - Address buckets and objects under a zone's storage endpoint
//! - Attach the access key and secret to every request
//!
//! # Design Decisions
//! - Requests go through the shared retrying transport
//! - The factory only binds; it never talks to the network

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::credentials::{ClientFactory, CredentialError, CredentialResult, StaticCredential};
use crate::http::{RetryingTransport, TransportError};

/// Header carrying the access key id.
pub const X_ACCESS_KEY: &str = "x-access-key";

/// Placeholder replaced by the zone in the endpoint template.
pub const ZONE_PLACEHOLDER: &str = "{zone}";

/// Errors from object storage calls.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("storage returned {status} for {target}")]
    Status { status: u16, target: String },

    #[error("invalid storage request: {0}")]
    Invalid(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage client for a single zone.
pub struct ObjectStorageClient {
    endpoint: Url,
    access_key: String,
    secret: String,
    transport: RetryingTransport,
}

impl std::fmt::Debug for ObjectStorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

impl ObjectStorageClient {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    fn object_url(&self, segments: &[&str]) -> StorageResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::Invalid(format!("endpoint '{}' cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn signed(&self, method: Method, url: Url) -> StorageResult<RequestBuilder> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.secret))
            .map_err(|e| StorageError::Invalid(format!("secret is not a valid header: {}", e)))?;
        bearer.set_sensitive(true);
        Ok(self
            .transport
            .request(method, url)
            .header(X_ACCESS_KEY, self.access_key.as_str())
            .header(AUTHORIZATION, bearer))
    }

    /// Whether `bucket` exists and is reachable with this credential.
    pub async fn head_bucket(&self, bucket: &str, cancel: &CancellationToken) -> StorageResult<bool> {
        let url = self.object_url(&[bucket])?;
        let response = self
            .transport
            .send(self.signed(Method::HEAD, url)?, cancel)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StorageError::Status {
                status: status.as_u16(),
                target: bucket.to_string(),
            }),
        }
    }

    /// Delete one object. A missing object is not an error.
    pub async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        let url = self.object_url(&[bucket, key])?;
        let response = self
            .transport
            .send(self.signed(Method::DELETE, url)?, cancel)
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            tracing::debug!(bucket = %bucket, key = %key, status = %status, "Object deleted");
            Ok(())
        } else {
            Err(StorageError::Status {
                status: status.as_u16(),
                target: format!("{}/{}", bucket, key),
            })
        }
    }
}

/// Builds [`ObjectStorageClient`]s from an endpoint template such as
/// `https://storage.{zone}.cloud.local`.
#[derive(Debug, Clone)]
pub struct ObjectStorageClientFactory {
    template: String,
    transport: RetryingTransport,
}

impl ObjectStorageClientFactory {
    pub fn new(template: impl Into<String>, transport: RetryingTransport) -> Self {
        Self {
            template: template.into(),
            transport,
        }
    }

    /// Resolve the endpoint for `zone`.
    pub fn endpoint_for(&self, zone: &str) -> Result<Url, String> {
        if zone.is_empty() {
            return Err("zone is empty".to_string());
        }
        let raw = self.template.replace(ZONE_PLACEHOLDER, zone);
        Url::parse(&raw).map_err(|e| format!("invalid endpoint '{}': {}", raw, e))
    }
}

impl ClientFactory for ObjectStorageClientFactory {
    type Client = ObjectStorageClient;

    fn build(&self, credential: &StaticCredential, zone: &str) -> CredentialResult<ObjectStorageClient> {
        let endpoint = self
            .endpoint_for(zone)
            .map_err(|reason| CredentialError::ClientBuild {
                zone: zone.to_string(),
                reason,
            })?;

        Ok(ObjectStorageClient {
            endpoint,
            access_key: credential.access_key.clone(),
            secret: credential.secret().to_string(),
            transport: self.transport.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use chrono::Utc;
    use std::time::Duration;

    fn factory(template: &str) -> ObjectStorageClientFactory {
        let transport = RetryingTransport::new(
            reqwest::Client::new(),
            RetryConfig::default(),
            Duration::from_secs(1),
        );
        ObjectStorageClientFactory::new(template, transport)
    }

    fn credential() -> StaticCredential {
        StaticCredential::new("ak-1", "sk-1", Utc::now())
    }

    #[test]
    fn test_build_substitutes_zone() {
        let client = factory("https://storage.{zone}.cloud.local")
            .build(&credential(), "ru-central1-b")
            .unwrap();
        assert_eq!(client.endpoint().host_str(), Some("storage.ru-central1-b.cloud.local"));
        assert_eq!(client.access_key(), "ak-1");
    }

    #[test]
    fn test_build_rejects_bad_zone() {
        let err = factory("https://storage.{zone}.cloud.local")
            .build(&credential(), "")
            .unwrap_err();
        assert!(matches!(err, CredentialError::ClientBuild { .. }));

        let err = factory("{zone}")
            .build(&credential(), "zone-a")
            .unwrap_err();
        assert!(matches!(err, CredentialError::ClientBuild { .. }));
    }

    #[test]
    fn test_object_url_escapes_key() {
        let client = factory("http://127.0.0.1:9000/{zone}/")
            .build(&credential(), "z1")
            .unwrap();
        let url = client.object_url(&["logs", "2024/01 01.gz"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/z1/logs/2024%2F01%2001.gz");
    }
}
