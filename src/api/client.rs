//! Control plane API client.
//!
//! # Responsibilities
//! - Issue resource reads and mutations over the retrying transport
//! - Map "not found" to an absent observation for convergence polling
//! - Issue short-lived object storage credentials
//!
//! # Design Decisions
//! - Mutations only send the request; waiting is the lifecycle layer's job
//! - Delete of an already-missing resource is success

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::types::{ApiError, ApiResult, Resource, ResourceKind, ResourceStatus};
use crate::config::{ApiConfig, RetryConfig};
use crate::credentials::StaticCredential;
use crate::http::{RetryingTransport, TransportError};
use crate::polling::Observation;

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Serialize)]
struct StaticKeyRequest {
    ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for the control plane's resource API.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    transport: RetryingTransport,
    base_url: String,
}

impl ControlPlaneClient {
    /// Create a client from configuration.
    pub fn new(config: &ApiConfig, retries: RetryConfig) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = config.resolved_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::Config(format!("invalid token format: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport(TransportError::Build(e)))?;

        let transport = RetryingTransport::new(client, retries, config.request_timeout());
        Ok(Self::with_transport(transport, &config.endpoint))
    }

    /// Create a client over an existing transport.
    pub fn with_transport(transport: RetryingTransport, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn transport(&self) -> &RetryingTransport {
        &self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn resource_path(kind: ResourceKind, id: &str) -> String {
        format!("/v1/{}/{}", kind.collection(), id)
    }

    /// Observe a resource's status; 404 means absent.
    pub async fn get(
        &self,
        kind: ResourceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> ApiResult<Observation<ResourceStatus>> {
        Ok(match self.get_resource(kind, id, cancel).await? {
            Some(resource) => Observation::Present(resource.status),
            None => Observation::Absent,
        })
    }

    /// Fetch a resource, `None` if it does not exist.
    pub async fn get_resource(
        &self,
        kind: ResourceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> ApiResult<Option<Resource>> {
        let builder = self
            .transport
            .request(Method::GET, self.url(&Self::resource_path(kind, id)));
        let response = self.transport.send(builder, cancel).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    /// List every resource of `kind`.
    pub async fn list(
        &self,
        kind: ResourceKind,
        cancel: &CancellationToken,
    ) -> ApiResult<Vec<Resource>> {
        let builder = self
            .transport
            .request(Method::GET, self.url(&format!("/v1/{}", kind.collection())));
        let response = self.transport.send(builder, cancel).await?;
        let list: ResourceList = Self::decode(response).await?;
        Ok(list.resources)
    }

    /// Request creation of a resource. Returns as soon as the API accepts it.
    pub async fn create(
        &self,
        kind: ResourceKind,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> ApiResult<Resource> {
        let builder = self
            .transport
            .request(Method::POST, self.url(&format!("/v1/{}", kind.collection())))
            .json(body);
        let response = self.transport.send(builder, cancel).await?;
        Self::decode(response).await
    }

    /// Request an update of a resource.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> ApiResult<Resource> {
        let builder = self
            .transport
            .request(Method::PATCH, self.url(&Self::resource_path(kind, id)))
            .json(body);
        let response = self.transport.send(builder, cancel).await?;
        Self::decode(response).await
    }

    /// Request deletion of a resource. A missing resource is not an error.
    pub async fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> ApiResult<()> {
        let builder = self
            .transport
            .request(Method::DELETE, self.url(&Self::resource_path(kind, id)));
        let response = self.transport.send(builder, cancel).await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }

    /// Issue a short-lived object storage access key.
    pub async fn issue_static_key(
        &self,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> ApiResult<StaticCredential> {
        let builder = self
            .transport
            .request(Method::POST, self.url("/v1/static-keys"))
            .json(&StaticKeyRequest {
                ttl_secs: ttl.as_secs(),
            });
        let response = self.transport.send(builder, cancel).await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        if response.status().is_success() {
            response.json().await.map_err(ApiError::Decode)
        } else {
            Err(Self::status_error(response).await)
        }
    }

    async fn status_error(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let message = response
            .json::<ApiErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        let message = if message.is_empty() {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unknown error")
                .to_string()
        } else {
            message
        };
        ApiError::Status { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::EndpointKind;

    #[test]
    fn test_url_building() {
        let mut config = ApiConfig::default();
        config.endpoint = "http://127.0.0.1:9000/".into();
        let client = ControlPlaneClient::new(&config, RetryConfig::default()).unwrap();

        let path = ControlPlaneClient::resource_path(
            ResourceKind::Endpoint(EndpointKind::Prometheus),
            "ep-7",
        );
        assert_eq!(
            client.url(&path),
            "http://127.0.0.1:9000/v1/endpoints/prometheus/ep-7"
        );
    }
}
