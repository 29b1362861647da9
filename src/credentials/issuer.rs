//! Credential issuer backed by the control plane API.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ControlPlaneClient};
use crate::credentials::types::{CredentialError, CredentialIssuer, CredentialResult, StaticCredential};

/// Issues static keys through `POST /v1/static-keys`.
#[derive(Debug, Clone)]
pub struct HttpCredentialIssuer {
    api: ControlPlaneClient,
    cancel: CancellationToken,
}

impl HttpCredentialIssuer {
    /// `cancel` aborts an issuance in flight, typically the session's shutdown token.
    pub fn new(api: ControlPlaneClient, cancel: CancellationToken) -> Self {
        Self { api, cancel }
    }
}

#[async_trait]
impl CredentialIssuer for HttpCredentialIssuer {
    async fn issue(&self, ttl: Duration) -> CredentialResult<StaticCredential> {
        self.api
            .issue_static_key(ttl, &self.cancel)
            .await
            .map_err(|e| match e {
                ApiError::Decode(source) => CredentialError::Decode(source.to_string()),
                other => CredentialError::Issue(other.to_string()),
            })
    }
}
