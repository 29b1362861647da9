//! Credential types, collaborator traits and error definitions.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// A short-lived access key pair.
///
/// The secret is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StaticCredential {
    pub access_key: String,
    secret: String,
    pub expires_at: DateTime<Utc>,
}

impl StaticCredential {
    pub fn new(
        access_key: impl Into<String>,
        secret: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// True once `now` is within `margin` of expiry (or past it).
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let refresh_at = TimeDelta::from_std(margin)
            .ok()
            .and_then(|margin| self.expires_at.checked_sub_signed(margin));
        match refresh_at {
            Some(refresh_at) => now >= refresh_at,
            None => true,
        }
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredential")
            .field("access_key", &self.access_key)
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Errors that can occur while obtaining a credential-bound client.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The issuer refused or failed to create a credential.
    #[error("credential issuance failed: {0}")]
    Issue(String),

    /// The issuer's response could not be understood.
    #[error("credential response malformed: {0}")]
    Decode(String),

    /// A client could not be constructed from a valid credential.
    #[error("failed to build client for zone '{zone}': {reason}")]
    ClientBuild { zone: String, reason: String },
}

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Issues short-lived credentials.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self, ttl: Duration) -> CredentialResult<StaticCredential>;
}

/// Builds a client bound to a credential and a zone.
pub trait ClientFactory: Send + Sync {
    type Client: Send + Sync;

    fn build(&self, credential: &StaticCredential, zone: &str) -> CredentialResult<Self::Client>;
}
