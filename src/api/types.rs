//! Resource kinds, statuses and API error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::http::TransportError;

/// Flavour of a transfer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Https,
    ObjectStorage,
    Prometheus,
}

/// Every resource kind the runtime manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Endpoint(EndpointKind),
    Transfer,
    Bucket,
}

impl ResourceKind {
    /// Collection path under `/v1/`.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Endpoint(EndpointKind::Https) => "endpoints/https",
            Self::Endpoint(EndpointKind::ObjectStorage) => "endpoints/object-storage",
            Self::Endpoint(EndpointKind::Prometheus) => "endpoints/prometheus",
            Self::Transfer => "transfers",
            Self::Bucket => "buckets",
        }
    }

    /// Short name used on the command line and as a metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Endpoint(EndpointKind::Https) => "https-endpoint",
            Self::Endpoint(EndpointKind::ObjectStorage) => "object-storage-endpoint",
            Self::Endpoint(EndpointKind::Prometheus) => "prometheus-endpoint",
            Self::Transfer => "transfer",
            Self::Bucket => "bucket",
        }
    }

    /// States a resource of this kind passes through after create/update.
    pub fn settling_states(&self) -> Vec<ResourceStatus> {
        match self {
            Self::Endpoint(_) => vec![ResourceStatus::Provisioning, ResourceStatus::Updating],
            Self::Transfer => vec![
                ResourceStatus::Provisioning,
                ResourceStatus::Starting,
                ResourceStatus::Updating,
            ],
            Self::Bucket => vec![ResourceStatus::Provisioning],
        }
    }

    /// States that count as "ready" for this kind.
    pub fn ready_states(&self) -> Vec<ResourceStatus> {
        match self {
            Self::Endpoint(_) | Self::Bucket => vec![ResourceStatus::Active],
            Self::Transfer => vec![ResourceStatus::Running, ResourceStatus::Stopped],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https-endpoint" => Ok(Self::Endpoint(EndpointKind::Https)),
            "object-storage-endpoint" | "s3-endpoint" => {
                Ok(Self::Endpoint(EndpointKind::ObjectStorage))
            }
            "prometheus-endpoint" => Ok(Self::Endpoint(EndpointKind::Prometheus)),
            "transfer" => Ok(Self::Transfer),
            "bucket" => Ok(Self::Bucket),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

/// Remote lifecycle status of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceStatus {
    Provisioning,
    Starting,
    Updating,
    Deleting,
    Active,
    Running,
    Stopped,
    Failed,
    Unknown(String),
}

impl From<String> for ResourceStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PROVISIONING" | "CREATING" => Self::Provisioning,
            "STARTING" => Self::Starting,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "ACTIVE" | "READY" => Self::Active,
            "RUNNING" => Self::Running,
            "STOPPED" => Self::Stopped,
            "FAILED" | "ERROR" => Self::Failed,
            _ => Self::Unknown(s),
        }
    }
}

impl From<ResourceStatus> for String {
    fn from(status: ResourceStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Provisioning => "PROVISIONING",
            Self::Starting => "STARTING",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Active => "ACTIVE",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Failed => "FAILED",
            Self::Unknown(other) => other,
        };
        f.write_str(s)
    }
}

/// A remote resource as returned by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ResourceStatus,
}

/// Errors from control plane calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode API response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid API configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled))
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
