//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the runtime.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the provider runtime.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Control plane API settings.
    pub api: ApiConfig,

    /// Transport retry configuration.
    pub retries: RetryConfig,

    /// Convergence polling settings.
    pub polling: PollingConfig,

    /// Object storage credential and endpoint settings.
    pub storage: StorageConfig,

    /// Bulk cleanup worker pool.
    pub cleanup: CleanupConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Control plane API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the control plane (e.g., "https://api.cloud.local").
    pub endpoint: String,

    /// Bearer token. `PROVIDER_API_TOKEN` takes precedence when set.
    pub token: Option<String>,

    /// Per-attempt request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cloud.local".to_string(),
            token: None,
            request_timeout_secs: 30,
        }
    }
}

/// Environment variable overriding `api.token`.
pub const API_TOKEN_ENV_VAR: &str = "PROVIDER_API_TOKEN";

impl ApiConfig {
    /// Resolve the bearer token, preferring the environment.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(API_TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retry configuration for the HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per request, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Convergence polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Fixed interval between state samples in milliseconds.
    pub interval_ms: u64,

    /// Default time budget for a single wait in seconds.
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            timeout_secs: 1_200,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Endpoint template; `{zone}` is substituted at client construction.
    pub endpoint_template: String,

    /// Zone used when the caller does not name one.
    pub default_zone: String,

    /// Requested lifetime of issued static keys in seconds.
    pub credential_ttl_secs: u64,

    /// Refresh this many seconds before a credential expires.
    pub refresh_margin_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint_template: "https://storage.{zone}.cloud.local".to_string(),
            default_zone: "ru-central1-a".to_string(),
            credential_ttl_secs: 900, // 15 minutes
            refresh_margin_secs: 180,
        }
    }
}

impl StorageConfig {
    pub fn credential_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_ttl_secs)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }
}

/// Bulk cleanup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Number of concurrent delete workers.
    pub workers: usize,

    /// Capacity of the candidate queue between producer and workers.
    pub queue_depth: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            queue_depth: 16,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for terminals, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
