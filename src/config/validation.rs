//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, delays ordered, margins below TTL)
//! - Check endpoints and templates are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProviderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ProviderConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProviderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.endpoint",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api.endpoint", e.to_string())),
    }
    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::new("api.request_timeout_secs", "must be > 0"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be >= 1"));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            format!(
                "base delay {}ms exceeds max delay {}ms",
                retries.base_delay_ms, retries.max_delay_ms
            ),
        ));
    }

    if config.polling.interval_ms == 0 {
        errors.push(ValidationError::new("polling.interval_ms", "must be > 0"));
    }
    if config.polling.timeout_secs == 0 {
        errors.push(ValidationError::new("polling.timeout_secs", "must be > 0"));
    }

    let storage = &config.storage;
    if !storage.endpoint_template.contains("{zone}") {
        errors.push(ValidationError::new(
            "storage.endpoint_template",
            "must contain a {zone} placeholder",
        ));
    }
    if storage.default_zone.is_empty() {
        errors.push(ValidationError::new("storage.default_zone", "must not be empty"));
    }
    if storage.refresh_margin_secs >= storage.credential_ttl_secs {
        errors.push(ValidationError::new(
            "storage.refresh_margin_secs",
            format!(
                "margin {}s must be shorter than credential ttl {}s",
                storage.refresh_margin_secs, storage.credential_ttl_secs
            ),
        ));
    }

    if config.cleanup.workers == 0 {
        errors.push(ValidationError::new("cleanup.workers", "must be >= 1"));
    }
    if config.cleanup.queue_depth == 0 {
        errors.push(ValidationError::new("cleanup.queue_depth", "must be >= 1"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProviderConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProviderConfig::default();
        config.api.endpoint = "ftp://example.com".into();
        config.retries.max_attempts = 0;
        config.storage.refresh_margin_secs = 900;
        config.cleanup.workers = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "api.endpoint",
                "retries.max_attempts",
                "storage.refresh_margin_secs",
                "cleanup.workers"
            ]
        );
    }

    #[test]
    fn test_template_requires_zone() {
        let mut config = ProviderConfig::default();
        config.storage.endpoint_template = "https://storage.cloud.local".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "storage.endpoint_template");
    }
}
