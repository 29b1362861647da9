//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) per logical request
//! - Keep the same ID across every retry attempt
//!
//! # Design Decisions
//! - A caller-provided `x-request-id` is preserved, not overwritten

use reqwest::header::HeaderValue;
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation ID for one logical outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ensure `request` carries a request ID and return it.
pub fn stamp(request: &mut reqwest::Request) -> RequestId {
    if let Some(existing) = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
    {
        return RequestId(existing.to_string());
    }

    let id = RequestId::new();
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        request.headers_mut().insert(X_REQUEST_ID, value);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_adds_header() {
        let mut request = reqwest::Client::new()
            .get("http://127.0.0.1/v1/things")
            .build()
            .unwrap();
        let id = stamp(&mut request);
        assert_eq!(
            request.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap(),
            id.as_str()
        );
    }

    #[test]
    fn test_stamp_keeps_existing() {
        let mut request = reqwest::Client::new()
            .get("http://127.0.0.1/v1/things")
            .header(X_REQUEST_ID, "req-42")
            .build()
            .unwrap();
        assert_eq!(stamp(&mut request).as_str(), "req-42");
    }
}
