//! Retrying HTTP transport.
//!
//! # Responsibilities
//! - Execute one logical request as up to `max_attempts` HTTP attempts
//! - Race every attempt against cancellation and a per-attempt timeout
//! - Classify each attempt and back off between retryable ones
//!
//! # Design Decisions
//! - Retries stay inside this layer; callers see a final response or error
//! - Non-retryable responses (including 4xx) are returned, not converted
//! - Bodies that cannot be replayed get exactly one attempt
//! - Cancellation interrupts both the attempt and the backoff sleep

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::http::request;
use crate::observability::metrics;
use crate::resilience::{
    classify, retry_delay, CancellationState, ResponseInfo, RetryDecision, TerminalError,
    TransportOutcome,
};

/// Errors surfaced by the transport after its own retries.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("transport misconfigured: {message}")]
    Misconfigured {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("giving up after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("failed to build request: {0}")]
    Build(#[from] reqwest::Error),

    #[error("request body cannot be replayed")]
    NotReplayable,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

enum Attempt {
    Cancelled,
    TimedOut,
    Failed(reqwest::Error),
    Responded(Response),
}

/// HTTP client whose retry behaviour is governed by the retry classifier.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    client: Client,
    retries: RetryConfig,
    attempt_timeout: Duration,
}

impl RetryingTransport {
    /// Create a transport over `client`.
    pub fn new(client: Client, retries: RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            client,
            retries,
            attempt_timeout,
        }
    }

    /// Start building a request with the underlying client.
    pub fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client.request(method, url)
    }

    pub fn retries(&self) -> &RetryConfig {
        &self.retries
    }

    /// Build and execute a request.
    pub async fn send(
        &self,
        builder: RequestBuilder,
        cancel: &CancellationToken,
    ) -> TransportResult<Response> {
        self.execute(builder.build()?, cancel).await
    }

    /// Execute `request`, retrying transient failures.
    pub async fn execute(
        &self,
        mut request: Request,
        cancel: &CancellationToken,
    ) -> TransportResult<Response> {
        let request_id = request::stamp(&mut request);
        let method = request.method().clone();
        let url = request.url().clone();

        let max_attempts = if request.try_clone().is_some() {
            self.retries.max_attempts.max(1)
        } else {
            1
        };
        let mut template = Some(request);

        let mut last = String::new();
        for attempt in 1..=max_attempts {
            let current = if attempt == max_attempts {
                template.take()
            } else {
                template.as_ref().and_then(Request::try_clone)
            }
            .ok_or(TransportError::NotReplayable)?;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Attempt::Cancelled,
                res = tokio::time::timeout(self.attempt_timeout, self.client.execute(current)) => {
                    match res {
                        Err(_) => Attempt::TimedOut,
                        Ok(Err(e)) => Attempt::Failed(e),
                        Ok(Ok(response)) => Attempt::Responded(response),
                    }
                }
            };

            let (decision, response) = match result {
                Attempt::Cancelled => {
                    metrics::record_attempt("cancelled");
                    let outcome = TransportOutcome::cancelled(CancellationState::Cancelled);
                    (classify(&outcome), None)
                }
                Attempt::TimedOut => {
                    metrics::record_attempt("timeout");
                    last = format!("attempt timed out after {:?}", self.attempt_timeout);
                    let outcome = TransportOutcome::cancelled(CancellationState::DeadlineExceeded);
                    (classify(&outcome), None)
                }
                Attempt::Failed(e) => {
                    metrics::record_attempt("error");
                    let decision = classify(&TransportOutcome::error(&e));
                    if let Some(TerminalError::Misconfigured(message)) = decision.terminal_error() {
                        tracing::error!(
                            request_id = %request_id,
                            method = %method,
                            url = %url,
                            error = %e,
                            "Transport misconfigured, not retrying"
                        );
                        return Err(TransportError::Misconfigured {
                            message: message.clone(),
                            source: e,
                        });
                    }
                    last = error_chain(&e);
                    (decision, None)
                }
                Attempt::Responded(response) => {
                    metrics::record_attempt("response");
                    let info = ResponseInfo::new(response.status().as_u16())
                        .with_retry_after(parse_retry_after(response.headers()));
                    let decision = classify(&TransportOutcome::response(info));
                    last = format!("HTTP status {}", info.status);
                    (decision, Some(response))
                }
            };

            match decision {
                RetryDecision::Stop {
                    error: Some(TerminalError::Cancelled),
                } => return Err(TransportError::Cancelled),
                RetryDecision::Stop { .. } => {
                    return match response {
                        Some(response) => Ok(response),
                        None => Err(TransportError::RetriesExhausted {
                            attempts: attempt,
                            last,
                        }),
                    };
                }
                RetryDecision::Retry { after, note } => {
                    if attempt == max_attempts {
                        break;
                    }
                    let delay = retry_delay(attempt, after, &self.retries);
                    metrics::record_retry();
                    tracing::info!(
                        request_id = %request_id,
                        method = %method,
                        url = %url,
                        attempt = attempt,
                        delay = ?delay,
                        reason = note.as_deref().unwrap_or(last.as_str()),
                        "Retrying request"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::warn!(
            request_id = %request_id,
            method = %method,
            url = %url,
            attempts = max_attempts,
            last = %last,
            "Retries exhausted"
        );
        Err(TransportError::RetriesExhausted {
            attempts: max_attempts,
            last,
        })
    }
}

/// Render an error with its sources, outermost first.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}

/// Parse `Retry-After` as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
