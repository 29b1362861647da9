//! Retry classification.
//!
//! # Responsibilities
//! - Decide, per transport attempt, whether the request should be retried
//! - Surface misconfiguration errors immediately instead of retrying them
//! - Carry server backoff hints (Retry-After) to the transport loop
//!
//! # Design Decisions
//! - Pure function of one attempt's outcome; the transport owns the loop
//! - Cancellation is never retried, a per-attempt deadline always is
//! - The whole error source chain is inspected, not just the outer error
//! - 501 is a permanent capability gap; every other 5xx is transient

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Error messages that signal a setup problem retries cannot fix.
const MISCONFIGURATION_MARKERS: &[&str] = &[
    "too many redirects",
    "unsupported protocol scheme",
    "url scheme is not allowed",
    "invalid header",
    "invalid http header",
    "certificate not trusted",
];

/// Error messages produced when TLS peer verification fails.
const TLS_VERIFICATION_MARKERS: &[&str] = &[
    "certificate verify failed",
    "invalid peer certificate",
    "unknownissuer",
];

/// How the attempt's governing context ended, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancellationState {
    #[default]
    None,
    Cancelled,
    DeadlineExceeded,
}

/// The parts of an HTTP response the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseInfo {
    /// Status code; 0 when the server sent no usable status.
    pub status: u16,
    /// Parsed `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl ResponseInfo {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Everything observed about one transport attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportOutcome<'a> {
    pub response: Option<ResponseInfo>,
    pub error: Option<&'a (dyn StdError + 'static)>,
    pub cancellation: CancellationState,
}

impl<'a> TransportOutcome<'a> {
    pub fn response(info: ResponseInfo) -> Self {
        Self {
            response: Some(info),
            ..Self::default()
        }
    }

    pub fn error(error: &'a (dyn StdError + 'static)) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn cancelled(cancellation: CancellationState) -> Self {
        Self {
            cancellation,
            ..Self::default()
        }
    }
}

/// A non-retryable failure identified by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalError {
    #[error("request cancelled")]
    Cancelled,

    #[error("transport misconfigured: {0}")]
    Misconfigured(String),
}

/// Outcome of classifying one attempt.
///
/// A retry never carries a terminal error; the optional `note` explains an
/// unexpected status for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry {
        after: Option<Duration>,
        note: Option<String>,
    },
    Stop {
        error: Option<TerminalError>,
    },
}

impl RetryDecision {
    fn retry() -> Self {
        Self::Retry {
            after: None,
            note: None,
        }
    }

    fn stop() -> Self {
        Self::Stop { error: None }
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    pub fn terminal_error(&self) -> Option<&TerminalError> {
        match self {
            Self::Stop { error } => error.as_ref(),
            Self::Retry { .. } => None,
        }
    }
}

/// Classify one transport attempt. First matching rule wins.
pub fn classify(outcome: &TransportOutcome<'_>) -> RetryDecision {
    match outcome.cancellation {
        CancellationState::Cancelled => {
            return RetryDecision::Stop {
                error: Some(TerminalError::Cancelled),
            }
        }
        CancellationState::DeadlineExceeded => return RetryDecision::retry(),
        CancellationState::None => {}
    }

    if let Some(error) = outcome.error {
        if let Some(message) = misconfiguration(error) {
            return RetryDecision::Stop {
                error: Some(TerminalError::Misconfigured(message)),
            };
        }
        return RetryDecision::retry();
    }

    let Some(response) = outcome.response else {
        return RetryDecision::stop();
    };

    match response.status {
        429 => RetryDecision::Retry {
            after: response.retry_after,
            note: None,
        },
        501 => RetryDecision::stop(),
        0 | 500..=599 => RetryDecision::Retry {
            after: if response.status == 503 {
                response.retry_after
            } else {
                None
            },
            note: Some(format!("unexpected HTTP status {}", response.status)),
        },
        _ => RetryDecision::stop(),
    }
}

/// Walk the source chain looking for a misconfiguration marker.
fn misconfiguration(error: &(dyn StdError + 'static)) -> Option<String> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        if MISCONFIGURATION_MARKERS
            .iter()
            .chain(TLS_VERIFICATION_MARKERS)
            .any(|marker| lowered.contains(marker))
        {
            return Some(message);
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct Plain(&'static str);

    #[derive(Debug, Error)]
    #[error("error sending request")]
    struct Wrapped(#[source] Plain);

    fn status(code: u16) -> RetryDecision {
        classify(&TransportOutcome::response(ResponseInfo::new(code)))
    }

    #[test]
    fn test_cancelled_never_retries() {
        let err = Plain("connection reset");
        let outcome = TransportOutcome {
            response: Some(ResponseInfo::new(503)),
            error: Some(&err),
            cancellation: CancellationState::Cancelled,
        };
        let decision = classify(&outcome);
        assert!(!decision.should_retry());
        assert_eq!(decision.terminal_error(), Some(&TerminalError::Cancelled));
    }

    #[test]
    fn test_deadline_is_transient() {
        let decision = classify(&TransportOutcome::cancelled(
            CancellationState::DeadlineExceeded,
        ));
        assert!(decision.should_retry());
        assert!(decision.terminal_error().is_none());
    }

    #[test]
    fn test_misconfiguration_short_circuits() {
        for message in [
            "stopped after 10 redirects: too many redirects",
            "unsupported protocol scheme \"gopher\"",
            "invalid header value",
            "x509: certificate not trusted",
            "invalid peer certificate: UnknownIssuer",
        ] {
            let err = Plain(message);
            let decision = classify(&TransportOutcome::error(&err));
            assert!(!decision.should_retry(), "{message}");
            assert!(matches!(
                decision.terminal_error(),
                Some(TerminalError::Misconfigured(m)) if m == message
            ));
        }
    }

    #[test]
    fn test_misconfiguration_found_in_source_chain() {
        let err = Wrapped(Plain("too many redirects"));
        let decision = classify(&TransportOutcome::error(&err));
        assert!(!decision.should_retry());
    }

    #[test]
    fn test_tls_failure_wins_over_response() {
        let err = Plain("invalid peer certificate: UnknownIssuer");
        let outcome = TransportOutcome {
            response: Some(ResponseInfo::new(429)),
            error: Some(&err),
            cancellation: CancellationState::None,
        };
        assert!(!classify(&outcome).should_retry());
    }

    #[test]
    fn test_other_errors_retry() {
        let err = Wrapped(Plain("connection refused"));
        assert!(classify(&TransportOutcome::error(&err)).should_retry());
    }

    #[test]
    fn test_rate_limit_retries_with_hint() {
        assert!(status(429).should_retry());

        let info = ResponseInfo::new(429).with_retry_after(Some(Duration::from_secs(3)));
        assert_eq!(
            classify(&TransportOutcome::response(info)),
            RetryDecision::Retry {
                after: Some(Duration::from_secs(3)),
                note: None
            }
        );
    }

    #[test]
    fn test_server_errors() {
        for code in 500..=599 {
            let decision = status(code);
            if code == 501 {
                assert_eq!(decision, RetryDecision::Stop { error: None });
            } else {
                assert!(decision.should_retry(), "{code}");
                assert!(decision.terminal_error().is_none());
            }
        }
    }

    #[test]
    fn test_missing_status_retries_with_note() {
        match status(0) {
            RetryDecision::Retry { note, .. } => {
                assert_eq!(note.as_deref(), Some("unexpected HTTP status 0"))
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn test_success_and_client_errors_stop() {
        for code in [200, 201, 204, 400, 401, 403, 404, 409] {
            assert_eq!(status(code), RetryDecision::Stop { error: None });
        }
    }
}
