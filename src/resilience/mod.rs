//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request (http::transport):
//!     → attempt raced against cancellation + per-attempt timeout
//!     → retries.rs (classify the outcome)
//!     → backoff.rs (delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Classification is pure; the loop lives in the transport
//! - Jittered backoff prevents thundering herd

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, retry_delay};
pub use retries::{
    classify, CancellationState, ResponseInfo, RetryDecision, TerminalError, TransportOutcome,
};
