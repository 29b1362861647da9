//! Outbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Caller builds reqwest::Request
//!     → request.rs (stamp x-request-id, kept across attempts)
//!     → transport.rs (attempt, classify, back off, repeat)
//!     → final Response or TransportError
//! ```

pub mod request;
pub mod transport;

pub use request::{RequestId, X_REQUEST_ID};
pub use transport::{RetryingTransport, TransportError, TransportResult};
