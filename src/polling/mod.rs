//! State convergence subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle operation issues a mutation
//!     → builds a PollTarget (pending/target/absent rules, timeout)
//!     → poller.rs samples through a caller-supplied sampler
//!     → Converged or PollError
//! ```
//!
//! # Design Decisions
//! - One mechanism serves both "wait until ready" and "wait until gone"
//! - The sampler is opaque; the poller never knows about HTTP

pub mod poller;
pub mod types;

pub use poller::ConvergencePoller;
pub use types::{Converged, Observation, PollError, PollSample, PollTarget, SampleError};
