//! Poll targets, observations and errors.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// What one sample saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<S> {
    /// The resource exists and reports this state.
    Present(S),
    /// The resource no longer exists.
    Absent,
}

/// Error raised by a sampler. The poller propagates it untouched.
pub type SampleError = Box<dyn std::error::Error + Send + Sync>;

/// Result of calling a sampler once.
pub type PollSample<S> = Result<Observation<S>, SampleError>;

/// What a wait is waiting for. Immutable for the duration of one poll.
#[derive(Debug, Clone)]
pub struct PollTarget<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub absent_is_success: bool,
    pub timeout: Duration,
}

impl<S: PartialEq> PollTarget<S> {
    pub fn new(pending: Vec<S>, target: Vec<S>, absent_is_success: bool, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            absent_is_success,
            timeout,
        }
    }

    /// Wait for a created or updated resource to reach one of `target`.
    pub fn until_ready(pending: Vec<S>, target: Vec<S>, timeout: Duration) -> Self {
        Self::new(pending, target, false, timeout)
    }

    /// Wait for a deleted resource to disappear.
    pub fn until_gone(pending: Vec<S>, timeout: Duration) -> Self {
        Self::new(pending, Vec::new(), true, timeout)
    }

    pub(crate) fn is_target(&self, state: &S) -> bool {
        self.target.contains(state)
    }

    pub(crate) fn is_pending(&self, state: &S) -> bool {
        self.pending.contains(state)
    }
}

/// Successful end of a wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged<S> {
    /// The observation that ended the wait.
    pub observation: Observation<S>,
    /// Number of samples taken, including the final one.
    pub samples: u32,
    pub elapsed: Duration,
}

/// Why a wait failed.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("timed out after {elapsed:?} waiting for convergence (last observed state: {})", describe(.last))]
    Timeout {
        last: Option<String>,
        elapsed: Duration,
    },

    #[error("resource entered unexpected state '{state}' after {elapsed:?}")]
    UnexpectedState { state: String, elapsed: Duration },

    #[error("resource disappeared after {elapsed:?} (last observed state: {})", describe(.last))]
    Absent {
        last: Option<String>,
        elapsed: Duration,
    },

    #[error("sampling resource state failed after {elapsed:?}: {source}")]
    Sample {
        #[source]
        source: SampleError,
        elapsed: Duration,
    },

    #[error("wait cancelled after {elapsed:?}")]
    Cancelled { elapsed: Duration },
}

fn describe(last: &Option<String>) -> &str {
    last.as_deref().unwrap_or("none")
}

impl PollError {
    /// Time spent polling before the failure.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Timeout { elapsed, .. }
            | Self::UnexpectedState { elapsed, .. }
            | Self::Absent { elapsed, .. }
            | Self::Sample { elapsed, .. }
            | Self::Cancelled { elapsed } => *elapsed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::UnexpectedState { .. } => "unexpected",
            Self::Absent { .. } => "absent",
            Self::Sample { .. } => "sample_error",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl<S: fmt::Display> fmt::Display for Observation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(state) => write!(f, "{state}"),
            Self::Absent => f.write_str("absent"),
        }
    }
}
