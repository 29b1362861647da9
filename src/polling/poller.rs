//! Convergence polling.
//!
//! # Responsibilities
//! - Sample remote state until it reaches a target state or disappears
//! - Bound the wait with a deadline and honour cancellation
//! - Distinguish timeout, unexpected state, sampler failure and cancel
//!
//! # State Machine (per tick)
//! ```text
//! sample ─┬─ pending    → sleep(interval) → sample
//!         ├─ target     → Ok
//!         ├─ absent     → Ok if absent_is_success, else Err(Absent)
//!         ├─ unexpected → Err(UnexpectedState)
//!         └─ error      → Err(Sample)
//! deadline at any point → Err(Timeout)
//! cancel at any point   → Err(Cancelled)
//! ```
//!
//! # Design Decisions
//! - First sample is taken immediately
//! - A zero timeout still takes exactly one sample
//! - Sampler errors are not retried here; the transport already did
//! - Cancellation and the deadline also interrupt an in-flight sample

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::polling::types::{Converged, Observation, PollError, PollSample, PollTarget};

/// Repeatedly samples remote state at a fixed interval.
#[derive(Debug, Clone)]
pub struct ConvergencePoller {
    interval: Duration,
}

impl ConvergencePoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `target` is satisfied, it fails, or `cancel` fires.
    pub async fn wait_for<S, F, Fut>(
        &self,
        sample: F,
        target: &PollTarget<S>,
        cancel: &CancellationToken,
    ) -> Result<Converged<S>, PollError>
    where
        S: PartialEq + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = PollSample<S>>,
    {
        let result = self.poll(sample, target, cancel).await;
        match &result {
            Ok(converged) => {
                tracing::debug!(
                    observation = %converged.observation,
                    samples = converged.samples,
                    elapsed = ?converged.elapsed,
                    "Resource converged"
                );
                metrics::record_poll("converged", converged.elapsed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Convergence wait failed");
                metrics::record_poll(e.label(), e.elapsed());
            }
        }
        result
    }

    async fn poll<S, F, Fut>(
        &self,
        mut sample: F,
        target: &PollTarget<S>,
        cancel: &CancellationToken,
    ) -> Result<Converged<S>, PollError>
    where
        S: PartialEq + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = PollSample<S>>,
    {
        let started = Instant::now();
        let deadline = started + target.timeout;
        let mut last: Option<String> = None;
        let mut samples = 0u32;

        loop {
            samples += 1;
            let deadline_armed = samples > 1 || !target.timeout.is_zero();
            let sampled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(PollError::Cancelled { elapsed: started.elapsed() });
                }
                _ = sleep_until(deadline), if deadline_armed => {
                    return Err(PollError::Timeout { last, elapsed: started.elapsed() });
                }
                sampled = sample() => sampled,
            };

            let state = match sampled {
                Err(source) => {
                    return Err(PollError::Sample {
                        source,
                        elapsed: started.elapsed(),
                    })
                }
                Ok(Observation::Absent) if target.absent_is_success => {
                    return Ok(Converged {
                        observation: Observation::Absent,
                        samples,
                        elapsed: started.elapsed(),
                    })
                }
                Ok(Observation::Absent) => {
                    return Err(PollError::Absent {
                        last,
                        elapsed: started.elapsed(),
                    })
                }
                Ok(Observation::Present(state)) => state,
            };

            if target.is_target(&state) {
                return Ok(Converged {
                    observation: Observation::Present(state),
                    samples,
                    elapsed: started.elapsed(),
                });
            }
            if !target.is_pending(&state) {
                return Err(PollError::UnexpectedState {
                    state: state.to_string(),
                    elapsed: started.elapsed(),
                });
            }

            tracing::debug!(state = %state, samples = samples, "Resource still pending");
            last = Some(state.to_string());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(PollError::Cancelled { elapsed: started.elapsed() });
                }
                _ = sleep_until(deadline) => {
                    return Err(PollError::Timeout { last, elapsed: started.elapsed() });
                }
                _ = sleep(self.interval) => {}
            }
        }
    }
}
