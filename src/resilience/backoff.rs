//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Calculate exponential backoff delay with jitter, never exceeding `max_ms`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis((capped_delay + jitter).min(max_ms))
}

/// Delay before the attempt following `attempt`, honouring a server hint.
///
/// The hint wins when it is longer than the computed backoff; both are
/// capped by `max_delay_ms`.
pub fn retry_delay(attempt: u32, hint: Option<Duration>, config: &RetryConfig) -> Duration {
    let backoff = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
    let cap = Duration::from_millis(config.max_delay_ms);
    match hint {
        Some(hint) => hint.max(backoff).min(cap),
        None => backoff,
    }
}
