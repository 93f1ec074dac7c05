// ============================================
// WORLDSMITH - Backoff Schedule & Retry Decisions
// ============================================

use std::time::Duration;

use super::error::{ClassifiedError, ErrorKind};

/// Unknown failures get at most this many extra attempts, and never more
/// than the request's own retry budget.
pub const UNKNOWN_RETRY_LIMIT: u32 = 1;

/// Exponential backoff between attempts: `min(base * 2^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Ceiling for any single delay
    pub max_delay: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl BackoffSchedule {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Short delays for tests and local endpoints.
    pub fn quick() -> Self {
        Self {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        }
    }

    /// Wait before the attempt following `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Outcome of inspecting a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given duration, then try again
    Retry(Duration),
    /// Stop and surface the error as-is
    NoRetry,
}

/// Decide whether attempt `attempt` (0-based) of `max_retries + 1` gets a
/// successor.
pub fn decide(
    error: &ClassifiedError,
    attempt: u32,
    max_retries: u32,
    schedule: &BackoffSchedule,
) -> RetryDecision {
    if attempt >= max_retries {
        return RetryDecision::NoRetry;
    }

    let eligible = match error.kind() {
        ErrorKind::RateLimited
        | ErrorKind::ServerFault
        | ErrorKind::NetworkFault
        | ErrorKind::TimedOut => true,
        ErrorKind::Unknown => attempt < UNKNOWN_RETRY_LIMIT,
        ErrorKind::Unauthorized | ErrorKind::MalformedInput | ErrorKind::Cancelled => false,
    };

    if eligible {
        RetryDecision::Retry(schedule.delay_for_attempt(attempt))
    } else {
        RetryDecision::NoRetry
    }
}
