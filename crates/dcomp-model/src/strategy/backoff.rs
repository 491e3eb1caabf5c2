use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff between retries of a transient infrastructure error.
///
/// The base delay for attempt `n` (zero-based) is `first_ms * factor^n`,
/// capped at `max_ms`; the jitter strategy is applied on top by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffStrategy {
    pub jitter: super::JitterStrategy,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl BackoffStrategy {
    /// Base delay before retry number `attempt` (zero-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.first_ms as f64 * self.factor.max(1.0).powi(exp);
        let capped = if raw.is_finite() {
            raw.min(self.max_ms as f64)
        } else {
            self.max_ms as f64
        };
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            jitter: super::JitterStrategy::Equal,
            first_ms: 100,
            max_ms: 2_000,
            factor: 2.0,
        }
    }
}
