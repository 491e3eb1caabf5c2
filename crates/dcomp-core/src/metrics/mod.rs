//! Metrics collection abstraction for queue transitions.
//!
//! Backends (prometheus, statsd, etc) implement [`QueueMetrics`] and are injected
//! into [`crate::TaskQueueStore`] with `with_metrics`.
mod backend;
pub use backend::{MetricsHandle, QueueMetrics, RejectReason};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
