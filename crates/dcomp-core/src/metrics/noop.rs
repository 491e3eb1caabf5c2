use dcomp_model::Queue;

use crate::metrics::backend::{QueueMetrics, RejectReason};
use crate::supervisor::ScanReport;

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl QueueMetrics for NoOpMetrics {
    #[inline(always)]
    fn record_transition(&self, _: Queue, _: Queue) {}

    #[inline(always)]
    fn record_rejected(&self, _: RejectReason) {}

    #[inline(always)]
    fn record_store_error(&self, _: &'static str) {}

    #[inline(always)]
    fn record_scan(&self, _: &ScanReport) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_is_zero_size() {
        assert_eq!(std::mem::size_of::<NoOpMetrics>(), 0);
    }

    #[test]
    fn noop_can_be_called_repeatedly() {
        let metrics = NoOpMetrics;
        let report = ScanReport::default();
        for _ in 0..1000 {
            metrics.record_transition(Queue::Todo, Queue::InProgress);
            metrics.record_rejected(RejectReason::Held);
            metrics.record_store_error("get_all");
            metrics.record_scan(&report);
        }
    }
}
