use std::sync::Arc;

use dcomp_model::Queue;

use crate::supervisor::ScanReport;

/// Why an admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Descriptor did not decode.
    InvalidFormat,
    /// Decoded, but not whitelisted or a sentinel that cannot be queued.
    NotAdmissible,
    /// Key already held by in-progress or a terminal queue.
    Held,
}

impl RejectReason {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RejectReason::InvalidFormat => "invalid_format",
            RejectReason::NotAdmissible => "not_admissible",
            RejectReason::Held => "held",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected into the queue store and shared with the
/// timeout supervisor.
pub trait QueueMetrics: Send + Sync + 'static {
    /// Record a committed move of one key between queues.
    ///
    /// Admission into todo is reported with `from == to == Queue::Todo`.
    fn record_transition(&self, from: Queue, to: Queue);
    /// Record a refused admission.
    fn record_rejected(&self, reason: RejectReason);
    /// Record a store call that failed or timed out.
    ///
    /// These are infrastructure failures, separate from task failures.
    fn record_store_error(&self, op: &'static str);
    /// Record the outcome of one supervisor pass.
    fn record_scan(&self, report: &ScanReport);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn QueueMetrics>;
