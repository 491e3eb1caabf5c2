use std::sync::Arc;

use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder, proto::MetricFamily};

use dcomp_core::{
    ScanReport,
    metrics::{QueueMetrics, RejectReason},
};
use dcomp_model::Queue;

const NAMESPACE: &str = "dcomp";

/// Prometheus implementation of [`QueueMetrics`].
///
/// Label values are bounded: queue labels, reject reasons and store operation
/// names are all fixed sets.
#[derive(Clone)]
pub struct PrometheusMetrics {
    transitions: CounterVec,
    rejected: CounterVec,
    store_errors: CounterVec,
    expired: Counter,
    scans: Counter,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Register the queue metrics in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let transitions = CounterVec::new(
            Opts::new("transitions_total", "Committed queue transitions").namespace(NAMESPACE),
            &["from", "to"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        let rejected = CounterVec::new(
            Opts::new("admission_rejected_total", "Refused task admissions").namespace(NAMESPACE),
            &["reason"],
        )?;
        registry.register(Box::new(rejected.clone()))?;

        let store_errors = CounterVec::new(
            Opts::new("store_errors_total", "Failed or timed out store calls").namespace(NAMESPACE),
            &["op"],
        )?;
        registry.register(Box::new(store_errors.clone()))?;

        let expired = Counter::with_opts(
            Opts::new("expired_total", "In-progress tasks found past their deadline")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(expired.clone()))?;

        let scans = Counter::with_opts(
            Opts::new("timeout_scans_total", "Timeout supervisor passes").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(scans.clone()))?;

        Ok(Self {
            transitions,
            rejected,
            store_errors,
            expired,
            scans,
            registry,
        })
    }

    /// Backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl QueueMetrics for PrometheusMetrics {
    fn record_transition(&self, from: Queue, to: Queue) {
        self.transitions
            .with_label_values(&[from.as_label(), to.as_label()])
            .inc();
    }

    fn record_rejected(&self, reason: RejectReason) {
        self.rejected.with_label_values(&[reason.as_label()]).inc();
    }

    fn record_store_error(&self, op: &'static str) {
        self.store_errors.with_label_values(&[op]).inc();
    }

    fn record_scan(&self, report: &ScanReport) {
        self.scans.inc();
        self.expired.inc_by(report.expired as f64);
    }
}
