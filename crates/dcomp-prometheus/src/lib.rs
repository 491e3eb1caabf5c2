//! Prometheus backend for dcomp queue metrics.
//!
//! [`PrometheusMetrics`] implements [`dcomp_core::metrics::QueueMetrics`] and
//! is injected into the queue store with `with_metrics`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//!
//! use dcomp_core::{ConfigStore, Config, MemoryStore, TaskQueueStore};
//! use dcomp_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let queue = TaskQueueStore::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ConfigStore::from_config(Config::default())),
//! )
//! .with_metrics(Arc::new(metrics.clone()));
//! # let _ = queue;
//! println!("{}", metrics.render()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `dcomp_transitions_total{from, to}` - Counter
//! - `dcomp_admission_rejected_total{reason}` - Counter
//! - `dcomp_store_errors_total{op}` - Counter
//! - `dcomp_expired_total` - Counter
//! - `dcomp_timeout_scans_total` - Counter
//!
//! No HTTP endpoint is provided; serve [`PrometheusMetrics::render`] from the
//! embedding application.
mod backend;
pub use backend::PrometheusMetrics;
