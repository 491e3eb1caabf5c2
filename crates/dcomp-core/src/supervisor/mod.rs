//! Periodic reclamation of expired in-progress work.
//!
//! Each pass reads the in-progress queue once and requeues every entry whose
//! deadline has passed. The requeue compares against the metadata read in the
//! pass, so a worker completing the task in between wins and the expiry is
//! dropped as a lost race.
use std::sync::Arc;

use dcomp_model::{EntryMeta, Queue};
use tracing::{debug, error, info, warn};

use crate::{
    background::Background,
    error::StoreError,
    queue::{TaskQueueStore, Transition},
    retry::{RetryPolicy, retry_with_backoff},
};

/// Counters for one supervisor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// In-progress entries inspected.
    pub scanned: usize,
    /// Entries whose deadline had passed.
    pub expired: usize,
    /// Expired entries sent back to todo.
    pub requeued: usize,
    /// Expired entries that exhausted their retries.
    pub failed: usize,
    /// Expired entries settled by someone else first.
    pub lost_race: usize,
    /// Entries with unreadable metadata.
    pub skipped_corrupt: usize,
    /// Store failures left after retrying.
    pub errors: usize,
}

impl ScanReport {
    fn is_quiet(&self) -> bool {
        self.expired == 0 && self.skipped_corrupt == 0 && self.errors == 0
    }
}

/// Reclaims in-progress tasks whose deadline has passed.
pub struct TimeoutSupervisor {
    queue: TaskQueueStore,
    retry: RetryPolicy,
}

impl TimeoutSupervisor {
    pub fn new(queue: TaskQueueStore) -> Self {
        Self {
            queue,
            retry: RetryPolicy::default(),
        }
    }

    /// Policy for retrying transient store errors on a single key.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one pass over the in-progress queue.
    pub async fn scan_once(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let now = self.queue.now_ms();

        let entries = match retry_with_backoff(&self.retry, "scan_in_progress", || {
            self.queue.raw_entries(Queue::InProgress)
        })
        .await
        {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "cannot read in-progress queue; skipping pass");
                report.errors += 1;
                self.queue.metrics().record_scan(&report);
                return report;
            }
        };

        for (key, observed) in entries {
            report.scanned += 1;
            let meta = match EntryMeta::decode(&observed) {
                Ok(meta) => meta,
                Err(e) => {
                    let err = StoreError::Corrupt {
                        queue: Queue::InProgress,
                        key: key.clone(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "skipping corrupt in-progress entry");
                    report.skipped_corrupt += 1;
                    continue;
                }
            };
            if !meta.is_expired(now) {
                continue;
            }
            report.expired += 1;

            let res = retry_with_backoff(&self.retry, "requeue_expired", || {
                self.queue.requeue_expired(&key, &observed)
            })
            .await;
            match res {
                Ok(Transition::Moved {
                    to: Queue::Failed,
                    retry_count,
                }) => {
                    warn!(key = %key, retry_count, "expired task exhausted retries");
                    report.failed += 1;
                }
                Ok(Transition::Moved { to, retry_count }) => {
                    info!(key = %key, queue = %to, retry_count, "expired task requeued");
                    report.requeued += 1;
                }
                Ok(Transition::NotFound) => {
                    warn!(key = %key, "expired task was settled concurrently");
                    report.lost_race += 1;
                }
                Err(e) => {
                    error!(key = %key, error = %e, "failed to requeue expired task");
                    report.errors += 1;
                }
            }
        }

        if report.is_quiet() {
            debug!(scanned = report.scanned, "timeout scan finished");
        } else {
            info!(?report, "timeout scan finished");
        }
        self.queue.metrics().record_scan(&report);
        report
    }

    /// Run passes until the returned handle is shut down.
    ///
    /// The interval is read from the current configuration before every sleep.
    pub fn spawn(self: Arc<Self>) -> Background {
        Background::spawn("timeout-supervisor", move |token| async move {
            info!("timeout supervisor started");
            loop {
                let every = self.queue.config().snapshot().timeout_check_interval();
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(every) => {}
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = self.scan_once() => {}
                }
            }
        })
    }
}
