//! Four-queue task state machine on top of a [`CoordinationStore`].
//!
//! Every transition follows the same shape: read the entry, compute the next
//! metadata, then compare-and-move against the exact value read. A caller whose
//! move loses observes the key gone and reports [`Transition::NotFound`].
mod outcome;
pub use outcome::{Outcome, Transition};

use std::{future::Future, time::Duration};

use dcomp_model::{EntryMeta, Queue, Task, TaskKind};
use tracing::{debug, instrument, trace, warn};

use crate::{
    clock::{ClockHandle, system_clock},
    config::ConfigHandle,
    error::{QueueError, QueueResult, StoreError, StoreResult},
    metrics::{MetricsHandle, RejectReason, noop_metrics},
    store::{Admission, StoreHandle},
};

/// Default bound on a single store call.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Queues an admitted key must not be in when admission writes to todo.
const ADMIT_EXCLUSIVE: [Queue; 3] = [Queue::InProgress, Queue::Finished, Queue::Failed];

/// Compare-and-move attempts for caller-driven transitions before giving up.
const MOVE_ATTEMPTS: usize = 3;

#[derive(Clone, Copy)]
enum Route {
    Finish,
    Retry,
}

/// Task queue operations shared by admitters, workers and the supervisor.
#[derive(Clone)]
pub struct TaskQueueStore {
    store: StoreHandle,
    config: ConfigHandle,
    clock: ClockHandle,
    metrics: MetricsHandle,
    op_timeout: Duration,
}

impl TaskQueueStore {
    pub fn new(store: StoreHandle, config: ConfigHandle) -> Self {
        Self {
            store,
            config,
            clock: system_clock(),
            metrics: noop_metrics(),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: ClockHandle) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Put a validated descriptor into todo with fresh metadata.
    ///
    /// A key already in todo gets its metadata refreshed. A key held by any
    /// other queue is left alone and reported as [`Admission::Held`].
    pub async fn admit(&self, raw: &str) -> QueueResult<Admission> {
        let task = Task::decode(raw).map_err(|e| {
            warn!(raw, error = %e, "rejecting malformed task descriptor");
            self.metrics.record_rejected(RejectReason::InvalidFormat);
            e
        })?;
        if !task.is_admissible() {
            warn!(raw, "rejecting task that is not admissible");
            self.metrics.record_rejected(RejectReason::NotAdmissible);
            return Err(QueueError::NotAdmissible(raw.to_owned()));
        }

        let meta = EntryMeta::fresh(self.now_ms()).encode()?;
        let admission = self
            .call(
                "admit_field",
                self.store
                    .admit_field(Queue::Todo, task.as_str(), &meta, &ADMIT_EXCLUSIVE),
            )
            .await?;
        match admission {
            Admission::Inserted | Admission::Refreshed => {
                debug!(key = task.as_str(), ?admission, "task admitted");
                self.metrics.record_transition(Queue::Todo, Queue::Todo);
            }
            Admission::Held(queue) => {
                debug!(key = task.as_str(), %queue, "task already tracked; admission skipped");
                self.metrics.record_rejected(RejectReason::Held);
            }
        }
        Ok(admission)
    }

    /// Admit every descriptor, reporting each outcome separately.
    pub async fn admit_many<I, S>(&self, raws: I) -> Vec<(String, QueueResult<Admission>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for raw in raws {
            let raw = raw.into();
            let res = self.admit(&raw).await;
            out.push((raw, res));
        }
        out
    }

    /// Move any one todo entry to in-progress.
    ///
    /// Returns `None` when todo is empty or every candidate was taken by a
    /// concurrent caller.
    pub async fn claim(&self) -> QueueResult<Option<Task>> {
        self.claim_matching(|_| true, false).await
    }

    /// Claim the highest-priority todo entry that fits the offered capacity.
    pub async fn claim_fitting(
        &self,
        available_dram_gb: u64,
        available_cpu_cores: u64,
    ) -> QueueResult<Option<Task>> {
        self.claim_matching(|t| t.fits(available_dram_gb, available_cpu_cores), true)
            .await
    }

    async fn claim_matching<F>(&self, accept: F, by_priority: bool) -> QueueResult<Option<Task>>
    where
        F: Fn(&Task) -> bool,
    {
        let entries = self.call("get_all", self.store.get_all(Queue::Todo)).await?;
        let mut candidates: Vec<(Task, String)> = entries
            .into_iter()
            .filter_map(|(key, value)| match Task::decode(key.as_str()) {
                Ok(task) if task.kind() == TaskKind::Empty => {
                    warn!(key = %key, "skipping empty sentinel in todo");
                    None
                }
                Ok(task) => Some((task, value)),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping undecodable todo entry");
                    None
                }
            })
            .filter(|(task, _)| accept(task))
            .collect();
        if by_priority {
            candidates.sort_by(|a, b| b.0.priority().cmp(&a.0.priority()));
        }

        let cfg = self.config.snapshot();
        for (task, current) in candidates {
            let meta = self.decode_meta(Queue::Todo, task.as_str(), &current);
            let now = self.now_ms();
            let token = rand::random::<u64>();
            let next = meta
                .claimed(
                    now,
                    task.effective_timeout(cfg.default_task_timeout_seconds),
                    token,
                )
                .encode()?;
            let moved = match self
                .call(
                    "move_field",
                    self.store.move_field(
                        Queue::Todo,
                        Queue::InProgress,
                        task.as_str(),
                        &current,
                        &next,
                    ),
                )
                .await
            {
                Ok(moved) => moved,
                Err(e) if e.is_retryable() => {
                    if !self.holds_claim(task.as_str(), token).await {
                        return Err(e.into());
                    }
                    debug!(key = task.as_str(), error = %e, "claim committed despite store error");
                    true
                }
                Err(e) => return Err(e.into()),
            };
            if moved {
                debug!(key = task.as_str(), retry_count = meta.retry_count, "task claimed");
                self.metrics.record_transition(Queue::Todo, Queue::InProgress);
                return Ok(Some(task));
            }
            trace!(key = task.as_str(), "claim lost to a concurrent caller");
        }
        Ok(None)
    }

    /// Whether the in-progress entry for `key` carries our claim token.
    ///
    /// A failed read answers `false`; the caller then reports the original error
    /// and the supervisor recovers the entry on expiry.
    async fn holds_claim(&self, key: &str, token: u64) -> bool {
        match self
            .call("get_field", self.store.get_field(Queue::InProgress, key))
            .await
        {
            Ok(Some(raw)) => EntryMeta::decode(&raw).is_ok_and(|m| m.is_claimed_by(token)),
            Ok(None) => false,
            Err(e) => {
                warn!(key, error = %e, "could not confirm claim after store error");
                false
            }
        }
    }

    /// Settle a claimed task.
    ///
    /// Success moves it to finished. Failure goes through the retry policy:
    /// back to todo while retries remain, otherwise to failed.
    #[instrument(level = "debug", skip(self))]
    pub async fn complete(&self, key: &str, outcome: Outcome) -> QueueResult<Transition> {
        let route = match outcome {
            Outcome::Success => Route::Finish,
            Outcome::Failure => Route::Retry,
        };
        self.settle(key, route).await
    }

    /// Return an in-progress task to todo, or to failed once retries are exhausted.
    #[instrument(level = "debug", skip(self))]
    pub async fn requeue(&self, key: &str) -> QueueResult<Transition> {
        self.settle(key, Route::Retry).await
    }

    /// Requeue only if the in-progress metadata still equals `observed`.
    ///
    /// Used by the timeout supervisor so that one expiry bumps the retry
    /// counter at most once, even if the scan raced with a worker.
    pub async fn requeue_expired(&self, key: &str, observed: &str) -> QueueResult<Transition> {
        let meta = EntryMeta::decode(observed)?;
        self.try_move(key, observed, meta, Route::Retry).await
    }

    async fn settle(&self, key: &str, route: Route) -> QueueResult<Transition> {
        for _ in 0..MOVE_ATTEMPTS {
            let Some(current) = self
                .call("get_field", self.store.get_field(Queue::InProgress, key))
                .await?
            else {
                debug!(key, "key not in progress; nothing to do");
                return Ok(Transition::NotFound);
            };
            let meta = self.decode_meta(Queue::InProgress, key, &current);
            match self.try_move(key, &current, meta, route).await? {
                Transition::NotFound => trace!(key, "in-progress entry changed; re-reading"),
                moved => return Ok(moved),
            }
        }
        Ok(Transition::NotFound)
    }

    async fn try_move(
        &self,
        key: &str,
        current: &str,
        meta: EntryMeta,
        route: Route,
    ) -> QueueResult<Transition> {
        let now = self.now_ms();
        let (to, next) = match route {
            Route::Finish => (Queue::Finished, meta.settled(now)),
            Route::Retry => {
                let next = meta.retried(now);
                let max_retry = self.config.snapshot().max_retry_per_task;
                if next.retry_count <= max_retry {
                    (Queue::Todo, next)
                } else {
                    (Queue::Failed, next)
                }
            }
        };
        let moved = self
            .call(
                "move_field",
                self.store
                    .move_field(Queue::InProgress, to, key, current, &next.encode()?),
            )
            .await?;
        if !moved {
            return Ok(Transition::NotFound);
        }
        debug!(key, queue = %to, retry_count = next.retry_count, "task moved out of progress");
        self.metrics.record_transition(Queue::InProgress, to);
        Ok(Transition::Moved {
            to,
            retry_count: next.retry_count,
        })
    }

    /// Number of entries in `queue`.
    pub async fn len(&self, queue: Queue) -> QueueResult<usize> {
        Ok(self.call("len", self.store.len(queue)).await?)
    }

    /// Entry count of every queue, in lifecycle order.
    pub async fn depths(&self) -> QueueResult<Vec<(Queue, usize)>> {
        let mut out = Vec::with_capacity(Queue::ALL.len());
        for queue in Queue::ALL {
            out.push((queue, self.len(queue).await?));
        }
        Ok(out)
    }

    pub async fn contains(&self, queue: Queue, key: &str) -> QueueResult<bool> {
        Ok(self
            .call("get_field", self.store.get_field(queue, key))
            .await?
            .is_some())
    }

    /// Queue currently holding `key`.
    pub async fn locate(&self, key: &str) -> QueueResult<Option<Queue>> {
        for queue in Queue::ALL {
            if self.contains(queue, key).await? {
                return Ok(Some(queue));
            }
        }
        Ok(None)
    }

    /// Every entry of `queue` with decoded metadata.
    pub async fn snapshot(&self, queue: Queue) -> QueueResult<Vec<(String, EntryMeta)>> {
        self.raw_entries(queue)
            .await?
            .into_iter()
            .map(|(key, value)| match EntryMeta::decode(&value) {
                Ok(meta) => Ok((key, meta)),
                Err(e) => Err(QueueError::Store(StoreError::Corrupt {
                    queue,
                    key,
                    reason: e.to_string(),
                })),
            })
            .collect()
    }

    /// Every entry of `queue` with its stored field value.
    pub async fn raw_entries(&self, queue: Queue) -> QueueResult<Vec<(String, String)>> {
        Ok(self.call("get_all", self.store.get_all(queue)).await?)
    }

    fn decode_meta(&self, queue: Queue, key: &str, raw: &str) -> EntryMeta {
        EntryMeta::decode(raw).unwrap_or_else(|e| {
            warn!(key, %queue, error = %e, "unreadable entry metadata; treating as fresh");
            EntryMeta::default()
        })
    }

    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        let res = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout {
                op,
                after_ms: u64::try_from(self.op_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        if let Err(e) = &res {
            debug!(op, error = %e, "store call failed");
            self.metrics.record_store_error(op);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::{Config, ConfigStore},
        store::{CoordinationStore, MemoryStore},
    };

    struct Fixture {
        queue: TaskQueueStore,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture(max_retry: u32) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let cfg = Config {
            max_retry_per_task: max_retry,
            default_task_timeout_seconds: 60,
            ..Config::default()
        };
        let queue = TaskQueueStore::new(store.clone(), Arc::new(ConfigStore::from_config(cfg)))
            .with_clock(clock.clone());
        Fixture {
            queue,
            store,
            clock,
        }
    }

    async fn in_progress_meta(f: &Fixture, key: &str) -> EntryMeta {
        let raw = f
            .store
            .get_field(Queue::InProgress, key)
            .await
            .unwrap()
            .unwrap();
        EntryMeta::decode(&raw).unwrap()
    }

    #[tokio::test]
    async fn admit_rejects_invalid_without_writing() {
        let f = fixture(1);
        for raw in ["shell:-1:8:2:echo hi", "shell:5:8:2:", "perl:1:1:1:x", "0:0:0:0:0"] {
            assert!(f.queue.admit(raw).await.is_err(), "{raw}");
        }
        for q in Queue::ALL {
            assert_eq!(f.queue.len(q).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn admit_is_idempotent_and_respects_other_queues() {
        let f = fixture(1);
        let key = "shell:5:8:2:echo hi";
        assert_eq!(f.queue.admit(key).await.unwrap(), Admission::Inserted);
        f.clock.advance(Duration::from_secs(1));
        assert_eq!(f.queue.admit(key).await.unwrap(), Admission::Refreshed);
        assert_eq!(f.queue.len(Queue::Todo).await.unwrap(), 1);
        let snap = f.queue.snapshot(Queue::Todo).await.unwrap();
        assert_eq!(snap[0].1.enqueued_at_ms, 2_000);

        f.queue.claim().await.unwrap().unwrap();
        assert_eq!(
            f.queue.admit(key).await.unwrap(),
            Admission::Held(Queue::InProgress)
        );
        assert_eq!(f.queue.locate(key).await.unwrap(), Some(Queue::InProgress));
        assert!(!f.queue.contains(Queue::Todo, key).await.unwrap());
    }

    #[tokio::test]
    async fn admit_many_reports_each_descriptor() {
        let f = fixture(1);
        let out = f
            .queue
            .admit_many(["shell:1:1:1:a", "bad", "shell:1:1:1:a", "demo:2:1:1:60:b"])
            .await;

        assert_eq!(out.len(), 4);
        assert!(matches!(out[0].1, Ok(Admission::Inserted)));
        assert!(matches!(out[1].1, Err(QueueError::InvalidTask(_))));
        assert!(matches!(out[2].1, Ok(Admission::Refreshed)));
        assert_eq!(out[3].0, "demo:2:1:1:60:b");
        assert_eq!(f.queue.len(Queue::Todo).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stop_task_is_admissible() {
        let f = fixture(1);
        f.queue.admit(dcomp_model::STOP_TASK).await.unwrap();
        let task = f.queue.claim().await.unwrap().unwrap();
        assert_eq!(task.kind(), TaskKind::Stop);
    }

    #[tokio::test]
    async fn claim_sets_deadline_from_task_or_default() {
        let f = fixture(1);
        f.queue.admit("shell:1:1:1:30:explicit").await.unwrap();
        f.queue.claim().await.unwrap().unwrap();
        let meta = in_progress_meta(&f, "shell:1:1:1:30:explicit").await;
        assert_eq!(meta.deadline, Some(dcomp_model::Deadline::At(31_000)));

        f.queue.admit("shell:1:1:1:legacy").await.unwrap();
        f.queue.claim().await.unwrap().unwrap();
        let meta = in_progress_meta(&f, "shell:1:1:1:legacy").await;
        assert_eq!(meta.deadline, Some(dcomp_model::Deadline::At(61_000)));

        f.queue.admit("shell:1:1:1:0:forever").await.unwrap();
        f.queue.claim().await.unwrap().unwrap();
        let meta = in_progress_meta(&f, "shell:1:1:1:0:forever").await;
        assert_eq!(meta.deadline, Some(dcomp_model::Deadline::Never));

        assert!(f.queue.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_fitting_prefers_priority_within_capacity() {
        let f = fixture(1);
        f.queue.admit("shell:1:2:1:small").await.unwrap();
        f.queue.admit("shell:9:64:8:huge").await.unwrap();
        f.queue.admit("python:5:4:2:medium").await.unwrap();

        let t = f.queue.claim_fitting(8, 4).await.unwrap().unwrap();
        assert_eq!(t.params(), "medium");
        let t = f.queue.claim_fitting(8, 4).await.unwrap().unwrap();
        assert_eq!(t.params(), "small");
        assert!(f.queue.claim_fitting(8, 4).await.unwrap().is_none());
        assert_eq!(f.queue.len(Queue::Todo).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn claim_skips_undecodable_keys() {
        let f = fixture(1);
        f.store.set_field(Queue::Todo, "garbage", "").await.unwrap();
        assert!(f.queue.claim().await.unwrap().is_none());
        assert!(f.queue.contains(Queue::Todo, "garbage").await.unwrap());
    }

    #[tokio::test]
    async fn externally_written_bare_key_is_claimable() {
        let f = fixture(1);
        f.store
            .set_field(Queue::Todo, "demo:1:1:1:migrated", "")
            .await
            .unwrap();
        let t = f.queue.claim().await.unwrap().unwrap();
        assert_eq!(t.as_str(), "demo:1:1:1:migrated");
        assert_eq!(in_progress_meta(&f, t.as_str()).await.retry_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_single_winner() {
        let f = fixture(1);
        f.queue.admit("shell:5:8:2:echo hi").await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let q = f.queue.clone();
                tokio::spawn(async move { q.claim().await.unwrap() })
            })
            .collect();
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(f.queue.len(Queue::InProgress).await.unwrap(), 1);
        assert_eq!(f.queue.len(Queue::Todo).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn complete_success_finishes_once() {
        let f = fixture(1);
        let key = "shell:5:8:2:echo hi";
        f.queue.admit(key).await.unwrap();
        f.queue.claim().await.unwrap();

        assert_eq!(
            f.queue.complete(key, Outcome::Success).await.unwrap(),
            Transition::Moved {
                to: Queue::Finished,
                retry_count: 0
            }
        );
        assert_eq!(
            f.queue.complete(key, Outcome::Success).await.unwrap(),
            Transition::NotFound
        );
        assert_eq!(f.queue.locate(key).await.unwrap(), Some(Queue::Finished));
        assert_eq!(
            f.queue.depths().await.unwrap(),
            vec![
                (Queue::Todo, 0),
                (Queue::InProgress, 0),
                (Queue::Finished, 1),
                (Queue::Failed, 0),
            ]
        );
    }

    #[tokio::test]
    async fn failures_retry_until_exhausted() {
        let f = fixture(1);
        let key = "python:1:1:1:job.py";
        f.queue.admit(key).await.unwrap();

        f.queue.claim().await.unwrap();
        assert_eq!(
            f.queue.complete(key, Outcome::Failure).await.unwrap(),
            Transition::Moved {
                to: Queue::Todo,
                retry_count: 1
            }
        );

        f.queue.claim().await.unwrap();
        assert_eq!(
            f.queue.requeue(key).await.unwrap(),
            Transition::Moved {
                to: Queue::Failed,
                retry_count: 2
            }
        );
        assert_eq!(f.queue.locate(key).await.unwrap(), Some(Queue::Failed));
        assert_eq!(f.queue.requeue(key).await.unwrap(), Transition::NotFound);
    }

    #[tokio::test]
    async fn zero_retries_fails_immediately() {
        let f = fixture(0);
        let key = "demo:1:1:1:x";
        f.queue.admit(key).await.unwrap();
        f.queue.claim().await.unwrap();
        assert_eq!(
            f.queue.requeue(key).await.unwrap().destination(),
            Some(Queue::Failed)
        );
    }

    #[tokio::test]
    async fn requeue_expired_rejects_stale_observation() {
        let f = fixture(3);
        let key = "shell:1:1:1:1:sleep 5";
        f.queue.admit(key).await.unwrap();
        f.queue.claim().await.unwrap();
        let observed = f
            .store
            .get_field(Queue::InProgress, key)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            f.queue.requeue_expired(key, &observed).await.unwrap(),
            Transition::Moved {
                to: Queue::Todo,
                retry_count: 1
            }
        );
        f.queue.claim().await.unwrap();
        assert_eq!(
            f.queue.requeue_expired(key, &observed).await.unwrap(),
            Transition::NotFound
        );
        assert_eq!(in_progress_meta(&f, key).await.retry_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn complete_and_expiry_race_has_one_effect() {
        for _ in 0..50 {
            let f = fixture(3);
            let key = "shell:1:1:1:1:race";
            f.queue.admit(key).await.unwrap();
            f.queue.claim().await.unwrap();
            let observed = f
                .store
                .get_field(Queue::InProgress, key)
                .await
                .unwrap()
                .unwrap();

            let worker = {
                let q = f.queue.clone();
                tokio::spawn(async move { q.complete(key, Outcome::Success).await.unwrap() })
            };
            let supervisor = {
                let q = f.queue.clone();
                tokio::spawn(async move { q.requeue_expired(key, &observed).await.unwrap() })
            };
            let a = worker.await.unwrap();
            let b = supervisor.await.unwrap();

            let moved = [a, b]
                .iter()
                .filter(|t| matches!(t, Transition::Moved { .. }))
                .count();
            assert_eq!(moved, 1, "{a:?} {b:?}");

            let mut holders = 0;
            for q in Queue::ALL {
                if f.queue.contains(q, key).await.unwrap() {
                    holders += 1;
                }
            }
            assert_eq!(holders, 1);
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CoordinationStore for StalledStore {
        fn name(&self) -> &'static str {
            "stalled"
        }
        async fn set_field(&self, _: Queue, _: &str, _: &str) -> StoreResult<()> {
            std::future::pending().await
        }
        async fn get_field(&self, _: Queue, _: &str) -> StoreResult<Option<String>> {
            std::future::pending().await
        }
        async fn delete_field(&self, _: Queue, _: &str) -> StoreResult<bool> {
            std::future::pending().await
        }
        async fn keys(&self, _: Queue) -> StoreResult<Vec<String>> {
            std::future::pending().await
        }
        async fn get_all(&self, _: Queue) -> StoreResult<Vec<(String, String)>> {
            std::future::pending().await
        }
        async fn len(&self, _: Queue) -> StoreResult<usize> {
            std::future::pending().await
        }
        async fn move_field(&self, _: Queue, _: Queue, _: &str, _: &str, _: &str) -> StoreResult<bool> {
            std::future::pending().await
        }
        async fn admit_field(&self, _: Queue, _: &str, _: &str, _: &[Queue]) -> StoreResult<Admission> {
            std::future::pending().await
        }
    }

    /// Commits the todo → in-progress move, then stalls past the op timeout.
    struct SlowAck {
        inner: MemoryStore,
        stall: Duration,
    }

    #[async_trait]
    impl CoordinationStore for SlowAck {
        fn name(&self) -> &'static str {
            "slow-ack"
        }
        async fn set_field(&self, q: Queue, k: &str, v: &str) -> StoreResult<()> {
            self.inner.set_field(q, k, v).await
        }
        async fn get_field(&self, q: Queue, k: &str) -> StoreResult<Option<String>> {
            self.inner.get_field(q, k).await
        }
        async fn delete_field(&self, q: Queue, k: &str) -> StoreResult<bool> {
            self.inner.delete_field(q, k).await
        }
        async fn keys(&self, q: Queue) -> StoreResult<Vec<String>> {
            self.inner.keys(q).await
        }
        async fn get_all(&self, q: Queue) -> StoreResult<Vec<(String, String)>> {
            self.inner.get_all(q).await
        }
        async fn len(&self, q: Queue) -> StoreResult<usize> {
            self.inner.len(q).await
        }
        async fn move_field(
            &self,
            from: Queue,
            to: Queue,
            key: &str,
            expected: &str,
            value: &str,
        ) -> StoreResult<bool> {
            let moved = self.inner.move_field(from, to, key, expected, value).await?;
            if from == Queue::Todo {
                tokio::time::sleep(self.stall).await;
            }
            Ok(moved)
        }
        async fn admit_field(
            &self,
            q: Queue,
            k: &str,
            v: &str,
            ex: &[Queue],
        ) -> StoreResult<Admission> {
            self.inner.admit_field(q, k, v, ex).await
        }
    }

    #[tokio::test]
    async fn claim_committed_before_timeout_is_kept() {
        let store = Arc::new(SlowAck {
            inner: MemoryStore::new(),
            stall: Duration::from_millis(200),
        });
        let cfg = Config {
            max_retry_per_task: 0,
            default_task_timeout_seconds: 60,
            ..Config::default()
        };
        let queue = TaskQueueStore::new(store.clone(), Arc::new(ConfigStore::from_config(cfg)))
            .with_clock(Arc::new(ManualClock::new(1_000)))
            .with_op_timeout(Duration::from_millis(20));
        let key = "shell:1:1:1:never ran";
        queue.admit(key).await.unwrap();

        let task = queue.claim().await.unwrap().expect("claim must be reported");
        assert_eq!(task.as_str(), key);
        assert_eq!(queue.locate(key).await.unwrap(), Some(Queue::InProgress));

        let raw = store.get_field(Queue::InProgress, key).await.unwrap().unwrap();
        assert_eq!(EntryMeta::decode(&raw).unwrap().retry_count, 0);
        assert_eq!(
            queue.complete(key, Outcome::Success).await.unwrap().destination(),
            Some(Queue::Finished)
        );
    }

    #[tokio::test]
    async fn claim_token_identifies_the_holder() {
        let f = fixture(0);
        let key = "shell:1:1:1:x";
        let theirs = EntryMeta::fresh(0).claimed(1_000, None, 1).encode().unwrap();
        f.store.set_field(Queue::InProgress, key, &theirs).await.unwrap();
        assert!(!f.queue.holds_claim(key, 2).await);
        assert!(f.queue.holds_claim(key, 1).await);
        assert!(!f.queue.holds_claim("shell:1:1:1:absent", 1).await);
    }

    #[tokio::test]
    async fn stalled_store_surfaces_retryable_timeout() {
        let queue = TaskQueueStore::new(
            Arc::new(StalledStore),
            Arc::new(ConfigStore::from_config(Config::default())),
        )
        .with_op_timeout(Duration::from_millis(20));

        let err = queue.claim().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            QueueError::Store(StoreError::Timeout { op: "get_all", .. })
        ));
        let err = queue.complete("shell:1:1:1:x", Outcome::Failure).await.unwrap_err();
        assert!(err.is_retryable(), "store loss must not look like a task failure");
    }
}
