//! Task descriptors: the compact text form workers and admitters exchange.
//!
//! A descriptor's canonical string is its identity. Equality and hashing use
//! the raw text only; ordering compares priority only.
mod codec;
pub use codec::validate;

mod kind;
pub use kind::{Layout, TaskKind, TaskType};

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{EMPTY_TASK, STOP_TASK},
    error::{ModelError, ModelResult},
};

/// Parsed task descriptor.
///
/// Built with [`Task::decode`] from a canonical string or with [`Task::new`]
/// from fields. Both paths keep the canonical string around; it is the key
/// under which the task lives in the coordination store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Task {
    raw: String,
    kind: TaskKind,
    layout: Layout,
    task_type: String,
    priority: u64,
    min_dram_gb: u64,
    require_cpu_core: u64,
    timeout_seconds: Option<u64>,
    params: String,
}

impl Task {
    /// Decode a canonical descriptor string.
    ///
    /// # Examples
    /// ```
    /// use dcomp_model::{Layout, Task};
    ///
    /// let t = Task::decode("shell:5:8:2:300:echo a:b").unwrap();
    /// assert_eq!(t.layout(), Layout::Current);
    /// assert_eq!(t.timeout_seconds(), Some(300));
    /// assert_eq!(t.params(), "echo a:b");
    /// ```
    pub fn decode(raw: impl Into<String>) -> ModelResult<Self> {
        codec::decode(raw.into())
    }

    /// Build a descriptor from fields and encode its canonical string.
    ///
    /// `timeout_seconds: None` selects the legacy 5-field layout, `Some(_)` the
    /// current 6-field layout.
    pub fn new(
        task_type: &str,
        priority: u64,
        min_dram_gb: u64,
        require_cpu_core: u64,
        timeout_seconds: Option<u64>,
        params: &str,
    ) -> ModelResult<Self> {
        let raw = codec::encode(
            task_type,
            priority,
            min_dram_gb,
            require_cpu_core,
            timeout_seconds,
            params,
        )?;
        codec::decode(raw)
    }

    /// The empty sentinel, handed out when no task is available.
    pub fn empty() -> Self {
        Self::sentinel(EMPTY_TASK)
    }

    /// The stop sentinel, telling a worker to exit.
    pub fn stop() -> Self {
        Self::sentinel(STOP_TASK)
    }

    fn sentinel(raw: &'static str) -> Self {
        let (task_type, params) = match raw {
            STOP_TASK => (crate::WORKER_STOP_COMMAND, crate::WORKER_STOP_COMMAND),
            _ => ("0", "0"),
        };
        Self {
            raw: raw.to_string(),
            kind: TaskKind::of(raw, task_type),
            layout: Layout::Legacy,
            task_type: task_type.to_string(),
            priority: 0,
            min_dram_gb: 0,
            require_cpu_core: 0,
            timeout_seconds: None,
            params: params.to_string(),
        }
    }

    /// Canonical string (store key).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Raw task type field.
    #[inline]
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Whitelisted task type, if the raw field is one.
    pub fn runtime_type(&self) -> Option<TaskType> {
        self.task_type.parse().ok()
    }

    #[inline]
    pub fn priority(&self) -> u64 {
        self.priority
    }

    #[inline]
    pub fn min_dram_gb(&self) -> u64 {
        self.min_dram_gb
    }

    #[inline]
    pub fn require_cpu_core(&self) -> u64 {
        self.require_cpu_core
    }

    /// Explicit timeout; `None` means the configured default applies.
    #[inline]
    pub fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }

    #[inline]
    pub fn params(&self) -> &str {
        &self.params
    }

    /// Timeout to apply once claimed: explicit value or `default_secs`.
    ///
    /// Zero means unlimited and yields `None`.
    pub fn effective_timeout(&self, default_secs: u64) -> Option<Duration> {
        match self.timeout_seconds.unwrap_or(default_secs) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Returns `true` if a worker with the given free capacity can run this task.
    pub fn fits(&self, available_dram_gb: u64, available_cpu_cores: u64) -> bool {
        self.min_dram_gb <= available_dram_gb && self.require_cpu_core <= available_cpu_cores
    }

    /// Returns `true` if the descriptor may enter the todo queue.
    ///
    /// Stop tasks bypass the type whitelist; the empty sentinel never qualifies.
    pub fn is_admissible(&self) -> bool {
        match self.kind {
            TaskKind::Stop => true,
            TaskKind::Empty => false,
            TaskKind::Normal => self.runtime_type().is_some(),
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

/// Compares priority only.
///
/// Not consistent with [`Eq`]: two tasks with equal priority and different
/// canonical strings compare as `Equal` here while `==` is `false`. There is
/// deliberately no `Ord` impl.
impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.priority.cmp(&other.priority))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TaskKind::Empty => f.write_str("Empty Task"),
            TaskKind::Stop => f.write_str("End of Task"),
            TaskKind::Normal => write!(
                f,
                "task_type: {}, priority: {}, min_dram_gb: {}, require_cpu_core: {}, task_params: {}",
                self.task_type, self.priority, self.min_dram_gb, self.require_cpu_core, self.params
            ),
        }
    }
}

impl FromStr for Task {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        Self::decode(s)
    }
}

impl TryFrom<String> for Task {
    type Error = ModelError;
    fn try_from(s: String) -> ModelResult<Self> {
        Self::decode(s)
    }
}

impl From<Task> for String {
    fn from(t: Task) -> Self {
        t.raw
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn identity_is_the_raw_string() {
        let a = Task::decode("shell:5:8:2:echo hi").unwrap();
        let b = Task::decode("shell:5:8:2:echo hi").unwrap();
        let c = Task::decode("shell:5:8:2:0:echo hi").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Task> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ordering_uses_priority_only() {
        let low = Task::decode("shell:1:64:8:echo big").unwrap();
        let high = Task::decode("python:9:1:1:run.py").unwrap();
        assert!(low < high);
        assert!(high > low);
        assert!(!(high < low));
    }

    #[test]
    fn equal_priority_is_not_less_and_not_equal() {
        let a = Task::decode("shell:5:8:2:echo a").unwrap();
        let b = Task::decode("shell:5:8:2:echo b").unwrap();

        assert!(!(a < b));
        assert!(!(b < a));
        assert!(a <= b && b <= a);
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal));
        assert_ne!(a, b);
    }

    #[test]
    fn sentinels_display_and_kind() {
        let empty = Task::empty();
        let stop = Task::stop();

        assert_eq!(empty.kind(), TaskKind::Empty);
        assert_eq!(stop.kind(), TaskKind::Stop);
        assert_eq!(empty.to_string(), "Empty Task");
        assert_eq!(stop.to_string(), "End of Task");
        assert_eq!(empty.as_str(), "0:0:0:0:0");

        assert_eq!(Task::decode(STOP_TASK).unwrap(), stop);
        assert_eq!(Task::decode(STOP_TASK).unwrap().kind(), TaskKind::Stop);
        assert_eq!(Task::decode(EMPTY_TASK).unwrap().kind(), TaskKind::Empty);
    }

    #[test]
    fn normal_display_lists_fields() {
        let t = Task::decode("shell:5:8:0:echo hello").unwrap();
        assert_eq!(
            t.to_string(),
            "task_type: shell, priority: 5, min_dram_gb: 8, require_cpu_core: 0, task_params: echo hello"
        );
    }

    #[test]
    fn admissibility_follows_whitelist_with_stop_bypass() {
        assert!(Task::decode("demo:0:0:0:x").unwrap().is_admissible());
        assert!(Task::stop().is_admissible());
        assert!(!Task::empty().is_admissible());
        assert!(!Task::decode("ruby:1:1:1:x.rb").unwrap().is_admissible());
    }

    #[test]
    fn effective_timeout_rules() {
        let legacy = Task::decode("shell:5:8:2:echo hi").unwrap();
        let never = Task::decode("shell:5:8:2:0:echo hi").unwrap();
        let explicit = Task::decode("shell:5:8:2:10:sleep 20").unwrap();

        assert_eq!(legacy.effective_timeout(300), Some(Duration::from_secs(300)));
        assert_eq!(legacy.effective_timeout(0), None);
        assert_eq!(never.effective_timeout(300), None);
        assert_eq!(explicit.effective_timeout(300), Some(Duration::from_secs(10)));
    }

    #[test]
    fn fits_checks_both_resources() {
        let t = Task::decode("shell:5:8:2:echo hi").unwrap();
        assert!(t.fits(8, 2));
        assert!(t.fits(64, 16));
        assert!(!t.fits(7, 16));
        assert!(!t.fits(64, 1));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let t = Task::decode("python:3:4:1:120:train.py --epochs 3").unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#""python:3:4:1:120:train.py --epochs 3""#);

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<Task>(r#""shell:x:1:1:y""#).is_err());
    }
}
