use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// One of the four lifecycle queues a task key lives in.
///
/// A key is held by exactly one queue at any observable instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Queue {
    /// Admitted, waiting for a worker.
    Todo,
    /// Claimed by a worker, carries a deadline.
    InProgress,
    /// Completed successfully.
    Finished,
    /// Failed with retries exhausted.
    Failed,
}

impl Queue {
    /// All queues in lifecycle order.
    pub const ALL: [Queue; 4] = [
        Queue::Todo,
        Queue::InProgress,
        Queue::Finished,
        Queue::Failed,
    ];

    /// Name of the backing collection in the coordination store.
    pub const fn store_key(&self) -> &'static str {
        match self {
            Queue::Todo => "todo_tasks",
            Queue::InProgress => "in_progress_tasks",
            Queue::Finished => "finished_tasks",
            Queue::Failed => "failed_tasks",
        }
    }

    /// Short label used in logs and metrics.
    pub const fn as_label(&self) -> &'static str {
        match self {
            Queue::Todo => "todo",
            Queue::InProgress => "in_progress",
            Queue::Finished => "finished",
            Queue::Failed => "failed",
        }
    }

    /// Queues other than `self`.
    pub fn others(&self) -> impl Iterator<Item = Queue> + '_ {
        Self::ALL.into_iter().filter(move |q| q != self)
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for Queue {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "todo_tasks" => Ok(Queue::Todo),
            "in_progress" | "in-progress" | "in_progress_tasks" => Ok(Queue::InProgress),
            "finished" | "finished_tasks" => Ok(Queue::Finished),
            "failed" | "failed_tasks" => Ok(Queue::Failed),
            other => Err(ModelError::UnknownQueue(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_keys_are_distinct() {
        let mut keys: Vec<_> = Queue::ALL.iter().map(|q| q.store_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn parses_labels_and_store_keys() {
        assert_eq!("todo".parse::<Queue>().unwrap(), Queue::Todo);
        assert_eq!("IN_PROGRESS".parse::<Queue>().unwrap(), Queue::InProgress);
        assert_eq!("failed_tasks".parse::<Queue>().unwrap(), Queue::Failed);
        assert!("done".parse::<Queue>().is_err());
    }

    #[test]
    fn others_excludes_self() {
        let others: Vec<_> = Queue::Todo.others().collect();
        assert_eq!(
            others,
            vec![Queue::InProgress, Queue::Finished, Queue::Failed]
        );
    }
}
