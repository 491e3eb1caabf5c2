use thiserror::Error;

use dcomp_model::{ModelError, Queue};

/// Infrastructure failure talking to the coordination store.
///
/// Never a statement about the task itself: callers retry these and must not
/// record them as a task failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("coordination store unavailable: {0}")]
    Unavailable(String),

    /// The server answered but refused the command (script or type error).
    #[error("coordination store rejected command: {0}")]
    Rejected(String),

    #[error("store operation '{op}' timed out after {after_ms}ms")]
    Timeout { op: &'static str, after_ms: u64 },

    #[error("corrupt entry {key:?} in {queue}: {reason}")]
    Corrupt {
        queue: Queue,
        key: String,
        reason: String,
    },
}

impl StoreError {
    /// Returns `true` for connectivity problems worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by queue transitions.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task rejected: {0}")]
    InvalidTask(#[from] ModelError),

    #[error("task {0:?} is not admissible (type not whitelisted or sentinel)")]
    NotAdmissible(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    /// Returns `true` if the failure is a transient store problem.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueueError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
