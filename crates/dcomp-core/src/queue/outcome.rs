use dcomp_model::Queue;

/// Result a worker reports for a claimed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Effect of a completion or requeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Key left in-progress and now sits in `to`.
    Moved { to: Queue, retry_count: u32 },
    /// Key was not in in-progress, or another caller moved it first.
    NotFound,
}

impl Transition {
    /// Destination queue, if the move happened.
    pub fn destination(&self) -> Option<Queue> {
        match self {
            Transition::Moved { to, .. } => Some(*to),
            Transition::NotFound => None,
        }
    }
}
