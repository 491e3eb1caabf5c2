//! Common model-level constants.
//!
//! Well-known strings of the descriptor format live here so the codec, the
//! queue store and external tooling agree on a single source of truth.

/// Separator between descriptor fields.
pub const TASK_FORMAT_SEPARATOR: char = ':';

/// Reserved task type asking a worker to stop.
///
/// Descriptors of this type bypass the task type whitelist.
pub const WORKER_STOP_COMMAND: &str = "stop_worker";

/// Task types a worker knows how to execute.
pub const TASK_TYPE_WHITELIST: [&str; 3] = ["shell", "python", "demo"];

/// Canonical string of the empty sentinel task.
pub const EMPTY_TASK: &str = "0:0:0:0:0";

/// Canonical string of the stop sentinel task.
pub const STOP_TASK: &str = "stop_worker:0:0:0:stop_worker";
