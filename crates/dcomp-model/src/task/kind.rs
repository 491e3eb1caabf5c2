use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{EMPTY_TASK, WORKER_STOP_COMMAND},
    error::{ModelError, ModelResult},
};

/// Tag distinguishing ordinary descriptors from the two sentinels.
///
/// All variants carry the same structured fields; only display and
/// admission behaviour dispatch on the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    /// Regular work item.
    Normal,
    /// Placeholder meaning "nothing to do".
    Empty,
    /// Instruction for the receiving worker to exit.
    Stop,
}

impl TaskKind {
    pub(crate) fn of(raw: &str, task_type: &str) -> Self {
        if raw == EMPTY_TASK {
            TaskKind::Empty
        } else if task_type == WORKER_STOP_COMMAND {
            TaskKind::Stop
        } else {
            TaskKind::Normal
        }
    }
}

/// Descriptor layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Layout {
    /// `type:priority:dram:cpu:params`
    Legacy,
    /// `type:priority:dram:cpu:timeout:params`
    Current,
}

impl Layout {
    /// Number of separator-delimited fields in this layout.
    pub const fn field_count(&self) -> usize {
        match self {
            Layout::Legacy => 5,
            Layout::Current => 6,
        }
    }
}

/// Task types a worker can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskType {
    /// Run `params` through a shell.
    Shell,
    /// Run `params` with a python interpreter.
    Python,
    /// Built-in demo workload.
    Demo,
}

impl TaskType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskType::Shell => "shell",
            TaskType::Python => "python",
            TaskType::Demo => "demo",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against the whitelist.
impl FromStr for TaskType {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "shell" => Ok(TaskType::Shell),
            "python" => Ok(TaskType::Python),
            "demo" => Ok(TaskType::Demo),
            other => Err(ModelError::UnknownTaskType(other.to_string())),
        }
    }
}
