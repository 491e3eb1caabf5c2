mod domain;
pub use domain::{
    Deadline, EntryMeta, Queue, EMPTY_TASK, STOP_TASK, TASK_FORMAT_SEPARATOR, TASK_TYPE_WHITELIST,
    WORKER_STOP_COMMAND,
};

mod error;
pub use error::{ModelError, ModelResult};

mod task;
pub use task::{Layout, Task, TaskKind, TaskType, validate};

mod strategy;
pub use strategy::{BackoffStrategy, JitterStrategy};
