mod constants;
pub use constants::{
    EMPTY_TASK, STOP_TASK, TASK_FORMAT_SEPARATOR, TASK_TYPE_WHITELIST, WORKER_STOP_COMMAND,
};

mod queue;
pub use queue::Queue;

mod meta;
pub use meta::{Deadline, EntryMeta};
