//! Coordination core of the dcomp batch scheduler.
//!
//! - [`config`]: hot-reloadable policy configuration
//! - [`store`]: coordination store trait with in-memory and Redis backends
//! - [`queue`]: admit/claim/complete/requeue over the four task queues
//! - [`supervisor`]: periodic reclamation of expired in-progress tasks
pub mod background;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod retry;
pub mod store;
pub mod supervisor;

pub use background::Background;
pub use clock::{Clock, ClockHandle, ManualClock, SystemClock, system_clock};
pub use config::{Config, ConfigError, ConfigHandle, ConfigStore, StoreConfig};
pub use error::{QueueError, QueueResult, StoreError, StoreResult};
pub use queue::{Outcome, TaskQueueStore, Transition};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use store::{Admission, CoordinationStore, MemoryStore, StoreHandle};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use supervisor::{ScanReport, TimeoutSupervisor};

pub mod prelude {
    pub use crate::config::{Config, ConfigStore};
    pub use crate::error::QueueError;
    pub use crate::metrics::{MetricsHandle, QueueMetrics};
    pub use crate::queue::{Outcome, TaskQueueStore, Transition};
    pub use crate::store::{CoordinationStore, MemoryStore};
    pub use crate::supervisor::TimeoutSupervisor;
}
