//! Coordination store abstraction.
//!
//! The store holds one hash-like collection per [`Queue`]. Besides plain field
//! access it offers two atomic primitives the queue transitions are built on:
//! a compare-and-move between collections and an exclusive admission write.
mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "redis")]
mod redis_backend;
#[cfg(feature = "redis")]
pub use redis_backend::RedisStore;

use std::sync::Arc;

use async_trait::async_trait;
use dcomp_model::Queue;

use crate::error::StoreResult;

/// Result of [`CoordinationStore::admit_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Key was absent everywhere and is now in the target collection.
    Inserted,
    /// Key was already in the target collection; its value was overwritten.
    Refreshed,
    /// Key sits in the given collection; nothing was written.
    Held(Queue),
}

/// Shared key-value store backing the four task queues.
#[async_trait]
pub trait CoordinationStore: Send + Sync + 'static {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    async fn set_field(&self, queue: Queue, key: &str, value: &str) -> StoreResult<()>;

    async fn get_field(&self, queue: Queue, key: &str) -> StoreResult<Option<String>>;

    /// Returns `true` if the field existed.
    async fn delete_field(&self, queue: Queue, key: &str) -> StoreResult<bool>;

    async fn keys(&self, queue: Queue) -> StoreResult<Vec<String>>;

    async fn get_all(&self, queue: Queue) -> StoreResult<Vec<(String, String)>>;

    async fn len(&self, queue: Queue) -> StoreResult<usize>;

    /// Atomically move `key` from `from` to `to` if `from[key] == expected`.
    ///
    /// Returns `false` and changes nothing when the key is missing or its value
    /// differs.
    async fn move_field(
        &self,
        from: Queue,
        to: Queue,
        key: &str,
        expected: &str,
        value: &str,
    ) -> StoreResult<bool>;

    /// Atomically write `target[key] = value` unless `key` is present in one of
    /// `exclusive_of`.
    async fn admit_field(
        &self,
        target: Queue,
        key: &str,
        value: &str,
        exclusive_of: &[Queue],
    ) -> StoreResult<Admission>;
}

/// Shared handle to a coordination store.
pub type StoreHandle = Arc<dyn CoordinationStore>;
