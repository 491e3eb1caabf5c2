use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use dcomp_model::Queue;

use super::{Admission, CoordinationStore};
use crate::error::StoreResult;

type Collections = HashMap<Queue, HashMap<String, String>>;

/// Single-process store guarded by one mutex.
///
/// Every primitive runs under the same lock, which makes the atomic operations
/// trivially linearizable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn set_field(&self, queue: Queue, key: &str, value: &str) -> StoreResult<()> {
        self.lock()
            .entry(queue)
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get_field(&self, queue: Queue, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().get(&queue).and_then(|m| m.get(key).cloned()))
    }

    async fn delete_field(&self, queue: Queue, key: &str) -> StoreResult<bool> {
        Ok(self
            .lock()
            .get_mut(&queue)
            .is_some_and(|m| m.remove(key).is_some()))
    }

    async fn keys(&self, queue: Queue) -> StoreResult<Vec<String>> {
        Ok(self
            .lock()
            .get(&queue)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_all(&self, queue: Queue) -> StoreResult<Vec<(String, String)>> {
        Ok(self
            .lock()
            .get(&queue)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn len(&self, queue: Queue) -> StoreResult<usize> {
        Ok(self.lock().get(&queue).map_or(0, HashMap::len))
    }

    async fn move_field(
        &self,
        from: Queue,
        to: Queue,
        key: &str,
        expected: &str,
        value: &str,
    ) -> StoreResult<bool> {
        let mut guard = self.lock();
        let Some(src) = guard.get_mut(&from) else {
            return Ok(false);
        };
        if src.get(key).map(String::as_str) != Some(expected) {
            return Ok(false);
        }
        src.remove(key);
        guard
            .entry(to)
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        Ok(true)
    }

    async fn admit_field(
        &self,
        target: Queue,
        key: &str,
        value: &str,
        exclusive_of: &[Queue],
    ) -> StoreResult<Admission> {
        let mut guard = self.lock();
        if let Some(holder) = exclusive_of
            .iter()
            .copied()
            .find(|q| guard.get(q).is_some_and(|m| m.contains_key(key)))
        {
            return Ok(Admission::Held(holder));
        }
        let previous = guard
            .entry(target)
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        Ok(match previous {
            Some(_) => Admission::Refreshed,
            None => Admission::Inserted,
        })
    }
}
