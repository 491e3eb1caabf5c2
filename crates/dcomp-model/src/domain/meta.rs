use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;

/// Absolute expiry of an in-progress entry.
///
/// Serialized as `"never"` or `{"at": <unix ms>}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Deadline {
    /// Effective timeout was zero: the entry never expires.
    Never,
    /// Unix epoch milliseconds after which the entry is expired.
    At(u64),
}

impl Deadline {
    /// Deadline for an entry claimed at `now_ms` with the given effective timeout.
    ///
    /// `None` means unlimited and yields [`Deadline::Never`].
    pub fn after(now_ms: u64, timeout: Option<Duration>) -> Self {
        match timeout {
            None => Deadline::Never,
            Some(t) => {
                let ms = u64::try_from(t.as_millis()).unwrap_or(u64::MAX);
                Deadline::At(now_ms.saturating_add(ms))
            }
        }
    }

    /// Returns `true` once `now_ms` has reached the deadline.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self {
            Deadline::Never => false,
            Deadline::At(at) => now_ms >= *at,
        }
    }
}

/// Metadata stored as the hash field value of a queue entry.
///
/// The record belongs to whichever queue currently holds the key. `deadline`
/// is only meaningful while the key sits in the in-progress queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Number of times the task went back to todo after a timeout or failure.
    #[serde(default)]
    pub retry_count: u32,
    /// Unix epoch milliseconds when the key entered its current queue.
    #[serde(default)]
    pub enqueued_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,
    /// Token written by the claimer; lets it recognise its own claim when the
    /// store reply was lost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<u64>,
}

impl EntryMeta {
    /// Metadata for a freshly admitted task.
    pub fn fresh(now_ms: u64) -> Self {
        Self {
            retry_count: 0,
            enqueued_at_ms: now_ms,
            deadline: None,
            claim_token: None,
        }
    }

    /// Metadata after a worker claimed the entry with `token`.
    pub fn claimed(&self, now_ms: u64, timeout: Option<Duration>, token: u64) -> Self {
        Self {
            retry_count: self.retry_count,
            enqueued_at_ms: now_ms,
            deadline: Some(Deadline::after(now_ms, timeout)),
            claim_token: Some(token),
        }
    }

    /// Returns `true` if this in-progress record was written by the claim holding `token`.
    pub fn is_claimed_by(&self, token: u64) -> bool {
        self.claim_token == Some(token)
    }

    /// Metadata after an expiry or failure, with the retry counter bumped once.
    pub fn retried(&self, now_ms: u64) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            enqueued_at_ms: now_ms,
            deadline: None,
            claim_token: None,
        }
    }

    /// Metadata for a terminal queue, retry counter preserved.
    pub fn settled(&self, now_ms: u64) -> Self {
        Self {
            retry_count: self.retry_count,
            enqueued_at_ms: now_ms,
            deadline: None,
            claim_token: None,
        }
    }

    /// Returns `true` if the entry carries a deadline that `now_ms` has reached.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.deadline.is_some_and(|d| d.is_expired(now_ms))
    }

    /// Encode into the store field value.
    pub fn encode(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a store field value.
    ///
    /// Maintenance tooling writes bare keys with an empty value; those read as
    /// fresh metadata with an unknown enqueue time.
    pub fn decode(raw: &str) -> ModelResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(raw)?)
    }
}
