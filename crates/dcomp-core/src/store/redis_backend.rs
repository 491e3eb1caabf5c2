//! Redis backend: one hash per queue, Lua scripts for the atomic primitives.
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use dcomp_model::Queue;
use redis::{
    ConnectionAddr, ConnectionInfo, FromRedisValue, IntoConnectionInfo, RedisConnectionInfo,
    RedisError, RedisResult,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Admission, CoordinationStore};
use crate::{
    config::StoreConfig,
    error::{StoreError, StoreResult},
};

// KEYS: from, to. ARGV: field, expected, value.
const MOVE_SCRIPT: &str = r#"
local cur = redis.call('HGET', KEYS[1], ARGV[1])
if not cur or cur ~= ARGV[2] then
  return 0
end
redis.call('HDEL', KEYS[1], ARGV[1])
redis.call('HSET', KEYS[2], ARGV[1], ARGV[3])
return 1
"#;

// KEYS: target, exclusive... ARGV: field, value.
// Returns -1 inserted, -2 refreshed, n >= 1 held by KEYS[n + 1].
const ADMIT_SCRIPT: &str = r#"
for i = 2, #KEYS do
  if redis.call('HEXISTS', KEYS[i], ARGV[1]) == 1 then
    return i - 1
  end
end
if redis.call('HSET', KEYS[1], ARGV[1], ARGV[2]) == 1 then
  return -1
end
return -2
"#;

/// Coordination store on a Redis server.
///
/// Uses one multiplexed connection, re-established after a connection-level
/// failure.
pub struct RedisStore {
    client: redis::Client,
    connection: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

/// Connection parameters for `cfg`, handed to the client as-is.
fn connection_info(cfg: &StoreConfig) -> StoreResult<ConnectionInfo> {
    let mut settings = RedisConnectionInfo::default().set_db(i64::from(cfg.db));
    if let Some(pass) = &cfg.password {
        settings = settings.set_password(pass);
    }
    let info = ConnectionAddr::Tcp(cfg.host.clone(), cfg.port)
        .into_connection_info()
        .map_err(|e| StoreError::Unavailable(format!("invalid redis address: {e}")))?;
    Ok(info.set_redis_settings(settings))
}

/// Failures after which the connection is dropped and rebuilt.
fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

fn store_error(operation: &'static str, err: RedisError) -> StoreError {
    if is_connection_error(&err) {
        StoreError::Unavailable(format!("{operation}: {err}"))
    } else {
        StoreError::Rejected(format!("{operation}: {err}"))
    }
}

impl RedisStore {
    /// Build a store for the configured server. The connection is opened lazily.
    pub fn open(cfg: &StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(connection_info(cfg)?)
            .map_err(|e| StoreError::Unavailable(format!("invalid redis settings: {e}")))?;
        Ok(Self::with_client(client))
    }

    fn with_client(client: redis::Client) -> Self {
        Self {
            client,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the connection now instead of on first use.
    pub async fn connect(&self) -> StoreResult<()> {
        let mut guard = self.connection.lock().await;
        self.ensure_connection(&mut guard).await
    }

    async fn ensure_connection(
        &self,
        connection: &mut Option<redis::aio::MultiplexedConnection>,
    ) -> StoreResult<()> {
        if connection.is_some() {
            return Ok(());
        }
        *connection = Some(
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| StoreError::Unavailable(format!("connect: {e}")))?,
        );
        debug!("redis coordination store connected");
        Ok(())
    }

    /// Send `cmd` once. The outer error is a failed connect, the inner one the
    /// command's own result.
    async fn query_once<T>(
        &self,
        operation: &'static str,
        cmd: &redis::Cmd,
    ) -> StoreResult<RedisResult<T>>
    where
        T: FromRedisValue + Send,
    {
        let mut guard = self.connection.lock().await;
        self.ensure_connection(&mut guard).await?;
        let Some(conn) = guard.as_mut() else {
            return Err(StoreError::Unavailable("connection unavailable".into()));
        };
        let result = cmd.query_async(conn).await;
        if let Err(err) = &result {
            if is_connection_error(err) {
                warn!(operation, error = %err, "redis connection lost; reconnecting");
                *guard = None;
            }
        }
        Ok(result)
    }

    /// Run an idempotent command, resending it once after a connection-level failure.
    async fn run_command<T, F>(&self, operation: &'static str, build: F) -> StoreResult<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd + Send + Sync,
    {
        match self.query_once(operation, &build()).await? {
            Ok(value) => Ok(value),
            Err(err) if is_connection_error(&err) => {
                debug!(operation, "resending redis command after reconnect");
                self.query_once(operation, &build())
                    .await?
                    .map_err(|e| store_error(operation, e))
            }
            Err(err) => Err(store_error(operation, err)),
        }
    }

    /// Run a script exactly once.
    ///
    /// A lost reply looks the same as a lost request, so a connection failure
    /// surfaces as [`StoreError::Unavailable`] and the caller re-reads state.
    async fn run_script<T>(&self, operation: &'static str, cmd: redis::Cmd) -> StoreResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query_once(operation, &cmd)
            .await?
            .map_err(|e| store_error(operation, e))
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn set_field(&self, queue: Queue, key: &str, value: &str) -> StoreResult<()> {
        self.run_command::<(), _>("hset", || {
            let mut cmd = redis::cmd("HSET");
            cmd.arg(queue.store_key()).arg(key).arg(value);
            cmd
        })
        .await
    }

    async fn get_field(&self, queue: Queue, key: &str) -> StoreResult<Option<String>> {
        self.run_command("hget", || {
            let mut cmd = redis::cmd("HGET");
            cmd.arg(queue.store_key()).arg(key);
            cmd
        })
        .await
    }

    async fn delete_field(&self, queue: Queue, key: &str) -> StoreResult<bool> {
        let removed: i64 = self
            .run_command("hdel", || {
                let mut cmd = redis::cmd("HDEL");
                cmd.arg(queue.store_key()).arg(key);
                cmd
            })
            .await?;
        Ok(removed > 0)
    }

    async fn keys(&self, queue: Queue) -> StoreResult<Vec<String>> {
        self.run_command("hkeys", || {
            let mut cmd = redis::cmd("HKEYS");
            cmd.arg(queue.store_key());
            cmd
        })
        .await
    }

    async fn get_all(&self, queue: Queue) -> StoreResult<Vec<(String, String)>> {
        let all: HashMap<String, String> = self
            .run_command("hgetall", || {
                let mut cmd = redis::cmd("HGETALL");
                cmd.arg(queue.store_key());
                cmd
            })
            .await?;
        Ok(all.into_iter().collect())
    }

    async fn len(&self, queue: Queue) -> StoreResult<usize> {
        self.run_command("hlen", || {
            let mut cmd = redis::cmd("HLEN");
            cmd.arg(queue.store_key());
            cmd
        })
        .await
    }

    async fn move_field(
        &self,
        from: Queue,
        to: Queue,
        key: &str,
        expected: &str,
        value: &str,
    ) -> StoreResult<bool> {
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(MOVE_SCRIPT)
            .arg(2)
            .arg(from.store_key())
            .arg(to.store_key())
            .arg(key)
            .arg(expected)
            .arg(value);
        let moved: i64 = self.run_script("move_field", cmd).await?;
        Ok(moved == 1)
    }

    async fn admit_field(
        &self,
        target: Queue,
        key: &str,
        value: &str,
        exclusive_of: &[Queue],
    ) -> StoreResult<Admission> {
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(ADMIT_SCRIPT)
            .arg(1 + exclusive_of.len())
            .arg(target.store_key());
        for q in exclusive_of {
            cmd.arg(q.store_key());
        }
        cmd.arg(key).arg(value);
        let code: i64 = self.run_script("admit_field", cmd).await?;
        match code {
            -1 => Ok(Admission::Inserted),
            -2 => Ok(Admission::Refreshed),
            n => usize::try_from(n)
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| exclusive_of.get(i).copied())
                .map(Admission::Held)
                .ok_or_else(|| StoreError::Rejected(format!("admit_field: unexpected reply {n}"))),
        }
    }
}
