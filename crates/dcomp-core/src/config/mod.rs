//! Hot-reloadable policy configuration.
//!
//! [`ConfigStore`] holds the active [`Config`] behind a single-writer lock and
//! hands out `Arc` snapshots. A reload parses and validates a complete record
//! first and only then swaps the pointer, so readers observe either the old or
//! the new record, never a mix of both.
mod document;
pub use document::{Config, StoreConfig};

mod error;
pub use error::ConfigError;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::background::Background;

/// Interval used by the daemon for periodic reloads.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(20);

/// Shared handle to a configuration store.
pub type ConfigHandle = Arc<ConfigStore>;

/// Owner of the active configuration record.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<Config>>,
    generation: AtomicU64,
}

impl ConfigStore {
    /// Load `path` and fail hard if it is unreadable or invalid.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let cfg = read_document(&path)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(cfg)),
            generation: AtomicU64::new(1),
        })
    }

    /// Store without a backing file. [`ConfigStore::load`] keeps the record as is.
    pub fn from_config(cfg: Config) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(cfg)),
            generation: AtomicU64::new(1),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current record. Never blocks on a reload in progress for longer than a pointer copy.
    pub fn snapshot(&self) -> Arc<Config> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Number of records that have been active, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Re-read the backing document and swap it in if valid.
    ///
    /// On error the previous record stays active.
    pub fn load(&self) -> Result<Arc<Config>, ConfigError> {
        let Some(path) = &self.path else {
            debug!("configuration has no backing file; keeping current record");
            return Ok(self.snapshot());
        };
        Ok(self.install(read_document(path)?))
    }

    /// Validate `doc` and swap it in if valid.
    pub fn load_str(&self, doc: &str) -> Result<Arc<Config>, ConfigError> {
        Ok(self.install(Config::from_json(doc)?))
    }

    fn install(&self, cfg: Config) -> Arc<Config> {
        let next = Arc::new(cfg);
        let prev = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if *prev != *next {
            info!(generation, "configuration reloaded");
        } else {
            debug!(generation, "configuration unchanged");
        }
        next
    }

    /// Reload the backing document every `every` until the handle is shut down.
    pub fn spawn_reloader(self: &Arc<Self>, every: Duration) -> Background {
        let store = Arc::clone(self);
        Background::spawn("config-reloader", move |token| async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            info!(every_ms = every.as_millis() as u64, "config reloader started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // File reads and `result_dir` creation block.
                        let loader = Arc::clone(&store);
                        match tokio::task::spawn_blocking(move || loader.load()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => {
                                warn!(error = %e, "configuration reload rejected; keeping previous record");
                            }
                            Err(e) => warn!(error = %e, "configuration reload task aborted"),
                        }
                    }
                }
            }
        })
    }
}

fn read_document(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_json(&raw)
}
