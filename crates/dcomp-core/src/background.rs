//! Owned handles for periodic background activities.
//!
//! Each activity runs as a tokio task driven by a [`CancellationToken`]. The
//! owner stops it with [`Background::shutdown`], which cancels and joins.
//! Dropping the handle without calling `shutdown` still cancels the task.
use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to a running background task.
pub struct Background {
    name: &'static str,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Background {
    /// Spawn `body` on the current tokio runtime.
    ///
    /// `body` receives the cancellation token and must return once it fires.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(body(token.clone()));
        debug!(task = name, "background task spawned");
        Self {
            name,
            token,
            handle: Some(handle),
        }
    }

    /// Task name used in logs.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` once the task body has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(task = self.name, error = %e, "background task ended abnormally");
                return;
            }
        }
        info!(task = self.name, "background task stopped");
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
