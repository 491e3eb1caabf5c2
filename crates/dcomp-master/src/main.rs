use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use dcomp_core::{
    Background, ConfigStore, RedisStore, TaskQueueStore, TimeoutSupervisor,
    config::DEFAULT_RELOAD_INTERVAL,
};
use dcomp_observe::{LoggerConfig, init_logger};
use dcomp_prometheus::PrometheusMetrics;

const DEFAULT_CONFIG_PATH: &str = "conf.json";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) logger
    init_logger(&LoggerConfig::from_env("DCOMP_LOG")?)?;

    // 2) configuration + reloader
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Arc::new(
        ConfigStore::open(&path).with_context(|| format!("cannot load configuration {path}"))?,
    );
    let reloader = config.spawn_reloader(DEFAULT_RELOAD_INTERVAL);

    // 3) coordination store
    let store = RedisStore::open(&config.snapshot().store)?;
    store
        .connect()
        .await
        .context("cannot reach coordination store")?;

    // 4) queue store + supervisor
    let metrics = PrometheusMetrics::new()?;
    let queue = TaskQueueStore::new(Arc::new(store), Arc::clone(&config))
        .with_metrics(Arc::new(metrics.clone()));
    let report = spawn_depth_report(queue.clone());
    let supervisor = Arc::new(TimeoutSupervisor::new(queue)).spawn();
    info!(config = %path, "dcomp master running");

    // 5) shutdown
    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for ctrl-c")?;
    info!("shutdown requested");

    supervisor.shutdown().await;
    report.shutdown().await;
    reloader.shutdown().await;

    match metrics.render() {
        Ok(text) => info!(metrics = %text, "final metrics"),
        Err(e) => warn!(error = %e, "cannot render metrics"),
    }
    Ok(())
}

/// Log queue depths every `health_report_interval`, re-read each round.
fn spawn_depth_report(queue: TaskQueueStore) -> Background {
    Background::spawn("depth-report", move |token| async move {
        loop {
            let every = queue.config().snapshot().health_report_interval();
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(every) => {}
            }
            match queue.depths().await {
                Ok(depths) => {
                    let line = depths
                        .iter()
                        .map(|(q, n)| format!("{q}={n}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    info!(depths = %line, "queue depths");
                }
                Err(e) => warn!(error = %e, "cannot read queue depths"),
            }
        }
    })
}
