//! Tracing subscriber setup shared by dcomp binaries.
mod config;
mod error;
mod format;
mod level;
mod timer;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;
pub use timer::UtcRfc3339;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a global subscriber is
/// already set.
///
/// ```no_run
/// use dcomp_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let registry = tracing_subscriber::registry().with(cfg.level.to_env_filter());
    let layer = fmt::layer()
        .with_target(cfg.with_targets)
        .with_timer(UtcRfc3339)
        .with_ansi(cfg.ansi());

    let res = match cfg.format {
        LoggerFormat::Text => registry.with(layer).try_init(),
        LoggerFormat::Json => registry.with(layer.json()).try_init(),
    };
    res.map_err(|_| LoggerError::AlreadyInitialized)
}
