use std::path::PathBuf;

use thiserror::Error;

/// Error returned when a configuration document cannot become the active record.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Every violated constraint, in document order.
    #[error("configuration validation failed:{}", render(.0))]
    Invalid(Vec<String>),
}

fn render(violations: &[String]) -> String {
    violations.iter().map(|v| format!("\n- {v}")).collect()
}
