use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{error::LoggerResult, format::LoggerFormat, level::LoggerLevel};

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive.
    pub level: LoggerLevel,
    /// Include the event target (module path).
    pub with_targets: bool,
    /// Colored text output; ignored for json and when stdout is not a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Defaults with the filter and format taken from the environment.
    ///
    /// `level_var` holds the filter directive and `<level_var>_FORMAT` the
    /// format. Unset variables keep the defaults; malformed ones are errors.
    pub fn from_env(level_var: &str) -> LoggerResult<Self> {
        let mut cfg = Self::default();
        if let Ok(level) = std::env::var(level_var) {
            cfg.level = level.parse()?;
        }
        if let Ok(format) = std::env::var(format!("{level_var}_FORMAT")) {
            cfg.format = format.parse()?;
        }
        Ok(cfg)
    }

    pub(crate) fn ansi(&self) -> bool {
        self.format == LoggerFormat::Text && self.use_color && std::io::stdout().is_terminal()
    }
}
