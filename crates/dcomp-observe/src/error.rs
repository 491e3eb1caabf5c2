use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log format {0:?} (expected text or json)")]
    InvalidFormat(String),

    #[error("invalid log filter: {0}")]
    InvalidLevel(String),

    #[error("global logger already installed")]
    AlreadyInitialized,
}

pub type LoggerResult<T> = Result<T, LoggerError>;
