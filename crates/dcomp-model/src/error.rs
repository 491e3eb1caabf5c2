use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid task format: {reason} (raw: {raw:?})")]
    InvalidFormat { raw: String, reason: String },

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("invalid entry metadata: {0}")]
    InvalidMeta(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn format(raw: &str, reason: impl Into<String>) -> Self {
        ModelError::InvalidFormat {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
