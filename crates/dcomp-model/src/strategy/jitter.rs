use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Controls how random jitter is applied to retry delays.
///
/// Jitter spreads retries of many callers that lost the coordination store at
/// the same moment, so they do not reconnect in lockstep.
///
/// Strategies:
/// - `None`: No jitter. Delays are deterministic.
/// - `Full`: Picks a random delay in `[0, base]`.
/// - `Equal`: Picks a delay in `[base/2, base]`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    /// No randomness applied.
    None,
    /// Delay uniformly sampled from `[0, base]`.
    Full,
    /// Delay sampled from the upper half `[base / 2, base]`.
    #[default]
    Equal,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "default" => Ok(JitterStrategy::Equal),
            "" | "none" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_strategies() {
        assert_eq!("none".parse::<JitterStrategy>().unwrap(), JitterStrategy::None);
        assert_eq!("".parse::<JitterStrategy>().unwrap(), JitterStrategy::None);
        assert_eq!("FULL".parse::<JitterStrategy>().unwrap(), JitterStrategy::Full);
        assert_eq!(" equal ".parse::<JitterStrategy>().unwrap(), JitterStrategy::Equal);
        assert!("decorrelated".parse::<JitterStrategy>().is_err());
    }
}
