use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Import-time policy for records whose `vernr` already exists in the
/// target collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Always mint a new identity; duplicates accumulate.
    #[default]
    Keep,
    /// Drop incoming records whose key is already stored.
    Skip,
    /// Overwrite the stored record in place, reusing its identity.
    Replace,
}

#[derive(Debug, Clone, Error)]
#[error("unknown duplicate strategy: '{0}' (expected keep, skip or replace)")]
pub struct StrategyParseError(String);

impl FromStr for DuplicateStrategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(DuplicateStrategy::Keep),
            "skip" => Ok(DuplicateStrategy::Skip),
            "replace" => Ok(DuplicateStrategy::Replace),
            other => Err(StrategyParseError(other.to_string())),
        }
    }
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateStrategy::Keep => write!(f, "keep"),
            DuplicateStrategy::Skip => write!(f, "skip"),
            DuplicateStrategy::Replace => write!(f, "replace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_strategies() {
        assert_eq!("keep".parse::<DuplicateStrategy>().unwrap(), DuplicateStrategy::Keep);
        assert_eq!("SKIP".parse::<DuplicateStrategy>().unwrap(), DuplicateStrategy::Skip);
        assert_eq!(" replace ".parse::<DuplicateStrategy>().unwrap(), DuplicateStrategy::Replace);
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!("merge".parse::<DuplicateStrategy>().is_err());
    }

    #[test]
    fn default_is_keep() {
        assert_eq!(DuplicateStrategy::default(), DuplicateStrategy::Keep);
    }

    #[test]
    fn display_roundtrip() {
        for s in [DuplicateStrategy::Keep, DuplicateStrategy::Skip, DuplicateStrategy::Replace] {
            assert_eq!(s.to_string().parse::<DuplicateStrategy>().unwrap(), s);
        }
    }
}
