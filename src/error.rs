//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to make a policy change durable.
///
/// Returned by every policy mutation. When this comes back the in-memory
/// policy is unchanged, so the caller must treat the mutation as not applied.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to encode policy state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write policy state to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid or missing configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}
