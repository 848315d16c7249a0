//! Error types for token hashing and locality lookups.

use std::time::Duration;

/// Errors surfaced by the cache-locality layer.
#[derive(Debug, thiserror::Error)]
pub enum LocalityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, LocalityError>;
