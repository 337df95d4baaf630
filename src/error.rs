//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! Only construction and configuration can fail. Cache operations report
//! absence through `Option` and never return an error.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for building a cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Configuration value out of range or unparseable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// TTL requires a Tokio runtime for the reaper and none was available
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
