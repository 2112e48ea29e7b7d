//! Error types for asset loading and configuration

use thiserror::Error;

/// Failure to turn asset bytes into a palette, shape or template
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    /// No asset with this name is available
    #[error("asset not found: {0}")]
    NotFound(String),
    /// Fewer bytes than the format requires
    #[error("truncated data: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    /// Header fields are out of range or inconsistent
    #[error("malformed header: {0}")]
    InvalidHeader(String),
    /// A frame entry points outside the data or uses an unsupported encoding
    #[error("invalid frame {index}: {reason}")]
    InvalidFrame { index: usize, reason: String },
}

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
