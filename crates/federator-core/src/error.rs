use thiserror::Error;

/// Rejection of a trace fragment by a [`TraceMerger`](crate::merger::TraceMerger).
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("trace exceeds max size (size: {size} bytes, max: {limit} bytes)")]
    TraceTooLarge { size: usize, limit: usize },
    #[error("failed to size trace fragment: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("expected {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
