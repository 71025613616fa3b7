//! Error types for the task channel.

use thiserror::Error;

/// Errors that can occur while setting up a task channel.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Failed to spawn the worker thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A configuration field holds a value outside its valid range
    #[error("invalid task configuration '{field}': {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Description of why the value is invalid.
        reason: &'static str,
    },
}

impl TaskError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        TaskError::InvalidConfig { field, reason }
    }
}
