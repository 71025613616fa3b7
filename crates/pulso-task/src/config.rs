//! Task channel configuration, loadable from TOML.

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Sizing and pacing parameters for one task channel.
///
/// # TOML Format
///
/// ```toml
/// num_buffers = 16
/// num_channels = 2
/// block_size = 512
/// sample_rate = 44100.0
/// wait_timeout_ms = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfig {
    /// Blocks in flight between the worker and the consumer.
    pub num_buffers: usize,

    /// Channels the consumer side exposes (wrapped graph channels are
    /// addressed modulo its own count).
    pub num_channels: usize,

    /// Samples per channel per buffer.
    pub block_size: usize,

    /// Sample rate (Hz) the consumer side reports.
    pub sample_rate: f64,

    /// Upper bound on how long the worker parks before rechecking its
    /// queues and the exit flag.
    pub wait_timeout_ms: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            num_buffers: 16,
            num_channels: 1,
            block_size: 512,
            sample_rate: 44_100.0,
            wait_timeout_ms: 10,
        }
    }
}

impl TaskConfig {
    /// Parse a configuration from a TOML string and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, TaskError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.num_buffers < 2 {
            return Err(TaskError::invalid("num_buffers", "must be at least 2"));
        }
        if self.num_channels == 0 {
            return Err(TaskError::invalid("num_channels", "must be at least 1"));
        }
        if self.block_size == 0 {
            return Err(TaskError::invalid("block_size", "must be at least 1"));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(TaskError::invalid(
                "sample_rate",
                "must be finite and positive",
            ));
        }
        if self.wait_timeout_ms == 0 {
            return Err(TaskError::invalid("wait_timeout_ms", "must be nonzero"));
        }
        Ok(())
    }
}
