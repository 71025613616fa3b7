//! Process-wide graph defaults, loadable from TOML.
//!
//! The defaults feed the shared geometry variables: units built with no
//! block-size or sample-rate preference fall back to whatever the config
//! applied. Apply a config before constructing any graph; channels that
//! already negotiated their geometry keep it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::variable::{BlockSize, SampleRate};

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field holds a value outside its valid range
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Description of why the value is invalid.
        reason: String,
    },
}

/// Process-wide defaults for newly built graphs.
///
/// # TOML Format
///
/// ```toml
/// default_block_size = 512
/// default_sample_rate = 44100.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Block size adopted by channels with no stated preference.
    pub default_block_size: usize,

    /// Sample rate (Hz) adopted by channels with no stated preference.
    pub default_sample_rate: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_block_size: 512,
            default_sample_rate: 44_100.0,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from a TOML string and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_block_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.default_sample_rate.is_finite() && self.default_sample_rate > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "default_sample_rate",
                reason: format!("must be finite and positive, got {}", self.default_sample_rate),
            });
        }
        Ok(())
    }

    /// Install these defaults into the shared geometry variables for the
    /// current thread.
    pub fn apply(&self) {
        BlockSize::set_default(self.default_block_size);
        SampleRate::set_default(self.default_sample_rate);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            block_size = self.default_block_size,
            sample_rate = self.default_sample_rate,
            "applied graph defaults"
        );
    }
}
