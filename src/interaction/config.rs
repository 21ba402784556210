//! Engine configuration
//!
//! Validated settings for the payload budget and event storage, with a
//! builder and JSON file persistence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interaction::domain_types::{HeaderOverhead, MaxEventsPerPriority, Mtu};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed cross-validation.
    #[error("invalid configuration: {field} - {reason}")]
    ValidationError {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reading or writing a config file failed.
    #[error("I/O error: {source}")]
    IoError {
        /// The underlying I/O failure.
        #[from]
        source: std::io::Error,
    },

    /// A config file could not be parsed or serialized.
    #[error("serialization error: {source}")]
    SerializationError {
        /// The underlying serde failure.
        #[from]
        source: serde_json::Error,
    },
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Transport MTU the fragmenter budgets against.
    pub mtu: Mtu,
    /// Envelope overhead subtracted from the MTU per message.
    pub header_overhead: HeaderOverhead,
    /// Bound on each priority-banded event queue.
    pub max_events_per_priority: MaxEventsPerPriority,
}

impl EngineConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// The per-chunk payload budget: MTU minus header overhead.
    #[must_use]
    pub fn max_payload(&self) -> usize {
        self.mtu.as_usize() - self.header_overhead.as_usize()
    }

    /// Validates cross-field consistency.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` when the header overhead leaves
    /// no usable payload budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.header_overhead.as_usize() >= self.mtu.as_usize() {
            return Err(ConfigError::ValidationError {
                field: "header_overhead".to_string(),
                reason: "must be smaller than the MTU".to_string(),
            });
        }
        Ok(())
    }

    /// Saves the configuration as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O or serialization failure.
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O, parse, or validation failure.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mtu: Mtu::default(),
            header_overhead: HeaderOverhead::default(),
            max_events_per_priority: MaxEventsPerPriority::default(),
        }
    }
}

/// Builder for custom engine configurations.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Sets the transport MTU.
    #[must_use]
    pub fn mtu(mut self, mtu: Mtu) -> Self {
        self.config.mtu = mtu;
        self
    }

    /// Sets the per-message envelope overhead.
    #[must_use]
    pub fn header_overhead(mut self, overhead: HeaderOverhead) -> Self {
        self.config.header_overhead = overhead;
        self
    }

    /// Sets the per-priority event queue bound.
    #[must_use]
    pub fn max_events_per_priority(mut self, max: MaxEventsPerPriority) -> Self {
        self.config.max_events_per_priority = max;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` when cross-field validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
