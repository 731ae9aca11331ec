//! Cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`CompositeCache`](crate::CompositeCache)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached composites; unbounded when absent.
    ///
    /// When full, inserting a new identity evicts the oldest one.
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    /// Unbounded cache
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` composites
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
        }
    }

    /// Parse from TOML
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could never hold an entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == Some(0) {
            return Err(ConfigError::Invalid {
                message: "max_entries must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Error loading a [`CacheConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input is not valid TOML for this config
    #[error("Failed to parse cache config")]
    Parse(#[from] toml::de::Error),

    /// The values are out of range
    #[error("Invalid cache config: {message}")]
    Invalid { message: String },
}
