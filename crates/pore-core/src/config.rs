//! Resolver configuration
//!
//! [`ResolverConfig`] is plain serde data so it can live in a tool's settings
//! file. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

/// Errors while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a config
    #[error("invalid config toml: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tuning knobs for resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Allow the override-free fast path for plain constants
    pub rapid_cache_enabled: bool,
    /// Drop rapid-cache entries found stale instead of only skipping them
    pub purge_stale_rapid_entries: bool,
    /// Hard bound on read-parameter nodes walked in one default chain
    pub max_default_chain_length: usize,
    /// Bound on nested child expansion, initialization and reset checks
    pub max_expansion_depth: usize,
}

impl ResolverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With rapid cache enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_rapid_cache(mut self, enabled: bool) -> Self {
        self.rapid_cache_enabled = enabled;
        self
    }

    /// With stale rapid-cache purging enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_stale_purge(mut self, enabled: bool) -> Self {
        self.purge_stale_rapid_entries = enabled;
        self
    }

    /// With maximum default-chain length
    #[inline]
    #[must_use]
    pub fn with_max_default_chain_length(mut self, max: usize) -> Self {
        self.max_default_chain_length = max;
        self
    }

    /// With maximum expansion depth
    #[inline]
    #[must_use]
    pub fn with_max_expansion_depth(mut self, max: usize) -> Self {
        self.max_expansion_depth = max;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns error if the document does not parse or fails [`Self::validate`]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every bound is usable
    ///
    /// # Errors
    /// Returns error if a bound is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_default_chain_length == 0 {
            return Err(ConfigError::Invalid {
                field: "max_default_chain_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_expansion_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_expansion_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            rapid_cache_enabled: true,
            purge_stale_rapid_entries: true,
            max_default_chain_length: 64,
            max_expansion_depth: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolverConfig::new();
        assert!(config.rapid_cache_enabled);
        assert!(config.purge_stale_rapid_entries);
        assert_eq!(config.max_default_chain_length, 64);
        assert_eq!(config.max_expansion_depth, 16);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ResolverConfig::from_toml_str("rapid_cache_enabled = false\n").unwrap();
        assert!(!config.rapid_cache_enabled);
        assert_eq!(config.max_default_chain_length, 64);
    }

    #[test]
    fn zero_bounds_rejected() {
        let err = ResolverConfig::from_toml_str("max_expansion_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_expansion_depth", .. }));

        let config = ResolverConfig::new().with_max_default_chain_length(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = ResolverConfig::from_toml_str("max_expansion_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builders_chain() {
        let config = ResolverConfig::new()
            .with_rapid_cache(false)
            .with_stale_purge(false)
            .with_max_expansion_depth(4);
        assert!(!config.rapid_cache_enabled);
        assert!(!config.purge_stale_rapid_entries);
        assert_eq!(config.max_expansion_depth, 4);
    }
}
