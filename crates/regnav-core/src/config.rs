//! Navigator configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session configuration
///
/// Loaded from TOML; every field has a default so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Buffer size of each notification channel
    pub event_capacity: usize,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Maximum referrer nesting below the root digest (`None` = unbounded)
    pub max_referrer_depth: Option<usize>,
    /// Resolve the digest of every listed tag
    pub resolve_tag_digests: bool,
}

impl NavigatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With notification buffer size
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With referrer depth limit
    #[inline]
    #[must_use]
    pub fn with_max_referrer_depth(mut self, depth: usize) -> Self {
        self.max_referrer_depth = Some(depth);
        self
    }

    /// With tag digest resolution switched on or off
    #[inline]
    #[must_use]
    pub fn with_resolve_tag_digests(mut self, resolve: bool) -> Self {
        self.resolve_tag_digests = resolve;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] for
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_capacity",
                reason: "must be greater than zero".into(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            log_filter: "info".into(),
            max_referrer_depth: None,
            resolve_tag_digests: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = NavigatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, NavigatorConfig::default());
        assert_eq!(config.event_capacity, 64);
        assert!(config.resolve_tag_digests);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = NavigatorConfig::from_toml_str(
            "log_filter = \"regnav_core=debug\"\nmax_referrer_depth = 3\n",
        )
        .unwrap();
        assert_eq!(config.log_filter, "regnav_core=debug");
        assert_eq!(config.max_referrer_depth, Some(3));
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let error = NavigatorConfig::from_toml_str("event_capacity = 0").unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { field: "event_capacity", .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let error = NavigatorConfig::from_toml_str("event_capacity = \"many\"").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "resolve_tag_digests = false").unwrap();

        let config = NavigatorConfig::load(file.path()).unwrap();
        assert!(!config.resolve_tag_digests);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = NavigatorConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn builder_sets_fields() {
        let config = NavigatorConfig::new()
            .with_event_capacity(8)
            .with_log_filter("warn")
            .with_max_referrer_depth(2)
            .with_resolve_tag_digests(false);
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.max_referrer_depth, Some(2));
        assert!(!config.resolve_tag_digests);
        assert!(config.validate().is_ok());
    }
}
