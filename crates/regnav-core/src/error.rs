//! Error types for regnav core
//!
//! Navigation failures are never fatal to the session: they abort the
//! operation that raised them and leave the context store consistent.

use regnav_client::RegistryError;
use regnav_reference::ReferenceError;
use std::path::PathBuf;

/// Failure of a navigation step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// Reference text did not parse
    #[error("invalid reference: {0}")]
    Parse(#[from] ReferenceError),

    /// Registry collaborator failed
    #[error("registry error: {0}")]
    Registry(RegistryError),

    /// Reference points at a registry other than the connected one
    #[error("reference registry {actual} does not match connected registry {expected}")]
    CrossRegistry {
        /// Host of the connected registry
        expected: String,
        /// Host named in the reference
        actual: String,
    },

    /// No registry is connected
    #[error("no registry connected")]
    NoRegistry,

    /// No repository is selected
    #[error("no repository selected")]
    NoRepository,

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,
}

impl NavigationError {
    /// Check for cancellation
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if retrying the same request could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Registry(error) => error.is_retryable(),
            _ => false,
        }
    }
}

impl From<RegistryError> for NavigationError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::Cancelled => Self::Cancelled,
            other => Self::Registry(other),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// TOML did not match the schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending setting
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
