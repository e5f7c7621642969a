//! Structured operation results for display callers

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};

/// `(success, message)` pair returned instead of an error
///
/// Used where the caller only needs something to show in a status bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Whether the operation took effect
    pub success: bool,
    /// Human-readable status
    pub message: String,
}

impl OperationOutcome {
    /// Successful outcome
    #[inline]
    #[must_use]
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed outcome
    #[inline]
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Failed outcome describing a registry error
    #[inline]
    #[must_use]
    pub fn from_error(error: &RegistryError) -> Self {
        Self::failed(error.user_message())
    }
}

impl From<RegistryError> for OperationOutcome {
    fn from(error: RegistryError) -> Self {
        Self::from_error(&error)
    }
}
