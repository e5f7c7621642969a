//! Registry operation errors
//!
//! Transport failures are classified by HTTP-style status into the categories
//! a user can act on. Callers never see raw transport errors.

/// Classified registry failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// 401: credentials missing or rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 403: authenticated but not permitted
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 404: repository, tag or digest does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// 405: operation disabled on this registry
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// 429: throttled
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// 5xx
    #[error("server error ({status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Catalog listing is disabled or unimplemented
    #[error("repository listing is not supported by this registry")]
    ListingNotSupported,

    /// Connection-level or otherwise unclassified failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,
}

impl RegistryError {
    /// Classify a failed response by status
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            405 => Self::MethodNotAllowed(message),
            429 => Self::RateLimited(message),
            500..=599 => Self::ServerError { status, message },
            _ => Self::Transport(format!("unexpected status {status}: {message}")),
        }
    }

    /// Classify a failed catalog listing
    ///
    /// Registries without catalog support answer 404 or 405.
    #[must_use]
    pub fn from_listing_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            404 | 405 => Self::ListingNotSupported,
            _ => Self::from_status(status, message),
        }
    }

    /// Status code this error was classified from, if any
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::MethodNotAllowed(_) => Some(405),
            Self::RateLimited(_) => Some(429),
            Self::ServerError { status, .. } => Some(*status),
            Self::ListingNotSupported | Self::Transport(_) | Self::Cancelled => None,
        }
    }

    /// Check if the registry refused to list repositories
    #[inline]
    #[must_use]
    pub fn is_listing_unsupported(&self) -> bool {
        matches!(self, Self::ListingNotSupported)
    }

    /// Check if the operation was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if retrying later may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::ServerError { .. } | Self::Transport(_)
        )
    }

    /// Human-readable message for status displays
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(detail) => {
                format!("Authentication required. Please check your credentials. ({detail})")
            }
            Self::Forbidden(detail) => {
                format!("Access denied. You do not have permission for this operation. ({detail})")
            }
            Self::NotFound(detail) => format!("Not found: {detail}"),
            Self::MethodNotAllowed(detail) => {
                format!("The registry does not allow this operation. ({detail})")
            }
            Self::RateLimited(detail) => {
                format!("Rate limited by the registry. Try again later. ({detail})")
            }
            Self::ServerError { status, message } => {
                format!("Registry server error {status}: {message}")
            }
            Self::ListingNotSupported => {
                "The registry does not support listing repositories.".to_string()
            }
            Self::Transport(detail) => format!("Network error: {detail}"),
            Self::Cancelled => "Operation cancelled.".to_string(),
        }
    }
}
