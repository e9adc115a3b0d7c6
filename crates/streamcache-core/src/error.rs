//! Error taxonomy for the replicated cache.

use std::fmt;

/// Errors produced by the cache, its publisher and its subscriber.
///
/// `Decode` and `UnknownMutationKind` never reach a cache caller: the
/// subscriber logs them and moves past the offending record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The change log did not acknowledge an append. No replica observed the
    /// mutation.
    #[error("Change log unavailable: {message}")]
    LogUnavailable { message: String },

    /// A record could not be parsed.
    #[error("Undecodable {method:?} record: {reason}")]
    Decode { method: String, reason: String },

    /// A mutation could not be serialized for publishing.
    #[error("Cannot encode {method:?} record: {reason}")]
    Encode { method: String, reason: String },

    /// A record named a method outside save/update/delete.
    #[error("Unknown mutation kind: {0:?}")]
    UnknownMutationKind(String),

    /// The order is neither cached nor present in the system of record.
    #[error("Order not found: {id}")]
    NotFound { id: String },

    /// The system of record failed for a reason other than absence.
    #[error("System of record error: {message}")]
    Backend { message: String },
}

impl CacheError {
    #[must_use]
    pub fn log_unavailable(message: impl Into<String>) -> Self {
        Self::LogUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn decode(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            method: method.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn encode(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            method: method.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn unknown_kind(method: impl Into<String>) -> Self {
        Self::UnknownMutationKind(method.into())
    }

    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_log_unavailable(&self) -> bool {
        matches!(self, Self::LogUnavailable { .. })
    }

    /// Returns `true` for per-record failures the subscriber skips over.
    #[must_use]
    pub fn is_recoverable_in_subscriber(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::UnknownMutationKind(_))
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LogUnavailable { .. } => ErrorCategory::Log,
            Self::Encode { .. } => ErrorCategory::Encode,
            Self::Decode { .. } | Self::UnknownMutationKind(_) => ErrorCategory::Decode,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Backend { .. } => ErrorCategory::Backend,
        }
    }
}

/// Categories of cache errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Log,
    Encode,
    Decode,
    NotFound,
    Backend,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Encode => write!(f, "encode"),
            Self::Decode => write!(f, "decode"),
            Self::NotFound => write!(f, "not_found"),
            Self::Backend => write!(f, "backend"),
        }
    }
}

/// Convenience result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::not_found("abc");
        assert_eq!(err.to_string(), "Order not found: abc");

        let err = CacheError::log_unavailable("connection refused");
        assert_eq!(err.to_string(), "Change log unavailable: connection refused");

        let err = CacheError::unknown_kind("upsert");
        assert_eq!(err.to_string(), "Unknown mutation kind: \"upsert\"");
    }

    #[test]
    fn test_error_predicates() {
        assert!(CacheError::not_found("a").is_not_found());
        assert!(!CacheError::backend("down").is_not_found());
        assert!(CacheError::log_unavailable("x").is_log_unavailable());

        assert!(CacheError::decode("save", "bad json").is_recoverable_in_subscriber());
        assert!(CacheError::unknown_kind("x").is_recoverable_in_subscriber());
        assert!(!CacheError::log_unavailable("x").is_recoverable_in_subscriber());
        assert!(!CacheError::not_found("x").is_recoverable_in_subscriber());
        assert!(!CacheError::encode("save", "x").is_recoverable_in_subscriber());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(CacheError::log_unavailable("x").category(), ErrorCategory::Log);
        assert_eq!(CacheError::unknown_kind("x").category(), ErrorCategory::Decode);
        assert_eq!(CacheError::not_found("x").category(), ErrorCategory::NotFound);
        assert_eq!(CacheError::backend("x").category(), ErrorCategory::Backend);
        assert_eq!(CacheError::encode("save", "x").category(), ErrorCategory::Encode);
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }
}
