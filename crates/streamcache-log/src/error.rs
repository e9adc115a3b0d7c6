use streamcache_core::CacheError;

/// Errors that can occur while talking to the change log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// The log refused or could not acknowledge the operation.
    #[error("Change log unavailable: {0}")]
    Unavailable(String),

    /// Could not reach the log backend.
    #[error("Change log connection error: {0}")]
    Connection(String),

    /// The backend answered with something that is not a valid log entry.
    #[error("Change log protocol error: {0}")]
    Protocol(String),
}

impl LogError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// From the cache's point of view every log failure means the same thing:
/// the operation was not acknowledged.
impl From<LogError> for CacheError {
    fn from(err: LogError) -> Self {
        CacheError::log_unavailable(err.to_string())
    }
}
