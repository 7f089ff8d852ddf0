//! Error types for deadline-reminder.

use thiserror::Error;

/// Errors that can occur while reading deadlines or syncing them to a remote calendar.
#[derive(Error, Debug)]
pub enum DeadlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeouts and connection failures. Retried on the next pass.
    #[error("Remote request failed transiently: {0}")]
    Transient(String),

    #[error("Remote rate limit exceeded: {0}")]
    RateLimited(String),

    /// The remote accepted the credentials but refused the call (quota, validation, ...).
    #[error("Remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No remote calendar whose name starts with '{0}'")]
    CalendarNotFound(String),

    #[error("A sync pass is already running")]
    SyncInProgress,

    /// Reconciliation reached a state that should be impossible. Aborts the pass.
    #[error("Reconciliation invariant violated: {0}")]
    Invariant(String),
}

impl DeadlineError {
    /// Whether the failure is worth retrying on the next scheduled pass without
    /// counting it against the credential.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeadlineError::Transient(_) | DeadlineError::RateLimited(_)
        )
    }

    /// Failure of the local files rather than of the remote calendar.
    pub fn is_local(&self) -> bool {
        matches!(self, DeadlineError::Storage(_) | DeadlineError::Io(_))
    }
}

impl From<serde_json::Error> for DeadlineError {
    fn from(e: serde_json::Error) -> Self {
        DeadlineError::Serialization(e.to_string())
    }
}

/// Result type alias for deadline-reminder operations.
pub type DeadlineResult<T> = Result<T, DeadlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_classification() {
        assert!(DeadlineError::Storage("disk full".into()).is_local());
        assert!(!DeadlineError::Storage("disk full".into()).is_transient());
        assert!(!DeadlineError::Auth("expired".into()).is_local());
    }

    #[test]
    fn test_transient_classification() {
        assert!(DeadlineError::Transient("timeout".into()).is_transient());
        assert!(DeadlineError::RateLimited("403".into()).is_transient());
        assert!(
            !DeadlineError::Rejected {
                status: 400,
                message: "bad".into()
            }
            .is_transient()
        );
        assert!(!DeadlineError::Invariant("x".into()).is_transient());
    }
}
