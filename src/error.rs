//! Error types for optikv
//!
//! The commit path has exactly one domain failure: the transaction
//! conflict, which is retryable. Everything else a caller can get wrong
//! (reusing a finished handle, committing on a dropped database) is a
//! programming error and panics instead of being encoded here.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for all optikv operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Validation detected a read-write conflict at commit time.
    ///
    /// Retryable: the transaction was discarded without touching committed
    /// state, and re-running it against fresh data may succeed. The retry
    /// driver in [`crate::retry`] handles this automatically.
    #[error("transaction conflict: {reason}")]
    Conflict {
        /// Human-readable description of the conflicting commit.
        reason: String,
    },

    /// Invariant violation inside the engine.
    ///
    /// Never produced by a correct sequence of operations; surfaced instead
    /// of being swallowed so bugs are visible.
    #[error("internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl Error {
    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        Error::Conflict {
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a commit-time conflict and the transaction can
    /// be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}
