//! Failures raised while resolving or invoking a destination.
//!
//! Resolution failures are hard errors: they propagate to whoever asked for
//! the dispatch and are never retried.

use thiserror::Error;

/// Errors surfaced by [`Dispatch`](super::Dispatch) implementations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Destination text does not follow `Path:method` or `Path::function`.
    #[error("malformed destination '{destination}': {reason}")]
    MalformedDestination {
        /// Destination text as supplied.
        destination: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// No controller or function namespace is registered under the path.
    #[error("no controller or function registered at '{path}'")]
    PathNotFound {
        /// Path segment of the destination.
        path: String,
    },

    /// The path exists but does not expose the requested member.
    #[error("'{path}' has no callable '{member}'")]
    NotInvokable {
        /// Path segment of the destination.
        path: String,
        /// Method or function name.
        member: String,
    },

    /// A value could not be interpreted as a destination at all.
    #[error("unsupported destination type: {found}")]
    InvalidDestination {
        /// Description of the value that was supplied.
        found: String,
    },

    /// The invoked callable reported a failure.
    #[error("handler '{target}' failed: {message}")]
    Handler {
        /// Destination that failed.
        target: String,
        /// Failure reported by the handler.
        message: String,
    },

    /// Invariant violation inside the dispatcher.
    #[error("internal dispatch error: {message}")]
    Internal {
        /// Description of the violation.
        message: String,
    },
}

impl DispatchError {
    /// Creates a malformed destination error.
    #[must_use]
    pub fn malformed(destination: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedDestination {
            destination: destination.into(),
            reason,
        }
    }

    /// Creates a path-not-found error.
    #[must_use]
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Creates a not-invokable error.
    #[must_use]
    pub fn not_invokable(path: impl Into<String>, member: impl Into<String>) -> Self {
        Self::NotInvokable {
            path: path.into(),
            member: member.into(),
        }
    }

    /// Creates an invalid destination error.
    #[must_use]
    pub fn invalid_destination(found: impl Into<String>) -> Self {
        Self::InvalidDestination {
            found: found.into(),
        }
    }

    /// Creates a handler failure.
    #[must_use]
    pub fn handler(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error stems from the destination itself rather than from
    /// the handler it resolved to.
    #[must_use]
    pub const fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedDestination { .. }
                | Self::PathNotFound { .. }
                | Self::NotInvokable { .. }
                | Self::InvalidDestination { .. }
        )
    }
}
