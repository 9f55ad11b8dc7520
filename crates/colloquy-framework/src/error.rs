//! Error types for the dialog engine.
//!
//! Three families live here:
//!
//! - [`CommandError`]: the classification a step handler attaches to a failure
//! - [`RouterError`] / [`ChainError`]: registration-time failures
//! - [`DetermineError`] / [`MachineError`]: failures of one handling pass

use std::fmt;

use colloquy_core::{BoxError, ResponderError, StoreError};
use thiserror::Error;

// =============================================================================
// Command Errors
// =============================================================================

/// Code attached to the counted command error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    PermissionDenied,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::PermissionDenied => "PermissionDenied",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure returned by a step handler or an interceptor.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The user sent malformed input; the text is shown to them.
    #[error("{0}")]
    InvalidArgument(String),

    /// Access was refused; the text (or a default) is shown to the user.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Anything else. Never shown to the user.
    #[error("internal error: {0}")]
    Internal(#[source] BoxError),

    /// Input did not pass validation; the user is asked to try again.
    #[error("{0}")]
    Validation(String),

    /// Access was refused, without counting the refusal.
    #[error("access denied: {0}")]
    AccessDenied(String),
}

impl CommandError {
    pub fn invalid_argument(text: impl Into<String>) -> Self {
        Self::InvalidArgument(text.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    pub fn validation(text: impl Into<String>) -> Self {
        Self::Validation(text.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    /// The counted code of this error, if it has one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::InvalidArgument(_) => Some(ErrorCode::InvalidArgument),
            Self::PermissionDenied(_) => Some(ErrorCode::PermissionDenied),
            Self::Internal(_) => Some(ErrorCode::Internal),
            Self::Validation(_) | Self::AccessDenied(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<ResponderError> for CommandError {
    fn from(err: ResponderError) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        Self::Internal(Box::new(err))
    }
}

// =============================================================================
// Registration Errors
// =============================================================================

/// A command's action chain is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The command defines no steps.
    #[error("action chain is empty")]
    Empty,

    /// Two steps share a name.
    #[error("duplicate step `{0}`")]
    DuplicateStep(String),

    /// A branch defines no steps.
    #[error("branch `{0}` is empty")]
    EmptyBranch(String),

    /// Two branches share a name.
    #[error("duplicate branch `{0}`")]
    DuplicateBranch(String),

    /// A branch is named after a step other than its own entry step, so
    /// forwarding to the name would reach the step instead.
    #[error("branch `{0}` shadows a step of the same name")]
    BranchShadowsStep(String),
}

/// Errors returned by the [`Router`](crate::router::Router).
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("command `{0}` not found")]
    NotFound(String),

    #[error("command `{0}` already exists")]
    AlreadyExists(String),

    #[error("command `{command}` has an invalid action chain: {source}")]
    InvalidChain {
        command: String,
        #[source]
        source: ChainError,
    },
}

// =============================================================================
// Handling Errors
// =============================================================================

/// Errors raised while resolving the dialog of a message.
#[derive(Debug, Error)]
pub enum DetermineError {
    /// The message names no registered command. Handled by the fallback.
    #[error("command `{0}` not found")]
    CommandNotFound(String),

    /// Loading the stored state failed.
    #[error("failed to load session state: {0}")]
    Store(#[source] StoreError),

    /// The active command's interrupt policy failed.
    #[error("interrupt policy of `{command}` failed: {source}")]
    Interrupt {
        command: String,
        #[source]
        source: CommandError,
    },

    /// A stored state belongs to a command that is no longer registered.
    #[error("stored state refers to unknown command `{0}`")]
    UnknownStoredCommand(String),

    #[error("dialog not determined")]
    NotDetermined,
}

/// Errors returned by [`Machine::handle`](crate::machine::Machine::handle).
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Determine(#[from] DetermineError),

    /// A state names a step its command does not have.
    #[error("action `{state}` not found in command `{command}`")]
    ActionNotFound { command: String, state: String },

    /// A step failed with a classified error the handler chain re-raised.
    #[error("action `{command}/{action}` failed: {source}")]
    Command {
        command: String,
        action: String,
        #[source]
        source: CommandError,
    },

    /// Writing or deleting the session state failed.
    #[error("failed to persist session state: {0}")]
    Persist(#[source] StoreError),

    /// Forward directives kept re-entering past the configured ceiling.
    #[error("forward limit of {limit} exceeded in command `{command}`")]
    ForwardLimitExceeded { command: String, limit: usize },

    /// The pass was cancelled before it could finish.
    #[error("handling cancelled")]
    Cancelled,

    /// The command-not-found fallback could not answer.
    #[error("command-not-found fallback failed: {0}")]
    Fallback(#[source] ResponderError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Result type for a machine pass.
pub type MachineResult<T> = Result<T, MachineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            CommandError::invalid_argument("x").code(),
            Some(ErrorCode::InvalidArgument)
        );
        assert_eq!(
            CommandError::permission_denied("").code(),
            Some(ErrorCode::PermissionDenied)
        );
        assert_eq!(
            CommandError::internal("boom").code(),
            Some(ErrorCode::Internal)
        );
        assert_eq!(CommandError::validation("x").code(), None);
        assert_eq!(CommandError::access_denied("x").code(), None);
    }

    #[test]
    fn test_responder_error_is_internal() {
        let err: CommandError = ResponderError::UnsupportedMedia("video").into();
        assert!(err.is_internal());
    }

    #[test]
    fn test_invalid_argument_displays_text() {
        assert_eq!(
            CommandError::invalid_argument("invalid email").to_string(),
            "invalid email"
        );
    }
}
