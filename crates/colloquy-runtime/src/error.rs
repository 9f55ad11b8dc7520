//! Runtime error types.

use colloquy_core::{BoxError, MessengerError};
use colloquy_framework::RouterError;
use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur while building or running an application.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command could not be registered.
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),

    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),
}

/// Errors of the button callback registry.
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("callback not found: {0}")]
    NotFound(String),

    #[error("callback store failed: {0}")]
    Backend(#[source] BoxError),
}

impl CallbackError {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
