//! Error types shared by the core contracts.
//!
//! Engine-level errors (command classification, routing, the state machine)
//! live in `colloquy-framework`.

use thiserror::Error;

/// Type-erased error used for opaque backend and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Store Errors
// =============================================================================

/// Errors returned by a [`StateStore`](crate::store::StateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No session state is stored for the requested chat.
    #[error("state not found")]
    NotFound,

    /// The backing store failed.
    #[error("state store failure: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    /// Wraps a backend failure.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

// =============================================================================
// Responder Errors
// =============================================================================

/// Errors returned while answering a chat.
///
/// These are plain I/O failures and are never classified as command errors.
#[derive(Debug, Error)]
pub enum ResponderError {
    /// Sending failed on the messenger side.
    #[error("failed to send answer: {0}")]
    Send(#[source] BoxError),

    /// The messenger cannot render this kind of media.
    #[error("unsupported media: {0}")]
    UnsupportedMedia(&'static str),
}

impl ResponderError {
    /// Wraps a send failure.
    pub fn send(err: impl Into<BoxError>) -> Self {
        Self::Send(err.into())
    }
}

// =============================================================================
// Messenger Errors
// =============================================================================

/// Errors raised by a [`Messenger`](crate::messenger::Messenger) adapter.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// Receiving updates from the platform failed.
    #[error("failed to listen for messages: {0}")]
    Listen(#[source] BoxError),

    /// The ingestion channel was closed by the consumer.
    #[error("ingestion channel closed")]
    ChannelClosed,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for state store operations.
pub type StoreResult<T> = Result<T, StoreError>;
