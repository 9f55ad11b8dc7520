//! Classified error handling.
//!
//! When a step fails, the machine passes the error through an
//! [`ErrorHandlerChain`]. Handlers are tried in order; the first one that
//! claims the error decides the outcome:
//!
//! | Kind               | User sees                   | Outcome  |
//! |--------------------|-----------------------------|----------|
//! | `AccessDenied`     | the message, or a default   | silenced |
//! | `PermissionDenied` | the message, or a default   | raised   |
//! | `Validation`       | the message                 | silenced |
//! | `InvalidArgument`  | the message                 | raised   |
//! | `Internal`         | nothing                     | silenced |
//!
//! Failing to send the answer is logged and never replaces the original
//! error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::command::ActionRequest;
use crate::error::CommandError;
use crate::interceptor::DEFAULT_DENIED_TEXT;

pub const DEFAULT_ACCESS_DENIED_TEXT: &str = "You do not have access to this command.";

/// What a handler decided about an error.
#[derive(Debug)]
pub enum ErrorFlow {
    /// Not mine; try the next handler.
    Continue(CommandError),
    /// Handled; the error keeps propagating.
    Raise(CommandError),
    /// Handled; the pass ends quietly.
    Silence,
}

/// One link of the [`ErrorHandlerChain`].
#[async_trait]
pub trait ErrorHandler: Send + Sync + 'static {
    async fn handle(&self, req: &ActionRequest, err: CommandError) -> ErrorFlow;
}

async fn answer(req: &ActionRequest, text: &str) {
    if let Err(err) = req.respond_text(text).await {
        error!(error = %err, "failed to send error answer");
    }
}

fn or_default<'a>(text: &'a str, default: &'a str) -> &'a str {
    if text.is_empty() { default } else { text }
}

#[derive(Debug, Clone, Copy)]
enum Builtin {
    AccessDenied,
    PermissionDenied,
    Validation,
    InvalidArgument,
    Internal,
}

#[async_trait]
impl ErrorHandler for Builtin {
    async fn handle(&self, req: &ActionRequest, err: CommandError) -> ErrorFlow {
        match (self, err) {
            (Self::AccessDenied, CommandError::AccessDenied(msg)) => {
                info!(chat_id = req.message().chat_id(), "access denied");
                answer(req, or_default(&msg, DEFAULT_ACCESS_DENIED_TEXT)).await;
                ErrorFlow::Silence
            }
            (Self::PermissionDenied, CommandError::PermissionDenied(msg)) => {
                info!(chat_id = req.message().chat_id(), "permission denied");
                answer(req, or_default(&msg, DEFAULT_DENIED_TEXT)).await;
                ErrorFlow::Raise(CommandError::PermissionDenied(msg))
            }
            (Self::Validation, CommandError::Validation(text)) => {
                answer(req, &text).await;
                ErrorFlow::Silence
            }
            (Self::InvalidArgument, CommandError::InvalidArgument(text)) => {
                answer(req, &text).await;
                ErrorFlow::Raise(CommandError::InvalidArgument(text))
            }
            (Self::Internal, CommandError::Internal(source)) => {
                error!(
                    command = req.command_name(),
                    action = req.action_name(),
                    error = %source,
                    "action failed"
                );
                ErrorFlow::Silence
            }
            (_, err) => ErrorFlow::Continue(err),
        }
    }
}

/// The ordered, short-circuiting list of error handlers.
///
/// Caller handlers added with [`with_handler`](Self::with_handler) run before
/// the built-in ones, in the order they were added, e.g. to render a custom
/// apology for internal errors. The built-ins claim every [`CommandError`]
/// kind, so a caller handler never sees an error they already decided.
#[derive(Clone, Default)]
pub struct ErrorHandlerChain {
    handlers: Vec<Arc<dyn ErrorHandler>>,
}

const BUILTINS: [Builtin; 5] = [
    Builtin::AccessDenied,
    Builtin::PermissionDenied,
    Builtin::Validation,
    Builtin::InvalidArgument,
    Builtin::Internal,
];

impl ErrorHandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: impl ErrorHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Runs the chain; returns the error that keeps propagating, if any.
    pub async fn resolve(&self, req: &ActionRequest, err: CommandError) -> Option<CommandError> {
        let mut err = err;

        for handler in &self.handlers {
            match handler.handle(req, err).await {
                ErrorFlow::Continue(e) => err = e,
                ErrorFlow::Raise(e) => return Some(e),
                ErrorFlow::Silence => return None,
            }
        }

        for handler in BUILTINS {
            match handler.handle(req, err).await {
                ErrorFlow::Continue(e) => err = e,
                ErrorFlow::Raise(e) => return Some(e),
                ErrorFlow::Silence => return None,
            }
        }

        Some(err)
    }
}
