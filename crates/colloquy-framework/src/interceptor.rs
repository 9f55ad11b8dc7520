//! Stock interceptors.

use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::bus::{Interceptor, Next};
use crate::command::ActionRequest;
use crate::error::CommandError;

pub const DEFAULT_DENIED_TEXT: &str = "Access Denied.";
pub const DEFAULT_RETRY_TEXT: &str = "Please repeat again.";

// ============================================================================
// OnlyChats
// ============================================================================

/// Refuses steps for chats outside an allow-list. See [`only_chats`].
#[derive(Debug, Clone)]
pub struct OnlyChats {
    allowed: HashSet<String>,
    message: String,
}

/// Lets only the given chats through; others get
/// [`CommandError::PermissionDenied`] with [`DEFAULT_DENIED_TEXT`].
pub fn only_chats<I, S>(ids: I) -> OnlyChats
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    only_chats_with_message(ids, DEFAULT_DENIED_TEXT)
}

/// Like [`only_chats`] with a custom refusal text.
pub fn only_chats_with_message<I, S>(ids: I, message: impl Into<String>) -> OnlyChats
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    OnlyChats {
        allowed: ids.into_iter().map(Into::into).collect(),
        message: message.into(),
    }
}

#[async_trait]
impl Interceptor for OnlyChats {
    async fn intercept(&self, req: ActionRequest, next: Next) -> Result<(), CommandError> {
        if self.allowed.contains(req.message().chat_id()) {
            return next.run(req).await;
        }

        debug!(chat_id = req.message().chat_id(), "chat is not allowed");
        Err(CommandError::permission_denied(self.message.clone()))
    }
}

// ============================================================================
// PleaseRepeatAgain
// ============================================================================

/// Asks the user to repeat after an internal failure. See [`please_repeat_again`].
#[derive(Debug, Clone)]
pub struct PleaseRepeatAgain {
    message: String,
}

/// On [`CommandError::Internal`], sends [`DEFAULT_RETRY_TEXT`] to the chat.
/// The error itself is passed on unchanged.
pub fn please_repeat_again() -> PleaseRepeatAgain {
    please_repeat_again_with_message(DEFAULT_RETRY_TEXT)
}

/// Like [`please_repeat_again`] with a custom text.
pub fn please_repeat_again_with_message(message: impl Into<String>) -> PleaseRepeatAgain {
    PleaseRepeatAgain {
        message: message.into(),
    }
}

#[async_trait]
impl Interceptor for PleaseRepeatAgain {
    async fn intercept(&self, req: ActionRequest, next: Next) -> Result<(), CommandError> {
        let result = next.run(req.clone()).await;

        if let Err(err) = &result
            && err.is_internal()
            && let Err(send_err) = req.respond_text(self.message.clone()).await
        {
            error!(error = %send_err, "failed to send retry prompt");
        }

        result
    }
}

// ============================================================================
// LogActions
// ============================================================================

/// Logs every step with its outcome and duration. See [`log_actions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogActions;

pub fn log_actions() -> LogActions {
    LogActions
}

#[async_trait]
impl Interceptor for LogActions {
    async fn intercept(&self, req: ActionRequest, next: Next) -> Result<(), CommandError> {
        let command = req.command_name().to_owned();
        let action = req.action_name().to_owned();
        let started = Instant::now();

        let result = next.run(req).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => debug!(%command, %action, elapsed_ms, "action succeeded"),
            Err(err) => debug!(%command, %action, elapsed_ms, error = %err, "action failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bus::InterceptorBus;
    use crate::command::BoxedActionHandler;
    use crate::testing::{RecordingResponder, action_request_with};

    fn failing() -> BoxedActionHandler {
        Arc::new(|_req: ActionRequest| async {
            Err::<(), _>(CommandError::internal("db is down"))
        })
    }

    fn succeeding() -> BoxedActionHandler {
        Arc::new(|_req: ActionRequest| async { Ok::<_, CommandError>(()) })
    }

    #[tokio::test]
    async fn test_only_chats_allows_listed_chat() {
        let bus = InterceptorBus::new().with(only_chats(["42"]));
        let responder = RecordingResponder::new();
        bus.handle(action_request_with("42", responder.clone()), succeeding())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_only_chats_denies_other_chat() {
        let bus = InterceptorBus::new().with(only_chats_with_message(["42"], "go away"));
        let responder = RecordingResponder::new();
        let err = bus
            .handle(action_request_with("7", responder.clone()), succeeding())
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::PermissionDenied(msg) if msg == "go away"));
        // The refusal text is sent by the error handler chain, not here.
        assert!(responder.texts().is_empty());
    }

    #[tokio::test]
    async fn test_please_repeat_again_on_internal() {
        let bus = InterceptorBus::new().with(please_repeat_again());
        let responder = RecordingResponder::new();
        let err = bus
            .handle(action_request_with("chat", responder.clone()), failing())
            .await
            .unwrap_err();

        assert!(err.is_internal());
        assert_eq!(responder.texts(), [DEFAULT_RETRY_TEXT]);
    }

    #[tokio::test]
    async fn test_please_repeat_again_ignores_other_errors() {
        let bus = InterceptorBus::new().with(please_repeat_again());
        let responder = RecordingResponder::new();
        let handler: BoxedActionHandler = Arc::new(|_req: ActionRequest| async {
            Err::<(), _>(CommandError::invalid_argument("bad"))
        });

        bus.handle(action_request_with("chat", responder.clone()), handler)
            .await
            .unwrap_err();
        assert!(responder.texts().is_empty());
    }

    #[tokio::test]
    async fn test_please_repeat_again_survives_send_failure() {
        let bus = InterceptorBus::new().with(please_repeat_again());
        let responder = RecordingResponder::failing();
        let err = bus
            .handle(action_request_with("chat", responder.clone()), failing())
            .await
            .unwrap_err();

        assert!(err.is_internal());
        assert!(responder.texts().is_empty());
    }
}
