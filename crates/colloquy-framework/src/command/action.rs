//! Step handlers and the request they receive.
//!
//! A step handler is anything implementing [`ActionHandler`]. The trait is
//! implemented for async closures taking an [`ActionRequest`], and
//! [`ServiceHandler`] adapts any `tower::Service` so per-step tower layers
//! (timeouts, rate limits, ...) can be stacked on a step.
//!
//! # Example
//!
//! ```rust,ignore
//! Actions::new()
//!     .then("start", |req: ActionRequest| async move {
//!         req.respond_text("Enter user name").await?;
//!         Ok::<(), CommandError>(())
//!     })
//!     .then("name", |req: ActionRequest| async move {
//!         req.session().set("user.name", req.message().body());
//!         req.respond_text("Enter email").await?;
//!         Ok::<(), CommandError>(())
//!     })
//! ```

use std::future::Future;
use std::sync::Arc;

use colloquy_core::{Answer, BoxedMessage, BoxedResponder, Receipt, ResponderError, SessionState};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};

use crate::error::CommandError;
use crate::router::Router;

// ============================================================================
// SessionHandle
// ============================================================================

/// Shared access to the session state of the running pass.
///
/// Cloning the handle shares the same state; every clone sees writes made
/// through the others.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn chat_id(&self) -> String {
        self.inner.lock().chat_id().to_owned()
    }

    /// The current step name.
    pub fn name(&self) -> String {
        self.inner.lock().name().to_owned()
    }

    pub fn command_name(&self) -> String {
        self.inner.lock().command_name().to_owned()
    }

    /// Reads a data entry.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().get(key).map(str::to_owned)
    }

    /// Writes a data entry.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.lock().set(key, value);
    }

    /// Moves the dialog to `name` instead of the default successor.
    pub fn transit(&self, name: impl Into<String>) {
        self.inner.lock().transit(name);
    }

    /// Moves to `name` and runs it right away with the same message.
    pub fn forward(&self, name: impl Into<String>) {
        self.inner.lock().forward(name);
    }

    /// Runs the default successor right away with the same message.
    pub fn passthrough(&self) {
        self.inner.lock().passthrough();
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Copies the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().clone()
    }
}

// ============================================================================
// ActionRequest
// ============================================================================

/// Everything a step handler gets to work with.
#[derive(Clone)]
pub struct ActionRequest {
    message: BoxedMessage,
    responder: BoxedResponder,
    session: SessionHandle,
    router: Arc<Router>,
    cancel: CancellationToken,
    command: String,
    action: String,
}

impl ActionRequest {
    pub(crate) fn new(
        message: BoxedMessage,
        responder: BoxedResponder,
        session: SessionHandle,
        router: Arc<Router>,
        cancel: CancellationToken,
        command: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            message,
            responder,
            session,
            router,
            cancel,
            command: command.into(),
            action: action.into(),
        }
    }

    /// The inbound message being handled.
    pub fn message(&self) -> &BoxedMessage {
        &self.message
    }

    pub fn responder(&self) -> &BoxedResponder {
        &self.responder
    }

    /// The session state of this chat.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Registered commands, read-only.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Fires when the application is shutting down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Name of the command the step belongs to.
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Name of the step being run.
    pub fn action_name(&self) -> &str {
        &self.action
    }

    /// Sends an answer to the chat.
    pub async fn respond(&self, answer: Answer) -> Result<Receipt, ResponderError> {
        self.responder.respond(answer).await
    }

    /// Sends a text-only answer to the chat.
    pub async fn respond_text(&self, text: impl Into<String>) -> Result<Receipt, ResponderError> {
        self.respond(Answer::text(text)).await
    }
}

impl std::fmt::Debug for ActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRequest")
            .field("message", &self.message)
            .field("command", &self.command)
            .field("action", &self.action)
            .finish()
    }
}

// ============================================================================
// ActionHandler
// ============================================================================

/// The future returned by an [`ActionHandler`].
pub type ActionFuture = BoxFuture<'static, Result<(), CommandError>>;

/// Runs one step of a dialog.
pub trait ActionHandler: Send + Sync + 'static {
    fn call(&self, req: ActionRequest) -> ActionFuture;
}

impl<F, Fut> ActionHandler for F
where
    F: Fn(ActionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    fn call(&self, req: ActionRequest) -> ActionFuture {
        Box::pin((self)(req))
    }
}

/// A shared, type-erased step handler.
pub type BoxedActionHandler = Arc<dyn ActionHandler>;

/// Adapts a `tower::Service` into an [`ActionHandler`].
///
/// The service is cloned per call and driven with `oneshot`, so readiness is
/// honoured.
#[derive(Clone)]
pub struct ServiceHandler<S> {
    service: S,
}

impl<S> ServiceHandler<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S> ActionHandler for ServiceHandler<S>
where
    S: Service<ActionRequest, Response = (), Error = CommandError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    fn call(&self, req: ActionRequest) -> ActionFuture {
        Box::pin(self.service.clone().oneshot(req))
    }
}
