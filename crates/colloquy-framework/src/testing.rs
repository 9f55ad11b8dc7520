//! Test doubles shared by the unit tests of this crate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use colloquy_core::{
    Answer, BoxedMessage, Media, Metrics, Receipt, Responder, ResponderError, SessionState,
    StoreOperation, TextMessage,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::command::{ActionRequest, Actions, Command, InterruptRequest, SessionHandle};
use crate::error::CommandError;
use crate::router::Router;

pub(crate) fn message(id: &str, chat_id: &str, body: &str) -> BoxedMessage {
    Arc::new(TextMessage::new(id, chat_id, body))
}

pub(crate) fn action_request(chat_id: &str) -> ActionRequest {
    action_request_with(chat_id, RecordingResponder::new())
}

pub(crate) fn action_request_with(chat_id: &str, responder: Arc<RecordingResponder>) -> ActionRequest {
    ActionRequest::new(
        message("1", chat_id, "text"),
        responder,
        SessionHandle::new(SessionState::new(chat_id, "test")),
        Arc::new(Router::new()),
        CancellationToken::new(),
        "test",
        "start",
    )
}

// ============================================================================
// RecordingResponder
// ============================================================================

/// Keeps every answer; optionally fails every send.
#[derive(Default)]
pub(crate) struct RecordingResponder {
    answers: Mutex<Vec<Answer>>,
    fail: bool,
}

impl RecordingResponder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.answers.lock().iter().map(|a| a.text.clone()).collect()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn respond(&self, answer: Answer) -> Result<Receipt, ResponderError> {
        if self.fail {
            return Err(ResponderError::send("responder is down"));
        }
        let mut answers = self.answers.lock();
        answers.push(answer);
        Ok(Receipt {
            message_id: answers.len().to_string(),
            chat_id: String::new(),
        })
    }

    async fn respond_media(&self, _media: Media) -> Result<Receipt, ResponderError> {
        Err(ResponderError::UnsupportedMedia("test"))
    }
}

// ============================================================================
// RecordingMetrics
// ============================================================================

/// Records every hook call as a short string.
#[derive(Default)]
pub(crate) struct RecordingMetrics {
    events: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl Metrics for RecordingMetrics {
    fn inc_finished(&self, command: &str) {
        self.push(format!("finished:{command}"));
    }

    fn inc_state_transition(&self, command: &str, from_state: &str, to_state: &str) {
        self.push(format!("transition:{command}:{from_state}->{to_state}"));
    }

    fn inc_interruption(&self, command: &str, from_state: &str, to_command: &str, allowed: bool) {
        self.push(format!("interrupt:{command}:{from_state}->{to_command}:{allowed}"));
    }

    fn inc_not_found(&self) {
        self.push("not_found".to_owned());
    }

    fn inc_action_handled(&self, command: &str, action: &str, code: &str) {
        self.push(format!("handled:{command}:{action}:{code}"));
    }

    fn observe_store_operation(&self, _store: &str, operation: StoreOperation, _elapsed: Duration) {
        self.push(format!("store:{operation}"));
    }
}

// ============================================================================
// StaticCommand
// ============================================================================

/// A command whose steps answer with their own name.
pub(crate) struct StaticCommand {
    description: String,
    steps: Vec<String>,
    interruptible: bool,
}

impl StaticCommand {
    pub(crate) fn new<'a>(description: &str, steps: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            description: description.to_owned(),
            steps: steps.into_iter().map(str::to_owned).collect(),
            interruptible: false,
        }
    }

    pub(crate) fn interruptible(mut self) -> Self {
        self.interruptible = true;
        self
    }
}

#[async_trait]
impl Command for StaticCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn actions(&self) -> Actions {
        self.steps.iter().fold(Actions::new(), |actions, step| {
            let text = step.clone();
            actions.then(step.clone(), move |req: ActionRequest| {
                let text = text.clone();
                async move {
                    req.respond_text(text).await?;
                    Ok::<(), CommandError>(())
                }
            })
        })
    }

    async fn interrupt(&self, _req: &InterruptRequest) -> Result<bool, CommandError> {
        Ok(self.interruptible)
    }
}
