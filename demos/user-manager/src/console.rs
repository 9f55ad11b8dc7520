//! A stdin/stdout messenger.
//!
//! Every line typed is a message of one fixed chat. Choices and buttons of
//! the last answer are printed as a numbered list; typing a number presses
//! the matching entry through the [`CallbackManager`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use colloquy::prelude::*;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Callback ids of the numbered entries currently on screen.
type Pending = Arc<Mutex<Vec<String>>>;

pub struct ConsoleMessenger {
    chat_id: String,
    callbacks: Arc<CallbackManager>,
    pending: Pending,
    next_id: AtomicU64,
}

impl ConsoleMessenger {
    pub fn new(chat_id: impl Into<String>, callbacks: Arc<CallbackManager>) -> Self {
        Self {
            chat_id: chat_id.into(),
            callbacks,
            pending: Pending::default(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Turns a typed line into a message, resolving numbered picks.
    async fn to_message(&self, line: &str) -> BoxedMessage {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();

        let picked = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.pending.lock().get(i).cloned());

        if let Some(callback_id) = picked {
            match self.callbacks.press(&callback_id).await {
                Ok(callback) => {
                    self.pending.lock().clear();
                    return Arc::new(callback.into_message(id, &self.chat_id));
                }
                Err(err) => warn!(callback_id = %callback_id, error = %err, "stale choice"),
            }
        }

        Arc::new(TextMessage::new(id, &self.chat_id, line.trim()))
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    fn name(&self) -> &str {
        "console"
    }

    async fn listen(
        &self,
        sender: mpsc::Sender<BoxedMessage>,
        cancel: CancellationToken,
    ) -> Result<(), MessengerError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line.map_err(|e| MessengerError::Listen(Box::new(e)))?,
            };

            let Some(line) = line else {
                debug!("stdin closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let msg = self.to_message(&line).await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = sender.send(msg) => sent.map_err(|_| MessengerError::ChannelClosed)?,
            }
        }

        Ok(())
    }

    fn responder(&self, chat_id: &str) -> BoxedResponder {
        Arc::new(ConsoleResponder {
            chat_id: chat_id.to_string(),
            callbacks: Arc::clone(&self.callbacks),
            pending: Arc::clone(&self.pending),
        })
    }

    async fn close(&self) -> Result<(), MessengerError> {
        self.callbacks.close().await;
        Ok(())
    }
}

struct ConsoleResponder {
    chat_id: String,
    callbacks: Arc<CallbackManager>,
    pending: Pending,
}

#[async_trait]
impl Responder for ConsoleResponder {
    async fn respond(&self, answer: Answer) -> Result<Receipt, ResponderError> {
        let mut out = answer.text;
        let mut ids = Vec::new();

        let options = answer
            .choice
            .values
            .into_iter()
            .map(|item| (item.title, CallbackPayload::Enum(item.value)));
        let buttons = answer.buttons.into_iter().map(|button| match button {
            Button::Command { title, args } => (title, CallbackPayload::Command(args)),
        });

        for (title, payload) in options.chain(buttons) {
            let callback = self.callbacks.bind(payload).await.map_err(ResponderError::send)?;
            ids.push(callback.id);
            out.push_str(&format!("\n  {}) {title}", ids.len()));
        }

        if !answer.menu.is_empty() {
            out.push_str(&format!("\n  [{}]", answer.menu.join("] [")));
        }

        if !ids.is_empty() {
            *self.pending.lock() = ids;
        }
        println!("{out}");

        Ok(Receipt {
            message_id: String::new(),
            chat_id: self.chat_id.clone(),
        })
    }

    async fn respond_media(&self, _media: Media) -> Result<Receipt, ResponderError> {
        Err(ResponderError::UnsupportedMedia("the console only prints text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<CallbackManager> {
        Arc::new(CallbackManager::start(
            &Default::default(),
            Arc::new(MemoryCallbackStore::new()),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_numbered_pick_resolves_callback() {
        let messenger = ConsoleMessenger::new("console", manager());
        let responder = messenger.responder("console");

        responder
            .respond(
                Answer::text("Select user type")
                    .with_choice(Enum::from_pairs([("int", "internal"), ("ext", "external")]))
                    .with_button(Button::command("Change name", DialogArgs::new("add", "rename"))),
            )
            .await
            .unwrap();
        assert_eq!(messenger.pending.lock().len(), 3);

        let msg = messenger.to_message("2").await;
        assert_eq!(msg.body(), "ext");
        assert!(messenger.pending.lock().is_empty());

        messenger.callbacks.close().await;
    }

    #[tokio::test]
    async fn test_button_pick_carries_args() {
        let messenger = ConsoleMessenger::new("console", manager());
        let args = DialogArgs::new("add", "rename");

        messenger
            .responder("console")
            .respond(Answer::text("Save?").with_button(Button::command("Change name", args.clone())))
            .await
            .unwrap();

        let msg = messenger.to_message("1").await;
        assert_eq!(msg.args(), Some(&args));
        assert_eq!(msg.chat_id(), "console");

        messenger.callbacks.close().await;
    }

    #[tokio::test]
    async fn test_plain_lines_pass_through() {
        let messenger = ConsoleMessenger::new("console", manager());

        let msg = messenger.to_message("  7 ").await;
        assert_eq!(msg.body(), "7");
        assert!(msg.args().is_none());

        let msg = messenger.to_message("/add").await;
        assert_eq!(msg.command_name(), Some("add"));

        messenger.callbacks.close().await;
    }
}
