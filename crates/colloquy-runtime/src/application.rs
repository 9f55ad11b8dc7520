//! The application: wiring plus the message worker loop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use colloquy_runtime::Application;
//!
//! let mut app = Application::from_config(config, ConsoleMessenger::new());
//! app.add_command("add", AddUser)?;
//! app.run().await?;
//! ```
//!
//! `run` spawns the messenger listener, which feeds a bounded channel, and
//! handles the messages one at a time in arrival order. A failed message is
//! logged and the loop goes on. The loop ends on Ctrl+C, when the caller's
//! token is cancelled, or when the messenger stops.

use std::sync::Arc;

use colloquy_core::{
    BoxedMessage, BoxedMessenger, BoxedStore, InstrumentedStore, MemoryStore, Messenger, Metrics,
    NoopMetrics, PriorityStore,
};
use colloquy_framework::{
    Command, CommandNotFoundFallback, ErrorHandlerChain, Interceptor, InterceptorBus, Machine,
    Request, Router, StartCommand, StaticFallback, SuggestFallback, only_chats,
    only_chats_with_message, please_repeat_again_with_message,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ColloquyConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

const START_DESCRIPTION: &str = "list available commands";

/// A dialog bot: one messenger, one router, one state store.
pub struct Application {
    config: ColloquyConfig,
    messenger: BoxedMessenger,
    router: Router,
    store: BoxedStore,
    priority_store: Option<BoxedStore>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    errors: ErrorHandlerChain,
    fallback: Option<Arc<dyn CommandNotFoundFallback>>,
    metrics: Arc<dyn Metrics>,
}

impl Application {
    /// Creates an application configured from the current directory.
    ///
    /// Falls back to the default configuration if loading fails.
    pub fn new(messenger: impl Messenger) -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: failed to load config ({e}), using defaults");
                ColloquyConfig::default()
            });

        Self::from_config(config, messenger)
    }

    /// Creates an application and installs logging from `config`.
    pub fn from_config(config: ColloquyConfig, messenger: impl Messenger) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            messenger = messenger.name(),
            "application initialized from configuration"
        );

        Self {
            config,
            messenger: Arc::new(messenger),
            router: Router::new(),
            store: Arc::new(MemoryStore::new()),
            priority_store: None,
            interceptors: Vec::new(),
            errors: ErrorHandlerChain::new(),
            fallback: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn config(&self) -> &ColloquyConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Registers a command under `name`.
    pub fn add_command(&mut self, name: impl Into<String>, command: impl Command) -> RuntimeResult<()> {
        let name = name.into();
        self.router.add(name.clone(), command)?;
        debug!(command = %name, "command registered");
        Ok(())
    }

    /// Replaces the default in-memory state store.
    pub fn with_store(mut self, store: BoxedStore) -> Self {
        self.store = store;
        self
    }

    /// Store for the commands listed in `storage.priority_commands`.
    pub fn with_priority_store(mut self, store: BoxedStore) -> Self {
        self.priority_store = Some(store);
        self
    }

    /// Adds an interceptor inside the ones derived from the `access` section.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_error_handlers(mut self, errors: ErrorHandlerChain) -> Self {
        self.errors = errors;
        self
    }

    /// Overrides the fallback chosen from the `engine` section.
    pub fn with_fallback(mut self, fallback: impl CommandNotFoundFallback) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    // =========================================================================
    // Assembly
    // =========================================================================

    fn build_store(&mut self) -> BoxedStore {
        let base = Arc::clone(&self.store);
        let priority = &self.config.storage.priority_commands;

        let store: BoxedStore = match self.priority_store.take() {
            Some(priority_store) if !priority.is_empty() => {
                info!(commands = ?priority, "routing priority commands to dedicated store");
                Arc::new(PriorityStore::new(priority.iter().cloned(), priority_store, base))
            }
            Some(_) => {
                warn!("priority store set but storage.priority_commands is empty, ignoring it");
                base
            }
            None => {
                if !priority.is_empty() {
                    warn!("storage.priority_commands set without a priority store, ignoring it");
                }
                base
            }
        };

        Arc::new(InstrumentedStore::new(store, Arc::clone(&self.metrics)))
    }

    fn build_bus(&self) -> InterceptorBus {
        let access = &self.config.access;
        let mut bus = InterceptorBus::new();

        if !access.allowed_chats.is_empty() {
            let chats = access.allowed_chats.iter().cloned();
            bus = match &access.denied_text {
                Some(text) => bus.with(only_chats_with_message(chats, text.clone())),
                None => bus.with(only_chats(chats)),
            };
        }

        if let Some(text) = &access.retry_text {
            bus = bus.with(please_repeat_again_with_message(text.clone()));
        }

        self.interceptors
            .iter()
            .fold(bus, |bus, interceptor| bus.with_shared(Arc::clone(interceptor)))
    }

    fn build_fallback(&self) -> Arc<dyn CommandNotFoundFallback> {
        if let Some(fallback) = &self.fallback {
            return Arc::clone(fallback);
        }
        if self.config.engine.suggest_commands {
            Arc::new(SuggestFallback::new())
        } else {
            Arc::new(StaticFallback::new(self.config.engine.not_found_text.clone()))
        }
    }

    /// Freezes the router and assembles the machine.
    fn into_machine(mut self) -> RuntimeResult<(Machine, BoxedMessenger, usize)> {
        validate_config(&self.config)?;

        let start = self.config.engine.start_command.clone();
        if !start.is_empty() && !self.router.contains(&start) {
            self.router
                .add(start.clone(), StartCommand::new().with_description(START_DESCRIPTION))?;
        }

        let store = self.build_store();
        let bus = self.build_bus();
        let fallback = self.build_fallback();
        let router = Arc::new(std::mem::take(&mut self.router));

        info!(
            commands = router.len(),
            interceptors = bus.len(),
            "router frozen"
        );

        let machine = Machine::new(router, store)
            .with_bus(bus)
            .with_error_handlers(self.errors)
            .with_shared_fallback(fallback)
            .with_metrics(self.metrics)
            .with_max_forwards(self.config.engine.max_forwards);

        Ok((machine, self.messenger, self.config.worker.queue_size))
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Runs until Ctrl+C or until the messenger stops.
    pub async fn run(self) -> RuntimeResult<()> {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();

        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C, shutting down");
                on_signal.cancel();
            }
        });

        self.run_until_cancelled(cancel).await
    }

    /// Runs until `cancel` fires or the messenger stops.
    pub async fn run_until_cancelled(self, cancel: CancellationToken) -> RuntimeResult<()> {
        let (machine, messenger, queue_size) = self.into_machine()?;
        let (tx, mut rx) = mpsc::channel::<BoxedMessage>(queue_size);

        let listener = {
            let messenger = Arc::clone(&messenger);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(err) = messenger.listen(tx, cancel).await {
                    error!(messenger = messenger.name(), error = %err, "messenger stopped with error");
                }
            })
        };

        info!(messenger = messenger.name(), "application is running");

        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(message) => message,
                    None => {
                        info!("messenger closed the channel");
                        break;
                    }
                },
            };

            handle(&machine, &messenger, message, &cancel).await;
        }

        cancel.cancel();
        // Unblocks a listener waiting on a full queue.
        drop(rx);
        if let Err(err) = listener.await {
            error!(error = %err, "messenger listener task failed");
        }

        messenger.close().await?;
        info!("application stopped");

        Ok(())
    }
}

async fn handle(
    machine: &Machine,
    messenger: &BoxedMessenger,
    message: BoxedMessage,
    cancel: &CancellationToken,
) {
    let responder = messenger.responder(message.chat_id());
    let message_id = message.id().to_string();
    let chat_id = message.chat_id().to_string();

    let req = Request::new(message, responder).with_cancellation(cancel.child_token());
    if let Err(err) = machine.handle(req).await {
        error!(
            error = %err,
            message_id = %message_id,
            chat_id = %chat_id,
            "failed to handle message"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use colloquy_core::{
        Answer, BoxedResponder, Media, MessengerError, Receipt, Responder, ResponderError,
        SessionState, StateStore, TextMessage,
    };
    use colloquy_framework::{ActionRequest, Actions, CommandError};
    use parking_lot::Mutex;

    use super::*;

    type Answers = Arc<Mutex<Vec<(String, String)>>>;

    struct Recorder {
        chat_id: String,
        answers: Answers,
    }

    #[async_trait]
    impl Responder for Recorder {
        async fn respond(&self, answer: Answer) -> Result<Receipt, ResponderError> {
            self.answers.lock().push((self.chat_id.clone(), answer.text));
            Ok(Receipt {
                message_id: String::new(),
                chat_id: self.chat_id.clone(),
            })
        }

        async fn respond_media(&self, _media: Media) -> Result<Receipt, ResponderError> {
            Err(ResponderError::UnsupportedMedia("recorder"))
        }
    }

    /// Sends a fixed list of `(chat, body)` messages, then stops.
    struct Scripted {
        messages: Vec<(&'static str, &'static str)>,
        answers: Answers,
        wait_for_cancel: bool,
    }

    impl Scripted {
        fn new(messages: Vec<(&'static str, &'static str)>) -> (Self, Answers) {
            let answers = Answers::default();
            let messenger = Self {
                messages,
                answers: Arc::clone(&answers),
                wait_for_cancel: false,
            };
            (messenger, answers)
        }
    }

    #[async_trait]
    impl Messenger for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn listen(
            &self,
            sender: mpsc::Sender<BoxedMessage>,
            cancel: CancellationToken,
        ) -> Result<(), MessengerError> {
            for (i, (chat, body)) in self.messages.iter().enumerate() {
                let message = TextMessage::new(i.to_string(), *chat, *body);
                sender
                    .send(Arc::new(message))
                    .await
                    .map_err(|_| MessengerError::ChannelClosed)?;
            }
            if self.wait_for_cancel {
                cancel.cancelled().await;
            }
            Ok(())
        }

        fn responder(&self, chat_id: &str) -> BoxedResponder {
            Arc::new(Recorder {
                chat_id: chat_id.to_string(),
                answers: Arc::clone(&self.answers),
            })
        }
    }

    struct Greet;

    impl Command for Greet {
        fn description(&self) -> &str {
            "say hello"
        }

        fn actions(&self) -> Actions {
            Actions::new()
                .then("start", |req: ActionRequest| async move {
                    req.respond_text("What is your name?").await?;
                    Ok::<(), CommandError>(())
                })
                .then("name", |req: ActionRequest| async move {
                    let text = format!("Hello, {}!", req.message().body());
                    req.respond_text(text).await?;
                    Ok::<(), CommandError>(())
                })
        }
    }

    fn texts(answers: &Answers) -> Vec<String> {
        answers.lock().iter().map(|(_, text)| text.clone()).collect()
    }

    #[tokio::test]
    async fn test_run_handles_messages_in_order() {
        let (messenger, answers) =
            Scripted::new(vec![("a", "/greet"), ("b", "/greet"), ("a", "Ann"), ("b", "Bob")]);
        let mut app = Application::from_config(ColloquyConfig::default(), messenger);
        app.add_command("greet", Greet).unwrap();

        app.run_until_cancelled(CancellationToken::new()).await.unwrap();

        assert_eq!(
            *answers.lock(),
            [
                ("a".to_string(), "What is your name?".to_string()),
                ("b".to_string(), "What is your name?".to_string()),
                ("a".to_string(), "Hello, Ann!".to_string()),
                ("b".to_string(), "Hello, Bob!".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_start_command_and_fallback_from_config() {
        let (messenger, answers) = Scripted::new(vec![("a", "/start"), ("a", "/gret")]);
        let mut config = ColloquyConfig::default();
        config.engine.suggest_commands = true;
        let mut app = Application::from_config(config, messenger);
        app.add_command("greet", Greet).unwrap();

        app.run_until_cancelled(CancellationToken::new()).await.unwrap();

        assert_eq!(
            texts(&answers),
            [
                "/greet - say hello",
                "Command \"gret\" not found.\n\nSimilar commands:\n/greet - say hello",
            ]
        );
    }

    #[tokio::test]
    async fn test_allow_list_from_config() {
        let (messenger, answers) = Scripted::new(vec![("stranger", "/greet"), ("friend", "/greet")]);
        let mut config = ColloquyConfig::default();
        config.access.allowed_chats = vec!["friend".to_string()];
        config.access.denied_text = Some("Go away.".to_string());
        let mut app = Application::from_config(config, messenger);
        app.add_command("greet", Greet).unwrap();

        app.run_until_cancelled(CancellationToken::new()).await.unwrap();

        assert_eq!(
            *answers.lock(),
            [
                ("stranger".to_string(), "Go away.".to_string()),
                ("friend".to_string(), "What is your name?".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_priority_store_routing() {
        let (messenger, _answers) = Scripted::new(vec![("a", "/greet")]);
        let mut config = ColloquyConfig::default();
        config.storage.priority_commands = vec!["greet".to_string()];
        let priority = Arc::new(MemoryStore::new());
        let fallback = Arc::new(MemoryStore::new());
        let mut app = Application::from_config(config, messenger)
            .with_store(fallback.clone())
            .with_priority_store(priority.clone());
        app.add_command("greet", Greet).unwrap();

        app.run_until_cancelled(CancellationToken::new()).await.unwrap();

        let state: SessionState = priority.get("a").await.unwrap();
        assert_eq!(state.name(), "name");
        assert!(fallback.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_stops_run() {
        let (mut messenger, _answers) = Scripted::new(vec![]);
        messenger.wait_for_cancel = true;
        let app = Application::from_config(ColloquyConfig::default(), messenger);
        let cancel = CancellationToken::new();

        let run = tokio::spawn(app.run_until_cancelled(cancel.clone()));
        cancel.cancel();

        run.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_with_full_queue() {
        let (messenger, answers) = Scripted::new(vec![("a", "/greet"); 10]);
        let mut config = ColloquyConfig::default();
        config.worker.queue_size = 1;
        let mut app = Application::from_config(config, messenger);
        app.add_command("greet", Greet).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), app.run_until_cancelled(cancel))
            .await
            .expect("shutdown hung on a blocked listener")
            .unwrap();

        assert!(answers.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let (messenger, _answers) = Scripted::new(vec![]);
        let mut config = ColloquyConfig::default();
        config.engine.max_forwards = 0;
        let app = Application::from_config(config, messenger);

        let err = tokio_test::assert_err!(app.run_until_cancelled(CancellationToken::new()).await);
        assert!(matches!(err, crate::RuntimeError::Config(_)));
    }
}
