//! Dialog determination.
//!
//! Resolves which command and which session state an inbound message belongs
//! to by running four strategies in a fixed order, stopping at the first one
//! that completes:
//!
//! 1. **message args**: the message carries `(command, state, data)` itself
//! 2. **stored state**: load the chat's state; never completes on its own
//! 3. **fresh dialog**: no stored state, start the command the message names
//! 4. **continuation**: resume the stored dialog, or switch to the command
//!    the message names if the active command allows the interruption

use std::sync::Arc;

use colloquy_core::{BoxedMessage, Message, Metrics, SessionState, StateStore};
use tracing::debug;

use crate::command::InterruptRequest;
use crate::error::DetermineError;
use crate::router::{NamedCommand, Router};

/// The resolved command and state of one message.
#[derive(Debug, Clone)]
pub struct Dialog {
    pub command: NamedCommand,
    pub state: SessionState,
    /// Stored state of the dialog an allowed interrupt replaced. Its record
    /// is removed before the new dialog persists.
    pub superseded: Option<SessionState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    MessageArgs,
    StoredState,
    FreshDialog,
    Continuation,
}

impl Strategy {
    const ORDER: [Strategy; 4] = [
        Strategy::MessageArgs,
        Strategy::StoredState,
        Strategy::FreshDialog,
        Strategy::Continuation,
    ];

    fn name(&self) -> &'static str {
        match self {
            Self::MessageArgs => "message_args",
            Self::StoredState => "stored_state",
            Self::FreshDialog => "fresh_dialog",
            Self::Continuation => "continuation",
        }
    }
}

enum Flow {
    Continue,
    Done,
}

#[derive(Default)]
struct Env {
    command: Option<NamedCommand>,
    state: Option<SessionState>,
    superseded: Option<SessionState>,
}

/// Resolves the [`Dialog`] of an inbound message.
///
/// Given the same stored state and the same message, the result is always
/// the same.
pub struct DialogDeterminer<'a> {
    router: &'a Router,
    store: &'a dyn StateStore,
    metrics: &'a dyn Metrics,
}

impl<'a> DialogDeterminer<'a> {
    pub fn new(router: &'a Router, store: &'a dyn StateStore, metrics: &'a dyn Metrics) -> Self {
        Self {
            router,
            store,
            metrics,
        }
    }

    pub async fn determine(&self, message: &BoxedMessage) -> Result<Dialog, DetermineError> {
        let mut env = Env::default();

        for strategy in Strategy::ORDER {
            debug!(strategy = strategy.name(), "running determination strategy");

            let flow = match strategy {
                Strategy::MessageArgs => self.from_message_args(message.as_ref(), &mut env)?,
                Strategy::StoredState => self.from_store(message.as_ref(), &mut env).await?,
                Strategy::FreshDialog => self.fresh_dialog(message.as_ref(), &mut env)?,
                Strategy::Continuation => self.continuation(message, &mut env).await?,
            };

            if let Flow::Done = flow {
                return match (env.command, env.state) {
                    (Some(command), Some(state)) => Ok(Dialog {
                        command,
                        state,
                        superseded: env.superseded,
                    }),
                    _ => Err(DetermineError::NotDetermined),
                };
            }
        }

        Err(DetermineError::NotDetermined)
    }

    fn find(&self, name: &str) -> Result<NamedCommand, DetermineError> {
        self.router
            .find(name)
            .cloned()
            .map_err(|_| DetermineError::CommandNotFound(name.to_owned()))
    }

    fn from_message_args(&self, message: &dyn Message, env: &mut Env) -> Result<Flow, DetermineError> {
        let Some(args) = message.args() else {
            return Ok(Flow::Continue);
        };

        debug!(
            command = %args.command_name,
            state = %args.state_name,
            "message carries dialog args"
        );

        env.command = Some(self.find(&args.command_name)?);
        env.state = Some(SessionState::from_args(message.chat_id(), args));
        Ok(Flow::Done)
    }

    async fn from_store(&self, message: &dyn Message, env: &mut Env) -> Result<Flow, DetermineError> {
        match self.store.get(message.chat_id()).await {
            Ok(state) => {
                debug!(
                    command = state.command_name(),
                    state = state.name(),
                    "found stored state"
                );
                env.state = Some(state);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(DetermineError::Store(err)),
        }
        Ok(Flow::Continue)
    }

    fn fresh_dialog(&self, message: &dyn Message, env: &mut Env) -> Result<Flow, DetermineError> {
        if env.state.is_some() {
            return Ok(Flow::Continue);
        }

        let name = message.command_name().unwrap_or_default();
        debug!(command = name, "no stored state, starting new dialog");

        let command = self.find(name)?;
        env.state = Some(SessionState::new(message.chat_id(), command.name()));
        env.command = Some(command);
        Ok(Flow::Done)
    }

    async fn continuation(
        &self,
        message: &BoxedMessage,
        env: &mut Env,
    ) -> Result<Flow, DetermineError> {
        let Some(state) = env.state.take() else {
            return Ok(Flow::Done);
        };

        let current = self
            .router
            .find(state.command_name())
            .cloned()
            .map_err(|_| DetermineError::UnknownStoredCommand(state.command_name().to_owned()))?;

        let requested = message
            .command_name()
            .filter(|name| *name != state.command_name());

        let Some(requested) = requested else {
            env.command = Some(current);
            env.state = Some(state);
            return Ok(Flow::Done);
        };

        debug!(from = current.name(), to = requested, "interrupt requested");

        let allowed = current
            .command()
            .interrupt(&InterruptRequest {
                message: Arc::clone(message),
                current_command: current.name().to_owned(),
                current_state: state.name().to_owned(),
                new_command: requested.to_owned(),
            })
            .await
            .map_err(|source| DetermineError::Interrupt {
                command: current.name().to_owned(),
                source,
            })?;

        self.metrics
            .inc_interruption(current.name(), state.name(), requested, allowed);

        if !allowed {
            debug!(command = current.name(), "interrupt denied");
            env.command = Some(current);
            env.state = Some(state);
            return Ok(Flow::Done);
        }

        let next = self.find(requested)?;
        debug!(from = current.name(), to = next.name(), "interrupt allowed, switching command");

        env.state = Some(SessionState::new(message.chat_id(), next.name()));
        env.command = Some(next);
        env.superseded = Some(state);
        Ok(Flow::Done)
    }
}
