//! The dialog state machine.
//!
//! [`Machine::handle`] runs one handling pass for one inbound message:
//!
//! ```text
//! Determine ─▶ Locate action ─▶ Execute via bus ─┬─▶ Transition ─▶ Persist
//!                  ▲                             └─▶ Finish (delete)
//!                  └──────────── forward ◀───────────────┘
//! ```
//!
//! - **Determine**: [`DialogDeterminer`] resolves the command and state. An
//!   unknown command goes to the [`CommandNotFoundFallback`] and ends the pass.
//! - **Locate**: an empty state name means the command's first step; a name
//!   that the command does not have is a defect and fails the pass.
//! - **Execute**: the step runs inside the [`InterceptorBus`]. Failures go
//!   through the [`ErrorHandlerChain`]; a silenced failure ends the pass
//!   without touching the store, a raised one fails it. A step reached by a
//!   forward is the exception: its state is saved at the failing step first.
//! - **Transition**: unless the handler already moved the state, it moves to
//!   the step's successor; with no successor the dialog finishes and its
//!   state is deleted.
//! - **Forward**: when the handler asked for a forward, the next step runs
//!   right away on the in-memory state. The state is written once, at the end
//!   of the forward chain. Re-entries are capped by `max_forwards`.
//! - **Interrupt**: when an allowed interrupt replaced a dialog, the old
//!   record is deleted before the new state is written or deleted.

mod determiner;
mod fallback;

use std::sync::Arc;
use std::time::Instant;

use colloquy_core::{
    BoxedMessage, BoxedResponder, BoxedStore, Forward, Metrics, NoopMetrics, SessionState,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};

pub use determiner::{Dialog, DialogDeterminer};
pub use fallback::{
    CommandNotFoundFallback, DEFAULT_NOT_FOUND_TEXT, StaticFallback, SuggestFallback,
};

use crate::bus::InterceptorBus;
use crate::command::{Action, ActionRequest, SessionHandle};
use crate::error::{DetermineError, MachineError, MachineResult};
use crate::error_handler::ErrorHandlerChain;
use crate::router::{NamedCommand, Router};

/// Default ceiling on forward re-entries within one pass.
pub const DEFAULT_MAX_FORWARDS: usize = 32;

/// One inbound message together with the means to answer it.
#[derive(Clone)]
pub struct Request {
    pub message: BoxedMessage,
    pub responder: BoxedResponder,
    pub cancel: CancellationToken,
}

impl Request {
    pub fn new(message: BoxedMessage, responder: BoxedResponder) -> Self {
        Self {
            message,
            responder,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What one handling pass carries from step to step.
struct Pass {
    session: SessionHandle,
    /// State of the dialog an accepted interrupt replaced.
    superseded: Option<SessionState>,
    forwards: usize,
}

enum StepOutcome {
    /// The state was persisted; the pass is over.
    Persisted,
    /// The dialog finished and its state was deleted.
    Finished,
    /// A failure was handled and silenced.
    Halted,
    /// Run the next step right away.
    Forwarded,
}

/// Orchestrates determination, execution, transition and persistence.
pub struct Machine {
    router: Arc<Router>,
    store: BoxedStore,
    bus: InterceptorBus,
    errors: ErrorHandlerChain,
    fallback: Arc<dyn CommandNotFoundFallback>,
    metrics: Arc<dyn Metrics>,
    max_forwards: usize,
}

impl Machine {
    pub fn new(router: Arc<Router>, store: BoxedStore) -> Self {
        Self {
            router,
            store,
            bus: InterceptorBus::new(),
            errors: ErrorHandlerChain::new(),
            fallback: Arc::new(StaticFallback::default()),
            metrics: Arc::new(NoopMetrics),
            max_forwards: DEFAULT_MAX_FORWARDS,
        }
    }

    pub fn with_bus(mut self, bus: InterceptorBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_error_handlers(mut self, errors: ErrorHandlerChain) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_fallback(mut self, fallback: impl CommandNotFoundFallback) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn with_shared_fallback(mut self, fallback: Arc<dyn CommandNotFoundFallback>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_max_forwards(mut self, max_forwards: usize) -> Self {
        self.max_forwards = max_forwards;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Handles one inbound message.
    pub async fn handle(&self, req: Request) -> MachineResult<()> {
        let span = info_span!(
            "handle",
            chat_id = %req.message.chat_id(),
            message_id = %req.message.id(),
        );
        self.handle_inner(&req).instrument(span).await
    }

    async fn handle_inner(&self, req: &Request) -> MachineResult<()> {
        if req.cancel.is_cancelled() {
            return Err(MachineError::Cancelled);
        }

        debug!("handling message");

        let determiner = DialogDeterminer::new(&self.router, &*self.store, &*self.metrics);
        let Dialog {
            command,
            state,
            superseded,
        } = match determiner.determine(&req.message).await {
            Ok(dialog) => dialog,
            Err(DetermineError::CommandNotFound(name)) => {
                self.metrics.inc_not_found();
                debug!(command = %name, "command not found, running fallback");
                return self
                    .fallback
                    .handle(req, &self.router, &name)
                    .await
                    .map_err(MachineError::Fallback);
            }
            Err(err) => return Err(err.into()),
        };

        let mut pass = Pass {
            session: SessionHandle::new(state),
            superseded,
            forwards: 0,
        };

        loop {
            if req.cancel.is_cancelled() {
                return Err(MachineError::Cancelled);
            }

            match self.step(req, &command, &mut pass).await? {
                StepOutcome::Persisted | StepOutcome::Finished | StepOutcome::Halted => {
                    return Ok(());
                }
                StepOutcome::Forwarded => {
                    pass.forwards += 1;
                    if pass.forwards > self.max_forwards {
                        return Err(MachineError::ForwardLimitExceeded {
                            command: command.name().to_owned(),
                            limit: self.max_forwards,
                        });
                    }
                }
            }
        }
    }

    fn locate<'c>(&self, command: &'c NamedCommand, state: &str) -> MachineResult<&'c Action> {
        let chain = command.chain();
        if state.is_empty() {
            return Ok(chain.first());
        }

        // A forward may name a branch instead of a step.
        chain
            .get(state)
            .or_else(|| chain.branch_entry(state).and_then(|entry| chain.get(entry)))
            .ok_or_else(|| MachineError::ActionNotFound {
                command: command.name().to_owned(),
                state: state.to_owned(),
            })
    }

    async fn step(
        &self,
        req: &Request,
        command: &NamedCommand,
        pass: &mut Pass,
    ) -> MachineResult<StepOutcome> {
        let session = pass.session.clone();
        let action = self.locate(command, &session.name())?;
        let cmd = command.name();
        debug!(command = cmd, action = action.name(), "action found");

        let started = Instant::now();
        let action_req = ActionRequest::new(
            Arc::clone(&req.message),
            Arc::clone(&req.responder),
            session.clone(),
            Arc::clone(&self.router),
            req.cancel.clone(),
            cmd,
            action.name(),
        );

        if let Err(err) = self
            .bus
            .handle(action_req.clone(), Arc::clone(action.handler()))
            .await
        {
            let code = err.code();
            let raised = self.errors.resolve(&action_req, err).await;

            // A forward chain is only written at its end. Save it at the
            // failing step so the retry resumes there.
            if pass.forwards > 0 {
                session.with(|s| {
                    s.transit(action.name());
                    s.take_forward();
                });
                debug!(command = cmd, action = action.name(), "forwarded action failed, saving state");
                self.persist(req, pass).await?;
            }

            return match raised {
                Some(err) => {
                    if let Some(code) = err.code() {
                        self.metrics.inc_action_handled(cmd, action.name(), code.as_str());
                    }
                    Err(MachineError::Command {
                        command: cmd.to_owned(),
                        action: action.name().to_owned(),
                        source: err,
                    })
                }
                None => {
                    if let Some(code) = code {
                        self.metrics.inc_action_handled(cmd, action.name(), code.as_str());
                    }
                    debug!(command = cmd, action = action.name(), "action error handled");
                    Ok(StepOutcome::Halted)
                }
            };
        }
        self.metrics.inc_action_handled(cmd, action.name(), "OK");

        if !session.with(|s| s.recently_transited()) {
            let Some(next) = action.next() else {
                return self.finish(req, action, pass).await;
            };

            info!(from_state = action.name(), to_state = next, "transit state");
            session.transit(next);
        }

        let (to_state, forward) = session.with(|s| (s.name().to_owned(), s.take_forward()));
        self.metrics.inc_state_transition(cmd, action.name(), &to_state);

        if let Some(forward) = forward {
            match forward {
                Forward::Passthrough => debug!(to_state = %to_state, "passthrough"),
                Forward::To(_) => debug!(to_state = %to_state, "forwarding"),
            }
            self.metrics
                .observe_action_execution(cmd, action.name(), started.elapsed());
            return Ok(StepOutcome::Forwarded);
        }

        self.persist(req, pass).await?;
        self.metrics
            .observe_action_execution(cmd, action.name(), started.elapsed());

        Ok(StepOutcome::Persisted)
    }

    async fn persist(&self, req: &Request, pass: &mut Pass) -> MachineResult<()> {
        if req.cancel.is_cancelled() {
            return Err(MachineError::Cancelled);
        }

        self.discard_superseded(pass).await?;
        self.store
            .put(&pass.session.snapshot())
            .await
            .map_err(MachineError::Persist)
    }

    async fn finish(&self, req: &Request, action: &Action, pass: &mut Pass) -> MachineResult<StepOutcome> {
        let state = pass.session.snapshot();
        info!(
            command = state.command_name(),
            state = action.name(),
            elapsed_ms = state.duration().as_millis() as u64,
            "dialog finished"
        );

        self.metrics.inc_finished(state.command_name());
        self.metrics
            .observe_execution(state.command_name(), state.duration());

        if req.cancel.is_cancelled() {
            return Err(MachineError::Cancelled);
        }

        self.discard_superseded(pass).await?;
        match self.store.delete(&state).await {
            Ok(()) => Ok(StepOutcome::Finished),
            Err(err) if err.is_not_found() => Ok(StepOutcome::Finished),
            Err(err) => Err(MachineError::Persist(err)),
        }
    }

    /// Deletes the record of an interrupted dialog, which may live in another
    /// backing store than the new one.
    async fn discard_superseded(&self, pass: &mut Pass) -> MachineResult<()> {
        let Some(old) = pass.superseded.take() else {
            return Ok(());
        };

        match self.store.delete(&old).await {
            Ok(()) => {
                debug!(command = old.command_name(), state = old.name(), "interrupted dialog deleted");
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(MachineError::Persist(err)),
        }
    }
}
