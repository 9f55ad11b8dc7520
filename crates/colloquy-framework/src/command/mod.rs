//! Commands.
//!
//! A [`Command`] is a named, multi-step dialog. It describes itself, returns
//! its steps as an [`Actions`] builder, and decides whether the user may
//! leave it mid-dialog for another command.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Ping;
//!
//! #[async_trait]
//! impl Command for Ping {
//!     fn description(&self) -> &str {
//!         "answers pong"
//!     }
//!
//!     fn actions(&self) -> Actions {
//!         Actions::new().then("ping", |req: ActionRequest| async move {
//!             req.respond_text("pong").await?;
//!             Ok::<(), CommandError>(())
//!         })
//!     }
//! }
//!
//! router.add("ping", Ping)?;
//! ```

pub mod action;
pub mod chain;

use async_trait::async_trait;
use colloquy_core::BoxedMessage;

pub use action::{
    ActionFuture, ActionHandler, ActionRequest, BoxedActionHandler, ServiceHandler, SessionHandle,
};
pub use chain::{Action, ActionChain, Actions, Branch};

use crate::error::CommandError;

/// What the interrupt policy is asked to decide on.
#[derive(Debug, Clone)]
pub struct InterruptRequest {
    /// The message naming the new command.
    pub message: BoxedMessage,
    /// The active command.
    pub current_command: String,
    /// The active step.
    pub current_state: String,
    /// The command the user asked for.
    pub new_command: String,
}

/// A multi-step dialog.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// One-line description shown in command listings.
    fn description(&self) -> &str {
        ""
    }

    /// The steps of the dialog. Called once, when the command is registered.
    fn actions(&self) -> Actions;

    /// Whether the active dialog may be abandoned for `req.new_command`.
    ///
    /// Refuses by default.
    async fn interrupt(&self, req: &InterruptRequest) -> Result<bool, CommandError> {
        let _ = req;
        Ok(false)
    }
}

/// Wraps a command so that it can always be interrupted.
pub struct AlwaysInterrupt<C>(pub C);

#[async_trait]
impl<C: Command> Command for AlwaysInterrupt<C> {
    fn description(&self) -> &str {
        self.0.description()
    }

    fn actions(&self) -> Actions {
        self.0.actions()
    }

    async fn interrupt(&self, _req: &InterruptRequest) -> Result<bool, CommandError> {
        Ok(true)
    }
}
