//! # Colloquy Framework
//!
//! The dialog engine: commands, routing, interceptors, error handling and
//! the state machine that ties them together.
//!
//! A command is an ordered chain of named steps. Each inbound message runs
//! one step of the chat's active command, then the machine moves the state
//! to the next step and stores it:
//!
//! ```rust,ignore
//! use colloquy_framework::{Actions, Command, Machine, Router};
//!
//! struct Add;
//!
//! impl Command for Add {
//!     fn description(&self) -> &str {
//!         "add user"
//!     }
//!
//!     fn actions(&self) -> Actions {
//!         Actions::new()
//!             .then("start", ask_name)
//!             .then("name", save_name)
//!     }
//! }
//!
//! let mut router = Router::new();
//! router.add("add", Add)?;
//! let machine = Machine::new(Arc::new(router), Arc::new(MemoryStore::new()));
//! ```

pub mod bus;
pub mod command;
pub mod error;
pub mod error_handler;
pub mod interceptor;
pub mod machine;
pub mod router;
pub mod start;

#[cfg(test)]
mod testing;

pub use bus::{FnInterceptor, Interceptor, InterceptorBus, Next, from_fn};
pub use command::{
    Action, ActionChain, ActionFuture, ActionHandler, ActionRequest, Actions, AlwaysInterrupt,
    BoxedActionHandler, Branch, Command, InterruptRequest, ServiceHandler, SessionHandle,
};
pub use error::{
    ChainError, CommandError, DetermineError, ErrorCode, MachineError, MachineResult,
    RouterError, RouterResult,
};
pub use error_handler::{DEFAULT_ACCESS_DENIED_TEXT, ErrorFlow, ErrorHandler, ErrorHandlerChain};
pub use interceptor::{
    DEFAULT_DENIED_TEXT, DEFAULT_RETRY_TEXT, LogActions, OnlyChats, PleaseRepeatAgain,
    log_actions, only_chats, only_chats_with_message, please_repeat_again,
    please_repeat_again_with_message,
};
pub use machine::{
    CommandNotFoundFallback, DEFAULT_MAX_FORWARDS, DEFAULT_NOT_FOUND_TEXT, Dialog,
    DialogDeterminer, Machine, Request, StaticFallback, SuggestFallback,
};
pub use router::{NamedCommand, Router};
pub use start::StartCommand;
