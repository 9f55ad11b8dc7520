//! # Colloquy
//!
//! Multi-step conversational dialogs for chat bots.
//!
//! ## Overview
//!
//! A *command* is an ordered chain of named *steps*. Every chat keeps a
//! session state naming its active command and current step; each inbound
//! message runs that one step, then the state moves on and is stored again.
//! The last step deletes the state.
//!
//! ```text
//! ┌───────────┐     ┌─────────────┐     ┌──────────────────────────────┐
//! │ Messenger │────▶│ Application │────▶│ Machine                      │
//! │ (adapter) │     │ worker loop │     │  determine → bus → step      │──▶ StateStore
//! └───────────┘     └─────────────┘     │  → errors → transit/finish   │
//!       ▲                               └──────────────────────────────┘
//!       └────────────── Responder ◀──────────────────┘
//! ```
//!
//! - **Core**: messages, answers, session state, stores, metrics hooks
//! - **Framework**: commands, router, interceptors, error handling, machine
//! - **Runtime**: configuration, logging, application loop, button callbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use colloquy::prelude::*;
//!
//! struct Greet;
//!
//! impl Command for Greet {
//!     fn description(&self) -> &str {
//!         "say hello"
//!     }
//!
//!     fn actions(&self) -> Actions {
//!         Actions::new()
//!             .then("start", |req: ActionRequest| async move {
//!                 req.respond_text("What is your name?").await?;
//!                 Ok::<(), CommandError>(())
//!             })
//!             .then("name", |req: ActionRequest| async move {
//!                 req.respond_text(format!("Hello, {}!", req.message().body())).await?;
//!                 Ok::<(), CommandError>(())
//!             })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = Application::new(MyMessenger::new());
//!     app.add_command("greet", Greet)?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use colloquy_core as core;
pub use colloquy_framework as framework;
pub use colloquy_runtime as runtime;

pub use async_trait::async_trait;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use colloquy::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use colloquy_runtime::{
        Application, CallbackManager, CallbackPayload, ColloquyConfig, ConfigLoader,
        MemoryCallbackStore, RuntimeError, RuntimeResult,
    };

    // Commands and steps
    pub use colloquy_framework::{
        ActionRequest, Actions, AlwaysInterrupt, Branch, Command, CommandError, InterruptRequest,
        Router, SessionHandle, StartCommand,
    };

    // Interceptors and error handling
    pub use colloquy_framework::{
        ErrorFlow, ErrorHandler, ErrorHandlerChain, Interceptor, InterceptorBus, Next, from_fn,
        log_actions, only_chats, please_repeat_again,
    };

    // Engine
    pub use colloquy_framework::{
        CommandNotFoundFallback, Machine, MachineError, Request, StaticFallback, SuggestFallback,
    };

    // Messages, answers and state
    pub use colloquy_core::{
        Answer, BoxedMessage, BoxedResponder, Button, DialogArgs, Enum, Media, MemoryStore, Message,
        Messenger, MessengerError, Metrics, Receipt, Responder, ResponderError, SessionState,
        StateStore, TextMessage,
    };

    pub use async_trait::async_trait;
}
