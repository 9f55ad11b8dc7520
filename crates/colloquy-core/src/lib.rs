//! # Colloquy Core
//!
//! Leaf contracts of the Colloquy dialog engine.
//!
//! This crate holds everything the engine treats as a black box or as plain
//! data, so that adapters and storage backends can depend on it without
//! pulling in the state machine itself:
//!
//! - **Messages**: the inbound [`Message`] contract and a ready-made [`TextMessage`]
//! - **Answers**: the outbound [`Responder`] contract with [`Answer`], [`Enum`],
//!   [`Button`] and [`Media`]
//! - **Session state**: the per-chat [`SessionState`] record
//! - **Stores**: the [`StateStore`] contract plus [`MemoryStore`],
//!   [`InstrumentedStore`] and [`PriorityStore`]
//! - **Metrics**: the optional [`Metrics`] hook trait and [`NoopMetrics`]
//! - **Messengers**: the [`Messenger`] contract implemented by platform adapters
//!
//! ```text
//! ┌───────────┐  Message   ┌─────────┐  SessionState  ┌────────────┐
//! │ Messenger │──────────▶│ Machine │◀──────────────▶│ StateStore │
//! └───────────┘            └─────────┘                └────────────┘
//!       ▲                       │
//!       └──── Responder ◀───────┘
//! ```

pub mod answer;
pub mod error;
pub mod message;
pub mod messenger;
pub mod metrics;
pub mod state;
pub mod store;

pub use answer::{Answer, BoxedResponder, Button, Enum, EnumItem, Media, Receipt, Responder};
pub use error::{BoxError, MessengerError, ResponderError, StoreError, StoreResult};
pub use message::{BoxedMessage, DialogArgs, Message, Sender, TextMessage, extract_command_name};
pub use messenger::{BoxedMessenger, Messenger};
pub use metrics::{Metrics, NoopMetrics, StoreOperation};
pub use state::{Forward, SessionState};
pub use store::{BoxedStore, InstrumentedStore, MemoryStore, PriorityStore, StateStore};
