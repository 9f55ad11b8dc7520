//! Colloquy Runtime - orchestration layer for the Colloquy dialog engine.
//!
//! This crate provides:
//! - Layered configuration (`config`)
//! - Logging setup (`logging`)
//! - The [`Application`] worker loop over a messenger
//! - The button [`CallbackManager`]
//!
//! ```ignore
//! use colloquy_runtime::Application;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut app = Application::new(MyMessenger::connect().await?);
//!     app.add_command("add", AddUser)?;
//!
//!     // Run until Ctrl+C
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod callback;
pub mod config;
pub mod error;
pub mod logging;

pub use application::Application;
pub use callback::{
    Callback, CallbackManager, CallbackPayload, CallbackStore, MemoryCallbackStore,
};
pub use config::{ColloquyConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{CallbackError, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for applications built on the runtime.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
