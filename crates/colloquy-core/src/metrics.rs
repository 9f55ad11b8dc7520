//! Metrics hooks.
//!
//! The engine reports what happens during a pass through an explicit
//! [`Metrics`] handle passed to its constructors. Every method has a no-op
//! default, so a sink only overrides what it records; [`NoopMetrics`]
//! records nothing.

use std::fmt;
use std::time::Duration;

/// A state store operation, as reported to [`Metrics::observe_store_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    Put,
    Delete,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives counters and timings from the engine.
///
/// Implementations must be cheap and must not fail; they are called inline
/// on the hot path.
pub trait Metrics: Send + Sync + 'static {
    /// A dialog of `command` reached its last step.
    fn inc_finished(&self, command: &str) {
        let _ = command;
    }

    /// Total lifetime of a finished dialog.
    fn observe_execution(&self, command: &str, elapsed: Duration) {
        let _ = (command, elapsed);
    }

    /// Time spent running one step, persistence included.
    fn observe_action_execution(&self, command: &str, action: &str, elapsed: Duration) {
        let _ = (command, action, elapsed);
    }

    /// The dialog moved from `from_state` to `to_state`.
    fn inc_state_transition(&self, command: &str, from_state: &str, to_state: &str) {
        let _ = (command, from_state, to_state);
    }

    /// An interrupt was requested and the active command answered `allowed`.
    fn inc_interruption(&self, command: &str, from_state: &str, to_command: &str, allowed: bool) {
        let _ = (command, from_state, to_command, allowed);
    }

    /// A message named no known command.
    fn inc_not_found(&self) {}

    /// A step finished with `code` (`"OK"` on success).
    fn inc_action_handled(&self, command: &str, action: &str, code: &str) {
        let _ = (command, action, code);
    }

    /// Latency of a state store operation.
    fn observe_store_operation(&self, store: &str, operation: StoreOperation, elapsed: Duration) {
        let _ = (store, operation, elapsed);
    }
}

/// A [`Metrics`] sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}
