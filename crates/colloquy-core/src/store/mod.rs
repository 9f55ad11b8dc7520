//! Session state persistence.
//!
//! [`StateStore`] is the only mutable resource on the engine's hot path.
//! Implementations must be safe for concurrent use and give at least
//! last-writer-wins semantics per chat id; a `put` either fully replaces the
//! record or leaves the previous one in place.
//!
//! Two decorators compose over any store:
//!
//! - [`InstrumentedStore`] reports operation latency to [`Metrics`](crate::metrics::Metrics)
//! - [`PriorityStore`] routes writes per command to one of two backing stores

mod instrumented;
mod memory;
mod priority;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::state::SessionState;

pub use instrumented::InstrumentedStore;
pub use memory::MemoryStore;
pub use priority::PriorityStore;

/// Persistence for [`SessionState`], keyed by chat id.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Store name, used in logs and metrics labels.
    fn name(&self) -> &str;

    /// Loads the state of `chat_id`, or [`StoreError::NotFound`](crate::error::StoreError::NotFound).
    async fn get(&self, chat_id: &str) -> StoreResult<SessionState>;

    /// Inserts or replaces the state of its chat.
    async fn put(&self, state: &SessionState) -> StoreResult<()>;

    /// Removes the state of its chat; `NotFound` if nothing was stored.
    async fn delete(&self, state: &SessionState) -> StoreResult<()>;
}

/// A shared, type-erased state store.
pub type BoxedStore = Arc<dyn StateStore>;

