//! In-process state store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::StateStore;
use crate::error::{StoreError, StoreResult};
use crate::state::SessionState;

/// Keeps session states in a `RwLock`-guarded map.
///
/// States are stored without their per-pass forward directive or transition
/// flag, so a `get` always returns a freshly loaded record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<String, SessionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored states.
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, chat_id: &str) -> StoreResult<SessionState> {
        self.states
            .read()
            .get(chat_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn put(&self, state: &SessionState) -> StoreResult<()> {
        let mut stored = state.clone();
        stored.take_forward();

        self.states
            .write()
            .insert(state.chat_id().to_owned(), stored);
        Ok(())
    }

    async fn delete(&self, state: &SessionState) -> StoreResult<()> {
        self.states
            .write()
            .remove(state.chat_id())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
