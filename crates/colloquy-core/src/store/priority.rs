use std::collections::HashSet;

use async_trait::async_trait;

use super::{BoxedStore, StateStore};
use crate::error::StoreResult;
use crate::state::SessionState;

/// Splits session states between two stores by command name.
///
/// States of the configured priority commands are written to the priority
/// store (typically durable and slower); all others go to the fallback
/// store (typically in memory). Reads try the fallback store first and only
/// consult the priority store when the fallback reports `NotFound`.
///
/// A chat that switches between a priority and a regular command holds a
/// record in each store until the older one is deleted. Callers replacing a
/// dialog must delete its state, not only put the new one.
pub struct PriorityStore {
    priority_commands: HashSet<String>,
    priority: BoxedStore,
    fallback: BoxedStore,
}

impl PriorityStore {
    pub fn new<I, S>(priority_commands: I, priority: BoxedStore, fallback: BoxedStore) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            priority_commands: priority_commands.into_iter().map(Into::into).collect(),
            priority,
            fallback,
        }
    }

    /// Whether states of `command` are routed to the priority store.
    pub fn is_priority(&self, command: &str) -> bool {
        self.priority_commands.contains(command)
    }

    fn route(&self, state: &SessionState) -> &BoxedStore {
        if self.is_priority(state.command_name()) {
            &self.priority
        } else {
            &self.fallback
        }
    }
}

#[async_trait]
impl StateStore for PriorityStore {
    fn name(&self) -> &str {
        "priority"
    }

    async fn get(&self, chat_id: &str) -> StoreResult<SessionState> {
        match self.fallback.get(chat_id).await {
            Err(err) if err.is_not_found() => self.priority.get(chat_id).await,
            other => other,
        }
    }

    async fn put(&self, state: &SessionState) -> StoreResult<()> {
        self.route(state).put(state).await
    }

    async fn delete(&self, state: &SessionState) -> StoreResult<()> {
        self.route(state).delete(state).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn setup() -> (PriorityStore, Arc<MemoryStore>, Arc<MemoryStore>) {
        let priority = Arc::new(MemoryStore::new());
        let fallback = Arc::new(MemoryStore::new());
        let store = PriorityStore::new(["add"], priority.clone(), fallback.clone());
        (store, priority, fallback)
    }

    #[tokio::test]
    async fn test_priority_command_goes_to_priority_store() {
        let (store, priority, fallback) = setup();
        let state = SessionState::new("chat", "add");

        store.put(&state).await.unwrap();
        assert_eq!(priority.len(), 1);
        assert!(fallback.is_empty());

        store.delete(&state).await.unwrap();
        assert!(priority.is_empty());
    }

    #[tokio::test]
    async fn test_other_command_goes_to_fallback_store() {
        let (store, priority, fallback) = setup();
        let state = SessionState::new("chat", "delete");

        store.put(&state).await.unwrap();
        assert!(priority.is_empty());
        assert_eq!(fallback.len(), 1);

        // Deleting through the wrong route must not touch the other store.
        priority.put(&SessionState::new("chat", "add")).await.unwrap();
        store.delete(&state).await.unwrap();
        assert!(fallback.is_empty());
        assert_eq!(priority.len(), 1);
    }

    #[tokio::test]
    async fn test_get_prefers_fallback() {
        let (store, priority, fallback) = setup();
        priority.put(&SessionState::new("chat", "add")).await.unwrap();
        fallback.put(&SessionState::new("chat", "delete")).await.unwrap();

        assert_eq!(store.get("chat").await.unwrap().command_name(), "delete");
    }

    #[tokio::test]
    async fn test_get_falls_through_on_not_found() {
        let (store, priority, _fallback) = setup();
        priority.put(&SessionState::new("chat", "add")).await.unwrap();

        assert_eq!(store.get("chat").await.unwrap().command_name(), "add");
        assert!(store.get("other").await.unwrap_err().is_not_found());
    }
}
