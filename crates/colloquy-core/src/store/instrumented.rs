use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{BoxedStore, StateStore};
use crate::error::StoreResult;
use crate::metrics::{Metrics, StoreOperation};
use crate::state::SessionState;

/// Wraps a store and reports the latency of every operation.
///
/// Results, errors included, are passed through untouched.
pub struct InstrumentedStore {
    inner: BoxedStore,
    metrics: Arc<dyn Metrics>,
}

impl InstrumentedStore {
    pub fn new(inner: BoxedStore, metrics: Arc<dyn Metrics>) -> Self {
        Self { inner, metrics }
    }

    fn observe(&self, operation: StoreOperation, started: Instant) {
        let elapsed = started.elapsed();
        tracing::trace!(
            store = self.inner.name(),
            operation = operation.as_str(),
            elapsed_us = elapsed.as_micros() as u64,
            "state store operation"
        );
        self.metrics
            .observe_store_operation(self.inner.name(), operation, elapsed);
    }
}

#[async_trait]
impl StateStore for InstrumentedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, chat_id: &str) -> StoreResult<SessionState> {
        let started = Instant::now();
        let result = self.inner.get(chat_id).await;
        self.observe(StoreOperation::Get, started);
        result
    }

    async fn put(&self, state: &SessionState) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.put(state).await;
        self.observe(StoreOperation::Put, started);
        result
    }

    async fn delete(&self, state: &SessionState) -> StoreResult<()> {
        let started = Instant::now();
        let result = self.inner.delete(state).await;
        self.observe(StoreOperation::Delete, started);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct Recorder {
        ops: Mutex<Vec<(String, StoreOperation)>>,
    }

    impl Metrics for Recorder {
        fn observe_store_operation(&self, store: &str, operation: StoreOperation, _: Duration) {
            self.ops.lock().push((store.to_owned(), operation));
        }
    }

    #[tokio::test]
    async fn test_records_each_operation() {
        let recorder = Arc::new(Recorder::default());
        let store = InstrumentedStore::new(Arc::new(MemoryStore::new()), recorder.clone());
        let state = SessionState::new("chat", "add");

        store.put(&state).await.unwrap();
        store.get("chat").await.unwrap();
        store.delete(&state).await.unwrap();
        assert!(store.get("chat").await.unwrap_err().is_not_found());

        let ops: Vec<_> = recorder.ops.lock().iter().map(|(_, op)| *op).collect();
        assert_eq!(
            ops,
            [
                StoreOperation::Put,
                StoreOperation::Get,
                StoreOperation::Delete,
                StoreOperation::Get
            ]
        );
        assert!(recorder.ops.lock().iter().all(|(name, _)| name == "memory"));
        assert_eq!(store.name(), "memory");
    }
}
