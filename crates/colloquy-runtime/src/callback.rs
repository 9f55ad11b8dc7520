//! Button callback registry.
//!
//! Platforms cap the payload a button can carry, so a button only holds a
//! short generated id. The [`CallbackManager`] maps that id to the real
//! [`CallbackPayload`] until the button is pressed or the entry gets too old.
//!
//! Deletions go through a bounded queue drained by a background task; a
//! second task periodically queues a sweep of entries older than the TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use colloquy_core::{DialogArgs, TextMessage};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::CallbackConfig;
use crate::error::CallbackError;

// =============================================================================
// Callback
// =============================================================================

/// What pressing a button means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CallbackPayload {
    /// An option of a single-choice answer; pressing it sends the value as text.
    Enum(String),
    /// A command button; pressing it jumps straight to the given dialog step.
    Command(DialogArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub id: String,
    pub payload: CallbackPayload,
    pub created_at: DateTime<Utc>,
}

impl Callback {
    pub fn new(payload: CallbackPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Turns a pressed button into the message the engine should see.
    pub fn into_message(self, message_id: impl Into<String>, chat_id: impl Into<String>) -> TextMessage {
        match self.payload {
            CallbackPayload::Enum(value) => TextMessage::new(message_id, chat_id, value),
            CallbackPayload::Command(args) => {
                TextMessage::new(message_id, chat_id, "").with_args(args)
            }
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Persistence for pending callbacks.
#[async_trait]
pub trait CallbackStore: Send + Sync + 'static {
    /// Fails with [`CallbackError::NotFound`] for an unknown id.
    async fn get(&self, id: &str) -> Result<Callback, CallbackError>;

    async fn put(&self, callback: &Callback) -> Result<(), CallbackError>;

    /// Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<(), CallbackError>;

    /// Deletes every callback created before `before`; returns how many.
    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, CallbackError>;
}

#[derive(Debug, Default)]
pub struct MemoryCallbackStore {
    data: RwLock<HashMap<String, Callback>>,
}

impl MemoryCallbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl CallbackStore for MemoryCallbackStore {
    async fn get(&self, id: &str) -> Result<Callback, CallbackError> {
        self.data
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CallbackError::NotFound(id.to_string()))
    }

    async fn put(&self, callback: &Callback) -> Result<(), CallbackError> {
        self.data
            .write()
            .insert(callback.id.clone(), callback.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), CallbackError> {
        self.data.write().remove(id);
        Ok(())
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> Result<usize, CallbackError> {
        let mut data = self.data.write();
        let len = data.len();
        data.retain(|_, callback| callback.created_at >= before);
        Ok(len - data.len())
    }
}

// =============================================================================
// Manager
// =============================================================================

#[derive(Debug)]
enum Deletion {
    One(String),
    Before(DateTime<Utc>),
}

/// Binds button payloads to ids and cleans them up in the background.
pub struct CallbackManager {
    store: Arc<dyn CallbackStore>,
    queue: mpsc::Sender<Deletion>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CallbackManager {
    /// Creates the manager and spawns its deletion and sweep tasks.
    ///
    /// Must be called within a Tokio runtime. The tasks stop when `cancel`
    /// fires or [`close`](Self::close) is called.
    pub fn start(
        config: &CallbackConfig,
        store: Arc<dyn CallbackStore>,
        cancel: CancellationToken,
    ) -> Self {
        let cancel = cancel.child_token();
        let (queue, rx) = mpsc::channel(config.queue_size.max(1));
        let ttl = TimeDelta::from_std(config.ttl()).unwrap_or(TimeDelta::MAX);

        let tasks = vec![
            tokio::spawn(drain(Arc::clone(&store), rx, cancel.clone())),
            tokio::spawn(sweep(
                queue.clone(),
                config.clean_interval(),
                ttl,
                cancel.clone(),
            )),
        ];

        Self {
            store,
            queue,
            cancel,
            tasks: Mutex::new(tasks),
        }
    }

    /// Stores `payload` under a fresh id.
    pub async fn bind(&self, payload: CallbackPayload) -> Result<Callback, CallbackError> {
        let callback = Callback::new(payload);
        self.store.put(&callback).await?;
        debug!(callback_id = %callback.id, "callback bound");
        Ok(callback)
    }

    pub async fn find(&self, id: &str) -> Result<Callback, CallbackError> {
        self.store.get(id).await
    }

    /// Queues `id` for deletion. Waits while the queue is full.
    pub async fn delete(&self, id: &str) {
        if self.queue.send(Deletion::One(id.to_string())).await.is_err() {
            warn!(callback_id = id, "deletion queue closed, callback left in store");
            return;
        }
        debug!(callback_id = id, "callback queued for deletion");
    }

    /// Resolves a pressed button and queues it for deletion.
    pub async fn press(&self, id: &str) -> Result<Callback, CallbackError> {
        let callback = self.find(id).await?;
        self.delete(id).await;
        Ok(callback)
    }

    /// Stops the background tasks and waits for them.
    pub async fn close(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(err) = task.await {
                error!(error = %err, "callback task failed");
            }
        }
    }
}

impl Drop for CallbackManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drain(
    store: Arc<dyn CallbackStore>,
    mut rx: mpsc::Receiver<Deletion>,
    cancel: CancellationToken,
) {
    loop {
        let deletion = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(deletion) => deletion,
                None => break,
            },
        };

        match deletion {
            Deletion::One(id) => {
                if let Err(err) = store.delete(&id).await {
                    error!(callback_id = %id, error = %err, "failed to delete callback");
                }
            }
            Deletion::Before(before) => match store.delete_before(before).await {
                Ok(deleted) => debug!(%before, deleted, "swept unanswered callbacks"),
                Err(err) => error!(%before, error = %err, "failed to sweep callbacks"),
            },
        }
    }
    debug!("callback deletion task stopped");
}

async fn sweep(
    queue: mpsc::Sender<Deletion>,
    every: Duration,
    ttl: TimeDelta,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(before) = Utc::now().checked_sub_signed(ttl) else {
            continue;
        };
        if queue.send(Deletion::Before(before)).await.is_err() {
            break;
        }
    }
    debug!("callback sweep task stopped");
}

#[cfg(test)]
mod tests {
    use colloquy_core::Message;

    use super::*;

    fn config() -> CallbackConfig {
        CallbackConfig {
            ttl_secs: 3600,
            clean_interval_secs: 60,
            queue_size: 8,
        }
    }

    async fn eventually(store: &MemoryCallbackStore, id: &str) -> bool {
        for _ in 0..100 {
            if store.get(id).await.is_err() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_bind_and_press() {
        let store = Arc::new(MemoryCallbackStore::new());
        let manager = CallbackManager::start(&config(), store.clone(), CancellationToken::new());

        let callback = manager
            .bind(CallbackPayload::Enum("int".to_string()))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let pressed = manager.press(&callback.id).await.unwrap();
        assert_eq!(pressed.payload, CallbackPayload::Enum("int".to_string()));
        assert!(eventually(&store, &callback.id).await);

        manager.close().await;
    }

    #[tokio::test]
    async fn test_unknown_callback() {
        let manager = CallbackManager::start(
            &config(),
            Arc::new(MemoryCallbackStore::new()),
            CancellationToken::new(),
        );

        let err = tokio_test::assert_err!(manager.press("nope").await);
        assert!(err.is_not_found());

        manager.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_old_callbacks() {
        let store = Arc::new(MemoryCallbackStore::new());
        let mut old = Callback::new(CallbackPayload::Enum("old".to_string()));
        old.created_at = Utc::now() - TimeDelta::hours(2);
        let fresh = Callback::new(CallbackPayload::Enum("fresh".to_string()));
        store.put(&old).await.unwrap();
        store.put(&fresh).await.unwrap();

        let manager = CallbackManager::start(&config(), store.clone(), CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(eventually(&store, &old.id).await);
        assert!(store.get(&fresh.id).await.is_ok());

        manager.close().await;
    }

    #[tokio::test]
    async fn test_close_stops_tasks() {
        let cancel = CancellationToken::new();
        let manager = CallbackManager::start(
            &config(),
            Arc::new(MemoryCallbackStore::new()),
            cancel.clone(),
        );

        manager.close().await;

        assert!(manager.tasks.lock().is_empty());
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_memory_store_delete_before() {
        let store = MemoryCallbackStore::new();
        let mut old = Callback::new(CallbackPayload::Enum("old".to_string()));
        old.created_at = Utc::now() - TimeDelta::hours(2);
        let fresh = Callback::new(CallbackPayload::Enum("fresh".to_string()));

        tokio_test::block_on(async {
            tokio_test::assert_ok!(store.put(&old).await);
            tokio_test::assert_ok!(store.put(&fresh).await);

            let removed = tokio_test::assert_ok!(store.delete_before(Utc::now() - TimeDelta::hours(1)).await);
            assert_eq!(removed, 1);
            tokio_test::assert_err!(store.get(&old.id).await);
            tokio_test::assert_ok!(store.get(&fresh.id).await);

            // Unknown ids delete quietly.
            tokio_test::assert_ok!(store.delete(&old.id).await);
        });
    }

    #[test]
    fn test_into_message() {
        let args = DialogArgs::new("delete", "confirm").with_data("user.id", "7");
        let msg = Callback::new(CallbackPayload::Command(args.clone())).into_message("1", "chat");
        assert_eq!(msg.args(), Some(&args));
        assert_eq!(msg.body(), "");

        let msg = Callback::new(CallbackPayload::Enum("ext".to_string())).into_message("2", "chat");
        assert_eq!(msg.body(), "ext");
        assert!(msg.args().is_none());
    }
}
